use std::collections::HashSet;
use std::path::Path;

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;

use crate::parser::ExtractionMode;

/// Directory and file names the scanner never descends into or indexes.
pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &[
    ".git",
    ".vscode",
    ".idea",
    "node_modules",
    ".next",
    ".nuxt",
    "dist",
    "build",
    "target",
    "__pycache__",
    ".pytest_cache",
    "coverage",
    ".coverage",
    "venv",
    ".venv",
    "env",
    ".env",
];

pub const DEFAULT_MAX_FILE_COUNT: usize = 10_000;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// Ceiling on the number of files a single scan will record
    pub max_file_count: usize,
    #[serde(default = "default_excluded_names")]
    pub excluded_names: Vec<String>,
    #[serde(default = "default_task_states")]
    pub task_states: Vec<TaskStateConfig>,
    pub unresolved_diagnostics: bool,
    pub ambiguous_diagnostics: bool,
    pub task_diagnostics: bool,
    pub extraction: ExtractionMode,
    pub ordered_query_output: bool,
    pub completion_limit: usize,
}

/// A task state marker (the text between the brackets of `- [ ]`) and the
/// spellings accepted as equivalent to it.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskStateConfig {
    pub value: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_excluded_names() -> Vec<String> {
    DEFAULT_EXCLUDED_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_task_states() -> Vec<TaskStateConfig> {
    vec![
        TaskStateConfig {
            value: " ".to_string(),
            aliases: vec![],
        },
        TaskStateConfig {
            value: "x".to_string(),
            aliases: vec!["X".to_string(), "completed".to_string()],
        },
    ]
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/notedown/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.notedown",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("max_file_count", DEFAULT_MAX_FILE_COUNT as u64)?
            .set_default("unresolved_diagnostics", true)?
            .set_default("ambiguous_diagnostics", true)?
            .set_default("task_diagnostics", true)?
            .set_default("extraction", "Ast")?
            .set_default("ordered_query_output", true)?
            .set_default("completion_limit", 100)?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    /// Every task marker that does not produce an `invalid-task-state`
    /// diagnostic: each configured value plus all of its aliases.
    pub fn valid_task_states(&self) -> HashSet<&str> {
        self.task_states
            .iter()
            .flat_map(|state| {
                std::iter::once(state.value.as_str()).chain(state.aliases.iter().map(String::as_str))
            })
            .collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            excluded_names: default_excluded_names(),
            task_states: default_task_states(),
            unresolved_diagnostics: true,
            ambiguous_diagnostics: true,
            task_diagnostics: true,
            extraction: ExtractionMode::Ast,
            ordered_query_output: true,
            completion_limit: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_workspace_dir;

    #[test]
    fn default_task_states_cover_aliases() {
        let settings = Settings::default();
        let valid = settings.valid_task_states();

        for state in [" ", "x", "X", "completed"] {
            assert!(valid.contains(state), "{state:?} should be valid");
        }
        assert!(!valid.contains("wip"));
    }

    #[test]
    fn settings_load_defaults_without_files() {
        let (_temp_dir, root) = create_test_workspace_dir();

        let settings = Settings::new(&root).expect("settings should load");

        assert_eq!(settings.max_file_count, DEFAULT_MAX_FILE_COUNT);
        assert!(settings.excluded_names.iter().any(|n| n == "node_modules"));
        assert_eq!(settings.extraction, ExtractionMode::Ast);
        assert!(settings.unresolved_diagnostics);
    }

    #[test]
    fn settings_read_workspace_file() {
        let (_temp_dir, root) = create_test_workspace_dir();
        std::fs::write(
            root.join(".notedown.toml"),
            r#"
max_file_count = 5
extraction = "Regex"

[[task_states]]
value = " "

[[task_states]]
value = "x"
aliases = ["done"]
"#,
        )
        .unwrap();

        let settings = Settings::new(&root).expect("settings should load");

        assert_eq!(settings.max_file_count, 5);
        assert_eq!(settings.extraction, ExtractionMode::Regex);
        let valid = settings.valid_task_states();
        assert!(valid.contains("done"));
        assert!(!valid.contains("completed"));
    }
}
