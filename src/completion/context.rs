/// Where the cursor sits inside a `[[...` construct on one line.
///
/// Columns are character offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikilinkContext {
    /// Target text typed so far, up to the first `|`
    pub prefix: String,
    /// Anything typed after the prefix and before the cursor (`|display`)
    pub rest: String,
    /// Column right after the opening `[[`
    pub start: usize,
    /// Cursor column
    pub end: usize,
    /// A `]]` follows the cursor on the same line
    pub is_complete: bool,
}

impl WikilinkContext {
    /// Detects a wikilink being typed at `character` in `line`.
    ///
    /// Uses the rightmost `[[` before the cursor; a `]]` between it and the
    /// cursor means the link is already closed.
    pub fn detect(line: &str, character: usize) -> Option<Self> {
        let chars: Vec<char> = line.chars().collect();
        let cursor = character.min(chars.len());

        let open = (0..cursor.saturating_sub(1))
            .rev()
            .find(|&i| chars[i] == '[' && chars[i + 1] == '[')?;
        let start = open + 2;

        let typed: String = chars[start..cursor].iter().collect();
        if typed.contains("]]") {
            return None;
        }

        let (prefix, rest) = match typed.find('|') {
            Some(pipe) => (typed[..pipe].to_string(), typed[pipe..].to_string()),
            None => (typed, String::new()),
        };

        let after: String = chars[cursor..].iter().collect();

        Some(WikilinkContext {
            prefix,
            rest,
            start,
            end: cursor,
            is_complete: after.contains("]]"),
        })
    }
}
