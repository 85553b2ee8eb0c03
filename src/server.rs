//! Protocol glue: translates tower-lsp requests into [`WorkspaceState`] calls
//! and publishes the resulting diagnostics.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::{Error as RpcError, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::commands::{
    self, Direction, COMMANDS, GET_LIST_ITEM_BOUNDARIES, MOVE_LIST_ITEM_DOWN, MOVE_LIST_ITEM_UP,
};
use crate::config::Settings;
use crate::scanner::root_from_str;
use crate::state::WorkspaceState;

pub struct Backend {
    client: Client,
    state: RwLock<Option<Arc<WorkspaceState>>>,
    roots: RwLock<Vec<String>>,
    cancel: CancellationToken,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Backend {
            client,
            state: RwLock::new(None),
            roots: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    fn state(&self) -> Option<Arc<WorkspaceState>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    async fn publish_all(&self, all: Vec<(Url, Vec<Diagnostic>)>) {
        for (uri, diagnostics) in all {
            self.publish(uri, diagnostics).await;
        }
    }

    async fn register_file_watcher(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String("**/*.md".to_string()),
                kind: None,
            }],
        };

        let registration = Registration {
            id: "notedown-markdown-files".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };

        if let Err(err) = self.client.register_capability(vec![registration]).await {
            warn!("failed to register file watcher: {err}");
        }
    }

    async fn move_list_item(
        &self,
        state: &WorkspaceState,
        arguments: &[JsonValue],
        direction: Direction,
    ) -> Result<Option<JsonValue>> {
        let Some((uri, line)) = commands::parse_arguments(arguments) else {
            return Err(RpcError::invalid_params("expected [uri, line]"));
        };
        let Some(moved) = state.move_list_item(&uri, line, direction) else {
            return Ok(None);
        };

        let edit = WorkspaceEdit {
            changes: Some([(uri, vec![moved.edit])].into_iter().collect()),
            ..Default::default()
        };
        match self.client.apply_edit(edit).await {
            Ok(response) if response.applied => Ok(Some(JsonValue::from(moved.new_start_line))),
            Ok(response) => {
                debug!(reason = ?response.failure_reason, "list item move rejected");
                Ok(None)
            }
            Err(err) => {
                warn!("applyEdit failed: {err}");
                Ok(None)
            }
        }
    }
}

/// Workspace roots from the initialize request: every workspace folder, or
/// the root URI when the client sent no folders.
fn initial_roots(params: &InitializeParams) -> Vec<String> {
    match &params.workspace_folders {
        Some(folders) if !folders.is_empty() => {
            folders.iter().map(|folder| folder.uri.to_string()).collect()
        }
        _ => params
            .root_uri
            .iter()
            .map(|uri| uri.to_string())
            .collect(),
    }
}

fn load_settings(roots: &[String]) -> Settings {
    let Some(root) = roots.first().and_then(|root| root_from_str(root).ok()) else {
        return Settings::default();
    };
    Settings::new(&root).unwrap_or_else(|err| {
        warn!("failed to load settings, using defaults: {err}");
        Settings::default()
    })
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let roots = initial_roots(&params);
        let settings = load_settings(&roots);
        info!(?roots, "initializing workspace");

        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(WorkspaceState::new(settings)));
        *self.roots.write().unwrap_or_else(PoisonError::into_inner) = roots;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec!["[".to_string()]),
                    ..Default::default()
                }),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: COMMANDS.iter().map(|command| command.to_string()).collect(),
                    ..Default::default()
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "notedown".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let Some(state) = self.state() else {
            return;
        };
        let roots = self
            .roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match state.initialize(&roots, &self.cancel).await {
            Ok(summary) => {
                if summary.limit_reached {
                    self.client
                        .show_message(
                            MessageType::WARNING,
                            format!(
                                "notedown indexed only the first {} files",
                                summary.file_count
                            ),
                        )
                        .await;
                }
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!("notedown indexed {} files", summary.file_count),
                    )
                    .await;
            }
            Err(err) => warn!("workspace initialization failed: {err}"),
        }

        self.register_file_watcher().await;
        self.publish_all(state.tracked_diagnostics()).await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(state) = self.state() else {
            return;
        };
        let document = params.text_document;
        let diagnostics = state.did_open(document.uri.clone(), document.text, document.version);
        self.publish(document.uri, diagnostics).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(state) = self.state() else {
            return;
        };
        // full sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let uri = params.text_document.uri;

        if let Some(diagnostics) = state.did_change(&uri, change.text, params.text_document.version)
        {
            self.publish(uri, diagnostics).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let Some(state) = self.state() else {
            return;
        };
        let uri = params.text_document.uri;
        state.did_close(&uri);
        self.publish(uri, Vec::new()).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let Some(state) = self.state() else {
            return;
        };
        let changes: Vec<(Url, FileChangeType)> = params
            .changes
            .into_iter()
            .map(|event| (event.uri, event.typ))
            .collect();

        let published = state.did_change_watched_files(&changes);
        self.publish_all(published).await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let Some(state) = self.state() else {
            return;
        };
        let added: Vec<Url> = params.event.added.into_iter().map(|f| f.uri).collect();
        let removed: Vec<Url> = params.event.removed.into_iter().map(|f| f.uri).collect();

        let published = state
            .did_change_workspace_folders(&added, &removed, &self.cancel)
            .await;
        self.publish_all(published).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let Some(state) = self.state() else {
            return Ok(None);
        };
        let position = params.text_document_position;
        Ok(state.completion(&position.text_document.uri, position.position))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let Some(state) = self.state() else {
            return Ok(None);
        };
        let position = params.text_document_position_params;

        let location = state
            .goto_definition(&position.text_document.uri, position.position)
            .map_err(|err| RpcError {
                code: tower_lsp::jsonrpc::ErrorCode::InternalError,
                message: err.to_string().into(),
                data: None,
            })?;

        if location.is_some() {
            self.publish_all(state.tracked_diagnostics()).await;
        }
        Ok(location.map(GotoDefinitionResponse::Scalar))
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let Some(state) = self.state() else {
            return Ok(None);
        };
        let actions = state.code_actions(
            &params.text_document.uri,
            params.range,
            &params.context.diagnostics,
        );
        Ok((!actions.is_empty()).then_some(actions))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<JsonValue>> {
        let Some(state) = self.state() else {
            return Ok(None);
        };

        match params.command.as_str() {
            GET_LIST_ITEM_BOUNDARIES => {
                let Some((uri, line)) = commands::parse_arguments(&params.arguments) else {
                    return Err(RpcError::invalid_params("expected [uri, line]"));
                };
                Ok(state
                    .list_item_boundaries(&uri, line)
                    .and_then(|boundaries| serde_json::to_value(boundaries).ok()))
            }
            MOVE_LIST_ITEM_UP => {
                self.move_list_item(&state, &params.arguments, Direction::Up)
                    .await
            }
            MOVE_LIST_ITEM_DOWN => {
                self.move_list_item(&state, &params.arguments, Direction::Down)
                    .await
            }
            other => Err(RpcError::invalid_params(format!("unknown command {other}"))),
        }
    }
}
