use std::io;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tower_lsp::{LspService, Server};
use tracing_subscriber::{fmt, EnvFilter};

use notedown::config::Settings;
use notedown::query::{list_documents, ListDocumentsRequest};
use notedown::scanner::root_from_str;
use notedown::server::Backend;

#[derive(Parser, Debug)]
#[command(name = "notedown", version, about)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the language server on stdio (default)
    Lsp,
    /// List documents under the given roots and print them as JSON
    Query {
        /// Workspace roots, as absolute paths or file:// URIs
        #[arg(required = true)]
        roots: Vec<String>,
        /// Filter expression in its JSON form
        #[arg(long)]
        filter: Option<String>,
        /// Emit documents as they finish parsing instead of in path order
        #[arg(long)]
        unordered: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout carries the protocol
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run_query(roots: Vec<String>, filter: Option<String>, unordered: bool) -> Result<()> {
    let filter = filter
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|err| anyhow!("filter is not valid JSON: {err}"))?;

    let settings = match roots.first().map(|root| root_from_str(root)) {
        Some(Ok(root)) => Settings::new(&root)?,
        _ => Settings::default(),
    };

    let request = ListDocumentsRequest {
        roots,
        filter,
        ordered: unordered.then_some(false),
    };

    let response = list_documents(request, &settings, CancellationToken::new()).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command.unwrap_or(Command::Lsp) {
        Command::Lsp => {
            let stdin = tokio::io::stdin();
            let stdout = tokio::io::stdout();

            let (service, socket) = LspService::new(Backend::new);
            Server::new(stdin, stdout, socket).serve(service).await;
            Ok(())
        }
        Command::Query {
            roots,
            filter,
            unordered,
        } => run_query(roots, filter, unordered).await,
    }
}
