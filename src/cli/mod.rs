//! Command-line entry point.
//!
//! Startup order: `.env` and environment validation, runtime policy, then a
//! single async session that opens every MCP server inside one
//! [`ExitStack`] and always closes it before returning.

pub mod app;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::info;

use crate::chat::CliChat;
use crate::core::config::{load_dotenv, report_dotenv, Config};
use crate::core::exit_stack::ExitStack;
use crate::core::runtime::{build_runtime, configure_event_loop, run_to_completion};
use crate::core::session::{open_clients, Connector, LaunchPlan, McpConnector};
use crate::error::AppError;
use crate::llm::{Claude, LanguageModel};
use crate::logging;
use crate::mcp::McpService;
use app::CliApp;

#[derive(Parser, Debug)]
#[command(name = "mcp-chat", version)]
#[command(about = "Chat with Claude using tools, prompts, and documents served over MCP")]
#[command(
    long_about = "Starts the document MCP server plus any extra MCP server scripts given on \
the command line, then opens an interactive chat.\n\n\
Environment Variables (a .env file in the working directory is read too):\n\
  CLAUDE_MODEL        Model to chat with (required)\n\
  ANTHROPIC_API_KEY   API key (required)\n\
  USE_UV              Set to 1 to start servers with `uv run`\n\
  MCP_INTERPRETER     Interpreter for server scripts (default python3)\n\
  DOC_SERVER_SCRIPT   Document server script (default ./mcp_server.py if present)\n\
  DOC_SERVER_COMMAND  Document server executable, run directly\n\
                      (default: the bundled doc-server binary)\n\
  ANTHROPIC_BASE_URL  Custom API base URL\n\n\
Input:\n\
  @<doc_id>           Include a document in the question\n\
  /<prompt> <doc_id>  Run a server prompt against a document\n\
  /                   List prompts\n\
  exit, quit, Ctrl+C  Leave the chat"
)]
pub struct Args {
    /// Additional MCP server scripts, started in order after the document server
    #[arg(value_name = "SERVER_SCRIPT")]
    pub server_scripts: Vec<String>,
}

pub fn main() -> ExitCode {
    let args = Args::parse();
    // `.env` may set RUST_LOG, so it is read before logging starts and
    // reported after.
    let dotenv = load_dotenv();
    logging::init();
    report_dotenv(&dotenv);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    configure_event_loop(cfg!(windows));
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("❌ Error: Failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run_to_completion(runtime, run_app(&config, &args.server_scripts)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ Error: {err}");
            ExitCode::FAILURE
        }
    }
}

pub async fn run_app(config: &Config, scripts: &[String]) -> Result<(), AppError> {
    let claude = Claude::new(
        &config.claude_model,
        &config.anthropic_api_key,
        &config.anthropic_base_url,
    )
    .map_err(AppError::Llm)?;
    let plan = LaunchPlan::build(config, scripts)?;
    info!(model = %config.claude_model, servers = plan.len(), "Starting chat session");

    let mut stdout = tokio::io::stdout();
    run_session(
        &McpConnector,
        Arc::new(claude),
        &plan,
        tokio::io::BufReader::new(tokio::io::stdin()),
        &mut stdout,
    )
    .await
}

/// Opens every planned client, runs the chat over `input`/`output`, and
/// releases the clients in reverse order on every exit path. An error from
/// the session wins over an error from releasing.
pub async fn run_session<K, L, R, W>(
    connector: &K,
    llm: Arc<L>,
    plan: &LaunchPlan,
    input: R,
    output: &mut W,
) -> Result<(), AppError>
where
    K: Connector,
    K::Client: McpService,
    L: LanguageModel,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stack = ExitStack::new();
    let result = async {
        let clients = open_clients(&mut stack, connector, plan).await?;
        let chat = CliChat::new(clients.doc_client, clients.registry, llm);
        let mut cli = CliApp::new(chat);
        cli.initialize().await?;
        cli.run_with(input, output).await
    }
    .await;

    let released = stack.close().await.map_err(AppError::Release);
    result.and(released)
}
