use std::process::ExitCode;

use mcp_chat::core::runtime::{build_runtime, run_to_completion};
use mcp_chat::doc_server::{serve, DocServer};
use mcp_chat::logging;

fn main() -> ExitCode {
    logging::init();
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("❌ Error: Failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut server = DocServer::default();
    let result = run_to_completion(runtime, async {
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        let mut output = tokio::io::stdout();
        serve(&mut server, input, &mut output).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ Error: {err}");
            ExitCode::FAILURE
        }
    }
}
