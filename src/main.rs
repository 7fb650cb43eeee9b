use std::process::ExitCode;

fn main() -> ExitCode {
    mcp_chat::cli::main()
}
