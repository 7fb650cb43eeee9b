use crate::core::config::ConfigError;

/// Errors that end a chat session.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to resolve server script: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Failed to connect MCP client '{key}': {message}")]
    Connect { key: String, message: String },

    #[error("Client registry error: {0}")]
    Registry(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to release MCP clients: {0}")]
    Release(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_step() {
        let err = AppError::Connect {
            key: "client_0_a.py".to_string(),
            message: "spawn failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to connect MCP client 'client_0_a.py': spawn failed"
        );

        let err: AppError = ConfigError::Missing {
            name: "CLAUDE_MODEL",
        }
        .into();
        assert_eq!(err.to_string(), "Error: CLAUDE_MODEL cannot be empty. Update .env");
    }
}
