//! Startup configuration read from the process environment.
//!
//! Values come from real environment variables first and from a `.env` file
//! in the working directory second (see [`load_dotenv`]). The two credentials
//! the chat session cannot run without are validated eagerly so the process
//! can stop before any MCP server is spawned.

use std::env;
use std::path::{Path, PathBuf};

pub const CLAUDE_MODEL_VAR: &str = "CLAUDE_MODEL";
pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const USE_UV_VAR: &str = "USE_UV";
pub const ANTHROPIC_BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";
pub const MCP_INTERPRETER_VAR: &str = "MCP_INTERPRETER";
pub const DOC_SERVER_SCRIPT_VAR: &str = "DOC_SERVER_SCRIPT";
pub const DOC_SERVER_COMMAND_VAR: &str = "DOC_SERVER_COMMAND";

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_DOC_SERVER_SCRIPT: &str = "mcp_server.py";

/// Errors raised while validating the startup environment.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable was unset or empty.
    #[error("Error: {name} cannot be empty. Update .env")]
    Missing {
        /// Name of the offending environment variable.
        name: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub claude_model: String,
    pub anthropic_api_key: String,
    pub use_uv: bool,
    pub anthropic_base_url: String,
    pub interpreter: String,
    /// Document server script, started like any other server script.
    pub doc_server_script: Option<String>,
    /// Document server executable, run directly. Wins over the script.
    pub doc_server_command: Option<String>,
}

/// Loads `.env` from the working directory without overriding variables that
/// are already set. Returns the file that was loaded, or `None` when there is
/// none. Runs before logging is set up, so the caller reports the outcome.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// [`load_dotenv`] for an explicit file.
pub fn load_dotenv_from(path: &Path) -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(Some(path.to_path_buf())),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Logs the result of [`load_dotenv`]. A file that fails to parse is only
/// loaded up to the bad line, so that case is a warning.
pub fn report_dotenv(loaded: &Result<Option<PathBuf>, dotenvy::Error>) {
    match loaded {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "Could not load .env file; later entries were skipped"),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let claude_model = require(&lookup, CLAUDE_MODEL_VAR)?;
        let anthropic_api_key = require(&lookup, ANTHROPIC_API_KEY_VAR)?;
        let use_uv = parse_use_uv(lookup(USE_UV_VAR).as_deref());

        Ok(Self {
            claude_model,
            anthropic_api_key,
            use_uv,
            anthropic_base_url: optional(&lookup, ANTHROPIC_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            interpreter: optional(&lookup, MCP_INTERPRETER_VAR)
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            doc_server_script: optional(&lookup, DOC_SERVER_SCRIPT_VAR),
            doc_server_command: optional(&lookup, DOC_SERVER_COMMAND_VAR),
        })
    }
}

/// Only the literal `"1"` enables the package-runner launch mode.
pub fn parse_use_uv(value: Option<&str>) -> bool {
    value == Some("1")
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { name }),
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}
