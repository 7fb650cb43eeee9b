//! Terminal chat client that lets Claude use tools, prompts, and documents
//! served by Model Context Protocol servers.
//!
//! The crate is organized around a few collaborating layers:
//! - [`core`] owns startup: environment configuration, launch descriptors,
//!   the client registry, the release stack, and the runtime policy.
//! - [`mcp`] speaks JSON-RPC to stdio MCP servers.
//! - [`llm`] and [`api`] call the Anthropic Messages API.
//! - [`chat`] runs the tool-use loop and the document-aware CLI chat.
//! - [`doc_server`] is the document MCP server shipped as the `doc-server`
//!   binary.
//!
//! The `mcp-chat` binary routes through [`crate::cli::main`].

pub mod api;
pub mod chat;
pub mod cli;
pub mod core;
pub mod doc_server;
pub mod error;
pub mod llm;
pub mod logging;
pub mod mcp;
