//! Startup sequencing for the MCP clients of one chat session.
//!
//! A [`LaunchPlan`] lists every server to start, document server first. The
//! plan is opened strictly in order into a caller-owned [`ExitStack`]; when an
//! open fails the remaining entries are never attempted and the caller's
//! `close()` releases the ones that did open.

use futures_util::future::{BoxFuture, FutureExt};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::config::{Config, DEFAULT_DOC_SERVER_SCRIPT};
use super::exit_stack::{ExitStack, Release};
use super::launch::{bundled_doc_server, direct_launch, resolve_launch, LaunchDescriptor, LaunchMode};
use super::registry::{client_key, ClientRegistry, DOC_CLIENT_KEY};
use crate::error::AppError;
use crate::mcp::McpClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedClient {
    pub key: String,
    pub descriptor: LaunchDescriptor,
}

/// Ordered servers to start. Entry 0 is always the document server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    entries: Vec<PlannedClient>,
}

impl LaunchPlan {
    pub fn build<S: AsRef<str>>(config: &Config, scripts: &[S]) -> Result<Self, AppError> {
        let mode = LaunchMode::from_use_uv(config.use_uv);
        let resolve = |script: &str| {
            resolve_launch(mode, &config.interpreter, Path::new(script)).map_err(AppError::Launch)
        };

        let doc_descriptor = match config.doc_server_command.as_deref().and_then(direct_launch) {
            Some(descriptor) => descriptor,
            None => match &config.doc_server_script {
                Some(script) => resolve(script)?,
                None => default_doc_server(&resolve)?,
            },
        };

        let mut entries = vec![PlannedClient {
            key: DOC_CLIENT_KEY.to_string(),
            descriptor: doc_descriptor,
        }];
        for (index, script) in scripts.iter().enumerate() {
            let script = script.as_ref();
            entries.push(PlannedClient {
                key: client_key(index, script),
                descriptor: resolve(script)?,
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PlannedClient] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// With no override, a `mcp_server.py` in the working directory wins. The
/// bundled `doc-server` binary is the fallback.
fn default_doc_server<F>(resolve: &F) -> Result<LaunchDescriptor, AppError>
where
    F: Fn(&str) -> Result<LaunchDescriptor, AppError>,
{
    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| bundled_doc_server(&exe));
    match bundled {
        Some(server) if !Path::new(DEFAULT_DOC_SERVER_SCRIPT).is_file() => {
            Ok(LaunchDescriptor::new(server.to_string_lossy(), Vec::new()))
        }
        _ => resolve(DEFAULT_DOC_SERVER_SCRIPT),
    }
}

/// Opens one client connection from a launch descriptor.
pub trait Connector: Send + Sync {
    type Client: Release + 'static;

    fn connect<'a>(
        &'a self,
        key: &'a str,
        descriptor: &'a LaunchDescriptor,
    ) -> BoxFuture<'a, Result<Self::Client, String>>;
}

/// Spawns stdio MCP servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct McpConnector;

impl Connector for McpConnector {
    type Client = McpClient;

    fn connect<'a>(
        &'a self,
        key: &'a str,
        descriptor: &'a LaunchDescriptor,
    ) -> BoxFuture<'a, Result<McpClient, String>> {
        McpClient::connect(key, descriptor).boxed()
    }
}

/// The opened clients. `doc_client` is the same handle stored under
/// [`DOC_CLIENT_KEY`] in `registry`.
pub struct ClientSet<C> {
    pub doc_client: Arc<C>,
    pub registry: ClientRegistry<C>,
}

pub async fn open_clients<K: Connector>(
    stack: &mut ExitStack,
    connector: &K,
    plan: &LaunchPlan,
) -> Result<ClientSet<K::Client>, AppError> {
    let mut registry = ClientRegistry::new();
    let mut doc_client = None;

    for planned in plan.entries() {
        let key = planned.key.as_str();
        info!(client_id = %key, command = %planned.descriptor.display(), "Starting MCP server");
        let client = stack
            .enter(key, connector.connect(key, &planned.descriptor))
            .await
            .map_err(|message| AppError::Connect {
                key: key.to_string(),
                message,
            })?;
        if key == DOC_CLIENT_KEY {
            doc_client = Some(client.clone());
        }
        registry.insert(key, client).map_err(AppError::Registry)?;
    }

    let doc_client = doc_client
        .ok_or_else(|| AppError::Registry(format!("Launch plan has no {DOC_CLIENT_KEY} entry")))?;
    Ok(ClientSet {
        doc_client,
        registry,
    })
}
