use crate::core::launch::LaunchDescriptor;
use rust_mcp_schema::schema_utils::{
    ClientMessage, FromMessage, MessageFromClient, NotificationFromClient, RequestFromClient,
    ServerMessage,
};
use rust_mcp_schema::RequestId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

const STDIO_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const STDIO_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const STDIO_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ServerMessage>>>>;

/// Newline-delimited JSON-RPC connection to a spawned MCP server.
pub(crate) struct StdioClient {
    stdin: Mutex<Option<ChildStdin>>,
    child: Mutex<Option<Child>>,
    pending: PendingMap,
    next_request_id: AtomicI64,
    server_id: String,
}

impl StdioClient {
    pub(crate) async fn spawn(
        server_id: String,
        descriptor: &LaunchDescriptor,
    ) -> Result<Arc<Self>, String> {
        debug!(
            server_id = %server_id,
            command = %descriptor.command,
            args = ?descriptor.args,
            "Starting MCP stdio server"
        );
        let mut cmd = Command::new(&descriptor.command);
        cmd.args(&descriptor.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| format!("Failed to start `{}`: {err}", descriptor.display()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| "Unable to retrieve stdin.".to_string())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| "Unable to retrieve stdout.".to_string())?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| "Unable to retrieve stderr.".to_string())?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let client = Arc::new(Self {
            stdin: Mutex::new(Some(stdin)),
            child: Mutex::new(Some(child)),
            pending: pending.clone(),
            next_request_id: AtomicI64::new(0),
            server_id,
        });

        Self::spawn_stdout_reader(pending, stdout, client.server_id.clone());
        Self::spawn_stderr_drain(stderr, client.server_id.clone());

        Ok(client)
    }

    fn spawn_stdout_reader(
        pending: PendingMap,
        stdout: tokio::process::ChildStdout,
        server_id: String,
    ) {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let value = match serde_json::from_str::<serde_json::Value>(&line) {
                    Ok(value) => value,
                    Err(_) => {
                        debug!(server_id = %server_id, line = %line, "Ignoring non-JSON stdout line");
                        continue;
                    }
                };
                if let Some(items) = value.as_array() {
                    for item in items {
                        if let Ok(message) = serde_json::from_value::<ServerMessage>(item.clone()) {
                            Self::dispatch_message(&pending, message, &server_id).await;
                        }
                    }
                } else if let Ok(message) = serde_json::from_value::<ServerMessage>(value) {
                    Self::dispatch_message(&pending, message, &server_id).await;
                }
            }
            debug!(server_id = %server_id, "MCP stdio stdout closed");
            // Dropping the senders wakes every waiter with a closed-channel error.
            pending.lock().await.clear();
        });
    }

    fn spawn_stderr_drain(stderr: tokio::process::ChildStderr, server_id: String) {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(server_id = %server_id, "stderr: {line}");
            }
        });
    }

    async fn dispatch_message(pending: &PendingMap, message: ServerMessage, server_id: &str) {
        match &message {
            ServerMessage::Response(response) => {
                debug!(
                    server_id = %server_id,
                    response_id = ?response.id,
                    "Received MCP stdio response"
                );
                if let Some(tx) = pending.lock().await.remove(&response.id) {
                    let _ = tx.send(message);
                }
            }
            ServerMessage::Error(error) => {
                debug!(
                    server_id = %server_id,
                    error_id = ?error.id,
                    error_code = error.error.code,
                    "Received MCP stdio error"
                );
                if let Some(id) = error.id.as_ref() {
                    if let Some(tx) = pending.lock().await.remove(id) {
                        let _ = tx.send(message);
                    }
                }
            }
            ServerMessage::Request(request) => {
                // No client capabilities are advertised, so servers have no
                // business sending requests; they are logged and dropped.
                debug!(
                    server_id = %server_id,
                    method = %request.method(),
                    "Ignoring MCP server request"
                );
            }
            ServerMessage::Notification(_) => {
                debug!(server_id = %server_id, "Received MCP stdio notification");
            }
        }
    }

    fn next_request_id(&self) -> RequestId {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        RequestId::Integer(id)
    }

    pub(crate) async fn send_request(
        &self,
        request: RequestFromClient,
    ) -> Result<ServerMessage, String> {
        let request_id = self.next_request_id();
        debug!(server_id = %self.server_id, request_id = ?request_id, "Sending MCP stdio request");
        let message = ClientMessage::from_message(
            MessageFromClient::RequestFromClient(request),
            Some(request_id.clone()),
        )
        .map_err(|err| err.to_string())?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        if let Err(err) = self.write_message(&message).await {
            self.pending.lock().await.remove(&request_id);
            return Err(err);
        }

        match tokio::time::timeout(STDIO_REQUEST_TIMEOUT, rx).await {
            Ok(Ok(message)) => {
                debug!(request_id = ?request_id, "MCP stdio response received");
                Ok(message)
            }
            Ok(Err(_)) => Err("MCP stdio response channel closed.".to_string()),
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                debug!(
                    request_id = ?request_id,
                    timeout_secs = STDIO_REQUEST_TIMEOUT.as_secs(),
                    "MCP stdio request timed out"
                );
                Err("MCP stdio request timed out.".to_string())
            }
        }
    }

    pub(crate) async fn send_notification(
        &self,
        notification: NotificationFromClient,
    ) -> Result<(), String> {
        let message = ClientMessage::from_message(
            MessageFromClient::NotificationFromClient(notification),
            None,
        )
        .map_err(|err| err.to_string())?;
        self.write_message(&message).await
    }

    async fn write_message(&self, message: &ClientMessage) -> Result<(), String> {
        let payload = serde_json::to_string(message).map_err(|err| err.to_string())?;
        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return Err("MCP client not connected.".to_string());
        };
        debug!(server_id = %self.server_id, bytes = payload.len(), "Writing MCP stdio message");
        tokio::time::timeout(STDIO_WRITE_TIMEOUT, stdin.write_all(payload.as_bytes()))
            .await
            .map_err(|_| "Timed out writing MCP stdio message.".to_string())?
            .map_err(|err| err.to_string())?;
        tokio::time::timeout(STDIO_WRITE_TIMEOUT, stdin.write_all(b"\n"))
            .await
            .map_err(|_| "Timed out writing MCP stdio newline.".to_string())?
            .map_err(|err| err.to_string())?;
        tokio::time::timeout(STDIO_WRITE_TIMEOUT, stdin.flush())
            .await
            .map_err(|_| "Timed out flushing MCP stdio message.".to_string())?
            .map_err(|err| err.to_string())?;
        Ok(())
    }

    /// Closes stdin so the server can exit on its own, then kills it if it
    /// is still running after the grace period.
    pub(crate) async fn shutdown(&self) -> Result<(), String> {
        drop(self.stdin.lock().await.take());

        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        match tokio::time::timeout(STDIO_SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(server_id = %self.server_id, %status, "MCP server exited");
                Ok(())
            }
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => {
                debug!(server_id = %self.server_id, "MCP server did not exit; killing");
                child.kill().await.map_err(|err| err.to_string())
            }
        }
    }
}
