use super::*;

fn descriptor(command: &str, args: &[&str]) -> LaunchDescriptor {
    LaunchDescriptor::new(command, args.iter().map(|a| a.to_string()).collect())
}

#[test]
fn client_details_advertise_latest_protocol() {
    let details = client_details();
    assert_eq!(details.protocol_version, LATEST_PROTOCOL_VERSION);
    assert_eq!(details.client_info.name, "mcp-chat");
}

#[tokio::test]
async fn missing_command_fails_to_connect() {
    let err = McpClient::connect("alpha", &descriptor("/definitely-missing-command", &[]))
        .await
        .err()
        .expect("spawn should fail");

    assert!(
        err.starts_with("Failed to start `/definitely-missing-command`"),
        "unexpected error: {err}"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn server_that_exits_immediately_fails_handshake() {
    let err = McpClient::connect("beta", &descriptor("sh", &["-c", "exit 0"]))
        .await
        .err()
        .expect("handshake should fail");

    assert!(
        err.starts_with("MCP initialize failed for beta"),
        "unexpected error: {err}"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn non_protocol_output_is_ignored_until_a_response_arrives() {
    // Prints noise, then a valid initialize response for request id 0, then
    // waits for stdin to close.
    let script = r#"read _init
echo 'starting up...'
echo '{"jsonrpc":"2.0","id":0,"result":{"protocolVersion":"2025-11-25","capabilities":{},"serverInfo":{"name":"sh-server","version":"0.0.1"}}}'
cat > /dev/null"#;

    let client = McpClient::connect("gamma", &descriptor("sh", &["-c", script]))
        .await
        .expect("handshake succeeds");

    assert_eq!(client.id(), "gamma");
    assert_eq!(client.server_details().server_info.name, "sh-server");
    client.close().await.expect("close succeeds");
    client.close().await.expect("second close is a no-op");
}
