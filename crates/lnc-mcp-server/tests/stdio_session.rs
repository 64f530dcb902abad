//! A client session over an in-memory pipe, end to end through the serve
//! loop: pairing, queries, and the shutdown sequence.

use lnc_core::{Channel, InMemoryLightning, NodeInfo, NodeSnapshot};
use lnc_mcp_server::{initialize_daemon_with, Daemon, ServeExit, ServerConfig};
use lnc_tunnel::{MailboxDialer, ScriptedMailbox};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};

const PHRASE: &str = "abandon ability able about above absent absorb abstract absurd abuse";

fn node() -> Arc<InMemoryLightning> {
    Arc::new(InMemoryLightning::new(NodeSnapshot {
        info: NodeInfo {
            identity_pubkey: "02abcdef".into(),
            alias: "erin".into(),
            num_active_channels: 1,
            ..Default::default()
        },
        channels: vec![Channel {
            active: true,
            chan_id: 42,
            ..Default::default()
        }],
        ..Default::default()
    }))
}

fn daemon_over(mailbox: &Arc<ScriptedMailbox>) -> Daemon {
    daemon_with(ServerConfig::default(), mailbox)
}

fn daemon_with(config: ServerConfig, mailbox: &Arc<ScriptedMailbox>) -> Daemon {
    let dialer: Arc<dyn MailboxDialer> = mailbox.clone();
    initialize_daemon_with(config, dialer).unwrap()
}

struct Client {
    writer: WriteHalf<DuplexStream>,
    responses: Lines<BufReader<ReadHalf<DuplexStream>>>,
}

impl Client {
    async fn send(&mut self, request: Value) {
        let mut line = request.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = self.responses.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    async fn call_tool(&mut self, id: u64, name: &str, args: Value) -> Value {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": args}
        }))
        .await;
        self.recv().await
    }

    async fn close_input(&mut self) {
        self.writer.shutdown().await.unwrap();
    }
}

fn pipe() -> (Client, ReadHalf<DuplexStream>, WriteHalf<DuplexStream>) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (server_read, server_write) = tokio::io::split(server_io);
    let client = Client {
        writer: client_write,
        responses: BufReader::new(client_read).lines(),
    };
    (client, server_read, server_write)
}

fn text_of(response: &Value) -> String {
    response["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test(start_paused = true)]
async fn pair_query_and_close_on_eof() {
    let node = node();
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let daemon = daemon_over(&mailbox);
    let (mut client, server_read, server_write) = pipe();

    let serve = daemon.serve(
        BufReader::new(server_read),
        server_write,
        std::future::pending(),
    );
    let session = async {
        client
            .send(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .await;
        let init = client.recv().await;
        assert_eq!(init["result"]["serverInfo"]["name"], "lnc-mcp-server");

        let connected = client
            .call_tool(2, "lnc_connect", json!({"pairingPhrase": PHRASE, "password": "pw"}))
            .await;
        assert_eq!(connected["result"]["isError"], false, "{}", connected);
        let payload: Value = serde_json::from_str(&text_of(&connected)).unwrap();
        assert_eq!(payload["alias"], "erin");
        assert!(daemon.slot().is_connected());

        let channels = client.call_tool(3, "lnc_list_channels", json!({})).await;
        let payload: Value = serde_json::from_str(&text_of(&channels)).unwrap();
        assert_eq!(payload["channels"][0]["chan_id"], "42");

        client.close_input().await;
        assert!(client.responses.next_line().await.unwrap().is_none());
    };

    let (exit, ()) = tokio::join!(serve, session);
    assert_eq!(exit.unwrap(), ServeExit::InputClosed);
    assert!(!daemon.slot().is_connected());
    assert_eq!(mailbox.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_in_flight_requests() {
    let node = node();
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let daemon = daemon_over(&mailbox);
    let (mut client, server_read, server_write) = pipe();

    let serve = daemon.serve(
        BufReader::new(server_read),
        server_write,
        std::future::pending(),
    );
    let session = async {
        let connected = client
            .call_tool(1, "lnc_connect", json!({"pairingPhrase": PHRASE, "password": "pw"}))
            .await;
        assert_eq!(connected["result"]["isError"], false);

        node.delay_get_info(Duration::from_secs(600));
        client
            .send(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "lnc_get_info"}
            }))
            .await;
        client.close_input().await;

        let cancelled = client.recv().await;
        assert_eq!(cancelled["id"], 2);
        assert_eq!(cancelled["result"]["isError"], true);
        assert!(text_of(&cancelled).starts_with("operation cancelled"));
    };

    let (exit, ()) = tokio::join!(serve, session);
    assert_eq!(exit.unwrap(), ServeExit::InputClosed);
    assert_eq!(mailbox.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_signal_ends_session_and_closes_connection() {
    let node = node();
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let daemon = daemon_over(&mailbox);
    let (mut client, server_read, server_write) = pipe();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let serve = daemon.serve(BufReader::new(server_read), server_write, async {
        let _ = stop_rx.await;
    });
    let session = async {
        let connected = client
            .call_tool(1, "lnc_connect", json!({"pairingPhrase": PHRASE, "password": "pw"}))
            .await;
        assert_eq!(connected["result"]["isError"], false);
        stop_tx.send(()).unwrap();
        assert!(client.responses.next_line().await.unwrap().is_none());
    };

    let (exit, ()) = tokio::join!(serve, session);
    assert_eq!(exit.unwrap(), ServeExit::Stopped);
    assert!(daemon.server().is_shutting_down());
    assert_eq!(mailbox.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_timeout_closes_connection_still_in_liveness_check() {
    let node = node();
    node.delay_get_info(Duration::from_secs(20));
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let mut config = ServerConfig::default();
    config.shutdown_timeout_secs = 1;
    let daemon = daemon_with(config, &mailbox);
    let (mut client, server_read, server_write) = pipe();

    let serve = daemon.serve(
        BufReader::new(server_read),
        server_write,
        std::future::pending(),
    );
    let session = async {
        client
            .send(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {
                    "name": "lnc_connect",
                    "arguments": {"pairingPhrase": PHRASE, "password": "pw"}
                }
            }))
            .await;
        // Past the grace wait and into the delayed get_info.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(mailbox.connect_count(), 1);
        client.close_input().await;
        while client.responses.next_line().await.unwrap().is_some() {}
    };

    let (exit, ()) = tokio::join!(serve, session);
    assert_eq!(exit.unwrap(), ServeExit::InputClosed);
    assert_eq!(mailbox.connect_count(), 1);
    assert_eq!(mailbox.close_count(), 1);
    assert!(!daemon.slot().is_connected());
}
