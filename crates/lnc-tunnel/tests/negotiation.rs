//! Negotiation scenarios against a scripted relay and an in-memory node.

use lnc_core::{
    CancelReason, Chain, InMemoryLightning, LncError, NodeInfo, NodeSnapshot, RequestContext,
};
use lnc_tunnel::{
    ConnectRequest, ConnectionSlot, ConnectionSummary, NegotiatorConfig, RelayTls,
    ScriptedMailbox, SkipReason, TunnelNegotiator,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const PHRASE: &str = "abandon ability able about above absent absorb abstract absurd abuse";
const NODE_PUBKEY: &str = "03a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";

fn node() -> Arc<InMemoryLightning> {
    Arc::new(InMemoryLightning::new(NodeSnapshot {
        info: NodeInfo {
            identity_pubkey: NODE_PUBKEY.into(),
            alias: "carol".into(),
            version: "0.18.0-beta".into(),
            num_peers: 4,
            num_active_channels: 3,
            chains: vec![Chain {
                chain: "bitcoin".into(),
                network: "regtest".into(),
            }],
            ..Default::default()
        },
        ..Default::default()
    }))
}

fn request() -> ConnectRequest {
    ConnectRequest {
        pairing_phrase: PHRASE.into(),
        password: "correct horse".into(),
        ..Default::default()
    }
}

fn negotiator(mailbox: Arc<ScriptedMailbox>) -> TunnelNegotiator {
    TunnelNegotiator::new(mailbox, NegotiatorConfig::default())
}

#[tokio::test(start_paused = true)]
async fn connects_and_reports_node_summary() {
    let node = node();
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let negotiated = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), request())
        .await
        .map_err(|e| e.to_string())
        .unwrap();

    assert_eq!(negotiated.node_info.identity_pubkey, NODE_PUBKEY);
    assert_eq!(negotiated.node_info.alias, "carol");
    assert_eq!(negotiated.node_info.num_active_channels, 3);
    assert_eq!(negotiated.node_info.num_peers, 4);
    assert_eq!(
        negotiated.relay.address.as_str(),
        "mailbox.terminal.lightning.today:443"
    );
    assert!(negotiated.relay.tls.verifies_certificates());
    assert!(negotiated.handshake.remote_key_received());
    assert!(negotiated.handshake.auth_received);
    assert!(!negotiated.handshake.incomplete);
    assert_eq!(node.calls(), vec!["get_info"]);
    assert_eq!(mailbox.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn nine_word_phrase_never_reaches_relay() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()));
    let req = ConnectRequest {
        pairing_phrase: "only nine words here for testing purposes total".into(),
        ..request()
    };
    let err = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), req)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, LncError::InvalidPairingPhrase(_)));
    assert_eq!(mailbox.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn irregular_whitespace_phrase_is_attempted() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()));
    let req = ConnectRequest {
        pairing_phrase: format!("\t {}  \n", PHRASE.replace(' ', "   ")),
        ..request()
    };
    let result = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), req)
        .await;

    assert!(result.is_ok());
    let opened = mailbox.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].normalized_phrase, PHRASE);
    assert_eq!(opened[0].local_key_hex.len(), 66);
}

#[tokio::test(start_paused = true)]
async fn empty_password_never_reaches_relay() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()));
    let req = ConnectRequest {
        password: String::new(),
        ..request()
    };
    let err = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), req)
        .await
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "password is required");
    assert_eq!(mailbox.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_connector_fails_without_rpc() {
    let node = node();
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)).without_connector());
    let err = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), request())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, LncError::ConnectionFailed(_)));
    assert_eq!(node.call_count(), 0);
    assert_eq!(mailbox.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn relay_open_failure_is_connection_failure() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()).failing_open("relay unreachable"));
    let err = negotiator(mailbox)
        .negotiate(&RequestContext::new("lnc_connect"), request())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, LncError::ConnectionFailed(_)));
    assert!(!err.is_cancellation());
    let msg = err.to_string();
    assert!(msg.contains("failed to create mailbox connection"));
    assert!(msg.contains("relay unreachable"));
}

#[tokio::test(start_paused = true)]
async fn connector_failure_is_connection_failure() {
    let node = node();
    let mailbox =
        Arc::new(ScriptedMailbox::new(Arc::clone(&node)).failing_connect("tunnel collapsed"));
    let err = negotiator(mailbox)
        .negotiate(&RequestContext::new("lnc_connect"), request())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, LncError::ConnectionFailed(_)));
    assert!(err.to_string().contains("tunnel collapsed"));
    assert_eq!(node.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn liveness_failure_closes_connection() {
    let node = node();
    node.fail("get_info");
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let err = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), request())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, LncError::ConnectionFailed(_)));
    assert!(err.to_string().contains("connected but failed to get node info"));
    assert_eq!(mailbox.connect_count(), 1);
    assert_eq!(mailbox.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn liveness_timeout_leaves_nothing_installed() {
    let node = node();
    node.delay_get_info(Duration::from_secs(120));
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let slot = ConnectionSlot::new();

    let result = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), request())
        .await;
    match result {
        Ok(negotiated) => {
            slot.install(
                negotiated.connection,
                ConnectionSummary {
                    node_pubkey: negotiated.node_info.identity_pubkey,
                    alias: negotiated.node_info.alias,
                    mailbox: negotiated.relay.address.to_string(),
                },
            )
            .unwrap();
            panic!("liveness timeout must not produce a connection");
        }
        Err(err) => {
            assert!(matches!(err, LncError::ConnectionFailed(_)));
            assert!(err.to_string().contains("timed out"));
        }
    }

    assert_eq!(mailbox.close_count(), 1);
    assert!(!slot.disconnect().unwrap());
}

#[tokio::test(start_paused = true)]
async fn abandoned_negotiation_closes_connection() {
    let node = node();
    node.delay_get_info(Duration::from_secs(20));
    let mailbox = Arc::new(ScriptedMailbox::new(Arc::clone(&node)));
    let n = negotiator(Arc::clone(&mailbox));

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        n.negotiate(&RequestContext::new("lnc_connect"), request()),
    )
    .await;

    assert!(finished.is_err());
    assert_eq!(mailbox.connect_count(), 1);
    assert_eq!(mailbox.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_grace_period() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()));
    let ctx = RequestContext::new("lnc_connect").with_timeout(Duration::from_secs(1));
    let err = negotiator(Arc::clone(&mailbox))
        .negotiate(&ctx, request())
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        LncError::Cancelled(CancelReason::DeadlineExceeded)
    ));
    assert!(err.is_cancellation());
    assert_eq!(mailbox.open_count(), 1);
    assert_eq!(mailbox.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_callback_wait() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()).silent_callbacks());
    let ctx = RequestContext::new("lnc_connect").with_timeout(Duration::from_secs(5));
    let err = negotiator(Arc::clone(&mailbox))
        .negotiate(&ctx, request())
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        LncError::Cancelled(CancelReason::DeadlineExceeded)
    ));
    assert_eq!(mailbox.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_negotiation() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()));
    let (tx, rx) = watch::channel(false);
    let ctx = RequestContext::new("lnc_connect").with_shutdown(rx);

    let task = {
        let mailbox = Arc::clone(&mailbox);
        tokio::spawn(async move { negotiator(mailbox).negotiate(&ctx, request()).await.err() })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(true).unwrap();

    let err = task.await.unwrap().unwrap();
    assert!(matches!(err, LncError::Cancelled(CancelReason::Shutdown)));
    assert_eq!(mailbox.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn incomplete_handshake_still_proceeds() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()).silent_callbacks());
    let started = tokio::time::Instant::now();
    let negotiated = negotiator(Arc::clone(&mailbox))
        .negotiate(&RequestContext::new("lnc_connect"), request())
        .await
        .map_err(|e| e.to_string())
        .unwrap();

    assert!(negotiated.handshake.incomplete);
    assert!(!negotiated.handshake.remote_key_received());
    assert!(!negotiated.handshake.auth_received);
    assert!(started.elapsed() >= Duration::from_secs(8));
    assert_eq!(mailbox.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_connector_outlives_request_deadline() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()).connect_delay(Duration::from_secs(20)));
    let ctx = RequestContext::new("lnc_connect").with_timeout(Duration::from_secs(10));
    let result = negotiator(mailbox).negotiate(&ctx, request()).await;

    assert!(result.is_ok());
    assert!(ctx.is_expired());
}

#[tokio::test(start_paused = true)]
async fn loopback_relay_skips_verification_for_that_session_only() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()));
    let n = negotiator(Arc::clone(&mailbox));

    let local = ConnectRequest {
        mailbox: Some("127.0.0.1:11110".into()),
        ..request()
    };
    n.negotiate(&RequestContext::new("lnc_connect"), local)
        .await
        .map_err(|e| e.to_string())
        .unwrap();
    n.negotiate(&RequestContext::new("lnc_connect"), request())
        .await
        .map_err(|e| e.to_string())
        .unwrap();

    let opened = mailbox.opened();
    assert_eq!(
        opened[0].relay.tls,
        RelayTls::SkipVerification {
            reason: SkipReason::Loopback
        }
    );
    assert_eq!(opened[1].relay.tls, RelayTls::Verified);
}

#[tokio::test(start_paused = true)]
async fn reconnect_supersedes_previous_connection() {
    let mailbox = Arc::new(ScriptedMailbox::new(node()));
    let n = negotiator(Arc::clone(&mailbox));
    let slot = ConnectionSlot::new();

    for _ in 0..2 {
        let negotiated = n
            .negotiate(&RequestContext::new("lnc_connect"), request())
            .await
            .map_err(|e| e.to_string())
            .unwrap();
        slot.install(
            negotiated.connection,
            ConnectionSummary {
                node_pubkey: negotiated.node_info.identity_pubkey,
                alias: negotiated.node_info.alias,
                mailbox: negotiated.relay.address.to_string(),
            },
        )
        .unwrap();
    }

    assert_eq!(mailbox.close_count(), 1);
    assert!(slot.disconnect().unwrap());
    assert_eq!(mailbox.close_count(), 2);
    assert!(!slot.disconnect().unwrap());
    assert_eq!(mailbox.close_count(), 2);
}
