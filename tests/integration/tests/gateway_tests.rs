//! Gateway session lifecycle tests
//!
//! Each test runs a shard session against an in-process mock gateway and
//! scripts the server side of the protocol.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use chat_common::WireEncoding;
use chat_gateway_client::shard::SessionStartLimit;
use chat_gateway_client::{CloseCode, Codec, GatewayError, GatewayEvent, GatewayMessage};
use integration_tests::{
    fixtures, message_body, open_limit, ready_body, test_config, MockGateway, MockRest, TestShard,
};
use serde_json::json;
use std::time::Duration;

// ============================================================================
// End-to-end lifecycle
// ============================================================================

#[tokio::test]
async fn test_identify_dispatch_drop_resume() {
    let gateway = MockGateway::bind().await.unwrap();
    let config = test_config("http://127.0.0.1:1"); // REST is never hit here
    let mut shard = TestShard::spawn(config, &gateway.url(), open_limit());

    // --- first connection: fresh identify ---
    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(41_250).await.unwrap();

    let identify = peer.expect_op(2).await.unwrap();
    assert_eq!(identify["d"]["token"], "test-token");
    assert_eq!(identify["d"]["shard"], json!([0, 1]));
    assert!(identify["d"]["intents"].is_u64());
    assert!(identify["d"].get("session_id").is_none());

    peer.send_dispatch("READY", 1, ready_body("abc123")).await.unwrap();
    let event = shard.next_event().await.unwrap();
    let GatewayEvent::Ready(ready) = event.event else {
        panic!("expected READY first, got {:?}", event.event);
    };
    assert_eq!(ready.session_id, "abc123");

    // Steady-state dispatch in wire order
    peer.send_dispatch("MESSAGE_CREATE", 2, message_body(2, "one"))
        .await
        .unwrap();
    peer.send_dispatch("MESSAGE_CREATE", 3, message_body(3, "two"))
        .await
        .unwrap();

    for expected in ["one", "two"] {
        let event = shard.next_event().await.unwrap();
        let GatewayEvent::MessageCreate(message) = event.event else {
            panic!("expected MESSAGE_CREATE");
        };
        assert_eq!(message.content.as_deref(), Some(expected));
    }

    // --- transport drop: the client must come back with a Resume ---
    peer.drop_abruptly();

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(41_250).await.unwrap();

    let resume = peer.expect_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "abc123");
    assert_eq!(resume["d"]["seq"], 3);

    // Replay the missed event, then mark catch-up complete
    peer.send_dispatch("MESSAGE_CREATE", 4, message_body(4, "missed"))
        .await
        .unwrap();
    peer.send_dispatch("RESUMED", 4, json!({})).await.unwrap();

    let replayed = shard.next_event().await.unwrap();
    let GatewayEvent::MessageCreate(message) = replayed.event else {
        panic!("expected replayed MESSAGE_CREATE");
    };
    assert_eq!(message.content.as_deref(), Some("missed"));
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Resumed
    ));

    // A server heartbeat request reveals the tracker position
    peer.send_json(&json!({"op": 1})).await.unwrap();
    let seq = peer.expect_heartbeat().await.unwrap();
    assert_eq!(seq, json!(4));
    peer.send_heartbeat_ack().await.unwrap();

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}

// ============================================================================
// Identify rate limiting
// ============================================================================

#[tokio::test]
async fn test_identify_blocked_until_quota_resets() {
    let gateway = MockGateway::bind().await.unwrap();
    let config = test_config("http://127.0.0.1:1");

    // No quota left; the window resets in 1.5 seconds
    let limit = SessionStartLimit {
        total: 1,
        remaining: 0,
        reset_after: 1_500,
        max_concurrency: 1,
    };
    let mut shard = TestShard::spawn(config, &gateway.url(), limit);

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();

    // Nothing may go on the wire before the window elapses
    peer.expect_no_identify(Duration::from_millis(700)).await.unwrap();

    // Once it does, the Identify arrives
    let identify = peer.expect_op(2).await.unwrap();
    assert_eq!(identify["d"]["token"], "test-token");

    peer.send_dispatch("READY", 1, ready_body(&fixtures::fresh_session_id()))
        .await
        .unwrap();
    let event = shard.next_event().await.unwrap();
    assert!(matches!(event.event, GatewayEvent::Ready(_)));

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}

// ============================================================================
// Zombied connections
// ============================================================================

#[tokio::test]
async fn test_zombie_detection_triggers_resume() {
    let gateway = MockGateway::bind().await.unwrap();
    let config = test_config("http://127.0.0.1:1");
    let mut shard = TestShard::spawn(config, &gateway.url(), open_limit());

    // Fast heartbeat so the missing ack is noticed quickly
    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(100).await.unwrap();
    peer.expect_op(2).await.unwrap();
    peer.send_dispatch("READY", 1, ready_body("zzz789")).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Ready(_)
    ));

    // Never ack a heartbeat: the client must declare the connection
    // zombied, drop it, and come back with a Resume.
    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(41_250).await.unwrap();
    let resume = peer.expect_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "zzz789");

    peer.send_dispatch("RESUMED", 1, json!({})).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Resumed
    ));

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}

// ============================================================================
// Invalid session handling
// ============================================================================

#[tokio::test]
async fn test_invalid_session_not_resumable_reidentifies() {
    let gateway = MockGateway::bind().await.unwrap();
    // The fresh Identify after invalidation re-fetches the bootstrap
    let rest = MockRest::serve(gateway.url(), 1, open_limit()).await.unwrap();
    let config = test_config(&rest.url());
    let mut shard = TestShard::spawn(config, &gateway.url(), open_limit());

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    peer.expect_op(2).await.unwrap();
    peer.send_dispatch("READY", 1, ready_body("old-session")).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Ready(_)
    ));

    // Non-resumable invalidation: the session must be discarded
    peer.send_json(&json!({"op": 9, "d": false})).await.unwrap();

    // After the mandatory pause the client returns with a fresh
    // Identify, not a Resume
    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    let identify = peer.expect_op(2).await.unwrap();
    assert!(identify["d"].get("session_id").is_none());

    peer.send_dispatch("READY", 1, ready_body("new-session")).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Ready(_)
    ));

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_invalid_session_resumable_resumes() {
    let gateway = MockGateway::bind().await.unwrap();
    let config = test_config("http://127.0.0.1:1");
    let mut shard = TestShard::spawn(config, &gateway.url(), open_limit());

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    peer.expect_op(2).await.unwrap();
    peer.send_dispatch("READY", 1, ready_body("keep-me")).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Ready(_)
    ));

    peer.send_json(&json!({"op": 9, "d": true})).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    let resume = peer.expect_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "keep-me");

    peer.send_dispatch("RESUMED", 1, json!({})).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Resumed
    ));

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}

// ============================================================================
// Close code classification
// ============================================================================

#[tokio::test]
async fn test_fatal_close_surfaces_to_application() {
    let gateway = MockGateway::bind().await.unwrap();
    let config = test_config("http://127.0.0.1:1");
    let shard = TestShard::spawn(config, &gateway.url(), open_limit());

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    peer.expect_op(2).await.unwrap();

    // Bad credentials must not be retried
    peer.close_with(4004, "Authentication failed").await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), shard.task)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        result,
        Err(GatewayError::FatalClose(CloseCode::AuthenticationFailed))
    ));
}

#[tokio::test]
async fn test_recoverable_close_resumes() {
    let gateway = MockGateway::bind().await.unwrap();
    let config = test_config("http://127.0.0.1:1");
    let mut shard = TestShard::spawn(config, &gateway.url(), open_limit());

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    peer.expect_op(2).await.unwrap();
    peer.send_dispatch("READY", 1, ready_body("resume-me")).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Ready(_)
    ));

    // Session-timed-out is recoverable: the session id is retained
    peer.close_with(4009, "Session timeout").await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    let resume = peer.expect_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "resume-me");

    peer.send_dispatch("RESUMED", 1, json!({})).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Resumed
    ));

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}

// ============================================================================
// Binary encoding negotiation
// ============================================================================

#[tokio::test]
async fn test_binary_encoding_handshake() {
    let gateway = MockGateway::bind().await.unwrap();
    let mut config = test_config("http://127.0.0.1:1");
    config.gateway.encoding = WireEncoding::Binary;
    let mut shard = TestShard::spawn(config, &gateway.url(), open_limit());

    let codec = Codec::new(WireEncoding::Binary);
    let mut peer = gateway.accept().await.unwrap();

    peer.send_message(&codec, &GatewayMessage::hello(60_000)).await.unwrap();

    // Skip heartbeats; the Identify must arrive as a binary frame
    let identify = loop {
        let message = peer.recv_message(&codec).await.unwrap();
        if message.op == chat_gateway_client::OpCode::Identify {
            break message;
        }
    };
    let d = identify.d.unwrap();
    assert_eq!(d["token"], "test-token");

    let ready = GatewayMessage::dispatch("READY", 1, ready_body("bin-session"));
    peer.send_message(&codec, &ready).await.unwrap();

    let event = shard.next_event().await.unwrap();
    let GatewayEvent::Ready(ready) = event.event else {
        panic!("expected READY");
    };
    assert_eq!(ready.session_id, "bin-session");

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}

// ============================================================================
// Application commands
// ============================================================================

#[tokio::test]
async fn test_commands_forwarded_while_connected() {
    let gateway = MockGateway::bind().await.unwrap();
    let config = test_config("http://127.0.0.1:1");
    let mut shard = TestShard::spawn(config, &gateway.url(), open_limit());

    let mut peer = gateway.accept().await.unwrap();
    peer.send_hello(60_000).await.unwrap();
    peer.expect_op(2).await.unwrap();
    peer.send_dispatch("READY", 1, ready_body("cmd-session")).await.unwrap();
    assert!(matches!(
        shard.next_event().await.unwrap().event,
        GatewayEvent::Ready(_)
    ));

    let presence = chat_gateway_client::protocol::PresenceUpdatePayload {
        status: "idle".to_string(),
    };
    shard
        .commands
        .send(GatewayMessage::presence_update(&presence))
        .await
        .unwrap();

    let update = peer.expect_op(3).await.unwrap();
    assert_eq!(update["d"]["status"], "idle");

    let result = shard.stop().await.unwrap();
    assert!(result.is_ok());
}
