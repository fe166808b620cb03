// tests/integration/status_test.rs

//! Integration tests for status queries and emulator control
//! Tests: version, status, cached content identity, SHOW_MSG, lock, unlock

use super::fixtures::GENESIS_CONTENT;
use super::test_helpers::{FakeEmulator, Scripted};
use retrolink::connection::ConnectionState;
use retrolink::core::RetroLinkError;
use retrolink::core::protocol::{ContentInfo, EmulatorState};

#[tokio::test]
async fn test_version() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.connected_client().await;
    assert_eq!(client.version().await.unwrap(), "1.19.1");
}

#[tokio::test]
async fn test_status_promotes_to_connected() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.client();
    assert_eq!(client.connection_state(), ConnectionState::NotConnected);

    assert!(client.connect().await);
    assert_eq!(client.connection_state(), ConnectionState::Tentative);

    let status = client.status().await.unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Connected);
    assert_eq!(status.state, EmulatorState::Playing);
    assert_eq!(
        status.content,
        Some(ContentInfo {
            core_type: "super_nes".to_string(),
            rom_name: "Test Game (USA)".to_string(),
            crc: "crc32=1a2b3c4d".to_string(),
        })
    );
}

#[tokio::test]
async fn test_content_identity_uses_the_cache() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.connected_client().await;

    client.status().await.unwrap();
    assert_eq!(client.core_type().await.unwrap().as_deref(), Some("super_nes"));
    assert_eq!(client.rom_name().await.unwrap().as_deref(), Some("Test Game (USA)"));
    assert_eq!(
        client.content_crc().await.unwrap().as_deref(),
        Some("crc32=1a2b3c4d")
    );
    assert_eq!(emulator.received_with("GET_STATUS").len(), 1);

    // A new status refreshes the cache.
    emulator.set_content(Some(GENESIS_CONTENT));
    client.status().await.unwrap();
    assert_eq!(client.core_type().await.unwrap().as_deref(), Some("mega_drive"));
}

#[tokio::test]
async fn test_content_identity_queries_when_cache_is_empty() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.connected_client().await;

    assert!(client.cached_status().is_none());
    assert_eq!(client.core_type().await.unwrap().as_deref(), Some("super_nes"));
    assert!(client.cached_status().is_some());
    assert_eq!(emulator.received_with("GET_STATUS").len(), 1);
}

#[tokio::test]
async fn test_reconnect_discards_cached_status() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.connected_client().await;
    client.status().await.unwrap();

    client.disconnect();
    assert!(client.cached_status().is_none());
    assert!(client.connect().await);
    assert!(client.cached_status().is_none());
}

#[tokio::test]
async fn test_peer_close_discards_cached_status() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.connected_client().await;
    client.status().await.unwrap();

    emulator.script([Scripted::Raw(Vec::new())]);
    assert_eq!(client.version().await, Err(RetroLinkError::PeerClosed));
    assert_eq!(client.connection_state(), ConnectionState::NotConnected);
    assert!(client.cached_status().is_none());
}

#[tokio::test]
async fn test_contentless_status_has_no_identity() {
    let emulator = FakeEmulator::start().await;
    emulator.set_state("CONTENTLESS");
    emulator.set_content(None);
    let mut client = emulator.connected_client().await;

    let status = client.status().await.unwrap();
    assert_eq!(status.state, EmulatorState::Contentless);
    assert_eq!(status.content, None);
    assert_eq!(client.core_type().await.unwrap(), None);
    assert_eq!(client.content_crc().await.unwrap(), None);
}

#[tokio::test]
async fn test_display_message_flattens_newlines() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.connected_client().await;

    client.display_message("Got item\nfrom Player2").await.unwrap();
    client.version().await.unwrap();
    assert_eq!(
        emulator.received(),
        vec!["SHOW_MSG Got item from Player2", "GET_VERSION"]
    );
}

#[tokio::test]
async fn test_lock_and_unlock() {
    let emulator = FakeEmulator::start().await;
    let mut client = emulator.connected_client().await;

    client.lock().await.unwrap();
    client.version().await.unwrap();
    assert_eq!(emulator.received_with("FRAMEADVANCE").len(), 1);

    // Already paused: locking again sends nothing.
    client.lock().await.unwrap();
    client.version().await.unwrap();
    assert_eq!(emulator.received_with("FRAMEADVANCE").len(), 1);

    client.unlock().await.unwrap();
    client.version().await.unwrap();
    assert_eq!(emulator.received_with("PAUSE_TOGGLE").len(), 1);
    assert_eq!(emulator.model.lock().state, "PLAYING");

    // Already running: unlocking again sends nothing.
    client.unlock().await.unwrap();
    client.version().await.unwrap();
    assert_eq!(emulator.received_with("PAUSE_TOGGLE").len(), 1);
}
