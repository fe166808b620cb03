// tests/integration/transport_test.rs

//! Integration tests for the UDP transport
//! Tests: open, send, receive, buffer reuse, drain, close

use super::test_helpers::{FakeEmulator, TEST_TIMEOUT};
use retrolink::connection::Transport;
use retrolink::core::RetroLinkError;
use retrolink::core::protocol::SEND_LIMIT;
use std::time::Duration;

#[tokio::test]
async fn test_send_without_socket_is_not_connected() {
    let mut transport = Transport::new();
    assert!(!transport.is_open());
    assert_eq!(
        transport.send(b"GET_STATUS").await,
        Err(RetroLinkError::NotConnected)
    );
    assert_eq!(
        transport.receive(TEST_TIMEOUT).await,
        Err(RetroLinkError::NotConnected)
    );
}

#[tokio::test]
async fn test_send_and_receive_one_datagram() {
    let emulator = FakeEmulator::start().await;
    let mut transport = Transport::new();
    transport.open("127.0.0.1", emulator.port()).await.unwrap();
    assert!(transport.is_open());
    assert_eq!(transport.peer(), Some(emulator.addr));

    transport.send(b"GET_VERSION").await.unwrap();
    let reply = transport.receive(TEST_TIMEOUT).await.unwrap();
    assert_eq!(reply, b"1.19.1");
    assert_eq!(emulator.received(), vec!["GET_VERSION"]);
}

#[tokio::test]
async fn test_short_datagram_after_long_one_has_exact_bytes() {
    let emulator = FakeEmulator::start().await;
    emulator.poke(0x100, &[0xab; 512]);
    let mut transport = Transport::new();
    transport.open("127.0.0.1", emulator.port()).await.unwrap();

    transport.send(b"READ_CORE_MEMORY 100 512").await.unwrap();
    let long = transport.receive(TEST_TIMEOUT).await.unwrap();
    assert!(long.len() > 1000);

    transport.send(b"GET_VERSION").await.unwrap();
    let short = transport.receive(TEST_TIMEOUT).await.unwrap();
    assert_eq!(short, b"1.19.1");
}

#[tokio::test]
async fn test_receive_times_out() {
    let emulator = FakeEmulator::start().await;
    let mut transport = Transport::new();
    transport.open("127.0.0.1", emulator.port()).await.unwrap();

    let err = transport
        .receive(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err, RetroLinkError::Timeout);
}

#[tokio::test]
async fn test_oversized_payload_is_rejected_before_sending() {
    let emulator = FakeEmulator::start().await;
    let mut transport = Transport::new();
    transport.open("127.0.0.1", emulator.port()).await.unwrap();

    let payload = vec![b'A'; SEND_LIMIT + 1];
    assert_eq!(
        transport.send(&payload).await,
        Err(RetroLinkError::PayloadTooLarge {
            size: SEND_LIMIT + 1,
            limit: SEND_LIMIT,
        })
    );

    // A payload at the limit is still accepted.
    transport.send(&vec![b'A'; SEND_LIMIT]).await.unwrap();
}

#[tokio::test]
async fn test_drain_discards_queued_datagrams() {
    let emulator = FakeEmulator::start().await;
    let mut transport = Transport::new();
    transport.open("127.0.0.1", emulator.port()).await.unwrap();

    transport.send(b"GET_VERSION").await.unwrap();
    transport.send(b"GET_VERSION").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(transport.drain().await.unwrap(), 2);
    assert_eq!(transport.drain().await.unwrap(), 0);
    assert_eq!(
        transport.receive(Duration::from_millis(20)).await,
        Err(RetroLinkError::Timeout)
    );
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let emulator = FakeEmulator::start().await;
    let mut transport = Transport::new();
    transport.open("127.0.0.1", emulator.port()).await.unwrap();

    transport.close();
    transport.close();
    assert!(!transport.is_open());
    assert_eq!(transport.peer(), None);
    assert_eq!(
        transport.send(b"GET_STATUS").await,
        Err(RetroLinkError::NotConnected)
    );
}

#[tokio::test]
async fn test_reopen_replaces_socket() {
    let first = FakeEmulator::start().await;
    let second = FakeEmulator::start().await;
    let mut transport = Transport::new();

    transport.open("127.0.0.1", first.port()).await.unwrap();
    transport.open("127.0.0.1", second.port()).await.unwrap();
    transport.send(b"GET_VERSION").await.unwrap();
    transport.receive(TEST_TIMEOUT).await.unwrap();

    assert!(first.received().is_empty());
    assert_eq!(second.received(), vec!["GET_VERSION"]);
}
