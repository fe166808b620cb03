// src/core/errors.rs

//! Defines the primary error type for the client library.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure a request to the emulator can produce.
///
/// Most variants fall into four families. The connection is missing
/// (`NotConnected`). The request went unanswered or came back garbled
/// (`RequestFailed`, `Timeout`). The peer went away (`PeerClosed`,
/// `ConnectionFault`). The emulator answered something other than what was
/// asked (`ProtocolViolation`). Requests that could never be answered are
/// refused up front (`InvalidRequest`, `PayloadTooLarge`).
#[derive(Error, Debug, Clone)]
pub enum RetroLinkError {
    /// An operation was attempted before a socket was opened.
    #[error("Not connected to the emulator")]
    NotConnected,

    /// An outgoing datagram would exceed the protocol's send ceiling.
    #[error("Payload of {size} bytes exceeds the {limit} byte datagram limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// A single receive did not complete within its deadline.
    #[error("Timed out waiting for a datagram")]
    Timeout,

    /// A transaction could not be completed. Re-issuing it is safe.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The emulator answered with a zero-length datagram.
    #[error("Connection closed by peer")]
    PeerClosed,

    /// The echoed tag, address or length does not match the request.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The request was refused before anything was sent, e.g. a reply-less
    /// command inside a batch that waits for replies.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The socket reported a refused or reset connection.
    #[error("Connection fault: {0}")]
    ConnectionFault(Arc<std::io::Error>),
}

impl RetroLinkError {
    /// Returns true if the same request may be issued again, possibly after a reconnect.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetroLinkError::NotConnected | RetroLinkError::RequestFailed(_) | RetroLinkError::Timeout
        )
    }

    /// Returns true if the error means the link to the emulator is gone or was never there.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            RetroLinkError::NotConnected
                | RetroLinkError::PeerClosed
                | RetroLinkError::ConnectionFault(_)
        )
    }
}

impl PartialEq for RetroLinkError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                RetroLinkError::PayloadTooLarge { size: s1, limit: l1 },
                RetroLinkError::PayloadTooLarge { size: s2, limit: l2 },
            ) => s1 == s2 && l1 == l2,
            (RetroLinkError::RequestFailed(s1), RetroLinkError::RequestFailed(s2)) => s1 == s2,
            (RetroLinkError::ProtocolViolation(s1), RetroLinkError::ProtocolViolation(s2)) => {
                s1 == s2
            }
            (RetroLinkError::InvalidRequest(s1), RetroLinkError::InvalidRequest(s2)) => s1 == s2,
            (RetroLinkError::ConnectionFault(e1), RetroLinkError::ConnectionFault(e2)) => {
                e1.kind() == e2.kind()
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for RetroLinkError {
    fn from(e: std::io::Error) -> Self {
        RetroLinkError::ConnectionFault(Arc::new(e))
    }
}

impl From<hex::FromHexError> for RetroLinkError {
    fn from(e: hex::FromHexError) -> Self {
        RetroLinkError::RequestFailed(format!("malformed hex payload: {e}"))
    }
}
