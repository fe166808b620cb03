// src/connection/transport.rs

//! Defines `Transport`, the owner of the single UDP socket used to talk to the emulator.

use crate::core::RetroLinkError;
use crate::core::protocol::{READ_LIMIT, SEND_LIMIT};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, trace};

/// A connected UDP socket with bounded send and receive primitives.
///
/// UDP is connectionless, so "open" only binds an ephemeral local port and
/// fixes the peer address; nothing reaches the emulator until the first send.
#[derive(Debug, Default)]
pub struct Transport {
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
    /// Receive buffer, allocated once and reused for every datagram.
    buf: Vec<u8>,
}

impl Transport {
    /// Creates a transport with no socket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `host:port`, binds a local socket of the same address family
    /// and connects it to the peer. Any previously open socket is replaced.
    pub async fn open(&mut self, host: &str, port: u16) -> Result<(), RetroLinkError> {
        self.close();

        let peer = lookup_host((host, port)).await?.next().ok_or_else(|| {
            RetroLinkError::from(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("could not resolve '{host}'"),
            ))
        })?;
        let local = if peer.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        debug!("Opened UDP socket {:?} towards {}", socket.local_addr().ok(), peer);

        self.socket = Some(socket);
        self.peer = Some(peer);
        Ok(())
    }

    /// Returns true while a socket is held.
    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// The address the socket is connected to.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Sends one datagram.
    pub async fn send(&self, payload: &[u8]) -> Result<(), RetroLinkError> {
        let socket = self.socket.as_ref().ok_or(RetroLinkError::NotConnected)?;
        if payload.len() > SEND_LIMIT {
            return Err(RetroLinkError::PayloadTooLarge {
                size: payload.len(),
                limit: SEND_LIMIT,
            });
        }
        socket.send(payload).await?;
        trace!("Sent {} byte datagram", payload.len());
        Ok(())
    }

    /// Waits up to `timeout` for one datagram and returns its contents.
    /// A zero-length datagram is returned as an empty vector.
    pub async fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, RetroLinkError> {
        let n = self.recv_into_buf(timeout).await?;
        Ok(self.buf[..n].to_vec())
    }

    /// Receives one datagram into the shared buffer and returns its length.
    async fn recv_into_buf(&mut self, timeout: Duration) -> Result<usize, RetroLinkError> {
        let socket = self.socket.as_ref().ok_or(RetroLinkError::NotConnected)?;
        if self.buf.len() < READ_LIMIT {
            self.buf.resize(READ_LIMIT, 0);
        }
        match tokio::time::timeout(timeout, socket.recv(&mut self.buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(RetroLinkError::Timeout),
        }
    }

    /// Discards every datagram already queued on the socket and returns how many were dropped.
    ///
    /// Replies to an earlier, abandoned transaction may still arrive after it
    /// timed out; without this they would be read as answers to the next one.
    pub async fn drain(&mut self) -> Result<usize, RetroLinkError> {
        // Let the I/O driver record readiness for datagrams that are already queued.
        tokio::task::yield_now().await;

        let mut dropped = 0;
        loop {
            match self.recv_into_buf(Duration::ZERO).await {
                Ok(_) => dropped += 1,
                Err(RetroLinkError::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        if dropped > 0 {
            debug!("Drained {} stale datagram(s)", dropped);
        }
        Ok(dropped)
    }

    /// Drops the socket. Calling it on a closed transport does nothing.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("Closed UDP socket towards {:?}", self.peer);
        }
        self.peer = None;
    }
}
