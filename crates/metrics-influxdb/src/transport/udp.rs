// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP transport.
//!
//! Batches are packed into datagrams of at most `max_packet_size` bytes.
//! Each packet resolves the host, opens an ephemeral socket of the
//! resolved address family, sends once and closes the socket. There is no
//! acknowledgment; only local failures (resolution, socket, send) are
//! reported.

use super::{Delivery, Transport};
use crate::config::ReporterConfig;
use crate::error::TransportError;
use crate::packet::pack_packets;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;

/// Fire-and-forget datagram client.
#[derive(Debug, Clone)]
pub struct UdpClient {
    host: String,
    port: u16,
    max_packet_size: usize,
    /// Bounds sockets open at once across concurrent flushes.
    sockets: Arc<Semaphore>,
}

impl UdpClient {
    pub fn new(config: &ReporterConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port(),
            max_packet_size: config.max_packet_size,
            sockets: Arc::new(Semaphore::new(config.max_open_sockets)),
        }
    }

    /// Send one datagram.
    pub async fn send(&self, packet: &[u8]) -> Delivery {
        let _permit = self
            .sockets
            .acquire()
            .await
            .map_err(|e| TransportError::Io(io::Error::other(e)))?;

        let target = self.resolve().await?;
        let socket = ephemeral_socket(target)?;
        let sent = socket.send_to(packet, target).await?;
        if sent != packet.len() {
            tracing::warn!(
                "UDP: short send to {} ({} of {} bytes)",
                target,
                sent,
                packet.len()
            );
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<SocketAddr, TransportError> {
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| TransportError::Resolve {
                host: self.host.clone(),
                reason: e.to_string(),
            })?;
        addrs.next().ok_or_else(|| TransportError::Resolve {
            host: self.host.clone(),
            reason: "no addresses returned".to_string(),
        })
    }
}

impl Transport for UdpClient {
    async fn write_batches(&self, batches: Vec<Vec<String>>) -> Vec<Delivery> {
        let packets = pack_packets(&batches, self.max_packet_size);
        tracing::debug!(
            "UDP: sending {} packet(s) from {} batch(es) to {}:{}",
            packets.len(),
            batches.len(),
            self.host,
            self.port
        );

        let mut outcomes = Vec::with_capacity(packets.len());
        for packet in &packets {
            outcomes.push(self.send(packet).await);
        }
        outcomes
    }
}

/// Unbound-port datagram socket matching the family of `target`.
/// The socket closes when the returned value is dropped.
fn ephemeral_socket(target: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(target), Type::DGRAM, Some(Protocol::UDP))?;
    let local: SocketAddr = match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    socket.bind(&local.into())?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn receiver() -> (UdpSocket, ReporterConfig) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let config = ReporterConfig {
            port: Some(port),
            ..ReporterConfig::udp("127.0.0.1")
        };
        (socket, config)
    }

    async fn recv(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = vec![0u8; 65_536];
        let (n, _) = tokio::time::timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
            .await
            .expect("datagram within timeout")
            .unwrap();
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn test_send_single_packet() {
        let (socket, config) = receiver().await;
        let client = UdpClient::new(&config);

        client.send(b"m count=1i").await.unwrap();
        assert_eq!(recv(&socket).await, b"m count=1i");
    }

    #[tokio::test]
    async fn test_write_batches_packs_lines() {
        let (socket, mut config) = receiver().await;
        config.max_packet_size = 12;
        let client = UdpClient::new(&config);

        let batches = vec![vec![
            "a count=1i".to_string(),
            "b count=2i".to_string(),
        ]];
        let outcomes = client.write_batches(batches).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(Result::is_ok));
        assert_eq!(recv(&socket).await, b"a count=1i");
        assert_eq!(recv(&socket).await, b"b count=2i");
    }

    #[tokio::test]
    async fn test_unresolvable_host_reports_error() {
        let config = ReporterConfig::udp("host.invalid");
        let client = UdpClient::new(&config);

        let result = client.send(b"x").await;
        assert!(matches!(result, Err(TransportError::Resolve { .. })));
    }
}
