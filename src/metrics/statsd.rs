//! Minimal StatsD counter emitter over UDP.
//!
//! Sends `<prefix><name>:1|c` datagrams. Send errors are logged and never
//! reach the caller; a dropped datagram only costs one count.

use std::net::UdpSocket;

use tracing::{debug, info};

use crate::error::{DispatchError, Result};

#[derive(Debug)]
pub struct StatsdEmitter {
    socket: UdpSocket,
    prefix: String,
}

impl StatsdEmitter {
    /// Resolve `address`, then bind an ephemeral local socket connected to it.
    ///
    /// The socket is a plain blocking std socket: a UDP send only copies the
    /// datagram into the kernel buffer, so it is sent right away instead of
    /// waiting for the reactor to report writability.
    pub async fn connect(address: &str, prefix: &str) -> Result<Self> {
        let target = tokio::net::lookup_host(address)
            .await
            .map_err(|e| {
                DispatchError::Metrics(format!("Failed to resolve StatsD address {}: {}", address, e))
            })?
            .next()
            .ok_or_else(|| {
                DispatchError::Metrics(format!("StatsD address {} resolved to nothing", address))
            })?;

        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).map_err(|e| {
            DispatchError::Metrics(format!("Failed to bind StatsD socket: {}", e))
        })?;
        socket.connect(target).map_err(|e| {
            DispatchError::Metrics(format!("Failed to connect StatsD socket to {}: {}", target, e))
        })?;

        info!(address = %address, prefix = %prefix, "StatsD emitter ready");
        Ok(Self {
            socket,
            prefix: prefix.to_string(),
        })
    }

    /// Wire form of a single counter increment.
    pub fn format_increment(prefix: &str, name: &str) -> String {
        format!("{}{}:1|c", prefix, name)
    }

    pub fn increment(&self, name: &str) {
        let datagram = Self::format_increment(&self.prefix, name);
        if let Err(e) = self.socket.send(datagram.as_bytes()) {
            debug!(metric = %name, error = %e, "StatsD send failed");
        }
    }
}
