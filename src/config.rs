//! Configuration loading and management.

use std::net::SocketAddr;

use anyhow::{Context, Result};

/// Address the IPC server binds when `KEYHOLD_ADDR` is unset. Loopback only.
const DEFAULT_ADDR: &str = "127.0.0.1:48650";

/// Buffer size of the hotkey activation channel.
const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Loopback address for the IPC control socket.
    pub listen_addr: SocketAddr,

    /// Capacity of the hotkey event channel between pump and controller.
    pub event_capacity: usize,
}

impl Config {
    /// Load configuration from environment and defaults.
    pub fn load() -> Result<Self> {
        let listen_addr = match std::env::var("KEYHOLD_ADDR") {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("invalid KEYHOLD_ADDR: {}", addr))?,
            Err(_) => DEFAULT_ADDR.parse().expect("default address parses"),
        };

        let event_capacity = match std::env::var("KEYHOLD_EVENT_CAPACITY") {
            Ok(capacity) => capacity
                .parse()
                .with_context(|| format!("invalid KEYHOLD_EVENT_CAPACITY: {}", capacity))?,
            Err(_) => DEFAULT_EVENT_CAPACITY,
        };

        Ok(Self {
            listen_addr,
            event_capacity,
        })
    }
}
