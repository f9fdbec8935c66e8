//! IPC module for daemon-UI communication.

mod protocol;
mod server;

pub use protocol::{BoundHotkey, DaemonStatus, KeyEntry, Notification, Request, Response};
pub use server::{DaemonHandle, Server};
