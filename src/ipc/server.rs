//! Loopback TCP server for IPC.
//!
//! Request-response communication with push notifications for daemon events
//! to subscribed clients. Frames are 4-byte little-endian length-prefixed
//! JSON. The daemon binds a loopback address only; there is no
//! authentication beyond that.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::DaemonEvent;
use crate::hotkey::{HotkeyListener, RegistrationError};
use crate::keys::KeyCode;
use crate::state::ControlCommand;
use crate::winlist;

use super::protocol::{BoundHotkey, DaemonStatus, KeyEntry, Notification, Request, Response};

/// What the IPC surface needs from the rest of the daemon.
#[derive(Clone)]
pub struct DaemonHandle {
    /// Hotkey listener; registration calls marshal to its pump thread and
    /// return quickly, so holding the lock across them is fine.
    pub listener: Arc<StdMutex<HotkeyListener>>,
    /// Control channel into the hold controller.
    pub control: mpsc::Sender<ControlCommand>,
}

/// IPC server handling client connections.
pub struct Server {
    listener: Option<TcpListener>,
    state: Arc<RwLock<ServerState>>,
    daemon: DaemonHandle,
    shutdown_tx: broadcast::Sender<()>,
    event_tx: broadcast::Sender<DaemonEvent>,
}

/// Shared server state.
struct ServerState {
    status: DaemonStatus,
    start_time: Instant,
}

impl Server {
    /// Bind the loopback listener.
    pub async fn bind(
        addr: SocketAddr,
        daemon: DaemonHandle,
        event_tx: broadcast::Sender<DaemonEvent>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind IPC listener on {}", addr))?;

        let (shutdown_tx, _) = broadcast::channel(1);

        let mut status = DaemonStatus::default();
        if let Ok(hotkey_listener) = daemon.listener.lock() {
            status.backend = hotkey_listener.backend_name().to_string();
        }

        let state = Arc::new(RwLock::new(ServerState {
            status,
            start_time: Instant::now(),
        }));

        info!(%addr, "IPC server listening");

        Ok(Self {
            listener: Some(listener),
            state,
            daemon,
            shutdown_tx,
            event_tx,
        })
    }

    /// The address the listener actually bound (relevant with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let listener = self.listener.as_ref().context("server not initialized")?;
        listener.local_addr().context("failed to read local address")
    }

    /// Mirror the hold state reported by controller events.
    pub async fn set_holding(&self, holding: bool) {
        self.state.write().await.status.holding = holding;
    }

    /// Mirror the target reported by controller events.
    pub async fn set_target(&self, target: Option<crate::inject::TargetWindowHandle>) {
        self.state.write().await.status.target = target;
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "client connected");
                    let state = Arc::clone(&self.state);
                    let daemon = self.daemon.clone();
                    let event_tx = self.event_tx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, daemon, event_tx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection.
    async fn handle_client(
        stream: TcpStream,
        state: Arc<RwLock<ServerState>>,
        daemon: DaemonHandle,
        event_tx: broadcast::Sender<DaemonEvent>,
    ) -> Result<()> {
        let (mut reader, writer) = stream.into_split();

        // All frames leave through one writer task, so responses and pushed
        // notifications cannot interleave mid-frame.
        let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(32);
        tokio::spawn(async move {
            if let Err(e) = Self::write_frames(writer, out_rx).await {
                debug!(?e, "client writer closed");
            }
        });

        let mut is_subscribed = false;

        loop {
            let request = match Self::read_frame(&mut reader).await? {
                Some(request) => request,
                None => {
                    debug!("client disconnected");
                    return Ok(());
                }
            };

            debug!(?request, "received request");

            let (response, subscribe) =
                Self::process_request(request, &state, &daemon, &event_tx).await;

            if subscribe && !is_subscribed {
                is_subscribed = true;
                Self::spawn_notifier(event_tx.subscribe(), out_tx.clone());
                debug!("client subscribed to notifications");
            }

            if out_tx.send(encode_frame(&response)?).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Read one length-prefixed request. `None` on clean disconnect.
    async fn read_frame(reader: &mut OwnedReadHalf) -> Result<Option<Request>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > 1024 * 1024 {
            warn!(len, "message too large, disconnecting");
            return Ok(None);
        }

        let mut msg_buf = vec![0u8; len];
        reader.read_exact(&mut msg_buf).await?;

        let request = serde_json::from_slice(&msg_buf).context("failed to parse request")?;
        Ok(Some(request))
    }

    /// Drain outbound frames onto the socket.
    async fn write_frames(
        mut writer: OwnedWriteHalf,
        mut out_rx: mpsc::Receiver<Vec<u8>>,
    ) -> Result<()> {
        while let Some(frame) = out_rx.recv().await {
            let len = (frame.len() as u32).to_le_bytes();
            writer.write_all(&len).await?;
            writer.write_all(&frame).await?;
        }
        Ok(())
    }

    /// Relay daemon events to a subscribed client until it goes away.
    fn spawn_notifier(
        mut event_rx: broadcast::Receiver<DaemonEvent>,
        out_tx: mpsc::Sender<Vec<u8>>,
    ) {
        tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Ok(event) => {
                        let frame = match encode_frame(&Notification::Event { event }) {
                            Ok(frame) => frame,
                            Err(e) => {
                                error!(?e, "failed to encode notification");
                                continue;
                            }
                        };
                        if out_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "notification receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Process a request and return a response.
    /// Returns `(Response, should_subscribe)`.
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        daemon: &DaemonHandle,
        event_tx: &broadcast::Sender<DaemonEvent>,
    ) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                (Response::Status(state.status.clone()), false)
            }

            Request::BindHotkey { modifiers, key } => {
                let result = Self::with_listener(daemon, |l| l.register(key, modifiers));
                match result {
                    Ok(()) => {
                        state.write().await.status.hotkey = Some(BoundHotkey { modifiers, key });
                        info!(%modifiers, %key, "hotkey bound via IPC");
                        let _ = event_tx.send(DaemonEvent::HotkeyBound { modifiers, key });
                        (Response::Ack, false)
                    }
                    Err(e) => (registration_error(e), false),
                }
            }

            Request::ClearHotkey => {
                let result = Self::with_listener(daemon, |l| l.unregister());
                match result {
                    Ok(()) => {
                        state.write().await.status.hotkey = None;
                        // An active hold must not outlive its binding.
                        let _ = daemon.control.send(ControlCommand::BindingCleared).await;
                        info!("hotkey cleared via IPC");
                        let _ = event_tx.send(DaemonEvent::HotkeyCleared);
                        (Response::Ack, false)
                    }
                    Err(e) => (registration_error(e), false),
                }
            }

            Request::SetTarget { target } => {
                if daemon
                    .control
                    .send(ControlCommand::SetTarget { target })
                    .await
                    .is_err()
                {
                    return (controller_gone(), false);
                }
                state.write().await.status.target = target;
                (Response::Ack, false)
            }

            Request::SetHeldKey { key } => {
                if daemon
                    .control
                    .send(ControlCommand::SetHeldKey { key })
                    .await
                    .is_err()
                {
                    return (controller_gone(), false);
                }
                state.write().await.status.held_key = key;
                (Response::Ack, false)
            }

            Request::ListWindows => match winlist::enumerate_windows() {
                Ok(windows) => (Response::Windows { windows }, false),
                Err(e) => {
                    error!(?e, "window enumeration failed");
                    (
                        Response::Error {
                            code: "window_enumeration".to_string(),
                            message: e.to_string(),
                        },
                        false,
                    )
                }
            },

            Request::ListKeys => {
                let keys = KeyCode::ALL
                    .iter()
                    .map(|&code| KeyEntry {
                        code,
                        name: code.name().unwrap_or("Unknown").to_string(),
                    })
                    .collect();
                (Response::Keys { keys }, false)
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    fn with_listener(
        daemon: &DaemonHandle,
        f: impl FnOnce(&mut HotkeyListener) -> Result<(), RegistrationError>,
    ) -> Result<(), RegistrationError> {
        match daemon.listener.lock() {
            Ok(mut listener) => f(&mut listener),
            Err(_) => Err(RegistrationError::Backend(
                "hotkey listener lock poisoned".into(),
            )),
        }
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("IPC server shutdown complete");
    }
}

fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).context("failed to encode message")
}

fn registration_error(e: RegistrationError) -> Response {
    Response::Error {
        code: e.code().to_string(),
        message: e.to_string(),
    }
}

fn controller_gone() -> Response {
    Response::Error {
        code: "controller".to_string(),
        message: "hold controller is not running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::mock::MockBackend;
    use crate::hotkey::Dispatcher;
    use crate::keys::ModifierSet;

    fn daemon_handle() -> (DaemonHandle, mpsc::Receiver<ControlCommand>) {
        let (backend, _handle) = MockBackend::new();
        let (dispatcher, _subscription) = Dispatcher::channel(8);
        let mut listener = HotkeyListener::new(Box::new(backend), dispatcher);
        listener.start().unwrap();

        let (control_tx, control_rx) = mpsc::channel(8);
        (
            DaemonHandle {
                listener: Arc::new(StdMutex::new(listener)),
                control: control_tx,
            },
            control_rx,
        )
    }

    fn server_state() -> Arc<RwLock<ServerState>> {
        Arc::new(RwLock::new(ServerState {
            status: DaemonStatus::default(),
            start_time: Instant::now(),
        }))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ping_pong() {
        let (daemon, _control_rx) = daemon_handle();
        let state = server_state();
        let (event_tx, _) = broadcast::channel(8);

        let (response, subscribe) =
            Server::process_request(Request::Ping, &state, &daemon, &event_tx).await;
        assert!(matches!(response, Response::Pong));
        assert!(!subscribe);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bind_hotkey_updates_status_and_emits_event() {
        let (daemon, _control_rx) = daemon_handle();
        let state = server_state();
        let (event_tx, mut event_rx) = broadcast::channel(8);

        let request = Request::BindHotkey {
            modifiers: ModifierSet::CONTROL | ModifierSet::SHIFT,
            key: KeyCode::F1,
        };
        let (response, _) = Server::process_request(request, &state, &daemon, &event_tx).await;

        assert!(matches!(response, Response::Ack));
        assert_eq!(
            state.read().await.status.hotkey,
            Some(BoundHotkey {
                modifiers: ModifierSet::CONTROL | ModifierSet::SHIFT,
                key: KeyCode::F1,
            })
        );
        assert!(matches!(
            event_rx.try_recv(),
            Ok(DaemonEvent::HotkeyBound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bind_hotkey_rejects_invalid_combination() {
        let (daemon, _control_rx) = daemon_handle();
        let state = server_state();
        let (event_tx, _) = broadcast::channel(8);

        let request = Request::BindHotkey {
            modifiers: ModifierSet::NONE,
            key: KeyCode::F1,
        };
        let (response, _) = Server::process_request(request, &state, &daemon, &event_tx).await;

        assert!(matches!(
            response,
            Response::Error { code, .. } if code == "invalid_combination"
        ));
        assert_eq!(state.read().await.status.hotkey, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_hotkey_notifies_controller() {
        let (daemon, mut control_rx) = daemon_handle();
        let state = server_state();
        let (event_tx, _) = broadcast::channel(8);

        let (response, _) =
            Server::process_request(Request::ClearHotkey, &state, &daemon, &event_tx).await;

        assert!(matches!(response, Response::Ack));
        assert_eq!(control_rx.recv().await, Some(ControlCommand::BindingCleared));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_target_routes_to_controller() {
        let (daemon, mut control_rx) = daemon_handle();
        let state = server_state();
        let (event_tx, _) = broadcast::channel(8);

        let target = Some(crate::inject::TargetWindowHandle::from_raw(0xBEEF));
        let (response, _) =
            Server::process_request(Request::SetTarget { target }, &state, &daemon, &event_tx)
                .await;

        assert!(matches!(response, Response::Ack));
        assert_eq!(
            control_rx.recv().await,
            Some(ControlCommand::SetTarget { target })
        );
        assert_eq!(state.read().await.status.target, target);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_keys_covers_the_picker_universe() {
        let (daemon, _control_rx) = daemon_handle();
        let state = server_state();
        let (event_tx, _) = broadcast::channel(8);

        let (response, _) =
            Server::process_request(Request::ListKeys, &state, &daemon, &event_tx).await;

        let Response::Keys { keys } = response else {
            panic!("expected key list");
        };
        assert!(keys.len() > 100);
        assert!(keys
            .iter()
            .any(|entry| entry.code == KeyCode::F1 && entry.name == "F1"));
    }

    async fn client_send(stream: &mut TcpStream, request: &Request) {
        let frame = serde_json::to_vec(request).unwrap();
        stream
            .write_all(&(frame.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(&frame).await.unwrap();
    }

    async fn client_recv(stream: &mut TcpStream) -> Vec<u8> {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut frame = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut frame).await.unwrap();
        frame
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tcp_round_trip_and_notifications() {
        let (daemon, _control_rx) = daemon_handle();
        let (event_tx, _) = broadcast::channel(8);

        let server = Server::bind(
            "127.0.0.1:0".parse().unwrap(),
            daemon,
            event_tx.clone(),
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();

        let server = Arc::new(server);
        let server_task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                let _ = server.run().await;
            })
        };

        let mut stream = TcpStream::connect(addr).await.unwrap();

        client_send(&mut stream, &Request::Ping).await;
        let response: Response = serde_json::from_slice(&client_recv(&mut stream).await).unwrap();
        assert!(matches!(response, Response::Pong));

        client_send(&mut stream, &Request::Subscribe).await;
        let response: Response = serde_json::from_slice(&client_recv(&mut stream).await).unwrap();
        assert!(matches!(response, Response::Subscribed));

        event_tx.send(DaemonEvent::HotkeyCleared).unwrap();
        let notification: Notification =
            serde_json::from_slice(&client_recv(&mut stream).await).unwrap();
        assert!(matches!(
            notification,
            Notification::Event {
                event: DaemonEvent::HotkeyCleared
            }
        ));

        server.shutdown().await;
        server_task.abort();
    }
}
