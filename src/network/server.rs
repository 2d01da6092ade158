//! WebSocket Relay Server
//!
//! Async WebSocket server. One task per connection reads client events
//! and feeds them to the lifecycle handler and event relay; a companion
//! writer task drains the connection's outbox onto the socket.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::network::hub::{Hub, HubConfig};
use crate::network::lifecycle::LifecycleHandler;
use crate::network::protocol::{Ack, AckedEvent, ClientMessage, ServerMessage};
use crate::network::relay::{EventRelay, RelayedEvent};
use crate::room::user::ConnectionId;

/// Time a closing connection's writer gets to flush its queue.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Outbound messages buffered per connection.
    pub outbox_capacity: usize,
    /// Maximum members per room (`None` = unlimited).
    pub room_capacity: Option<usize>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3002)),
            max_connections: 1000,
            outbox_capacity: 64,
            room_capacity: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held an unparsable value.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var::<SocketAddr, _>(&lookup, "RELAY_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, "RELAY_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "RELAY_OUTBOX_CAPACITY")? {
            config.outbox_capacity = capacity;
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "RELAY_ROOM_CAPACITY")? {
            config.room_capacity = Some(capacity);
        }

        Ok(config)
    }

    /// Hub settings derived from this config.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            outbox_capacity: self.outbox_capacity,
            room_capacity: self.room_capacity,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket handshake or transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Every connection slot is taken.
    #[error("Connection limit of {0} reached")]
    ConnectionLimitReached(usize),
}

/// The relay server.
pub struct RelayServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared membership and outbox state.
    hub: Hub,
    /// Join/leave/disconnect transitions.
    lifecycle: LifecycleHandler,
    /// Room-wide event forwarding.
    relay: EventRelay,
    /// One permit per open connection, held from accept to teardown.
    connection_slots: Arc<Semaphore>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a new relay server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let hub = Hub::new(config.hub_config());
        let slots = config.max_connections.min(Semaphore::MAX_PERMITS);

        Self {
            lifecycle: LifecycleHandler::new(hub.clone()),
            relay: EventRelay::new(hub.clone()),
            connection_slots: Arc::new(Semaphore::new(slots)),
            hub,
            config,
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!("Relay server v{} listening on {}", self.config.version, listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let permit = match self.reserve_slot() {
                                Ok(permit) => permit,
                                Err(e) => {
                                    warn!("{}, rejecting {}", e, addr);
                                    drop(stream);
                                    continue;
                                }
                            };

                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr, permit);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Claim a connection slot before the handshake starts.
    fn reserve_slot(&self) -> Result<OwnedSemaphorePermit, ServerError> {
        self.connection_slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| ServerError::ConnectionLimitReached(self.config.max_connections))
    }

    /// Handle a new WebSocket connection.
    ///
    /// `permit` is released only after the connection is fully torn down.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, permit: OwnedSemaphorePermit) {
        let hub = self.hub.clone();
        let lifecycle = self.lifecycle.clone();
        let relay = self.relay.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_websocket(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (conn, mut outbox) = hub.connect().await;
            info!(conn = %conn.short(), %addr, "Connection opened");

            // Spawn message writer task
            let writer_task = tokio::spawn(async move {
                while let Some(msg) = outbox.recv().await {
                    let shutting_down = matches!(msg, ServerMessage::Shutdown { .. });
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                    if shutting_down {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        Self::handle_client_message(conn, client_msg, &hub, &lifecycle, &relay).await;
                                    }
                                    Err(e) => {
                                        debug!(conn = %conn.short(), "Invalid message: {}", e);
                                        reply(&hub, conn, ServerMessage::invalid_input("Invalid message format")).await;
                                    }
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                reply(&hub, conn, ServerMessage::invalid_input("Binary frames are not supported")).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!(conn = %conn.short(), "Client disconnected");
                                break;
                            }
                            Some(Err(e)) => {
                                warn!(conn = %conn.short(), "WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        reply(&hub, conn, ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Exactly one disconnect per connection
            lifecycle.disconnect(conn).await;

            // Outbox is detached, so the writer drains what is queued and stops
            if !finish_writer(writer_task, WRITER_DRAIN_TIMEOUT).await {
                debug!(conn = %conn.short(), "Writer did not drain in time, aborted");
            }

            drop(permit);
            info!(conn = %conn.short(), %addr, "Connection closed");
        });
    }

    /// Dispatch one decoded client event.
    async fn handle_client_message(
        conn: ConnectionId,
        msg: ClientMessage,
        hub: &Hub,
        lifecycle: &LifecycleHandler,
        relay: &EventRelay,
    ) {
        debug!(conn = %conn.short(), event = msg.event_name(), "Client event");

        match msg {
            ClientMessage::Join(req) => {
                let ack = match lifecycle.join(conn, &req.room).await {
                    Ok(_) => Ack::ok(AckedEvent::Join),
                    Err(e) => {
                        debug!(conn = %conn.short(), "Join failed: {}", e);
                        Ack::failed(AckedEvent::Join, e)
                    }
                };
                reply(hub, conn, ServerMessage::Ack(ack)).await;
            }
            ClientMessage::InitGameState(state) => {
                relay.relay(conn, RelayedEvent::InitGameState(state)).await;
            }
            ClientMessage::UpdateGameState(state) => {
                relay.relay(conn, RelayedEvent::UpdateGameState(state)).await;
            }
            ClientMessage::SendMessage(req) => {
                relay.relay(conn, RelayedEvent::Chat(req.message)).await;
                reply(hub, conn, ServerMessage::Ack(Ack::ok(AckedEvent::SendMessage))).await;
            }
            ClientMessage::Leave => {
                lifecycle.leave(conn).await;
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Shared hub handle.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.hub.connection_count().await
    }

    /// Get live room count.
    pub async fn room_count(&self) -> usize {
        self.hub.room_count().await
    }
}

/// Queue a direct reply to `conn`.
async fn reply(hub: &Hub, conn: ConnectionId, message: ServerMessage) {
    hub.lock().await.outboxes.send_to(&conn, message);
}

/// Run the server side of the WebSocket handshake.
async fn accept_websocket(stream: TcpStream) -> Result<WebSocketStream<TcpStream>, ServerError> {
    Ok(accept_async(stream).await?)
}

/// Wait up to `limit` for `writer` to finish, aborting it otherwise.
///
/// Returns `false` if the writer had to be aborted.
async fn finish_writer(mut writer: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, &mut writer).await {
        Ok(_) => true,
        Err(_) => {
            writer.abort();
            let _ = writer.await;
            false
        }
    }
}
