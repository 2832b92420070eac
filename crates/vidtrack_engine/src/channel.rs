use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;
use vidtrack_core::{ChannelAction, ChannelState, ReconnectPolicy};

use crate::frame::{decode_frame, Frame};
use crate::{ChannelError, ChannelEvent, EngineEvent, EventSink};

/// Outbound frames buffered for the live connection; more are dropped.
pub const OUTBOUND_CAPACITY: usize = 64;

/// Produces the per-connection client token used in the channel address.
pub type ClientIdSource = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct ChannelSettings {
    /// Server base URL (`http`/`https`; `ws`/`wss` accepted as-is).
    pub server: Url,
    pub socket_path: String,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
    pub client_id: ClientIdSource,
}

impl ChannelSettings {
    pub fn new(server: Url) -> Self {
        Self {
            server,
            socket_path: "/ws/".to_string(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            client_id: Arc::new(time_based_client_id),
        }
    }
}

impl fmt::Debug for ChannelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSettings")
            .field("server", &self.server.as_str())
            .field("socket_path", &self.socket_path)
            .field("reconnect", &self.reconnect)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

static CLIENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// `<unix millis>-<sequence>`; unique within this process.
pub fn time_based_client_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let seq = CLIENT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

/// `<ws|wss>://<host>/<socket_path>/<client_id>`
pub fn channel_address(
    server: &Url,
    socket_path: &str,
    client_id: &str,
) -> Result<Url, ChannelError> {
    let scheme = match server.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChannelError::InvalidAddress(format!(
                "unsupported scheme {other}"
            )))
        }
    };
    let host = server
        .host_str()
        .ok_or_else(|| ChannelError::InvalidAddress(format!("{server} has no host")))?;
    let authority = match server.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let prefix = socket_path.trim_matches('/');
    let path = if prefix.is_empty() {
        format!("/{client_id}")
    } else {
        format!("/{prefix}/{client_id}")
    };
    Url::parse(&format!("{scheme}://{authority}{path}"))
        .map_err(|err| ChannelError::InvalidAddress(err.to_string()))
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, address: &Url) -> Result<Box<dyn Connection>, ChannelError>;
}

#[async_trait::async_trait]
pub trait Connection: Send {
    /// Next text frame, or `None` once the peer has closed the socket.
    async fn recv(&mut self) -> Option<Result<String, ChannelError>>;
    async fn send(&mut self, text: String) -> Result<(), ChannelError>;
}

#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteTransport;

#[async_trait::async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, address: &Url) -> Result<Box<dyn Connection>, ChannelError> {
        let (stream, _response) = tokio_tungstenite::connect_async(address.as_str())
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Connection for TungsteniteConnection {
    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => engine_debug!("Dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(_)) => return None,
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(err) => return Some(Err(ChannelError::Transport(err.to_string()))),
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|err| ChannelError::Transport(err.to_string()))
    }
}

/// Keeps one live channel, reconnecting after unexpected closures until
/// cancelled.
pub struct NotificationChannel {
    settings: ChannelSettings,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl NotificationChannel {
    pub fn new(
        settings: ChannelSettings,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            settings,
            transport,
            sleeper,
        }
    }

    /// Drive the channel until `cancel` fires. Outbound text queued on
    /// `outbound` is written to the live connection; anything queued while
    /// no connection was open is discarded when the next one opens.
    pub async fn run(
        &self,
        sink: &dyn EventSink,
        mut outbound: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) {
        let mut state = ChannelState::new(self.settings.reconnect);
        let mut next = state.open();

        while let Some(action) = next.take() {
            next = match action {
                ChannelAction::Connect => {
                    self.connect_and_serve(&mut state, sink, &mut outbound, &cancel)
                        .await
                }
                ChannelAction::ScheduleReconnect { attempt, delay } => {
                    engine_info!("Reconnecting in {:?} (attempt {})", delay, attempt);
                    sink.emit(EngineEvent::Channel(ChannelEvent::ReconnectScheduled {
                        attempt,
                        delay,
                    }));
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        _ = self.sleeper.sleep(delay) => state.on_reconnect_due(),
                    }
                }
            };
        }

        if !state.is_shut_down() {
            state.close();
        }
        engine_info!("Notification channel closed");
        emit_status(sink, &state);
    }

    async fn connect_and_serve(
        &self,
        state: &mut ChannelState,
        sink: &dyn EventSink,
        outbound: &mut mpsc::Receiver<String>,
        cancel: &CancellationToken,
    ) -> Option<ChannelAction> {
        emit_status(sink, state);
        let client_id = (self.settings.client_id)();
        let address =
            match channel_address(&self.settings.server, &self.settings.socket_path, &client_id) {
                Ok(address) => address,
                Err(err) => {
                    engine_error!("Cannot build channel address: {}", err);
                    sink.emit(EngineEvent::Channel(ChannelEvent::Error(err)));
                    return None;
                }
            };

        engine_info!("Connecting notification channel to {}", address);
        let timeout = self.settings.connect_timeout;
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = tokio::time::timeout(timeout, self.transport.connect(&address)) => result,
        };
        let mut connection = match connected {
            Ok(Ok(connection)) => connection,
            Ok(Err(err)) => return self.report_closed(state, sink, err),
            Err(_) => return self.report_closed(state, sink, ChannelError::Timeout(timeout)),
        };

        if !state.on_open() {
            return None;
        }
        discard_stale(outbound);
        engine_info!("Notification channel open as client {}", client_id);
        emit_status(sink, state);

        let mut outbound_open = true;
        let failure = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                outgoing = outbound.recv(), if outbound_open => match outgoing {
                    Some(text) => {
                        if let Err(err) = connection.send(text).await {
                            break err;
                        }
                    }
                    None => outbound_open = false,
                },
                frame = connection.recv() => match frame {
                    Some(Ok(text)) => handle_frame(&text, sink),
                    Some(Err(err)) => break err,
                    None => break ChannelError::ClosedByPeer,
                },
            }
        };
        self.report_closed(state, sink, failure)
    }

    fn report_closed(
        &self,
        state: &mut ChannelState,
        sink: &dyn EventSink,
        err: ChannelError,
    ) -> Option<ChannelAction> {
        engine_warn!("Notification channel down: {}", err);
        sink.emit(EngineEvent::Channel(ChannelEvent::Error(err)));
        let next = state.on_closed();
        emit_status(sink, state);
        next
    }
}

/// Frames queued before this connection opened were meant for an earlier
/// client id.
fn discard_stale(outbound: &mut mpsc::Receiver<String>) {
    let mut dropped = 0_usize;
    while outbound.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        engine_debug!("Discarded {} outbound frames queued while disconnected", dropped);
    }
}

fn handle_frame(text: &str, sink: &dyn EventSink) {
    match decode_frame(text) {
        Ok(Frame::Progress(notification)) => {
            sink.emit(EngineEvent::Channel(ChannelEvent::Notification(notification)));
        }
        Ok(Frame::Other) => engine_debug!("Ignoring non-progress frame: {}", text),
        Err(err) => engine_warn!("Dropping malformed frame: {}", err),
    }
}

fn emit_status(sink: &dyn EventSink, state: &ChannelState) {
    sink.emit(EngineEvent::Channel(ChannelEvent::StatusChanged(
        state.status(),
    )));
}
