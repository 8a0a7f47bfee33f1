//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Upper bound on the closing handshake during shutdown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A text frame queued for the connection task, acknowledged once written
struct Outgoing {
    text: String,
    ack: oneshot::Sender<Result<(), WsError>>,
}

/// Reusable WebSocket client with automatic reconnection and ping/pong handling
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Dial the endpoint and hand the session to a background task
    ///
    /// Fails if the initial dial fails. Once open, the background task keeps
    /// the connection alive: pings on an interval, reconnects with exponential
    /// backoff when the session breaks, and reports lifecycle changes as
    /// [`WsMessage`] events alongside the data frames.
    pub async fn open(&self) -> Result<WsConnection, WsError> {
        let stream = Self::dial(&self.config.url).await?;

        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let (send_tx, send_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) =
                Self::run_connection_loop(config, stream, msg_tx, send_rx, shutdown_rx).await
            {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        Ok(WsConnection {
            url: self.config.url.clone(),
            incoming: msg_rx,
            outgoing: send_tx,
            close: CloseHandle(Arc::new(shutdown_tx)),
        })
    }

    async fn dial(url: &str) -> Result<WsStream, WsError> {
        tracing::info!(url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        tracing::info!(url, "WebSocket connected");
        Ok(ws_stream)
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        initial: WsStream,
        tx: mpsc::Sender<WsMessage>,
        mut send_rx: mpsc::Receiver<Outgoing>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), WsError> {
        let mut session = Some(initial);
        let mut reconnect_attempts = 0;
        let mut reconnect_delay = config.initial_reconnect_delay;

        loop {
            if let Some(ws_stream) = session.take() {
                match Self::stream_messages(ws_stream, &config, &tx, &mut send_rx, &mut shutdown)
                    .await
                {
                    Ok(()) => {
                        tracing::info!("WebSocket connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket session failed");
                        if tx.send(WsMessage::ReadFailed(e.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            reconnect_attempts += 1;

            // Check max reconnects (0 = infinite)
            if config.max_reconnect_attempts > 0
                && reconnect_attempts > config.max_reconnect_attempts
            {
                tracing::error!("Max reconnection attempts reached");
                let _ = tx.send(WsMessage::Disconnected).await;
                return Err(WsError::MaxReconnectsExceeded);
            }

            if tx.is_closed() {
                tracing::info!("Receiver dropped, stopping reconnection");
                break;
            }

            let _ = tx
                .send(WsMessage::Reconnecting {
                    attempt: reconnect_attempts,
                })
                .await;

            if !Self::wait_backoff(reconnect_delay, &mut send_rx, &mut shutdown).await {
                break;
            }
            reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);

            let dialed = tokio::select! {
                result = Self::dial(&config.url) => result,
                _ = wait_closed(&mut shutdown) => break,
            };

            match dialed {
                Ok(ws_stream) => {
                    reconnect_attempts = 0;
                    reconnect_delay = config.initial_reconnect_delay;
                    if tx.send(WsMessage::Reconnected).await.is_err() {
                        break;
                    }
                    session = Some(ws_stream);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt = reconnect_attempts,
                        "WebSocket reconnect failed"
                    );
                }
            }
        }

        let _ = tx.send(WsMessage::Disconnected).await;
        Ok(())
    }

    /// Sleep out the backoff, failing queued writes fast while disconnected
    ///
    /// Returns `false` when the connection was closed in the meantime.
    async fn wait_backoff(
        delay: Duration,
        send_rx: &mut mpsc::Receiver<Outgoing>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let deadline = sleep(delay);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => return true,
                _ = wait_closed(shutdown) => return false,
                outgoing = send_rx.recv() => match outgoing {
                    Some(outgoing) => {
                        let _ = outgoing.ack.send(Err(WsError::NotConnected));
                    }
                    None => return false,
                },
            }
        }
    }

    /// Pump one session until it fails, or until shutdown
    async fn stream_messages(
        ws_stream: WsStream,
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
        send_rx: &mut mpsc::Receiver<Outgoing>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), WsError> {
        let (mut write, mut read) = ws_stream.split();

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut pong_deadline: Option<Instant> = None;

        loop {
            let deadline = pong_deadline;
            let pong_timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                msg = read.next() => {
                    let event = match msg {
                        Some(Ok(Message::Text(text))) => WsMessage::Text(text),
                        Some(Ok(Message::Binary(data))) => WsMessage::Binary(data),
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                            continue;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_deadline = None;
                            continue;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Received close frame");
                            return Err(WsError::ClosedByPeer);
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                        _ => continue,
                    };

                    match Self::forward(event, tx, &mut write, send_rx, shutdown).await? {
                        Forwarded::Delivered => {}
                        Forwarded::ReceiverGone => {
                            tracing::debug!("Receiver dropped, closing connection");
                            Self::close_session(&mut write, &mut read).await;
                            return Ok(());
                        }
                        Forwarded::Shutdown => {
                            tracing::debug!("Shutdown requested, closing WebSocket");
                            Self::close_session(&mut write, &mut read).await;
                            return Ok(());
                        }
                    }
                }

                outgoing = send_rx.recv() => {
                    match outgoing {
                        Some(outgoing) => Self::write_outgoing(&mut write, outgoing).await?,
                        None => {
                            // Connection handle dropped
                            Self::close_session(&mut write, &mut read).await;
                            return Ok(());
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    if pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + config.pong_timeout);
                    }
                }

                _ = pong_timer => {
                    return Err(WsError::ConnectionFailed("Pong timeout".into()));
                }

                _ = wait_closed(shutdown) => {
                    tracing::debug!("Shutdown requested, closing WebSocket");
                    Self::close_session(&mut write, &mut read).await;
                    return Ok(());
                }
            }
        }
    }

    /// Hand one inbound event to the consumer
    ///
    /// While the event buffer is full, queued writes and close requests are
    /// still served.
    async fn forward(
        event: WsMessage,
        tx: &mpsc::Sender<WsMessage>,
        write: &mut WsSink,
        send_rx: &mut mpsc::Receiver<Outgoing>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Forwarded, WsError> {
        loop {
            tokio::select! {
                permit = tx.reserve() => {
                    return Ok(match permit {
                        Ok(permit) => {
                            permit.send(event);
                            Forwarded::Delivered
                        }
                        Err(_) => Forwarded::ReceiverGone,
                    });
                }
                outgoing = send_rx.recv() => match outgoing {
                    Some(outgoing) => Self::write_outgoing(write, outgoing).await?,
                    None => return Ok(Forwarded::ReceiverGone),
                },
                _ = wait_closed(shutdown) => return Ok(Forwarded::Shutdown),
            }
        }
    }

    /// Write one queued frame and acknowledge it
    async fn write_outgoing(write: &mut WsSink, outgoing: Outgoing) -> Result<(), WsError> {
        let result = write
            .send(Message::Text(outgoing.text))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()));
        let failure = result.as_ref().err().cloned();
        let _ = outgoing.ack.send(result);
        failure.map_or(Ok(()), Err)
    }

    /// Send our close frame and wait for the peer to finish the handshake
    ///
    /// Dropping the socket before the peer has read everything makes the
    /// kernel reset the connection, which discards frames already written.
    async fn close_session(write: &mut WsSink, read: &mut WsSource) {
        let handshake = async {
            if write.send(Message::Close(None)).await.is_err() {
                return;
            }
            while let Some(Ok(_)) = read.next().await {}
        };

        if tokio::time::timeout(CLOSE_TIMEOUT, handshake).await.is_err() {
            tracing::debug!("Peer did not finish the closing handshake in time");
        }
    }
}

/// Outcome of handing an inbound event to the consumer
enum Forwarded {
    Delivered,
    ReceiverGone,
    Shutdown,
}

/// Resolves once the close flag is raised or every [`CloseHandle`] is gone
async fn wait_closed(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Cloneable handle that shuts a [`WsConnection`] down from any task
///
/// Closing is idempotent and never waits on in-flight writes. A pending
/// [`WsConnection::recv`] returns promptly once the connection task exits.
#[derive(Debug, Clone)]
pub struct CloseHandle(Arc<watch::Sender<bool>>);

impl CloseHandle {
    pub fn close(&self) {
        self.0.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.0.borrow()
    }
}

/// Live, self-healing WebSocket session created by [`WsClient::open`]
pub struct WsConnection {
    url: String,
    incoming: mpsc::Receiver<WsMessage>,
    outgoing: mpsc::Sender<Outgoing>,
    close: CloseHandle,
}

impl WsConnection {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Write one text frame, waiting until it has been flushed to the socket
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), WsError> {
        if self.close.is_closed() {
            return Err(WsError::ChannelClosed);
        }

        let (ack, acked) = oneshot::channel();
        self.outgoing
            .send(Outgoing {
                text: text.into(),
                ack,
            })
            .await
            .map_err(|_| WsError::ChannelClosed)?;

        acked.await.map_err(|_| WsError::ChannelClosed)?
    }

    /// Next event from the connection task; `None` after it has exited
    pub async fn recv(&mut self) -> Option<WsMessage> {
        self.incoming.recv().await
    }

    pub fn close(&self) {
        self.close.close();
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }
}
