//! SignalR hub client over WebSocket.
//!
//! Connects straight to the hub's WebSocket endpoint (negotiation is
//! skipped), performs the JSON protocol handshake and then multiplexes
//! client invocations and server pushes over the single socket.
//!
//! Server invocations that arrive while an invocation waits for its
//! completion are queued and handed out by later `next_event` calls.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use super::protocol::{self, HubMessage, RecordBuffer};
use crate::domain::TenantId;
use crate::error::{Error, Result};
use crate::infrastructure::config::hub::HubConfig;
use crate::port::outbound::hub::{HubConnection, HubEvent};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the WebSocket URL of a hub: `http`/`https` become `ws`/`wss` and the
/// tenant is passed as the `tenantId` query parameter.
///
/// # Errors
///
/// Returns an error if `url` does not parse or has an unsupported scheme.
pub fn websocket_url(url: &str, tenant_id: Option<TenantId>) -> Result<Url> {
    let mut url = Url::parse(url)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::Connection(format!(
                "unsupported hub URL scheme '{other}'"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::Connection(format!("cannot use scheme '{scheme}' for {url}")))?;
    if let Some(tenant_id) = tenant_id {
        url.query_pairs_mut()
            .append_pair("tenantId", &tenant_id.to_string());
    }
    Ok(url)
}

/// A single SignalR hub connection.
///
/// Not reconnecting on its own: wrap it in
/// [`ReconnectingHub`](crate::infrastructure::hub::ReconnectingHub) for that.
pub struct SignalRConnection {
    url: String,
    tenant_id: Option<TenantId>,
    invoke_timeout: Duration,
    keep_alive: Duration,
    socket: Option<Socket>,
    buffer: RecordBuffer,
    /// Events read off the socket but not handed out yet.
    pending: VecDeque<HubEvent>,
    next_invocation_id: u64,
    last_sent: Instant,
}

/// What woke up `next_event`.
enum Wake {
    Frame(Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>),
    KeepAlive,
}

impl SignalRConnection {
    #[must_use]
    pub fn new(url: impl Into<String>, tenant_id: Option<TenantId>) -> Self {
        Self {
            url: url.into(),
            tenant_id,
            invoke_timeout: Duration::from_secs(15),
            keep_alive: Duration::from_secs(15),
            socket: None,
            buffer: RecordBuffer::new(),
            pending: VecDeque::new(),
            next_invocation_id: 0,
            last_sent: Instant::now(),
        }
    }

    /// Connection using the `[hub]` settings.
    #[must_use]
    pub fn from_config(config: &HubConfig, tenant_id: Option<TenantId>) -> Self {
        Self::new(config.url.clone(), tenant_id)
            .with_invoke_timeout(Duration::from_millis(config.invoke_timeout_ms))
            .with_keep_alive(Duration::from_millis(config.keep_alive_interval_ms))
    }

    #[must_use]
    pub const fn with_invoke_timeout(mut self, invoke_timeout: Duration) -> Self {
        self.invoke_timeout = invoke_timeout;
        self
    }

    #[must_use]
    pub const fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    async fn send(&mut self, text: String) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        socket.send(Message::Text(text)).await?;
        self.last_sent = Instant::now();
        Ok(())
    }

    async fn pong(&mut self, data: Vec<u8>) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        socket.send(Message::Pong(data)).await?;
        Ok(())
    }

    /// Forget the socket after the transport failed, queueing `event`.
    fn drop_socket(&mut self, event: HubEvent) {
        self.socket = None;
        self.buffer.clear();
        self.pending.push_back(event);
    }

    /// Consume a text frame.
    ///
    /// Queues server invocations and lifecycle events; returns the outcome of
    /// the completion matching `awaiting`, if the frame carried it.
    fn absorb(&mut self, text: &str, awaiting: Option<&str>) -> Option<Result<Value>> {
        let records = self.buffer.push(text);
        self.dispatch(records, awaiting)
    }

    fn dispatch(&mut self, records: Vec<String>, awaiting: Option<&str>) -> Option<Result<Value>> {
        let mut outcome = None;
        for record in records {
            let message = match protocol::parse_message(&record) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, bytes = record.len(), "Failed to parse hub message");
                    continue;
                }
            };
            match message {
                HubMessage::Invocation {
                    target, arguments, ..
                } => {
                    trace!(method = %target, "Hub invocation received");
                    self.pending
                        .push_back(HubEvent::Invocation { target, arguments });
                }
                HubMessage::Completion {
                    invocation_id,
                    result,
                    error,
                } => {
                    if awaiting == Some(invocation_id.as_str()) {
                        outcome = Some(match error {
                            Some(error) => Err(Error::Hub(error)),
                            None => Ok(result.unwrap_or(Value::Null)),
                        });
                    } else {
                        debug!(invocation_id = %invocation_id, "Ignoring unexpected completion");
                    }
                }
                HubMessage::Ping => trace!("Hub ping"),
                HubMessage::Close {
                    error,
                    allow_reconnect,
                } => {
                    info!(error = ?error, allow_reconnect, "Hub closed by server");
                    let event = if allow_reconnect {
                        HubEvent::Disconnected {
                            reason: error.unwrap_or_else(|| "server closed the connection".into()),
                        }
                    } else {
                        HubEvent::Closed { reason: error }
                    };
                    self.drop_socket(event);
                    break;
                }
                HubMessage::Other(kind) => trace!(kind, "Ignoring hub message"),
            }
        }
        outcome
    }

    /// Wait for the handshake answer, then absorb whatever followed it.
    async fn handshake(&mut self) -> Result<()> {
        self.send(protocol::handshake_request()).await?;
        loop {
            let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
            let frame = socket.next().await;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    let mut records = self.buffer.push(&text);
                    if records.is_empty() {
                        continue;
                    }
                    let answer = records.remove(0);
                    protocol::parse_handshake_response(&answer)?;
                    self.dispatch(records, None);
                    return Ok(());
                }
                Some(Ok(Message::Ping(data))) => self.pong(data).await?,
                Some(Ok(Message::Close(frame))) => {
                    return Err(Error::Connection(format!(
                        "closed during handshake: {}",
                        frame.map(|f| f.reason.to_string()).unwrap_or_default()
                    )));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::Connection("closed during handshake".into())),
            }
        }
    }

    async fn open(&mut self) -> Result<()> {
        let url = websocket_url(&self.url, self.tenant_id)?;
        info!(url = %self.url, "Connecting to tracking hub");
        let (socket, response) = connect_async(url.as_str()).await?;
        debug!(status = %response.status(), "WebSocket connected");

        self.socket = Some(socket);
        self.buffer.clear();
        self.pending.clear();
        self.handshake().await
    }
}

#[async_trait]
impl HubConnection for SignalRConnection {
    async fn start(&mut self) -> Result<()> {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }

        let limit = self.invoke_timeout;
        match timeout(limit, self.open()).await {
            Ok(Ok(())) => {
                info!(url = %self.url, "Hub handshake complete");
                Ok(())
            }
            Ok(Err(e)) => {
                self.socket = None;
                Err(e)
            }
            Err(_) => {
                self.socket = None;
                Err(Error::Timeout(limit.as_millis() as u64))
            }
        }
    }

    async fn invoke(&mut self, method: &str, arguments: Vec<Value>) -> Result<Value> {
        if self.socket.is_none() {
            return Err(Error::NotConnected);
        }
        self.next_invocation_id += 1;
        let invocation_id = self.next_invocation_id.to_string();
        let record = protocol::encode_invocation(&invocation_id, method, &arguments)?;
        debug!(method, invocation_id = %invocation_id, "Invoking hub method");
        self.send(record).await?;

        let deadline = Instant::now() + self.invoke_timeout;
        loop {
            let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
            let frame = timeout_at(deadline, socket.next())
                .await
                .map_err(|_| Error::Timeout(self.invoke_timeout.as_millis() as u64))?;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(outcome) = self.absorb(&text, Some(&invocation_id)) {
                        return outcome;
                    }
                    if self.socket.is_none() {
                        return Err(Error::Connection(format!(
                            "hub closed while invoking {method}"
                        )));
                    }
                }
                Some(Ok(Message::Ping(data))) => self.pong(data).await?,
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "socket closed".into());
                    self.drop_socket(HubEvent::Disconnected {
                        reason: reason.clone(),
                    });
                    return Err(Error::Connection(reason));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.drop_socket(HubEvent::Disconnected {
                        reason: e.to_string(),
                    });
                    return Err(e.into());
                }
                None => {
                    self.drop_socket(HubEvent::Disconnected {
                        reason: "socket closed".into(),
                    });
                    return Err(Error::Connection("socket closed".into()));
                }
            }
        }
    }

    async fn next_event(&mut self) -> Option<HubEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let ping_at = self.last_sent + self.keep_alive;
            let wake = {
                let socket = self.socket.as_mut()?;
                tokio::select! {
                    frame = socket.next() => Wake::Frame(frame),
                    () = sleep_until(ping_at) => Wake::KeepAlive,
                }
            };

            match wake {
                Wake::KeepAlive => {
                    trace!("Sending hub keep-alive");
                    if let Err(e) = self.send(protocol::encode_ping()).await {
                        self.drop_socket(HubEvent::Disconnected {
                            reason: format!("keep-alive failed: {e}"),
                        });
                    }
                }
                Wake::Frame(Some(Ok(Message::Text(text)))) => {
                    self.absorb(&text, None);
                }
                Wake::Frame(Some(Ok(Message::Ping(data)))) => {
                    if self.pong(data).await.is_err() {
                        self.drop_socket(HubEvent::Disconnected {
                            reason: "failed to send pong".into(),
                        });
                    }
                }
                Wake::Frame(Some(Ok(Message::Close(frame)))) => {
                    self.drop_socket(HubEvent::Disconnected {
                        reason: frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "socket closed".into()),
                    });
                }
                Wake::Frame(Some(Ok(_))) => {}
                Wake::Frame(Some(Err(e))) => {
                    warn!(error = %e, "Hub socket error");
                    self.drop_socket(HubEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
                Wake::Frame(None) => {
                    self.drop_socket(HubEvent::Disconnected {
                        reason: "socket closed".into(),
                    });
                }
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.pending.clear();
        self.buffer.clear();
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.send(Message::Text(protocol::encode_close())).await;
            let _ = socket.close(None).await;
            info!(url = %self.url, "Hub connection stopped");
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
