//! Session service client: REST snapshots plus the websocket event feed.
//!
//! DESIGN
//! ======
//! Thin wrapper over `reqwest` and `tokio-tungstenite`. URL building, event
//! parsing and the reconnect schedule are pure functions so they can be
//! tested without a server. The client never retries on its own; the daemon
//! owns the reconnect loop and asks [`SessionClient::reconnect_delay`] how
//! long to wait.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ErrorCode;
use crate::session::{Session, SessionEvent, SessionSnapshot};

const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Reconnect delays stop doubling after this many failures.
const MAX_BACKOFF_DOUBLINGS: u32 = 6;
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);
/// Upper bound of the random extra delay, as a fraction of the base delay.
const RECONNECT_JITTER: f64 = 0.25;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("http request failed: {0}")]
    Http(String),
    #[error("session service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ErrorCode for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT",
            Self::Http(_) => "E_HTTP",
            Self::Status { .. } => "E_HTTP_STATUS",
            Self::WsConnect(_) => "E_WS_CONNECT",
            Self::WsClosed => "E_WS_CLOSED",
            Self::Decode(_) => "E_DECODE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::WsConnect(_) | Self::WsClosed => true,
            Self::Status { status, .. } => *status >= 500,
            Self::HttpClientBuild(_) | Self::Decode(_) => false,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct SessionClient {
    http: reqwest::Client,
    api_base_url: String,
    ws_base_url: String,
    reconnect_base: Duration,
}

impl SessionClient {
    /// # Errors
    ///
    /// [`ClientError::HttpClientBuild`] when the TLS backend cannot start.
    pub fn new(config: &EngineConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            api_base_url: config.api_base_url.clone(),
            ws_base_url: config.ws_base_url.clone(),
            reconnect_base: config.reconnect_base,
        })
    }

    /// `GET {api}/sessions/{id}/snapshot`.
    ///
    /// # Errors
    ///
    /// Transport failures, non-2xx statuses, and bodies that do not decode.
    pub async fn fetch_snapshot(&self, session_id: &str) -> Result<SessionSnapshot, ClientError> {
        let text = self.get_text(&snapshot_url(&self.api_base_url, session_id)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// `GET {api}/sessions/code/{code}`: resolve a join code to its session.
    ///
    /// # Errors
    ///
    /// Transport failures, non-2xx statuses (404 for unknown codes), and
    /// bodies that do not decode.
    pub async fn session_by_code(&self, code: &str) -> Result<Session, ClientError> {
        let text = self.get_text(&code_url(&self.api_base_url, code)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Open the push channel for `session_id`.
    ///
    /// # Errors
    ///
    /// [`ClientError::WsConnect`] when the handshake fails.
    pub async fn connect_events(&self, session_id: &str) -> Result<EventStream, ClientError> {
        let url = events_url(&self.ws_base_url, session_id);
        let (stream, _) = connect_async(url.as_str()).await.map_err(|error| ClientError::WsConnect(Box::new(error)))?;
        debug!(session_id, url = %url, "event stream connected");
        Ok(EventStream { stream })
    }

    /// Delay before reconnect attempt `attempt` (0-based), with jitter.
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        use rand::Rng;
        let jitter = rand::rng().random_range(0.0..RECONNECT_JITTER);
        backoff_delay(self.reconnect_base, attempt, jitter)
    }

    async fn get_text(&self, url: &str) -> Result<String, ClientError> {
        let response = self.http.get(url).send().await.map_err(|e| ClientError::Http(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ClientError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

// =============================================================================
// EVENT STREAM
// =============================================================================

pub struct EventStream {
    stream: WsStream,
}

impl EventStream {
    /// Next decodable event. Frames that are not JSON events are skipped.
    ///
    /// # Errors
    ///
    /// [`ClientError::WsClosed`] when the server closes the channel,
    /// [`ClientError::WsConnect`] on transport errors.
    pub async fn next_event(&mut self) -> Result<SessionEvent, ClientError> {
        loop {
            let Some(message) = self.stream.next().await else {
                return Err(ClientError::WsClosed);
            };
            match message.map_err(|error| ClientError::WsConnect(Box::new(error)))? {
                Message::Text(text) => match parse_event(&text) {
                    Ok(event) => return Ok(event),
                    Err(err) => debug!(error = %err, "ignoring undecodable event"),
                },
                Message::Close(_) => return Err(ClientError::WsClosed),
                _ => {}
            }
        }
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

#[must_use]
pub fn snapshot_url(api_base_url: &str, session_id: &str) -> String {
    format!("{}/sessions/{}/snapshot", api_base_url.trim_end_matches('/'), session_id.trim())
}

#[must_use]
pub fn code_url(api_base_url: &str, code: &str) -> String {
    format!("{}/sessions/code/{}", api_base_url.trim_end_matches('/'), code.trim().to_uppercase())
}

#[must_use]
pub fn events_url(ws_base_url: &str, session_id: &str) -> String {
    format!("{}/ws/sessions/{}", ws_base_url.trim_end_matches('/'), session_id.trim())
}

/// # Errors
///
/// [`ClientError::Decode`] when `text` is not a session event.
pub fn parse_event(text: &str) -> Result<SessionEvent, ClientError> {
    Ok(serde_json::from_str(text)?)
}

/// `base * 2^attempt` (doubling capped), plus `jitter` as a fraction of that,
/// never above [`MAX_RECONNECT_DELAY`].
#[must_use]
pub fn backoff_delay(base: Duration, attempt: u32, jitter: f64) -> Duration {
    let doubled = base.saturating_mul(1 << attempt.min(MAX_BACKOFF_DOUBLINGS));
    let jittered = doubled.saturating_add(doubled.mul_f64(jitter.clamp(0.0, 1.0)));
    jittered.min(MAX_RECONNECT_DELAY)
}
