use super::LogSink;
use super::serialization::BatchSerializer;
use crate::buffer::Batch;
use crate::domain::SinkError;
use bytes::Bytes;
use reqwest::header::{
    AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

const B3_FLAGS: HeaderName = HeaderName::from_static("x-b3-flags");
const BATCH_ID: HeaderName = HeaderName::from_static("x-batch-id");
const BATCH_SIZE: HeaderName = HeaderName::from_static("x-batch-size");
const LOG_CATEGORY: HeaderName = HeaderName::from_static("x-log-category");

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub endpoint: String,
    pub token: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_idle_connections: usize,
    pub user_agent: String,
    pub enable_compression: bool,
    /// Health-check path requested with credentials on open. `None` skips the check.
    pub health_path: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/logs".to_string(),
            token: String::new(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_idle_connections: 2,
            user_agent: format!("loglens-connector/{}", env!("CARGO_PKG_VERSION")),
            enable_compression: false,
            health_path: None,
        }
    }
}

struct OpenConnection {
    client: Client,
    opened_at: Instant,
}

enum SinkState {
    Closed,
    Open(OpenConnection),
}

/// Ships NDJSON batches to an HTTP collector with bearer authentication.
pub struct HttpSink {
    config: SinkConfig,
    endpoint_url: Url,
    health_url: Option<Url>,
    default_headers: HeaderMap,
    serializer: BatchSerializer,
    state: SinkState,
}

impl HttpSink {
    /// Validates the configuration. The sink starts `Closed`; nothing touches the network yet.
    pub fn new(config: SinkConfig) -> Result<Self, SinkError> {
        let endpoint_url: Url = config
            .endpoint
            .parse()
            .map_err(|e| SinkError::InvalidConfiguration(format!("Invalid endpoint URL: {e}")))?;

        let health_url = match &config.health_path {
            Some(path) => Some(endpoint_url.join(path).map_err(|e| {
                SinkError::InvalidConfiguration(format!("Invalid health path '{path}': {e}"))
            })?),
            None => None,
        };

        let mut default_headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| SinkError::InvalidConfiguration(format!("Invalid bearer token: {e}")))?;
        bearer.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, bearer);
        default_headers.insert(B3_FLAGS, HeaderValue::from_static("1"));

        Ok(Self {
            config,
            endpoint_url,
            health_url,
            default_headers,
            serializer: BatchSerializer::new(),
            state: SinkState::Closed,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint_url.as_str()
    }

    fn build_client(&self) -> Result<Client, SinkError> {
        ClientBuilder::new()
            .timeout(self.config.request_timeout)
            .connect_timeout(self.config.connect_timeout)
            .pool_max_idle_per_host(self.config.max_idle_connections)
            .user_agent(&self.config.user_agent)
            .default_headers(self.default_headers.clone())
            .build()
            .map_err(|e| {
                SinkError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })
    }

    async fn check_health(&self, client: &Client, url: &Url) -> Result<(), SinkError> {
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if is_auth_failure(status) {
            return Err(SinkError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(SinkError::ConnectionFailed(format!(
                "Health check returned HTTP {status}"
            )));
        }
        Ok(())
    }

    fn batch_headers(&self, batch: &Batch, compressed: bool) -> Result<HeaderMap, SinkError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-ndjson"),
        );
        if compressed {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }
        headers.insert(
            BATCH_ID,
            HeaderValue::from_str(batch.id())
                .map_err(|e| SinkError::InvalidConfiguration(format!("Invalid batch ID: {e}")))?,
        );
        headers.insert(BATCH_SIZE, HeaderValue::from(batch.len()));

        // Header only makes sense for single-category batches
        if let Some(first) = batch.entries().first()
            && batch
                .entries()
                .iter()
                .all(|e| e.category() == first.category())
            && let Ok(value) = HeaderValue::from_str(first.category())
        {
            headers.insert(LOG_CATEGORY, value);
        }
        Ok(headers)
    }

    fn invalidate(&mut self, error: &SinkError) {
        if error.invalidates_connection() && matches!(self.state, SinkState::Open(_)) {
            debug!("Dropping connection to {} after: {}", self.endpoint_url, error);
            self.state = SinkState::Closed;
        }
    }

    async fn post(&self, client: Client, batch: &Batch) -> Result<(), SinkError> {
        let compressed = self.config.enable_compression;
        let payload = if compressed {
            self.serializer.serialize_compressed(batch)?
        } else {
            self.serializer.serialize_ndjson(batch)?
        };
        let bytes_sent = payload.len();
        let headers = self.batch_headers(batch, compressed)?;
        let start = Instant::now();

        let response = client
            .post(self.endpoint_url.clone())
            .headers(headers)
            .body(Bytes::from(payload))
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(
                "Sent batch {} ({} entries, {} bytes) in {:?}",
                batch.id(),
                batch.len(),
                bytes_sent,
                start.elapsed()
            );
            return Ok(());
        }

        if is_auth_failure(status) {
            return Err(SinkError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        Err(SinkError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl LogSink for HttpSink {
    async fn open(&mut self) -> Result<(), SinkError> {
        if self.is_open() {
            return Ok(());
        }

        // The client only becomes part of the sink once the health check passes;
        // on any error it is dropped here.
        let client = self.build_client()?;
        if let Some(url) = &self.health_url {
            self.check_health(&client, url).await?;
        }

        info!("Opened connection to {}", self.endpoint_url);
        self.state = SinkState::Open(OpenConnection {
            client,
            opened_at: Instant::now(),
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open(_))
    }

    async fn send_batch(&mut self, batch: &Batch) -> Result<(), SinkError> {
        let client = match &self.state {
            SinkState::Open(connection) => connection.client.clone(),
            SinkState::Closed => {
                return Err(SinkError::ConnectionFailed("sink is closed".to_string()));
            }
        };

        let result = self.post(client, batch).await;
        if let Err(e) = &result {
            self.invalidate(e);
        }
        result
    }

    async fn close(&mut self) {
        match std::mem::replace(&mut self.state, SinkState::Closed) {
            SinkState::Open(connection) => {
                // Requests are sent eagerly, so there is nothing buffered to flush.
                info!(
                    "Closed connection to {} (open for {:?})",
                    self.endpoint_url,
                    connection.opened_at.elapsed()
                );
            }
            SinkState::Closed => {
                debug!("Close requested but connection to {} was not open", self.endpoint_url);
            }
        }
    }
}

impl std::fmt::Debug for HttpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSink")
            .field("endpoint", &self.endpoint_url.as_str())
            .field("health_url", &self.health_url.as_ref().map(Url::as_str))
            .field("open", &self.is_open())
            .finish()
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn connection_error(error: reqwest::Error) -> SinkError {
    if error.is_timeout() {
        SinkError::Timeout
    } else if error.is_connect() {
        SinkError::ConnectionFailed(error.to_string())
    } else {
        SinkError::Network(error)
    }
}
