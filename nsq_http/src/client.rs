use std::time::Duration;

use nsq_core::ModuleConfig;
use nsq_core::Payload;
use nsq_core::Transport;
use nsq_core::TransportError;
use nsq_core::TransportKind;
use reqwest::Client;
use reqwest::ClientBuilder;
use reqwest::StatusCode;
use tracing::debug;

/// Configuration for the nsqd HTTP client.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Connection establishment timeout (module `connection_timeout`, `None` waits indefinitely)
    pub connect_timeout: Option<Duration>,

    /// Total request timeout (module `readwrite_timeout`, `None` waits indefinitely)
    pub request_timeout: Option<Duration>,

    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,

    /// Idle timeout for pooled connections (default: 90s)
    pub pool_idle_timeout: Duration,

    /// Enable TCP_NODELAY (default: true)
    pub tcp_nodelay: bool,

    /// Enable Hickory DNS for async resolution (default: true)
    pub hickory_dns: bool,
}

impl HttpTransportConfig {
    pub fn from_module(config: &ModuleConfig) -> Self {
        Self {
            connect_timeout: config.connection_timeout(),
            request_timeout: config.readwrite_timeout(),
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
            tcp_nodelay: true,
            hickory_dns: true,
        }
    }
}

/// Publishes to nsqd's `/pub` and `/mpub` endpoints.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn with_config(base_url: impl Into<String>, config: HttpTransportConfig) -> Result<Self, TransportError> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .tcp_nodelay(config.tcp_nodelay)
            .hickory_dns(config.hickory_dns);

        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|err| TransportError::Request(Box::new(err)))?;

        Ok(Self { client, base_url: base_url.into(), config })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Full URL for a publish command, without the topic query
    pub fn endpoint(&self, payload: &Payload) -> String {
        format!("{}/{}", self.base_url, payload.command().name(TransportKind::Http))
    }

    fn request_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            self.timeout_error(err.is_connect())
        } else {
            TransportError::Request(Box::new(err))
        }
    }

    /// Timeout error naming the limit that fired: connect or whole request.
    fn timeout_error(&self, during_connect: bool) -> TransportError {
        if during_connect {
            TransportError::Timeout { operation: "http connect", timeout: self.config.connect_timeout.unwrap_or_default() }
        } else {
            TransportError::Timeout { operation: "http publish", timeout: self.config.request_timeout.unwrap_or_default() }
        }
    }
}

impl Transport for HttpTransport {
    const KIND: TransportKind = TransportKind::Http;

    fn connect(config: &ModuleConfig) -> Result<Self, TransportError> {
        Self::with_config(format!("http://{}", config.address()), HttpTransportConfig::from_module(config))
    }

    async fn send(&self, topic: &str, payload: &Payload) -> Result<(), TransportError> {
        let url = self.endpoint(payload);

        let response =
            self.client.post(&url).query(&[("topic", topic)]).body(payload.to_body()).send().await.map_err(|err| self.request_error(err))?;

        // Only a literal 200 counts as delivered
        let status = response.status();
        if status == StatusCode::OK {
            debug!("POST {url}?topic={topic} -> {status}");
            Ok(())
        } else {
            Err(TransportError::UnexpectedStatus { status: status.as_u16() })
        }
    }
}
