use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use config::FileFormat;
use config::Value;
use config::ValueKind;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::ConfigError;

/// Default directory for request/retry/error logs
pub const DEFAULT_LOG_PATH: &str = "logs/nsq/";

/// Default connect timeout in seconds
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 3;

/// Default read/write timeout in seconds
pub const DEFAULT_READWRITE_TIMEOUT_SECS: u64 = 3;

/// Default number of retries after the first failed attempt
pub const DEFAULT_RETRY_TIMES: u32 = 1;

/// Environment variable prefix for config overrides (`NSQ__<module>__<key>`)
pub const ENV_PREFIX: &str = "NSQ";

/// Which nsqd interface a publisher talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportKind {
    Http,
    Tcp,
}

impl TransportKind {
    /// Config key holding the port for this transport
    pub fn port_key(self) -> &'static str {
        match self {
            Self::Http => "http_port",
            Self::Tcp => "tcp_port",
        }
    }

    /// Component name stamped on every log record
    pub fn component(self) -> &'static str {
        match self {
            Self::Http => "NsqHttpClient",
            Self::Tcp => "NsqTcpClient",
        }
    }
}

/// Resolved, validated settings for one module key. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    pub module: String,
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub log_path: PathBuf,
    pub connection_timeout_secs: u64,
    pub readwrite_timeout_secs: u64,
    pub retry_times: u32,
}

impl ModuleConfig {
    /// Connect timeout, `None` when configured as `0` (wait indefinitely)
    pub fn connection_timeout(&self) -> Option<Duration> {
        bounded_secs(self.connection_timeout_secs)
    }

    /// Read/write timeout, `None` when configured as `0` (wait indefinitely)
    pub fn readwrite_timeout(&self) -> Option<Duration> {
        bounded_secs(self.readwrite_timeout_secs)
    }

    /// `host:port` pair used by both transports
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path of a log file under this module's log directory
    pub fn log_file(&self, name: &str) -> PathBuf {
        self.log_path.join(name)
    }
}

fn bounded_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Raw module table as found in the store. Every field is optional so that
/// missing keys can be reported precisely.
#[derive(Debug, Default, Deserialize)]
struct RawModuleConfig {
    host: Option<String>,
    http_port: Option<u16>,
    tcp_port: Option<u16>,
    topic: Option<String>,
    log_path: Option<String>,
    connection_timeout: Option<u64>,
    readwrite_timeout: Option<u64>,
    retry_times: Option<u32>,
}

/// Process-wide configuration store, queried by module key.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    inner: Config,
}

impl ConfigStore {
    pub fn new(inner: Config) -> Self {
        Self { inner }
    }

    /// Load from a config file (format picked from the extension) with `NSQ__` env overrides on top
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let inner = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()?;

        Ok(Self { inner })
    }

    /// Build a store from an in-memory TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let inner = Config::builder().add_source(File::from_str(source, FileFormat::Toml)).build()?;

        Ok(Self { inner })
    }

    /// Look up and validate the settings for `module`.
    ///
    /// `module` names a top-level table and is never read as a path
    /// expression: `orders.v2` does not reach into `[orders]`. The store splits
    /// dotted keys into nested tables while loading, so such keys are always
    /// reported as missing.
    pub fn resolve(&self, module: &str, kind: TransportKind) -> Result<ModuleConfig, ConfigError> {
        let entry = match &self.inner.cache.kind {
            ValueKind::Table(root) => root.get(module).cloned(),
            _ => None,
        };
        let table = entry
            .ok_or_else(|| ConfigError::MissingModule { module: module.to_string() })?
            .into_table()
            .map_err(|err| ConfigError::InvalidModule { module: module.to_string(), reason: err.to_string() })?;

        if table.is_empty() {
            return Err(ConfigError::InvalidModule { module: module.to_string(), reason: "module table is empty".to_string() });
        }

        let raw: RawModuleConfig = Value::new(None, ValueKind::Table(table))
            .try_deserialize()
            .map_err(|err| ConfigError::InvalidModule { module: module.to_string(), reason: err.to_string() })?;

        let missing = |field: &'static str| ConfigError::MissingField { module: module.to_string(), field };

        let host = raw.host.filter(|host| !host.is_empty()).ok_or_else(|| missing("host"))?;
        let port = match kind {
            TransportKind::Http => raw.http_port,
            TransportKind::Tcp => raw.tcp_port,
        }
        .ok_or_else(|| missing(kind.port_key()))?;
        let topic = raw.topic.filter(|topic| !topic.is_empty()).ok_or_else(|| missing("topic"))?;

        if port == 0 {
            return Err(ConfigError::InvalidModule { module: module.to_string(), reason: format!("{} must be non-zero", kind.port_key()) });
        }

        Ok(ModuleConfig {
            module: module.to_string(),
            host,
            port,
            topic,
            log_path: PathBuf::from(raw.log_path.unwrap_or_else(|| DEFAULT_LOG_PATH.to_string())),
            connection_timeout_secs: raw.connection_timeout.unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
            readwrite_timeout_secs: raw.readwrite_timeout.unwrap_or(DEFAULT_READWRITE_TIMEOUT_SECS),
            retry_times: raw.retry_times.unwrap_or(DEFAULT_RETRY_TIMES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        flat = "scalar"

        [orders]
        host = "10.0.0.5"
        http_port = 4151
        tcp_port = 4150
        topic = "orders"

        [audit]
        host = "10.0.0.6"
        http_port = "4151"
        topic = "audit"
        log_path = "/var/log/audit/"
        connection_timeout = "5"
        readwrite_timeout = 7
        retry_times = 3

        [broken]
        host = "10.0.0.7"
        topic = "broken"

        [badport]
        host = "10.0.0.8"
        http_port = "not-a-port"
        topic = "badport"

        [blank]
        host = ""
        http_port = 4151
        topic = "blank"

        [unbounded]
        host = "10.0.0.9"
        http_port = 4151
        topic = "unbounded"
        connection_timeout = 0
        readwrite_timeout = "0"

        [billing.v2]
        host = "10.0.0.10"
        http_port = 4151
        topic = "billing"
    "#;

    fn store() -> ConfigStore {
        ConfigStore::from_toml_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = store().resolve("orders", TransportKind::Http).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 4151);
        assert_eq!(config.topic, "orders");
        assert_eq!(config.log_path, PathBuf::from(DEFAULT_LOG_PATH));
        assert_eq!(config.connection_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.readwrite_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.retry_times, 1);
    }

    #[test]
    fn test_port_key_follows_transport() {
        let config = store().resolve("orders", TransportKind::Tcp).unwrap();
        assert_eq!(config.port, 4150);
        assert_eq!(config.address(), "10.0.0.5:4150");
    }

    #[test]
    fn test_values_coerced() {
        let config = store().resolve("audit", TransportKind::Http).unwrap();
        assert_eq!(config.port, 4151);
        assert_eq!(config.connection_timeout_secs, 5);
        assert_eq!(config.readwrite_timeout_secs, 7);
        assert_eq!(config.retry_times, 3);
        assert_eq!(config.log_file("request.log"), PathBuf::from("/var/log/audit/request.log"));
    }

    #[test]
    fn test_missing_module() {
        let err = store().resolve("nope", TransportKind::Http).unwrap_err();
        assert!(matches!(err, ConfigError::MissingModule { ref module } if module == "nope"));
    }

    #[test]
    fn test_missing_port_field() {
        let err = store().resolve("broken", TransportKind::Http).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "http_port", .. }));

        let err = store().resolve("audit", TransportKind::Tcp).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "tcp_port", .. }));
    }

    #[test]
    fn test_empty_host_is_missing() {
        let err = store().resolve("blank", TransportKind::Http).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "host", .. }));
    }

    #[test]
    fn test_malformed_entries() {
        assert!(matches!(store().resolve("badport", TransportKind::Http), Err(ConfigError::InvalidModule { .. })));
        assert!(matches!(store().resolve("flat", TransportKind::Http), Err(ConfigError::InvalidModule { .. })));
    }

    #[test]
    fn test_empty_table_is_invalid() {
        let store = ConfigStore::from_toml_str("[empty]\n").unwrap();
        assert!(matches!(store.resolve("empty", TransportKind::Http), Err(ConfigError::InvalidModule { .. })));
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let config = store().resolve("unbounded", TransportKind::Http).unwrap();
        assert_eq!(config.connection_timeout_secs, 0);
        assert_eq!(config.connection_timeout(), None);
        assert_eq!(config.readwrite_timeout(), None);
    }

    #[test]
    fn test_module_key_is_not_a_path() {
        assert!(matches!(store().resolve("billing.v2", TransportKind::Http), Err(ConfigError::MissingModule { .. })));
        assert!(matches!(store().resolve("orders.host", TransportKind::Http), Err(ConfigError::MissingModule { .. })));
        assert!(matches!(store().resolve("orders[0]", TransportKind::Http), Err(ConfigError::MissingModule { .. })));
        assert!(store().resolve("orders", TransportKind::Http).is_ok());
    }

    #[test]
    fn test_transport_names() {
        assert_eq!(TransportKind::Http.port_key(), "http_port");
        assert_eq!(TransportKind::Tcp.component(), "NsqTcpClient");
    }
}
