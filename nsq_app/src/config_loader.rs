use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use nsq_core::ConfigError;
use nsq_core::ConfigStore;
use nsq_core::LogSink;
use nsq_core::Registry;
use nsq_core::sink::ERROR_LOG;
use nsq_http::NsqHttpClient;
use nsq_tcp::NsqTcpClient;

/// Load the NSQ module store from `path`, with `NSQ__<module>__<key>` env overrides.
pub fn load_store<P: AsRef<Path>>(path: P) -> Result<ConfigStore, ConfigError> {
    let path = path.as_ref();
    match ConfigStore::load(path) {
        Ok(store) => {
            tracing::info!("Loaded nsq config from {}", path.display());
            Ok(store)
        }
        Err(err) => {
            tracing::error!("Failed to load nsq config from {}: {err}", path.display());
            Err(err)
        }
    }
}

/// Both clients, sharing one config store and log sink. Owned by the process entry point.
pub struct NsqClients {
    pub http: NsqHttpClient,
    pub tcp: NsqTcpClient,
}

impl NsqClients {
    /// Construction failures are logged to `<log_dir>/error.log`.
    pub fn new(store: Arc<ConfigStore>, sink: Arc<dyn LogSink>, log_dir: impl Into<PathBuf>) -> Self {
        let error_log = log_dir.into().join(ERROR_LOG);

        Self {
            http: NsqHttpClient::from_registry(Registry::new(Arc::clone(&store), Arc::clone(&sink)).with_error_log(&error_log)),
            tcp: NsqTcpClient::from_registry(Registry::new(store, sink).with_error_log(error_log)),
        }
    }
}
