use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::error;
use tracing::info;

use crate::config::ConfigStore;
use crate::config::DEFAULT_LOG_PATH;
use crate::errors::NsqError;
use crate::errors::Result;
use crate::message::CallerIdentity;
use crate::message::ClientInfo;
use crate::publisher::NsqPublisher;
use crate::sink::LogSink;
use crate::sink::ERROR_LOG;
use crate::transport::Transport;

/// Module keys must be non-empty.
pub fn validate_module_key(module: &str) -> Result<()> {
    if module.is_empty() {
        return Err(NsqError::argument("module key can not be empty"));
    }
    Ok(())
}

/// One publisher per module key, built on first use and kept for the life of the registry.
///
/// Lookups for a new key run under a mutex so that concurrent first calls build
/// exactly one transport. Failed constructions are logged and not cached.
pub struct Registry<T: Transport> {
    store: Arc<ConfigStore>,
    sink: Arc<dyn LogSink>,
    error_log: PathBuf,
    instances: Mutex<HashMap<String, Arc<NsqPublisher<T>>>>,
}

impl<T: Transport> Registry<T> {
    pub fn new(store: Arc<ConfigStore>, sink: Arc<dyn LogSink>) -> Self {
        Self { store, sink, error_log: Path::new(DEFAULT_LOG_PATH).join(ERROR_LOG), instances: Mutex::new(HashMap::new()) }
    }

    /// Override where construction failures are logged (default `logs/nsq/error.log`)
    pub fn with_error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log = path.into();
        self
    }

    pub fn error_log(&self) -> &Path {
        &self.error_log
    }

    pub fn get_or_create(&self, module: &str) -> Result<Arc<NsqPublisher<T>>> {
        self.get_or_create_with(module, None)
    }

    /// Like [`get_or_create`](Self::get_or_create); `caller` only enriches the failure log.
    pub fn get_or_create_with(&self, module: &str, caller: Option<CallerIdentity>) -> Result<Arc<NsqPublisher<T>>> {
        let result = self.lookup(module);

        if let Err(err) = &result {
            self.report_failure(module, &ClientInfo::for_module(module, caller), err);
        }

        result
    }

    fn lookup(&self, module: &str) -> Result<Arc<NsqPublisher<T>>> {
        validate_module_key(module)?;

        let mut instances = self.instances.lock();
        if let Some(publisher) = instances.get(module) {
            return Ok(Arc::clone(publisher));
        }

        let config = self.store.resolve(module, T::KIND)?;
        let transport = T::connect(&config)?;
        info!("{} instance created for module {module} ({})", T::KIND.component(), config.address());

        let publisher = Arc::new(NsqPublisher::new(config, transport, Arc::clone(&self.sink)));
        instances.insert(module.to_string(), Arc::clone(&publisher));

        Ok(publisher)
    }

    /// Write a construction/validation failure to the fixed error log.
    pub fn report_failure(&self, module: &str, context: &Value, err: &NsqError) {
        error!("{} failed for module {module:?}: {err}", T::KIND.component());
        self.sink.error(T::KIND.component(), &self.error_log, &err.to_string(), context);
    }

    /// Module keys with a cached instance
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.instances.lock().keys().cloned().collect();
        modules.sort();
        modules
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}
