//! # nsq_tcp
//!
//! NSQ publisher over a persistent nsqd TCP connection, driven by a
//! `tokio_nsq` producer. Every publish carries the caller's identity into its
//! log records.

pub mod connection;

use std::sync::Arc;

pub use connection::TcpTransport;
use nsq_core::CallerIdentity;
use nsq_core::ConfigStore;
use nsq_core::LogSink;
use nsq_core::NsqPublisher;
use nsq_core::Registry;
use nsq_core::Result;
use nsq_core::registry::validate_module_key;
use serde::Serialize;
use serde_json::json;

pub type TcpPublisher = NsqPublisher<TcpTransport>;

/// Hands out one cached TCP publisher per module key, bound to a caller identity.
pub struct NsqTcpClient {
    registry: Registry<TcpTransport>,
}

impl NsqTcpClient {
    pub fn new(store: Arc<ConfigStore>, sink: Arc<dyn LogSink>) -> Self {
        Self { registry: Registry::new(store, sink) }
    }

    pub fn from_registry(registry: Registry<TcpTransport>) -> Self {
        Self { registry }
    }

    /// Publisher for `module`, acting on behalf of `user_id`/`corp_id` (both must be positive).
    ///
    /// The underlying connection is shared by every handle for the same module;
    /// the identity only lives in the returned handle.
    pub fn get_instance(&self, module: &str, user_id: i64, corp_id: i64) -> Result<TcpPublisherHandle> {
        let caller = match validate_module_key(module).and_then(|()| CallerIdentity::new(user_id, corp_id)) {
            Ok(caller) => caller,
            Err(err) => {
                let context = json!({ "module": module, "user_id": user_id, "corp_id": corp_id });
                self.registry.report_failure(module, &context, &err);
                return Err(err);
            }
        };

        let publisher = self.registry.get_or_create_with(module, Some(caller))?;
        Ok(TcpPublisherHandle { publisher, caller })
    }

    pub fn registry(&self) -> &Registry<TcpTransport> {
        &self.registry
    }
}

/// A module's TCP publisher plus the identity logged with each publish.
pub struct TcpPublisherHandle {
    publisher: Arc<TcpPublisher>,
    caller: CallerIdentity,
}

impl TcpPublisherHandle {
    pub async fn pub_message<M: Serialize + ?Sized>(&self, message: &M) -> Result<()> {
        self.publisher.publish_one(message, Some(self.caller)).await
    }

    pub async fn mpub<M: Serialize>(&self, messages: &[M]) -> Result<()> {
        self.publisher.publish_batch(messages, Some(self.caller)).await
    }

    pub fn publisher(&self) -> &Arc<TcpPublisher> {
        &self.publisher
    }

    pub fn caller(&self) -> CallerIdentity {
        self.caller
    }
}
