//! # nsq_http
//!
//! NSQ publisher over nsqd's HTTP interface.

pub mod client;

use std::future::Future;
use std::sync::Arc;

pub use client::HttpTransport;
pub use client::HttpTransportConfig;
use nsq_core::ConfigStore;
use nsq_core::LogSink;
use nsq_core::NsqPublisher;
use nsq_core::Registry;
use nsq_core::Result;
use serde::Serialize;

pub type HttpPublisher = NsqPublisher<HttpTransport>;

/// Hands out one cached HTTP publisher per module key.
pub struct NsqHttpClient {
    registry: Registry<HttpTransport>,
}

impl NsqHttpClient {
    pub fn new(store: Arc<ConfigStore>, sink: Arc<dyn LogSink>) -> Self {
        Self { registry: Registry::new(store, sink) }
    }

    pub fn from_registry(registry: Registry<HttpTransport>) -> Self {
        Self { registry }
    }

    /// Publisher for `module`, built from config on first use.
    pub fn get_instance(&self, module: &str) -> Result<Arc<HttpPublisher>> {
        self.registry.get_or_create(module)
    }

    pub fn registry(&self) -> &Registry<HttpTransport> {
        &self.registry
    }
}

/// `pub`/`mpub` calls on an HTTP publisher.
pub trait HttpPublish {
    fn pub_message<M: Serialize + ?Sized>(&self, message: &M) -> impl Future<Output = Result<()>> + Send;

    fn mpub<M: Serialize>(&self, messages: &[M]) -> impl Future<Output = Result<()>> + Send;
}

impl HttpPublish for HttpPublisher {
    fn pub_message<M: Serialize + ?Sized>(&self, message: &M) -> impl Future<Output = Result<()>> + Send {
        self.publish_one(message, None)
    }

    fn mpub<M: Serialize>(&self, messages: &[M]) -> impl Future<Output = Result<()>> + Send {
        self.publish_batch(messages, None)
    }
}
