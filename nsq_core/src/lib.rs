//! # nsq_core
//!
//! Shared publish workflow for the NSQ HTTP and TCP clients: module config
//! resolution, per-module instance registry, JSON encoding, fixed-count retry
//! and structured request/retry/error logging.

pub mod config;
pub mod errors;
pub mod message;
pub mod publisher;
pub mod registry;
pub mod sink;
pub mod transport;

pub use config::ConfigStore;
pub use config::ModuleConfig;
pub use config::TransportKind;
pub use errors::ConfigError;
pub use errors::ErrorKind;
pub use errors::NsqError;
pub use errors::Result;
pub use errors::TransportError;
pub use message::CallerIdentity;
pub use message::ClientInfo;
pub use message::Command;
pub use message::Payload;
pub use publisher::NsqPublisher;
pub use registry::Registry;
pub use sink::FileLogSink;
pub use sink::LogSink;
pub use sink::MemoryLogSink;
pub use sink::TracingLogSink;
pub use transport::Transport;
