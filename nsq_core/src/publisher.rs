use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::config::ModuleConfig;
use crate::errors::NsqError;
use crate::errors::Result;
use crate::message::CallerIdentity;
use crate::message::ClientInfo;
use crate::message::Command;
use crate::message::Payload;
use crate::sink::LogSink;
use crate::sink::ERROR_LOG;
use crate::sink::REQUEST_LOG;
use crate::sink::RETRY_LOG;
use crate::transport::Transport;

/// Publishes JSON messages for one module through a transport, with a fixed
/// retry budget and a log record for every request, retry and failure.
///
/// Instances are owned by a [`Registry`](crate::Registry) and shared as `Arc`;
/// the type is deliberately not `Clone`.
pub struct NsqPublisher<T: Transport> {
    config: ModuleConfig,
    transport: T,
    sink: Arc<dyn LogSink>,
}

impl<T: Transport> fmt::Debug for NsqPublisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NsqPublisher").field("module", &self.config.module).field("kind", &T::KIND).field("config", &self.config).finish_non_exhaustive()
    }
}

impl<T: Transport> NsqPublisher<T> {
    pub fn new(config: ModuleConfig, transport: T, sink: Arc<dyn LogSink>) -> Self {
        Self { config, transport, sink }
    }

    pub fn module(&self) -> &str {
        &self.config.module
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Publish one message.
    pub fn publish_one<M: Serialize + ?Sized>(
        &self,
        message: &M,
        caller: Option<CallerIdentity>,
    ) -> impl Future<Output = Result<()>> + Send + '_ {
        let encoded = Payload::encode_one(message);
        self.deliver(Command::Single, encoded, caller)
    }

    /// Publish many messages as one atomic batch.
    pub fn publish_batch<M: Serialize>(
        &self,
        messages: &[M],
        caller: Option<CallerIdentity>,
    ) -> impl Future<Output = Result<()>> + Send + '_ {
        let encoded = Payload::encode_batch(messages);
        self.deliver(Command::Batch, encoded, caller)
    }

    /// Publish in the given mode. Single mode takes exactly one message.
    pub fn publish<M: Serialize>(
        &self,
        command: Command,
        messages: &[M],
        caller: Option<CallerIdentity>,
    ) -> impl Future<Output = Result<()>> + Send + '_ {
        let encoded = match (command, messages) {
            (Command::Batch, _) => Payload::encode_batch(messages),
            (Command::Single, [message]) => Payload::encode_one(message),
            (Command::Single, []) => Err(NsqError::argument("nsq data is empty")),
            (Command::Single, _) => Err(NsqError::argument("single publish takes exactly one message")),
        };
        self.deliver(command, encoded, caller)
    }

    async fn deliver(&self, command: Command, encoded: Result<(Payload, Value)>, caller: Option<CallerIdentity>) -> Result<()> {
        let request_id = Uuid::now_v7().to_string();
        let mut info = ClientInfo::new(&self.config, T::KIND, command, caller, &request_id);

        let result = match encoded {
            Ok((payload, values)) => {
                info.payloads = values;
                self.send_with_retry(&payload, &mut info).await
            }
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            self.sink.error(
                T::KIND.component(),
                &self.config.log_file(ERROR_LOG),
                &format!("RequestId: {request_id}, Error: {err}"),
                &context(&info),
            );
        }

        result
    }

    async fn send_with_retry(&self, payload: &Payload, info: &mut ClientInfo) -> Result<()> {
        let component = T::KIND.component();
        let attempts = self.config.retry_times.saturating_add(1);
        let start = Instant::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.send(&self.config.topic, payload).await {
                Ok(()) => {
                    info.request_time_secs = Some(start.elapsed().as_secs_f64());
                    self.sink.info(component, &self.config.log_file(REQUEST_LOG), &format!("RequestId: {}", info.request_id), &context(info));
                    debug!("{} published to {} on attempt {attempt}", info.cmd, self.config.topic);
                    return Ok(());
                }
                Err(err) if attempt < attempts => {
                    warn!("Attempt {attempt}/{attempts} to {} {} failed: {err}", info.cmd, self.config.topic);
                    self.sink.error(
                        component,
                        &self.config.log_file(RETRY_LOG),
                        &format!("RequestId: {}, Times: {attempt}, Error: {err}", info.request_id),
                        &context(info),
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn context(info: &ClientInfo) -> Value {
    serde_json::to_value(info).unwrap_or_default()
}
