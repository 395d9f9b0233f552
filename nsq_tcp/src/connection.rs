use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nsq_core::ModuleConfig;
use nsq_core::Payload;
use nsq_core::Transport;
use nsq_core::TransportError;
use nsq_core::TransportKind;
use tokio::sync::Mutex;
use tokio_nsq::NSQConfigShared;
use tokio_nsq::NSQEvent;
use tokio_nsq::NSQProducer;
use tokio_nsq::NSQProducerConfig;
use tokio_nsq::NSQTopic;
use tracing::info;
use tracing::warn;

/// How often queued commands are flushed to nsqd
const FLUSH_INTERVAL: Duration = Duration::from_millis(5);

/// Await `fut`, bounded by `timeout` unless it is `None`.
async fn with_timeout<T>(operation: &'static str, timeout: Option<Duration>, fut: impl Future<Output = T>) -> Result<T, TransportError> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, fut).await.map_err(|_| TransportError::Timeout { operation, timeout }),
        None => Ok(fut.await),
    }
}

/// Publishes through a `tokio_nsq` producer holding one nsqd connection.
///
/// The producer is started on the first send and reused afterwards. Any
/// failure drops it so the next attempt starts a fresh connection.
pub struct TcpTransport {
    address: String,
    connect_timeout: Option<Duration>,
    readwrite_timeout: Option<Duration>,
    producer: Mutex<Option<NSQProducer>>,
}

impl TcpTransport {
    /// `None` timeouts wait indefinitely.
    pub fn new(address: impl Into<String>, connect_timeout: Option<Duration>, readwrite_timeout: Option<Duration>) -> Self {
        Self { address: address.into(), connect_timeout, readwrite_timeout, producer: Mutex::new(None) }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn is_connected(&self) -> bool {
        self.producer.lock().await.is_some()
    }

    /// Start a producer and wait for its handshake with nsqd.
    async fn open(&self) -> Result<NSQProducer, TransportError> {
        let shared = NSQConfigShared::new().set_write_timeout(self.readwrite_timeout).set_flush_interval(FLUSH_INTERVAL);
        let mut producer = NSQProducerConfig::new(self.address.clone()).set_shared(shared).build();

        match with_timeout("nsqd connect", self.connect_timeout, producer.consume()).await? {
            Some(NSQEvent::Healthy()) => {
                info!("Connected to nsqd at {}", self.address);
                Ok(producer)
            }
            Some(event) => Err(TransportError::Protocol(format!("unexpected event before handshake: {event:?}"))),
            None => Err(TransportError::Protocol(format!("handshake with nsqd at {} failed", self.address))),
        }
    }

    /// Queue the payload and wait for nsqd to acknowledge it.
    async fn publish(&self, producer: &mut NSQProducer, topic: &Arc<NSQTopic>, payload: &Payload) -> Result<(), TransportError> {
        let queued = match payload {
            Payload::Single(message) => producer.publish(topic, message.clone().into_bytes()).await,
            Payload::Batch(messages) => producer.publish_multiple(topic, messages.iter().map(|message| message.clone().into_bytes()).collect()).await,
        };
        queued.map_err(|err| TransportError::Request(err.into()))?;

        match with_timeout("nsqd acknowledgement", self.readwrite_timeout, producer.consume()).await? {
            Some(NSQEvent::Ok()) => Ok(()),
            // the producer stops on a fatal E_* response
            None => Err(TransportError::Rejected("nsqd closed the connection before acknowledging".to_string())),
            Some(NSQEvent::Healthy()) | Some(NSQEvent::Unhealthy()) => {
                Err(TransportError::Protocol("nsqd connection restarted before acknowledging".to_string()))
            }
            Some(NSQEvent::Message(_)) => Err(TransportError::Protocol("message frame on a producer connection".to_string())),
        }
    }
}

impl Transport for TcpTransport {
    const KIND: TransportKind = TransportKind::Tcp;

    fn connect(config: &ModuleConfig) -> Result<Self, TransportError> {
        Ok(Self::new(config.address(), config.connection_timeout(), config.readwrite_timeout()))
    }

    async fn send(&self, topic: &str, payload: &Payload) -> Result<(), TransportError> {
        let topic = NSQTopic::new(topic).ok_or_else(|| TransportError::Protocol(format!("invalid topic name {topic:?}")))?;

        let mut slot = self.producer.lock().await;
        let mut producer = match slot.take() {
            Some(producer) => producer,
            None => self.open().await?,
        };

        let result = self.publish(&mut producer, &topic, payload).await;
        match &result {
            Ok(()) => *slot = Some(producer),
            Err(err) => warn!("Dropping nsqd producer for {} after error: {err}", self.address),
        }

        result
    }
}
