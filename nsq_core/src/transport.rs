use std::future::Future;

use crate::config::ModuleConfig;
use crate::config::TransportKind;
use crate::errors::TransportError;
use crate::message::Payload;

/// A connection to nsqd able to deliver encoded messages.
///
/// `connect` is called once per module by the registry and must not block on
/// network I/O; transports that hold a socket open it lazily on first `send`.
pub trait Transport: Send + Sync + Sized + 'static {
    const KIND: TransportKind;

    fn connect(config: &ModuleConfig) -> Result<Self, TransportError>;

    /// Deliver `payload` to `topic`. `Ok` means nsqd acknowledged the whole payload.
    fn send(&self, topic: &str, payload: &Payload) -> impl Future<Output = Result<(), TransportError>> + Send;
}
