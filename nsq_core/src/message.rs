use serde::Serialize;
use serde_json::Value;

use crate::config::ModuleConfig;
use crate::config::TransportKind;
use crate::errors::NsqError;
use crate::errors::Result;

/// Publish mode: one message per request, or many in a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Single,
    Batch,
}

impl Command {
    /// Command name as each transport spells it (`pub`/`mpub` over HTTP, `publish`/`mpublish` over TCP)
    pub fn name(self, kind: TransportKind) -> &'static str {
        match (kind, self) {
            (TransportKind::Http, Self::Single) => "pub",
            (TransportKind::Http, Self::Batch) => "mpub",
            (TransportKind::Tcp, Self::Single) => "publish",
            (TransportKind::Tcp, Self::Batch) => "mpublish",
        }
    }
}

/// Messages after JSON encoding, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Single(String),
    Batch(Vec<String>),
}

impl Payload {
    /// Encode one message. It must be a non-empty JSON object or array.
    pub fn encode_one<M: Serialize + ?Sized>(message: &M) -> Result<(Self, Value)> {
        let value = serde_json::to_value(message)?;
        if !is_non_empty_sequence(&value) {
            return Err(NsqError::argument("nsq data is empty or not an array"));
        }

        Ok((Self::Single(serde_json::to_string(message)?), value))
    }

    /// Encode each message independently, preserving order.
    pub fn encode_batch<M: Serialize>(messages: &[M]) -> Result<(Self, Value)> {
        if messages.is_empty() {
            return Err(NsqError::argument("nsq data is empty"));
        }

        let mut encoded = Vec::with_capacity(messages.len());
        let mut values = Vec::with_capacity(messages.len());
        for message in messages {
            encoded.push(serde_json::to_string(message)?);
            values.push(serde_json::to_value(message)?);
        }

        Ok((Self::Batch(encoded), Value::Array(values)))
    }

    pub fn command(&self) -> Command {
        match self {
            Self::Single(_) => Command::Single,
            Self::Batch(_) => Command::Batch,
        }
    }

    /// Encoded messages as a slice, one entry per message
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Single(message) => std::slice::from_ref(message),
            Self::Batch(messages) => messages,
        }
    }

    /// Line-delimited body: newline-joined for batches, the message itself otherwise
    pub fn to_body(&self) -> String {
        match self {
            Self::Single(message) => message.clone(),
            Self::Batch(messages) => messages.join("\n"),
        }
    }
}

fn is_non_empty_sequence(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => false,
    }
}

/// Who triggered a publish. Required by the TCP client, logged with every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CallerIdentity {
    pub user_id: u64,
    pub corp_id: u64,
}

impl CallerIdentity {
    /// Both ids must be positive.
    pub fn new(user_id: i64, corp_id: i64) -> Result<Self> {
        if user_id > 0 && corp_id > 0 {
            Ok(Self { user_id: user_id as u64, corp_id: corp_id as u64 })
        } else {
            Err(NsqError::argument("userId or corpId is wrong"))
        }
    }
}

/// Context attached to every request, retry and error log record.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corp_id: Option<u64>,
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub cmd: &'static str,
    pub payloads: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_time_secs: Option<f64>,
    pub request_id: String,
}

impl ClientInfo {
    pub fn new(config: &ModuleConfig, kind: TransportKind, command: Command, caller: Option<CallerIdentity>, request_id: &str) -> Self {
        Self {
            module: config.module.clone(),
            user_id: caller.map(|c| c.user_id),
            corp_id: caller.map(|c| c.corp_id),
            host: config.host.clone(),
            port: config.port,
            topic: config.topic.clone(),
            cmd: command.name(kind),
            payloads: Value::Null,
            request_time_secs: None,
            request_id: request_id.to_string(),
        }
    }

    /// Context used before any instance exists, e.g. when construction fails
    pub fn for_module(module: &str, caller: Option<CallerIdentity>) -> Value {
        serde_json::json!({
            "module": module,
            "user_id": caller.map(|c| c.user_id),
            "corp_id": caller.map(|c| c.corp_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_batch_body_is_newline_joined() {
        let (payload, values) = Payload::encode_batch(&[json!({"a": 1}), json!({"a": 2})]).unwrap();
        assert_eq!(payload.to_body(), "{\"a\":1}\n{\"a\":2}");
        assert_eq!(payload.messages(), &["{\"a\":1}".to_string(), "{\"a\":2}".to_string()]);
        assert_eq!(values, json!([{"a": 1}, {"a": 2}]));
        assert_eq!(payload.command(), Command::Batch);
    }

    #[test]
    fn test_single_encoding_is_compact() {
        let (payload, _) = Payload::encode_one(&json!({"id": 7, "tags": ["x", "y"]})).unwrap();
        assert_eq!(payload, Payload::Single("{\"id\":7,\"tags\":[\"x\",\"y\"]}".to_string()));
    }

    #[test]
    fn test_empty_payloads_rejected() {
        let empty: [Value; 0] = [];
        assert!(matches!(Payload::encode_batch(&empty), Err(NsqError::Argument(_))));
        assert!(matches!(Payload::encode_one(&json!({})), Err(NsqError::Argument(_))));
        assert!(matches!(Payload::encode_one(&json!([])), Err(NsqError::Argument(_))));
        assert!(matches!(Payload::encode_one(&Value::Null), Err(NsqError::Argument(_))));
    }

    #[test]
    fn test_scalar_single_message_rejected() {
        for scalar in [json!("hello"), json!(42), json!(0), json!(true)] {
            assert!(matches!(Payload::encode_one(&scalar), Err(NsqError::Argument(_))), "{scalar} should be rejected");
        }
        assert!(Payload::encode_one(&json!(["hello"])).is_ok());
        assert!(Payload::encode_one("hello").is_err());
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::Single.name(TransportKind::Http), "pub");
        assert_eq!(Command::Batch.name(TransportKind::Http), "mpub");
        assert_eq!(Command::Single.name(TransportKind::Tcp), "publish");
        assert_eq!(Command::Batch.name(TransportKind::Tcp), "mpublish");
    }

    #[test]
    fn test_caller_identity_validation() {
        assert!(CallerIdentity::new(1, 2).is_ok());
        assert!(CallerIdentity::new(0, 2).is_err());
        assert!(CallerIdentity::new(3, -1).is_err());
    }

    #[test]
    fn test_client_info_omits_identity_for_http() {
        let config = ModuleConfig {
            module: "orders".into(),
            host: "h".into(),
            port: 4151,
            topic: "t".into(),
            log_path: "logs/".into(),
            connection_timeout_secs: 3,
            readwrite_timeout_secs: 3,
            retry_times: 1,
        };
        let info = ClientInfo::new(&config, TransportKind::Http, Command::Single, None, "req-1");
        let encoded = serde_json::to_value(&info).unwrap();
        assert!(encoded.get("user_id").is_none());
        assert_eq!(encoded["cmd"], "pub");
        assert_eq!(encoded["request_id"], "req-1");
    }
}
