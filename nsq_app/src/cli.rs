use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::ValueEnum;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Http,
    Tcp,
}

/// Publish JSON messages read from stdin (one per line) to an NSQ module.
#[derive(Debug, Parser)]
#[command(name = "nsq_publish", version)]
pub struct Cli {
    /// Module config file (TOML/YAML/JSON)
    #[arg(long, default_value = "nsq.toml")]
    pub config: PathBuf,

    /// Module key to publish to
    #[arg(long)]
    pub module: String,

    #[arg(long, value_enum, default_value_t = TransportArg::Http)]
    pub transport: TransportArg,

    /// Caller user id (tcp only)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub user_id: i64,

    /// Caller corp id (tcp only)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub corp_id: i64,

    /// Send all lines as one batch instead of one request per line
    #[arg(long)]
    pub batch: bool,

    /// Directory for the application log and the shared error log
    #[arg(long, default_value = "logs/nsq")]
    pub log_dir: PathBuf,

    /// Mirror application logs to stdout
    #[arg(long)]
    pub stdout: bool,
}

/// Parse one JSON value per non-blank line.
pub fn read_messages<R: BufRead>(reader: R) -> anyhow::Result<Vec<Value>> {
    let mut messages = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let message = serde_json::from_str(&line).with_context(|| format!("line {} is not valid JSON", index + 1))?;
        messages.push(message);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_read_messages_skips_blank_lines() {
        let input = "{\"a\":1}\n\n  \n{\"a\":2}\n";
        let messages = read_messages(input.as_bytes()).unwrap();
        assert_eq!(messages, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_read_messages_reports_line() {
        let err = read_messages("{\"a\":1}\nnot json\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::parse_from(["nsq_publish", "--module", "orders", "--transport", "tcp", "--user-id", "5", "--corp-id", "9", "--batch"]);
        assert_eq!(cli.module, "orders");
        assert_eq!(cli.transport, TransportArg::Tcp);
        assert_eq!((cli.user_id, cli.corp_id), (5, 9));
        assert!(cli.batch);
        assert_eq!(cli.config, PathBuf::from("nsq.toml"));
    }

    #[test]
    fn test_transport_defaults_to_http() {
        let cli = Cli::parse_from(["nsq_publish", "--module", "orders"]);
        assert_eq!(cli.transport, TransportArg::Http);
        assert!(!cli.batch);
    }
}
