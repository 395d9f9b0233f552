use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use nsq_app::cli;
use nsq_app::cli::Cli;
use nsq_app::cli::TransportArg;
use nsq_app::config_loader;
use nsq_app::config_loader::NsqClients;
use nsq_app::tracing_setup;
use nsq_core::FileLogSink;
use nsq_http::HttpPublish;
use tracing::Level;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = tracing_setup::init("nsq_publish", &cli.log_dir, Level::INFO, cli.stdout);

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        info!("Reading messages from stdin, one JSON value per line");
    }
    let messages = cli::read_messages(stdin.lock())?;
    if messages.is_empty() {
        bail!("no messages on stdin");
    }

    let store = Arc::new(config_loader::load_store(&cli.config)?);
    let clients = NsqClients::new(store, Arc::new(FileLogSink::new()), &cli.log_dir);

    match cli.transport {
        TransportArg::Http => {
            let publisher = clients.http.get_instance(&cli.module)?;
            if cli.batch {
                publisher.mpub(&messages).await?;
            } else {
                for message in &messages {
                    publisher.pub_message(message).await?;
                }
            }
        }
        TransportArg::Tcp => {
            let handle = clients.tcp.get_instance(&cli.module, cli.user_id, cli.corp_id)?;
            if cli.batch {
                handle.mpub(&messages).await?;
            } else {
                for message in &messages {
                    handle.pub_message(message).await?;
                }
            }
        }
    }

    info!("Published {} message(s) to module {}", messages.len(), cli.module);
    Ok(())
}
