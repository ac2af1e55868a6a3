use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use line_bot::config::ChannelConfig;
use line_bot::error::Result;
use line_bot::events::{Message, Operation};
use line_bot::webhook::{self, AppState, EventHandler};

#[derive(Parser, Debug)]
#[command(name = "line-botd")]
#[command(about = "LINE bot webhook daemon")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 7878)]
    port: u16,

    #[arg(long, env = "LINE_CHANNEL_ID")]
    channel_id: String,

    #[arg(long, env = "LINE_CHANNEL_SECRET")]
    channel_secret: String,

    #[arg(long, env = "LINE_CHANNEL_MID")]
    channel_mid: String,
}

struct LogHandler;

#[async_trait::async_trait]
impl EventHandler for LogHandler {
    async fn on_message(&self, message: &Message) {
        tracing::info!(
            id = %message.id,
            from = %message.from,
            content_type = message.content_type,
            "received message"
        );
    }

    async fn on_operation(&self, operation: &Operation) {
        tracing::info!(
            revision = operation.revision,
            op_type = operation.op_type,
            "received operation"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,line_bot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let config = ChannelConfig::new(cli.channel_id, cli.channel_secret, cli.channel_mid);
    let state = AppState::new(config, Arc::new(LogHandler));
    webhook::run(&cli.host, cli.port, state).await
}
