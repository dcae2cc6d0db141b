//! Smart Confidant — точка входа.

use clap::Parser;
use smart_confidant::config::AppConfig;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "smart_confidant", version, about = "Magic: The Gathering chat assistant")]
struct Args {
    /// Адрес прослушивания (перекрывает HOST)
    #[arg(long)]
    host: Option<String>,
    /// Порт (перекрывает PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = AppConfig::load()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    smart_confidant::run(config).await
}
