mod commands;
mod output;
mod session;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{App, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable with --json
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Another component may have installed one already
    let _ = rustls::crypto::ring::default_provider().install_default();

    let app = App::connect(cli.json).await?;
    app.run(cli.command).await
}
