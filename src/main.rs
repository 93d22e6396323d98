use clap::Parser;

use buildtrack::cli::Cli;
use buildtrack::logging::{LogFormat, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    init_tracing(LogFormat::from_env()?);

    Cli::parse().run().await
}
