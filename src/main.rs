use anyhow::Context;

mod app;
mod commands;
mod config;
mod db;
mod error;
mod feed;
mod models;

use app::State;
use commands::Command;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = match Command::from_args(std::env::args().skip(1)) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Command failed: {}", e);
            std::process::exit(1);
        }
    };

    let config = Config::load().context("failed to load config")?;
    let mut state = State::new(config)
        .await
        .context("failed to open database")?;

    let cmds = commands::registry();
    if let Err(e) = cmds.run(&mut state, cmd).await {
        eprintln!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
