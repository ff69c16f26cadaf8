//! Tidings CLI entry point.

use anyhow::Result;
use clap::Parser;
use tidings::cli::{commands, Cli, Commands};
use tidings::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // -v wins over the configured level; RUST_LOG wins over both
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tidings={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    match cli.command {
        None => {
            commands::run_chat(None, false, settings).await?;
        }

        Some(Commands::Chat { model, show_steps }) => {
            commands::run_chat(model, show_steps, settings).await?;
        }

        Some(Commands::Ask {
            question,
            model,
            show_steps,
        }) => {
            commands::run_ask(&question, model, show_steps, settings).await?;
        }

        Some(Commands::Events { count }) => {
            commands::run_events(count, settings).await?;
        }

        Some(Commands::Mail { count, days }) => {
            commands::run_mail(count, days, settings).await?;
        }

        Some(Commands::Auth) => {
            commands::run_auth(settings).await?;
        }

        Some(Commands::Doctor) => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(&action, settings, config_path.clone())?;
        }
    }

    Ok(())
}
