//! Copilot CLI entry point.

use anyhow::Result;
use clap::Parser;
use copilot::cli::commands::{self, DumpArgs, GenerateArgs};
use copilot::cli::{Cli, Commands};
use copilot::config::Settings;
use copilot::orchestrator::RunOverrides;
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

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("copilot={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    match cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Generate {
            title,
            level,
            weeks,
            style,
            document,
            mime,
            output,
        } => {
            let args = GenerateArgs {
                title,
                level,
                weeks,
                style,
                document,
                mime,
                output,
            };
            commands::run_generate(args, settings).await?;
        }

        Commands::Run {
            preset,
            message,
            interactive,
            level,
            weeks,
            style,
            session,
            new_session,
        } => {
            let overrides = RunOverrides {
                level,
                duration_weeks: weeks,
                teaching_style: style,
                session_id: session,
                new_session,
            };
            commands::run_pipeline(&preset, &message, interactive, overrides, settings).await?;
        }

        Commands::Dump {
            session,
            app,
            max_chars,
            no_state,
            no_events,
            json,
            output,
        } => {
            let args = DumpArgs {
                session,
                app,
                max_chars,
                no_state,
                no_events,
                json,
                output,
            };
            commands::run_dump(args, settings)?;
        }

        Commands::Sessions => {
            commands::run_sessions(settings)?;
        }

        Commands::Export {
            key,
            session,
            output,
        } => {
            commands::run_export(&key, session, output, settings)?;
        }

        Commands::Presets => {
            commands::run_presets(settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, &config_path)?;
        }
    }

    Ok(())
}
