//! keg - post-install cleaner
//!
//! Thin CLI over `keg-cleaner` and `keg-platform`: loads configuration,
//! resolves the platform provider, runs the command and renders its events
//! and result.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod report;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use crate::report::{CommandResult, PlatformReport};
use clap::Parser;
use keg_cleaner::{Cleaner, InstalledPackage, ProtectedPaths};
use keg_config::{ColorChoice, Config};
use keg_events::{AppEvent, EventEmitter, EventReceiver, EventSender, PlatformEvent};
use keg_platform::{PlatformContext, PlatformManager};
use std::path::{Path, PathBuf};
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting keg v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: file (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);

    let (event_sender, event_receiver) = keg_events::channel();

    let manager = PlatformManager::instance();
    manager.init()?;
    let provider = manager.provider()?;
    event_sender.emit(AppEvent::Platform(PlatformEvent::ProviderResolved {
        platform: provider.kind().to_string(),
        full_name: provider.full_name().to_string(),
    }));

    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let renderer = OutputRenderer::new(cli.global.json, colors_enabled);
    let mut event_handler =
        EventHandler::new(colors_enabled, config.general.verbose, cli.global.json);

    let result = execute_command_with_events(
        cli.command,
        &config,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await;
    manager.teardown();

    renderer.render_result(&result?)?;
    info!("Command completed successfully");
    Ok(())
}

/// Run the command while draining its events
async fn execute_command_with_events(
    command: Commands,
    config: &Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

async fn execute_command(
    command: Commands,
    config: &Config,
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    let provider = keg_platform::provider()?;

    match command {
        Commands::Clean {
            prefix,
            name,
            skip,
            skip_all,
            ..
        } => {
            let prefix = resolve_prefix(&prefix, config)?;
            let package_name = name.unwrap_or_else(|| default_package_name(&prefix));

            let protection = if skip_all {
                ProtectedPaths::all()
            } else {
                skip.into_iter().collect()
            };
            let package = InstalledPackage::new(&package_name, &prefix).with_protection(protection);

            let report = Cleaner::new(provider)
                .with_config(config.cleaner.clone())
                .with_event_sender(event_sender)
                .clean(&package)
                .await?;

            Ok(CommandResult::Clean {
                package: package_name,
                prefix,
                report,
            })
        }

        Commands::Platform => {
            let ctx = PlatformContext::new(Some(event_sender));
            let report = PlatformReport::gather(&ctx, provider.as_ref()).await;
            Ok(CommandResult::Platform(report))
        }
    }
}

/// Use `prefix` as given when it exists, else look it up under the cellar
fn resolve_prefix(prefix: &Path, config: &Config) -> Result<PathBuf, CliError> {
    if prefix.is_dir() {
        return Ok(prefix.to_path_buf());
    }
    if prefix.is_relative() {
        let in_cellar = config.cellar_path().join(prefix);
        if in_cellar.is_dir() {
            return Ok(in_cellar);
        }
    }
    Err(CliError::InvalidArguments(format!(
        "{} is not a package prefix",
        prefix.display()
    )))
}

/// `<cellar>/<name>/<version>` prefixes are named after their parent directory
fn default_package_name(prefix: &Path) -> String {
    prefix
        .parent()
        .and_then(Path::file_name)
        .or_else(|| prefix.file_name())
        .map_or_else(|| "package".to_string(), |n| n.to_string_lossy().into_owned())
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color.into();
    }
    if global.verbose {
        config.general.verbose = true;
    }

    if let Commands::Clean {
        keep_info: true, ..
    } = command
    {
        config.cleaner.keep_info = true;
    }
}

fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if json_mode {
        // Keep stdout clean for the JSON result; logs go to stderr as JSON
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(if debug_enabled { "debug" } else { "off" })
                }),
            )
            .init();
    } else if debug_enabled {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,keg=debug")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_comes_from_cellar_layout() {
        assert_eq!(
            default_package_name(Path::new("/usr/local/Cellar/wget/1.21")),
            "wget"
        );
        assert_eq!(default_package_name(Path::new("tool")), "tool");
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from(["keg", "--color", "never", "-v", "clean", "/tmp", "--keep-info"]);
        let mut config = Config::default();
        apply_cli_config(&mut config, &cli.global, &cli.command);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert!(config.general.verbose);
        assert!(config.cleaner.keep_info);
    }

    #[test]
    fn relative_prefix_resolves_under_cellar() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.cellar = Some(dir.path().to_path_buf());
        std::fs::create_dir_all(dir.path().join("wget/1.0")).unwrap();

        let found = resolve_prefix(Path::new("wget/1.0"), &config).unwrap();
        assert_eq!(found, dir.path().join("wget/1.0"));
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.cellar = Some(dir.path().to_path_buf());

        let err = resolve_prefix(Path::new("/nonexistent/keg/prefix"), &config).unwrap_err();
        assert!(matches!(err, CliError::InvalidArguments(ref msg) if msg.contains("not a package prefix")));
        assert!(resolve_prefix(Path::new("wget/9.9"), &config).is_err());
    }
}
