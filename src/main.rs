//! Tab Trail CLI - tab provenance tracking and trail reconstruction.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::process;
use tabtrail::cli::{Cli, Commands, ConfigCommands, LogFormat, SettingsCommands};
use tabtrail::commands::{self, CommandResult};
use tabtrail::config::{self, ConfigOverrides, ResolvedConfig};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (falls back to `RUST_LOG`).
const LOG_ENV: &str = "TT_LOG";

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    init_tracing(cli.log_format);

    let overrides = build_overrides(&cli);
    let result = config::resolve_config(&overrides)
        .and_then(|resolved| run_command(cli.command, &resolved, human));

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!(
                "{}",
                serde_json::json!({ "error": e.to_string() })
            );
        }
        process::exit(1);
    }
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
fn init_tracing(format: LogFormat) {
    let directive = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_default();
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directive);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn build_overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if let Some(dir) = &cli.data_dir {
        overrides = overrides.with_data_dir(dir);
    }
    if let Some(backend) = cli.backend {
        overrides = overrides.with_backend(backend);
    }
    if let Commands::Init {
        tracking_enabled,
        retention_days,
        max_pages_per_tab,
    } = &cli.command
    {
        if let Some(enabled) = *tracking_enabled {
            overrides = overrides.with_tracking_enabled(enabled);
        }
        if let Some(days) = *retention_days {
            overrides = overrides.with_retention_days(days);
        }
        if let Some(pages) = *max_pages_per_tab {
            overrides = overrides.with_max_pages_per_tab(pages);
        }
    }
    overrides
}

fn run_command(
    command: Commands,
    config: &ResolvedConfig,
    human: bool,
) -> Result<(), tabtrail::Error> {
    match command {
        Commands::Init { .. } => {
            let result = commands::init(config)?;
            output(&result, human);
        }

        Commands::Ingest { file, fail_fast } => {
            let storage = commands::open_storage(config)?;
            let seed = config.seed_settings();
            let result = match file.as_deref() {
                Some(path) if path != Path::new("-") => {
                    let reader = BufReader::new(File::open(path)?);
                    commands::ingest(storage, &seed, reader, fail_fast)?
                }
                _ => commands::ingest(storage, &seed, io::stdin().lock(), fail_fast)?,
            };
            output(&result, human);
        }

        Commands::Tabs { all } => {
            let storage = commands::open_storage(config)?;
            output(&commands::tabs(&storage, all)?, human);
        }

        Commands::Trail { tab_id } => {
            let storage = commands::open_storage(config)?;
            output(&commands::trail(&storage, &tab_id)?, human);
        }

        Commands::Stats => {
            let storage = commands::open_storage(config)?;
            output(&commands::stats(&storage)?, human);
        }

        Commands::Evict { days } => {
            let mut storage = commands::open_storage(config)?;
            output(&commands::evict(&mut storage, days)?, human);
        }

        Commands::Clear { force } => {
            let mut storage = commands::open_storage(config)?;
            output(&commands::clear(&mut storage, force)?, human);
        }

        Commands::Settings { command } => {
            let mut storage = commands::open_storage(config)?;
            let result = match command {
                SettingsCommands::Show => commands::settings_show(&storage)?,
                SettingsCommands::Set { key, value } => {
                    commands::settings_set(&mut storage, &key, &value)?
                }
            };
            output(&result, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(config), human),
        },
    }
    Ok(())
}

fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
