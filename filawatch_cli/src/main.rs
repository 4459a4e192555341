mod cli;
mod console;
mod error_fmt;
mod run;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use eyre::Result;
use filawatch_config::{Config, Logging};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Cli::parse();
    let _ = JSON_MODE.set(args.json);
    let _ = color_eyre::install();

    match dispatch(args) {
        Ok(()) => {}
        Err(err) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            std::process::exit(error_fmt::exit_code_for_error(&err));
        }
    }
}

fn dispatch(args: Cli) -> Result<()> {
    let cfg = Config::load(&args.config)?;
    // CLI flag wins over the config's logging.level.
    let level = args
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".into());
    init_tracing(&level, args.json, &cfg.logging);

    match args.cmd {
        Commands::Check => {
            println!(
                "config OK: sensor '{}' watching extruder '{}' (detection length {:.2} mm)",
                cfg.sensor.name, cfg.sensor.extruder, cfg.sensor.detection_length
            );
            Ok(())
        }
        Commands::Run { duration_s } => run::run(&cfg, duration_s, args.json),
    }
}

fn init_tracing(level: &str, json: bool, logging: &Logging) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if let Some(path) = &logging.file {
        let path = Path::new(path);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "filawatch.log".to_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, file),
            Some("hourly") => tracing_appender::rolling::hourly(dir, file),
            _ => tracing_appender::rolling::never(dir, file),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false);
        if json {
            let _ = builder.json().try_init();
        } else {
            let _ = builder.try_init();
        }
    } else {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        if json {
            let _ = builder.json().try_init();
        } else {
            let _ = builder.try_init();
        }
    }
}
