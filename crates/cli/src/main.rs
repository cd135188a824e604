use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::Context;
use broker_entrypoint::config::{Config, CONFIG_ENV};
use broker_entrypoint::Identity;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Entrypoint settings.
///
/// Parsed from the environment only: the parser is never given the real
/// argv, so there is no help or version output. Every command line argument
/// belongs to the broker and is forwarded untouched.
#[derive(Parser, Debug)]
#[command(name = "broker-entrypoint")]
struct Settings {
    /// Path of the TOML config file
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,
    /// Log filter, overrides `log.level` from the config
    #[arg(long, env = "RUST_LOG")]
    log: Option<String>,
}

fn init_logging(directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log filter {directive:?}"))?;

    // stdout belongs to the broker
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let settings = Settings::parse_from([env!("CARGO_BIN_NAME")]);
    let config = Config::discover(settings.config.as_deref())?;

    init_logging(settings.log.as_deref().unwrap_or(&config.log.level))?;

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let identity = Identity::current();
    tracing::debug!(uid = identity.uid(), gid = identity.gid(), args = args.len(), "starting");

    // Only reached when startup failed
    let err = broker_entrypoint::run(config, identity, args);
    eprintln!("Error: {err}");

    Ok(ExitCode::from(err.exit_code()))
}
