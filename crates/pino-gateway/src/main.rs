//! pino: Slack <-> IRC bridge
//!
//! Usage:
//!   pino                     - Start the bridge (config from PINO_CONFIG or ./pino.toml)
//!   pino --config <path>     - Start the bridge with an explicit config file
//!   pino --check [<path>]    - Validate the configuration and exit
//!   pino --help              - Show help

use std::path::PathBuf;

use pino_core::Config;
use pino_relay::Bridge;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Run the bridge
    Run(Option<PathBuf>),
    /// Load and validate the configuration only
    Check(Option<PathBuf>),
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("pino {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Run(ref path) | RunMode::Check(ref path) => path.clone(),
    };

    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let config = load_config(path).map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    if let RunMode::Check(_) = mode {
        println!(
            "Configuration OK: {} channel mapping(s), {} IRC channel(s) to join",
            config.channel_mapping.len(),
            config.irc_join_list().len()
        );
        return Ok(());
    }

    tracing::info!("Starting pino...");
    tracing::info!("IRC server: {} as {}", config.irc.server, config.irc.nickname);

    let bridge = Bridge::new(&config)?;

    tokio::select! {
        result = bridge.run() => {
            result?;
            tracing::info!("Bridge stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down...");
        }
    }

    Ok(())
}

/// `RUST_LOG` directives when they parse, `info` otherwise
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn load_config(path: Option<PathBuf>) -> pino_core::Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut path = None;
    let mut check = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--check" => check = true,
            "--config" | "-c" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("{} requires a path", arg))?;
                path = Some(PathBuf::from(value));
            }
            other if !other.starts_with('-') && path.is_none() => {
                path = Some(PathBuf::from(other));
            }
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    Ok(if check {
        RunMode::Check(path)
    } else {
        RunMode::Run(path)
    })
}

/// Print help message
fn print_help() {
    println!("pino - Slack <-> IRC bridge");
    println!();
    println!("Usage:");
    println!("  pino                     Start the bridge");
    println!("  pino --config <path>     Use an explicit config file (.toml or .yaml)");
    println!("  pino --check [<path>]    Validate the configuration and exit");
    println!("  pino --help              Show this help message");
    println!("  pino --version           Show version");
    println!();
    println!("Environment Variables:");
    println!("  PINO_CONFIG              Config file path (default: ./pino.toml, ./pino.yaml)");
    println!("  SLACK_TOKEN              Slack bot token (overrides the config file)");
    println!("  SLACK_APP_TOKEN          Slack app-level token for Socket Mode");
    println!("  IRC_SERVER               IRC server host:port");
    println!("  IRC_NICKNAME             IRC nickname");
    println!("  RUST_LOG                 Log filter (default: info)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<RunMode> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse(&[]).unwrap(), RunMode::Run(None));
        assert_eq!(parse(&["--help"]).unwrap(), RunMode::Help);
        assert_eq!(parse(&["-v"]).unwrap(), RunMode::Version);
        assert_eq!(
            parse(&["--config", "bridge.yaml"]).unwrap(),
            RunMode::Run(Some(PathBuf::from("bridge.yaml")))
        );
        assert_eq!(
            parse(&["--check", "pino.toml"]).unwrap(),
            RunMode::Check(Some(PathBuf::from("pino.toml")))
        );
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
    }

    #[test]
    fn test_log_filter_respects_rust_log() {
        assert_eq!(log_filter(Some("pino_relay=debug")).to_string(), "pino_relay=debug");
        assert_eq!(log_filter(Some("warn")).to_string(), "warn");
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("pino=loud")).to_string(), "info");
    }
}
