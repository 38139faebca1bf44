pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use karat_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use karat_core::domain::report::RunReport;

#[derive(Debug, Parser)]
#[command(
    name = "karat",
    about = "Storefront price updater for gold and silver jewelry",
    long_about = "Recalculate catalog prices from commodity rates and per-product \
                  attributes, and write the results back to the storefront.",
    after_help = "Examples:\n  karat auto\n  karat manual --gold-rate 7150 --exclude one-off-piece\n  karat diamond --prices 'lab grown:15000,natural:52000'"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to karat.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Fetch live gold/silver rates and reprice the whole catalog")]
    Auto,
    #[command(about = "Reprice with operator-supplied rates and optional handle filters")]
    Manual(ManualArgs),
    #[command(about = "Reprice diamond products from supplied prices or theme slots")]
    Diamond(DiamondArgs),
    #[command(about = "Inspect effective configuration with secrets redacted")]
    Config,
}

#[derive(Debug, Args)]
pub struct ManualArgs {
    #[arg(long, help = "Gold rate per gram (24K)")]
    pub gold_rate: Option<Decimal>,
    #[arg(long, help = "Silver rate per gram")]
    pub silver_rate: Option<Decimal>,
    #[arg(long, help = "Comma/newline separated handles to include (default: all)")]
    pub include: Option<String>,
    #[arg(long, help = "Comma/newline separated handles to exclude")]
    pub exclude: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiamondArgs {
    #[arg(
        long,
        help = "Diamond prices as a JSON object or label:price pairs; theme slots are used when omitted"
    )]
    pub prices: Option<String>,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Command::Config) {
        return commands::config::run(cli.config);
    }

    let config = match AppConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::from(2);
        }
    };
    init_logging(&config.logging);

    let result = match cli.command {
        Command::Auto => commands::auto::run(&config).await,
        Command::Manual(args) => commands::manual::run(&config, args).await,
        Command::Diamond(args) => commands::diamond::run(&config, args).await,
        Command::Config => unreachable!("handled before config load"),
    };

    match result {
        Ok(report) => exit_code_for(&report),
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "run aborted");
            ExitCode::from(2)
        }
    }
}

/// Partial failures surface through the exit code so schedulers alert on
/// them, exactly like a fatal abort would.
fn exit_code_for(report: &RunReport) -> ExitCode {
    if report.counts().failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rust_decimal::Decimal;

    use super::{Cli, Command};

    #[test]
    fn manual_arguments_parse_decimals_and_handles() {
        let cli = Cli::try_parse_from([
            "karat",
            "manual",
            "--gold-rate",
            "7150.50",
            "--include",
            "a,b",
        ])
        .expect("parse");

        match cli.command {
            Command::Manual(args) => {
                assert_eq!(args.gold_rate, Some("7150.50".parse::<Decimal>().unwrap()));
                assert_eq!(args.silver_rate, None);
                assert_eq!(args.include.as_deref(), Some("a,b"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_rate_is_a_parse_error() {
        assert!(Cli::try_parse_from(["karat", "manual", "--gold-rate", "lots"]).is_err());
    }

    #[test]
    fn global_config_flag_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["karat", "auto", "--config", "/tmp/karat.toml"])
            .expect("parse");
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/karat.toml")));
    }
}
