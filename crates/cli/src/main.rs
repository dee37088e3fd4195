// shopkeep CLI - identity resolution over user, order and catalog exports

mod exit_codes;
mod export;
mod report;
mod resolve;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exit_codes::{identity_exit_code, EXIT_RUNTIME, EXIT_SUCCESS};
use shopkeep_identity::IdentityError;

#[derive(Parser)]
#[command(name = "shopkeep")]
#[command(about = "Merge user records that share a phone or email under one canonical ID")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve identities from a TOML config file
    #[command(after_help = "\
Examples:
  shopkeep resolve shop.identity.toml
  shopkeep resolve shop.identity.toml --json
  shopkeep resolve shop.identity.toml --output run.json
  shopkeep resolve shop.identity.toml --users-out users.csv --orders-out orders.csv
  shopkeep resolve shop.identity.toml --strict --max-cluster 50")]
    Resolve {
        /// Path to the .identity.toml config file
        config: PathBuf,

        /// Also write JSON to stdout (the summary still goes to stderr)
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the user table with a real_user_id column
        #[arg(long, value_name = "CSV")]
        users_out: Option<PathBuf>,

        /// Write the order table with paid_price, date and real_user_id columns
        #[arg(long, value_name = "CSV")]
        orders_out: Option<PathBuf>,

        /// Fail (exit 5) on oversized clusters or clusters joined by a missing attribute
        #[arg(long)]
        strict: bool,

        /// Largest acceptable cluster size
        #[arg(long, value_name = "N")]
        max_cluster: Option<usize>,
    },

    /// Validate an identity config without running
    #[command(after_help = "\
Examples:
  shopkeep validate shop.identity.toml")]
    Validate {
        /// Path to the .identity.toml config file
        config: PathBuf,
    },

    /// Print revenue and buyer metrics for a config
    #[command(after_help = "\
Examples:
  shopkeep report shop.identity.toml")]
    Report {
        /// Path to the .identity.toml config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ")",
        "\nengine:  shopkeep-identity ",
        env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "shopkeep=debug,shopkeep_identity=debug"
    } else {
        "shopkeep=info,shopkeep_identity=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Resolve {
            config,
            json,
            output,
            users_out,
            orders_out,
            strict,
            max_cluster,
        } => resolve::cmd_resolve(resolve::ResolveArgs {
            config,
            json,
            output,
            users_out,
            orders_out,
            strict,
            max_cluster,
        }),
        Commands::Validate { config } => resolve::cmd_validate(config),
        Commands::Report { config } => report::cmd_report(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IdentityError> for CliError {
    fn from(err: IdentityError) -> Self {
        let hint = match &err {
            IdentityError::MissingColumn { table, .. } => {
                Some(format!("map the column under [{table}.columns] in the config"))
            }
            _ => None,
        };
        Self { code: identity_exit_code(&err), message: err.to_string(), hint }
    }
}
