//! bindguard command line
//!
//! Checks callers against an allow-list using a captured package inventory,
//! fingerprints certificate files, and validates allow-lists.
//!
//! `check` exits with 0 when the caller is allowed and 1 when it is denied.
//! Any error exits with 2.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use bindguard::access::{AccessDecision, CertificateSelection, DigestAlgorithm, Uid};
use bindguard::commands::{
    format_allow_list, resolve_config, AllowListCommand, CheckCommand, CheckTarget, HashCommand,
};
use bindguard::core::{AppConfig, APP_NAME, VERSION};

const DENIED: u8 = 1;
const FAILED: u8 = 2;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// bindguard: signature-based caller access control
#[derive(Parser)]
#[command(name = "bindguard", version, about)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Allow-list file, overrides the configuration
    #[arg(long, global = true)]
    allowlist: Option<PathBuf>,

    /// Package inventory file, overrides the configuration
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a caller may bind
    Check {
        /// Uid of the calling process
        #[arg(long, conflicts_with = "package", required_unless_present = "package")]
        uid: Option<Uid>,

        /// Package name, checked without uid resolution
        #[arg(long)]
        package: Option<String>,

        /// `pm list packages -U` output to merge into the inventory
        #[arg(long)]
        package_list: Option<PathBuf>,
    },
    /// Print the signature hash of certificate files
    Hash {
        /// DER or PEM certificate files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Hash every certificate instead of only the first
        #[arg(long)]
        all: bool,

        /// Digest algorithm (sha256, sha384, sha512)
        #[arg(long)]
        digest: Option<DigestAlgorithm>,
    },
    /// Validate the allow-list and print its entries
    Allowlist,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = init_logging();

    match run(cli, filter).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(FAILED)
        }
    }
}

/// Install the subscriber before the configuration is read.
///
/// Without `RUST_LOG` it starts at the default level; the returned handle
/// switches it to the configured `log_level` once that is known.
fn init_logging() -> Option<FilterHandle> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_set = from_env.is_some();
    let initial = from_env.unwrap_or_else(|| EnvFilter::new(AppConfig::default().log_level));

    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    (!env_set).then_some(handle)
}

async fn run(cli: Cli, filter: Option<FilterHandle>) -> Result<ExitCode> {
    let config = resolve_config(cli.config.as_deref(), cli.allowlist, cli.inventory).await?;
    if let Some(handle) = filter {
        handle
            .reload(EnvFilter::new(&config.log_level))
            .context("failed to apply log level")?;
    }

    debug!("{} v{} starting", APP_NAME, VERSION);

    match cli.command {
        Command::Check {
            uid,
            package,
            package_list,
        } => {
            let target = match (uid, package) {
                (Some(uid), _) => CheckTarget::Uid(uid),
                (None, Some(package)) => CheckTarget::Package(package),
                (None, None) => anyhow::bail!("either --uid or --package is required"),
            };

            let command = CheckCommand {
                target,
                package_list,
            };
            let decision = command.execute(&config).await?;
            match decision {
                AccessDecision::Allowed { package, signature } => {
                    println!("allowed: {} ({})", package, signature);
                    Ok(ExitCode::SUCCESS)
                }
                AccessDecision::Denied { packages } => {
                    println!("denied: {}", packages.join(", "));
                    Ok(ExitCode::from(DENIED))
                }
            }
        }
        Command::Hash { files, all, digest } => {
            let command = HashCommand {
                files,
                digest: digest.unwrap_or(config.signature.digest),
                selection: if all {
                    CertificateSelection::All
                } else {
                    config.signature.certificates
                },
            };
            println!("{}", command.execute()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Allowlist => {
            let allow_list = AllowListCommand.execute(&config).await?;
            print!("{}", format_allow_list(&allow_list));
            println!(
                "{} signatures, {} package patterns",
                allow_list.len(),
                allow_list.pattern_count()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
