//! # ptd CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ptd_cli::keygen::{run_keygen, KeygenArgs};
use ptd_cli::package::{
    run_inspect, run_pack, run_verify_package, InspectArgs, PackArgs, VerifyPackageArgs,
};
use ptd_cli::signing::{run_sign, run_verify, SignArgs, VerifyArgs};

/// Portable Tournament Data toolchain.
///
/// Generates signing keys, signs and verifies envelope documents, and builds,
/// verifies and inspects tournament data packages.
#[derive(Parser, Debug)]
#[command(name = "ptd", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 key pair file.
    Keygen(KeygenArgs),

    /// Sign an envelope JSON document.
    Sign(SignArgs),

    /// Verify the signature of an envelope JSON document.
    Verify(VerifyArgs),

    /// Build a package from NDJSON entity files.
    Pack(PackArgs),

    /// Open a package, check file hashes and the manifest signature.
    VerifyPackage(VerifyPackageArgs),

    /// Print a package manifest.
    Inspect(InspectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Sign(args) => run_sign(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Pack(args) => run_pack(args),
        Commands::VerifyPackage(args) => run_verify_package(args),
        Commands::Inspect(args) => run_inspect(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins when set; otherwise the level follows the `-v` count.
fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
