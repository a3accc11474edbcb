//! `postkey` command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Create an identity and publish a proof for it
//! postkey keygen --out alice.key
//! postkey prove --key alice.key --identifier person:facebook.com/alice
//!
//! # Check someone's bio for a proof
//! postkey verify --identifier person:facebook.com/bob bio.txt
//!
//! # Wrap a content key for Bob, then unwrap it as Bob
//! postkey wrap --key alice.key --to <bob public key hex> > envelope.txt
//! postkey unwrap --key bob.key envelope.txt
//! ```

mod commands;
mod error;

use clap::Parser;
use postkey_core::SystemEnv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Command;

/// Identity proofs and content-key envelopes
#[derive(Parser, Debug)]
#[command(name = "postkey")]
#[command(about = "Identity proofs and content-key envelopes for encrypted posts")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Results go to stdout, so logs must not
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    commands::run(args.command, &SystemEnv::new(), &mut stdin, &mut stdout)?;

    Ok(())
}
