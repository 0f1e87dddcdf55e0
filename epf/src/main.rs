// SPDX-License-Identifier: MIT
//
// Entropy Pool Feeder: Remote Entropy to Kernel Pool Bridge

//! Entropy Pool Feeder daemon
//!
//! Keeps the Linux kernel entropy pool topped up with true random bytes
//! retrieved from a remote entropy service over HTTP(S). Requires
//! CAP_SYS_ADMIN to credit entropy to the kernel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   HTTP(S)   ┌──────────────┐   migrate   ┌──────────────┐
//! │   Entropy    │ ──────────> │  Downloader  │ ──────────> │    Feeder    │
//! │   Service    │  (verified) │  (ingress)   │  (egress)   │ (/dev/random)│
//! └──────────────┘             └──────────────┘             └──────────────┘
//! ```
//!
//! Two OS threads share one mutex-guarded egress queue and a monotonic
//! failure flag; the process always exits non-zero once the loops stop.

use anyhow::{bail, Context, Result};
use clap::Parser;
use epf_core::config::Config;
use epf_core::kernel::{self, KernelPool};
use epf_core::pipeline::{self, Shared};
use epf_core::token;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "epf")]
#[command(about = "Feeds the kernel entropy pool with true random bytes from a remote entropy service", long_about = None)]
struct Args {
    /// Path to the properties configuration file
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Entropy Pool Feeder v{}", epf_core::VERSION);

    let config = Config::load(&args.config).context("failed to load configuration")?;

    let public_key = match &config.pubkey_path {
        Some(path) => Some(Arc::new(token::load_public_key(path)?)),
        None => None,
    };

    let pool_bytes = KernelPool::pool_size_bytes()?;
    let (mut pool, initial_bits) = KernelPool::open()?;
    info!(
        "feeding the {} kernel entropy pool of size {} bits, initial amount of entropy bits in the pool: {}",
        kernel::POOL_DEVICE,
        pool_bytes * 8,
        initial_bits
    );

    let shared = Arc::new(Shared::new());
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, shared.failure_flag())
            .context("failed to register signal handler")?;
    }

    let downloader = {
        let shared = Arc::clone(&shared);
        let config = config.clone();
        let public_key = public_key.clone();
        thread::Builder::new()
            .name("downloader".into())
            .spawn(move || pipeline::run_downloader(&shared, &config, public_key))
            .context("failed to spawn downloader thread")?
    };

    let feeder = {
        let shared = Arc::clone(&shared);
        let config = config.clone();
        thread::Builder::new()
            .name("feeder".into())
            .spawn(move || pipeline::run_feeder(&shared, &config, &mut pool, pool_bytes))
            .context("failed to spawn feeder thread")?
    };

    // The feeder only returns on failure; stop the downloader with it.
    if feeder.join().is_err() {
        error!("feeder thread panicked");
    }
    shared.fail();
    if downloader.join().is_err() {
        error!("downloader thread panicked");
    }

    let metrics = shared.metrics();
    info!(
        "downloaded {} bytes over {} exchanges ({} failed), injected {} bytes over {} injections, up {} s",
        metrics.bytes_downloaded(),
        metrics.exchanges_total(),
        metrics.exchanges_failed(),
        metrics.bytes_injected(),
        metrics.injections_total(),
        metrics.uptime_seconds()
    );

    bail!("entropy feeding terminated");
}
