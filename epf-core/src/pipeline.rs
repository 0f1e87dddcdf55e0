// SPDX-License-Identifier: MIT
//
// Entropy Pool Feeder: Remote Entropy to Kernel Pool Bridge

//! Producer/consumer pipeline between the downloader and the feeder
//!
//! Two long-running tasks cooperate through a shared context: the downloader
//! fills a private ingress queue from the remote service and migrates it to
//! the egress queue under the mutex; the feeder drains egress into the
//! kernel pool whenever kernel entropy sinks below half the pool size. A
//! monotonic failure flag terminates both loops at their next heartbeat.

use crate::config::Config;
use crate::fetcher::EntropyFetcher;
use crate::kernel::EntropySink;
use crate::metrics::Metrics;
use crate::queue::ByteQueue;
use crate::{Error, Result};
use rsa::RsaPublicKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Fixed back-off after a failed HTTP exchange, independent of the
/// configured downloader cadence
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(15);

/// Polling slice for interruptible sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// State shared between the downloader and feeder tasks
pub struct Shared {
    egress: Mutex<ByteQueue>,
    failed: Arc<AtomicBool>,
    metrics: Metrics,
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    pub fn new() -> Self {
        Self {
            egress: Mutex::new(ByteQueue::new()),
            failed: Arc::new(AtomicBool::new(false)),
            metrics: Metrics::new(),
        }
    }

    /// Lock the egress queue.
    pub fn egress(&self) -> Result<MutexGuard<'_, ByteQueue>> {
        self.egress.lock().map_err(|_| Error::MutexPoisoned)
    }

    /// Raise the failure flag. The flag is monotonic: once set it is never
    /// cleared, and both loops exit at their next heartbeat.
    pub fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Handle to the failure flag, for signal handler registration.
    pub fn failure_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failed)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Downloader task: populate the queues from the remote service.
///
/// Issues one exchange per heartbeat while the ingress queue is below half
/// the configured watermark, then migrates ingress to egress under the
/// mutex. Transient exchange failures are local: one diagnostics line and
/// the fixed 15 s back-off, then the loop retries. Any other error raises
/// the failure flag and terminates both tasks.
pub fn run_downloader(shared: &Shared, config: &Config, public_key: Option<Arc<RsaPublicKey>>) {
    let fetcher = EntropyFetcher::new(
        config.host.clone(),
        config.port,
        config.ssl_enabled,
        config.auth_token.clone(),
        config.stream_encrypted,
        public_key,
    );
    let resource = format!("{}{}", config.resource, config.request_bytes);
    let watermark = (config.max_queue_bytes / 2) as usize;
    let mut ingress = ByteQueue::new();

    info!(
        "downloader started, {} bytes per exchange from {}:{}",
        config.request_bytes, config.host, config.port
    );

    while !shared.is_failed() {
        if ingress.len() < watermark {
            match fetcher.fetch(&resource, config.request_bytes as usize) {
                Ok(bytes) => {
                    shared.metrics().record_exchange(bytes.len());
                    ingress.push_back(&bytes);
                    debug!("ingress queue at {} bytes", ingress.len());
                }
                Err(e) if e.is_transient() => {
                    shared.metrics().record_exchange_failure();
                    warn!("exchange failed: {}", e);
                    sleep_while_running(shared, FAILURE_BACKOFF);
                }
                Err(e) => {
                    shared.metrics().record_exchange_failure();
                    error!("{}", e);
                    shared.fail();
                    break;
                }
            }
        }

        match shared.egress() {
            Ok(mut egress) => {
                if egress.len() < watermark {
                    ingress.drain_into(&mut egress);
                }
            }
            Err(e) => {
                error!("{}", e);
                shared.fail();
                break;
            }
        }

        sleep_while_running(shared, config.download_period());
    }

    info!("downloader stopped");
}

/// Feeder task: drain the egress queue into the entropy sink.
///
/// Every kernel error is fatal: the failure flag is raised and both loops
/// terminate.
pub fn run_feeder(
    shared: &Shared,
    config: &Config,
    sink: &mut dyn EntropySink,
    pool_bytes: usize,
) {
    info!("feeder started, pool of {} bytes", pool_bytes);

    while !shared.is_failed() {
        if let Err(e) = feed_once(shared, sink, pool_bytes) {
            error!("{}", e);
            shared.fail();
            break;
        }
        sleep_while_running(shared, config.feeder_period());
    }

    info!("feeder stopped");
}

/// One feeder heartbeat: query the sink and top it up from egress when it is
/// below half the pool size. The queue stays locked across the injection so
/// the fed bytes leave the queue and enter the pool as one step.
pub fn feed_once(shared: &Shared, sink: &mut dyn EntropySink, pool_bytes: usize) -> Result<()> {
    let mut egress = shared.egress()?;

    let bits = sink.entropy_bits()?;
    if (bits as usize) < pool_bytes * 8 / 2 && !egress.is_empty() {
        let want = pool_bytes.saturating_sub(bits as usize / 8);
        let bytes = egress.pop_front(want);
        let credited = bits + (bytes.len() as i32) * 8;
        sink.inject(credited, &bytes)?;
        shared.metrics().record_injection(bytes.len());
        debug!(
            "injected {} bytes, entropy credited to {} bits, egress at {} bytes",
            bytes.len(),
            credited,
            egress.len()
        );
    }

    Ok(())
}

/// Sleep for `duration`, waking early once the failure flag is set.
pub fn sleep_while_running(shared: &Shared, duration: Duration) {
    let deadline = Instant::now() + duration;
    while !shared.is_failed() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
