//! Engine configuration.

use std::time::Duration;

/// Tuning knobs for the delivery pipeline.
///
/// Defaults match the documented production values; tests shrink the
/// durations to keep scenarios fast.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrent worker loops.
    pub worker_concurrency: usize,
    /// How long a worker blocks on the queue before re-checking shutdown.
    pub poll_timeout: Duration,
    /// Outbound HTTP connect timeout.
    pub connect_timeout: Duration,
    /// Outbound HTTP read timeout.
    pub read_timeout: Duration,
    /// Retry budget applied when a request omits `maxRetries`.
    pub default_max_retries: u32,
    /// Base of the exponential backoff (delay after the first failure).
    pub base_delay: Duration,
    /// Period of the retry scheduler's store scan.
    pub retry_scan_period: Duration,
    /// Maximum tasks re-enqueued per scheduler tick.
    pub retry_scan_batch: usize,
    /// Period of the recovery sweeper.
    pub sweep_period: Duration,
    /// Age after which a PROCESSING claim counts as abandoned.
    pub stuck_threshold: Duration,
    /// Adds random jitter to backoff delays. Off by default so the
    /// schedule stays deterministic.
    pub jitter: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 4,
            poll_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_millis(5_000),
            read_timeout: Duration::from_millis(30_000),
            default_max_retries: 5,
            base_delay: Duration::from_secs(2),
            retry_scan_period: Duration::from_secs(10),
            retry_scan_batch: 100,
            sweep_period: Duration::from_secs(60),
            stuck_threshold: Duration::from_secs(300),
            jitter: false,
        }
    }
}

impl EngineConfig {
    /// Returns a configuration tuned for fast integration tests: short
    /// polls, millisecond backoff, aggressive scan periods.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            worker_concurrency: 2,
            poll_timeout: Duration::from_millis(50),
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_millis(1_000),
            default_max_retries: 5,
            base_delay: Duration::from_millis(50),
            retry_scan_period: Duration::from_millis(25),
            retry_scan_batch: 100,
            sweep_period: Duration::from_millis(100),
            stuck_threshold: Duration::from_millis(500),
            jitter: false,
        }
    }
}
