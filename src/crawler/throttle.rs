//! Crawl-delay enforcement for the audited host
//!
//! Every request to the audited site (robots.txt, sitemaps, pages) takes a
//! turn from a single `HostThrottle`. Turns are handed out one at a time and
//! successive turns start at least `delay` apart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Serializes requests to one host with a minimum spacing
#[derive(Debug)]
pub struct HostThrottle {
    /// Minimum time between request starts (milliseconds)
    delay_ms: AtomicU64,

    /// Start time of the most recent request
    last_request_time: Mutex<Option<Instant>>,

    /// Number of turns handed out
    request_count: AtomicU64,
}

impl HostThrottle {
    /// Creates a throttle with the given minimum spacing
    pub fn new(delay: Duration) -> Self {
        Self {
            delay_ms: AtomicU64::new(delay.as_millis() as u64),
            last_request_time: Mutex::new(None),
            request_count: AtomicU64::new(0),
        }
    }

    /// Returns the current minimum spacing
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::SeqCst))
    }

    /// Raises the spacing to `delay` if it is larger than the current one
    ///
    /// Used to honor a robots.txt Crawl-delay; the configured delay is a floor.
    pub fn raise_delay(&self, delay: Duration) {
        self.delay_ms
            .fetch_max(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Waits until a request to the host may start, then records it
    ///
    /// The lock is held while sleeping, so concurrent callers queue up and
    /// each one starts at least `delay` after the previous one.
    pub async fn wait_turn(&self) {
        let mut last = self.last_request_time.lock().await;

        if let Some(wait) = time_until_next_request(*last, self.delay(), Instant::now()) {
            tracing::trace!("Crawl delay: waiting {:?} before next request", wait);
            tokio::time::sleep(wait).await;
        }

        *last = Some(Instant::now());
        self.request_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of requests made through this throttle
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }
}

/// Calculates the time until the next request can be made
///
/// Returns None if a request can be made now.
pub fn time_until_next_request(
    last_request: Option<Instant>,
    delay: Duration,
    now: Instant,
) -> Option<Duration> {
    let last = last_request?;
    let elapsed = now.saturating_duration_since(last);
    if elapsed < delay {
        Some(delay - elapsed)
    } else {
        None
    }
}

/// Calculates the effective delay for the audited host
///
/// This takes the maximum of the configured delay and the robots.txt
/// Crawl-delay (in seconds), when one is declared and honored. The robots
/// value is clamped to `ceiling`; non-finite or non-positive values are
/// ignored.
pub fn effective_delay(
    configured: Duration,
    robots_delay_secs: Option<f64>,
    ceiling: Duration,
) -> Duration {
    let robots_delay = robots_delay_secs
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| s.min(ceiling.as_secs_f64()))
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .map(|d| d.min(ceiling))
        .unwrap_or(Duration::ZERO);

    std::cmp::max(configured, robots_delay)
}
