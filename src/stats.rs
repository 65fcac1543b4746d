//! Per-kind running statistics and the final report.
//!
//! The whole structure is owned and mutated by the aggregator task
//! alone; single-threaded ownership by construction, no locking. The
//! fold is commutative and associative over kind-partitioned data, so
//! the order in which concurrent workers deliver their responses does
//! not matter.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use yansi::Paint;

use crate::workload::{RequestKind, Response};

/// Running statistics for one request kind.
#[derive(Debug)]
pub struct KindStats {
    /// When the first response of this kind was observed.
    start_time: Instant,
    total: u64,
    failed: u64,
    total_duration: Duration,
    /// `None` until the first successful response.
    min: Option<Duration>,
    max: Option<Duration>,
}

impl KindStats {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total: 0,
            failed: 0,
            total_duration: Duration::ZERO,
            min: None,
            max: None,
        }
    }

    /// Folds one response in. Failures count, but never touch timing.
    fn record(&mut self, response: &Response) {
        self.total += 1;

        if !response.succeeded() {
            self.failed += 1;
            return;
        }

        let elapsed = response.elapsed;
        self.total_duration += elapsed;
        self.min = Some(self.min.map_or(elapsed, |min| min.min(elapsed)));
        self.max = Some(self.max.map_or(elapsed, |max| max.max(elapsed)));
    }

    /// Number of responses observed, failed ones included.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of failed responses.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Summed duration of all successful responses.
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Fastest successful response, if there was one.
    pub fn min(&self) -> Option<Duration> {
        self.min
    }

    /// Slowest successful response, if there was one.
    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    /// Mean duration over successful responses, zero if there were none.
    pub fn avg(&self) -> Duration {
        match self.total - self.failed {
            0 => Duration::ZERO,
            succeeded => self.total_duration / succeeded as u32,
        }
    }
}

/// Statistics for the whole run, keyed by request kind.
///
/// Entries are created lazily on the first observation of a kind, so a
/// read-only run reports no write section at all.
#[derive(Debug, Default)]
pub struct Stats(BTreeMap<RequestKind, KindStats>);

impl Stats {
    /// Folds one response into the stats of its kind.
    pub fn record(&mut self, response: &Response) {
        self.0
            .entry(response.kind)
            .or_insert_with(KindStats::new)
            .record(response);
    }

    /// Statistics for the given kind, if any were observed.
    pub fn get(&self, kind: RequestKind) -> Option<&KindStats> {
        self.0.get(&kind)
    }

    /// Whether no responses were observed at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prints the final per-kind report to stdout.
    pub fn report(&self) {
        for (kind, stats) in &self.0 {
            let wall_time = stats.start_time.elapsed();

            println!();
            println!("{} {}", "##".bold(), kind.bold().blue());
            println!("  requests (total):  {}", stats.total.bold());
            if stats.failed > 0 {
                println!("  requests (failed): {}", stats.failed.bold().red());
            } else {
                println!("  requests (failed): {}", stats.failed);
            }
            println!("  request time (total): {:.2?}", stats.total_duration);
            println!(
                "  request time (min.):  {:.2?}",
                stats.min.unwrap_or_default()
            );
            println!(
                "  request time (max.):  {:.2?}",
                stats.max.unwrap_or_default()
            );
            println!("  request time (avg.):  {:.2?}", stats.avg());
            println!("  wall time:            {:.2?}", wall_time);
            println!(
                "  rate:                 {:.2} requests/s",
                stats.total as f64 / wall_time.as_secs_f64()
            );
        }
    }
}
