//! Run configuration.
//!
//! The configuration is constructed once at startup, either from a YAML
//! file or from defaults, with explicit command line overrides applied on
//! top. It is immutable afterwards and passed by reference into the
//! pipeline.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration of a single load test run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the target index.
    pub base_url: String,

    /// Number of requests to make. `0` means unbounded.
    pub requests: u64,

    /// Pause between requests per worker.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Number of parallel workers. Must be positive.
    pub workers: usize,

    /// Only issue read requests.
    pub read_only: bool,

    /// Capacity of the request queue between producer and workers.
    ///
    /// Once this many requests are queued and not yet picked up, the
    /// producer blocks until a worker dequeues one. Must be positive.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200/test".to_owned(),
            requests: 10_000,
            interval: Duration::from_millis(5),
            workers: 2,
            read_only: false,
            queue_capacity: 32,
        }
    }
}

impl Config {
    /// Loads the configuration from the given YAML file, or the defaults
    /// if no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let file = File::open(path).context("failed to open config file")?;
        serde_yaml::from_reader(file).context("failed to parse config YAML")
    }

    /// The requested number of requests, or `None` for an unbounded run.
    pub fn request_limit(&self) -> Option<u64> {
        (self.requests > 0).then_some(self.requests)
    }

    /// Rejects configurations the pipeline cannot be built from.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.workers > 0, "workers must be positive");
        anyhow::ensure!(self.queue_capacity > 0, "queue_capacity must be positive");
        Ok(())
    }
}
