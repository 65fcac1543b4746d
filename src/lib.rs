//! A load generator which drives an Elasticsearch-compatible endpoint
//! with a configurable mix of read and write requests.
//!
//! The pipeline is a [`runner::run`] invocation: a producer feeds a
//! bounded request queue, a fixed-size pool of workers executes the
//! requests over one shared HTTP client, and a single aggregator folds
//! the results into per-kind [`stats::KindStats`].
//!
//! Shutdown is cooperative. An interrupt cancels one shared token that
//! the producer and every worker observe at their check points; requests
//! already in flight run to completion, and whatever statistics were
//! collected up to that point are still reported.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod http;
pub mod runner;
pub mod stats;
pub mod workload;

pub use crate::config::Config;
pub use crate::runner::run;
