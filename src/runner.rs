//! The concurrent pipeline: producer, bounded queue, worker pool,
//! aggregator, and cooperative shutdown.
//!
//! The producer feeds requests into a bounded queue, which is the only
//! backpressure mechanism: once the queue is full, production blocks
//! until a worker dequeues. Workers execute requests over the shared
//! HTTP client and emit responses to the single aggregator. Shutdown is
//! driven by one shared [`CancellationToken`] that every participant
//! observes without consuming it; in-flight calls are never interrupted
//! and run to completion before the cancellation is noticed at the next
//! check point.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::http::HttpRemote;
use crate::stats::Stats;
use crate::workload::{Request, Response, WorkloadGenerator};

/// Responses per progress mark when the total is not known up front.
const UNBOUNDED_PROGRESS_BATCH: u64 = 500;

/// Installs the interrupt listener and returns the shared shutdown token.
///
/// The first SIGINT or SIGTERM cancels the token once; the producer and
/// all workers observe the same token at their check points. Further
/// interrupts have no additional effect.
pub fn shutdown_token() -> anyhow::Result<CancellationToken> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install signal handler")?;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
        tracing::info!("interrupt received, stopping after in-flight requests");
        trigger.cancel();
    });

    Ok(token)
}

/// Runs the whole pipeline to completion and returns the collected stats.
///
/// Returns once the producer has stopped, every worker has drained and
/// exited, and the aggregator has consumed the last response. This holds
/// on cancellation as well, so a partial run still yields its statistics.
pub async fn run(config: &Config, remote: HttpRemote, shutdown: CancellationToken) -> Stats {
    let limit = config.request_limit();
    let remote = Arc::new(remote);

    let (request_tx, request_rx) = mpsc::channel(config.queue_capacity);
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let queue = Arc::new(Mutex::new(request_rx));

    let aggregator = tokio::spawn(aggregate(response_rx, limit));

    let workers: Vec<_> = (0..config.workers)
        .map(|id| {
            tokio::spawn(worker(
                id,
                Arc::clone(&remote),
                Arc::clone(&queue),
                response_tx.clone(),
                config.interval,
                shutdown.clone(),
            ))
        })
        .collect();
    // The workers hold the only remaining senders; the response channel
    // closes exactly when the last worker stops.
    drop(response_tx);

    let generator = WorkloadGenerator::new(
        remote.client.clone(),
        remote.base_url.clone(),
        config.read_only,
    );
    produce(generator, limit, request_tx, shutdown).await;

    for worker in join_all(workers).await {
        worker.expect("worker task panicked");
    }

    aggregator.await.expect("aggregator task panicked")
}

/// Feeds requests into the queue until the limit is reached, the token
/// is cancelled, or all workers are gone.
///
/// A descriptor that fails to build skips its sequence slot and the run
/// continues. Dropping the sender on return closes the queue, which is
/// how downstream workers observe end-of-stream.
async fn produce(
    mut workload: WorkloadGenerator,
    limit: Option<u64>,
    queue: mpsc::Sender<Request>,
    shutdown: CancellationToken,
) {
    let mut sequence = 0;
    loop {
        if let Some(limit) = limit {
            if sequence >= limit {
                break;
            }
        }
        if shutdown.is_cancelled() {
            tracing::info!("closing request queue");
            break;
        }

        let request = match workload.next_request(sequence) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("skipping request {sequence}: {err}");
                sequence += 1;
                continue;
            }
        };

        if queue.send(request).await.is_err() {
            // All workers are gone; nothing left to feed.
            break;
        }
        sequence += 1;
    }
}

/// One worker: dequeue, execute, report, pace, repeat.
///
/// Exits when the queue is closed and empty, or when cancellation is
/// observed after a dequeue. The queue lock is held only for the dequeue
/// itself, never across an HTTP call.
async fn worker(
    id: usize,
    remote: Arc<HttpRemote>,
    queue: Arc<Mutex<mpsc::Receiver<Request>>>,
    results: mpsc::UnboundedSender<Response>,
    pacing: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let request = queue.lock().await.recv().await;
        let Some(request) = request else {
            break;
        };
        if shutdown.is_cancelled() {
            break;
        }

        let response = remote.execute(request).await;
        if results.send(response).is_err() {
            break;
        }

        if !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }

    tracing::debug!("worker {id} stopped");
}

/// Single consumer of the response channel.
///
/// Owns the stats exclusively; drains until the channel is closed, which
/// happens only after every worker has stopped. Failures are reported as
/// they occur, and a coarse progress mark is printed either per whole
/// percent (bounded runs) or per fixed batch (unbounded runs).
async fn aggregate(mut responses: mpsc::UnboundedReceiver<Response>, expected: Option<u64>) -> Stats {
    let mut stats = Stats::default();
    let mut processed: u64 = 0;
    let mut percent: u64 = 0;

    while let Some(response) = responses.recv().await {
        if let Some(error) = &response.error {
            tracing::warn!("{} request failed: {error}", response.kind);
        }
        stats.record(&response);

        processed += 1;
        let mark = match expected {
            Some(total) => {
                let new_percent = processed * 100 / total;
                let advanced = new_percent > percent;
                percent = new_percent;
                advanced
            }
            None => processed % UNBOUNDED_PROGRESS_BATCH == 0,
        };
        if mark {
            print!(".");
            let _ = std::io::stdout().flush();
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::workload::RequestKind;

    fn generator(read_only: bool) -> WorkloadGenerator {
        WorkloadGenerator::new(
            reqwest::Client::new(),
            "http://localhost:9200/test",
            read_only,
        )
    }

    #[tokio::test]
    async fn producer_blocks_on_a_full_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let producer = tokio::spawn(produce(
            generator(false),
            Some(100),
            tx,
            CancellationToken::new(),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!producer.is_finished());
        assert_eq!(rx.len(), 4);

        // Freeing one slot lets exactly one more request through.
        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!producer.is_finished());
        assert_eq!(rx.len(), 4);

        drop(rx);
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn producer_closes_the_queue_after_the_limit() {
        let (tx, mut rx) = mpsc::channel(8);
        produce(generator(false), Some(3), tx, CancellationToken::new()).await;

        let mut kinds = Vec::new();
        while let Some(request) = rx.recv().await {
            kinds.push(request.kind);
        }
        assert_eq!(
            kinds,
            [RequestKind::Read, RequestKind::Write, RequestKind::Read]
        );
    }

    #[tokio::test]
    async fn cancelled_producer_emits_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        produce(generator(false), Some(100), tx, shutdown).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn aggregator_drains_until_the_channel_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = tokio::spawn(aggregate(rx, Some(3)));

        for millis in [10, 20, 30] {
            tx.send(Response {
                kind: RequestKind::Read,
                started_at: Instant::now(),
                elapsed: Duration::from_millis(millis),
                error: None,
            })
            .unwrap();
        }
        drop(tx);

        let stats = aggregator.await.unwrap();
        let reads = stats.get(RequestKind::Read).unwrap();
        assert_eq!(reads.total(), 3);
        assert_eq!(reads.avg(), Duration::from_millis(20));
    }
}
