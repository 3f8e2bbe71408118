use async_channel::Receiver;
use tracing::{trace, warn};

use crate::common::{Entry, Output};

/// Barrier for one phase: drains the result stream into an aggregated
/// mapping until the expected number of completion signals has been seen.
///
/// Only the draining task touches `aggregated`, so no locking is involved.
/// Results carry no weight toward termination and completions carry no
/// data; a task may emit any number of results before its one signal.
#[derive(Debug)]
pub struct Collector {
    aggregated: Output,
    remaining: usize,
}

impl Collector {
    pub fn new(expected: usize) -> Self {
        Self {
            aggregated: Output::new(),
            remaining: expected,
        }
    }

    /// Tasks that have not signalled completion yet.
    pub fn pending(&self) -> usize {
        self.remaining
    }

    /// Receives until every expected task has signalled, then sweeps results
    /// already queued. Returns without waiting when nothing is pending.
    ///
    /// Dropping the future part way through loses nothing: whatever was
    /// received stays aggregated and a later call picks up where this one
    /// stopped.
    pub async fn drain(&mut self, results: &Receiver<Entry>, done: &Receiver<()>) {
        while self.remaining > 0 {
            tokio::select! {
                Ok(entry) = results.recv() => self.absorb(entry),
                Ok(()) = done.recv() => {
                    self.remaining -= 1;
                    trace!("task completed, {} still pending", self.remaining);
                }
                else => {
                    // Every sender is gone, so the missing signals can never arrive.
                    warn!(
                        "all senders dropped with {} task(s) pending; waiting indefinitely",
                        self.remaining
                    );
                    std::future::pending::<()>().await;
                }
            }
        }
        // A task enqueues its results before its signal, but the select may
        // have taken the signal first. Anything still queued belongs here.
        while let Ok(entry) = results.try_recv() {
            self.absorb(entry);
        }
    }

    pub fn into_output(self) -> Output {
        self.aggregated
    }

    fn absorb(&mut self, entry: Entry) {
        trace!("result for key {:?} ({} values)", entry.key, entry.values.len());
        self.aggregated
            .entry(entry.key)
            .or_default()
            .extend(entry.values);
    }
}

/// Runs a fresh [`Collector`] over the two streams and returns what it
/// aggregated.
pub async fn collect(results: &Receiver<Entry>, done: &Receiver<()>, expected: usize) -> Output {
    let mut collector = Collector::new(expected);
    collector.drain(results, done).await;
    collector.into_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_zero_expected_returns_without_waiting() {
        let (_result_tx, result_rx) = async_channel::unbounded::<Entry>();
        let (_done_tx, done_rx) = async_channel::unbounded::<()>();

        let output = timeout(Duration::from_millis(50), collect(&result_rx, &done_rx, 0))
            .await
            .expect("collector should not wait when nothing is expected");

        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_values_are_concatenated() {
        let (result_tx, result_rx) = async_channel::unbounded();
        let (done_tx, done_rx) = async_channel::unbounded();

        result_tx.send(Entry::single("x", "1")).await.unwrap();
        result_tx
            .send(Entry::new("x", vec!["2".into(), "3".into()]))
            .await
            .unwrap();
        result_tx.send(Entry::single("y", "4")).await.unwrap();
        done_tx.send(()).await.unwrap();

        let output = collect(&result_rx, &done_rx, 1).await;

        assert_eq!(output.len(), 2);
        let mut xs = output["x"].clone();
        xs.sort();
        assert_eq!(xs, vec!["1", "2", "3"]);
        assert_eq!(output["y"], vec!["4"]);
    }

    #[tokio::test]
    async fn test_waits_for_every_completion_signal() {
        let (result_tx, result_rx) = async_channel::unbounded();
        let (done_tx, done_rx) = async_channel::unbounded();

        for value in ["a", "b", "c"] {
            result_tx.send(Entry::single("k", value)).await.unwrap();
        }
        done_tx.send(()).await.unwrap();
        done_tx.send(()).await.unwrap();

        let mut collector = Collector::new(3);
        let first = timeout(
            Duration::from_millis(100),
            collector.drain(&result_rx, &done_rx),
        )
        .await;
        assert!(first.is_err(), "collector returned with a task still pending");
        assert_eq!(collector.pending(), 1);

        done_tx.send(()).await.unwrap();
        collector.drain(&result_rx, &done_rx).await;

        assert_eq!(collector.pending(), 0);
        let output = collector.into_output();
        assert_eq!(output["k"].len(), 3);
    }

    #[tokio::test]
    async fn test_results_from_concurrent_senders_are_all_kept() {
        let (result_tx, result_rx) = async_channel::unbounded();
        let (done_tx, done_rx) = async_channel::unbounded();

        for i in 0..16 {
            let result_tx = result_tx.clone();
            let done_tx = done_tx.clone();
            tokio::spawn(async move {
                result_tx.send(Entry::single("n", i.to_string())).await.unwrap();
                done_tx.send(()).await.unwrap();
            });
        }

        let output = collect(&result_rx, &done_rx, 16).await;

        let mut values: Vec<u32> = output["n"].iter().map(|v| v.parse().unwrap()).collect();
        values.sort();
        assert_eq!(values, (0..16).collect::<Vec<_>>());
    }
}
