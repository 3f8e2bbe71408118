use async_channel::Sender;
use async_trait::async_trait;
use std::{collections::HashMap, future::Future};
use tracing::trace;

use crate::error::Result;

/// {key: aggregated values}
pub type Output = HashMap<String, Vec<String>>;

/// A key paired with an ordered sequence of values. Used for raw inputs,
/// partial results emitted by tasks, and aggregated records alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub values: Vec<String>,
}

impl Entry {
    pub fn new(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// Entry carrying exactly one value.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, vec![value.into()])
    }
}

impl From<(String, Vec<String>)> for Entry {
    fn from((key, values): (String, Vec<String>)) -> Self {
        Self { key, values }
    }
}

/// Turns an aggregated mapping back into one entry per key. Iteration order
/// follows the map and is not stable across runs.
pub fn into_entries(output: Output) -> Vec<Entry> {
    output.into_iter().map(Entry::from).collect()
}

/// Send half of a phase's result stream. Cloneable so a task can hand it to
/// helpers of its own.
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: Sender<Entry>,
}

impl ResultSender {
    pub(crate) fn new(tx: Sender<Entry>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, entry: Entry) {
        if let Err(err) = self.tx.send(entry).await {
            trace!("result for key {:?} dropped: phase already collected", err.0.key);
        }
    }

    /// Same as [`ResultSender::emit`], for task bodies that are not async.
    pub fn emit_blocking(&self, entry: Entry) {
        if let Err(err) = self.tx.send_blocking(entry) {
            trace!("result for key {:?} dropped: phase already collected", err.0.key);
        }
    }
}

/// Completion handle handed to every task. Signalling consumes it, so each
/// task reports completion at most once. A task that drops it without
/// signalling leaves its phase waiting.
#[derive(Debug)]
pub struct DoneSender {
    tx: Sender<()>,
}

impl DoneSender {
    pub(crate) fn new(tx: Sender<()>) -> Self {
        Self { tx }
    }

    pub async fn signal(self) {
        if self.tx.send(()).await.is_err() {
            trace!("completion signal dropped: phase already collected");
        }
    }

    pub fn signal_blocking(self) {
        if self.tx.send_blocking(()).is_err() {
            trace!("completion signal dropped: phase already collected");
        }
    }
}

/// A map or reduce stage. Each invocation gets one entry plus the two phase
/// channels; it may emit any number of results and must then signal
/// completion exactly once.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn call(&self, entry: Entry, results: ResultSender, done: DoneSender);
}

#[async_trait]
impl<F, Fut> Stage for F
where
    F: Fn(Entry, ResultSender, DoneSender) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn call(&self, entry: Entry, results: ResultSender, done: DoneSender) {
        (self)(entry, results, done).await
    }
}

/// Plain key/value application, adapted onto the channel contract by
/// [`crate::map_reduce_apps::stages`].
pub trait MapReduceApp: Send + Sync {
    fn map(&self, key: String, values: Vec<String>) -> Vec<(String, String)>;
    fn reduce(&self, key: String, values: Vec<String>) -> String;
}

#[async_trait]
pub trait MapReduce {
    async fn run(self) -> Result<Output>;
}
