use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use crate::common::{DoneSender, Entry, MapReduceApp, ResultSender, Stage};

const WORD_PATTERN: &str = r"\b[a-zA-Z0-9]+\b";

pub struct WordCount {
    words: Regex,
}

impl WordCount {
    pub fn new() -> Self {
        Self {
            words: Regex::new(WORD_PATTERN).expect("invalid regex"),
        }
    }
}

impl Default for WordCount {
    fn default() -> Self {
        Self::new()
    }
}

impl MapReduceApp for WordCount {
    fn map(&self, _key: String, values: Vec<String>) -> Vec<(String, String)> {
        values
            .iter()
            .flat_map(|contents| self.words.find_iter(contents))
            .map(|w| (w.as_str().to_lowercase(), String::from("1")))
            .collect()
    }

    fn reduce(&self, key: String, values: Vec<String>) -> String {
        values
            .iter()
            .map(|v| {
                v.parse::<u64>().unwrap_or_else(|_| {
                    warn!("word count for {:?}: ignoring non-numeric value {:?}", key, v);
                    0
                })
            })
            .sum::<u64>()
            .to_string()
    }
}

struct MapStage(Arc<dyn MapReduceApp>);

struct ReduceStage(Arc<dyn MapReduceApp>);

#[async_trait]
impl Stage for MapStage {
    async fn call(&self, entry: Entry, results: ResultSender, done: DoneSender) {
        for (key, value) in self.0.map(entry.key, entry.values) {
            results.emit(Entry::single(key, value)).await;
        }
        done.signal().await;
    }
}

#[async_trait]
impl Stage for ReduceStage {
    async fn call(&self, entry: Entry, results: ResultSender, done: DoneSender) {
        let key = entry.key.clone();
        let reduced = self.0.reduce(entry.key, entry.values);
        results.emit(Entry::single(key, reduced)).await;
        done.signal().await;
    }
}

/// Wraps a [`MapReduceApp`] as a (map, reduce) pair of stages that follow
/// the result-then-signal contract.
pub fn stages(app: Arc<dyn MapReduceApp>) -> (Arc<dyn Stage>, Arc<dyn Stage>) {
    (
        Arc::new(MapStage(Arc::clone(&app))),
        Arc::new(ReduceStage(app)),
    )
}
