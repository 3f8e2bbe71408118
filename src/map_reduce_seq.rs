use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::common::{into_entries, DoneSender, Entry, MapReduce, Output, ResultSender, Stage};
use crate::error::Result;
use crate::mr_parallel::Collector;

/// Runs the same stages as [`crate::ParallelMapReduce`], one task at a time
/// on the calling task. Values within a key come out in input order, which
/// makes this the deterministic baseline to compare concurrent runs against.
pub struct SequentialMapReduce {
    inputs: Vec<Entry>,
    map: Arc<dyn Stage>,
    reduce: Arc<dyn Stage>,
}

impl SequentialMapReduce {
    pub fn new<M, R>(inputs: Vec<Entry>, map: M, reduce: R) -> Self
    where
        M: Stage + 'static,
        R: Stage + 'static,
    {
        Self::from_stages(inputs, Arc::new(map), Arc::new(reduce))
    }

    pub fn from_stages(inputs: Vec<Entry>, map: Arc<dyn Stage>, reduce: Arc<dyn Stage>) -> Self {
        Self {
            inputs,
            map,
            reduce,
        }
    }
}

#[async_trait]
impl MapReduce for SequentialMapReduce {
    async fn run(self) -> Result<Output> {
        let intermediate = run_serial(self.map.as_ref(), self.inputs).await;
        let mut reduce_inputs = into_entries(intermediate);
        reduce_inputs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(run_serial(self.reduce.as_ref(), reduce_inputs).await)
    }
}

async fn run_serial(stage: &dyn Stage, entries: Vec<Entry>) -> Output {
    debug!("sequential phase over {} entries", entries.len());
    let mut output = Output::new();
    for entry in entries {
        let (result_tx, result_rx) = async_channel::unbounded();
        let (done_tx, done_rx) = async_channel::unbounded();
        let mut collector = Collector::new(1);

        futures::join!(
            stage.call(
                entry,
                ResultSender::new(result_tx.clone()),
                DoneSender::new(done_tx.clone()),
            ),
            collector.drain(&result_rx, &done_rx),
        );

        for (key, values) in collector.into_output() {
            output.entry(key).or_default().extend(values);
        }
    }
    output
}
