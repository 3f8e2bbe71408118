use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info_span, Instrument};

use crate::common::{into_entries, DoneSender, Entry, Output, ResultSender, Stage};
use crate::config::MapReduceConfig;
use crate::error::{Error, Phase, Result};

use super::collector::Collector;

/// Runs the map phase, then the reduce phase over whatever the map phase
/// aggregated. Every input entry, and later every intermediate key, gets its
/// own spawned task; there is no cap on how many run at once.
pub struct Coordinator {
    map: Arc<dyn Stage>,
    reduce: Arc<dyn Stage>,
    config: MapReduceConfig,
}

impl Coordinator {
    pub fn new(map: Arc<dyn Stage>, reduce: Arc<dyn Stage>, config: MapReduceConfig) -> Self {
        Self {
            map,
            reduce,
            config,
        }
    }

    pub async fn run(&self, inputs: Vec<Entry>) -> Result<Output> {
        let intermediate = self.run_phase(Phase::Map, &self.map, inputs).await?;
        let reduce_inputs = into_entries(intermediate);
        self.run_phase(Phase::Reduce, &self.reduce, reduce_inputs)
            .await
    }

    async fn run_phase(
        &self,
        phase: Phase,
        stage: &Arc<dyn Stage>,
        entries: Vec<Entry>,
    ) -> Result<Output> {
        // Fresh channels per phase; nothing a late map task sends can reach
        // the reduce collector.
        let (result_tx, result_rx) = async_channel::unbounded();
        let (done_tx, done_rx) = async_channel::unbounded();

        let expected = entries.len();
        debug!("{} phase: spawning {} task(s)", phase, expected);

        for entry in entries {
            let stage = Arc::clone(stage);
            let results = ResultSender::new(result_tx.clone());
            let done = DoneSender::new(done_tx.clone());
            tokio::spawn(async move {
                stage.call(entry, results, done).await;
            });
        }

        let mut collector = Collector::new(expected);
        let span = info_span!("phase", %phase, tasks = expected);
        match self.config.phase_timeout {
            None => {
                collector
                    .drain(&result_rx, &done_rx)
                    .instrument(span)
                    .await
            }
            Some(limit) => {
                let drained = timeout(limit, collector.drain(&result_rx, &done_rx))
                    .instrument(span)
                    .await;
                if drained.is_err() {
                    return Err(Error::PhaseTimeout {
                        phase,
                        pending: collector.pending(),
                    });
                }
            }
        }

        let output = collector.into_output();
        debug!("{} phase: collected {} distinct key(s)", phase, output.len());

        // Our own senders stay alive until here so the channels cannot close
        // underneath the collector.
        drop((result_tx, done_tx));
        Ok(output)
    }
}
