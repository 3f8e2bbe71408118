pub mod collector;
mod coordinator;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::info;
use uuid::Uuid;

use crate::common::{Entry, MapReduce, Output, Stage};
use crate::config::MapReduceConfig;
use crate::error::{Error, Result};

pub use collector::{collect, Collector};
pub use coordinator::Coordinator;

/// Concurrent map-reduce over one set of inputs: one task per input entry in
/// the map phase, one task per intermediate key in the reduce phase.
pub struct ParallelMapReduce {
    inputs: Vec<Entry>,
    map: Arc<dyn Stage>,
    reduce: Arc<dyn Stage>,
    config: MapReduceConfig,
}

impl ParallelMapReduce {
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
            config: MapReduceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MapReduceConfig) -> Self {
        self.config = config;
        self
    }

    /// Blocks the calling thread on a private runtime until the final
    /// mapping is ready. Inside a tokio runtime this returns
    /// [`Error::NestedRuntime`]; use [`MapReduce::run`] there.
    ///
    /// The runtime is shut down without waiting, so a phase timeout returns
    /// even while timed-out tasks are still inside blocking sections.
    pub fn run_blocking(self) -> Result<Output> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::NestedRuntime);
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let outcome = runtime.block_on(self.run());
        runtime.shutdown_background();
        outcome
    }
}

#[async_trait]
impl MapReduce for ParallelMapReduce {
    async fn run(self) -> Result<Output> {
        let run_id = Uuid::new_v4().to_string();
        info!("run {}: starting with {} input(s)", run_id, self.inputs.len());

        let coordinator = Coordinator::new(self.map, self.reduce, self.config);
        let inputs = self.inputs;
        let (result_tx, result_rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = coordinator.run(inputs).await;
            let _ = result_tx.send(outcome);
        });

        let output = result_rx.await.map_err(|_| Error::CoordinatorLost)??;
        info!("run {}: finished with {} key(s)", run_id, output.len());
        Ok(output)
    }
}

/// Runs `map` then `reduce` over `inputs` and blocks until the final mapping
/// is available.
///
/// With the default config this only fails when the runtime cannot be built
/// or when called from inside a tokio runtime. A task that never signals is
/// not reported; the call simply does not return.
pub fn run<M, R>(inputs: Vec<Entry>, map: M, reduce: R) -> Result<Output>
where
    M: Stage + 'static,
    R: Stage + 'static,
{
    ParallelMapReduce::new(inputs, map, reduce).run_blocking()
}

/// Async counterpart of [`run`], for callers already on a tokio runtime.
pub async fn run_async<M, R>(inputs: Vec<Entry>, map: M, reduce: R) -> Result<Output>
where
    M: Stage + 'static,
    R: Stage + 'static,
{
    ParallelMapReduce::new(inputs, map, reduce).run().await
}
