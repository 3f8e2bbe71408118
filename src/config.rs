use std::time::Duration;

/// Run configuration. The default waits on every phase indefinitely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapReduceConfig {
    /// Upper bound on how long one phase may wait for its tasks. Tasks still
    /// running when it expires are left alone; the run fails with
    /// [`crate::Error::PhaseTimeout`].
    pub phase_timeout: Option<Duration>,
}

impl MapReduceConfig {
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = Some(timeout);
        self
    }
}
