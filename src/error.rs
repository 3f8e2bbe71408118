use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => write!(f, "map"),
            Phase::Reduce => write!(f, "reduce"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("{phase} phase timed out with {pending} task(s) still running")]
    PhaseTimeout { phase: Phase, pending: usize },

    #[error("Blocking run called from inside a tokio runtime; use run_async")]
    NestedRuntime,

    #[error("Coordinator exited without delivering a result")]
    CoordinatorLost,
}

pub type Result<T> = std::result::Result<T, Error>;
