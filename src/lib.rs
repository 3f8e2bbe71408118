//! In-process concurrent map-reduce.
//!
//! Every input entry is handed to its own map task; the results are
//! aggregated by key, and every intermediate key is then handed to its own
//! reduce task. Tasks report through two channels: a result stream for any
//! number of partial [`Entry`] values, and a completion signal sent exactly
//! once. A phase ends when every task it spawned has signalled.
//!
//! Fan-out is unbounded (one task per item) and, unless a phase timeout is
//! configured, a task that never signals blocks its run forever.

pub mod common;
pub mod config;
pub mod error;
pub mod map_reduce_apps;
pub mod map_reduce_seq;
pub mod mr_parallel;

pub use common::{DoneSender, Entry, MapReduce, MapReduceApp, Output, ResultSender, Stage};
pub use config::MapReduceConfig;
pub use error::{Error, Phase, Result};
pub use map_reduce_seq::SequentialMapReduce;
pub use mr_parallel::{run, run_async, ParallelMapReduce};
