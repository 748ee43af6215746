//! Host-side worker supervision
//!
//! This module contains the `WorkerProcess` handle for spawning bridge
//! workers and collecting their output, and the `WorkerRegistry` that maps
//! worker names to executables on disk.

mod registry;
mod worker;

pub use registry::{DEFAULT_WORKER_DIR, WorkerRegistry};
pub use worker::{WorkerError, WorkerOutput, WorkerProcess};
