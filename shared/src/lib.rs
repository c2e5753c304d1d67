//! Shared data model for the task orchestrator.
//!
//! This crate holds everything the kernel binary and every handler need in
//! common: the task catalog/state types (`task`), in-memory handler output
//! (`result`), the notifier's wire contract (`webhook`), shared defaults and
//! utilities, and the kernel-observed error taxonomy (`error`). It carries
//! no binary-specific logic — that lives in the `kernel` crate.

pub mod defaults;
pub mod error;
pub mod result;
pub mod task;
pub mod utils;
pub mod webhook;

pub use error::MonitoringError;
pub use result::TaskResult;
pub use task::{Frequency, TaskDefinition, TaskState, TaskStatus};

/// Result type alias used throughout the shared crate.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_imports() {
        // Smoke test: every module above compiles and re-exports resolve.
    }
}
