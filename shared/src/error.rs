//! Error taxonomy shared by the kernel and its handlers.
//!
//! Mirrors spec.md §7: the kernel never propagates a handler's internal
//! exception type across a task boundary, but it does need a small closed
//! set of kernel-observed error kinds to decide retry/abort/exit-code
//! behavior. Call sites wrap these in `anyhow::Context` for prose context;
//! branching logic matches on the variant.

use thiserror::Error;

/// Errors the kernel itself can raise, independent of any handler's
/// internal taxonomy (see `ProviderError` in the article handler for that).
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// Definitions or state could not be loaded: missing required file,
    /// malformed JSON, or a schema mismatch. Aborts the run before any
    /// handler executes (spec.md §7).
    #[error("configuration error: {0}")]
    Config(String),

    /// A handler's outer guard caught a panic or returned an error that
    /// was not itself a structured `TaskResult`.
    #[error("handler error: {0}")]
    Handler(String),

    /// Webhook transport failed. Always logged, never fatal — retained as
    /// a variant so log sites can classify it uniformly.
    #[error("notifier error: {0}")]
    Notifier(String),

    /// The global run-level timeout elapsed with tasks still in flight.
    #[error("run deadline exceeded")]
    Deadline,

    /// Catch-all for validation failures at system boundaries (malformed
    /// `params`, invalid environment values).
    #[error("validation error: {0}")]
    Validation(String),
}
