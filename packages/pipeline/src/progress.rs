//! Stage progress reporting for pipeline runs.
//!
//! The pipeline advances through a fixed list of [`Stage`]s and reports
//! each one through a [`ProgressCallback`], leaving rendering to the caller
//! (an `indicatif` bar from `smart_city_cli_utils`, or nothing at all).

use std::sync::Arc;

use strum_macros::{AsRefStr, Display};

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum Stage {
    /// Reading and validating the three source CSVs.
    #[strum(serialize = "Loading source tables")]
    Load,
    /// Income and crime joins.
    #[strum(serialize = "Joining cities")]
    Join,
    /// Safety and affordability indices.
    #[strum(serialize = "Deriving metrics")]
    Derive,
    /// Min-max normalization and livability score.
    #[strum(serialize = "Normalizing metrics")]
    Normalize,
    /// Writing the artifact and report.
    #[strum(serialize = "Writing city table")]
    Persist,
}

impl Stage {
    /// All stages, in execution order.
    pub const ALL: [Self; 5] = [
        Self::Load,
        Self::Join,
        Self::Derive,
        Self::Normalize,
        Self::Persist,
    ];
}

/// Receives progress updates from a pipeline run.
///
/// Implementations must be `Send + Sync` so a single bar can be shared
/// through an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
