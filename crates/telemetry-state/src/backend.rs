//! State store trait definition.

use telemetry_types::IncrementalState;

use crate::error;

/// Storage contract for the per-table incremental state of one run.
///
/// A run loads the state written by the previous run and saves the state
/// it produced; the two locations need not be the same.
pub trait StateStore: Send + Sync {
    /// Read the state left by the previous run.
    ///
    /// Returns an empty state when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure
    /// or a malformed state document.
    fn load(&self) -> error::Result<IncrementalState>;

    /// Persist the state for the next run.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn save(&self, state: &IncrementalState) -> error::Result<()>;
}
