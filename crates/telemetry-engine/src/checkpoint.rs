//! Run-state persistence rule.

use anyhow::{Context, Result};
use telemetry_state::StateStore;
use telemetry_types::IncrementalState;

/// State to persist after a run: the output state if non-empty, else the
/// untouched input state if non-empty, else nothing. An established
/// watermark is never overwritten with an empty map.
#[must_use]
pub fn state_to_persist<'a>(
    input: &'a IncrementalState,
    output: &'a IncrementalState,
) -> Option<&'a IncrementalState> {
    if !output.is_empty() {
        Some(output)
    } else if !input.is_empty() {
        Some(input)
    } else {
        None
    }
}

/// Apply [`state_to_persist`] and write the result. Returns whether
/// anything was written.
///
/// # Errors
///
/// Returns an error if the state store fails to write.
pub fn persist_run_state(
    store: &dyn StateStore,
    input: &IncrementalState,
    output: &IncrementalState,
) -> Result<bool> {
    let Some(state) = state_to_persist(input, output) else {
        tracing::debug!("No incremental state to persist");
        return Ok(false);
    };
    store.save(state).context("Failed to persist incremental state")?;
    tracing::info!(
        tables = state.len(),
        reused_input = output.is_empty(),
        "Incremental state persisted"
    );
    Ok(true)
}
