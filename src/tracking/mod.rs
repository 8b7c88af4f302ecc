pub mod leaderboard;
pub mod performance;

pub use leaderboard::Leaderboard;
pub use performance::{PerformanceTracker, ReconcileReport};

use crate::errors::EngineError;

/// Ids become store key segments, so they must be non-blank and slash-free.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<(), EngineError> {
    if id.trim().is_empty() || id.contains('/') {
        return Err(EngineError::validation(format!("invalid {kind} id '{id}'")));
    }
    Ok(())
}
