//! Alarm provisioning errors.

use drainwatch_core::BackendError;
use thiserror::Error;

/// Errors that stop alarm provisioning.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// An alarm names an action with no entry in the resolution table.
    #[error("alarm {alarm:?} references unknown action {action:?}")]
    UnresolvedAction { alarm: String, action: String },

    /// The backend rejected an alarm. `created` lists the alarms already
    /// registered before the failure; they are not rolled back.
    #[error("failed to create alarm {alarm:?}: {source}")]
    Backend {
        alarm: String,
        created: Vec<String>,
        #[source]
        source: BackendError,
    },
}

pub type AlarmResult<T> = Result<T, AlarmError>;
