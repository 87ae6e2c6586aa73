//! Collection error types.

use drainwatch_core::{BackendError, WindowError};
use thiserror::Error;

/// Errors that abort a statistics collection.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("metric query for {resource} failed: {source}")]
    Backend {
        resource: String,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("collection worker failed: {0}")]
    Worker(String),
}

pub type CollectResult<T> = Result<T, CollectError>;
