//! Error Types
//!
//! Error taxonomy shared by the screen, power and multi-screen modules.
//!
//! Lookups of unknown ids are mostly reported as `Option`/`bool` by the
//! registries; `NotFound` is used where an operation cannot continue without
//! the entity (mode changes, role swaps).

use thiserror::Error;

use crate::render::RenderError;
use crate::screen::{LogicalScreenId, PhysicalSurfaceId};

/// Result type for screen coordination operations
pub type Result<T> = std::result::Result<T, ScreenError>;

/// Screen coordination error types
#[derive(Error, Debug)]
pub enum ScreenError {
    /// Unknown logical screen id
    #[error("Screen not found: {0}")]
    NotFound(LogicalScreenId),

    /// Unknown physical surface id
    #[error("Physical surface not found: {0}")]
    PhysicalNotFound(PhysicalSurfaceId),

    /// A REAL session for this surface is already connected and in use
    #[error("Physical surface {0} already has an in-use session")]
    DuplicateConnect(PhysicalSurfaceId),

    /// Arguments that cannot describe a valid request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Event not meaningful in the current power state
    #[error("Invalid power transition: {event} in state {state}")]
    InvalidTransition {
        /// Current transition state
        state: String,
        /// Rejected event
        event: String,
    },

    /// Render service call failed
    #[error("Render service failure: {0}")]
    RenderServiceFailure(#[from] RenderError),

    /// Bounded wait exceeded
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The serialized executor has shut down
    #[error("Executor '{0}' is closed")]
    ExecutorClosed(String),

    /// Settings store failure
    #[error("Settings store error: {0}")]
    Settings(String),
}

impl ScreenError {
    /// Whether the caller may proceed with best-effort state
    ///
    /// Timeouts never abort an operation, they only degrade it.
    pub fn is_soft(&self) -> bool {
        matches!(self, ScreenError::Timeout(_))
    }
}
