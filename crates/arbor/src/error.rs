use std::result::Result as StdResult;

use thiserror::Error;

use crate::id::{ContextId, ElementId};

/// Result type for arbor operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    /// An element id did not resolve to a live element.
    #[error("element not found: {0:?}")]
    ElementNotFound(ElementId),

    /// A focus context id did not resolve to an installed context.
    #[error("focus context not found: {0:?}")]
    ContextNotFound(ContextId),

    /// A container already has a focus context installed.
    #[error("container {0:?} already has a focus context")]
    DuplicateContext(ElementId),

    /// Attaching would make an element its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle {
        /// Requested parent.
        parent: ElementId,
        /// Requested child.
        child: ElementId,
    },

    #[error("invalid operation: {0}")]
    /// Structurally invalid request.
    InvalidOperation(String),

    #[error("layout: {0}")]
    /// Layout failure raised by a layout strategy.
    Layout(String),

    #[error("{0}")]
    /// Range arithmetic failure.
    Range(String),

    #[error("config: {0}")]
    /// Configuration could not be loaded.
    Config(String),

    #[error("logging: {0}")]
    /// Logging could not be initialized.
    Logging(String),

    #[error("runloop: {0}")]
    /// Task channel failure.
    RunLoop(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
