//! Layout validation and focus scoping for a browser-style UI runtime.
//!
//! A [`Session`] owns an arena-backed [`Document`] standing in for the DOM,
//! a [`LayoutValidator`] that batches layout invalidations into one deferred
//! flush per loop turn, a [`FocusManager`] holding a stack of focus scopes,
//! and an [`ErrorHandler`] that classifies unexpected failures.

pub mod config;
pub mod dom;
pub mod error;
pub mod error_handler;
pub mod event;
pub mod filter;
pub mod focus;
pub mod geom;
pub mod id;
pub mod layout;
pub mod logging;
pub mod range;
mod session;

// Public exports
pub use config::{ErrorHandlerConfig, SessionConfig};
pub use dom::{Document, Element, ElementSpec, Role};
pub use error::{Error, Result};
pub use error_handler::{ErrorHandler, ErrorInfo, ErrorSink, FatalMessage, UiError};
pub use event::{DomEvent, EventOutcome, Key, KeyCode, Mods};
pub use filter::Filter;
pub use focus::{FocusContext, FocusManager, FocusOutcome, FocusRule};
pub use geom::{Point, Rect};
pub use id::{ContextId, ElementId};
pub use layout::{HtmlComponent, LayoutHost, LayoutValidator};
pub use range::Range;
pub use session::Session;
