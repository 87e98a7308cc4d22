//! Deferred layout invalidation.
//!
//! Widgets invalidate their [`HtmlComponent`] when content changes. The
//! [`LayoutValidator`] walks up to the nearest validate root, queues it, and
//! schedules a single flush task on the session loop. All invalidations made
//! before the flush runs are laid out together.

mod component;
mod validator;

pub use component::{ColumnLayout, HtmlComponent, Layout};
pub use validator::{FlushReport, LayoutHost, LayoutPass, LayoutValidator, PostValidateFn};
