//! Focus scopes.
//!
//! A [`FocusContext`] keeps focus inside its container: it wraps Tab at the
//! container's boundaries, recovers focus when the focused element is
//! removed, hidden or disabled, and falls back to the container's entry point
//! when nothing else can take focus. The [`FocusManager`] owns the contexts,
//! keeps them in a stack whose top is the active scope, and routes document
//! events to the innermost context containing the event target.

mod context;
mod manager;

pub use context::{FocusContext, FocusEnv, FocusOutcome};
pub use manager::{FocusManager, FocusRule, FocusState, GlassPane};
