//! DOM-level signals consumed by the focus core, and the tasks scheduled on
//! the session loop.

use crate::id::ElementId;

/// Modifier key state.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Mods {
    /// Shift is active.
    pub shift: bool,
    /// Control is active.
    pub ctrl: bool,
    /// Alt is active.
    pub alt: bool,
}

/// Keys the focus core distinguishes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum KeyCode {
    /// The tab key.
    Tab,
    /// Enter.
    Enter,
    /// Escape.
    Esc,
    /// Any printable character.
    Char(char),
}

/// A key press with modifiers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Key {
    /// Modifier state.
    pub mods: Mods,
    /// Key code.
    pub code: KeyCode,
}

impl Key {
    /// Tab without modifiers.
    pub fn tab() -> Self {
        Self {
            mods: Mods::default(),
            code: KeyCode::Tab,
        }
    }

    /// Shift+Tab.
    pub fn shift_tab() -> Self {
        Self {
            mods: Mods {
                shift: true,
                ..Mods::default()
            },
            code: KeyCode::Tab,
        }
    }

    /// Is this a Tab press, with or without shift?
    pub fn is_tab(&self) -> bool {
        self.code == KeyCode::Tab && !self.mods.ctrl && !self.mods.alt
    }
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        Self {
            mods: Mods::default(),
            code,
        }
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        KeyCode::Char(c).into()
    }
}

/// A signal raised by the document.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DomEvent {
    /// A key went down while `target` held focus.
    KeyDown {
        /// Element that received the key.
        target: ElementId,
        /// The key.
        key: Key,
    },
    /// `target` gained focus.
    FocusIn {
        /// Newly focused element.
        target: ElementId,
    },
    /// `target` lost focus.
    FocusOut {
        /// Previously focused element.
        target: ElementId,
    },
    /// `target` became hidden.
    Hide {
        /// Hidden element.
        target: ElementId,
    },
    /// `target` became disabled.
    Disable {
        /// Disabled element.
        target: ElementId,
    },
    /// `target` was removed from the document. Does not bubble.
    Remove {
        /// Removed element.
        target: ElementId,
    },
}

impl DomEvent {
    /// The element the event was raised on.
    pub fn target(&self) -> ElementId {
        match *self {
            Self::KeyDown { target, .. }
            | Self::FocusIn { target }
            | Self::FocusOut { target }
            | Self::Hide { target }
            | Self::Disable { target }
            | Self::Remove { target } => target,
        }
    }

    /// Does the event propagate to enclosing scopes?
    pub fn bubbles(&self) -> bool {
        !matches!(self, Self::Remove { .. })
    }
}

/// The result of an event handler.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EventOutcome {
    /// The event was processed and propagation stops.
    Handle,
    /// The event was not handled and will bubble to the enclosing scope.
    Ignore,
}

impl EventOutcome {
    /// Did the handler stop propagation?
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handle)
    }
}

/// Deferred work queued on the session loop.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Task {
    /// Flush the layout validation queue.
    ValidateLayout,
}
