//! Element predicates used to narrow focus candidates.

use std::fmt;

use crate::{dom::Document, id::ElementId};

/// A predicate over document elements.
pub struct Filter(Box<dyn Fn(&Document, ElementId) -> bool>);

impl Filter {
    /// Wrap a closure.
    pub fn new(f: impl Fn(&Document, ElementId) -> bool + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Accept every element.
    pub fn accept_all() -> Self {
        Self::new(|_, _| true)
    }

    /// Accept every element except `element`.
    pub fn not_same(element: ElementId) -> Self {
        Self::new(move |_, candidate| candidate != element)
    }

    /// Accept only elements that are neither `container` nor inside it.
    pub fn outside(container: ElementId) -> Self {
        Self::new(move |doc, candidate| !doc.is_or_has(container, candidate))
    }

    /// Does `element` pass the filter?
    pub fn accepts(&self, doc: &Document, element: ElementId) -> bool {
        (self.0)(doc, element)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter")
    }
}

/// Apply an optional filter, treating `None` as accept-all.
pub(crate) fn passes(filter: Option<&Filter>, doc: &Document, element: ElementId) -> bool {
    filter.is_none_or(|f| f.accepts(doc, element))
}
