use std::{
    cell::{Cell, RefCell},
    fmt,
    hash::{Hash, Hasher},
    rc::{Rc, Weak},
};

use crate::{
    error::{Error, Result},
    geom::Rect,
    id::ElementId,
    layout::validator::{LayoutHost, LayoutPass},
};

/// A layout strategy attached to a component.
pub trait Layout {
    /// Position the component's content. Called only while the component is
    /// attached and visible.
    fn layout(
        &mut self,
        component: &HtmlComponent,
        pass: &mut LayoutPass<'_, HtmlComponent>,
    ) -> Result<()>;

    /// Drop any cached measurements after `source` was invalidated.
    fn invalidate(&mut self, _source: &HtmlComponent) {}
}

impl<F> Layout for F
where
    F: FnMut(&HtmlComponent, &mut LayoutPass<'_, HtmlComponent>) -> Result<()>,
{
    fn layout(
        &mut self,
        component: &HtmlComponent,
        pass: &mut LayoutPass<'_, HtmlComponent>,
    ) -> Result<()> {
        self(component, pass)
    }
}

/// Stacks the visible children of the component's element top to bottom,
/// each spanning the full width.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnLayout {
    /// Height of every row.
    pub row_height: u32,
    /// Vertical gap between rows.
    pub gap: u32,
}

impl ColumnLayout {
    /// Construct a column layout.
    pub fn new(row_height: u32, gap: u32) -> Self {
        Self { row_height, gap }
    }
}

impl Layout for ColumnLayout {
    fn layout(
        &mut self,
        component: &HtmlComponent,
        pass: &mut LayoutPass<'_, HtmlComponent>,
    ) -> Result<()> {
        let el = component.element();
        let outer = pass.doc.bounds(el).ok_or(Error::ElementNotFound(el))?;
        let children = pass
            .doc
            .get(el)
            .map(|e| e.children().to_vec())
            .unwrap_or_default();

        let step = i32::try_from(self.row_height.saturating_add(self.gap))
            .map_err(|_| Error::Layout(format!("row step too large in {}", component.name())))?;
        let mut y = outer.tl.y;
        for child in children {
            if pass.doc.get(child).is_some_and(|c| c.hidden()) {
                continue;
            }
            pass.doc
                .set_bounds(child, Rect::new(outer.tl.x, y, outer.w, self.row_height))?;
            y = y.saturating_add(step);
        }
        Ok(())
    }
}

/// Shared state of a component.
struct Inner {
    /// Debug label.
    name: String,
    /// Element the component lays out.
    element: ElementId,
    /// Enclosing component.
    parent: RefCell<Weak<Inner>>,
    /// Does invalidation stop here?
    validate_root: Cell<bool>,
    /// Is the current layout up to date?
    valid: Cell<bool>,
    /// Has the component been laid out at least once?
    layouted: Cell<bool>,
    /// Components whose invalidation reached this one since the last layout.
    dirty_sources: RefCell<Vec<Weak<Inner>>>,
    /// Layout strategy. Taken out while it runs.
    layout: RefCell<Option<Box<dyn Layout>>>,
}

/// A widget's layout node: an element, a parent link and a layout strategy.
///
/// Cloning yields another handle to the same component. Equality and hashing
/// are by identity.
#[derive(Clone)]
pub struct HtmlComponent(Rc<Inner>);

impl HtmlComponent {
    /// Create a detached, invalid component laying out `element`.
    pub fn new(name: &str, element: ElementId) -> Self {
        Self(Rc::new(Inner {
            name: name.to_string(),
            element,
            parent: RefCell::new(Weak::new()),
            validate_root: Cell::new(false),
            valid: Cell::new(false),
            layouted: Cell::new(false),
            dirty_sources: RefCell::default(),
            layout: RefCell::new(None),
        }))
    }

    /// Builder-style: attach a layout strategy.
    pub fn with_layout(self, layout: impl Layout + 'static) -> Self {
        self.set_layout(layout);
        self
    }

    /// Builder-style: make the component a validate root.
    pub fn validate_root(self) -> Self {
        self.set_validate_root(true);
        self
    }

    /// Replace the layout strategy.
    pub fn set_layout(&self, layout: impl Layout + 'static) {
        *self.0.layout.borrow_mut() = Some(Box::new(layout));
        self.0.valid.set(false);
    }

    /// Link the component under `parent`, or detach it.
    pub fn set_parent(&self, parent: Option<&Self>) {
        *self.0.parent.borrow_mut() = parent.map_or_else(Weak::new, |p| Rc::downgrade(&p.0));
    }

    /// Set whether upward invalidation stops at this component.
    pub fn set_validate_root(&self, root: bool) {
        self.0.validate_root.set(root);
    }

    /// Debug label.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Is the layout up to date?
    pub fn is_valid(&self) -> bool {
        self.0.valid.get()
    }

    /// Has a layout pass completed on this component?
    pub fn is_layouted(&self) -> bool {
        self.0.layouted.get()
    }

    /// Components whose invalidation reached this one since the last layout,
    /// skipping any that were dropped.
    pub fn dirty_sources(&self) -> Vec<Self> {
        self.0
            .dirty_sources
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(Self)
            .collect()
    }
}

impl PartialEq for HtmlComponent {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HtmlComponent {}

impl Hash for HtmlComponent {
    fn hash<S: Hasher>(&self, state: &mut S) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for HtmlComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlComponent")
            .field("name", &self.0.name)
            .field("valid", &self.0.valid.get())
            .finish()
    }
}

impl LayoutHost for HtmlComponent {
    fn parent(&self) -> Option<Self> {
        self.0.parent.borrow().upgrade().map(Self)
    }

    fn is_validate_root(&self) -> bool {
        self.0.validate_root.get()
    }

    fn is_descendant_of(&self, other: &Self) -> bool {
        let mut current = self.parent();
        while let Some(p) = current {
            if &p == other {
                return true;
            }
            current = p.parent();
        }
        false
    }

    fn element(&self) -> ElementId {
        self.0.element
    }

    fn invalidate_layout(&self, source: &Self) {
        self.0.valid.set(false);
        {
            let mut sources = self.0.dirty_sources.borrow_mut();
            if !sources.iter().any(|s| Weak::ptr_eq(s, &Rc::downgrade(&source.0))) {
                sources.push(Rc::downgrade(&source.0));
            }
        }
        // The slot is empty while the strategy itself is running.
        if let Ok(mut slot) = self.0.layout.try_borrow_mut()
            && let Some(layout) = slot.as_mut()
        {
            layout.invalidate(source);
        }
    }

    fn validate_layout(&self, pass: &mut LayoutPass<'_, Self>) -> Result<bool> {
        if self.is_valid() {
            return Ok(true);
        }
        if !pass.doc.exists(self.element()) {
            // Nothing left to lay out; the host leaves the queue for good.
            tracing::debug!(component = %self.name(), "element removed, dropping layout");
            return Ok(true);
        }
        if !pass.doc.is_visible(self.element()) {
            tracing::trace!(component = %self.name(), "not attached and visible, layout deferred");
            return Ok(false);
        }

        // Marked valid up front: an invalidation raised while the strategy
        // runs clears the flag again and keeps the host queued.
        self.0.valid.set(true);
        self.0.dirty_sources.borrow_mut().clear();
        let taken = self.0.layout.borrow_mut().take();
        if let Some(layout) = taken {
            let mut layout = scopeguard::guard(layout, |layout| {
                let mut slot = self.0.layout.borrow_mut();
                if slot.is_none() {
                    *slot = Some(layout);
                }
            });
            if let Err(e) = layout.layout(self, pass) {
                self.0.valid.set(false);
                return Err(e);
            }
        }

        self.0.layouted.set(true);
        tracing::trace!(component = %self.name(), valid = self.is_valid(), "laid out");
        Ok(self.is_valid())
    }
}
