//! An arena-backed element tree standing in for the browser DOM.
//!
//! The document tracks exactly the state the layout and focus cores depend
//! on: structure, visibility, enabled state, focus capability, bounds and
//! scroll offsets, the active element and per-container entry points. State
//! changes that a browser would announce are queued as [`DomEvent`]s and
//! drained by the session loop.

use std::collections::{HashMap, VecDeque};

use slotmap::SlotMap;

use crate::{
    error::{Error, Result},
    event::DomEvent,
    geom::{Point, Rect},
    id::ElementId,
};

/// The part an element plays when choosing an initial focus target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Ordinary content: fields, lists, containers.
    #[default]
    Content,
    /// A button or menu item.
    Button,
    /// The default button of a form or dialog.
    DefaultButton,
}

/// Construction parameters for an element.
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    /// Debug label.
    pub name: String,
    /// Can the element receive focus at all?
    pub focusable: bool,
    /// Is the element part of the sequential tab order?
    pub tabbable: bool,
    /// Role used for initial focus selection.
    pub role: Role,
    /// Exclude the element and its descendants from initial focus selection.
    pub prevent_initial_focus: bool,
    /// Does the element clip and scroll its descendants?
    pub scrollable: bool,
    /// Bounds in document coordinates, before scrolling.
    pub bounds: Rect,
}

impl ElementSpec {
    /// A plain, non-focusable container.
    pub fn container(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// A focusable element in the tab order, such as an input field.
    pub fn field(name: &str) -> Self {
        Self {
            name: name.to_string(),
            focusable: true,
            tabbable: true,
            ..Self::default()
        }
    }

    /// A focusable button in the tab order.
    pub fn button(name: &str) -> Self {
        Self {
            role: Role::Button,
            ..Self::field(name)
        }
    }

    /// Set the role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set whether the element can receive focus.
    pub fn focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    /// Set whether the element is in the tab order.
    pub fn tabbable(mut self, tabbable: bool) -> Self {
        self.tabbable = tabbable;
        self
    }

    /// Mark the element as scroll container.
    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    /// Exclude the element subtree from initial focus selection.
    pub fn prevent_initial_focus(mut self) -> Self {
        self.prevent_initial_focus = true;
        self
    }

    /// Set bounds.
    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }
}

/// Element data stored in the arena.
#[derive(Debug)]
pub struct Element {
    /// Parent in the arena tree; `None` only for the document root.
    pub(crate) parent: Option<ElementId>,
    /// Children in document order.
    pub(crate) children: Vec<ElementId>,
    /// Construction parameters.
    pub(crate) spec: ElementSpec,
    /// Hidden flag.
    pub(crate) hidden: bool,
    /// Disabled flag.
    pub(crate) disabled: bool,
    /// Scroll offset applied to descendants.
    pub(crate) scroll: Point,
}

impl Element {
    /// Return the element's debug label.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Return the element's parent, if any.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Return the element's children.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Return the element's role.
    pub fn role(&self) -> Role {
        self.spec.role
    }

    /// Return true if the element itself is hidden.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Return true if the element itself is disabled.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// Return the current scroll offset.
    pub fn scroll(&self) -> Point {
        self.scroll
    }
}

/// The element tree, the active element and the pending event queue.
pub struct Document {
    /// Element storage arena.
    elements: SlotMap<ElementId, Element>,
    /// Root element.
    root: ElementId,
    /// Document-wide fallback entry point.
    entry_point: ElementId,
    /// Entry points registered for specific containers.
    entry_points: HashMap<ElementId, ElementId>,
    /// Element holding real focus.
    active: Option<ElementId>,
    /// Events raised but not yet dispatched.
    events: VecDeque<DomEvent>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with a root element and a document-wide entry point.
    pub fn new() -> Self {
        let mut elements = SlotMap::with_key();
        let root = elements.insert(Element {
            parent: None,
            children: Vec::new(),
            spec: ElementSpec::container("document"),
            hidden: false,
            disabled: false,
            scroll: Point::zero(),
        });
        let entry_point = elements.insert(Element {
            parent: Some(root),
            children: Vec::new(),
            spec: ElementSpec::field("entry_point").tabbable(false),
            hidden: false,
            disabled: false,
            scroll: Point::zero(),
        });
        elements[root].children.push(entry_point);
        Self {
            elements,
            root,
            entry_point,
            entry_points: HashMap::new(),
            active: None,
            events: VecDeque::new(),
        }
    }

    /// Return the root element id.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Return an element by id.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Does the element exist?
    pub fn exists(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Return the debug label of an element, or `"<removed>"`.
    pub fn name(&self, id: ElementId) -> &str {
        self.elements.get(id).map_or("<removed>", |e| e.name())
    }

    /// Create an element as the last child of `parent`.
    pub fn create(&mut self, parent: ElementId, spec: ElementSpec) -> Result<ElementId> {
        if !self.elements.contains_key(parent) {
            return Err(Error::ElementNotFound(parent));
        }
        let id = self.elements.insert(Element {
            parent: Some(parent),
            children: Vec::new(),
            spec,
            hidden: false,
            disabled: false,
            scroll: Point::zero(),
        });
        self.elements[parent].children.push(id);
        Ok(id)
    }

    /// Move an element under a new parent, appending it to the children.
    pub fn reparent(&mut self, id: ElementId, parent: ElementId) -> Result<()> {
        if id == self.root {
            return Err(Error::InvalidOperation("cannot move the document root".into()));
        }
        if !self.exists(id) {
            return Err(Error::ElementNotFound(id));
        }
        if !self.exists(parent) {
            return Err(Error::ElementNotFound(parent));
        }
        if self.is_or_has(id, parent) {
            return Err(Error::WouldCreateCycle { parent, child: id });
        }
        if let Some(old) = self.elements[id].parent
            && let Some(node) = self.elements.get_mut(old)
        {
            node.children.retain(|c| *c != id);
        }
        self.elements[id].parent = Some(parent);
        self.elements[parent].children.push(id);
        Ok(())
    }

    /// Remove an element and all its descendants.
    ///
    /// A removal event is queued for every removed element in pre-order. If
    /// the active element was inside the subtree, focus is dropped without a
    /// `focusout`, as browsers do.
    pub fn remove(&mut self, id: ElementId) -> Result<()> {
        if id == self.root {
            return Err(Error::InvalidOperation("cannot remove the document root".into()));
        }
        if !self.exists(id) {
            return Err(Error::ElementNotFound(id));
        }

        let removed = self.subtree_pre_order(id);
        if removed.contains(&self.entry_point) {
            return Err(Error::InvalidOperation("cannot remove the entry point".into()));
        }
        if let Some(parent) = self.elements[id].parent
            && let Some(node) = self.elements.get_mut(parent)
        {
            node.children.retain(|c| *c != id);
        }
        if self.active.is_some_and(|a| removed.contains(&a)) {
            self.active = None;
        }
        for el in &removed {
            self.elements.remove(*el);
        }
        self.entry_points
            .retain(|container, ep| !removed.contains(container) && !removed.contains(ep));
        self.events
            .extend(removed.iter().map(|target| DomEvent::Remove { target: *target }));
        Ok(())
    }

    /// Collect a subtree in pre-order, including the root.
    pub fn subtree_pre_order(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(el) = self.elements.get(id) else {
                continue;
            };
            out.push(id);
            for child in el.children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Return true if `node` is a strict descendant of `ancestor`.
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = self.elements.get(node).and_then(|e| e.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.elements.get(id).and_then(|e| e.parent);
        }
        false
    }

    /// Return true if `node` is `ancestor` or one of its descendants.
    pub fn is_or_has(&self, ancestor: ElementId, node: ElementId) -> bool {
        (ancestor == node && self.exists(node)) || self.contains(ancestor, node)
    }

    /// Return the nearest element, starting at `start` itself, matching `pred`.
    pub fn closest(
        &self,
        start: ElementId,
        mut pred: impl FnMut(ElementId, &Element) -> bool,
    ) -> Option<ElementId> {
        let mut current = Some(start);
        while let Some(id) = current {
            let el = self.elements.get(id)?;
            if pred(id, el) {
                return Some(id);
            }
            current = el.parent;
        }
        None
    }

    /// Is the element and every ancestor visible?
    pub fn is_visible(&self, id: ElementId) -> bool {
        self.exists(id) && self.closest(id, |_, e| e.hidden).is_none()
    }

    /// Is the element and every ancestor enabled?
    pub fn is_enabled(&self, id: ElementId) -> bool {
        self.exists(id) && self.closest(id, |_, e| e.disabled).is_none()
    }

    /// Probe whether a focus request on the element would take effect.
    pub fn can_focus(&self, id: ElementId) -> bool {
        self.elements.get(id).is_some_and(|e| e.spec.focusable)
            && self.is_visible(id)
            && self.is_enabled(id)
    }

    /// Is the element reachable with Tab?
    pub fn is_tabbable(&self, id: ElementId) -> bool {
        self.elements.get(id).is_some_and(|e| e.spec.tabbable) && self.can_focus(id)
    }

    /// Is the element excluded from initial focus by itself or an ancestor?
    pub fn prevents_initial_focus(&self, id: ElementId) -> bool {
        self.closest(id, |_, e| e.spec.prevent_initial_focus).is_some()
    }

    /// Focusable elements in `container`, the container included, in
    /// document order.
    pub fn focusables(&self, container: ElementId) -> Vec<ElementId> {
        self.subtree_pre_order(container)
            .into_iter()
            .filter(|id| self.can_focus(*id))
            .collect()
    }

    /// Tabbable descendants of `container` in document order.
    pub fn tabbables(&self, container: ElementId) -> Vec<ElementId> {
        self.subtree_pre_order(container)
            .into_iter()
            .filter(|id| *id != container && self.is_tabbable(*id))
            .collect()
    }

    /// Register `entry_point` as the focus fallback for `container`.
    pub fn set_entry_point(&mut self, container: ElementId, entry_point: ElementId) -> Result<()> {
        if !self.exists(container) {
            return Err(Error::ElementNotFound(container));
        }
        if !self.exists(entry_point) {
            return Err(Error::ElementNotFound(entry_point));
        }
        self.entry_points.insert(container, entry_point);
        Ok(())
    }

    /// The entry point responsible for `container`: the nearest registered
    /// one on the ancestor chain, or the document-wide entry point.
    pub fn entry_point(&self, container: ElementId) -> ElementId {
        let mut current = Some(container);
        while let Some(id) = current {
            if let Some(ep) = self.entry_points.get(&id) {
                return *ep;
            }
            current = self.elements.get(id).and_then(|e| e.parent);
        }
        self.entry_point
    }

    /// Is the element the document entry point or a registered container
    /// entry point?
    pub fn is_entry_point(&self, id: ElementId) -> bool {
        id == self.entry_point || self.entry_points.values().any(|ep| *ep == id)
    }

    /// Return the element holding real focus.
    pub fn active_element(&self) -> Option<ElementId> {
        self.active
    }

    /// Move real focus to `id`.
    ///
    /// Returns `false` without raising events if the element cannot take focus
    /// or already has it. Otherwise queues `focusout` for the previous and
    /// `focusin` for the new element.
    pub fn focus(&mut self, id: ElementId) -> bool {
        if self.active == Some(id) || !self.can_focus(id) {
            return false;
        }
        if let Some(previous) = self.active.take() {
            self.events.push_back(DomEvent::FocusOut { target: previous });
        }
        self.active = Some(id);
        self.events.push_back(DomEvent::FocusIn { target: id });
        true
    }

    /// Set the hidden flag, queuing a `hide` event when an element is hidden.
    /// Returns `true` if visibility changed.
    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) -> Result<bool> {
        let el = self.elements.get_mut(id).ok_or(Error::ElementNotFound(id))?;
        let changed = el.hidden != hidden;
        el.hidden = hidden;
        if changed && hidden {
            self.events.push_back(DomEvent::Hide { target: id });
        }
        Ok(changed)
    }

    /// Set the disabled flag, queuing a `disable` event when an element is
    /// disabled. Returns `true` if the state changed.
    pub fn set_disabled(&mut self, id: ElementId, disabled: bool) -> Result<bool> {
        let el = self.elements.get_mut(id).ok_or(Error::ElementNotFound(id))?;
        let changed = el.disabled != disabled;
        el.disabled = disabled;
        if changed && disabled {
            self.events.push_back(DomEvent::Disable { target: id });
        }
        Ok(changed)
    }

    /// Replace the bounds of an element.
    pub fn set_bounds(&mut self, id: ElementId, bounds: Rect) -> Result<()> {
        let el = self.elements.get_mut(id).ok_or(Error::ElementNotFound(id))?;
        el.spec.bounds = bounds;
        Ok(())
    }

    /// Return the unscrolled bounds of an element.
    pub fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.elements.get(id).map(|e| e.spec.bounds)
    }

    /// The element receiving key presses: the active element, or the root
    /// when nothing has focus.
    pub fn key_target(&self) -> ElementId {
        self.active.unwrap_or(self.root)
    }

    /// Pop the oldest pending event.
    pub fn pop_event(&mut self) -> Option<DomEvent> {
        self.events.pop_front()
    }

    /// Are events waiting to be dispatched?
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// The nearest scrollable ancestor of `id`, or the root.
    pub fn scroll_parent(&self, id: ElementId) -> ElementId {
        self.elements
            .get(id)
            .and_then(|e| e.parent)
            .and_then(|p| self.closest(p, |_, e| e.spec.scrollable))
            .unwrap_or(self.root)
    }

    /// Bounds of an element after applying the scroll offsets of its
    /// ancestors.
    pub fn offset_bounds(&self, id: ElementId) -> Option<Rect> {
        let el = self.elements.get(id)?;
        let mut offset = Point::zero();
        let mut current = el.parent;
        while let Some(pid) = current {
            let parent = self.elements.get(pid)?;
            offset = offset + parent.scroll;
            current = parent.parent;
        }
        Some(el.spec.bounds.shift(Point::zero() - offset))
    }

    /// Is `location` inside the visible area of `scrollable`? The document
    /// root is treated as unbounded.
    pub fn is_location_in_view(&self, location: Point, scrollable: ElementId) -> bool {
        if scrollable == self.root {
            return true;
        }
        self.offset_bounds(scrollable)
            .is_some_and(|view| view.contains_point(location))
    }

    /// Adjust the scroll offset of `scrollable` so that `id` is in view.
    pub fn scroll_to(&mut self, scrollable: ElementId, id: ElementId) -> Result<()> {
        let view = self
            .offset_bounds(scrollable)
            .ok_or(Error::ElementNotFound(scrollable))?;
        let target = self.offset_bounds(id).ok_or(Error::ElementNotFound(id))?;
        let el = self
            .elements
            .get_mut(scrollable)
            .ok_or(Error::ElementNotFound(scrollable))?;

        if target.tl.y < view.tl.y {
            el.scroll.y -= view.tl.y - target.tl.y;
        } else if target.bottom() > view.bottom() {
            el.scroll.y += target.bottom() - view.bottom();
        }
        if target.tl.x < view.tl.x {
            el.scroll.x -= view.tl.x - target.tl.x;
        } else if target.right() > view.right() {
            el.scroll.x += target.right() - view.right();
        }
        el.scroll.x = el.scroll.x.max(0);
        el.scroll.y = el.scroll.y.max(0);
        tracing::trace!(element = %self.name(id), "scrolled into view");
        Ok(())
    }

    /// The element native Tab navigation moves to from the active element:
    /// the next (or previous) tabbable element in document order.
    pub fn native_tab_target(&self, forward: bool) -> Option<ElementId> {
        let order = self.tabbables(self.root);
        let index = self.active.and_then(|a| order.iter().position(|id| *id == a));
        match (index, forward) {
            (None, true) => order.first().copied(),
            (None, false) => order.last().copied(),
            (Some(i), true) => order.get(i + 1).copied(),
            (Some(i), false) => i.checked_sub(1).and_then(|i| order.get(i).copied()),
        }
    }
}
