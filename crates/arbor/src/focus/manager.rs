use std::collections::HashMap;

use slotmap::SlotMap;

use crate::{
    dom::{Document, Element, Role},
    error::{Error, Result},
    event::{DomEvent, EventOutcome},
    filter::{self, Filter},
    focus::context::{FocusContext, FocusEnv, FocusOutcome},
    id::{ContextId, ElementId},
};

/// How a freshly installed context treats focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusRule {
    /// Focus the first focusable element right away.
    #[default]
    Auto,
    /// Record the first focusable element for a later restore, without
    /// moving focus.
    Prepare,
    /// Leave focus alone.
    None,
}

/// An overlay that makes an element subtree unreachable for focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlassPane {
    /// Root of the covered subtree.
    pub target: ElementId,
}

/// Manager state shared with contexts while they handle events.
#[derive(Debug)]
pub struct FocusState {
    /// Global on/off switch.
    active: bool,
    /// Context stack, top last.
    stack: Vec<ContextId>,
    /// Registered glass panes.
    glass_panes: Vec<GlassPane>,
}

impl FocusState {
    /// Is the element inside a glass pane's target?
    fn is_covered(&self, doc: &Document, element: ElementId) -> bool {
        self.glass_panes
            .iter()
            .any(|pane| doc.is_or_has(pane.target, element))
    }
}

impl FocusEnv for FocusState {
    fn is_active(&self) -> bool {
        self.active
    }

    fn find_first_focusable_element(
        &self,
        doc: &Document,
        container: ElementId,
        filter: Option<&Filter>,
    ) -> Option<ElementId> {
        let mut first_content = None;
        let mut first_button = None;
        let candidates = doc.focusables(container).into_iter().filter(|el| {
            !doc.is_entry_point(*el)
                && !self.is_covered(doc, *el)
                && !doc.prevents_initial_focus(*el)
                && filter::passes(filter, doc, *el)
        });
        for el in candidates {
            match doc.get(el).map(Element::role) {
                Some(Role::DefaultButton) => return Some(el),
                Some(Role::Button) => {
                    first_button.get_or_insert(el);
                }
                _ => {
                    first_content.get_or_insert(el);
                }
            }
        }
        first_content.or(first_button)
    }

    fn is_element_covert_by_glass_pane(&self, doc: &Document, element: Option<ElementId>) -> bool {
        element.is_some_and(|el| self.is_covered(doc, el))
    }

    fn push_if_absent_else_move_top(&mut self, context: ContextId) {
        if self.stack.last() == Some(&context) {
            return;
        }
        self.stack.retain(|id| *id != context);
        self.stack.push(context);
    }
}

/// Owns the focus contexts of a session and routes DOM events to them.
#[derive(Debug)]
pub struct FocusManager {
    /// Context storage.
    contexts: SlotMap<ContextId, FocusContext>,
    /// Context lookup by container element.
    by_container: HashMap<ElementId, ContextId>,
    /// Stack, glass panes and the active switch.
    state: FocusState,
}

impl FocusManager {
    /// Create a manager with no contexts.
    pub fn new(active: bool) -> Self {
        Self {
            contexts: SlotMap::with_key(),
            by_container: HashMap::new(),
            state: FocusState {
                active,
                stack: Vec::new(),
                glass_panes: Vec::new(),
            },
        }
    }

    /// Is focus management switched on?
    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Switch focus management on or off.
    pub fn set_active(&mut self, active: bool) {
        self.state.active = active;
    }

    /// Return a context by id.
    pub fn context(&self, id: ContextId) -> Option<&FocusContext> {
        self.contexts.get(id)
    }

    /// Return a context mutably by id.
    pub fn context_mut(&mut self, id: ContextId) -> Option<&mut FocusContext> {
        self.contexts.get_mut(id)
    }

    /// The context installed on `container`, if any.
    pub fn context_for(&self, container: ElementId) -> Option<ContextId> {
        self.by_container.get(&container).copied()
    }

    /// The context stack, bottom first.
    pub fn stack(&self) -> &[ContextId] {
        &self.state.stack
    }

    /// The context on top of the stack.
    pub fn active_context(&self) -> Option<ContextId> {
        self.state.stack.last().copied()
    }

    /// Install a focus context on `container` and push it on the stack.
    pub fn install_focus_context(
        &mut self,
        doc: &mut Document,
        container: ElementId,
        rule: FocusRule,
    ) -> Result<ContextId> {
        if !doc.exists(container) {
            return Err(Error::ElementNotFound(container));
        }
        if self.by_container.contains_key(&container) {
            return Err(Error::DuplicateContext(container));
        }
        let id = self
            .contexts
            .insert_with_key(|id| FocusContext::new(id, container));
        self.by_container.insert(container, id);
        self.state.push_if_absent_else_move_top(id);
        tracing::debug!(
            context = ?id,
            container = %doc.name(container),
            ?rule,
            "focus context installed"
        );

        let ctx = &mut self.contexts[id];
        match rule {
            FocusRule::Auto => {
                ctx.validate_and_set_focus(None, None, &mut self.state, doc);
            }
            FocusRule::Prepare => {
                let first = self.state.find_first_focusable_element(doc, container, None);
                ctx.prepare(first);
            }
            FocusRule::None => {}
        }
        Ok(id)
    }

    /// Dispose a context and drop it from the stack. If it was on top, the
    /// context below it restores its focus.
    pub fn uninstall_focus_context(&mut self, id: ContextId, doc: &mut Document) -> Result<()> {
        let was_top = self.active_context() == Some(id);
        let mut ctx = self.contexts.remove(id).ok_or(Error::ContextNotFound(id))?;
        ctx.dispose();
        self.by_container.remove(&ctx.container());
        self.state.stack.retain(|c| *c != id);
        tracing::debug!(context = ?id, "focus context uninstalled");

        if was_top && let Some(top) = self.active_context() {
            self.contexts[top].restore_focus(&mut self.state, doc);
        }
        Ok(())
    }

    /// Move a context to the top of the stack, pushing it if absent.
    pub fn push_if_absent_else_move_top(&mut self, id: ContextId) -> Result<()> {
        if !self.contexts.contains_key(id) {
            return Err(Error::ContextNotFound(id));
        }
        self.state.push_if_absent_else_move_top(id);
        Ok(())
    }

    /// Lock or unlock a context.
    pub fn set_locked(&mut self, id: ContextId, locked: bool) -> Result<()> {
        self.contexts
            .get_mut(id)
            .ok_or(Error::ContextNotFound(id))?
            .set_locked(locked);
        Ok(())
    }

    /// Re-apply a context's last resolved focus target.
    pub fn restore_focus(&mut self, id: ContextId, doc: &mut Document) -> Result<FocusOutcome> {
        let ctx = self
            .contexts
            .get_mut(id)
            .ok_or(Error::ContextNotFound(id))?;
        Ok(ctx.restore_focus(&mut self.state, doc))
    }

    /// Registered glass panes.
    pub fn glass_panes(&self) -> &[GlassPane] {
        &self.state.glass_panes
    }

    /// Cover the subtree of `target`, then re-validate the active context's
    /// focus.
    pub fn register_glass_pane(&mut self, target: ElementId, doc: &mut Document) -> FocusOutcome {
        self.state.glass_panes.push(GlassPane { target });
        self.validate_focus(doc)
    }

    /// Remove a glass pane on `target`, then re-validate the active context's
    /// focus.
    pub fn unregister_glass_pane(&mut self, target: ElementId, doc: &mut Document) -> FocusOutcome {
        if let Some(pos) = self
            .state
            .glass_panes
            .iter()
            .position(|pane| pane.target == target)
        {
            self.state.glass_panes.remove(pos);
        }
        self.validate_focus(doc)
    }

    /// Is the element covered by a glass pane? `None` is never covered.
    pub fn is_element_covert_by_glass_pane(
        &self,
        doc: &Document,
        element: Option<ElementId>,
    ) -> bool {
        self.state.is_element_covert_by_glass_pane(doc, element)
    }

    /// The preferred initial focus target within `container`: the first
    /// default button, else the first non-button, else the first button.
    pub fn find_first_focusable_element(
        &self,
        doc: &Document,
        container: ElementId,
        filter: Option<&Filter>,
    ) -> Option<ElementId> {
        self.state
            .find_first_focusable_element(doc, container, filter)
    }

    /// Re-validate the active context's focus.
    pub fn validate_focus(&mut self, doc: &mut Document) -> FocusOutcome {
        match self.active_context() {
            Some(top) => self.contexts[top].validate_focus(None, &mut self.state, doc),
            None => FocusOutcome::Skipped,
        }
    }

    /// Focus `element` through the innermost context containing it.
    pub fn request_focus(&mut self, element: ElementId, doc: &mut Document) -> FocusOutcome {
        let Some(id) = self.route(doc, element).first().copied() else {
            tracing::debug!(element = %doc.name(element), "no focus context for element");
            return FocusOutcome::Skipped;
        };
        self.contexts[id].validate_and_set_focus(Some(element), None, &mut self.state, doc)
    }

    /// Contexts whose container is `element` or an ancestor, innermost first.
    fn route(&self, doc: &Document, element: ElementId) -> Vec<ContextId> {
        let mut out = Vec::new();
        let mut current = Some(element);
        while let Some(id) = current {
            let Some(el) = doc.get(id) else {
                break;
            };
            if let Some(ctx) = self.by_container.get(&id) {
                out.push(*ctx);
            }
            current = el.parent();
        }
        out
    }

    /// Route a DOM event to the contexts concerned.
    ///
    /// Bubbling events visit contexts from the innermost outward until one
    /// handles them. A non-bubbling removal goes to the context watching the
    /// removed element; removing a context's container uninstalls that
    /// context.
    pub fn dispatch(&mut self, event: &DomEvent, doc: &mut Document) -> EventOutcome {
        if event.bubbles() {
            for id in self.route(doc, event.target()) {
                if self.contexts[id]
                    .handle(event, &mut self.state, doc)
                    .is_handled()
                {
                    return EventOutcome::Handle;
                }
            }
            return EventOutcome::Ignore;
        }

        let target = event.target();
        let mut outcome = EventOutcome::Ignore;
        if let Some(id) = self.context_for(target) {
            if let Err(e) = self.uninstall_focus_context(id, doc) {
                tracing::warn!(error = %e, "uninstall on container removal failed");
            }
            outcome = EventOutcome::Handle;
        }
        let watcher = self
            .contexts
            .iter()
            .find(|(_, ctx)| ctx.removal_watch() == Some(target))
            .map(|(id, _)| id);
        if let Some(id) = watcher
            && self.contexts[id]
                .handle(event, &mut self.state, doc)
                .is_handled()
        {
            outcome = EventOutcome::Handle;
        }
        outcome
    }
}
