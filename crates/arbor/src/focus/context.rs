use crate::{
    dom::Document,
    event::{DomEvent, EventOutcome, Key},
    filter::{self, Filter},
    id::{ContextId, ElementId},
};

/// Services a focus context needs from its manager.
pub trait FocusEnv {
    /// Is focus management switched on?
    fn is_active(&self) -> bool;

    /// The preferred initial focus target within `container`.
    fn find_first_focusable_element(
        &self,
        doc: &Document,
        container: ElementId,
        filter: Option<&Filter>,
    ) -> Option<ElementId>;

    /// Is the element covered by a registered glass pane? `None` is never
    /// covered.
    fn is_element_covert_by_glass_pane(&self, doc: &Document, element: Option<ElementId>) -> bool;

    /// Make `context` the top of the context stack.
    fn push_if_absent_else_move_top(&mut self, context: ContextId);
}

/// The result of a focus application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Focus management is inactive or the context is locked.
    Skipped,
    /// The candidate is behind a glass pane and the current focus is not, so
    /// focus was left alone.
    Blocked,
    /// The resolved element already has focus.
    Unchanged,
    /// Focus moved to the element.
    Focused(ElementId),
}

/// A focus scope over a container element.
///
/// The context remembers the element it last focused so focus can be restored
/// after removals, hides and lock periods.
#[derive(Debug)]
pub struct FocusContext {
    /// Id in the manager's arena.
    id: ContextId,
    /// Root of the scope.
    container: ElementId,
    /// Element holding real focus, while focus is inside the container.
    focused_element: Option<ElementId>,
    /// Last element the context resolved as focus target.
    last_valid_focused_element: Option<ElementId>,
    /// Suppresses focus application while set.
    locked: bool,
    /// Element whose removal triggers focus recovery.
    removal_watch: Option<ElementId>,
    /// Element this context is currently focusing. Its `focusin` is accepted
    /// without re-validation.
    applying_focus: Option<ElementId>,
}

impl FocusContext {
    /// Create an idle context over `container`.
    pub fn new(id: ContextId, container: ElementId) -> Self {
        Self {
            id,
            container,
            focused_element: None,
            last_valid_focused_element: None,
            locked: false,
            removal_watch: None,
            applying_focus: None,
        }
    }

    /// Context id.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Scope root.
    pub fn container(&self) -> ElementId {
        self.container
    }

    /// Element holding focus inside the container, if any.
    pub fn focused_element(&self) -> Option<ElementId> {
        self.focused_element
    }

    /// Last element the context resolved as focus target.
    pub fn last_valid_focused_element(&self) -> Option<ElementId> {
        self.last_valid_focused_element
    }

    /// Is focus application suppressed?
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Element whose removal this context is waiting for.
    pub fn removal_watch(&self) -> Option<ElementId> {
        self.removal_watch
    }

    /// Suppress or allow focus application. Unlocking does not restore focus;
    /// call [`Self::restore_focus`] for that.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Record the element to restore without moving focus.
    pub(crate) fn prepare(&mut self, element: Option<ElementId>) {
        self.last_valid_focused_element = element;
    }

    /// Handle a DOM event routed to this context.
    pub fn handle<E>(&mut self, event: &DomEvent, env: &mut E, doc: &mut Document) -> EventOutcome
    where
        E: FocusEnv + ?Sized,
    {
        match *event {
            DomEvent::FocusIn { target } => self.on_focus_in(target, env, doc),
            DomEvent::FocusOut { target } => self.on_focus_out(target),
            DomEvent::Remove { target } => self.on_removed(target, env, doc),
            DomEvent::KeyDown { key, .. } => self.on_key_down(key, env, doc),
            DomEvent::Hide { target } | DomEvent::Disable { target } => {
                self.on_hide_or_disable(target, env, doc)
            }
        }
    }

    /// Focus entered the container.
    fn on_focus_in<E>(&mut self, target: ElementId, env: &mut E, doc: &mut Document) -> EventOutcome
    where
        E: FocusEnv + ?Sized,
    {
        // Entry points never count as content. A focusin for an element that
        // already lost focus again is stale.
        if doc.is_entry_point(target) || doc.active_element() != Some(target) {
            if self.applying_focus == Some(target) {
                self.applying_focus = None;
            }
            return EventOutcome::Ignore;
        }
        env.push_if_absent_else_move_top(self.id);
        self.focused_element = Some(target);
        self.removal_watch = Some(target);
        if self.applying_focus.take() == Some(target) {
            self.last_valid_focused_element = Some(target);
        } else {
            self.validate_and_set_focus(Some(target), None, env, doc);
        }
        EventOutcome::Handle
    }

    /// Focus left the element we were tracking.
    fn on_focus_out(&mut self, target: ElementId) -> EventOutcome {
        if self.applying_focus == Some(target) {
            self.applying_focus = None;
        }
        self.focused_element = None;
        self.removal_watch = None;
        EventOutcome::Handle
    }

    /// The watched element was removed from the document.
    fn on_removed<E>(&mut self, removed: ElementId, env: &mut E, doc: &mut Document) -> EventOutcome
    where
        E: FocusEnv + ?Sized,
    {
        if self.removal_watch != Some(removed) {
            return EventOutcome::Ignore;
        }
        self.removal_watch = None;
        self.focused_element = None;
        if doc.exists(self.container) {
            self.validate_and_set_focus(None, Some(&Filter::not_same(removed)), env, doc);
        }
        EventOutcome::Handle
    }

    /// Wrap Tab navigation at the container's boundaries.
    fn on_key_down<E>(&mut self, key: Key, env: &mut E, doc: &mut Document) -> EventOutcome
    where
        E: FocusEnv + ?Sized,
    {
        if !key.is_tab() {
            return EventOutcome::Ignore;
        }
        let tabbables = doc.tabbables(self.container);
        let (Some(&first), Some(&last)) = (tabbables.first(), tabbables.last()) else {
            return EventOutcome::Ignore;
        };
        let forward = !key.mods.shift;
        let active = doc.active_element();
        let on_container = active == Some(self.container);

        let (boundary, wrap_to) = if forward { (last, first) } else { (first, last) };
        if active == Some(boundary) || on_container {
            scroll_into_view(doc, wrap_to);
            self.validate_and_set_focus(Some(wrap_to), None, env, doc);
            return EventOutcome::Handle;
        }

        // Native navigation moves focus; only make sure the target is visible.
        let next = active
            .and_then(|a| tabbables.iter().position(|el| *el == a))
            .and_then(|i| if forward { i.checked_add(1) } else { i.checked_sub(1) })
            .and_then(|i| tabbables.get(i).copied());
        if let Some(next) = next {
            scroll_into_view(doc, next);
        }
        EventOutcome::Ignore
    }

    /// An element inside the container was hidden or disabled.
    fn on_hide_or_disable<E>(
        &mut self,
        target: ElementId,
        env: &mut E,
        doc: &mut Document,
    ) -> EventOutcome
    where
        E: FocusEnv + ?Sized,
    {
        let affected = self
            .last_valid_focused_element
            .is_some_and(|last| doc.is_or_has(target, last));
        if !affected {
            return EventOutcome::Ignore;
        }
        self.validate_and_set_focus(None, Some(&Filter::not_same(target)), env, doc);
        EventOutcome::Handle
    }

    /// Resolve `element` to a focus target inside the container and focus it.
    ///
    /// Elements outside the container count as `None`. `None`, or an element
    /// rejected by `filter`, falls back to the first focusable element. The
    /// resolved target is recorded even when focus cannot be applied.
    pub fn validate_and_set_focus<E>(
        &mut self,
        element: Option<ElementId>,
        filter: Option<&Filter>,
        env: &mut E,
        doc: &mut Document,
    ) -> FocusOutcome
    where
        E: FocusEnv + ?Sized,
    {
        let mut element = element.filter(|el| doc.is_or_has(self.container, *el));
        if element.is_none_or(|el| !filter::passes(filter, doc, el)) {
            element = env.find_first_focusable_element(doc, self.container, filter);
        }
        self.last_valid_focused_element = element;
        self.focus(element, env, doc)
    }

    /// Re-validate the last resolved focus target.
    pub fn validate_focus<E>(
        &mut self,
        filter: Option<&Filter>,
        env: &mut E,
        doc: &mut Document,
    ) -> FocusOutcome
    where
        E: FocusEnv + ?Sized,
    {
        self.validate_and_set_focus(self.last_valid_focused_element, filter, env, doc)
    }

    /// Re-apply the last resolved focus target. Does nothing when none was
    /// recorded.
    pub fn restore_focus<E>(&mut self, env: &mut E, doc: &mut Document) -> FocusOutcome
    where
        E: FocusEnv + ?Sized,
    {
        match self.last_valid_focused_element {
            Some(el) => self.focus(Some(el), env, doc),
            None => FocusOutcome::Skipped,
        }
    }

    /// Apply focus to `candidate`, falling back to the container's entry
    /// point.
    pub fn focus<E>(
        &mut self,
        candidate: Option<ElementId>,
        env: &mut E,
        doc: &mut Document,
    ) -> FocusOutcome
    where
        E: FocusEnv + ?Sized,
    {
        self.applying_focus = None;
        if !env.is_active() || self.locked {
            return FocusOutcome::Skipped;
        }

        let mut candidate = candidate;
        if env.is_element_covert_by_glass_pane(doc, candidate) {
            if !env.is_element_covert_by_glass_pane(doc, doc.active_element()) {
                tracing::debug!(
                    context = ?self.id,
                    element = %candidate.map_or("<none>", |el| doc.name(el)),
                    "focus blocked by glass pane"
                );
                return FocusOutcome::Blocked;
            }
            candidate = None;
        }

        let target = match candidate {
            Some(el) if doc.can_focus(el) => el,
            _ => doc.entry_point(self.container),
        };
        if doc.active_element() == Some(target) {
            return FocusOutcome::Unchanged;
        }

        self.applying_focus = Some(target);
        if !doc.focus(target) {
            self.applying_focus = None;
            tracing::warn!(element = %doc.name(target), "element refused focus");
            return FocusOutcome::Unchanged;
        }
        tracing::debug!(context = ?self.id, element = %doc.name(target), "focus applied");
        FocusOutcome::Focused(target)
    }

    /// Forget all transient state. Safe to call more than once.
    pub fn dispose(&mut self) {
        self.focused_element = None;
        self.removal_watch = None;
        self.applying_focus = None;
    }
}

/// Scroll `element` into view within its scroll parent if its top-left
/// corner is outside the visible area.
fn scroll_into_view(doc: &mut Document, element: ElementId) {
    let parent = doc.scroll_parent(element);
    let Some(bounds) = doc.offset_bounds(element) else {
        return;
    };
    if doc.is_location_in_view(bounds.tl, parent) {
        return;
    }
    if let Err(e) = doc.scroll_to(parent, element) {
        tracing::warn!(error = %e, "scroll into view failed");
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::{dom::ElementSpec, error::Result};

    /// An environment with no glass panes that accepts the first focusable
    /// descendant.
    struct StubEnv {
        active: bool,
        pushed: Vec<ContextId>,
    }

    impl FocusEnv for StubEnv {
        fn is_active(&self) -> bool {
            self.active
        }

        fn find_first_focusable_element(
            &self,
            doc: &Document,
            container: ElementId,
            filter: Option<&Filter>,
        ) -> Option<ElementId> {
            doc.focusables(container)
                .into_iter()
                .find(|el| !doc.is_entry_point(*el) && filter::passes(filter, doc, *el))
        }

        fn is_element_covert_by_glass_pane(&self, _: &Document, _: Option<ElementId>) -> bool {
            false
        }

        fn push_if_absent_else_move_top(&mut self, context: ContextId) {
            self.pushed.push(context);
        }
    }

    fn setup() -> Result<(Document, FocusContext, StubEnv, Vec<ElementId>)> {
        let mut doc = Document::new();
        let form = doc.create(doc.root(), ElementSpec::container("form"))?;
        let a = doc.create(form, ElementSpec::field("a"))?;
        let b = doc.create(form, ElementSpec::field("b"))?;
        let mut ids: SlotMap<ContextId, ()> = SlotMap::with_key();
        let ctx = FocusContext::new(ids.insert(()), form);
        let env = StubEnv {
            active: true,
            pushed: Vec::new(),
        };
        Ok((doc, ctx, env, vec![a, b]))
    }

    #[test]
    fn inactive_env_skips() -> Result<()> {
        let (mut doc, mut ctx, mut env, els) = setup()?;
        env.active = false;
        assert_eq!(
            ctx.validate_and_set_focus(Some(els[1]), None, &mut env, &mut doc),
            FocusOutcome::Skipped
        );
        assert_eq!(ctx.last_valid_focused_element(), Some(els[1]));
        assert_eq!(doc.active_element(), None);
        Ok(())
    }

    #[test]
    fn outside_elements_resolve_to_first_focusable() -> Result<()> {
        let (mut doc, mut ctx, mut env, els) = setup()?;
        let stray = doc.create(doc.root(), ElementSpec::field("stray"))?;
        let outcome = ctx.validate_and_set_focus(Some(stray), None, &mut env, &mut doc);
        assert_eq!(outcome, FocusOutcome::Focused(els[0]));
        Ok(())
    }

    #[test]
    fn own_focusin_is_accepted_without_revalidation() -> Result<()> {
        let (mut doc, mut ctx, mut env, els) = setup()?;
        ctx.focus(Some(els[1]), &mut env, &mut doc);
        let event = doc.pop_event();
        assert_eq!(event, Some(DomEvent::FocusIn { target: els[1] }));
        if let Some(event) = event {
            assert_eq!(ctx.handle(&event, &mut env, &mut doc), EventOutcome::Handle);
        }
        assert_eq!(ctx.focused_element(), Some(els[1]));
        assert_eq!(ctx.removal_watch(), Some(els[1]));
        assert_eq!(env.pushed, vec![ctx.id()]);
        assert!(!doc.has_events());
        Ok(())
    }

    #[test]
    fn focusout_keeps_last_valid() -> Result<()> {
        let (mut doc, mut ctx, mut env, els) = setup()?;
        ctx.focus(Some(els[0]), &mut env, &mut doc);
        ctx.handle(&DomEvent::FocusIn { target: els[0] }, &mut env, &mut doc);
        ctx.handle(&DomEvent::FocusOut { target: els[0] }, &mut env, &mut doc);
        assert_eq!(ctx.focused_element(), None);
        assert_eq!(ctx.removal_watch(), None);
        assert_eq!(ctx.last_valid_focused_element(), Some(els[0]));
        Ok(())
    }

    #[test]
    fn stale_focusin_is_ignored() -> Result<()> {
        let (mut doc, mut ctx, mut env, els) = setup()?;
        ctx.focus(Some(els[0]), &mut env, &mut doc);
        ctx.focus(Some(els[1]), &mut env, &mut doc);
        let outcome = ctx.handle(&DomEvent::FocusIn { target: els[0] }, &mut env, &mut doc);
        assert_eq!(outcome, EventOutcome::Ignore);
        assert_eq!(ctx.focused_element(), None);
        assert_eq!(doc.active_element(), Some(els[1]));

        ctx.handle(&DomEvent::FocusIn { target: els[1] }, &mut env, &mut doc);
        assert_eq!(ctx.focused_element(), Some(els[1]));
        assert_eq!(ctx.last_valid_focused_element(), Some(els[1]));
        Ok(())
    }

    #[test]
    fn entry_point_focusin_is_ignored() -> Result<()> {
        let (mut doc, mut ctx, mut env, _) = setup()?;
        let ep = doc.entry_point(ctx.container());
        let outcome = ctx.handle(&DomEvent::FocusIn { target: ep }, &mut env, &mut doc);
        assert_eq!(outcome, EventOutcome::Ignore);
        assert!(env.pushed.is_empty());
        assert_eq!(ctx.focused_element(), None);
        Ok(())
    }

    #[test]
    fn focus_guard_does_not_outlive_its_element() -> Result<()> {
        let (mut doc, mut ctx, mut env, els) = setup()?;

        // Focus landed on the entry point, whose focusin is never accepted.
        let ep = doc.entry_point(ctx.container());
        assert_eq!(ctx.focus(None, &mut env, &mut doc), FocusOutcome::Focused(ep));
        ctx.handle(&DomEvent::FocusIn { target: ep }, &mut env, &mut doc);
        assert_eq!(ctx.applying_focus, None);

        // The focusin went to another context; only the focusout arrives here.
        ctx.focus(Some(els[0]), &mut env, &mut doc);
        assert_eq!(ctx.applying_focus, Some(els[0]));
        ctx.handle(&DomEvent::FocusOut { target: els[0] }, &mut env, &mut doc);
        assert_eq!(ctx.applying_focus, None);

        // A refused application leaves nothing behind either.
        ctx.set_locked(true);
        assert_eq!(ctx.focus(Some(els[1]), &mut env, &mut doc), FocusOutcome::Skipped);
        assert_eq!(ctx.applying_focus, None);
        Ok(())
    }

    #[test]
    fn dispose_is_idempotent() -> Result<()> {
        let (_, mut ctx, _, _) = setup()?;
        ctx.dispose();
        ctx.dispose();
        assert_eq!(ctx.removal_watch(), None);
        Ok(())
    }
}
