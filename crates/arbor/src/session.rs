//! The session event loop.

use std::sync::mpsc;

use crate::{
    config::SessionConfig,
    dom::Document,
    error::{Error, Result},
    error_handler::{ErrorHandler, ErrorInfo, ErrorSink, UiError},
    event::{DomEvent, EventOutcome, Key, Task},
    focus::{FocusManager, FocusOutcome, FocusRule},
    id::{ContextId, ElementId},
    layout::{HtmlComponent, LayoutValidator, PostValidateFn},
};

/// Upper bound on loop turns in one [`Session::run_until_idle`] call.
const MAX_TURNS: usize = 10_000;

/// One UI session: a document with its layout validator, focus manager and
/// error handler, driven by a single-threaded loop.
///
/// Work is split into turns. A turn dispatches every queued document event
/// to the focus manager, then runs one scheduled task. Layout invalidations
/// made during a turn therefore share a single flush.
pub struct Session {
    /// Construction parameters.
    config: SessionConfig,
    /// The document.
    doc: Document,
    /// Layout invalidation queue.
    validator: LayoutValidator<HtmlComponent>,
    /// Focus contexts.
    focus: FocusManager,
    /// Error classification.
    error_handler: ErrorHandler,
    /// Receiver for surfaced and forwarded errors.
    error_sink: Option<Box<dyn ErrorSink>>,
    /// Scheduled tasks.
    task_rx: mpsc::Receiver<Task>,
}

impl Session {
    /// Create a session with an empty document.
    pub fn new(config: SessionConfig) -> Self {
        let (task_tx, task_rx) = mpsc::channel();
        Self {
            doc: Document::new(),
            validator: LayoutValidator::new(task_tx),
            focus: FocusManager::new(config.focus_manager_active),
            error_handler: ErrorHandler::new(config.error_handler),
            error_sink: None,
            task_rx,
            config,
        }
    }

    /// Construction parameters.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The document, mutably. Mutations queue events that the next
    /// [`Self::run_until_idle`] dispatches.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The layout validator.
    pub fn validator(&self) -> &LayoutValidator<HtmlComponent> {
        &self.validator
    }

    /// The focus manager.
    pub fn focus_manager(&self) -> &FocusManager {
        &self.focus
    }

    /// The focus manager, mutably.
    pub fn focus_manager_mut(&mut self) -> &mut FocusManager {
        &mut self.focus
    }

    /// The error handler.
    pub fn error_handler(&self) -> &ErrorHandler {
        &self.error_handler
    }

    /// Install the receiver for errors the handler surfaces or forwards.
    pub fn set_error_sink(&mut self, sink: Box<dyn ErrorSink>) {
        self.error_sink = Some(sink);
    }

    /// Invalidate a component and its ancestors up to the validate root.
    pub fn invalidate_tree(&mut self, component: &HtmlComponent) {
        self.validator.invalidate_tree(component);
    }

    /// Run `callback` after the next layout flush.
    pub fn schedule_post_validate_function(
        &mut self,
        callback: Option<PostValidateFn<HtmlComponent>>,
    ) {
        self.validator.schedule_post_validate_function(callback);
    }

    /// Remove an element subtree, dropping queued layout work inside it
    /// first.
    pub fn remove_element(&mut self, element: ElementId) -> Result<()> {
        self.validator
            .cleanup_invalid_components(&self.doc, element);
        self.doc.remove(element)
    }

    /// Install a focus context on `container`.
    pub fn install_focus_context(
        &mut self,
        container: ElementId,
        rule: FocusRule,
    ) -> Result<ContextId> {
        self.focus
            .install_focus_context(&mut self.doc, container, rule)
    }

    /// Uninstall a focus context, restoring focus of the context below.
    pub fn uninstall_focus_context(&mut self, id: ContextId) -> Result<()> {
        self.focus.uninstall_focus_context(id, &mut self.doc)
    }

    /// Lock or unlock a focus context.
    pub fn set_focus_locked(&mut self, id: ContextId, locked: bool) -> Result<()> {
        self.focus.set_locked(id, locked)
    }

    /// Re-apply a focus context's last resolved focus target.
    pub fn restore_focus(&mut self, id: ContextId) -> Result<FocusOutcome> {
        self.focus.restore_focus(id, &mut self.doc)
    }

    /// Focus `element` through the context containing it.
    pub fn request_focus(&mut self, element: ElementId) -> FocusOutcome {
        self.focus.request_focus(element, &mut self.doc)
    }

    /// Cover `target` with a glass pane.
    pub fn register_glass_pane(&mut self, target: ElementId) -> FocusOutcome {
        self.focus.register_glass_pane(target, &mut self.doc)
    }

    /// Remove the glass pane covering `target`.
    pub fn unregister_glass_pane(&mut self, target: ElementId) -> FocusOutcome {
        self.focus.unregister_glass_pane(target, &mut self.doc)
    }

    /// Press a key on the active element, then run the loop until idle.
    ///
    /// A Tab that no focus context intercepts moves focus in document order,
    /// as a browser would.
    pub fn key_down(&mut self, key: Key) -> Result<EventOutcome> {
        let event = DomEvent::KeyDown {
            target: self.doc.key_target(),
            key,
        };
        let outcome = self.focus.dispatch(&event, &mut self.doc);
        if !outcome.is_handled()
            && key.is_tab()
            && let Some(next) = self.doc.native_tab_target(!key.mods.shift)
        {
            self.doc.focus(next);
        }
        self.run_until_idle()?;
        Ok(outcome)
    }

    /// Classify and report an error.
    pub fn handle_error(&mut self, error: &UiError) -> ErrorInfo {
        let sink: Option<&mut dyn ErrorSink> = match &mut self.error_sink {
            Some(sink) => Some(sink.as_mut()),
            None => None,
        };
        self.error_handler.handle(error, sink)
    }

    /// Dispatch all queued document events.
    fn dispatch_events(&mut self) {
        while let Some(event) = self.doc.pop_event() {
            tracing::trace!(?event, "dispatch");
            self.focus.dispatch(&event, &mut self.doc);
        }
    }

    /// Run turns until no events or tasks are left. Returns the number of
    /// layout flushes performed.
    pub fn run_until_idle(&mut self) -> Result<usize> {
        let mut flushes = 0;
        for _ in 0..MAX_TURNS {
            self.dispatch_events();
            let Ok(task) = self.task_rx.try_recv() else {
                return Ok(flushes);
            };
            match task {
                Task::ValidateLayout => {
                    let report = self.validator.validate(&mut self.doc);
                    flushes += 1;
                    for (_, e) in report.failed {
                        self.handle_error(&e.into());
                    }
                }
            }
        }
        Err(Error::RunLoop(format!(
            "still busy after {MAX_TURNS} turns"
        )))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
