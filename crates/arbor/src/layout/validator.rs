use std::{fmt, mem, sync::mpsc};

use crate::{
    dom::Document,
    error::{Error, Result},
    event::Task,
    id::ElementId,
};

/// A layoutable node backed by a document element.
///
/// Hosts are cheap handles: cloning one yields another reference to the same
/// node, and equality is identity.
pub trait LayoutHost: Clone + PartialEq + fmt::Debug {
    /// The enclosing host, if any.
    fn parent(&self) -> Option<Self>;

    /// Does this host stop upward invalidation?
    fn is_validate_root(&self) -> bool;

    /// Is `other` on this host's parent chain?
    fn is_descendant_of(&self, other: &Self) -> bool;

    /// The element this host lays out.
    fn element(&self) -> ElementId;

    /// Record that `source` (this host or a descendant) needs layout.
    fn invalidate_layout(&self, source: &Self);

    /// Attempt to lay the host out. `Ok(true)` means the host is valid and can
    /// leave the queue; `Ok(false)` keeps it queued for the next flush.
    fn validate_layout(&self, pass: &mut LayoutPass<'_, Self>) -> Result<bool>;
}

/// Mutable state handed to hosts and post-validate callbacks during a flush.
pub struct LayoutPass<'a, H: LayoutHost> {
    /// The document being laid out.
    pub doc: &'a mut Document,
    /// The validator running the flush. Invalidations made through it are
    /// deferred to the next flush.
    pub validator: &'a mut LayoutValidator<H>,
}

/// A deferred action run once after the next flush.
pub type PostValidateFn<H> = Box<dyn FnOnce(&mut LayoutPass<'_, H>)>;

/// What happened to each host during one flush.
#[derive(Debug)]
pub struct FlushReport<H> {
    /// Hosts laid out successfully and removed from the queue.
    pub validated: Vec<H>,
    /// Hosts that reported themselves still invalid and stay queued.
    pub deferred: Vec<H>,
    /// Hosts whose layout failed. They were dropped from the queue.
    pub failed: Vec<(H, Error)>,
    /// Number of post-validate callbacks run.
    pub callbacks: usize,
}

impl<H> Default for FlushReport<H> {
    fn default() -> Self {
        Self {
            validated: Vec::new(),
            deferred: Vec::new(),
            failed: Vec::new(),
            callbacks: 0,
        }
    }
}

/// Tracks invalid validate roots and lays them out in one deferred flush.
pub struct LayoutValidator<H: LayoutHost> {
    /// Validate roots awaiting layout, ancestors before descendants.
    invalid_components: Vec<H>,
    /// Is a flush task in flight?
    pending: bool,
    /// Callbacks to run after the next flush.
    post_validate: Vec<PostValidateFn<H>>,
    /// Channel the flush task is scheduled on.
    task_tx: mpsc::Sender<Task>,
}

impl<H: LayoutHost> LayoutValidator<H> {
    /// Construct a validator that schedules its flushes on `task_tx`.
    pub fn new(task_tx: mpsc::Sender<Task>) -> Self {
        Self {
            invalid_components: Vec::new(),
            pending: false,
            post_validate: Vec::new(),
            task_tx,
        }
    }

    /// Queued validate roots in flush order.
    pub fn invalid_components(&self) -> &[H] {
        &self.invalid_components
    }

    /// Is a flush scheduled and not yet run?
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Number of callbacks waiting for the next flush.
    pub fn post_validate_len(&self) -> usize {
        self.post_validate.len()
    }

    /// Mark `host` and its ancestors up to the nearest validate root as
    /// invalid, then queue that root.
    pub fn invalidate_tree(&mut self, host: &H) {
        let mut current = host.clone();
        loop {
            current.invalidate_layout(host);
            if current.is_validate_root() {
                break;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.invalidate(current);
    }

    /// Queue a validate root. A root that is already queued keeps its
    /// position; a flush is scheduled either way.
    pub fn invalidate(&mut self, root: H) {
        if self.invalid_components.contains(&root) {
            self.schedule_validation();
            return;
        }
        let position = self
            .invalid_components
            .iter()
            .position(|queued| queued.is_descendant_of(&root))
            .unwrap_or(self.invalid_components.len());
        self.invalid_components.insert(position, root);
        self.schedule_validation();
    }

    /// Send the flush task unless one is already in flight.
    fn schedule_validation(&mut self) {
        if self.pending {
            return;
        }
        if self.task_tx.send(Task::ValidateLayout).is_err() {
            tracing::warn!("layout flush not scheduled: task channel closed");
            return;
        }
        self.pending = true;
    }

    /// Lay out every queued root once.
    ///
    /// The queue is snapshotted first: roots invalidated while the flush runs
    /// wait for the next one. A failing host is logged and dropped without
    /// affecting the others. Post-validate callbacks registered before the
    /// flush run afterwards, exactly once.
    pub fn validate(&mut self, doc: &mut Document) -> FlushReport<H> {
        self.pending = false;
        let mut report = FlushReport::default();

        let snapshot = self.invalid_components.clone();
        for host in snapshot {
            // Purged by an earlier host's layout.
            if !self.invalid_components.contains(&host) {
                continue;
            }
            let mut pass = LayoutPass {
                doc: &mut *doc,
                validator: &mut *self,
            };
            match host.validate_layout(&mut pass) {
                Ok(true) => {
                    self.remove(&host);
                    report.validated.push(host);
                }
                Ok(false) => report.deferred.push(host),
                Err(e) => {
                    tracing::warn!(host = ?host, error = %e, "layout failed, dropping host");
                    self.remove(&host);
                    report.failed.push((host, e));
                }
            }
        }

        let callbacks = mem::take(&mut self.post_validate);
        report.callbacks = callbacks.len();
        for callback in callbacks {
            let mut pass = LayoutPass {
                doc: &mut *doc,
                validator: &mut *self,
            };
            callback(&mut pass);
        }

        tracing::debug!(
            validated = report.validated.len(),
            deferred = report.deferred.len(),
            failed = report.failed.len(),
            callbacks = report.callbacks,
            "layout flush"
        );
        report
    }

    /// Drop a host from the queue.
    fn remove(&mut self, host: &H) {
        self.invalid_components.retain(|queued| queued != host);
    }

    /// Drop every queued host whose element is `container` or inside it. Call
    /// this before removing `container` from the document.
    pub fn cleanup_invalid_components(&mut self, doc: &Document, container: ElementId) {
        self.invalid_components
            .retain(|host| !doc.is_or_has(container, host.element()));
    }

    /// Run `callback` after the next flush. `None` is ignored.
    pub fn schedule_post_validate_function(&mut self, callback: Option<PostValidateFn<H>>) {
        if let Some(callback) = callback {
            self.post_validate.push(callback);
        }
    }
}
