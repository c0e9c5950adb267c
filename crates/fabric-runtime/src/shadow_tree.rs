#![forbid(unsafe_code)]

//! The committed shadow tree of one surface and its commit loop.
//!
//! A commit runs a *transaction* against the current root to produce a
//! candidate root. The transaction runs without holding the tree lock, so a
//! concurrent commit may land first; the attempt then reports
//! [`CommitStatus::Failed`] and [`ShadowTree::commit`] retries it on top of
//! the newer revision.
//!
//! Before publishing, the candidate is reconciled with the committed root
//! (unless the caller opts out, or the candidate root belongs to another
//! family), so state that was committed while the candidate was being built
//! is not rolled back. After publishing, every node's state is offered to its
//! family as the most recent state; subtrees shared with the previous
//! revision are skipped.
//!
//! Published revisions are queued for observers while the tree lock is still
//! held, so the queue is in commit order. One committing thread at a time
//! drains the queue; a commit that finds delivery already in progress leaves
//! its revision to that thread and returns.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use fabric_core::{ReconcileConfig, debug, debug_span, trace, warn};
use fabric_tree::{ShadowNode, SharedShadowNode, SurfaceId, reconcile_state_with_tree};

use crate::commit::{CommitError, CommitObserver, CommitOptions, CommitStatus};

/// Sequence number of a published tree. The initial tree is revision 0.
pub type RevisionNumber = u64;

/// A published root together with its sequence number.
#[derive(Debug, Clone)]
pub struct ShadowTreeRevision {
    pub root: SharedShadowNode,
    pub number: RevisionNumber,
}

enum Attempt {
    Committed(ShadowTreeRevision),
    Failed,
    Cancelled,
}

#[derive(Default)]
struct Delivery {
    pending: VecDeque<(ShadowTreeRevision, ShadowTreeRevision)>,
    draining: bool,
}

/// Clears `draining` if an observer panics mid-delivery.
struct DrainGuard<'a> {
    delivery: &'a Mutex<Delivery>,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.delivery
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .draining = false;
        }
    }
}

/// The committed shadow tree of one surface.
pub struct ShadowTree {
    surface_id: SurfaceId,
    config: ReconcileConfig,
    current: Mutex<ShadowTreeRevision>,
    observers: RwLock<Vec<Arc<dyn CommitObserver>>>,
    delivery: Mutex<Delivery>,
}

impl ShadowTree {
    /// Create a tree whose revision 0 is `root`.
    ///
    /// The state held by every node of `root` is recorded as its family's
    /// most recent state.
    pub fn new(surface_id: SurfaceId, root: ShadowNode, config: ReconcileConfig) -> Self {
        let root = Arc::new(root);
        promote_committed_state(&root, None);
        debug!(surface_id, tag = root.tag(), "shadow tree created");
        Self {
            surface_id,
            config,
            current: Mutex::new(ShadowTreeRevision { root, number: 0 }),
            observers: RwLock::new(Vec::new()),
            delivery: Mutex::new(Delivery::default()),
        }
    }

    #[inline]
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    #[inline]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Commit options implied by the tree configuration.
    #[inline]
    pub fn commit_options(&self) -> CommitOptions {
        CommitOptions::from_config(&self.config)
    }

    /// The last published revision.
    pub fn current_revision(&self) -> ShadowTreeRevision {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register an observer for subsequent commits.
    pub fn add_observer(&self, observer: Arc<dyn CommitObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Run `transaction` once against the current root and try to publish
    /// its result.
    pub fn try_commit<F>(&self, transaction: F, options: CommitOptions) -> CommitStatus
    where
        F: FnOnce(&SharedShadowNode) -> Option<ShadowNode>,
    {
        match self.attempt(transaction, options) {
            Attempt::Committed(_) => CommitStatus::Succeeded,
            Attempt::Failed => CommitStatus::Failed,
            Attempt::Cancelled => CommitStatus::Cancelled,
        }
    }

    /// Run `transaction` until its result is published, retrying on top of
    /// newer revisions at most `max_commit_attempts` times.
    pub fn commit<F>(
        &self,
        transaction: F,
        options: CommitOptions,
    ) -> Result<ShadowTreeRevision, CommitError>
    where
        F: Fn(&SharedShadowNode) -> Option<ShadowNode>,
    {
        let attempts = self.config.max_commit_attempts.max(1);
        for _attempt in 1..=attempts {
            match self.attempt(&transaction, options) {
                Attempt::Committed(revision) => return Ok(revision),
                Attempt::Cancelled => return Err(CommitError::Cancelled),
                Attempt::Failed => {
                    trace!(
                        surface_id = self.surface_id,
                        attempt = _attempt,
                        "commit retry"
                    );
                }
            }
        }
        warn!(
            surface_id = self.surface_id,
            attempts, "commit abandoned under contention"
        );
        Err(CommitError::Contention { attempts })
    }

    fn attempt<F>(&self, transaction: F, options: CommitOptions) -> Attempt
    where
        F: FnOnce(&SharedShadowNode) -> Option<ShadowNode>,
    {
        let old = self.current_revision();

        let span = debug_span!(
            "shadow_tree_commit",
            surface_id = self.surface_id,
            base_revision = old.number
        );
        let _guard = span.enter();

        let Some(candidate) = transaction(&old.root) else {
            debug!("commit transaction cancelled");
            return Attempt::Cancelled;
        };
        let mut new_root = Arc::new(candidate);

        if options.enable_state_reconciliation
            && new_root.same_family(&old.root)
            && let Some(reconciled) = reconcile_state_with_tree(&new_root, &old.root)
        {
            trace!(tag = reconciled.tag(), "candidate root replaced by reconciliation");
            new_root = reconciled;
        }

        let new = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if current.number != old.number {
                debug!(
                    published = current.number,
                    "commit lost race against concurrent commit"
                );
                return Attempt::Failed;
            }
            let new = ShadowTreeRevision {
                root: new_root,
                number: old.number + 1,
            };
            *current = new.clone();
            if !Arc::ptr_eq(&new.root, &old.root) {
                promote_committed_state(&new.root, Some(&old.root));
            }
            self.delivery
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pending
                .push_back((old, new.clone()));
            new
        };

        debug!(revision = new.number, "commit published");
        self.deliver_pending();
        Attempt::Committed(new)
    }

    /// Hand queued revisions to observers in commit order, unless another
    /// thread is already doing so. Observers run without any tree lock held
    /// and may commit again.
    fn deliver_pending(&self) {
        {
            let mut delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }
        let mut guard = DrainGuard {
            delivery: &self.delivery,
            armed: true,
        };

        loop {
            let next = {
                let mut delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
                let next = delivery.pending.pop_front();
                if next.is_none() {
                    delivery.draining = false;
                    guard.armed = false;
                }
                next
            };
            let Some((old, new)) = next else {
                return;
            };

            let observers = self
                .observers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            trace!(revision = new.number, observers = observers.len(), "notifying observers");
            for observer in observers {
                observer.did_commit(&old, &new);
            }
        }
    }
}

/// Offer the state of every node of `node` to its family, skipping children
/// that are pointer-shared with `previous` (they were promoted when they were
/// first committed).
fn promote_committed_state(node: &ShadowNode, previous: Option<&ShadowNode>) {
    if let Some(state) = node.state() {
        node.family().set_most_recent_state(Arc::clone(state));
    }
    let previous_children = previous.map_or(&[][..], ShadowNode::children);
    for child in node.children() {
        if previous_children.iter().any(|old| Arc::ptr_eq(old, child)) {
            continue;
        }
        let counterpart = previous_children
            .iter()
            .find(|old| old.same_family(child))
            .map(Arc::as_ref);
        promote_committed_state(child, counterpart);
    }
}
