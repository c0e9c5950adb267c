#![forbid(unsafe_code)]

//! State reconciliation between a candidate tree and the committed tree.
//!
//! A candidate tree is built from some earlier snapshot of the committed
//! tree. By the time it is committed, state updates may have landed on the
//! committed side. Reconciliation threads that newer state into the
//! candidate while cloning as little as possible.
//!
//! # Algorithm
//!
//! For a candidate node `new` and its committed counterpart `old` (same
//! family):
//!
//! 1. If `old.state_revision() <= new.state_revision()` the whole subtree is
//!    considered up to date and nothing below it is visited.
//! 2. Otherwise each child of `new` is matched against the children of
//!    `old` by family (linear scan, first match wins) and reconciled
//!    recursively. Children without a counterpart are new insertions and are
//!    left alone; children only present in `old` are ignored.
//! 3. `new` is cloned with its changed children swapped in and its state set
//!    to the family's most recent state. Unchanged children keep their
//!    pointer identity, so only the spine leading to stale nodes is copied.
//!
//! Order changes alone never trigger a clone. Structural differences are the
//! business of the mounting diff, not of this pass.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use fabric_tree::family::{ComponentHandle, ShadowNodeFamily};
//! use fabric_tree::node::{ShadowNode, ShadowNodeFragment};
//! use fabric_tree::reconcile::reconcile_state_with_tree;
//! use fabric_tree::state::{State, StateData};
//!
//! let family = Arc::new(ShadowNodeFamily::new(1, 1, ComponentHandle::new(1), "TextInput"));
//! let first = Arc::new(State::initial(StateData::new("")));
//! let candidate =
//!     ShadowNode::new(family.clone(), ShadowNodeFragment::new().with_state(first.clone()));
//!
//! // A state update commits while the candidate is being built.
//! let newer = Arc::new(first.next(StateData::new("h")));
//! family.set_most_recent_state(newer.clone());
//! let committed = candidate.clone_with(ShadowNodeFragment::new().with_state(newer.clone()));
//!
//! let reconciled = reconcile_state_with_tree(&candidate, &committed).expect("candidate is stale");
//! assert!(Arc::ptr_eq(reconciled.state().unwrap(), &newer));
//!
//! // Up-to-date candidates are committed as-is.
//! assert!(reconcile_state_with_tree(&committed, &committed).is_none());
//! ```

use std::sync::Arc;

use smallvec::SmallVec;

use crate::node::{ShadowNode, ShadowNodeFragment, ShadowNodeList, SharedShadowNode};

/// A candidate child and the clone that replaces it.
#[derive(Debug, Clone)]
pub struct ChangedPair<'a> {
    /// The child as it appears in the candidate list.
    pub original: &'a SharedShadowNode,
    /// Its reconciled replacement.
    pub replacement: SharedShadowNode,
}

/// Changed children in candidate order. Usually only a handful of siblings
/// change in one commit.
pub type ChangedPairs<'a> = SmallVec<[ChangedPair<'a>; 4]>;

/// Reconcile a candidate subtree against its committed counterpart.
///
/// Returns `None` when `new_node` can be committed unchanged, or the
/// replacement node otherwise.
///
/// # Panics
///
/// Debug-asserts that both nodes belong to the same family.
pub fn reconcile_state_with_tree(
    new_node: &ShadowNode,
    committed_node: &ShadowNode,
) -> Option<SharedShadowNode> {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!(
        "reconcile_state_with_tree",
        tag = new_node.tag(),
        new_revision = new_node.state_revision(),
        committed_revision = committed_node.state_revision()
    );
    #[cfg(feature = "tracing")]
    let _guard = _span.enter();

    let reconciled = reconcile_node(new_node, committed_node);

    #[cfg(feature = "tracing")]
    tracing::trace!(cloned = reconciled.is_some(), "state reconciliation finished");

    reconciled
}

/// Pair candidate children with committed children by family and reconcile
/// each pair.
///
/// Only pairs whose candidate child needed a clone are returned, in
/// candidate order.
pub fn reconcile_state_with_children<'a>(
    new_children: &'a [SharedShadowNode],
    old_children: &[SharedShadowNode],
) -> ChangedPairs<'a> {
    let mut changed = ChangedPairs::new();
    for new_child in new_children {
        let Some(old_child) = old_children
            .iter()
            .find(|old_child| new_child.same_family(old_child))
        else {
            continue;
        };
        if let Some(replacement) = reconcile_node(new_child, old_child) {
            changed.push(ChangedPair {
                original: new_child,
                replacement,
            });
        }
    }
    changed
}

fn reconcile_node(new_node: &ShadowNode, committed_node: &ShadowNode) -> Option<SharedShadowNode> {
    debug_assert!(
        new_node.same_family(committed_node),
        "state reconciliation paired nodes of different families (tags {} and {})",
        new_node.tag(),
        committed_node.tag()
    );

    let committed_revision = committed_node.state_revision();
    if committed_revision <= new_node.state_revision() {
        return None;
    }

    let changed = reconcile_state_with_children(new_node.children(), committed_node.children());

    let mut fragment = ShadowNodeFragment::new();
    if !changed.is_empty() {
        fragment = fragment.with_children(splice_children(new_node.children(), &changed));
    }
    if let Some(state) = new_node.most_recent_state() {
        fragment = fragment.with_state(state);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(
        tag = new_node.tag(),
        new_revision = new_node.state_revision(),
        committed_revision,
        changed_children = changed.len(),
        "cloning stale node"
    );

    Some(Arc::new(new_node.clone_with(fragment)))
}

/// `children` with every entry that is pointer-equal to a pair's original
/// replaced by that pair's replacement.
fn splice_children(children: &[SharedShadowNode], changed: &[ChangedPair<'_>]) -> ShadowNodeList {
    children
        .iter()
        .map(|child| {
            changed
                .iter()
                .find(|pair| Arc::ptr_eq(pair.original, child))
                .map_or_else(|| Arc::clone(child), |pair| Arc::clone(&pair.replacement))
        })
        .collect()
}
