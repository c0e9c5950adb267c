#![forbid(unsafe_code)]

//! Native state updates.
//!
//! A state update replaces the state of one mounted element and commits the
//! result directly against the current root. Every ancestor on the path to
//! the element is stamped with a newer revision as well (a stateless ancestor
//! receives an initial unit state), so that a subtree's root revision is
//! never older than any state committed beneath it. Reconciliation relies on
//! that to skip subtrees that hold nothing newer than the candidate.

use std::fmt;
use std::sync::Arc;

use fabric_core::debug;
use fabric_tree::{
    ShadowNode, ShadowNodeFamily, ShadowNodeFragment, SharedState, State, StateData, Tag,
};

use crate::commit::CommitError;
use crate::shadow_tree::{ShadowTree, ShadowTreeRevision};

/// New state payload for one element.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    family: Arc<ShadowNodeFamily>,
    data: StateData,
}

impl StateUpdate {
    #[must_use]
    pub fn new(family: Arc<ShadowNodeFamily>, data: StateData) -> Self {
        Self { family, data }
    }

    #[inline]
    pub fn family(&self) -> &Arc<ShadowNodeFamily> {
        &self.family
    }

    #[inline]
    pub fn data(&self) -> &StateData {
        &self.data
    }
}

/// Why a state update was not committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateUpdateError {
    /// No node of the target family is in the committed tree.
    FamilyNotMounted { tag: Tag },
    /// The commit itself gave up.
    Commit(CommitError),
}

impl fmt::Display for StateUpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FamilyNotMounted { tag } => {
                write!(f, "element {tag} is not mounted in the committed tree")
            }
            Self::Commit(err) => write!(f, "state update commit failed: {err}"),
        }
    }
}

impl std::error::Error for StateUpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Commit(err) => Some(err),
            Self::FamilyNotMounted { .. } => None,
        }
    }
}

impl From<CommitError> for StateUpdateError {
    fn from(err: CommitError) -> Self {
        Self::Commit(err)
    }
}

/// State following the most recent state of `node`, carrying `data`.
fn successor(node: &ShadowNode, data: StateData) -> SharedState {
    Arc::new(match node.most_recent_state() {
        Some(current) => current.next(data),
        None => State::initial(data),
    })
}

/// Same payload, newer revision.
fn restamp(node: &ShadowNode) -> SharedState {
    match node.most_recent_state() {
        Some(current) => Arc::new(current.next(current.raw_data().clone())),
        None => Arc::new(State::initial(StateData::default())),
    }
}

impl ShadowTree {
    /// Commit `update` against the current root.
    ///
    /// Fails with [`StateUpdateError::FamilyNotMounted`] without committing
    /// when no node of the update's family is in the current tree.
    ///
    /// Retries under contention like [`ShadowTree::commit`]. Reconciliation
    /// is skipped: the transaction always builds on the newest committed
    /// tree.
    pub fn update_state(
        &self,
        update: &StateUpdate,
    ) -> Result<ShadowTreeRevision, StateUpdateError> {
        let tag = update.family.tag();
        if self
            .current_revision()
            .root
            .find_family(&update.family)
            .is_none()
        {
            debug!(tag, "state update for unmounted element dropped");
            return Err(StateUpdateError::FamilyNotMounted { tag });
        }

        let options = self.commit_options().with_state_reconciliation(false);
        let result = self.commit(
            |root| {
                root.clone_spine(
                    &update.family,
                    |node| {
                        let state = successor(node, update.data.clone());
                        debug!(tag, revision = state.revision(), "state update applied");
                        node.clone_with(ShadowNodeFragment::new().with_state(state))
                    },
                    |ancestor| ShadowNodeFragment::new().with_state(restamp(ancestor)),
                )
            },
            options,
        );
        match result {
            Ok(revision) => Ok(revision),
            // Unmounted by a concurrent commit after the check above.
            Err(CommitError::Cancelled) => {
                debug!(tag, "state update for unmounted element dropped");
                Err(StateUpdateError::FamilyNotMounted { tag })
            }
            Err(err) => Err(err.into()),
        }
    }
}
