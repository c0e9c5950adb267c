#![forbid(unsafe_code)]

//! Fabric shadow tree public facade crate.
//!
//! Re-exports the node model, the reconciler and the commit pipeline from
//! the internal crates, and offers a small prelude.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use fabric_core::ReconcileConfig;

// --- Tree re-exports -------------------------------------------------------

pub use fabric_tree::{
    ComponentHandle, FamilyId, INITIAL_STATE_REVISION, NO_STATE_REVISION, Props, ShadowNode,
    ShadowNodeFamily, ShadowNodeFragment, ShadowNodeList, SharedShadowNode, SharedState, State,
    StateData, StateRevision, SurfaceId, Tag, reconcile_state_with_children,
    reconcile_state_with_tree, same_family,
};

// --- Runtime re-exports ----------------------------------------------------

pub use fabric_runtime::{
    CommitError, CommitObserver, CommitOptions, CommitStatus, RevisionNumber, ShadowTree,
    ShadowTreeRevision, StateUpdate, StateUpdateError,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for Fabric callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A commit was cancelled or lost to contention.
    Commit(CommitError),
    /// A native state update could not be committed.
    StateUpdate(StateUpdateError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(err) => write!(f, "{err}"),
            Self::StateUpdate(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Commit(err) => Some(err),
            Self::StateUpdate(err) => Some(err),
        }
    }
}

impl From<CommitError> for Error {
    fn from(err: CommitError) -> Self {
        Self::Commit(err)
    }
}

impl From<StateUpdateError> for Error {
    fn from(err: StateUpdateError) -> Self {
        Self::StateUpdate(err)
    }
}

/// Standard result type for Fabric APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CommitOptions, Error, Props, ReconcileConfig, Result, ShadowNode, ShadowNodeFamily,
        ShadowNodeFragment, ShadowTree, SharedShadowNode, State, StateData, StateUpdate,
    };

    pub use crate::{core, runtime, tree};
}

pub use fabric_core as core;
pub use fabric_runtime as runtime;
pub use fabric_tree as tree;
