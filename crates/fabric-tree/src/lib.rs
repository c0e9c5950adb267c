#![forbid(unsafe_code)]

//! Shadow tree kernel: immutable nodes, versioned state, family identity and
//! state reconciliation.
//!
//! # Role in Fabric
//! `fabric-tree` owns the data model of the shadow tree and the
//! reconciliation pass that keeps a candidate tree consistent with state that
//! was committed while the candidate was being built. It performs no I/O and
//! spawns no work; the commit pipeline in `fabric-runtime` drives it.
//!
//! # Primary responsibilities
//! - **ShadowNode**: immutable node with fragment-based cloning.
//! - **State**: opaque payload plus monotonic revision.
//! - **ShadowNodeFamily**: identity across clones and the most-recent-state slot.
//! - **Reconciliation**: revision-gated, family-matched spine cloning.

pub mod family;
pub mod node;
pub mod props;
pub mod reconcile;
pub mod state;

pub use family::{ComponentHandle, FamilyId, ShadowNodeFamily, SurfaceId, Tag};
pub use node::{
    ShadowNode, ShadowNodeFragment, ShadowNodeList, SharedChildren, SharedShadowNode, same_family,
};
pub use props::Props;
pub use reconcile::{
    ChangedPair, ChangedPairs, reconcile_state_with_children, reconcile_state_with_tree,
};
pub use state::{
    INITIAL_STATE_REVISION, NO_STATE_REVISION, SharedState, State, StateData, StateRevision,
};
