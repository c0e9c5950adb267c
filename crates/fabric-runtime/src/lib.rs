#![forbid(unsafe_code)]

//! Commit pipeline for Fabric shadow trees.
//!
//! # Role in Fabric
//! `fabric-runtime` owns the committed tree of each surface. It runs commit
//! transactions, reconciles candidate trees with committed state, publishes
//! revisions, and applies native state updates.
//!
//! # Primary responsibilities
//! - **ShadowTree**: optimistic commit loop with bounded retries.
//! - **Reconciliation**: candidate trees pick up state committed meanwhile.
//! - **State updates**: spine cloning with ancestor revision stamping.
//! - **Observers**: notification of every published revision.

pub mod commit;
pub mod shadow_tree;
pub mod state_update;

pub use commit::{CommitError, CommitObserver, CommitOptions, CommitStatus};
pub use shadow_tree::{RevisionNumber, ShadowTree, ShadowTreeRevision};
pub use state_update::{StateUpdate, StateUpdateError};
