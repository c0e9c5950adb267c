#![forbid(unsafe_code)]

//! Versioned state containers.
//!
//! A [`State`] pairs an opaque, type-erased payload with a revision counter.
//! Revisions only move forward: the first state of a family carries
//! [`INITIAL_STATE_REVISION`] and every [`State::next`] adds one. A node that
//! holds no state reports [`NO_STATE_REVISION`], which is older than any real
//! state.
//!
//! The reconciler never looks inside the payload. Two states with equal
//! content but different revisions are different as far as reconciliation
//! is concerned.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Monotonic state version counter.
pub type StateRevision = u64;

/// Revision reported by nodes that carry no state.
pub const NO_STATE_REVISION: StateRevision = 0;

/// Revision of the first state created for a family.
pub const INITIAL_STATE_REVISION: StateRevision = 1;

/// Shared, immutable state reference as held by shadow nodes.
pub type SharedState = Arc<State>;

/// Type-erased state payload.
///
/// Cloning is cheap; the payload itself is shared.
#[derive(Clone)]
pub struct StateData(Arc<dyn Any + Send + Sync>);

impl StateData {
    /// Wrap a payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the payload as `T`, if that is its concrete type.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both handles point at the same payload allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Default for StateData {
    /// Unit payload, for states that only carry a revision.
    fn default() -> Self {
        Self::new(())
    }
}

impl fmt::Debug for StateData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateData(..)")
    }
}

/// A point-in-time version of a family's state.
#[derive(Clone)]
pub struct State {
    revision: StateRevision,
    data: StateData,
}

impl State {
    /// First state of a family.
    #[must_use]
    pub fn initial(data: StateData) -> Self {
        Self {
            revision: INITIAL_STATE_REVISION,
            data,
        }
    }

    /// Derive the next version with a new payload.
    #[must_use]
    pub fn next(&self, data: StateData) -> Self {
        Self {
            revision: self.revision + 1,
            data,
        }
    }

    #[inline]
    pub const fn revision(&self) -> StateRevision {
        self.revision
    }

    /// Borrow the payload as `T`.
    #[inline]
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    #[inline]
    pub fn raw_data(&self) -> &StateData {
        &self.data
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}
