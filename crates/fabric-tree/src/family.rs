#![forbid(unsafe_code)]

//! Family identity.
//!
//! A family is the set of shadow nodes that represent one logical element
//! across any number of clones and commits. Every node holds a shared
//! reference to its [`ShadowNodeFamily`]; cloning a node copies the
//! reference, so family identity survives cloning while pointer identity of
//! the nodes does not.
//!
//! The family also owns the "most recent state" slot. Committing a tree
//! offers each node's state to its family, and reconciliation reads the slot
//! back when it rebuilds a stale spine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::state::{SharedState, StateRevision};

/// Per-family integer handle assigned by the producer of the tree.
pub type Tag = i32;

/// Identifier of the surface (root container) a tree renders into.
pub type SurfaceId = i32;

static NEXT_FAMILY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique family key, copied verbatim through every clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FamilyId(u64);

impl FamilyId {
    fn next() -> Self {
        Self(NEXT_FAMILY_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Type identity of the component a node renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentHandle(u64);

impl ComponentHandle {
    #[inline]
    pub const fn new(handle: u64) -> Self {
        Self(handle)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Identity and shared bookkeeping for one logical element.
pub struct ShadowNodeFamily {
    id: FamilyId,
    tag: Tag,
    surface_id: SurfaceId,
    component_handle: ComponentHandle,
    component_name: &'static str,
    most_recent_state: RwLock<Option<SharedState>>,
}

impl ShadowNodeFamily {
    /// Create a new family. Two families are never equal, even with
    /// identical arguments.
    #[must_use]
    pub fn new(
        tag: Tag,
        surface_id: SurfaceId,
        component_handle: ComponentHandle,
        component_name: &'static str,
    ) -> Self {
        Self {
            id: FamilyId::next(),
            tag,
            surface_id,
            component_handle,
            component_name,
            most_recent_state: RwLock::new(None),
        }
    }

    #[inline]
    pub const fn id(&self) -> FamilyId {
        self.id
    }

    #[inline]
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    #[inline]
    pub const fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    #[inline]
    pub const fn component_handle(&self) -> ComponentHandle {
        self.component_handle
    }

    #[inline]
    pub const fn component_name(&self) -> &'static str {
        self.component_name
    }

    /// Most recent committed state of this family, if any was recorded.
    pub fn most_recent_state(&self) -> Option<SharedState> {
        self.most_recent_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Revision of [`Self::most_recent_state`], if any.
    pub fn most_recent_revision(&self) -> Option<StateRevision> {
        self.most_recent_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|state| state.revision())
    }

    /// Offer `state` as the most recent state.
    ///
    /// The slot only moves forward: offers with a revision lower than or
    /// equal to the recorded one are ignored. Returns whether the slot was
    /// updated.
    pub fn set_most_recent_state(&self, state: SharedState) -> bool {
        let mut slot = self
            .most_recent_state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(current) if current.revision() >= state.revision() => false,
            _ => {
                *slot = Some(state);
                true
            }
        }
    }
}

impl fmt::Debug for ShadowNodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowNodeFamily")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("surface_id", &self.surface_id)
            .field("component", &self.component_name)
            .field("most_recent_revision", &self.most_recent_revision())
            .finish()
    }
}
