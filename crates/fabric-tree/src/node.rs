#![forbid(unsafe_code)]

//! Immutable shadow nodes.
//!
//! A [`ShadowNode`] never changes after construction. "Changing" a node
//! means cloning it with a [`ShadowNodeFragment`] that overrides some fields
//! and keeps the rest. Children are shared through [`Arc`], so the committed
//! tree and any candidate tree can point at the very same subtree, and a
//! clone that leaves the children alone shares the whole child list.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fabric_tree::family::{ComponentHandle, ShadowNodeFamily};
//! use fabric_tree::node::{ShadowNode, ShadowNodeFragment};
//! use fabric_tree::props::Props;
//!
//! let family = Arc::new(ShadowNodeFamily::new(1, 1, ComponentHandle::new(1), "View"));
//! let leaf = Arc::new(ShadowNode::new(family, ShadowNodeFragment::new()));
//!
//! let root_family = Arc::new(ShadowNodeFamily::new(0, 1, ComponentHandle::new(0), "Root"));
//! let root = ShadowNode::new(
//!     root_family,
//!     ShadowNodeFragment::new().with_children(vec![leaf.clone()]),
//! );
//!
//! let restyled = root.clone_with(ShadowNodeFragment::new().with_props(Props::new("dark")));
//! assert!(restyled.same_family(&root));
//! assert!(Arc::ptr_eq(&restyled.children()[0], &leaf));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::family::{ComponentHandle, FamilyId, ShadowNodeFamily, SurfaceId, Tag};
use crate::props::Props;
use crate::state::{NO_STATE_REVISION, SharedState, StateRevision};

/// Shared reference to an immutable node.
pub type SharedShadowNode = Arc<ShadowNode>;

/// Ordered child list. Order is render order.
pub type ShadowNodeList = Vec<SharedShadowNode>;

/// Shared child list as stored by nodes.
pub type SharedChildren = Arc<ShadowNodeList>;

/// Field overrides for [`ShadowNode::new`] and [`ShadowNode::clone_with`].
///
/// Every slot left unset keeps the source node's value (or the default, for
/// new nodes).
#[derive(Debug, Clone, Default)]
pub struct ShadowNodeFragment {
    props: Option<Props>,
    children: Option<SharedChildren>,
    state: Option<SharedState>,
}

impl ShadowNodeFragment {
    /// A fragment that overrides nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl Into<SharedChildren>) -> Self {
        self.children = Some(children.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = Some(state);
        self
    }
}

/// One element of a shadow tree.
pub struct ShadowNode {
    family: Arc<ShadowNodeFamily>,
    props: Props,
    children: SharedChildren,
    state: Option<SharedState>,
}

impl ShadowNode {
    /// Create the first node of `family`.
    #[must_use]
    pub fn new(family: Arc<ShadowNodeFamily>, fragment: ShadowNodeFragment) -> Self {
        Self {
            family,
            props: fragment.props.unwrap_or_default(),
            children: fragment.children.unwrap_or_default(),
            state: fragment.state,
        }
    }

    /// Clone this node, overriding the fields set in `fragment`.
    ///
    /// The clone belongs to the same family.
    #[must_use]
    pub fn clone_with(&self, fragment: ShadowNodeFragment) -> Self {
        Self {
            family: Arc::clone(&self.family),
            props: fragment.props.unwrap_or_else(|| self.props.clone()),
            children: fragment
                .children
                .unwrap_or_else(|| Arc::clone(&self.children)),
            state: fragment.state.or_else(|| self.state.clone()),
        }
    }

    #[inline]
    pub fn family(&self) -> &Arc<ShadowNodeFamily> {
        &self.family
    }

    #[inline]
    pub fn family_id(&self) -> FamilyId {
        self.family.id()
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.family.tag()
    }

    #[inline]
    pub fn surface_id(&self) -> SurfaceId {
        self.family.surface_id()
    }

    #[inline]
    pub fn component_handle(&self) -> ComponentHandle {
        self.family.component_handle()
    }

    #[inline]
    pub fn component_name(&self) -> &'static str {
        self.family.component_name()
    }

    #[inline]
    pub fn props(&self) -> &Props {
        &self.props
    }

    #[inline]
    pub fn children(&self) -> &[SharedShadowNode] {
        &self.children
    }

    /// The child list allocation, shared with clones that kept it.
    #[inline]
    pub fn shared_children(&self) -> &SharedChildren {
        &self.children
    }

    #[inline]
    pub fn state(&self) -> Option<&SharedState> {
        self.state.as_ref()
    }

    /// Revision of the state this node holds, or [`NO_STATE_REVISION`].
    #[inline]
    pub fn state_revision(&self) -> StateRevision {
        self.state
            .as_ref()
            .map_or(NO_STATE_REVISION, |state| state.revision())
    }

    /// Most recent state of this node's family.
    ///
    /// Never older than the node's own state: if the family has not
    /// recorded anything newer, the node's own state is returned.
    pub fn most_recent_state(&self) -> Option<SharedState> {
        match (self.family.most_recent_state(), &self.state) {
            (Some(recorded), Some(own)) if own.revision() > recorded.revision() => {
                Some(Arc::clone(own))
            }
            (Some(recorded), _) => Some(recorded),
            (None, own) => own.clone(),
        }
    }

    /// Whether `other` represents the same logical element.
    #[inline]
    pub fn same_family(&self, other: &ShadowNode) -> bool {
        same_family(self, other)
    }

    /// First node of `family` in this subtree, in depth-first pre-order.
    pub fn find_family(&self, family: &ShadowNodeFamily) -> Option<&ShadowNode> {
        if self.family_id() == family.id() {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_family(family))
    }

    /// Replace the first node of `family` with `f(node)` and clone only its
    /// ancestors. Returns `None` if no node of `family` is in this subtree.
    pub fn clone_tree<F>(&self, family: &ShadowNodeFamily, f: F) -> Option<ShadowNode>
    where
        F: FnOnce(&ShadowNode) -> ShadowNode,
    {
        self.clone_spine(family, f, |_| ShadowNodeFragment::new())
    }

    /// Like [`Self::clone_tree`], but every ancestor on the path is cloned
    /// with the fragment returned by `ancestor` (its children slot is always
    /// replaced with the rebuilt child list).
    pub fn clone_spine<F, A>(
        &self,
        family: &ShadowNodeFamily,
        f: F,
        ancestor: A,
    ) -> Option<ShadowNode>
    where
        F: FnOnce(&ShadowNode) -> ShadowNode,
        A: Fn(&ShadowNode) -> ShadowNodeFragment,
    {
        let mut path = Vec::new();
        if !self.path_to(family.id(), &mut path) {
            return None;
        }
        Some(self.clone_along(&path, f, &ancestor))
    }

    fn path_to(&self, family_id: FamilyId, path: &mut Vec<usize>) -> bool {
        if self.family_id() == family_id {
            return true;
        }
        for (index, child) in self.children.iter().enumerate() {
            path.push(index);
            if child.path_to(family_id, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    fn clone_along<F, A>(&self, path: &[usize], f: F, ancestor: &A) -> ShadowNode
    where
        F: FnOnce(&ShadowNode) -> ShadowNode,
        A: Fn(&ShadowNode) -> ShadowNodeFragment,
    {
        let Some((&index, rest)) = path.split_first() else {
            return f(self);
        };
        let replacement = self.children[index].clone_along(rest, f, ancestor);
        let mut children = ShadowNodeList::clone(&self.children);
        children[index] = Arc::new(replacement);
        self.clone_with(ancestor(self).with_children(children))
    }
}

impl fmt::Debug for ShadowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowNode")
            .field("tag", &self.tag())
            .field("component", &self.component_name())
            .field("family", &self.family_id())
            .field("state_revision", &self.state_revision())
            .field("children", &self.children.len())
            .finish()
    }
}

/// Whether `a` and `b` are snapshots of the same logical element.
///
/// Compares family keys, never content or pointers.
#[inline]
pub fn same_family(a: &ShadowNode, b: &ShadowNode) -> bool {
    a.family_id() == b.family_id()
}
