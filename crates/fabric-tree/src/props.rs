#![forbid(unsafe_code)]

//! Opaque component props.
//!
//! Props parsing and diffing live outside the shadow tree. Here props are an
//! immutable, shared, type-erased value that nodes carry and clones forward.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, LazyLock};

static EMPTY_PROPS: LazyLock<Props> = LazyLock::new(|| Props::new(()));

/// Shared, immutable props value.
#[derive(Clone)]
pub struct Props(Arc<dyn Any + Send + Sync>);

impl Props {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Shared empty props (`()`).
    pub fn empty() -> Self {
        EMPTY_PROPS.clone()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both handles point at the same props allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Default for Props {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Props(..)")
    }
}
