#![forbid(unsafe_code)]

//! Commit options, outcomes and observers.

use std::fmt;

use fabric_core::ReconcileConfig;

use crate::shadow_tree::ShadowTreeRevision;

/// Per-commit switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOptions {
    /// Thread the most recent committed state into the candidate tree
    /// before publishing it.
    pub enable_state_reconciliation: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            enable_state_reconciliation: true,
        }
    }
}

impl CommitOptions {
    /// Options derived from the tree configuration.
    #[must_use]
    pub const fn from_config(config: &ReconcileConfig) -> Self {
        Self {
            enable_state_reconciliation: config.state_reconciliation,
        }
    }

    #[must_use]
    pub const fn with_state_reconciliation(mut self, enabled: bool) -> Self {
        self.enable_state_reconciliation = enabled;
        self
    }
}

/// Outcome of a single commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// The candidate was published as the new revision.
    Succeeded,
    /// Another commit landed while the transaction ran; nothing was published.
    Failed,
    /// The transaction declined to produce a tree.
    Cancelled,
}

impl CommitStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Why [`ShadowTree::commit`](crate::ShadowTree::commit) gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitError {
    /// The transaction declined to produce a tree.
    Cancelled,
    /// Every attempt lost the race against a concurrent commit.
    Contention {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "commit transaction cancelled"),
            Self::Contention { attempts } => {
                write!(f, "commit lost to concurrent commits {attempts} times")
            }
        }
    }
}

impl std::error::Error for CommitError {}

/// Receives every published revision, in commit order per tree.
///
/// Called after the tree lock is released, one revision at a time. The call
/// may happen on the thread of a later commit: a commit that lands while
/// observers are still busy with an earlier revision is queued and delivered
/// after it. This is where the mounting diff picks up new trees.
pub trait CommitObserver: Send + Sync {
    fn did_commit(&self, old: &ShadowTreeRevision, new: &ShadowTreeRevision);
}

impl<F> CommitObserver for F
where
    F: Fn(&ShadowTreeRevision, &ShadowTreeRevision) + Send + Sync,
{
    fn did_commit(&self, old: &ShadowTreeRevision, new: &ShadowTreeRevision) {
        self(old, new);
    }
}
