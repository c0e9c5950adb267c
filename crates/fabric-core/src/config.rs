#![forbid(unsafe_code)]

//! Reconciliation and commit configuration.
//!
//! Defaults are suitable for production. Both knobs can be overridden from
//! the environment, which is mostly useful when bisecting rendering glitches:
//!
//! - `FABRIC_STATE_RECONCILIATION` (`1/0/true/false/yes/no/on/off`) toggles
//!   whether commits thread the most recent state into stale candidate trees.
//! - `FABRIC_COMMIT_MAX_ATTEMPTS` (positive integer) bounds the commit retry
//!   loop when several producers race on the same tree.
//!
//! Invalid values are ignored and the default is kept.

/// Environment variable toggling state reconciliation on commit.
pub const ENV_STATE_RECONCILIATION: &str = "FABRIC_STATE_RECONCILIATION";
/// Environment variable bounding commit retries under contention.
pub const ENV_COMMIT_MAX_ATTEMPTS: &str = "FABRIC_COMMIT_MAX_ATTEMPTS";

/// Default bound on commit attempts before reporting contention.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 64;

/// Configuration consumed by the commit runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Run state reconciliation on commits unless the caller opts out.
    pub state_reconciliation: bool,
    /// Maximum number of `try_commit` attempts per `commit` call. Never zero.
    pub max_commit_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            state_reconciliation: true,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}

impl ReconcileConfig {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read overrides using a custom environment lookup (for tests).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(enabled) = get_env(ENV_STATE_RECONCILIATION).and_then(|v| parse_bool(&v)) {
            config.state_reconciliation = enabled;
        }
        if let Some(attempts) = get_env(ENV_COMMIT_MAX_ATTEMPTS).and_then(|v| parse_attempts(&v)) {
            config.max_commit_attempts = attempts;
        }
        config
    }

    /// Set whether commits reconcile state by default.
    #[must_use]
    pub const fn with_state_reconciliation(mut self, enabled: bool) -> Self {
        self.state_reconciliation = enabled;
        self
    }

    /// Set the commit attempt bound. Zero is clamped to one.
    #[must_use]
    pub const fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_attempts(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|&n| n > 0)
}
