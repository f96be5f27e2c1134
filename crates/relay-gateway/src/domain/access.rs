//! IP access policy and gate.
//!
//! Two policy modes:
//!
//! - **Blacklist** (initial): everything passes except addresses in `blocked`.
//! - **Whitelist**: only addresses in `allowed` pass. An empty `allowed` set
//!   means no restriction at all (fail-open).
//!
//! An address is never in both sets: `block` evicts from `allowed` and
//! `allow` evicts from `blocked`.
//!
//! Addresses are opaque strings compared exactly. They come from request
//! headers, so they may be anything, including the `"Unknown"` sentinel.

use crate::domain::error::AccessError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Gate policy mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Blacklist,
    Whitelist,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blacklist => "blacklist",
            Self::Whitelist => "whitelist",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = AccessError;

    /// Exact, case-sensitive match on the two literals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blacklist" => Ok(Self::Blacklist),
            "whitelist" => Ok(Self::Whitelist),
            other => Err(AccessError::InvalidMode(other.to_string())),
        }
    }
}

/// Policy state: mode plus the two disjoint address sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpPolicy {
    mode: AccessMode,
    blocked: BTreeSet<String>,
    allowed: BTreeSet<String>,
}

impl IpPolicy {
    pub fn new(mode: AccessMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_allowed(&self, addr: &str) -> bool {
        match self.mode {
            AccessMode::Whitelist => self.allowed.is_empty() || self.allowed.contains(addr),
            AccessMode::Blacklist => !self.blocked.contains(addr),
        }
    }

    pub fn block(&mut self, addr: &str) {
        self.allowed.remove(addr);
        self.blocked.insert(addr.to_string());
    }

    pub fn allow(&mut self, addr: &str) {
        self.blocked.remove(addr);
        self.allowed.insert(addr.to_string());
    }

    pub fn remove(&mut self, addr: &str) {
        self.blocked.remove(addr);
        self.allowed.remove(addr);
    }

    pub fn set_mode(&mut self, mode: AccessMode) {
        self.mode = mode;
    }

    pub fn status(&self) -> IpStatus {
        IpStatus {
            mode: self.mode,
            blocked_count: self.blocked.len(),
            allowed_count: self.allowed.len(),
            blocked_ips: self.blocked.iter().cloned().collect(),
            allowed_ips: self.allowed.iter().cloned().collect(),
        }
    }
}

/// Point-in-time snapshot of the policy, in wire shape.
///
/// Addresses are listed in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpStatus {
    pub mode: AccessMode,
    pub blocked_count: usize,
    pub allowed_count: usize,
    #[serde(rename = "blockedIPs")]
    pub blocked_ips: Vec<String>,
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: Vec<String>,
}

/// Shared, thread-safe gate over an [`IpPolicy`].
///
/// Reads take a shared lock; mutations take the write lock, so a mutation is
/// visible to every check that starts after it returns.
#[derive(Debug, Default)]
pub struct IpGate {
    policy: RwLock<IpPolicy>,
}

impl IpGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a gate from an initial policy (seeded from configuration).
    pub fn with_policy(policy: IpPolicy) -> Self {
        Self {
            policy: RwLock::new(policy),
        }
    }

    pub fn is_allowed(&self, addr: &str) -> bool {
        self.policy.read().is_allowed(addr)
    }

    /// Like [`is_allowed`](Self::is_allowed) but yields the denial as an error.
    pub fn check(&self, addr: &str) -> Result<(), AccessError> {
        if self.is_allowed(addr) {
            Ok(())
        } else {
            Err(AccessError::Denied(addr.to_string()))
        }
    }

    pub fn block(&self, addr: &str) {
        self.policy.write().block(addr);
    }

    pub fn allow(&self, addr: &str) {
        self.policy.write().allow(addr);
    }

    pub fn remove(&self, addr: &str) {
        self.policy.write().remove(addr);
    }

    pub fn set_mode(&self, mode: AccessMode) {
        self.policy.write().set_mode(mode);
    }

    /// Parse `mode` and apply it. Anything but the two literals is rejected
    /// and leaves the policy untouched.
    pub fn set_mode_str(&self, mode: &str) -> Result<AccessMode, AccessError> {
        let mode: AccessMode = mode.parse()?;
        self.set_mode(mode);
        Ok(mode)
    }

    pub fn mode(&self) -> AccessMode {
        self.policy.read().mode()
    }

    pub fn status(&self) -> IpStatus {
        self.policy.read().status()
    }
}
