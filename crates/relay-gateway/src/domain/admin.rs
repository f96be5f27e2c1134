//! Admin control surface over the IP gate.
//!
//! Every operation authorizes the presented key first. A failed check
//! returns [`AccessError::Unauthorized`] and touches nothing.

use crate::domain::access::{AccessMode, IpGate, IpStatus};
use crate::domain::error::AccessError;
use crate::domain::secret::SharedSecret;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful admin mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminOutcome {
    pub message: String,
    pub status: IpStatus,
}

pub struct AdminControl {
    gate: Arc<IpGate>,
    secret: SharedSecret,
}

impl AdminControl {
    pub fn new(gate: Arc<IpGate>, secret: SharedSecret) -> Self {
        Self { gate, secret }
    }

    /// Exact match against the admin secret. Always false when none is configured.
    pub fn authorize(&self, presented_key: Option<&str>) -> bool {
        self.secret.verify(presented_key)
    }

    fn require(&self, presented_key: Option<&str>, op: &'static str) -> Result<(), AccessError> {
        if self.authorize(presented_key) {
            Ok(())
        } else {
            warn!(op, "Admin request rejected: bad or missing key");
            Err(AccessError::Unauthorized)
        }
    }

    pub fn status(&self, presented_key: Option<&str>) -> Result<IpStatus, AccessError> {
        self.require(presented_key, "status")?;
        Ok(self.gate.status())
    }

    pub fn block(&self, presented_key: Option<&str>, ip: &str) -> Result<AdminOutcome, AccessError> {
        self.require(presented_key, "block")?;
        let ip = required_address(ip)?;
        self.gate.block(ip);
        info!(ip, "IP blocked");
        Ok(self.outcome(format!("IP {ip} has been blocked")))
    }

    pub fn allow(&self, presented_key: Option<&str>, ip: &str) -> Result<AdminOutcome, AccessError> {
        self.require(presented_key, "allow")?;
        let ip = required_address(ip)?;
        self.gate.allow(ip);
        info!(ip, "IP allowed");
        Ok(self.outcome(format!("IP {ip} has been allowed")))
    }

    pub fn remove(&self, presented_key: Option<&str>, ip: &str) -> Result<AdminOutcome, AccessError> {
        self.require(presented_key, "remove")?;
        let ip = required_address(ip)?;
        self.gate.remove(ip);
        info!(ip, "IP removed from access lists");
        Ok(self.outcome(format!("IP {ip} has been removed from all lists")))
    }

    pub fn set_mode(
        &self,
        presented_key: Option<&str>,
        mode: &str,
    ) -> Result<AdminOutcome, AccessError> {
        self.require(presented_key, "set_mode")?;
        let mode: AccessMode = self.gate.set_mode_str(mode.trim())?;
        info!(%mode, "Access mode changed");
        Ok(self.outcome(format!("Access mode set to {mode}")))
    }

    fn outcome(&self, message: String) -> AdminOutcome {
        AdminOutcome {
            message,
            status: self.gate.status(),
        }
    }
}

fn required_address(ip: &str) -> Result<&str, AccessError> {
    let ip = ip.trim();
    if ip.is_empty() {
        Err(AccessError::MissingAddress)
    } else {
        Ok(ip)
    }
}
