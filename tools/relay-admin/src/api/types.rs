//! Wire types for the admin API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gate snapshot returned by every admin endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpStatus {
    pub mode: String,
    pub blocked_count: usize,
    pub allowed_count: usize,
    #[serde(rename = "blockedIPs")]
    pub blocked_ips: Vec<String>,
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: Vec<String>,
}

/// Response to a mutation: confirmation message plus the new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Outcome {
    pub message: String,
    #[serde(flatten)]
    pub status: IpStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IpRequest<'a> {
    pub ip: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModeRequest<'a> {
    pub mode: &'a str,
}

impl fmt::Display for IpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mode:    {}", self.mode)?;
        writeln!(f, "Blocked: {}", self.blocked_count)?;
        for ip in &self.blocked_ips {
            writeln!(f, "  - {}", ip)?;
        }
        writeln!(f, "Allowed: {}", self.allowed_count)?;
        for ip in &self.allowed_ips {
            writeln!(f, "  + {}", ip)?;
        }
        if self.mode == "whitelist" && self.allowed_ips.is_empty() {
            writeln!(f, "(allow list empty: every address is admitted)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_deserialize() {
        let outcome: Outcome = serde_json::from_str(
            r#"{"success":true,"message":"IP 1.2.3.4 has been blocked","mode":"blacklist",
                "blockedCount":1,"allowedCount":0,"blockedIPs":["1.2.3.4"],"allowedIPs":[]}"#,
        )
        .unwrap();
        assert_eq!(outcome.status.blocked_ips, vec!["1.2.3.4".to_string()]);
        assert_eq!(outcome.status.mode, "blacklist");
    }

    #[test]
    fn test_display_notes_open_whitelist() {
        let status = IpStatus {
            mode: "whitelist".to_string(),
            blocked_count: 0,
            allowed_count: 0,
            blocked_ips: vec![],
            allowed_ips: vec![],
        };
        assert!(status.to_string().contains("every address is admitted"));
    }
}
