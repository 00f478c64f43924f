//! Cluster membership: who is allowed to reach the managed ports.
//!
//! The roster is read fresh at the start of every reconciliation pass and is
//! never cached between passes.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;
pub mod static_roster;

use crate::error::Result;
pub use http::HttpMembership;
pub use static_roster::StaticMembership;

/// One cluster node as reported by the membership backend
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct ClusterMember {
    pub host_address: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    /// Failure domain (rack / availability zone)
    #[serde(default)]
    pub rack: Option<String>,
}

impl ClusterMember {
    pub fn new(host_address: impl Into<String>) -> Self {
        Self {
            host_address: host_address.into(),
            ..Default::default()
        }
    }

    pub fn with_rack(mut self, rack: impl Into<String>) -> Self {
        self.rack = Some(rack.into());
        self
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }
}

/// Parses `host[@rack]`
impl std::str::FromStr for ClusterMember {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (host, rack) = match s.split_once('@') {
            Some((host, rack)) => (host.trim(), Some(rack.trim())),
            None => (s, None),
        };
        if host.is_empty() {
            return Err(format!("Invalid member: '{}'", s));
        }
        let member = ClusterMember::new(host);
        match rack {
            Some(rack) if !rack.is_empty() => Ok(member.with_rack(rack)),
            Some(_) => Err(format!("Invalid member rack: '{}'", s)),
            None => Ok(member),
        }
    }
}

impl std::fmt::Display for ClusterMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.rack {
            Some(rack) => write!(f, "{}@{}", self.host_address, rack),
            None => write!(f, "{}", self.host_address),
        }
    }
}

/// Lists the current members of an application / cluster.
///
/// Implementations return `SyncError::MembershipUnavailable` when the backend
/// cannot be reached. The engine never catches that error.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn list(&self, app_name: &str) -> Result<Vec<ClusterMember>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member() {
        let member: ClusterMember = "10.0.0.1@us-east-1a".parse().unwrap();
        assert_eq!(member.host_address, "10.0.0.1");
        assert_eq!(member.rack.as_deref(), Some("us-east-1a"));
        assert_eq!(member.to_string(), "10.0.0.1@us-east-1a");

        let member: ClusterMember = " 10.0.0.2 ".parse().unwrap();
        assert_eq!(member.host_address, "10.0.0.2");
        assert_eq!(member.rack, None);
    }

    #[test]
    fn test_parse_member_rejects_empty_parts() {
        assert!("".parse::<ClusterMember>().is_err());
        assert!("@rack".parse::<ClusterMember>().is_err());
        assert!("10.0.0.1@".parse::<ClusterMember>().is_err());
    }

    #[test]
    fn test_deserialize_minimal_member() {
        let member: ClusterMember =
            serde_json::from_str(r#"{"host_address": "1.2.3.4"}"#).unwrap();
        assert_eq!(member, ClusterMember::new("1.2.3.4"));
    }
}
