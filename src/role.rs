//! Seed / peer classification of the local node.
//!
//! Seeds are the first member of each failure domain (rack). They keep the
//! cluster-wide ACL state converged; peers only register themselves once.
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::membership::{ClusterMember, MembershipSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Seed,
    Peer,
}

impl Role {
    pub fn is_seed(&self) -> bool {
        matches!(self, Role::Seed)
    }
}

impl From<bool> for Role {
    fn from(is_seed: bool) -> Self {
        if is_seed {
            Role::Seed
        } else {
            Role::Peer
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Seed => write!(f, "seed"),
            Role::Peer => write!(f, "peer"),
        }
    }
}

#[async_trait]
pub trait RoleClassifier: Send + Sync {
    async fn is_seed(&self) -> Result<bool>;

    async fn classify(&self) -> Result<Role> {
        self.is_seed().await.map(Role::from)
    }
}

/// Role fixed by configuration
#[derive(Clone, Copy, Debug)]
pub struct StaticRole(pub Role);

#[async_trait]
impl RoleClassifier for StaticRole {
    async fn is_seed(&self) -> Result<bool> {
        Ok(self.0.is_seed())
    }
}

/// The local node is a seed iff it sorts first among the members of its rack.
/// Members are ordered by `(instance_id, host_address)`. The local rack is the
/// one the roster reports for the local address.
pub struct RackSeedClassifier {
    app_name: String,
    local: ClusterMember,
    membership: Arc<dyn MembershipSource>,
}

impl RackSeedClassifier {
    pub fn new(
        app_name: impl Into<String>,
        local: ClusterMember,
        membership: Arc<dyn MembershipSource>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            local,
            membership,
        }
    }
}

/// First member of every rack. Members without a rack share the unnamed one.
pub fn rack_seeds(members: &[ClusterMember]) -> BTreeMap<Option<String>, &ClusterMember> {
    let mut seeds: BTreeMap<Option<String>, &ClusterMember> = BTreeMap::new();
    for member in members {
        let key = (&member.instance_id, &member.host_address);
        seeds
            .entry(member.rack.clone())
            .and_modify(|current| {
                if key < (&current.instance_id, &current.host_address) {
                    *current = member;
                }
            })
            .or_insert(member);
    }
    seeds
}

#[async_trait]
impl RoleClassifier for RackSeedClassifier {
    async fn is_seed(&self) -> Result<bool> {
        let members = self.membership.list(&self.app_name).await?;
        let local = members
            .iter()
            .find(|m| m.host_address == self.local.host_address)
            .ok_or_else(|| {
                SyncError::Role(format!(
                    "local address {} is not a member of {}",
                    self.local.host_address, self.app_name
                ))
            })?;

        // racks are grouped as the roster reports them
        if self.local.rack.is_some() && self.local.rack != local.rack {
            warn!(
                "[{}] configured rack {:?} differs from roster rack {:?}, using the roster",
                self.app_name, self.local.rack, local.rack
            );
        }

        let seeds = rack_seeds(&members);
        let is_seed = seeds
            .get(&local.rack)
            .is_some_and(|seed| seed.host_address == local.host_address);
        debug!(
            "[{}] {} rack(s), local rack {:?}, seed: {}",
            self.app_name,
            seeds.len(),
            local.rack,
            is_seed
        );
        Ok(is_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::StaticMembership;

    fn roster() -> Vec<ClusterMember> {
        vec![
            ClusterMember::new("10.0.0.2").with_rack("a").with_instance_id("i-2"),
            ClusterMember::new("10.0.0.1").with_rack("a").with_instance_id("i-1"),
            ClusterMember::new("10.0.1.5").with_rack("b").with_instance_id("i-5"),
        ]
    }

    fn classifier(local: &str, rack: &str) -> RackSeedClassifier {
        RackSeedClassifier::new(
            "app",
            ClusterMember::new(local).with_rack(rack),
            Arc::new(StaticMembership::new(roster())),
        )
    }

    #[test]
    fn test_rack_seeds_picks_first_per_rack() {
        let members = roster();
        let seeds = rack_seeds(&members);
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[&Some("a".to_string())].host_address, "10.0.0.1");
        assert_eq!(seeds[&Some("b".to_string())].host_address, "10.0.1.5");
    }

    #[tokio::test]
    async fn test_first_in_rack_is_seed() {
        assert_eq!(classifier("10.0.0.1", "a").classify().await.unwrap(), Role::Seed);
        assert_eq!(classifier("10.0.1.5", "b").classify().await.unwrap(), Role::Seed);
        assert_eq!(classifier("10.0.0.2", "a").classify().await.unwrap(), Role::Peer);
    }

    #[tokio::test]
    async fn test_roster_rack_wins_over_configured_rack() {
        // 10.0.1.5 is alone in rack b, whatever this node was told
        assert_eq!(classifier("10.0.1.5", "a").classify().await.unwrap(), Role::Seed);
        // 10.0.0.2 sorts after 10.0.0.1 in rack a
        assert_eq!(classifier("10.0.0.2", "b").classify().await.unwrap(), Role::Peer);

        let unconfigured = RackSeedClassifier::new(
            "app",
            ClusterMember::new("10.0.0.1"),
            Arc::new(StaticMembership::new(roster())),
        );
        assert_eq!(unconfigured.classify().await.unwrap(), Role::Seed);
    }

    #[tokio::test]
    async fn test_unknown_local_node_is_error() {
        let err = classifier("10.9.9.9", "a").is_seed().await.unwrap_err();
        assert!(matches!(err, SyncError::Role(_)));
    }

    #[tokio::test]
    async fn test_static_role() {
        assert!(StaticRole(Role::Seed).is_seed().await.unwrap());
        assert_eq!(StaticRole(Role::Peer).classify().await.unwrap(), Role::Peer);
    }
}
