use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ClusterMember, MembershipSource};
use crate::error::Result;

/// Roster fixed by configuration. Operators can replace it at runtime.
#[derive(Clone, Debug, Default)]
pub struct StaticMembership {
    members: Arc<RwLock<Vec<ClusterMember>>>,
}

impl StaticMembership {
    pub fn new(members: Vec<ClusterMember>) -> Self {
        Self {
            members: Arc::new(RwLock::new(members)),
        }
    }

    pub async fn set_members(&self, members: Vec<ClusterMember>) {
        let mut guard = self.members.write().await;
        *guard = members;
    }
}

#[async_trait]
impl MembershipSource for StaticMembership {
    async fn list(&self, app_name: &str) -> Result<Vec<ClusterMember>> {
        let members = self.members.read().await.clone();
        debug!("[{}] static roster has {} members", app_name, members.len());
        Ok(members)
    }
}
