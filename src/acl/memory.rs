use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{apply_add, apply_remove, single_port, AclMap, AclStore, RangeSet};
use crate::error::Result;

/// Process-local ACL table. Used for dry runs and as the reference backend in tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAclStore {
    entries: Arc<RwLock<AclMap>>,
}

impl InMemoryAclStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: AclMap) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub async fn snapshot(&self) -> AclMap {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AclStore for InMemoryAclStore {
    async fn all_entries(&self) -> Result<AclMap> {
        Ok(self.snapshot().await)
    }

    async fn list(&self, port_from: u16, port_to: u16) -> Result<Option<RangeSet>> {
        let port = single_port(port_from, port_to)?;
        Ok(self.entries.read().await.get(&port).cloned())
    }

    async fn add(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()> {
        let port = single_port(port_from, port_to)?;
        let mut entries = self.entries.write().await;
        apply_add(&mut entries, ranges, port);
        debug!("Added {} range(s) to port {}", ranges.len(), port);
        Ok(())
    }

    async fn remove(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()> {
        let port = single_port(port_from, port_to)?;
        let mut entries = self.entries.write().await;
        apply_remove(&mut entries, ranges, port);
        debug!("Removed {} range(s) from port {}", ranges.len(), port);
        Ok(())
    }
}
