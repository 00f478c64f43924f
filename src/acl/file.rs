//! ACL entries persisted as a JSON document: `{ "<port>": ["cidr", ...] }`.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{apply_add, apply_remove, single_port, AclMap, AclStore, RangeSet};
use crate::acl_read_error;
use crate::error::{Result, SyncError};

#[derive(Debug)]
pub struct JsonFileAclStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileAclStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Using ACL file {}", path.display());
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<AclMap> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(AclMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| acl_read_error!("{}: {}", self.path.display(), err)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(AclMap::new()),
            Err(err) => Err(acl_read_error!("{}: {}", self.path.display(), err)),
        }
    }

    /// Write to a sibling temp file then rename over the original
    async fn save(&self, entries: &AclMap) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Persisted {} ACL entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    async fn mutate<F>(&self, port_from: u16, port_to: u16, f: F) -> Result<()>
    where
        F: FnOnce(&mut AclMap, u16) + Send,
    {
        let port = single_port(port_from, port_to)?;
        let _guard = self.lock.lock().await;
        let mut entries = self
            .load()
            .await
            .map_err(|err| SyncError::AclMutation(err.to_string()))?;
        f(&mut entries, port);
        self.save(&entries)
            .await
            .map_err(|err| SyncError::AclMutation(err.to_string()))
    }
}

#[async_trait]
impl AclStore for JsonFileAclStore {
    async fn all_entries(&self) -> Result<AclMap> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn list(&self, port_from: u16, port_to: u16) -> Result<Option<RangeSet>> {
        let port = single_port(port_from, port_to)?;
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(&port))
    }

    async fn add(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()> {
        self.mutate(port_from, port_to, |entries, port| apply_add(entries, ranges, port))
            .await
    }

    async fn remove(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()> {
        self.mutate(port_from, port_to, |entries, port| {
            apply_remove(entries, ranges, port)
        })
        .await
    }
}
