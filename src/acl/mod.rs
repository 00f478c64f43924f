//! Access-control entries: per port, the set of CIDR ranges allowed in.
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod file;
pub mod memory;

use crate::acl_mutation_error;
use crate::error::Result;
pub use file::JsonFileAclStore;
pub use memory::InMemoryAclStore;

/// A permitted source range, e.g. `1.2.3.4/32`
#[derive(
    Clone, Debug, Default, Deserialize, Serialize, PartialEq, PartialOrd, Ord, Eq, Hash,
)]
#[serde(transparent)]
pub struct CidrRange(String);

impl CidrRange {
    pub fn new(range: impl Into<String>) -> Self {
        Self(range.into())
    }

    /// Single-host range for a member address
    pub fn from_host(host_address: &str) -> Self {
        Self(format!("{}/32", host_address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CidrRange {
    fn from(range: &str) -> Self {
        CidrRange::new(range)
    }
}

impl std::fmt::Display for CidrRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type RangeSet = BTreeSet<CidrRange>;

/// Port -> permitted ranges
pub type AclMap = BTreeMap<u16, RangeSet>;

/// External access-control backend.
///
/// Entries are keyed by a port range; this system always passes the same
/// port as both endpoints.
#[async_trait]
pub trait AclStore: Send + Sync {
    /// Every entry currently held by the backend
    async fn all_entries(&self) -> Result<AclMap>;

    /// Ranges for one port range. `None` when the backend has no entry.
    async fn list(&self, port_from: u16, port_to: u16) -> Result<Option<RangeSet>>;

    async fn add(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()>;

    async fn remove(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()>;
}

/// Local stores only model single-port entries
fn single_port(port_from: u16, port_to: u16) -> Result<u16> {
    if port_from == port_to {
        Ok(port_from)
    } else {
        Err(acl_mutation_error!(
            "port ranges are not supported ({}-{})",
            port_from,
            port_to
        ))
    }
}

/// Adds ranges, creating the entry when missing
fn apply_add(map: &mut AclMap, ranges: &RangeSet, port: u16) {
    map.entry(port).or_default().extend(ranges.iter().cloned());
}

/// Removes ranges; an entry left without ranges is dropped entirely
fn apply_remove(map: &mut AclMap, ranges: &RangeSet, port: u16) {
    if let Some(current) = map.get_mut(&port) {
        current.retain(|range| !ranges.contains(range));
        if current.is_empty() {
            map.remove(&port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(items: &[&str]) -> RangeSet {
        items.iter().map(|r| CidrRange::from(*r)).collect()
    }

    #[test]
    fn test_from_host() {
        assert_eq!(CidrRange::from_host("1.2.3.4").as_str(), "1.2.3.4/32");
    }

    #[test]
    fn test_remove_drops_empty_entry() {
        let mut map = AclMap::new();
        apply_add(&mut map, &ranges(&["1.2.3.4/32", "1.2.3.5/32"]), 7103);
        apply_remove(&mut map, &ranges(&["1.2.3.5/32"]), 7103);
        assert_eq!(map.get(&7103), Some(&ranges(&["1.2.3.4/32"])));

        apply_remove(&mut map, &ranges(&["1.2.3.4/32"]), 7103);
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_unknown_port_is_noop() {
        let mut map = AclMap::new();
        apply_remove(&mut map, &ranges(&["1.2.3.4/32"]), 7103);
        assert!(map.is_empty());
    }

    #[test]
    fn test_single_port() {
        assert_eq!(single_port(7103, 7103).unwrap(), 7103);
        assert!(single_port(7103, 7104).is_err());
    }

    #[test]
    fn test_map_json_shape() {
        let mut map = AclMap::new();
        apply_add(&mut map, &ranges(&["1.2.3.4/32"]), 7103);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"7103":["1.2.3.4/32"]}"#);
        let back: AclMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
