#![allow(dead_code)]
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aclsync::acl::{AclMap, AclStore, CidrRange, InMemoryAclStore, RangeSet};
use aclsync::error::{Result, SyncError};
use aclsync::membership::{ClusterMember, MembershipSource};
use aclsync::ports::PortSettings;
use aclsync::reconcile::ReconciliationEngine;
use async_trait::async_trait;

pub const APP_NAME: &str = "myApp";
pub const HOST_1: &str = "1.2.3.4";
pub const HOST_2: &str = "1.2.3.5";

pub fn ranges(hosts: &[&str]) -> RangeSet {
    hosts.iter().map(|h| CidrRange::from_host(h)).collect()
}

pub fn acl_map(entries: &[(u16, &[&str])]) -> AclMap {
    entries
        .iter()
        .map(|(port, hosts)| (*port, ranges(hosts)))
        .collect()
}

/// Port configuration whose additional ports can change between passes
#[derive(Debug)]
pub struct FakePorts {
    primary: u16,
    additional: Mutex<BTreeSet<u16>>,
}

impl FakePorts {
    pub fn new(primary: u16, additional: &[u16]) -> Arc<Self> {
        Arc::new(Self {
            primary,
            additional: Mutex::new(additional.iter().copied().collect()),
        })
    }

    pub fn set_additional(&self, additional: &[u16]) {
        *self.additional.lock().unwrap() = additional.iter().copied().collect();
    }
}

impl PortSettings for FakePorts {
    fn primary_port(&self) -> u16 {
        self.primary
    }

    fn additional_ports(&self) -> BTreeSet<u16> {
        self.additional.lock().unwrap().clone()
    }
}

/// Roster double that records which app it was asked about
#[derive(Debug, Default)]
pub struct FakeMembership {
    members: Mutex<Vec<ClusterMember>>,
    unavailable: Mutex<bool>,
    pub queried_apps: Mutex<Vec<String>>,
}

impl FakeMembership {
    pub fn new(hosts: &[&str]) -> Arc<Self> {
        let membership = Self::default();
        membership.set_hosts(hosts);
        Arc::new(membership)
    }

    pub fn set_hosts(&self, hosts: &[&str]) {
        *self.members.lock().unwrap() = hosts.iter().map(|h| ClusterMember::new(*h)).collect();
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

#[async_trait]
impl MembershipSource for FakeMembership {
    async fn list(&self, app_name: &str) -> Result<Vec<ClusterMember>> {
        self.queried_apps.lock().unwrap().push(app_name.to_string());
        if *self.unavailable.lock().unwrap() {
            return Err(SyncError::MembershipUnavailable("registry down".to_string()));
        }
        Ok(self.members.lock().unwrap().clone())
    }
}

/// In-memory store that counts calls and can fail chosen operations per port
#[derive(Debug, Default)]
pub struct RecordingAclStore {
    pub inner: InMemoryAclStore,
    pub adds: AtomicUsize,
    pub removes: AtomicUsize,
    pub mutated_ports: Mutex<Vec<u16>>,
    fail_list: Mutex<HashSet<u16>>,
    fail_add: Mutex<HashSet<u16>>,
    fail_remove: Mutex<HashSet<u16>>,
    fail_all_entries: Mutex<bool>,
}

impl RecordingAclStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_entries(entries: AclMap) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryAclStore::with_entries(entries),
            ..Default::default()
        })
    }

    pub async fn snapshot(&self) -> AclMap {
        self.inner.snapshot().await
    }

    pub fn mutation_calls(&self) -> usize {
        self.adds.load(Ordering::SeqCst) + self.removes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.adds.store(0, Ordering::SeqCst);
        self.removes.store(0, Ordering::SeqCst);
        self.mutated_ports.lock().unwrap().clear();
    }

    pub fn fail_list_on(&self, port: u16) {
        self.fail_list.lock().unwrap().insert(port);
    }

    pub fn fail_add_on(&self, port: u16) {
        self.fail_add.lock().unwrap().insert(port);
    }

    pub fn fail_remove_on(&self, port: u16) {
        self.fail_remove.lock().unwrap().insert(port);
    }

    pub fn fail_all_entries(&self) {
        *self.fail_all_entries.lock().unwrap() = true;
    }

    pub fn heal(&self) {
        self.fail_list.lock().unwrap().clear();
        self.fail_add.lock().unwrap().clear();
        self.fail_remove.lock().unwrap().clear();
        *self.fail_all_entries.lock().unwrap() = false;
    }
}

#[async_trait]
impl AclStore for RecordingAclStore {
    async fn all_entries(&self) -> Result<AclMap> {
        if *self.fail_all_entries.lock().unwrap() {
            return Err(SyncError::AclRead("describe failed".to_string()));
        }
        self.inner.all_entries().await
    }

    async fn list(&self, port_from: u16, port_to: u16) -> Result<Option<RangeSet>> {
        if self.fail_list.lock().unwrap().contains(&port_from) {
            return Err(SyncError::AclRead(format!("list failed on {}", port_from)));
        }
        self.inner.list(port_from, port_to).await
    }

    async fn add(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        if self.fail_add.lock().unwrap().contains(&port_from) {
            return Err(SyncError::AclMutation(format!("add failed on {}", port_from)));
        }
        self.mutated_ports.lock().unwrap().push(port_from);
        self.inner.add(ranges, port_from, port_to).await
    }

    async fn remove(&self, ranges: &RangeSet, port_from: u16, port_to: u16) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove.lock().unwrap().contains(&port_from) {
            return Err(SyncError::AclMutation(format!("remove failed on {}", port_from)));
        }
        self.mutated_ports.lock().unwrap().push(port_from);
        self.inner.remove(ranges, port_from, port_to).await
    }
}

pub fn engine(
    ports: Arc<FakePorts>,
    membership: Arc<FakeMembership>,
    store: Arc<RecordingAclStore>,
) -> ReconciliationEngine {
    ReconciliationEngine::new(APP_NAME, ports, membership, store)
}
