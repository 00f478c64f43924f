//! Reconciliation of ACL state against cluster membership.
//!
//! Every pass is computed from scratch: the roster and the ACL backend are
//! read, per-port diffs are derived and applied. Nothing is remembered
//! between passes, so a pass interrupted halfway is finished by the next one
//! and manual edits to the backend are undone.
//!
//! Callers must not run two passes of the same engine concurrently; the
//! scheduling job guarantees this by being the only caller.
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

pub mod diff;

use crate::acl::{AclStore, RangeSet};
use crate::error::{PassFailure, PassStage, Result, SyncError};
use crate::membership::MembershipSource;
use crate::ports::{self, PortSet, PortSettings};
pub use diff::{DesiredRangeSet, PortDiff};

/// Work done and failures seen during a single pass
#[derive(Debug, Default)]
struct PassOutcome {
    mutation_occurred: bool,
    failures: Vec<PassFailure>,
}

impl PassOutcome {
    fn fail(&mut self, port: Option<u16>, stage: PassStage, err: &SyncError) {
        warn!("ACL {} failed for port {:?}: {}", stage, port, err);
        self.failures.push(PassFailure::new(port, stage, err));
    }

    fn into_result(self) -> Result<bool> {
        if self.failures.is_empty() {
            Ok(self.mutation_occurred)
        } else {
            Err(SyncError::PassIncomplete {
                mutation_occurred: self.mutation_occurred,
                failures: self.failures,
            })
        }
    }
}

pub struct ReconciliationEngine {
    app_name: String,
    ports: Arc<dyn PortSettings>,
    membership: Arc<dyn MembershipSource>,
    acls: Arc<dyn AclStore>,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("app_name", &self.app_name)
            .field("primary_port", &self.ports.primary_port())
            .finish()
    }
}

impl ReconciliationEngine {
    pub fn new(
        app_name: impl Into<String>,
        ports: Arc<dyn PortSettings>,
        membership: Arc<dyn MembershipSource>,
        acls: Arc<dyn AclStore>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            ports,
            membership,
            acls,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Runs one full pass. Returns whether any add or remove was issued.
    ///
    /// A membership failure aborts the pass before any ACL is touched.
    /// Backend failures on individual ports do not stop the other ports;
    /// they are collected into `SyncError::PassIncomplete`.
    #[instrument(skip(self), fields(app = %self.app_name))]
    pub async fn execute(&self) -> Result<bool> {
        let ports = ports::resolve(self.ports.as_ref());
        let members = self.membership.list(&self.app_name).await?;
        let desired = DesiredRangeSet::from_members(&members)?;
        debug!(
            "Reconciling ports {} for {} member(s) ({} range(s))",
            ports,
            members.len(),
            desired.len()
        );

        let mut outcome = PassOutcome::default();
        self.prune_orphan_ports(&ports, &mut outcome).await;
        for port in ports.iter() {
            self.reconcile_port(port, &desired, &mut outcome).await;
        }

        info!(
            "Reconciliation pass finished: mutated={}, failures={}",
            outcome.mutation_occurred,
            outcome.failures.len()
        );
        outcome.into_result()
    }

    /// Drops entries for ports no longer configured, empty ones included
    async fn prune_orphan_ports(&self, ports: &PortSet, outcome: &mut PassOutcome) {
        let current = match self.acls.all_entries().await {
            Ok(current) => current,
            Err(err) => {
                outcome.fail(None, PassStage::Prune, &err);
                return;
            }
        };

        for (port, ranges) in current.iter().filter(|(port, _)| !ports.contains(**port)) {
            info!("Removing orphaned port {} ({} range(s))", port, ranges.len());
            match self.acls.remove(ranges, *port, *port).await {
                Ok(()) => outcome.mutation_occurred = true,
                Err(err) => outcome.fail(Some(*port), PassStage::Prune, &err),
            }
        }
    }

    async fn reconcile_port(&self, port: u16, desired: &DesiredRangeSet, outcome: &mut PassOutcome) {
        let current: RangeSet = match self.acls.list(port, port).await {
            Ok(ranges) => ranges.unwrap_or_default(),
            Err(err) => {
                outcome.fail(Some(port), PassStage::Read, &err);
                return;
            }
        };

        let diff = PortDiff::compute(desired, &current);
        if diff.is_empty() {
            debug!("Port {} already converged", port);
            return;
        }

        if !diff.to_add.is_empty() {
            info!("Adding {} range(s) to port {}", diff.to_add.len(), port);
            match self.acls.add(&diff.to_add, port, port).await {
                Ok(()) => outcome.mutation_occurred = true,
                Err(err) => outcome.fail(Some(port), PassStage::Add, &err),
            }
        }

        if !diff.to_remove.is_empty() {
            info!("Removing {} range(s) from port {}", diff.to_remove.len(), port);
            match self.acls.remove(&diff.to_remove, port, port).await {
                Ok(()) => outcome.mutation_occurred = true,
                Err(err) => outcome.fail(Some(port), PassStage::Remove, &err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::acl::{AclMap, CidrRange, InMemoryAclStore};
    use crate::membership::{ClusterMember, StaticMembership};

    struct Ports(u16, Vec<u16>);

    impl PortSettings for Ports {
        fn primary_port(&self) -> u16 {
            self.0
        }
        fn additional_ports(&self) -> BTreeSet<u16> {
            self.1.iter().copied().collect()
        }
    }

    fn engine(hosts: &[&str], store: &InMemoryAclStore) -> ReconciliationEngine {
        ReconciliationEngine::new(
            "myApp",
            Arc::new(Ports(7103, vec![])),
            Arc::new(StaticMembership::new(
                hosts.iter().map(|h| ClusterMember::new(*h)).collect(),
            )),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_first_pass_mutates_second_does_not() {
        let store = InMemoryAclStore::new();
        let engine = engine(&["1.2.3.4", "1.2.3.5"], &store);

        assert!(engine.execute().await.unwrap());
        assert!(!engine.execute().await.unwrap());
        assert_eq!(store.snapshot().await[&7103].len(), 2);
    }

    #[tokio::test]
    async fn test_empty_roster_touches_nothing() {
        let mut initial = AclMap::new();
        initial.insert(7103, [CidrRange::from_host("1.2.3.4")].into_iter().collect());
        let store = InMemoryAclStore::with_entries(initial.clone());

        let err = engine(&[], &store).execute().await.unwrap_err();
        assert!(matches!(err, SyncError::MembershipUnavailable(_)));
        assert_eq!(store.snapshot().await, initial);
    }
}
