//! The `Update_SG` job: drives the reconciliation engine on its schedule.
//!
//! The job loop is the only caller of `ReconciliationEngine::execute`, so at
//! most one pass runs at a time on a node. Manual passes requested through a
//! [`JobHandle`] are queued into the same loop.
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tracing::{error, info, warn};

use crate::error::{Result, SyncError};
use crate::membership::ClusterMember;
use crate::reconcile::ReconciliationEngine;
use crate::role::{Role, RoleClassifier};
use crate::schedule::{ScheduleSelector, ScheduleSpec};
use crate::settings::JOB_NAME;

const TRIGGER_QUEUE_SIZE: usize = 8;

/// Job statistics exposed through the admin API
#[derive(Clone, Debug, Default, Serialize)]
pub struct JobStats {
    pub job_name: &'static str,
    pub executions: u64,
    pub failures: u64,
    pub mutating_passes: u64,
    /// When a pass first changed the ACL backend since process start
    pub first_mutation_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_mutation_occurred: Option<bool>,
    pub last_error: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
}

type Trigger = oneshot::Sender<Result<bool>>;

/// Cloneable handle used by the API and by `main` to talk to a running job
#[derive(Clone, Debug)]
pub struct JobHandle {
    triggers: mpsc::Sender<Trigger>,
    stats: Arc<RwLock<JobStats>>,
    schedule: ScheduleSpec,
    role: Role,
    shutdown: Arc<watch::Sender<bool>>,
}

impl JobHandle {
    /// Queue a pass and wait for its result
    pub async fn trigger(&self) -> Result<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.triggers
            .send(reply_tx)
            .await
            .map_err(|_| SyncError::Job(format!("{} is not running", JOB_NAME)))?;
        reply_rx
            .await
            .map_err(|_| SyncError::Job(format!("{} dropped the request", JOB_NAME)))?
    }

    pub async fn stats(&self) -> JobStats {
        self.stats.read().await.clone()
    }

    pub fn schedule(&self) -> ScheduleSpec {
        self.schedule
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown.send(true);
    }
}

pub struct SyncJob {
    engine: Arc<ReconciliationEngine>,
    schedule: ScheduleSpec,
    rng: StdRng,
    stats: Arc<RwLock<JobStats>>,
    triggers: mpsc::Receiver<Trigger>,
    shutdown: watch::Receiver<bool>,
}

impl SyncJob {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        role: Role,
        schedule: ScheduleSpec,
        rng: StdRng,
    ) -> (Self, JobHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(RwLock::new(JobStats {
            job_name: JOB_NAME,
            ..Default::default()
        }));

        let job = Self {
            engine,
            schedule,
            rng,
            stats: stats.clone(),
            triggers: trigger_rx,
            shutdown: shutdown_rx,
        };
        let handle = JobHandle {
            triggers: trigger_tx,
            stats,
            schedule,
            role,
            shutdown: Arc::new(shutdown_tx),
        };
        (job, handle)
    }

    /// Runs the startup pass, then waits for the schedule, manual triggers or
    /// shutdown. Returns once shut down, or once a run-once job has no handle left.
    pub async fn run(mut self) {
        info!("[{}] starting: {}", JOB_NAME, self.schedule);
        let _ = self.run_pass("startup").await;

        loop {
            let delay = self.schedule.next_delay(&mut self.rng);
            self.stats.write().await.next_run_at = delay.and_then(|d| {
                chrono::Duration::from_std(d).ok().map(|d| Utc::now() + d)
            });

            tokio::select! {
                _ = wait(delay) => {
                    let _ = self.run_pass("scheduled").await;
                }
                Some(reply) = self.triggers.recv() => {
                    let result = self.run_pass("manual").await;
                    if reply.send(result).is_err() {
                        warn!("[{}] manual pass finished after its caller went away", JOB_NAME);
                    }
                }
                _ = self.shutdown.changed() => {
                    break;
                }
            }
        }
        info!("[{}] stopped", JOB_NAME);
    }

    async fn run_pass(&self, reason: &str) -> Result<bool> {
        let started = Instant::now();
        let result = self.engine.execute().await;
        let elapsed = started.elapsed();

        let mut stats = self.stats.write().await;
        stats.executions += 1;
        stats.last_run_at = Some(Utc::now());
        stats.last_duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));

        let mutated = match &result {
            Ok(mutated) => {
                stats.last_error = None;
                *mutated
            }
            Err(SyncError::PassIncomplete {
                mutation_occurred, ..
            }) => *mutation_occurred,
            Err(_) => false,
        };
        stats.last_mutation_occurred = Some(mutated);
        if mutated {
            stats.mutating_passes += 1;
            if stats.first_mutation_at.is_none() {
                stats.first_mutation_at = stats.last_run_at;
            }
        }

        match &result {
            Ok(_) => info!(
                "[{}] {} pass done in {}ms (mutated: {})",
                JOB_NAME,
                reason,
                elapsed.as_millis(),
                mutated
            ),
            Err(err) => {
                stats.failures += 1;
                stats.last_error = Some(err.to_string());
                error!("[{}] {} pass failed: {}", JOB_NAME, reason, err);
                if let SyncError::PassIncomplete { failures, .. } = err {
                    for failure in failures {
                        error!("[{}]   {}", JOB_NAME, failure);
                    }
                }
            }
        }
        result
    }
}

async fn wait(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending::<()>().await,
    }
}

/// Classifies the local node once and picks its schedule for the process lifetime
pub async fn select_schedule(
    classifier: &dyn RoleClassifier,
    selector: &ScheduleSelector,
    local: &ClusterMember,
) -> Result<(Role, ScheduleSpec)> {
    let role = classifier.classify().await?;
    if role.is_seed() {
        info!(
            "Seed node.  Instance id: {}, host ip: {}, host name: {}",
            local.instance_id.as_deref().unwrap_or("-"),
            local.host_address,
            local.hostname.as_deref().unwrap_or("-")
        );
    } else {
        info!("Peer node {}: reconciling once at startup", local.host_address);
    }
    Ok((role, selector.schedule_spec(role)))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::role::StaticRole;

    #[tokio::test]
    async fn test_select_schedule_for_seed_and_peer() {
        let selector = ScheduleSelector::default();
        let local = ClusterMember::new("1.2.3.4");

        let (role, spec) = select_schedule(&StaticRole(Role::Seed), &selector, &local)
            .await
            .unwrap();
        assert_eq!(role, Role::Seed);
        assert!(spec.is_periodic());

        let (role, spec) = select_schedule(&StaticRole(Role::Peer), &selector, &local)
            .await
            .unwrap();
        assert_eq!(role, Role::Peer);
        assert_eq!(spec, ScheduleSpec::Once);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let spec = ScheduleSelector::default().schedule_spec(Role::Seed);
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            assert_eq!(spec.next_delay(&mut a), spec.next_delay(&mut b));
        }
    }
}
