//! Execution cadence of the reconciliation job.
//!
//! Seeds re-run on a fixed base interval plus a jitter that is re-drawn for
//! every wait, so seeds across the cluster do not hit the ACL backend in
//! lockstep. Peers run once, at process start.
use std::time::Duration;

use rand::Rng;
use serde::{Serialize, Serializer};

use crate::role::Role;
use crate::settings::{STANDARD_BASE_INTERVAL_SECS, STANDARD_JITTER_SECS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ScheduleSpec {
    Periodic {
        #[serde(rename = "base_interval_secs", serialize_with = "as_secs")]
        base_interval: Duration,
        #[serde(rename = "jitter_range_secs", serialize_with = "as_secs")]
        jitter_range: Duration,
    },
    Once,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl ScheduleSpec {
    pub fn is_periodic(&self) -> bool {
        matches!(self, ScheduleSpec::Periodic { .. })
    }

    /// Wait before the next pass, `None` once no further pass is scheduled.
    /// Draws a fresh jitter on every call.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Duration> {
        match self {
            ScheduleSpec::Periodic {
                base_interval,
                jitter_range,
            } => Some(*base_interval + jitter(*jitter_range, rng)),
            ScheduleSpec::Once => None,
        }
    }
}

impl std::fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleSpec::Periodic {
                base_interval,
                jitter_range,
            } => write!(
                f,
                "periodic every {}s + [0, {}s) jitter",
                base_interval.as_secs(),
                jitter_range.as_secs()
            ),
            ScheduleSpec::Once => write!(f, "once at startup"),
        }
    }
}

/// Uniform in `[0, range)` at millisecond resolution
pub fn jitter<R: Rng + ?Sized>(range: Duration, rng: &mut R) -> Duration {
    let max_ms = u64::try_from(range.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..max_ms))
}

/// Maps a node role to its schedule. Pure: the role is classified elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleSelector {
    base_interval: Duration,
    jitter_range: Duration,
}

impl Default for ScheduleSelector {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(STANDARD_BASE_INTERVAL_SECS),
            jitter_range: Duration::from_secs(STANDARD_JITTER_SECS),
        }
    }
}

impl ScheduleSelector {
    pub fn new(base_interval: Duration, jitter_range: Duration) -> Self {
        Self {
            base_interval,
            jitter_range,
        }
    }

    pub fn schedule_spec(&self, role: Role) -> ScheduleSpec {
        match role {
            Role::Seed => ScheduleSpec::Periodic {
                base_interval: self.base_interval,
                jitter_range: self.jitter_range,
            },
            Role::Peer => ScheduleSpec::Once,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_seed_is_periodic_peer_runs_once() {
        let selector = ScheduleSelector::default();
        assert_eq!(
            selector.schedule_spec(Role::Seed),
            ScheduleSpec::Periodic {
                base_interval: Duration::from_secs(120),
                jitter_range: Duration::from_secs(120),
            }
        );
        assert_eq!(selector.schedule_spec(Role::Peer), ScheduleSpec::Once);
    }

    #[test]
    fn test_once_has_no_next_delay() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(ScheduleSpec::Once.next_delay(&mut rng), None);
    }

    #[test]
    fn test_delay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let spec = ScheduleSelector::default().schedule_spec(Role::Seed);
        for _ in 0..1_000 {
            let delay = spec.next_delay(&mut rng).unwrap();
            assert!(delay >= Duration::from_secs(120));
            assert!(delay < Duration::from_secs(240));
        }
    }

    #[test]
    fn test_zero_jitter() {
        let mut rng = StdRng::seed_from_u64(1);
        let spec = ScheduleSelector::new(Duration::from_secs(5), Duration::ZERO)
            .schedule_spec(Role::Seed);
        assert_eq!(spec.next_delay(&mut rng), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_serialized_shape() {
        let spec = ScheduleSelector::default().schedule_spec(Role::Seed);
        let json = serde_json::to_value(spec).unwrap();
        assert_eq!(json["mode"], "periodic");
        assert_eq!(json["base_interval_secs"], 120.0);
        assert_eq!(json["jitter_range_secs"], 120.0);

        let json = serde_json::to_value(ScheduleSpec::Once).unwrap();
        assert_eq!(json["mode"], "once");
    }
}
