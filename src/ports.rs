//! Ports that must stay open between cluster members.
use std::collections::BTreeSet;

use serde::Serialize;

/// Source of the port configuration. Consulted at the start of every pass
/// so a changed configuration is picked up without a restart.
pub trait PortSettings: Send + Sync {
    fn primary_port(&self) -> u16;
    fn additional_ports(&self) -> BTreeSet<u16>;
}

/// Deduplicated set of ports managed by this node
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PortSet(BTreeSet<u16>);

impl PortSet {
    pub fn contains(&self, port: u16) -> bool {
        self.0.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for PortSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ports: Vec<String> = self.0.iter().map(u16::to_string).collect();
        write!(f, "{{{}}}", ports.join(","))
    }
}

/// Primary port plus the additional ones
pub fn resolve(settings: &dyn PortSettings) -> PortSet {
    std::iter::once(settings.primary_port())
        .chain(settings.additional_ports())
        .collect()
}
