use crate::acl::{CidrRange, RangeSet};
use crate::error::Result;
use crate::membership::ClusterMember;
use crate::membership_error;

/// Ranges every managed port should allow: one `/32` per member
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DesiredRangeSet(RangeSet);

impl DesiredRangeSet {
    /// Builds the set from a roster. An empty roster, or a member without an
    /// address, is an inconsistent view and is refused.
    pub fn from_members(members: &[ClusterMember]) -> Result<Self> {
        if members.is_empty() {
            return Err(membership_error!("membership returned no members"));
        }
        members
            .iter()
            .map(|member| {
                let host = member.host_address.trim();
                if host.is_empty() {
                    Err(membership_error!("member without a host address: {:?}", member))
                } else {
                    Ok(CidrRange::from_host(host))
                }
            })
            .collect::<Result<RangeSet>>()
            .map(Self)
    }

    pub fn ranges(&self) -> &RangeSet {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Changes needed to bring one port's entry to the desired ranges
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortDiff {
    pub to_add: RangeSet,
    pub to_remove: RangeSet,
}

impl PortDiff {
    pub fn compute(desired: &DesiredRangeSet, current: &RangeSet) -> Self {
        Self {
            to_add: desired.ranges().difference(current).cloned().collect(),
            to_remove: current.difference(desired.ranges()).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
