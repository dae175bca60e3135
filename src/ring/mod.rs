//! Read-only view of the ruler ring.
//!
//! The ring itself (token assignment, heartbeats, state transitions) is maintained by the
//! coordination layer. Rulers only read it: a snapshot of the ring descriptor is fetched from the
//! coordination store under a single key and inspected for members in a given lifecycle state.

pub mod consul;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use strum::{Display as StrumDisplay, EnumString};

/// Lifecycle state of a ring member, owned by the coordination layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberState {
    /// Registered its intent to join, has not claimed tokens yet.
    Pending,
    Joining,
    Active,
    Leaving,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub addr: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub state: MemberState,
}

impl Display for ClusterMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.addr, self.state)
    }
}

/// A point-in-time view of the ring. Never mutated once fetched.
pub trait MembershipSnapshot {
    /// Members currently in `state`, in snapshot order.
    fn members_in_state(&self, state: MemberState) -> Vec<ClusterMember>;
}

/// Fetches ring snapshots from the shared coordination store.
pub trait MembershipStore {
    type Snapshot: MembershipSnapshot + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Self::Snapshot>> + Send;
}

/// The ring descriptor as stored in the coordination store.
///
/// Members are keyed by id, so iteration (and therefore snapshot order) is sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingDesc {
    #[serde(default)]
    members: BTreeMap<String, ClusterMember>,
}

impl RingDesc {
    #[cfg(test)]
    pub fn new(members: impl IntoIterator<Item = ClusterMember>) -> Self {
        Self {
            members: members
                .into_iter()
                .map(|member| (member.id.clone(), member))
                .collect(),
        }
    }

    /// Restores member ids after deserialization; the wire format only carries them as map keys.
    fn with_ids_from_keys(mut self) -> Self {
        for (id, member) in self.members.iter_mut() {
            member.id = id.clone();
        }
        self
    }
}

impl MembershipSnapshot for RingDesc {
    fn members_in_state(&self, state: MemberState) -> Vec<ClusterMember> {
        self.members
            .values()
            .filter(|member| member.state == state)
            .cloned()
            .collect()
    }
}

impl ClusterMember {
    #[cfg(test)]
    pub fn example(id: &str, state: MemberState) -> Self {
        Self {
            id: id.to_string(),
            addr: format!("{id}:9095"),
            timestamp: Utc::now(),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_members_in_state_filters_and_orders_by_id() {
        let ring = RingDesc::new([
            ClusterMember::example("ruler-3", MemberState::Pending),
            ClusterMember::example("ruler-1", MemberState::Active),
            ClusterMember::example("ruler-2", MemberState::Pending),
            ClusterMember::example("ruler-4", MemberState::Leaving),
        ]);

        let pending: Vec<_> = ring
            .members_in_state(MemberState::Pending)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(pending, vec!["ruler-2", "ruler-3"]);

        assert!(ring.members_in_state(MemberState::Left).is_empty());
    }

    #[test]
    fn test_ring_desc_deserialization() -> Result<()> {
        let raw = json!({
            "members": {
                "ruler-a": {"addr": "10.0.0.1:9095", "timestamp": 1700000000, "state": "ACTIVE"},
                "ruler-b": {"addr": "10.0.0.2:9095", "timestamp": 1700000005, "state": "PENDING"}
            }
        });

        let ring = serde_json::from_value::<RingDesc>(raw)?.with_ids_from_keys();

        let pending = ring.members_in_state(MemberState::Pending);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "ruler-b");
        assert_eq!(pending[0].addr, "10.0.0.2:9095");
        assert_eq!(pending[0].timestamp.timestamp(), 1700000005);

        Ok(())
    }

    #[test]
    fn test_empty_ring_deserialization() -> Result<()> {
        let ring: RingDesc = serde_json::from_str("{}")?;
        assert_eq!(ring, RingDesc::default());

        Ok(())
    }

    #[test]
    fn test_member_state_names() -> Result<()> {
        assert_eq!(MemberState::Pending.to_string(), "PENDING");
        assert_eq!(MemberState::from_str("LEAVING")?, MemberState::Leaving);
        assert_eq!(serde_json::to_string(&MemberState::Joining)?, "\"JOINING\"");
        assert!(MemberState::from_str("pending").is_err());

        Ok(())
    }
}
