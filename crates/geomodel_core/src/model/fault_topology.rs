//! Fault relationship graph.
//!
//! # Responsibility
//! - Track the set of known faults, pairwise fault relationships and
//!   unit/fault "faulted" flags.
//! - Notify attached listeners after every effective mutation.
//!
//! # Invariants
//! - Fault relationships are symmetric: `(a, b)` and `(b, a)` share one entry.
//! - Relationship and stratigraphy mutations require the fault(s) to exist.
//! - Removing a fault erases every adjacency and stratigraphy entry naming it.
//! - Absent entries read as `FaultRelationship::None` / `false`.

use crate::model::column::StratigraphicColumn;
use crate::observer::{ChannelEvent, ListenerError, ListenerToken, Publisher};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors from fault topology mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Referenced fault is not part of the topology.
    UnknownFault(String),
    /// A fault cannot be related to itself.
    SelfRelationship(String),
}

impl Display for TopologyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFault(name) => write!(f, "unknown fault: {name}"),
            Self::SelfRelationship(name) => {
                write!(f, "fault cannot have a relationship with itself: {name}")
            }
        }
    }
}

impl Error for TopologyError {}

/// Pairwise interaction between two faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultRelationship {
    /// No interaction.
    #[default]
    None,
    /// One fault terminates against the other.
    Abutting,
    /// One fault offsets the other.
    Faulted,
}

pub const CHANNEL_FAULT_ADDED: &str = "fault_added";
pub const CHANNEL_FAULT_REMOVED: &str = "fault_removed";
pub const CHANNEL_FAULT_RELATIONSHIP_UPDATED: &str = "fault_relationship_updated";
pub const CHANNEL_STRATIGRAPHY_FAULT_RELATIONSHIP_UPDATED: &str =
    "stratigraphy_fault_relationship_updated";

/// Change notifications emitted by [`FaultTopology`].
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyEvent {
    FaultAdded(String),
    FaultRemoved(String),
    FaultRelationshipUpdated {
        first: String,
        second: String,
        relationship: FaultRelationship,
    },
    StratigraphyFaultRelationshipUpdated {
        unit: String,
        fault: String,
        is_faulted: bool,
    },
}

impl ChannelEvent for TopologyEvent {
    fn channel(&self) -> &'static str {
        match self {
            Self::FaultAdded(_) => CHANNEL_FAULT_ADDED,
            Self::FaultRemoved(_) => CHANNEL_FAULT_REMOVED,
            Self::FaultRelationshipUpdated { .. } => CHANNEL_FAULT_RELATIONSHIP_UPDATED,
            Self::StratigraphyFaultRelationshipUpdated { .. } => {
                CHANNEL_STRATIGRAPHY_FAULT_RELATIONSHIP_UPDATED
            }
        }
    }
}

/// Faults added and removed by one [`FaultTopology::sync_faults`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultSetChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Unordered fault pair; stored with the lexicographically smaller name first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FaultPair(String, String);

impl FaultPair {
    fn new(first: &str, second: &str) -> Self {
        if first <= second {
            Self(first.to_string(), second.to_string())
        } else {
            Self(second.to_string(), first.to_string())
        }
    }

    fn mentions(&self, fault: &str) -> bool {
        self.0 == fault || self.1 == fault
    }
}

/// Relationship graph over named faults and (unit, fault) pairs.
#[derive(Debug, Default)]
pub struct FaultTopology {
    faults: BTreeSet<String>,
    adjacency: BTreeMap<FaultPair, FaultRelationship>,
    stratigraphy: BTreeMap<(String, String), bool>,
    publisher: Publisher<FaultTopology, TopologyEvent>,
}

impl FaultTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fault. Returns `false` (and stays silent) when already present.
    pub fn add_fault(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if !self.faults.insert(name.clone()) {
            return false;
        }
        self.notify(TopologyEvent::FaultAdded(name));
        true
    }

    /// Removes a fault and every entry mentioning it.
    ///
    /// Returns `false` (and stays silent) when the fault was unknown.
    pub fn remove_fault(&mut self, name: &str) -> bool {
        if !self.faults.remove(name) {
            return false;
        }
        self.adjacency.retain(|pair, _| !pair.mentions(name));
        self.stratigraphy.retain(|(_, fault), _| fault != name);
        self.notify(TopologyEvent::FaultRemoved(name.to_string()));
        true
    }

    /// Makes the fault set equal to `names`: new faults are added, faults
    /// absent from `names` are removed (with their relationships).
    pub fn sync_faults<I, N>(&mut self, names: I) -> FaultSetChange
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let wanted: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let mut change = FaultSetChange::default();
        let stale: Vec<String> = self.faults.difference(&wanted).cloned().collect();
        for name in stale {
            self.remove_fault(&name);
            change.removed.push(name);
        }
        for name in wanted {
            if self.add_fault(name.clone()) {
                change.added.push(name);
            }
        }
        change
    }

    pub fn contains_fault(&self, name: &str) -> bool {
        self.faults.contains(name)
    }

    /// Fault names in sorted order.
    pub fn faults(&self) -> impl Iterator<Item = &str> {
        self.faults.iter().map(String::as_str)
    }

    /// Sets the symmetric relationship between two known faults.
    ///
    /// Setting `FaultRelationship::None` erases the entry.
    pub fn update_fault_relationship(
        &mut self,
        first: &str,
        second: &str,
        relationship: FaultRelationship,
    ) -> TopologyResult<()> {
        self.require_fault(first)?;
        self.require_fault(second)?;
        if first == second {
            return Err(TopologyError::SelfRelationship(first.to_string()));
        }

        let pair = FaultPair::new(first, second);
        match relationship {
            FaultRelationship::None => {
                self.adjacency.remove(&pair);
            }
            other => {
                self.adjacency.insert(pair, other);
            }
        }
        self.notify(TopologyEvent::FaultRelationshipUpdated {
            first: first.to_string(),
            second: second.to_string(),
            relationship,
        });
        Ok(())
    }

    /// Relationship between two faults; `None` when no entry exists.
    pub fn get_fault_relationship(&self, first: &str, second: &str) -> FaultRelationship {
        self.adjacency
            .get(&FaultPair::new(first, second))
            .copied()
            .unwrap_or_default()
    }

    /// Unordered pairs whose relationship is `Abutting`, smaller name first.
    pub fn abutting_pairs(&self) -> Vec<(&str, &str)> {
        self.adjacency
            .iter()
            .filter(|(_, relationship)| **relationship == FaultRelationship::Abutting)
            .map(|(pair, _)| (pair.0.as_str(), pair.1.as_str()))
            .collect()
    }

    /// Sets or clears the "faulted" flag for `(unit, fault)`.
    ///
    /// Only the fault is checked; units live in the stratigraphic column.
    pub fn update_fault_stratigraphy_relationship(
        &mut self,
        unit_name: &str,
        fault_name: &str,
        is_faulted: bool,
    ) -> TopologyResult<()> {
        self.require_fault(fault_name)?;
        let key = (unit_name.to_string(), fault_name.to_string());
        if is_faulted {
            self.stratigraphy.insert(key, true);
        } else {
            self.stratigraphy.remove(&key);
        }
        self.notify(TopologyEvent::StratigraphyFaultRelationshipUpdated {
            unit: unit_name.to_string(),
            fault: fault_name.to_string(),
            is_faulted,
        });
        Ok(())
    }

    /// Whether `fault_name` displaces `unit_name`; `false` when unset.
    pub fn get_fault_stratigraphic_relationship(&self, unit_name: &str, fault_name: &str) -> bool {
        self.stratigraphy
            .get(&(unit_name.to_string(), fault_name.to_string()))
            .copied()
            .unwrap_or(false)
    }

    /// Units of `column` displaced by `fault_name`, in column order.
    pub fn units_cut_by<'c>(&self, fault_name: &str, column: &'c StratigraphicColumn) -> Vec<&'c str> {
        column
            .units()
            .map(|unit| unit.name.as_str())
            .filter(|unit| self.get_fault_stratigraphic_relationship(unit, fault_name))
            .collect()
    }

    /// Drops stratigraphy entries for a unit removed from the column.
    ///
    /// Returns the number of erased entries. Silent: the column edit that
    /// caused this is reported by its owner.
    pub fn remove_unit(&mut self, unit_name: &str) -> usize {
        let before = self.stratigraphy.len();
        self.stratigraphy.retain(|(unit, _), _| unit != unit_name);
        let erased = before - self.stratigraphy.len();
        if erased > 0 {
            debug!(
                "event=topology_unit_removed module=fault_topology status=ok unit={} erased={}",
                unit_name, erased
            );
        }
        erased
    }

    /// Registers a listener on one of the `CHANNEL_*` names.
    pub fn attach<F>(&mut self, channel: impl Into<String>, callback: F) -> ListenerToken
    where
        F: Fn(&FaultTopology, &TopologyEvent) -> Result<(), ListenerError> + 'static,
    {
        self.publisher.attach(channel, callback)
    }

    pub fn detach(&mut self, token: ListenerToken) -> bool {
        self.publisher.detach(token)
    }

    fn require_fault(&self, name: &str) -> TopologyResult<()> {
        if self.faults.contains(name) {
            Ok(())
        } else {
            Err(TopologyError::UnknownFault(name.to_string()))
        }
    }

    fn notify(&self, event: TopologyEvent) {
        self.publisher.publish(self, &event);
    }
}

#[cfg(test)]
mod tests {
    use super::{FaultRelationship, FaultTopology, TopologyError};

    #[test]
    fn self_relationship_is_rejected() {
        let mut topology = FaultTopology::new();
        topology.add_fault("F1");
        let err = topology
            .update_fault_relationship("F1", "F1", FaultRelationship::Abutting)
            .expect_err("self relationship must fail");
        assert_eq!(err, TopologyError::SelfRelationship("F1".to_string()));
    }

    #[test]
    fn setting_none_erases_the_entry() {
        let mut topology = FaultTopology::new();
        topology.add_fault("F1");
        topology.add_fault("F2");
        topology
            .update_fault_relationship("F1", "F2", FaultRelationship::Abutting)
            .expect("relationship should set");
        topology
            .update_fault_relationship("F2", "F1", FaultRelationship::None)
            .expect("relationship should clear");
        assert!(topology.abutting_pairs().is_empty());
    }

    #[test]
    fn sync_faults_reports_changes() {
        let mut topology = FaultTopology::new();
        topology.add_fault("F1");
        topology.add_fault("F2");
        let change = topology.sync_faults(["F2", "F3"]);
        assert_eq!(change.added, vec!["F3".to_string()]);
        assert_eq!(change.removed, vec!["F1".to_string()]);
        assert_eq!(topology.faults().collect::<Vec<_>>(), vec!["F2", "F3"]);
    }
}
