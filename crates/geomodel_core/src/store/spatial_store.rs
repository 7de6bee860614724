//! Per-entity accumulation of sampled observations.
//!
//! # Responsibility
//! - Group sampled rows by unit or fault name into typed records.
//! - Derive fault build parameters from trace attributes.
//!
//! # Invariants
//! - Each `replace_*` call rewrites its record field for every entity; no
//!   stale rows from an earlier sampling survive.
//! - Records with no remaining data are pruned.
//! - Iteration order over entities is sorted by name.

use crate::store::sampler::SampledRow;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Fallback displacement when no trace point carries one.
pub const DEFAULT_FAULT_DISPLACEMENT: f64 = 10.0;
/// Fallback dip (vertical) when no trace point carries one.
pub const DEFAULT_FAULT_DIP: f64 = 90.0;
/// Fallback pitch when no trace point carries one.
pub const DEFAULT_FAULT_PITCH: f64 = 0.0;

/// Sampled point on a unit's basal contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Sampled strike/dip measurement, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub strike: f64,
    pub dip: f64,
}

/// Sampled fault trace vertex with optional kinematic attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dip: Option<f64>,
    pub displacement: Option<f64>,
    pub pitch: Option<f64>,
}

/// Fault geometry parameters handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultParameters {
    pub displacement: f64,
    pub dip: f64,
    pub pitch: f64,
}

impl Default for FaultParameters {
    fn default() -> Self {
        Self {
            displacement: DEFAULT_FAULT_DISPLACEMENT,
            dip: DEFAULT_FAULT_DIP,
            pitch: DEFAULT_FAULT_PITCH,
        }
    }
}

impl FaultParameters {
    /// Mean of each attribute over the points carrying it; defaults otherwise.
    pub fn from_points(points: &[FaultPoint]) -> Self {
        let defaults = Self::default();
        Self {
            displacement: mean(points.iter().filter_map(|p| p.displacement))
                .unwrap_or(defaults.displacement),
            dip: mean(points.iter().filter_map(|p| p.dip)).unwrap_or(defaults.dip),
            pitch: mean(points.iter().filter_map(|p| p.pitch)).unwrap_or(defaults.pitch),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Observations stored for one unit or fault name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub contact: Option<Vec<ContactPoint>>,
    pub orientations: Option<Vec<OrientationPoint>>,
    pub fault_points: Option<Vec<FaultPoint>>,
}

impl EntityRecord {
    fn is_empty(&self) -> bool {
        self.contact.is_none() && self.orientations.is_none() && self.fault_points.is_none()
    }
}

/// Attribute names for structural orientation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientationFields {
    pub strike_field: String,
    pub dip_field: String,
    pub unit_name_field: String,
    /// When set, `strike_field` holds dip direction (strike = value - 90).
    pub dip_direction: bool,
}

/// Attribute names for fault trace layers; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultFields {
    /// Falls back to the sampled feature index when unset or missing.
    pub name_field: Option<String>,
    pub dip_field: Option<String>,
    pub displacement_field: Option<String>,
    pub pitch_field: Option<String>,
}

/// Mapping from entity name to its sampled observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialDataStore {
    records: BTreeMap<String, EntityRecord>,
}

impl SpatialDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) -> Option<&EntityRecord> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &EntityRecord)> {
        self.records
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Fault names with a non-empty point set, sorted.
    pub fn fault_names(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|(_, record)| {
                record
                    .fault_points
                    .as_ref()
                    .is_some_and(|points| !points.is_empty())
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Replaces every contact record with rows grouped by `unit_name_field`.
    ///
    /// Without a field name no rows can be attributed; existing contacts are
    /// still cleared. Returns the number of units that received contacts.
    pub fn replace_contacts(&mut self, rows: &[SampledRow], unit_name_field: Option<&str>) -> usize {
        let mut grouped: BTreeMap<String, Vec<ContactPoint>> = BTreeMap::new();
        let mut dropped = 0_usize;
        if let Some(field) = unit_name_field {
            for row in rows {
                match row.name(field) {
                    Some(unit) => grouped.entry(unit).or_default().push(ContactPoint {
                        x: row.x,
                        y: row.y,
                        z: row.z,
                    }),
                    None => dropped += 1,
                }
            }
        } else if !rows.is_empty() {
            info!(
                "event=contacts_ignored module=spatial_store status=skipped reason=no_unit_field rows={}",
                rows.len()
            );
        }
        report_dropped("contacts", dropped);

        let count = grouped.len();
        self.replace_field(grouped, |record| &mut record.contact);
        count
    }

    /// Replaces every orientation record with rows grouped by unit name.
    ///
    /// Rows without a unit name or a numeric strike/dip are dropped.
    pub fn replace_orientations(&mut self, rows: &[SampledRow], fields: &OrientationFields) -> usize {
        let mut grouped: BTreeMap<String, Vec<OrientationPoint>> = BTreeMap::new();
        let mut dropped = 0_usize;
        for row in rows {
            let parsed = row
                .name(&fields.unit_name_field)
                .zip(row.number(&fields.strike_field))
                .zip(row.number(&fields.dip_field));
            let Some(((unit, strike), dip)) = parsed else {
                dropped += 1;
                continue;
            };
            let strike = if fields.dip_direction {
                strike - 90.0
            } else {
                strike
            };
            grouped.entry(unit).or_default().push(OrientationPoint {
                x: row.x,
                y: row.y,
                z: row.z,
                strike,
                dip,
            });
        }
        report_dropped("orientations", dropped);

        let count = grouped.len();
        self.replace_field(grouped, |record| &mut record.orientations);
        count
    }

    /// Replaces every fault point record and returns the fault names seen.
    pub fn replace_fault_points(
        &mut self,
        rows: &[SampledRow],
        fields: &FaultFields,
    ) -> BTreeSet<String> {
        let optional = |row: &SampledRow, field: &Option<String>| {
            field.as_deref().and_then(|field| row.number(field))
        };
        let mut grouped: BTreeMap<String, Vec<FaultPoint>> = BTreeMap::new();
        for row in rows {
            let name = fields
                .name_field
                .as_deref()
                .and_then(|field| row.name(field))
                .unwrap_or_else(|| row.feature_id.to_string());
            grouped.entry(name).or_default().push(FaultPoint {
                x: row.x,
                y: row.y,
                z: row.z,
                dip: optional(row, &fields.dip_field),
                displacement: optional(row, &fields.displacement_field),
                pitch: optional(row, &fields.pitch_field),
            });
        }

        let names = grouped.keys().cloned().collect();
        self.replace_field(grouped, |record| &mut record.fault_points);
        names
    }

    fn replace_field<T>(
        &mut self,
        mut grouped: BTreeMap<String, Vec<T>>,
        field: impl Fn(&mut EntityRecord) -> &mut Option<Vec<T>>,
    ) {
        for (name, record) in self.records.iter_mut() {
            *field(record) = grouped.remove(name);
        }
        for (name, values) in grouped {
            let mut record = EntityRecord::default();
            *field(&mut record) = Some(values);
            self.records.insert(name, record);
        }
        self.records.retain(|_, record| !record.is_empty());
    }
}

fn report_dropped(kind: &str, dropped: usize) {
    if dropped > 0 {
        warn!(
            "event=rows_dropped module=spatial_store status=partial kind={} dropped={}",
            kind, dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{FaultParameters, FaultPoint};

    fn point(dip: Option<f64>, displacement: Option<f64>) -> FaultPoint {
        FaultPoint {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            dip,
            displacement,
            pitch: None,
        }
    }

    #[test]
    fn fault_parameters_default_when_no_attributes() {
        let params = FaultParameters::from_points(&[point(None, None)]);
        assert_eq!(params.displacement, 10.0);
        assert_eq!(params.dip, 90.0);
        assert_eq!(params.pitch, 0.0);
    }

    #[test]
    fn fault_parameters_average_only_present_values() {
        let params = FaultParameters::from_points(&[
            point(Some(60.0), Some(100.0)),
            point(Some(80.0), None),
            point(None, Some(300.0)),
        ]);
        assert_eq!(params.dip, 70.0);
        assert_eq!(params.displacement, 200.0);
        assert_eq!(params.pitch, 0.0);
    }
}
