//! Engine-facing constraint rows and user-declared constraint layers.
//!
//! # Responsibility
//! - Represent each observation handed to the engine as a typed constraint
//!   instead of a loosely keyed table row.
//! - Resolve user constraint layers (sampled rows + field mapping) into rows.
//!
//! # Invariants
//! - A `DataRow` carries exactly one constraint kind; rows without a scalar
//!   value report `NaN` from `DataRow::value()`.
//! - Per-kind field requirements are part of the `LayerConstraint` variant.

use crate::store::sampler::SampledRow;
use log::warn;
use serde::Serialize;

/// One constraint carried by a data row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Scalar field value at the point.
    Value { val: f64 },
    /// Planar orientation at the point, degrees.
    Orientation { strike: f64, dip: f64 },
    /// Scalar field bounded between `lower` and `upper`.
    Inequality { lower: f64, upper: f64 },
}

/// One located constraint for a named feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRow {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub feature_name: String,
    pub constraint: Constraint,
}

impl DataRow {
    /// Scalar value, or `NaN` for non-value constraints.
    pub fn value(&self) -> f64 {
        match self.constraint {
            Constraint::Value { val } => val,
            Constraint::Orientation { .. } | Constraint::Inequality { .. } => f64::NAN,
        }
    }
}

/// Rows handed to the engine for one feature build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub rows: Vec<DataRow>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = DataRow>) {
        self.rows.extend(rows);
    }

    pub fn has_inequalities(&self) -> bool {
        self.rows
            .iter()
            .any(|row| matches!(row.constraint, Constraint::Inequality { .. }))
    }

    /// Rows whose constraint is a scalar value.
    pub fn value_rows(&self) -> impl Iterator<Item = &DataRow> {
        self.rows
            .iter()
            .filter(|row| matches!(row.constraint, Constraint::Value { .. }))
    }
}

/// Field mapping for one user-declared constraint layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerConstraint {
    /// Scalar value read from `value_field`.
    Value { value_field: String },
    /// Orientation read from `strike_field` and `dip_field`.
    Orientation {
        strike_field: String,
        dip_field: String,
    },
    /// Trace geometry only; not consumed by the engine yet.
    Formline,
    /// Bounds read from `lower_field` and `upper_field`.
    Inequality {
        lower_field: String,
        upper_field: String,
    },
}

/// Sampled rows plus the constraint kind they encode.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintLayer {
    pub rows: Vec<SampledRow>,
    pub constraint: LayerConstraint,
}

impl ConstraintLayer {
    pub fn new(rows: Vec<SampledRow>, constraint: LayerConstraint) -> Self {
        Self { rows, constraint }
    }

    /// Converts sampled rows into data rows for `feature_name`.
    ///
    /// Rows missing a required numeric attribute are dropped and logged.
    pub fn resolve(&self, feature_name: &str) -> Vec<DataRow> {
        if self.constraint == LayerConstraint::Formline {
            return Vec::new();
        }
        let mut dropped = 0_usize;
        let mut resolved = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let constraint = match &self.constraint {
                LayerConstraint::Value { value_field } => row
                    .number(value_field)
                    .map(|val| Constraint::Value { val }),
                LayerConstraint::Orientation {
                    strike_field,
                    dip_field,
                } => row
                    .number(strike_field)
                    .zip(row.number(dip_field))
                    .map(|(strike, dip)| Constraint::Orientation { strike, dip }),
                LayerConstraint::Inequality {
                    lower_field,
                    upper_field,
                } => row
                    .number(lower_field)
                    .zip(row.number(upper_field))
                    .map(|(lower, upper)| Constraint::Inequality { lower, upper }),
                LayerConstraint::Formline => None,
            };
            match constraint {
                Some(constraint) => resolved.push(DataRow {
                    x: row.x,
                    y: row.y,
                    z: row.z,
                    feature_name: feature_name.to_string(),
                    constraint,
                }),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                "event=constraint_rows_dropped module=constraint status=partial feature={} dropped={}",
                feature_name, dropped
            );
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::{Constraint, ConstraintLayer, DataRow, LayerConstraint};
    use crate::store::sampler::{AttributeValue, SampledRow};
    use std::collections::BTreeMap;

    fn row(attributes: &[(&str, AttributeValue)]) -> SampledRow {
        SampledRow {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            feature_id: 0,
            attributes: attributes
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn orientation_rows_report_nan_value() {
        let data = DataRow {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            feature_name: "f".to_string(),
            constraint: Constraint::Orientation {
                strike: 10.0,
                dip: 20.0,
            },
        };
        assert!(data.value().is_nan());
    }

    #[test]
    fn inequality_layer_requires_both_bounds() {
        let layer = ConstraintLayer::new(
            vec![
                row(&[
                    ("lo", AttributeValue::Number(1.0)),
                    ("hi", AttributeValue::Number(2.0)),
                ]),
                row(&[("lo", AttributeValue::Number(1.0))]),
            ],
            LayerConstraint::Inequality {
                lower_field: "lo".to_string(),
                upper_field: "hi".to_string(),
            },
        );
        let rows = layer.resolve("fol");
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].constraint,
            Constraint::Inequality {
                lower: 1.0,
                upper: 2.0
            }
        );
    }

    #[test]
    fn value_layer_accepts_numeric_text() {
        let layer = ConstraintLayer::new(
            vec![row(&[("v", AttributeValue::Text(" 4.5 ".to_string()))])],
            LayerConstraint::Value {
                value_field: "v".to_string(),
            },
        );
        let rows = layer.resolve("fol");
        assert_eq!(rows[0].value(), 4.5);
        assert_eq!(rows[0].feature_name, "fol");
    }

    #[test]
    fn formline_layer_resolves_to_nothing() {
        let layer = ConstraintLayer::new(vec![row(&[])], LayerConstraint::Formline);
        assert!(layer.resolve("fol").is_empty());
    }
}
