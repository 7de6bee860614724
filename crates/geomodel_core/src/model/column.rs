//! Stratigraphic column domain model.
//!
//! # Responsibility
//! - Own the ordered sequence of units and unconformities (youngest first).
//! - Derive groups: maximal runs of units between unconformities.
//! - Convert to and from the host application's JSON dictionary.
//!
//! # Invariants
//! - Element order is the single source of truth for stacking.
//! - Every element carries a stable `ElementId`; ids, not positions, are the
//!   unit of identity.
//! - Unit thickness is finite and non-negative when set.
//! - Name lookups return the first match in column order.

use crate::model::colour::Colour;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a column element.
pub type ElementId = Uuid;

pub type ColumnResult<T> = Result<T, ColumnError>;

/// Errors from column construction, mutation and decoding.
#[derive(Debug)]
pub enum ColumnError {
    /// Unconformity kind string is neither `erode` nor `onlap`.
    InvalidUnconformityKind(String),
    /// Colour string could not be normalised.
    InvalidColour(String),
    /// Thickness is negative or not finite.
    InvalidThickness { name: String, thickness: f64 },
    /// No element with this id exists in the column.
    ElementNotFound(ElementId),
    /// Element exists but is an unconformity.
    ElementIsNotUnit(ElementId),
    /// Dictionary payload does not match the column wire shape.
    InvalidData(String),
    Json(serde_json::Error),
}

impl Display for ColumnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUnconformityKind(value) => write!(
                f,
                "invalid unconformity type `{value}`; expected erode|onlap"
            ),
            Self::InvalidColour(value) => write!(f, "unrecognised colour `{value}`"),
            Self::InvalidThickness { name, thickness } => write!(
                f,
                "unit `{name}` thickness must be finite and non-negative, got {thickness}"
            ),
            Self::ElementNotFound(id) => write!(f, "column element not found: {id}"),
            Self::ElementIsNotUnit(id) => write!(f, "column element is not a unit: {id}"),
            Self::InvalidData(message) => write!(f, "invalid column data: {message}"),
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ColumnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ColumnError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// How the surface above an unconformity interacts with older units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnconformityKind {
    /// Younger surface truncates older units.
    #[default]
    Erode,
    /// Younger units lap onto the older surface.
    Onlap,
}

impl UnconformityKind {
    /// Wire string used in the column dictionary.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Erode => "erode",
            Self::Onlap => "onlap",
        }
    }

    /// Parses a wire string; anything but `erode`/`onlap` is rejected.
    pub fn parse(value: &str) -> ColumnResult<Self> {
        match value {
            "erode" => Ok(Self::Erode),
            "onlap" => Ok(Self::Onlap),
            other => Err(ColumnError::InvalidUnconformityKind(other.to_string())),
        }
    }
}

/// A named rock layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StratigraphicUnit {
    pub id: ElementId,
    pub name: String,
    pub colour: Option<Colour>,
    /// `None` means unset; treated as zero when stacking offsets.
    pub thickness: Option<f64>,
}

impl StratigraphicUnit {
    /// Thickness used for offset accumulation.
    pub fn effective_thickness(&self) -> f64 {
        self.thickness.unwrap_or(0.0)
    }
}

/// A stratigraphic discontinuity marker; always a group boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Unconformity {
    pub id: ElementId,
    pub name: String,
    pub kind: UnconformityKind,
}

/// One entry in the column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnElement {
    Unit(StratigraphicUnit),
    Unconformity(Unconformity),
}

impl ColumnElement {
    pub fn id(&self) -> ElementId {
        match self {
            Self::Unit(unit) => unit.id,
            Self::Unconformity(unconformity) => unconformity.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Unit(unit) => &unit.name,
            Self::Unconformity(unconformity) => &unconformity.name,
        }
    }

    pub fn as_unit(&self) -> Option<&StratigraphicUnit> {
        match self {
            Self::Unit(unit) => Some(unit),
            Self::Unconformity(_) => None,
        }
    }

    pub fn as_unconformity(&self) -> Option<&Unconformity> {
        match self {
            Self::Unconformity(unconformity) => Some(unconformity),
            Self::Unit(_) => None,
        }
    }
}

/// Partial update for one unit; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the colour.
    pub colour: Option<Option<Colour>>,
    /// `Some(None)` clears the thickness.
    pub thickness: Option<Option<f64>>,
}

/// Ordered sequence of units and unconformities, youngest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StratigraphicColumn {
    order: Vec<ColumnElement>,
}

impl StratigraphicColumn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a unit at the oldest position and returns a copy of it.
    /// Names are not deduplicated.
    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        colour: Option<Colour>,
        thickness: Option<f64>,
    ) -> ColumnResult<StratigraphicUnit> {
        let name = name.into();
        validate_thickness(&name, thickness)?;
        let unit = StratigraphicUnit {
            id: Uuid::new_v4(),
            name,
            colour,
            thickness,
        };
        self.order.push(ColumnElement::Unit(unit.clone()));
        Ok(unit)
    }

    /// Appends an unconformity at the oldest position and returns a copy of it.
    pub fn add_unconformity(
        &mut self,
        name: impl Into<String>,
        kind: UnconformityKind,
    ) -> Unconformity {
        let unconformity = Unconformity {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
        };
        self.order.push(ColumnElement::Unconformity(unconformity.clone()));
        unconformity
    }

    /// Removes the element with `id`. Returns whether it was present.
    ///
    /// Does not touch fault-stratigraphy bookkeeping; see
    /// `ModelAssembler::remove_column_element` for the cascading variant.
    pub fn remove(&mut self, id: ElementId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.order.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replaces the order with the elements referenced by `ids`.
    ///
    /// Elements not referenced are dropped from the column. Ids that do not
    /// resolve (or repeat an id already placed) are skipped and returned so
    /// the caller can report them.
    pub fn reorder(&mut self, ids: &[ElementId]) -> Vec<ElementId> {
        let mut placed = HashSet::with_capacity(ids.len());
        let mut unresolved = Vec::new();
        let mut next = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_element(*id) {
                Some(element) if placed.insert(*id) => next.push(element.clone()),
                _ => unresolved.push(*id),
            }
        }
        if !unresolved.is_empty() {
            warn!(
                "event=column_reorder module=column status=partial unresolved={}",
                unresolved.len()
            );
        }
        self.order = next;
        unresolved
    }

    /// Applies a partial update to one unit with the same validation as `add_unit`.
    pub fn update_unit(&mut self, id: ElementId, update: UnitUpdate) -> ColumnResult<()> {
        let index = self.position(id).ok_or(ColumnError::ElementNotFound(id))?;
        let ColumnElement::Unit(unit) = &mut self.order[index] else {
            return Err(ColumnError::ElementIsNotUnit(id));
        };
        let name = update.name.unwrap_or_else(|| unit.name.clone());
        let thickness = update.thickness.unwrap_or(unit.thickness);
        validate_thickness(&name, thickness)?;
        unit.name = name;
        unit.thickness = thickness;
        if let Some(colour) = update.colour {
            unit.colour = colour;
        }
        Ok(())
    }

    /// Splits the order at every unconformity and keeps non-empty unit runs.
    pub fn get_groups(&self) -> Vec<Vec<&StratigraphicUnit>> {
        let mut groups = Vec::new();
        let mut group = Vec::new();
        for element in &self.order {
            match element {
                ColumnElement::Unit(unit) => group.push(unit),
                ColumnElement::Unconformity(_) => {
                    if !group.is_empty() {
                        groups.push(std::mem::take(&mut group));
                    }
                }
            }
        }
        if !group.is_empty() {
            groups.push(group);
        }
        groups
    }

    /// First unit whose name equals `name`.
    pub fn get_unit_by_name(&self, name: &str) -> Option<&StratigraphicUnit> {
        self.units().find(|unit| unit.name == name)
    }

    /// First unconformity of the given kind.
    pub fn get_unconformity_by_kind(&self, kind: UnconformityKind) -> Option<&Unconformity> {
        self.order
            .iter()
            .filter_map(ColumnElement::as_unconformity)
            .find(|unconformity| unconformity.kind == kind)
    }

    pub fn get_element(&self, id: ElementId) -> Option<&ColumnElement> {
        self.order.iter().find(|element| element.id() == id)
    }

    pub fn element_at(&self, index: usize) -> Option<&ColumnElement> {
        self.order.get(index)
    }

    pub fn elements(&self) -> &[ColumnElement] {
        &self.order
    }

    pub fn units(&self) -> impl Iterator<Item = &StratigraphicUnit> {
        self.order.iter().filter_map(ColumnElement::as_unit)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    /// Encodes the column as `{ "elements": [...] }` in stratigraphic order.
    pub fn to_dict(&self) -> Value {
        let elements = self
            .order
            .iter()
            .map(|element| {
                let mut map = Map::new();
                match element {
                    ColumnElement::Unit(unit) => {
                        map.insert("uuid".into(), Value::String(unit.id.to_string()));
                        map.insert("name".into(), Value::String(unit.name.clone()));
                        map.insert(
                            "colour".into(),
                            unit.colour
                                .map(|colour| Value::String(colour.to_hex()))
                                .unwrap_or(Value::Null),
                        );
                        map.insert(
                            "thickness".into(),
                            unit.thickness
                                .and_then(serde_json::Number::from_f64)
                                .map(Value::Number)
                                .unwrap_or(Value::Null),
                        );
                    }
                    ColumnElement::Unconformity(unconformity) => {
                        map.insert("uuid".into(), Value::String(unconformity.id.to_string()));
                        map.insert("name".into(), Value::String(unconformity.name.clone()));
                        map.insert(
                            "unconformity_type".into(),
                            Value::String(unconformity.kind.as_str().to_string()),
                        );
                    }
                }
                Value::Object(map)
            })
            .collect();
        let mut root = Map::new();
        root.insert("elements".into(), Value::Array(elements));
        Value::Object(root)
    }

    /// Decodes a column dictionary.
    ///
    /// Elements carrying `unconformity_type` are unconformities; everything
    /// else is a unit. Missing `uuid` values are regenerated.
    pub fn from_dict(data: &Value) -> ColumnResult<Self> {
        let root = data
            .as_object()
            .ok_or_else(|| ColumnError::InvalidData("column must be an object".to_string()))?;
        let elements = match root.get("elements") {
            None | Some(Value::Null) => return Ok(Self::new()),
            Some(Value::Array(elements)) => elements,
            Some(_) => {
                return Err(ColumnError::InvalidData(
                    "`elements` must be an array".to_string(),
                ))
            }
        };

        let mut column = Self::new();
        for (index, raw) in elements.iter().enumerate() {
            let record = raw.as_object().ok_or_else(|| {
                ColumnError::InvalidData(format!("element {index} must be an object"))
            })?;
            let id = decode_id(record, index)?;
            let name = record
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ColumnError::InvalidData(format!("element {index} has no name")))?
                .to_string();

            let element = if let Some(kind) = record.get("unconformity_type") {
                let kind = kind.as_str().ok_or_else(|| {
                    ColumnError::InvalidUnconformityKind(kind.to_string())
                })?;
                ColumnElement::Unconformity(Unconformity {
                    id,
                    name,
                    kind: UnconformityKind::parse(kind)?,
                })
            } else {
                let colour = match record.get("colour") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(raw)) => Some(
                        Colour::parse(raw).ok_or_else(|| ColumnError::InvalidColour(raw.clone()))?,
                    ),
                    Some(other) => return Err(ColumnError::InvalidColour(other.to_string())),
                };
                let thickness = match record.get("thickness") {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(value.as_f64().ok_or_else(|| {
                        ColumnError::InvalidData(format!(
                            "element {index} thickness must be a number"
                        ))
                    })?),
                };
                validate_thickness(&name, thickness)?;
                ColumnElement::Unit(StratigraphicUnit {
                    id,
                    name,
                    colour,
                    thickness,
                })
            };
            column.order.push(element);
        }
        Ok(column)
    }

    pub fn to_json(&self) -> ColumnResult<String> {
        Ok(serde_json::to_string(&self.to_dict())?)
    }

    pub fn from_json(raw: &str) -> ColumnResult<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_dict(&value)
    }

    fn position(&self, id: ElementId) -> Option<usize> {
        self.order.iter().position(|element| element.id() == id)
    }
}

impl Display for StratigraphicColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, element) in self.order.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", index + 1, element.name())?;
        }
        Ok(())
    }
}

/// Feature name for one group: its unit names joined with `/`.
pub fn group_name(group: &[&StratigraphicUnit]) -> String {
    group
        .iter()
        .map(|unit| unit.name.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn validate_thickness(name: &str, thickness: Option<f64>) -> ColumnResult<()> {
    match thickness {
        Some(value) if !value.is_finite() || value < 0.0 => Err(ColumnError::InvalidThickness {
            name: name.to_string(),
            thickness: value,
        }),
        _ => Ok(()),
    }
}

fn decode_id(record: &Map<String, Value>, index: usize) -> ColumnResult<ElementId> {
    match record.get("uuid") {
        None | Some(Value::Null) => Ok(Uuid::new_v4()),
        Some(Value::String(raw)) => Uuid::parse_str(raw).map_err(|err| {
            ColumnError::InvalidData(format!("element {index} has invalid uuid `{raw}`: {err}"))
        }),
        Some(other) => Err(ColumnError::InvalidData(format!(
            "element {index} uuid must be a string, got {other}"
        ))),
    }
}
