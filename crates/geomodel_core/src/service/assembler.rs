//! Geological model assembly use-case service.
//!
//! # Responsibility
//! - Own the column, fault topology and sampled data for one model.
//! - Translate that state into engine feature builds on demand.
//! - Notify host views after edits and rebuilds.
//!
//! # Invariants
//! - Rebuilds always recompute their feature family from scratch.
//! - One failing group or fault is logged and reported; the rest still build.
//! - Each rebuild entry point publishes exactly one `model_updated` event.

use crate::config::{BoundingBox, ConfigError, InterpolatorConfig, Solver};
use crate::engine::{EngineError, FeatureKind, InterpolatorOptions, ModellingEngine};
use crate::model::column::{
    group_name, ColumnError, ColumnResult, ElementId, StratigraphicColumn, StratigraphicUnit,
    UnconformityKind,
};
use crate::model::constraint::{Constraint, ConstraintLayer, DataRow, Dataset, LayerConstraint};
use crate::model::fault_topology::{
    FaultRelationship, FaultSetChange, FaultTopology, TopologyError,
};
use crate::observer::{ChannelEvent, ListenerError, ListenerToken, Publisher};
use crate::store::sampler::{AllSampler, ConstantElevation, ElevationSource, VectorFeature};
use crate::store::spatial_store::{
    FaultFields, FaultParameters, OrientationFields, SpatialDataStore,
};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const CHANNEL_COLUMN_UPDATED: &str = "column_updated";
pub const CHANNEL_DATA_UPDATED: &str = "data_updated";
pub const CHANNEL_MODEL_UPDATED: &str = "model_updated";

pub type AssemblerResult<T> = Result<T, AssemblerError>;

/// Errors from model assembler operations.
#[derive(Debug)]
pub enum AssemblerError {
    Column(ColumnError),
    Topology(TopologyError),
    Engine(EngineError),
    Config(ConfigError),
    /// No constraint layer produced a usable row for the named foliation.
    EmptyFoliation(String),
}

impl Display for AssemblerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column(err) => write!(f, "{err}"),
            Self::Topology(err) => write!(f, "{err}"),
            Self::Engine(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::EmptyFoliation(name) => write!(f, "foliation `{name}` has no usable data"),
        }
    }
}

impl Error for AssemblerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Column(err) => Some(err),
            Self::Topology(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::EmptyFoliation(_) => None,
        }
    }
}

impl From<ColumnError> for AssemblerError {
    fn from(value: ColumnError) -> Self {
        Self::Column(value)
    }
}

impl From<TopologyError> for AssemblerError {
    fn from(value: TopologyError) -> Self {
        Self::Topology(value)
    }
}

impl From<EngineError> for AssemblerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<ConfigError> for AssemblerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// One feature the engine failed to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFailure {
    pub name: String,
    pub message: String,
}

/// Per-feature outcome of a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub built: Vec<String>,
    /// Groups or faults skipped for lack of data.
    pub skipped: Vec<String>,
    /// A built feature also appears here when a follow-up step on it
    /// (unconformity boundary, abutting link) failed.
    pub failed: Vec<FeatureFailure>,
}

impl RebuildReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: RebuildReport) {
        self.built.extend(other.built);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    fn fail(&mut self, name: &str, err: &EngineError) {
        self.failed.push(FeatureFailure {
            name: name.to_string(),
            message: err.to_string(),
        });
    }
}

/// Sampled data layer replaced by an ingestion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Contacts,
    StructuralData,
    FaultPoints,
}

/// Operation that produced a `model_updated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateTrigger {
    Foliations,
    Faults,
    Model,
    AddedFoliation(String),
}

/// Notifications published by [`ModelAssembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    ColumnUpdated,
    DataUpdated(DataKind),
    ModelUpdated {
        trigger: UpdateTrigger,
        report: RebuildReport,
    },
}

impl ChannelEvent for ModelEvent {
    fn channel(&self) -> &'static str {
        match self {
            Self::ColumnUpdated => CHANNEL_COLUMN_UPDATED,
            Self::DataUpdated(_) => CHANNEL_DATA_UPDATED,
            Self::ModelUpdated { .. } => CHANNEL_MODEL_UPDATED,
        }
    }
}

/// Model assembly service facade over one modelling engine.
pub struct ModelAssembler<E: ModellingEngine> {
    column: StratigraphicColumn,
    topology: FaultTopology,
    store: SpatialDataStore,
    engine: E,
    bounding_box: BoundingBox,
    elevation: Box<dyn ElevationSource>,
    sampler: AllSampler,
    publisher: Publisher<ModelAssembler<E>, ModelEvent>,
}

impl<E: ModellingEngine> ModelAssembler<E> {
    /// Creates an assembler with an empty column over a unit bounding box.
    pub fn new(engine: E) -> Self {
        let mut assembler = Self {
            column: StratigraphicColumn::new(),
            topology: FaultTopology::new(),
            store: SpatialDataStore::new(),
            engine,
            bounding_box: BoundingBox::default(),
            elevation: Box::new(ConstantElevation(0.0)),
            sampler: AllSampler,
            publisher: Publisher::new(),
        };
        assembler.engine.set_bounding_box(assembler.bounding_box);
        assembler
    }

    pub fn column(&self) -> &StratigraphicColumn {
        &self.column
    }

    pub fn topology(&self) -> &FaultTopology {
        &self.topology
    }

    /// Direct topology access, e.g. to attach topology listeners.
    pub fn topology_mut(&mut self) -> &mut FaultTopology {
        &mut self.topology
    }

    pub fn store(&self) -> &SpatialDataStore {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Names of features currently held by the engine.
    pub fn features(&self) -> Vec<String> {
        self.engine.feature_names()
    }

    /// Whether there is enough data for a meaningful rebuild: at least one
    /// group, some unit data, and points for every known fault.
    pub fn is_valid(&self) -> bool {
        if self.column.get_groups().is_empty() {
            return false;
        }
        let has_unit_data = self
            .store
            .records()
            .any(|(_, record)| record.contact.is_some() || record.orientations.is_some());
        if !has_unit_data {
            return false;
        }
        let with_points: BTreeSet<&str> = self.store.fault_names().into_iter().collect();
        self.topology.faults().all(|fault| with_points.contains(fault))
    }

    pub fn attach<F>(&mut self, channel: impl Into<String>, callback: F) -> ListenerToken
    where
        F: Fn(&ModelAssembler<E>, &ModelEvent) -> Result<(), ListenerError> + 'static,
    {
        self.publisher.attach(channel, callback)
    }

    pub fn detach(&mut self, token: ListenerToken) -> bool {
        self.publisher.detach(token)
    }

    /// Applies `edit` to the column and publishes `column_updated`.
    ///
    /// Unit removals should go through [`Self::remove_column_element`] so
    /// fault-stratigraphy flags are cleaned up.
    pub fn edit_column<T>(&mut self, edit: impl FnOnce(&mut StratigraphicColumn) -> T) -> T {
        let output = edit(&mut self.column);
        self.notify(ModelEvent::ColumnUpdated);
        output
    }

    /// Replaces the whole column, e.g. after loading a project.
    pub fn replace_column(&mut self, column: StratigraphicColumn) {
        self.column = column;
        self.notify(ModelEvent::ColumnUpdated);
    }

    /// Removes one column element and drops fault flags of a removed unit
    /// once no unit of that name remains.
    pub fn remove_column_element(&mut self, id: ElementId) -> ColumnResult<()> {
        let unit_name = self
            .column
            .get_element(id)
            .ok_or(ColumnError::ElementNotFound(id))?
            .as_unit()
            .map(|unit| unit.name.clone());
        self.column.remove(id);

        if let Some(name) = unit_name {
            if self.column.get_unit_by_name(&name).is_none() {
                let erased = self.topology.remove_unit(&name);
                info!(
                    "event=unit_removed module=assembler status=ok unit={} fault_flags_erased={}",
                    name, erased
                );
            }
        }
        self.notify(ModelEvent::ColumnUpdated);
        Ok(())
    }

    pub fn update_fault_relationship(
        &mut self,
        first: &str,
        second: &str,
        relationship: FaultRelationship,
    ) -> AssemblerResult<()> {
        self.topology
            .update_fault_relationship(first, second, relationship)
            .map_err(Into::into)
    }

    pub fn update_fault_stratigraphy_relationship(
        &mut self,
        unit_name: &str,
        fault_name: &str,
        is_faulted: bool,
    ) -> AssemblerResult<()> {
        self.topology
            .update_fault_stratigraphy_relationship(unit_name, fault_name, is_faulted)
            .map_err(Into::into)
    }

    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) {
        self.bounding_box = bounding_box;
        self.engine.set_bounding_box(bounding_box);
    }

    /// Sets the elevation used for vertices without a usable Z.
    pub fn set_elevation_source(&mut self, elevation: impl ElevationSource + 'static) {
        self.elevation = Box::new(elevation);
    }

    /// Samples basal contact traces and replaces all unit contacts.
    pub fn update_contact_traces(
        &mut self,
        features: &[VectorFeature],
        unit_name_field: Option<&str>,
        use_z: bool,
    ) -> usize {
        let rows = self.sampler.sample(features, self.elevation.as_ref(), use_z);
        let units = self.store.replace_contacts(&rows, unit_name_field);
        info!(
            "event=contacts_updated module=assembler status=ok rows={} units={}",
            rows.len(),
            units
        );
        self.notify(ModelEvent::DataUpdated(DataKind::Contacts));
        units
    }

    /// Samples structural measurements and replaces all unit orientations.
    pub fn update_structural_data(
        &mut self,
        features: &[VectorFeature],
        fields: &OrientationFields,
        use_z: bool,
    ) -> usize {
        let rows = self.sampler.sample(features, self.elevation.as_ref(), use_z);
        let units = self.store.replace_orientations(&rows, fields);
        info!(
            "event=structural_data_updated module=assembler status=ok rows={} units={}",
            rows.len(),
            units
        );
        self.notify(ModelEvent::DataUpdated(DataKind::StructuralData));
        units
    }

    /// Samples fault traces, replaces all fault points and makes the
    /// topology's fault set match the traced faults.
    pub fn update_fault_points(
        &mut self,
        features: &[VectorFeature],
        fields: &FaultFields,
        use_z: bool,
    ) -> FaultSetChange {
        let rows = self.sampler.sample(features, self.elevation.as_ref(), use_z);
        let names = self.store.replace_fault_points(&rows, fields);
        let change = self.topology.sync_faults(names);
        info!(
            "event=fault_points_updated module=assembler status=ok rows={} added={} removed={}",
            rows.len(),
            change.added.len(),
            change.removed.len()
        );
        self.notify(ModelEvent::DataUpdated(DataKind::FaultPoints));
        change
    }

    /// Samples `features` into a constraint layer for [`Self::add_foliation`].
    pub fn sample_layer(
        &self,
        features: &[VectorFeature],
        constraint: LayerConstraint,
        use_z: bool,
    ) -> ConstraintLayer {
        let rows = self.sampler.sample(features, self.elevation.as_ref(), use_z);
        ConstraintLayer::new(rows, constraint)
    }

    /// Rebuilds one foliation per column group.
    pub fn rebuild_foliations(
        &mut self,
        config: &InterpolatorConfig,
    ) -> AssemblerResult<RebuildReport> {
        config.validate()?;
        let report = self.build_foliations(config);
        self.notify_model_updated(UpdateTrigger::Foliations, &report);
        Ok(report)
    }

    /// Rebuilds one fault feature per traced fault, then abutting links.
    pub fn rebuild_faults(&mut self, config: &InterpolatorConfig) -> AssemblerResult<RebuildReport> {
        config.validate()?;
        let report = self.build_faults(config);
        self.notify_model_updated(UpdateTrigger::Faults, &report);
        Ok(report)
    }

    /// Rebuilds faults, then foliations, with a single notification.
    pub fn update_model(&mut self, config: &InterpolatorConfig) -> AssemblerResult<RebuildReport> {
        config.validate()?;
        let mut report = self.build_faults(config);
        report.merge(self.build_foliations(config));
        self.notify_model_updated(UpdateTrigger::Model, &report);
        Ok(report)
    }

    /// Builds a free-standing foliation from user constraint layers.
    ///
    /// Inequality constraints switch the build to the ADMM solver.
    pub fn add_foliation(
        &mut self,
        name: &str,
        layers: &[ConstraintLayer],
        config: &InterpolatorConfig,
    ) -> AssemblerResult<()> {
        config.validate()?;
        let mut data = Dataset::new();
        for layer in layers {
            if layer.constraint == LayerConstraint::Formline {
                info!(
                    "event=layer_skipped module=assembler status=skipped feature={} reason=formline rows={}",
                    name,
                    layer.rows.len()
                );
                continue;
            }
            data.extend(layer.resolve(name));
        }
        if data.is_empty() {
            return Err(AssemblerError::EmptyFoliation(name.to_string()));
        }

        let mut options = InterpolatorOptions::new(config);
        if data.has_inequalities() {
            options = options.with_solver(Solver::Admm);
        }
        self.engine.create_foliation(name, &data, &options)?;

        let report = RebuildReport {
            built: vec![name.to_string()],
            ..RebuildReport::default()
        };
        self.notify_model_updated(UpdateTrigger::AddedFoliation(name.to_string()), &report);
        Ok(())
    }

    /// Adds an unconformity surface to an already built foliation.
    pub fn add_unconformity(
        &mut self,
        feature: &str,
        value: f64,
        kind: UnconformityKind,
    ) -> AssemblerResult<()> {
        self.engine
            .add_unconformity(feature, value, kind)
            .map_err(Into::into)
    }

    fn build_foliations(&mut self, config: &InterpolatorConfig) -> RebuildReport {
        self.engine.clear_features(FeatureKind::Foliation);
        let mut report = RebuildReport::default();
        let options = InterpolatorOptions::new(config).force_constrained();
        let mut used_names = BTreeSet::new();

        for group in self.column.get_groups().iter().rev() {
            let name = unique_feature_name(group_name(group), &mut used_names);
            let data = self.group_dataset(&name, group);
            if data.is_empty() {
                info!(
                    "event=group_skipped module=assembler status=skipped group={} reason=no_data",
                    name
                );
                report.skipped.push(name);
                continue;
            }

            if let Err(err) = self.engine.create_foliation(&name, &data, &options) {
                error!(
                    "event=foliation_failed module=assembler status=error group={} error={}",
                    name, err
                );
                report.fail(&name, &err);
                continue;
            }
            info!(
                "event=foliation_built module=assembler status=ok group={} rows={}",
                name,
                data.len()
            );

            let kind = boundary_kind(&self.column, group);
            if let Err(err) = self.engine.add_unconformity(&name, 0.0, kind) {
                error!(
                    "event=unconformity_failed module=assembler status=error group={} error={}",
                    name, err
                );
                report.fail(&name, &err);
            }
            report.built.push(name);
        }

        self.engine.set_stratigraphic_column(&self.column);
        report
    }

    /// Contact rows tagged with the running offset, then orientation rows,
    /// unit by unit from the youngest unit of the group.
    fn group_dataset(&self, name: &str, group: &[&StratigraphicUnit]) -> Dataset {
        let mut data = Dataset::new();
        let mut offset = 0.0;
        for unit in group {
            if let Some(record) = self.store.record(&unit.name) {
                if let Some(contacts) = &record.contact {
                    data.extend(contacts.iter().map(|point| DataRow {
                        x: point.x,
                        y: point.y,
                        z: point.z,
                        feature_name: name.to_string(),
                        constraint: Constraint::Value { val: offset },
                    }));
                }
                if let Some(orientations) = &record.orientations {
                    data.extend(orientations.iter().map(|point| DataRow {
                        x: point.x,
                        y: point.y,
                        z: point.z,
                        feature_name: name.to_string(),
                        constraint: Constraint::Orientation {
                            strike: point.strike,
                            dip: point.dip,
                        },
                    }));
                }
            }
            offset += unit.effective_thickness();
        }
        data
    }

    fn build_faults(&mut self, config: &InterpolatorConfig) -> RebuildReport {
        self.engine.clear_features(FeatureKind::Fault);
        let mut report = RebuildReport::default();
        let options = InterpolatorOptions::new(config);
        let mut built: BTreeSet<String> = BTreeSet::new();

        for name in self.store.fault_names() {
            let Some(points) = self
                .store
                .record(name)
                .and_then(|record| record.fault_points.as_deref())
            else {
                continue;
            };
            let parameters = FaultParameters::from_points(points);
            let data = Dataset {
                rows: points
                    .iter()
                    .map(|point| DataRow {
                        x: point.x,
                        y: point.y,
                        z: point.z,
                        feature_name: name.to_string(),
                        constraint: Constraint::Value { val: 0.0 },
                    })
                    .collect(),
            };

            match self.engine.create_fault(name, &parameters, &data, &options) {
                Ok(()) => {
                    info!(
                        "event=fault_built module=assembler status=ok fault={} displacement={} dip={} pitch={}",
                        name, parameters.displacement, parameters.dip, parameters.pitch
                    );
                    built.insert(name.to_string());
                    report.built.push(name.to_string());
                }
                Err(err) => {
                    error!(
                        "event=fault_failed module=assembler status=error fault={} error={}",
                        name, err
                    );
                    report.fail(name, &err);
                }
            }
        }

        for (first, second) in self.topology.abutting_pairs() {
            if !(built.contains(first) && built.contains(second)) {
                warn!(
                    "event=abutting_skipped module=assembler status=skipped first={} second={} reason=fault_not_built",
                    first, second
                );
                continue;
            }
            for (fault, abutted) in [(first, second), (second, first)] {
                if let Err(err) = self.engine.add_abutting_fault(fault, abutted) {
                    error!(
                        "event=abutting_failed module=assembler status=error fault={} abutted={} error={}",
                        fault, abutted, err
                    );
                    report.fail(fault, &err);
                }
            }
        }
        report
    }

    fn notify_model_updated(&self, trigger: UpdateTrigger, report: &RebuildReport) {
        self.notify(ModelEvent::ModelUpdated {
            trigger,
            report: report.clone(),
        });
    }

    fn notify(&self, event: ModelEvent) {
        self.publisher.publish(self, &event);
    }
}

/// Returns `name`, or `name (n)` with the first free `n` from 2 when a
/// group with the same unit names was already built in this rebuild.
fn unique_feature_name(name: String, used: &mut BTreeSet<String>) -> String {
    let mut candidate = name.clone();
    let mut suffix = 2;
    while used.contains(&candidate) {
        candidate = format!("{name} ({suffix})");
        suffix += 1;
    }
    if candidate != name {
        warn!(
            "event=group_renamed module=assembler status=ok group={} feature={}",
            name, candidate
        );
    }
    used.insert(candidate.clone());
    candidate
}

/// Kind of the unconformity directly below the group's oldest unit.
fn boundary_kind(column: &StratigraphicColumn, group: &[&StratigraphicUnit]) -> UnconformityKind {
    let Some(oldest) = group.last() else {
        return UnconformityKind::default();
    };
    column
        .elements()
        .iter()
        .position(|element| element.id() == oldest.id)
        .and_then(|index| column.element_at(index + 1))
        .and_then(|element| element.as_unconformity())
        .map(|unconformity| unconformity.kind)
        .unwrap_or_default()
}
