//! Core domain logic for geological model assembly.
//! This crate is the single source of truth for column and fault invariants.

pub mod config;
pub mod engine;
pub mod logging;
pub mod model;
pub mod observer;
pub mod service;
pub mod store;

pub use config::{
    BoundingBox, ConfigError, ConfigResult, InterpolatorConfig, InterpolatorKind, LoggingConfig,
    Solver,
};
pub use engine::{
    BuiltFeature, EngineError, EngineResult, FeatureKind, InMemoryEngine, InterpolatorOptions,
    ModellingEngine,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::colour::Colour;
pub use model::column::{
    group_name, ColumnElement, ColumnError, ColumnResult, ElementId, StratigraphicColumn,
    StratigraphicUnit, Unconformity, UnconformityKind, UnitUpdate,
};
pub use model::constraint::{Constraint, ConstraintLayer, DataRow, Dataset, LayerConstraint};
pub use model::fault_topology::{
    FaultRelationship, FaultSetChange, FaultTopology, TopologyError, TopologyEvent,
    TopologyResult,
};
pub use observer::{DispatchReport, ListenerError, ListenerToken};
pub use service::assembler::{
    AssemblerError, AssemblerResult, DataKind, FeatureFailure, ModelAssembler, ModelEvent,
    RebuildReport, UpdateTrigger,
};
pub use store::sampler::{
    AllSampler, AttributeValue, ConstantElevation, Coord, ElevationSource, Geometry, SampledRow,
    VectorFeature,
};
pub use store::spatial_store::{
    EntityRecord, FaultFields, FaultParameters, OrientationFields, SpatialDataStore,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
