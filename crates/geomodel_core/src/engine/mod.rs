//! Modelling engine boundary.
//!
//! # Responsibility
//! - Define the narrow interface the assembler drives to build features.
//! - Keep interpolation mathematics outside this crate.
//!
//! # Invariants
//! - Features are addressed by name.
//! - Engine calls are synchronous and may fail; failures are values, not panics.

pub mod memory;

use crate::config::{BoundingBox, InterpolatorConfig, Solver};
use crate::model::column::{StratigraphicColumn, UnconformityKind};
use crate::model::constraint::Dataset;
use crate::store::spatial_store::FaultParameters;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use memory::{BuiltFeature, InMemoryEngine};

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by a modelling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Referenced feature does not exist in the model.
    FeatureNotFound(String),
    /// Engine refused to build or modify a feature.
    Rejected { feature: String, message: String },
}

impl EngineError {
    pub fn rejected(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            feature: feature.into(),
            message: message.into(),
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeatureNotFound(name) => write!(f, "feature not found in model: {name}"),
            Self::Rejected { feature, message } => {
                write!(f, "engine rejected feature `{feature}`: {message}")
            }
        }
    }
}

impl Error for EngineError {}

/// Feature families the assembler rebuilds independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Foliation,
    Fault,
}

/// Interpolator settings plus per-build overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatorOptions {
    pub config: InterpolatorConfig,
    pub solver: Option<Solver>,
    /// Honour value constraints exactly rather than in a least-squares sense.
    pub force_constrained: bool,
}

impl InterpolatorOptions {
    pub fn new(config: &InterpolatorConfig) -> Self {
        Self {
            config: config.clone(),
            solver: None,
            force_constrained: false,
        }
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn force_constrained(mut self) -> Self {
        self.force_constrained = true;
        self
    }
}

/// External geological modelling engine.
pub trait ModellingEngine {
    /// Drops every built feature of `kind`, including attached unconformities.
    fn clear_features(&mut self, kind: FeatureKind);

    fn create_foliation(
        &mut self,
        name: &str,
        data: &Dataset,
        options: &InterpolatorOptions,
    ) -> EngineResult<()>;

    fn create_fault(
        &mut self,
        name: &str,
        parameters: &FaultParameters,
        data: &Dataset,
        options: &InterpolatorOptions,
    ) -> EngineResult<()>;

    /// Registers an unconformity surface on `feature` at scalar `value`.
    fn add_unconformity(
        &mut self,
        feature: &str,
        value: f64,
        kind: UnconformityKind,
    ) -> EngineResult<()>;

    /// Records that `fault` terminates against `abutted`.
    fn add_abutting_fault(&mut self, fault: &str, abutted: &str) -> EngineResult<()>;

    fn set_bounding_box(&mut self, bounding_box: BoundingBox);

    /// Attaches the column snapshot for downstream consumers.
    fn set_stratigraphic_column(&mut self, column: &StratigraphicColumn);

    /// Names of all built features in build order.
    fn feature_names(&self) -> Vec<String>;
}
