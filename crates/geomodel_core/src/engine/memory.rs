//! Recording engine that keeps built features in memory.
//!
//! Used by headless hosts that only need the assembled inputs, and by tests.

use crate::config::BoundingBox;
use crate::engine::{EngineError, EngineResult, FeatureKind, InterpolatorOptions, ModellingEngine};
use crate::model::column::{StratigraphicColumn, UnconformityKind};
use crate::model::constraint::Dataset;
use crate::store::spatial_store::FaultParameters;

/// Snapshot of one feature build request.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltFeature {
    pub name: String,
    pub kind: FeatureKind,
    pub data: Dataset,
    pub options: InterpolatorOptions,
    /// Set for faults only.
    pub parameters: Option<FaultParameters>,
    pub unconformities: Vec<(f64, UnconformityKind)>,
    /// Faults this fault abuts against.
    pub abutting: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEngine {
    features: Vec<BuiltFeature>,
    bounding_box: BoundingBox,
    column: Option<StratigraphicColumn>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feature(&self, name: &str) -> Option<&BuiltFeature> {
        self.features.iter().find(|feature| feature.name == name)
    }

    pub fn features(&self) -> &[BuiltFeature] {
        &self.features
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn stratigraphic_column(&self) -> Option<&StratigraphicColumn> {
        self.column.as_ref()
    }

    fn insert(&mut self, feature: BuiltFeature) -> EngineResult<()> {
        if feature.data.is_empty() {
            return Err(EngineError::rejected(feature.name, "dataset has no rows"));
        }
        match self.features.iter_mut().find(|f| f.name == feature.name) {
            Some(existing) => *existing = feature,
            None => self.features.push(feature),
        }
        Ok(())
    }

    fn feature_mut(&mut self, name: &str) -> EngineResult<&mut BuiltFeature> {
        self.features
            .iter_mut()
            .find(|feature| feature.name == name)
            .ok_or_else(|| EngineError::FeatureNotFound(name.to_string()))
    }
}

impl ModellingEngine for InMemoryEngine {
    fn clear_features(&mut self, kind: FeatureKind) {
        self.features.retain(|feature| feature.kind != kind);
    }

    fn create_foliation(
        &mut self,
        name: &str,
        data: &Dataset,
        options: &InterpolatorOptions,
    ) -> EngineResult<()> {
        self.insert(BuiltFeature {
            name: name.to_string(),
            kind: FeatureKind::Foliation,
            data: data.clone(),
            options: options.clone(),
            parameters: None,
            unconformities: Vec::new(),
            abutting: Vec::new(),
        })
    }

    fn create_fault(
        &mut self,
        name: &str,
        parameters: &FaultParameters,
        data: &Dataset,
        options: &InterpolatorOptions,
    ) -> EngineResult<()> {
        self.insert(BuiltFeature {
            name: name.to_string(),
            kind: FeatureKind::Fault,
            data: data.clone(),
            options: options.clone(),
            parameters: Some(*parameters),
            unconformities: Vec::new(),
            abutting: Vec::new(),
        })
    }

    fn add_unconformity(
        &mut self,
        feature: &str,
        value: f64,
        kind: UnconformityKind,
    ) -> EngineResult<()> {
        self.feature_mut(feature)?.unconformities.push((value, kind));
        Ok(())
    }

    fn add_abutting_fault(&mut self, fault: &str, abutted: &str) -> EngineResult<()> {
        if self.feature(abutted).map(|f| f.kind) != Some(FeatureKind::Fault) {
            return Err(EngineError::FeatureNotFound(abutted.to_string()));
        }
        let feature = self.feature_mut(fault)?;
        if feature.kind != FeatureKind::Fault {
            return Err(EngineError::rejected(fault, "only faults can abut"));
        }
        feature.abutting.push(abutted.to_string());
        Ok(())
    }

    fn set_bounding_box(&mut self, bounding_box: BoundingBox) {
        self.bounding_box = bounding_box;
    }

    fn set_stratigraphic_column(&mut self, column: &StratigraphicColumn) {
        self.column = Some(column.clone());
    }

    fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|feature| feature.name.clone()).collect()
    }
}
