//! Explicit configuration values passed by the host application.
//!
//! # Responsibility
//! - Carry interpolator defaults, model extent and logging setup as plain
//!   values instead of process-wide settings.
//! - Validate settings before they reach the modelling engine.
//!
//! # Invariants
//! - `InterpolatorConfig::validate()` passes for `InterpolatorConfig::default()`.
//! - `BoundingBox` never holds an axis whose maximum is below its origin.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building or loading configuration values.
#[derive(Debug)]
pub enum ConfigError {
    /// One axis has `max < min` or a non-finite bound.
    InvalidBoundingBox {
        axis: &'static str,
        min: f64,
        max: f64,
    },
    /// Interpolator setting is out of its accepted range.
    InvalidInterpolatorSetting(String),
    /// JSON payload could not be decoded.
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBoundingBox { axis, min, max } => write!(
                f,
                "invalid bounding box on axis {axis}: min {min} must not exceed max {max}"
            ),
            Self::InvalidInterpolatorSetting(message) => {
                write!(f, "invalid interpolator setting: {message}")
            }
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidBoundingBox { .. } => None,
            Self::InvalidInterpolatorSetting(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Discrete interpolation scheme requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolatorKind {
    /// Finite difference interpolator on a regular grid.
    #[default]
    #[serde(rename = "FDI")]
    FiniteDifference,
    /// Piecewise linear interpolator on a tetrahedral mesh.
    #[serde(rename = "PLI")]
    PiecewiseLinear,
    /// Radial basis function interpolator.
    #[serde(rename = "Surfe")]
    Surfe,
}

/// Linear solver override for one feature build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    /// Conjugate gradient.
    Cg,
    /// Alternating direction method of multipliers; required for inequalities.
    Admm,
}

/// Interpolator settings shared by every feature of one rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolatorConfig {
    pub interpolator_kind: InterpolatorKind,
    /// Target number of support elements.
    pub nelements: u32,
    /// Normal (gradient) constraint point weight.
    pub npw: f64,
    /// Value constraint point weight.
    pub cpw: f64,
    /// Smoothing regularisation weight.
    pub regularisation: f64,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            interpolator_kind: InterpolatorKind::default(),
            nelements: 10_000,
            npw: 1.0,
            cpw: 1.0,
            regularisation: 1.0,
        }
    }
}

impl InterpolatorConfig {
    /// Checks that element count is positive and weights are finite and non-negative.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.nelements == 0 {
            return Err(ConfigError::InvalidInterpolatorSetting(
                "nelements must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("npw", self.npw),
            ("cpw", self.cpw),
            ("regularisation", self.regularisation),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidInterpolatorSetting(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Decodes and validates a JSON settings payload.
    ///
    /// Missing keys fall back to defaults.
    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Axis-aligned model extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner `[x, y, z]`.
    pub origin: [f64; 3],
    /// Maximum corner `[x, y, z]`.
    pub maximum: [f64; 3],
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            maximum: [1.0, 1.0, 1.0],
        }
    }
}

impl BoundingBox {
    /// Builds a box from two corners after checking every axis.
    pub fn new(origin: [f64; 3], maximum: [f64; 3]) -> ConfigResult<Self> {
        for (index, axis) in ["x", "y", "z"].into_iter().enumerate() {
            let (min, max) = (origin[index], maximum[index]);
            if !min.is_finite() || !max.is_finite() || max < min {
                return Err(ConfigError::InvalidBoundingBox { axis, min, max });
            }
        }
        Ok(Self { origin, maximum })
    }

    /// Builds a box from map-style extent values.
    pub fn from_extent(
        east: f64,
        west: f64,
        north: f64,
        south: f64,
        top: f64,
        bottom: f64,
    ) -> ConfigResult<Self> {
        Self::new([west, south, bottom], [east, north, top])
    }

    /// Edge lengths along x, y and z.
    pub fn extent(&self) -> [f64; 3] {
        [
            self.maximum[0] - self.origin[0],
            self.maximum[1] - self.origin[1],
            self.maximum[2] - self.origin[2],
        ]
    }

    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        (self.origin[0]..=self.maximum[0]).contains(&x)
            && (self.origin[1]..=self.maximum[1]).contains(&y)
            && (self.origin[2]..=self.maximum[2]).contains(&z)
    }
}

/// Rolling-file logging setup for [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`, case-insensitive.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: String,
    /// Also echo warnings and errors to stderr.
    pub duplicate_to_stderr: bool,
}

impl LoggingConfig {
    /// Uses the build-mode default level without stderr echo.
    pub fn new(log_dir: impl Into<String>) -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: log_dir.into(),
            duplicate_to_stderr: false,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, ConfigError, InterpolatorConfig, InterpolatorKind};

    #[test]
    fn interpolator_defaults_are_valid() {
        let config = InterpolatorConfig::default();
        assert_eq!(config.nelements, 10_000);
        assert_eq!(config.interpolator_kind, InterpolatorKind::FiniteDifference);
        config.validate().expect("defaults should validate");
    }

    #[test]
    fn interpolator_json_fills_missing_keys_with_defaults() {
        let config = InterpolatorConfig::from_json(r#"{"nelements": 500, "interpolator_kind": "PLI"}"#)
            .expect("partial payload should decode");
        assert_eq!(config.nelements, 500);
        assert_eq!(config.interpolator_kind, InterpolatorKind::PiecewiseLinear);
        assert_eq!(config.regularisation, 1.0);
    }

    #[test]
    fn interpolator_rejects_negative_weight() {
        let config = InterpolatorConfig {
            cpw: -1.0,
            ..InterpolatorConfig::default()
        };
        let err = config.validate().expect_err("negative weight must fail");
        assert!(matches!(err, ConfigError::InvalidInterpolatorSetting(message) if message.contains("cpw")));
    }

    #[test]
    fn interpolator_rejects_zero_elements_from_json() {
        let err = InterpolatorConfig::from_json(r#"{"nelements": 0}"#)
            .expect_err("zero elements must fail");
        assert!(matches!(err, ConfigError::InvalidInterpolatorSetting(_)));
    }

    #[test]
    fn bounding_box_from_extent_orders_corners() {
        let bbox = BoundingBox::from_extent(100.0, 0.0, 50.0, 10.0, 5.0, -20.0)
            .expect("extent should be valid");
        assert_eq!(bbox.origin, [0.0, 10.0, -20.0]);
        assert_eq!(bbox.maximum, [100.0, 50.0, 5.0]);
        assert_eq!(bbox.extent(), [100.0, 40.0, 25.0]);
        assert!(bbox.contains(1.0, 11.0, 0.0));
        assert!(!bbox.contains(1.0, 11.0, 6.0));
    }

    #[test]
    fn bounding_box_rejects_inverted_axis() {
        let err = BoundingBox::from_extent(0.0, 100.0, 50.0, 10.0, 5.0, -20.0)
            .expect_err("east < west must fail");
        assert!(matches!(err, ConfigError::InvalidBoundingBox { axis: "x", .. }));
    }
}
