//! Sampled spatial input data.
//!
//! # Responsibility
//! - Sample vector features into located attribute rows.
//! - Hold per-unit and per-fault observations between rebuilds.

pub mod sampler;
pub mod spatial_store;
