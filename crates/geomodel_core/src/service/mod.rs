//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate column, topology and data edits into engine builds.
//! - Keep host UI layers decoupled from engine details.

pub mod assembler;
