//! Geological domain model.
//!
//! # Responsibility
//! - Define the stratigraphic column, fault topology and constraint shapes
//!   the assembler turns into engine features.
//!
//! # Invariants
//! - Column elements are identified by a stable `ElementId`, never by position.
//! - Faults are identified by name.

pub mod colour;
pub mod column;
pub mod constraint;
pub mod fault_topology;
