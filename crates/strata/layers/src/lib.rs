//! # strata-layers
//!
//! Layer Registry — the dependency-graph authority of the Strata
//! governance engine.
//!
//! Owns layer definitions, interface ownership, and the append-only
//! dependency-edge and violation logs. Edge validation is a governance
//! outcome (violations are recorded, never thrown); simulated cross-layer
//! calls are the only hard-failure surface.
//!
//! ## Core Components
//!
//! - **LayerRegistry** — registration, edge validation, tier distance and
//!   the three architecture quality scores
//! - **ArchitectureReport** — JSON-shaped snapshot with violation tallies
//!   and threshold-driven recommendations

#![deny(unsafe_code)]

pub mod error;
pub mod registry;
pub mod report;

pub use error::LayerError;
pub use registry::{
    weights, CallEnvelope, DependencyEdge, Layer, LayerRegistry, LayerSpec, UNKNOWN_DISTANCE,
};
pub use report::{ArchitectureReport, LayerSummary, QualityScores};
