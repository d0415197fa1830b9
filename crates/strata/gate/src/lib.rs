//! # strata-gate
//!
//! Feature Gate — the admission authority of the Strata governance
//! engine.
//!
//! Evaluates candidate features against declarative policies plus reports
//! pulled from the layer registry and the stability tracker. A denial is
//! a governance outcome carried in the verdict, never an error; hard
//! errors are reserved for unknown features and poisoned locks.
//!
//! ## Core Components
//!
//! - **FeatureGateEngine** — feature lifecycle, policy evaluation and the
//!   append-only evaluation log
//! - **GatePolicy** — named rule sets over a closed condition/action
//!   vocabulary
//! - **GateVerdict** — per-category results with remediation
//!   recommendations
//! - **FeatureGateReport** — JSON-shaped snapshot of the gate's state

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod policy;
pub mod report;

pub use engine::{CategoryResult, EvaluationRecord, FeatureGateEngine, GateVerdict};
pub use error::GateError;
pub use policy::{
    thresholds, EvaluationContext, GateFeature, GateFeatureSpec, GatePolicy, GateRule, RuleAction,
    RuleCondition,
};
pub use report::FeatureGateReport;
