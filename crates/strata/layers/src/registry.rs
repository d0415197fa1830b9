use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strata_types::{AbstractionTier, Severity, Violation, ViolationKind, MAX_TIER_SPAN};
use tracing::{debug, info, warn};

use crate::error::LayerError;

/// Scoring weights and report thresholds.
///
/// The constants mirror the historical scoring formulas; changing them
/// changes every published architecture score.
pub mod weights {
    /// Weight of a critical violation in the consistency score.
    pub const CONSISTENCY_CRITICAL: f64 = 0.5;
    /// Weight of a high violation in the consistency score.
    pub const CONSISTENCY_HIGH: f64 = 0.3;

    /// Below this consistency score the report recommends remediation.
    pub const CONSISTENCY_TARGET: f64 = 0.8;
    /// Below this separation score the report recommends remediation.
    pub const SEPARATION_TARGET: f64 = 0.7;
    /// Above this coupling score the report recommends remediation.
    pub const COUPLING_TARGET: f64 = 0.5;
}

/// Sentinel distance for ids outside the canonical tier ordering.
pub const UNKNOWN_DISTANCE: i64 = -1;

/// A registered software layer.
///
/// Immutable after registration apart from the registry-level violation
/// log; re-registering the same id overwrites the whole definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub responsibilities: Vec<String>,
    pub interfaces: Vec<String>,
    pub allowed_dependents: HashSet<String>,
    /// Canonical tier, when the id names one.
    pub tier: Option<AbstractionTier>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

/// Input for [`LayerRegistry::register_layer`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayerSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub allowed_dependents: Vec<String>,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn responsibility(mut self, tag: impl Into<String>) -> Self {
        self.responsibilities.push(tag.into());
        self
    }

    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn allow_dependent(mut self, id: impl Into<String>) -> Self {
        self.allowed_dependents.push(id.into());
        self
    }
}

/// A directed dependency edge between two layers over a named interface.
/// Edges are append-only; the same pair may appear once per interface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub interface: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

/// Envelope returned by a successful cross-layer call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub success: bool,
    pub from: String,
    pub to: String,
    pub interface: String,
    pub payload: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Layer Registry — the dependency-graph authority.
///
/// Owns layer definitions, interface ownership, and the append-only edge
/// and violation logs. Edge validation records violations instead of
/// failing; only [`LayerRegistry::communicate`] returns hard errors.
pub struct LayerRegistry {
    layers: HashMap<String, Layer>,
    /// Interface name → owning layer id.
    interfaces: HashMap<String, String>,
    edges: Vec<DependencyEdge>,
    violations: Vec<Violation>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self {
            layers: HashMap::new(),
            interfaces: HashMap::new(),
            edges: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Register a layer, overwriting any previous definition with the same
    /// id. Every declared interface is recorded as owned by this layer.
    pub fn register_layer(&mut self, spec: LayerSpec) {
        let tier = AbstractionTier::from_layer_id(&spec.id);
        for interface in &spec.interfaces {
            self.interfaces.insert(interface.clone(), spec.id.clone());
        }
        info!(
            layer = %spec.id,
            interfaces = spec.interfaces.len(),
            tier = ?tier,
            "Layer registered"
        );
        self.layers.insert(
            spec.id.clone(),
            Layer {
                id: spec.id,
                name: spec.name,
                responsibilities: spec.responsibilities,
                interfaces: spec.interfaces,
                allowed_dependents: spec.allowed_dependents.into_iter().collect(),
                tier,
                registered_at: chrono::Utc::now(),
            },
        );
    }

    /// Append a dependency edge and validate it.
    ///
    /// Validation checks run in order and stop at the first failure, so a
    /// single call records at most one violation: layer existence, then
    /// dependent authorization, then interface ownership. Never fails.
    pub fn register_dependency(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        interface: impl Into<String>,
    ) {
        let edge = DependencyEdge {
            from: from.into(),
            to: to.into(),
            interface: interface.into(),
            registered_at: chrono::Utc::now(),
        };
        debug!(from = %edge.from, to = %edge.to, interface = %edge.interface, "Dependency registered");

        if let Some(violation) = self.validate_edge(&edge) {
            warn!(
                kind = %violation.kind,
                context = %violation.context,
                "Dependency violation recorded"
            );
            self.violations.push(violation);
        }
        self.edges.push(edge);
    }

    fn validate_edge(&self, edge: &DependencyEdge) -> Option<Violation> {
        let context = format!("{} -> {} [{}]", edge.from, edge.to, edge.interface);

        let target = match (self.layers.get(&edge.from), self.layers.get(&edge.to)) {
            (Some(_), Some(target)) => target,
            _ => {
                let missing = if self.layers.contains_key(&edge.from) {
                    &edge.to
                } else {
                    &edge.from
                };
                return Some(Violation::new(
                    ViolationKind::InvalidDependency,
                    Severity::High,
                    format!("dependency references unregistered layer '{}'", missing),
                    context,
                ));
            }
        };

        if !target.allowed_dependents.contains(&edge.from) {
            return Some(Violation::new(
                ViolationKind::UnauthorizedDependency,
                Severity::High,
                format!(
                    "layer '{}' does not allow '{}' as a dependent",
                    edge.to, edge.from
                ),
                context,
            ));
        }

        match self.interfaces.get(&edge.interface) {
            Some(owner) if owner == &edge.to => None,
            Some(owner) => Some(Violation::new(
                ViolationKind::InterfaceMismatch,
                Severity::Medium,
                format!(
                    "interface '{}' is owned by '{}', not '{}'",
                    edge.interface, owner, edge.to
                ),
                context,
            )),
            None => Some(Violation::new(
                ViolationKind::InterfaceMismatch,
                Severity::Medium,
                format!("interface '{}' is not registered", edge.interface),
                context,
            )),
        }
    }

    /// Simulate a cross-layer call over a registered dependency edge.
    ///
    /// Preconditions are checked in order: matching edge, both layers,
    /// interface existence and ownership. Each failure is a hard error —
    /// a missing edge here is an integration bug, not a governance
    /// outcome. The call crosses one zero-delay asynchronous boundary to
    /// model a future cross-process hop; no real I/O happens.
    pub async fn communicate(
        &self,
        from: &str,
        to: &str,
        interface: &str,
        payload: serde_json::Value,
    ) -> Result<CallEnvelope, LayerError> {
        let edge_exists = self
            .edges
            .iter()
            .any(|e| e.from == from && e.to == to && e.interface == interface);
        if !edge_exists {
            return Err(LayerError::NoDependencyEdge {
                from: from.to_string(),
                to: to.to_string(),
                interface: interface.to_string(),
            });
        }

        for id in [from, to] {
            if !self.layers.contains_key(id) {
                return Err(LayerError::UnknownLayer(id.to_string()));
            }
        }

        match self.interfaces.get(interface) {
            None => {
                return Err(LayerError::UnknownInterface(interface.to_string()));
            }
            Some(owner) if owner != to => {
                return Err(LayerError::InterfaceNotOwned {
                    interface: interface.to_string(),
                    owner: owner.clone(),
                    expected: to.to_string(),
                });
            }
            Some(_) => {}
        }

        // Models the future cross-process hop; resolves on the same thread.
        tokio::task::yield_now().await;

        debug!(from, to, interface, "Cross-layer call completed");
        Ok(CallEnvelope {
            success: true,
            from: from.to_string(),
            to: to.to_string(),
            interface: interface.to_string(),
            payload,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Ordinal distance between two layer ids in the canonical tier
    /// ordering. Returns [`UNKNOWN_DISTANCE`] when either id does not name
    /// a canonical tier.
    pub fn layer_distance(&self, a: &str, b: &str) -> i64 {
        match (
            AbstractionTier::from_layer_id(a),
            AbstractionTier::from_layer_id(b),
        ) {
            (Some(a), Some(b)) => i64::from(AbstractionTier::distance(a, b)),
            _ => UNKNOWN_DISTANCE,
        }
    }

    /// 1 − (0.5·critical + 0.3·high)/total violations, clamped to ≥ 0.
    /// A registry with no violations is perfectly consistent.
    pub fn consistency_score(&self) -> f64 {
        if self.violations.is_empty() {
            return 1.0;
        }
        let critical = self.count_severity(Severity::Critical) as f64;
        let high = self.count_severity(Severity::High) as f64;
        let total = self.violations.len() as f64;
        let score = 1.0
            - (weights::CONSISTENCY_CRITICAL * critical + weights::CONSISTENCY_HIGH * high) / total;
        score.max(0.0)
    }

    /// 1 − edges/(n·(n−1)), clamped to ≥ 0. With fewer than two layers
    /// there is no pair to couple, so separation is perfect.
    pub fn separation_score(&self) -> f64 {
        let n = self.layers.len();
        if n < 2 {
            return 1.0;
        }
        let possible = (n * (n - 1)) as f64;
        (1.0 - self.edges.len() as f64 / possible).max(0.0)
    }

    /// Mean tier distance over edges with distance > 0, normalized by the
    /// maximum possible span. Zero when no edge crosses tiers.
    pub fn coupling_score(&self) -> f64 {
        let distances: Vec<i64> = self
            .edges
            .iter()
            .map(|e| self.layer_distance(&e.from, &e.to))
            .filter(|d| *d > 0)
            .collect();
        if distances.is_empty() {
            return 0.0;
        }
        let mean = distances.iter().sum::<i64>() as f64 / distances.len() as f64;
        mean / f64::from(MAX_TIER_SPAN)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn interface_owner(&self, name: &str) -> Option<&str> {
        self.interfaces.get(name).map(String::as_str)
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn count_severity(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
