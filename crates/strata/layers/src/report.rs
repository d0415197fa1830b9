use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_types::{AbstractionTier, Recommendation, Severity, Violation, ViolationKind};
use tracing::debug;

use crate::registry::{weights, LayerRegistry};

/// Condensed view of one registered layer for the report surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<AbstractionTier>,
    pub responsibilities: Vec<String>,
    pub interface_count: usize,
    pub allowed_dependent_count: usize,
}

/// The three architecture quality scores, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct QualityScores {
    pub consistency: f64,
    pub separation: f64,
    pub coupling: f64,
}

/// Snapshot report over the layer graph: definitions, dependency volume,
/// violation tallies, quality scores and remediation recommendations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchitectureReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub layers: Vec<LayerSummary>,
    pub interface_count: usize,
    pub dependency_count: usize,
    pub violation_count: usize,
    pub violations_by_kind: HashMap<ViolationKind, usize>,
    pub violations_by_severity: HashMap<Severity, usize>,
    pub violations: Vec<Violation>,
    pub scores: QualityScores,
    pub recommendations: Vec<Recommendation>,
}

impl LayerRegistry {
    /// Generate a point-in-time architecture report.
    pub fn generate_report(&self) -> ArchitectureReport {
        let mut layers: Vec<LayerSummary> = self
            .layers()
            .map(|layer| LayerSummary {
                id: layer.id.clone(),
                name: layer.name.clone(),
                tier: layer.tier,
                responsibilities: layer.responsibilities.clone(),
                interface_count: layer.interfaces.len(),
                allowed_dependent_count: layer.allowed_dependents.len(),
            })
            .collect();
        layers.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_kind: HashMap<ViolationKind, usize> = HashMap::new();
        let mut by_severity: HashMap<Severity, usize> = HashMap::new();
        for violation in self.violations() {
            *by_kind.entry(violation.kind).or_insert(0) += 1;
            *by_severity.entry(violation.severity).or_insert(0) += 1;
        }

        let scores = QualityScores {
            consistency: self.consistency_score(),
            separation: self.separation_score(),
            coupling: self.coupling_score(),
        };

        let recommendations = recommend(&scores);
        debug!(
            layers = layers.len(),
            violations = self.violations().len(),
            recommendations = recommendations.len(),
            "Architecture report generated"
        );

        ArchitectureReport {
            timestamp: chrono::Utc::now(),
            layers,
            interface_count: self.layers().map(|l| l.interfaces.len()).sum(),
            dependency_count: self.edges().len(),
            violation_count: self.violations().len(),
            violations_by_kind: by_kind,
            violations_by_severity: by_severity,
            violations: self.violations().to_vec(),
            scores,
            recommendations,
        }
    }
}

fn recommend(scores: &QualityScores) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if scores.consistency < weights::CONSISTENCY_TARGET {
        recommendations.push(Recommendation {
            kind: "consistency".into(),
            priority: Severity::High,
            action: "resolve critical and high violations to improve architectural consistency"
                .into(),
            current: scores.consistency,
            target: weights::CONSISTENCY_TARGET,
        });
    }
    if scores.separation < weights::SEPARATION_TARGET {
        recommendations.push(Recommendation {
            kind: "separation".into(),
            priority: Severity::Medium,
            action: "reduce cross-layer coupling by removing dependency edges".into(),
            current: scores.separation,
            target: weights::SEPARATION_TARGET,
        });
    }
    if scores.coupling > weights::COUPLING_TARGET {
        recommendations.push(Recommendation {
            kind: "coupling".into(),
            priority: Severity::Medium,
            action: "reduce the tier distance of cross-layer calls".into(),
            current: scores.coupling,
            target: weights::COUPLING_TARGET,
        });
    }

    recommendations
}
