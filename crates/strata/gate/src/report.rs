use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_types::{FeatureState, Recommendation};
use tracing::debug;

use crate::engine::{EvaluationRecord, FeatureGateEngine};

/// Point-in-time snapshot of the gate: registered features by lifecycle
/// state, configured policies, and the evaluation history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureGateReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub feature_count: usize,
    pub features_by_state: HashMap<FeatureState, usize>,
    pub policy_count: usize,
    pub rule_count: usize,
    pub evaluation_count: usize,
    pub allowed_count: usize,
    pub denied_count: usize,
    /// The most recent evaluation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluation: Option<EvaluationRecord>,
    /// Remediation steps from the most recent denial, if any.
    pub recommendations: Vec<Recommendation>,
}

impl FeatureGateEngine {
    pub fn generate_report(&self) -> FeatureGateReport {
        let mut features_by_state: HashMap<FeatureState, usize> = HashMap::new();
        for feature in self.features() {
            *features_by_state.entry(feature.state).or_insert(0) += 1;
        }

        let evaluations = self.evaluations();
        let allowed_count = evaluations.iter().filter(|e| e.allowed).count();
        let recommendations = evaluations
            .iter()
            .rev()
            .find(|e| !e.allowed)
            .map(|e| e.recommendations.clone())
            .unwrap_or_default();

        debug!(
            features = self.features().count(),
            evaluations = evaluations.len(),
            "Feature gate report generated"
        );

        FeatureGateReport {
            timestamp: chrono::Utc::now(),
            feature_count: self.features().count(),
            features_by_state,
            policy_count: self.policies().len(),
            rule_count: self.policies().iter().map(|p| p.rules.len()).sum(),
            evaluation_count: evaluations.len(),
            allowed_count,
            denied_count: evaluations.len() - allowed_count,
            last_evaluation: evaluations.last().cloned(),
            recommendations,
        }
    }
}
