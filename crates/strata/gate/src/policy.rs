use serde::{Deserialize, Serialize};
use strata_layers::ArchitectureReport;
use strata_stability::DesignQualityReport;
use strata_types::{AbstractionTier, ChangeImpact, FeatureState, Priority, ViolationKind};

/// Rule-evaluation thresholds.
pub mod thresholds {
    /// Mean test coverage below this triggers `TestCoverageLow`.
    pub const RULE_COVERAGE_FLOOR: f64 = 0.8;
    /// Aggregate debt above this triggers `TechnicalDebtHigh`.
    pub const RULE_DEBT_CEILING: f64 = 0.7;
    /// Largest tier distance a feature may span before abstraction levels
    /// count as mixed.
    pub const MAX_ABSTRACTION_SPAN: u32 = 2;
}

/// The closed set of conditions a gate rule can test.
///
/// Every condition is evaluated against the candidate feature, the
/// evaluation context, and the two pulled reports; there is no unknown
/// fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCondition {
    /// Any critical-priority feature sits below the stability floor.
    CriticalFeaturesUnstable,
    /// Mean test coverage is below [`thresholds::RULE_COVERAGE_FLOOR`].
    TestCoverageLow,
    /// Aggregate debt exceeds [`thresholds::RULE_DEBT_CEILING`].
    TechnicalDebtHigh,
    /// The candidate spans more than the permitted tier distance.
    MixedAbstractionLevels,
    /// The layer graph carries unauthorized dependency violations.
    UnauthorizedLayerDependency,
    /// The candidate is still in the proposed state.
    NewFeature,
    /// The declared change impact is major or critical.
    BreakingChange,
}

/// What a matching rule does to the verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleAction {
    /// Fail the evaluation.
    Block,
    /// Record a medium-severity violation without failing.
    Warn,
    /// Fail unless the context carries an explicit approval.
    RequireApproval,
    /// Fail unless the context carries a migration plan.
    RequireMigrationPlan,
}

/// A single rule within a gate policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateRule {
    pub condition: RuleCondition,
    pub action: RuleAction,
    pub message: String,
}

/// A named, ordered collection of gate rules. Policies are configured at
/// startup and treated as immutable during evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatePolicy {
    pub name: String,
    pub rules: Vec<GateRule>,
}

impl GatePolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn rule(
        mut self,
        condition: RuleCondition,
        action: RuleAction,
        message: impl Into<String>,
    ) -> Self {
        self.rules.push(GateRule {
            condition,
            action,
            message: message.into(),
        });
        self
    }
}

/// A feature as the gate engine sees it: lifecycle state plus the inputs
/// the evaluation categories need.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateFeature {
    pub name: String,
    pub priority: Priority,
    pub state: FeatureState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstraction_level: Option<AbstractionTier>,
    pub dependencies: Vec<String>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub state_changed_at: chrono::DateTime<chrono::Utc>,
}

/// Input for feature registration with the gate engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateFeatureSpec {
    pub name: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<FeatureState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstraction_level: Option<AbstractionTier>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl GateFeatureSpec {
    pub fn new(name: impl Into<String>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            priority,
            state: None,
            abstraction_level: None,
            dependencies: Vec::new(),
        }
    }

    pub fn state(mut self, state: FeatureState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn abstraction_level(mut self, tier: AbstractionTier) -> Self {
        self.abstraction_level = Some(tier);
        self
    }

    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

/// Caller-supplied context for one evaluation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// An explicit approval satisfying `RequireApproval` rules.
    #[serde(default)]
    pub approved: bool,
    /// A migration plan satisfying `RequireMigrationPlan` rules.
    #[serde(default)]
    pub migration_plan: bool,
    /// Declared magnitude of the change, for `BreakingChange` rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ChangeImpact>,
}

/// Evaluate one rule condition against the candidate and the pulled
/// reports.
pub fn condition_holds(
    condition: RuleCondition,
    feature: &GateFeature,
    context: &EvaluationContext,
    architecture: &ArchitectureReport,
    quality: &DesignQualityReport,
) -> bool {
    match condition {
        RuleCondition::CriticalFeaturesUnstable => !quality.unstable_critical_features.is_empty(),
        RuleCondition::TestCoverageLow => {
            quality.test_coverage < thresholds::RULE_COVERAGE_FLOOR
        }
        RuleCondition::TechnicalDebtHigh => quality.debt_level > thresholds::RULE_DEBT_CEILING,
        RuleCondition::MixedAbstractionLevels => !abstraction_conflicts(feature, architecture).is_empty(),
        RuleCondition::UnauthorizedLayerDependency => architecture
            .violations_by_kind
            .get(&ViolationKind::UnauthorizedDependency)
            .is_some_and(|count| *count > 0),
        RuleCondition::NewFeature => feature.state == FeatureState::Proposed,
        RuleCondition::BreakingChange => context.impact.is_some_and(|i| i.is_breaking()),
    }
}

/// Layers whose tier sits further than the permitted span from the
/// candidate's abstraction level. Each entry is (layer id, distance).
pub fn abstraction_conflicts(
    feature: &GateFeature,
    architecture: &ArchitectureReport,
) -> Vec<(String, u32)> {
    let Some(feature_tier) = feature.abstraction_level else {
        return Vec::new();
    };
    architecture
        .layers
        .iter()
        .filter_map(|layer| {
            let tier = layer.tier?;
            let distance = AbstractionTier::distance(feature_tier, tier);
            (distance > thresholds::MAX_ABSTRACTION_SPAN).then(|| (layer.id.clone(), distance))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_layers::{LayerRegistry, LayerSpec};
    use strata_stability::{FeatureConfig, StabilityTracker};

    fn proposed_feature(tier: Option<AbstractionTier>) -> GateFeature {
        GateFeature {
            name: "candidate".into(),
            priority: Priority::Medium,
            state: FeatureState::Proposed,
            abstraction_level: tier,
            dependencies: Vec::new(),
            registered_at: chrono::Utc::now(),
            state_changed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn coverage_and_debt_conditions_follow_the_quality_report() {
        let mut tracker = StabilityTracker::new();
        tracker.register_feature(
            "old",
            FeatureConfig {
                test_coverage: Some(0.5),
                ..FeatureConfig::default()
            },
        );
        let quality = tracker.generate_design_quality_report();
        let architecture = LayerRegistry::new().generate_report();
        let feature = proposed_feature(None);
        let context = EvaluationContext::default();

        assert!(condition_holds(
            RuleCondition::TestCoverageLow,
            &feature,
            &context,
            &architecture,
            &quality
        ));
        assert!(!condition_holds(
            RuleCondition::TechnicalDebtHigh,
            &feature,
            &context,
            &architecture,
            &quality
        ));
    }

    #[test]
    fn unauthorized_dependency_condition_follows_the_layer_report() {
        let mut registry = LayerRegistry::new();
        registry.register_layer(LayerSpec::new("dom", "DOM"));
        registry.register_layer(LayerSpec::new("system", "System"));
        registry.register_dependency("dom", "system", "x");

        let architecture = registry.generate_report();
        let quality = StabilityTracker::new().generate_design_quality_report();
        let feature = proposed_feature(None);

        assert!(condition_holds(
            RuleCondition::UnauthorizedLayerDependency,
            &feature,
            &EvaluationContext::default(),
            &architecture,
            &quality
        ));
    }

    #[test]
    fn new_feature_and_breaking_change_conditions() {
        let architecture = LayerRegistry::new().generate_report();
        let quality = StabilityTracker::new().generate_design_quality_report();
        let mut feature = proposed_feature(None);

        let context = EvaluationContext::default();
        assert!(condition_holds(
            RuleCondition::NewFeature,
            &feature,
            &context,
            &architecture,
            &quality
        ));

        feature.state = FeatureState::Testing;
        assert!(!condition_holds(
            RuleCondition::NewFeature,
            &feature,
            &context,
            &architecture,
            &quality
        ));

        let context = EvaluationContext {
            impact: Some(ChangeImpact::Major),
            ..EvaluationContext::default()
        };
        assert!(condition_holds(
            RuleCondition::BreakingChange,
            &feature,
            &context,
            &architecture,
            &quality
        ));
    }

    #[test]
    fn abstraction_conflicts_respect_the_span() {
        let mut registry = LayerRegistry::new();
        registry.register_layer(LayerSpec::new("dom", "DOM"));
        registry.register_layer(LayerSpec::new("service", "Service"));
        let architecture = registry.generate_report();

        // System-tier feature: dom is 4 away, service only 2.
        let feature = proposed_feature(Some(AbstractionTier::System));
        let conflicts = abstraction_conflicts(&feature, &architecture);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0], ("dom".to_string(), 4));

        // No declared tier: nothing to conflict with.
        let feature = proposed_feature(None);
        assert!(abstraction_conflicts(&feature, &architecture).is_empty());
    }
}
