use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use strata_layers::{ArchitectureReport, LayerRegistry};
use strata_stability::{weights as stability_weights, DesignQualityReport, StabilityTracker};
use strata_types::{FeatureState, Recommendation, Severity, Violation, ViolationKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::GateError;
use crate::policy::{
    abstraction_conflicts, condition_holds, thresholds, EvaluationContext, GateFeature,
    GateFeatureSpec, GatePolicy, RuleAction,
};

/// Outcome of one evaluation category.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryResult {
    pub passed: bool,
    pub reasons: Vec<String>,
    pub violations: Vec<Violation>,
}

impl CategoryResult {
    fn pass() -> Self {
        Self {
            passed: true,
            reasons: Vec::new(),
            violations: Vec::new(),
        }
    }
}

/// The gate's admit/deny decision for one candidate feature.
///
/// A governance outcome, never an error: `allowed` is the logical AND of
/// the four category results, and every failing category contributes one
/// remediation recommendation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateVerdict {
    pub decision_id: String,
    pub feature: String,
    pub allowed: bool,
    pub reason: String,
    pub policy: CategoryResult,
    pub stability: CategoryResult,
    pub abstraction: CategoryResult,
    pub dependencies: CategoryResult,
    pub recommendations: Vec<Recommendation>,
    pub evaluated_at: chrono::DateTime<chrono::Utc>,
}

/// Condensed record of one evaluation, kept in insertion order for the
/// report's most-recent queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub decision_id: String,
    pub feature: String,
    pub allowed: bool,
    pub reason: String,
    pub recommendations: Vec<Recommendation>,
    pub evaluated_at: chrono::DateTime<chrono::Utc>,
}

/// Feature Gate Engine — the admission authority.
///
/// Evaluates a candidate feature against the configured policies plus
/// reports pulled from the layer registry and the stability tracker. The
/// two collaborators are constructor-injected behind a shared lock; the
/// engine only ever reads them.
pub struct FeatureGateEngine {
    layers: Arc<RwLock<LayerRegistry>>,
    stability: Arc<RwLock<StabilityTracker>>,
    policies: Vec<GatePolicy>,
    features: HashMap<String, GateFeature>,
    evaluations: Vec<EvaluationRecord>,
}

impl FeatureGateEngine {
    pub fn new(
        layers: Arc<RwLock<LayerRegistry>>,
        stability: Arc<RwLock<StabilityTracker>>,
    ) -> Self {
        Self {
            layers,
            stability,
            policies: Vec::new(),
            features: HashMap::new(),
            evaluations: Vec::new(),
        }
    }

    /// Add a policy. Policies are configured at startup and are not
    /// mutated once evaluation begins.
    pub fn add_policy(&mut self, policy: GatePolicy) {
        info!(policy = %policy.name, rules = policy.rules.len(), "Gate policy added");
        self.policies.push(policy);
    }

    pub fn policies(&self) -> &[GatePolicy] {
        &self.policies
    }

    /// Register a feature with the gate. New features start in the
    /// proposed state unless an initial state is given.
    pub fn register_feature(&mut self, spec: GateFeatureSpec) {
        let now = chrono::Utc::now();
        let state = spec.state.unwrap_or(FeatureState::Proposed);
        info!(feature = %spec.name, state = %state, "Gate feature registered");
        self.features.insert(
            spec.name.clone(),
            GateFeature {
                name: spec.name,
                priority: spec.priority,
                state,
                abstraction_level: spec.abstraction_level,
                dependencies: spec.dependencies,
                registered_at: now,
                state_changed_at: now,
            },
        );
    }

    pub fn feature(&self, name: &str) -> Option<&GateFeature> {
        self.features.get(name)
    }

    pub fn features(&self) -> impl Iterator<Item = &GateFeature> {
        self.features.values()
    }

    pub fn evaluations(&self) -> &[EvaluationRecord] {
        &self.evaluations
    }

    /// Set a feature's lifecycle state.
    ///
    /// The state is overwritten unconditionally and timestamped; the
    /// documented lifecycle order is advisory, so any state can be set
    /// administratively. A transition that is not the documented next
    /// step is logged at warn level.
    pub fn update_feature_state(
        &mut self,
        name: &str,
        new_state: FeatureState,
    ) -> Result<(), GateError> {
        let feature = self
            .features
            .get_mut(name)
            .ok_or_else(|| GateError::UnknownFeature(name.to_string()))?;

        let previous = feature.state;
        if previous != new_state && previous.documented_next() != Some(new_state) {
            warn!(
                feature = %name,
                from = %previous,
                to = %new_state,
                "Feature state set outside the documented lifecycle order"
            );
        }
        feature.state = new_state;
        feature.state_changed_at = chrono::Utc::now();
        info!(feature = %name, state = %new_state, "Feature state updated");
        Ok(())
    }

    /// Evaluate whether `name` may be admitted.
    ///
    /// Pulls one architecture report and one design-quality report, then
    /// runs the four categories: policy rules, stability, abstraction,
    /// dependencies. The verdict is appended to the evaluation log.
    pub fn can_add_feature(
        &mut self,
        name: &str,
        context: &EvaluationContext,
    ) -> Result<GateVerdict, GateError> {
        let feature = self
            .features
            .get(name)
            .ok_or_else(|| GateError::UnknownFeature(name.to_string()))?
            .clone();

        let architecture = self
            .layers
            .read()
            .map_err(|_| GateError::LockPoisoned("layer registry"))?
            .generate_report();
        let quality = self
            .stability
            .read()
            .map_err(|_| GateError::LockPoisoned("stability tracker"))?
            .generate_design_quality_report();

        let policy = self.check_policies(&feature, context, &architecture, &quality);
        let stability = check_stability(&feature, &quality);
        let conflicts = abstraction_conflicts(&feature, &architecture);
        let abstraction = check_abstraction(&feature, &conflicts);
        let dependencies = self.check_dependencies(&feature);

        let allowed = policy.passed && stability.passed && abstraction.passed && dependencies.passed;
        let reason = if allowed {
            "all gate checks passed".to_string()
        } else {
            let failing: Vec<&str> = [
                (!policy.passed).then_some("policy"),
                (!stability.passed).then_some("stability"),
                (!abstraction.passed).then_some("abstraction"),
                (!dependencies.passed).then_some("dependencies"),
            ]
            .into_iter()
            .flatten()
            .collect();
            format!("gate checks failed: {}", failing.join(", "))
        };

        let max_conflict = conflicts.iter().map(|(_, d)| *d).max();
        let recommendations = recommend(
            &policy,
            &stability,
            &abstraction,
            &dependencies,
            &quality,
            max_conflict,
        );

        let verdict = GateVerdict {
            decision_id: Uuid::new_v4().to_string(),
            feature: feature.name.clone(),
            allowed,
            reason: reason.clone(),
            policy,
            stability,
            abstraction,
            dependencies,
            recommendations: recommendations.clone(),
            evaluated_at: chrono::Utc::now(),
        };

        if allowed {
            debug!(feature = %feature.name, decision = %verdict.decision_id, "Feature admitted");
        } else {
            info!(
                feature = %feature.name,
                decision = %verdict.decision_id,
                reason = %reason,
                "Feature denied"
            );
        }

        self.evaluations.push(EvaluationRecord {
            decision_id: verdict.decision_id.clone(),
            feature: verdict.feature.clone(),
            allowed,
            reason,
            recommendations,
            evaluated_at: verdict.evaluated_at,
        });

        Ok(verdict)
    }

    fn check_policies(
        &self,
        feature: &GateFeature,
        context: &EvaluationContext,
        architecture: &ArchitectureReport,
        quality: &DesignQualityReport,
    ) -> CategoryResult {
        let mut result = CategoryResult::pass();

        for policy in &self.policies {
            for rule in &policy.rules {
                if !condition_holds(rule.condition, feature, context, architecture, quality) {
                    continue;
                }
                let rule_context = format!("policy '{}'", policy.name);
                debug!(policy = %policy.name, condition = ?rule.condition, "Gate rule matched");

                match rule.action {
                    RuleAction::Block => {
                        result.passed = false;
                        result.reasons.push(rule.message.clone());
                        result.violations.push(Violation::new(
                            ViolationKind::PolicyRule,
                            Severity::High,
                            rule.message.clone(),
                            rule_context,
                        ));
                    }
                    RuleAction::Warn => {
                        result.violations.push(Violation::new(
                            ViolationKind::PolicyRule,
                            Severity::Medium,
                            rule.message.clone(),
                            rule_context,
                        ));
                    }
                    RuleAction::RequireApproval => {
                        if !context.approved {
                            result.passed = false;
                            result
                                .reasons
                                .push(format!("approval required: {}", rule.message));
                            result.violations.push(Violation::new(
                                ViolationKind::PolicyRule,
                                Severity::High,
                                format!("approval required: {}", rule.message),
                                rule_context,
                            ));
                        }
                    }
                    RuleAction::RequireMigrationPlan => {
                        if !context.migration_plan {
                            result.passed = false;
                            result
                                .reasons
                                .push(format!("migration plan required: {}", rule.message));
                            result.violations.push(Violation::new(
                                ViolationKind::PolicyRule,
                                Severity::High,
                                format!("migration plan required: {}", rule.message),
                                rule_context,
                            ));
                        }
                    }
                }
            }
        }

        result
    }

    fn check_dependencies(&self, feature: &GateFeature) -> CategoryResult {
        let mut result = CategoryResult::pass();

        for dependency in &feature.dependencies {
            match self.features.get(dependency) {
                None => {
                    result.passed = false;
                    result
                        .reasons
                        .push(format!("dependency '{}' is not registered", dependency));
                    result.violations.push(Violation::new(
                        ViolationKind::MissingDependency,
                        Severity::High,
                        format!("dependency '{}' is not registered", dependency),
                        feature.name.clone(),
                    ));
                }
                Some(dep) if dep.state != FeatureState::Stable => {
                    result.passed = false;
                    result.reasons.push(format!(
                        "dependency '{}' is in state {}, not stable",
                        dependency, dep.state
                    ));
                    result.violations.push(Violation::new(
                        ViolationKind::UnstableDependency,
                        Severity::High,
                        format!(
                            "dependency '{}' is in state {}, not stable",
                            dependency, dep.state
                        ),
                        feature.name.clone(),
                    ));
                }
                Some(_) => {}
            }
        }

        result
    }
}

fn check_stability(feature: &GateFeature, quality: &DesignQualityReport) -> CategoryResult {
    let mut result = CategoryResult::pass();

    if !quality.unstable_critical_features.is_empty() {
        result.passed = false;
        result.reasons.push(format!(
            "{}-priority candidate blocked: critical features below stability floor: {}",
            feature.priority,
            quality.unstable_critical_features.join(", ")
        ));
    }
    if quality.test_coverage < stability_weights::COVERAGE_TARGET {
        result.passed = false;
        result.reasons.push(format!(
            "{}-priority candidate blocked: mean test coverage {:.2} below {:.2}",
            feature.priority,
            quality.test_coverage,
            stability_weights::COVERAGE_TARGET
        ));
    }

    result
}

fn check_abstraction(feature: &GateFeature, conflicts: &[(String, u32)]) -> CategoryResult {
    let mut result = CategoryResult::pass();

    for (layer, distance) in conflicts {
        result.passed = false;
        result.reasons.push(format!(
            "abstraction level is {} tiers away from layer '{}'",
            distance, layer
        ));
        result.violations.push(Violation::new(
            ViolationKind::AbstractionLevelInconsistency,
            Severity::Medium,
            format!(
                "feature abstraction level is {} tiers away from layer '{}'",
                distance, layer
            ),
            feature.name.clone(),
        ));
    }

    result
}

fn recommend(
    policy: &CategoryResult,
    stability: &CategoryResult,
    abstraction: &CategoryResult,
    dependencies: &CategoryResult,
    quality: &DesignQualityReport,
    max_conflict_distance: Option<u32>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !policy.passed {
        let blocking = policy
            .violations
            .iter()
            .filter(|v| v.severity == Severity::High)
            .count();
        recommendations.push(Recommendation {
            kind: "policy".into(),
            priority: Severity::High,
            action: "resolve blocking policy rules or supply the required approvals".into(),
            current: blocking as f64,
            target: 0.0,
        });
    }
    if !stability.passed {
        if quality.test_coverage < stability_weights::COVERAGE_TARGET {
            recommendations.push(Recommendation {
                kind: "stability".into(),
                priority: Severity::High,
                action: "raise mean test coverage across registered features".into(),
                current: quality.test_coverage,
                target: stability_weights::COVERAGE_TARGET,
            });
        } else {
            recommendations.push(Recommendation {
                kind: "stability".into(),
                priority: Severity::Critical,
                action: "stabilize critical-priority features before admitting new ones".into(),
                current: quality.average_stability,
                target: stability_weights::CRITICAL_STABILITY_FLOOR,
            });
        }
    }
    if !abstraction.passed {
        recommendations.push(Recommendation {
            kind: "abstraction".into(),
            priority: Severity::Medium,
            action: "narrow the feature's abstraction span to at most two tiers".into(),
            current: f64::from(max_conflict_distance.unwrap_or(0)),
            target: f64::from(thresholds::MAX_ABSTRACTION_SPAN),
        });
    }
    if !dependencies.passed {
        recommendations.push(Recommendation {
            kind: "dependencies".into(),
            priority: Severity::High,
            action: "stabilize or register the feature's declared dependencies".into(),
            current: dependencies.violations.len() as f64,
            target: 0.0,
        });
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RuleCondition;
    use strata_layers::LayerSpec;
    use strata_stability::{FeatureConfig, FeatureRequirements};
    use strata_types::{AbstractionTier, ChangeImpact, Priority};

    fn wired_engine() -> (
        Arc<RwLock<LayerRegistry>>,
        Arc<RwLock<StabilityTracker>>,
        FeatureGateEngine,
    ) {
        let layers = Arc::new(RwLock::new(LayerRegistry::new()));
        let stability = Arc::new(RwLock::new(StabilityTracker::new()));
        let engine = FeatureGateEngine::new(layers.clone(), stability.clone());
        (layers, stability, engine)
    }

    fn solid_feature(coverage: f64) -> FeatureConfig {
        FeatureConfig {
            test_coverage: Some(coverage),
            documented: true,
            months_in_use: Some(12.0),
            bug_rate: Some(0.0),
            ..FeatureConfig::default()
        }
    }

    #[test]
    fn empty_engine_admits_a_registered_feature() {
        let (_, _, mut engine) = wired_engine();
        engine.register_feature(GateFeatureSpec::new("checkout", Priority::Medium));

        let verdict = engine
            .can_add_feature("checkout", &EvaluationContext::default())
            .unwrap();
        assert!(verdict.allowed);
        assert_eq!(verdict.reason, "all gate checks passed");
        assert!(verdict.recommendations.is_empty());
    }

    #[test]
    fn unknown_feature_is_a_hard_error() {
        let (_, _, mut engine) = wired_engine();
        let result = engine.can_add_feature("ghost", &EvaluationContext::default());
        assert!(matches!(result, Err(GateError::UnknownFeature(name)) if name == "ghost"));
    }

    #[test]
    fn blocking_rule_on_low_coverage_denies() {
        let (_, stability, mut engine) = wired_engine();
        stability
            .write()
            .unwrap()
            .register_feature("legacy", solid_feature(0.5));

        engine.add_policy(GatePolicy::new("quality-bar").rule(
            RuleCondition::TestCoverageLow,
            RuleAction::Block,
            "test coverage must reach 0.8 before new features",
        ));
        engine.register_feature(GateFeatureSpec::new("checkout", Priority::Medium));

        let verdict = engine
            .can_add_feature("checkout", &EvaluationContext::default())
            .unwrap();
        assert!(!verdict.allowed);
        assert!(verdict
            .policy
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::PolicyRule
                && v.message.contains("test coverage must reach 0.8")));
        // The stability category fails independently on the 0.9 target.
        assert!(!verdict.stability.passed);
    }

    #[test]
    fn warn_rule_records_without_denying() {
        let (_, _, mut engine) = wired_engine();
        engine.add_policy(GatePolicy::new("visibility").rule(
            RuleCondition::NewFeature,
            RuleAction::Warn,
            "proposed features get extra review",
        ));
        engine.register_feature(GateFeatureSpec::new("checkout", Priority::Low));

        let verdict = engine
            .can_add_feature("checkout", &EvaluationContext::default())
            .unwrap();
        assert!(verdict.allowed);
        assert_eq!(verdict.policy.violations.len(), 1);
        assert_eq!(verdict.policy.violations[0].severity, Severity::Medium);
    }

    #[test]
    fn approval_rule_honors_the_context() {
        let (_, _, mut engine) = wired_engine();
        engine.add_policy(GatePolicy::new("sign-off").rule(
            RuleCondition::NewFeature,
            RuleAction::RequireApproval,
            "proposed features need a sign-off",
        ));
        engine.register_feature(GateFeatureSpec::new("checkout", Priority::Low));

        let denied = engine
            .can_add_feature("checkout", &EvaluationContext::default())
            .unwrap();
        assert!(!denied.allowed);
        assert!(denied.reason.contains("policy"));

        let approved = engine
            .can_add_feature(
                "checkout",
                &EvaluationContext {
                    approved: true,
                    ..EvaluationContext::default()
                },
            )
            .unwrap();
        assert!(approved.allowed);
    }

    #[test]
    fn migration_plan_rule_honors_the_context() {
        let (_, _, mut engine) = wired_engine();
        engine.add_policy(GatePolicy::new("compat").rule(
            RuleCondition::BreakingChange,
            RuleAction::RequireMigrationPlan,
            "breaking changes need a migration plan",
        ));
        engine.register_feature(GateFeatureSpec::new("v2-api", Priority::High));

        let context = EvaluationContext {
            impact: Some(ChangeImpact::Major),
            ..EvaluationContext::default()
        };
        assert!(!engine.can_add_feature("v2-api", &context).unwrap().allowed);

        let context = EvaluationContext {
            impact: Some(ChangeImpact::Major),
            migration_plan: true,
            ..EvaluationContext::default()
        };
        assert!(engine.can_add_feature("v2-api", &context).unwrap().allowed);
    }

    #[test]
    fn dependency_on_non_stable_feature_denies() {
        let (_, _, mut engine) = wired_engine();
        engine.register_feature(
            GateFeatureSpec::new("search", Priority::Medium).state(FeatureState::Testing),
        );
        engine.register_feature(
            GateFeatureSpec::new("search-ui", Priority::Medium).dependency("search"),
        );

        let verdict = engine
            .can_add_feature("search-ui", &EvaluationContext::default())
            .unwrap();
        assert!(!verdict.allowed);
        assert!(verdict
            .dependencies
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::UnstableDependency && v.message.contains("search")));
    }

    #[test]
    fn missing_dependency_denies() {
        let (_, _, mut engine) = wired_engine();
        engine.register_feature(
            GateFeatureSpec::new("search-ui", Priority::Medium).dependency("search"),
        );

        let verdict = engine
            .can_add_feature("search-ui", &EvaluationContext::default())
            .unwrap();
        assert!(!verdict.allowed);
        assert!(verdict
            .dependencies
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::MissingDependency));
    }

    #[test]
    fn stable_dependency_passes() {
        let (_, _, mut engine) = wired_engine();
        engine.register_feature(
            GateFeatureSpec::new("search", Priority::Medium).state(FeatureState::Stable),
        );
        engine.register_feature(
            GateFeatureSpec::new("search-ui", Priority::Medium).dependency("search"),
        );

        let verdict = engine
            .can_add_feature("search-ui", &EvaluationContext::default())
            .unwrap();
        assert!(verdict.allowed);
    }

    #[test]
    fn distant_layer_fails_the_abstraction_category() {
        let (layers, _, mut engine) = wired_engine();
        layers
            .write()
            .unwrap()
            .register_layer(LayerSpec::new("dom", "DOM"));

        engine.register_feature(
            GateFeatureSpec::new("kernel-hooks", Priority::High)
                .abstraction_level(AbstractionTier::System),
        );

        let verdict = engine
            .can_add_feature("kernel-hooks", &EvaluationContext::default())
            .unwrap();
        assert!(!verdict.allowed);
        assert!(!verdict.abstraction.passed);
        assert!(verdict
            .abstraction
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::AbstractionLevelInconsistency));
        let rec = verdict
            .recommendations
            .iter()
            .find(|r| r.kind == "abstraction")
            .expect("abstraction recommendation");
        assert_eq!(rec.current, 4.0);
        assert_eq!(rec.target, 2.0);
    }

    #[test]
    fn unstable_critical_feature_fails_the_stability_category() {
        let (_, stability, mut engine) = wired_engine();
        {
            let mut tracker = stability.write().unwrap();
            tracker.register_feature(
                "payments",
                FeatureConfig {
                    priority: Priority::Critical,
                    test_coverage: Some(1.0),
                    bug_rate: Some(0.9),
                    ..FeatureConfig::default()
                },
            );
        }
        engine.register_feature(GateFeatureSpec::new("checkout", Priority::High));

        let verdict = engine
            .can_add_feature("checkout", &EvaluationContext::default())
            .unwrap();
        assert!(!verdict.allowed);
        assert!(verdict
            .stability
            .reasons
            .iter()
            .any(|r| r.contains("payments") && r.contains("high-priority")));
    }

    #[test]
    fn update_feature_state_overwrites_and_timestamps() {
        let (_, _, mut engine) = wired_engine();
        engine.register_feature(GateFeatureSpec::new("search", Priority::Medium));
        let registered_at = engine.feature("search").unwrap().state_changed_at;

        // Administrative jump straight to stable is accepted.
        engine
            .update_feature_state("search", FeatureState::Stable)
            .unwrap();
        let feature = engine.feature("search").unwrap();
        assert_eq!(feature.state, FeatureState::Stable);
        assert!(feature.state_changed_at >= registered_at);

        assert!(matches!(
            engine.update_feature_state("ghost", FeatureState::Stable),
            Err(GateError::UnknownFeature(_))
        ));
    }

    #[tokio::test]
    async fn full_gate_integration() {
        let (layers, stability, mut engine) = wired_engine();

        // 1. Wire the layer graph.
        {
            let mut registry = layers.write().unwrap();
            registry.register_layer(
                LayerSpec::new("service", "Service Tier")
                    .interface("query")
                    .allow_dependent("component"),
            );
            registry.register_layer(
                LayerSpec::new("component", "Component Tier").responsibility("widgets"),
            );
            registry.register_dependency("component", "service", "query");
        }

        // 2. Track existing features and debt.
        {
            let mut tracker = stability.write().unwrap();
            tracker.register_feature("search", solid_feature(0.95));
            tracker.register_feature("profiles", solid_feature(0.92));
            let check = tracker.can_add_feature("checkout", &FeatureRequirements::default());
            assert!(check.can_add);
        }

        // 3. A cross-layer call over the registered edge succeeds.
        let envelope = layers
            .read()
            .unwrap()
            .communicate(
                "component",
                "service",
                "query",
                serde_json::json!({"q": "boots"}),
            )
            .await
            .unwrap();
        assert!(envelope.success);

        // 4. Gate a new feature through policies.
        engine.add_policy(GatePolicy::new("release-discipline").rule(
            RuleCondition::TechnicalDebtHigh,
            RuleAction::Block,
            "pay down debt before shipping",
        ));
        engine.register_feature(
            GateFeatureSpec::new("search", Priority::Medium).state(FeatureState::Stable),
        );
        engine.register_feature(
            GateFeatureSpec::new("checkout", Priority::High)
                .abstraction_level(AbstractionTier::Component)
                .dependency("search"),
        );

        let verdict = engine
            .can_add_feature("checkout", &EvaluationContext::default())
            .unwrap();
        assert!(verdict.allowed, "unexpected denial: {}", verdict.reason);
        assert_eq!(engine.evaluations().len(), 1);
    }
}
