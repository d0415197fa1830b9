//! Strata Stability - feature stability scoring and technical-debt ledger
//!
//! Tracks registered features with a computed stability score, keeps an
//! append-only technical-debt ledger with severity scoring, and answers
//! whether the system is healthy enough to admit another feature.
//! Has no authority of its own - the gate engine consumes its reports.

#![deny(unsafe_code)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_types::{AbstractionTier, Priority, Recommendation, Severity};
use tracing::{debug, info, warn};

/// Scoring weights and thresholds.
///
/// These mirror the historical formulas exactly; every published stability
/// and debt figure is derived from them.
pub mod weights {
    /// Test-coverage weight in the feature stability score.
    pub const COVERAGE: f64 = 0.3;
    /// Documentation weight in the feature stability score.
    pub const DOCUMENTATION: f64 = 0.2;
    /// Maturity (months in use) weight in the feature stability score.
    pub const MATURITY: f64 = 0.2;
    /// Reliability (1 - bug rate) weight in the feature stability score.
    pub const RELIABILITY: f64 = 0.3;
    /// Months in use at which a feature counts as fully mature.
    pub const MATURITY_HORIZON_MONTHS: f64 = 6.0;

    /// Critical-severity weight in the aggregate debt level.
    pub const DEBT_CRITICAL: f64 = 0.5;
    /// High-severity weight in the aggregate debt level.
    pub const DEBT_HIGH: f64 = 0.3;
    /// Weight of every remaining ledger entry in the aggregate debt level.
    pub const DEBT_REMAINDER: f64 = 0.1;

    /// Critical-priority features below this score block admission.
    pub const CRITICAL_STABILITY_FLOOR: f64 = 0.8;
    /// Mean test coverage below this blocks admission and is reported.
    pub const COVERAGE_TARGET: f64 = 0.9;
    /// Aggregate debt above this blocks admission.
    pub const DEBT_CEILING: f64 = 0.7;
    /// Aggregate debt above this is reported as a recommendation.
    pub const DEBT_REPORT_TARGET: f64 = 0.5;
    /// Overall stability below this is reported as a recommendation.
    pub const OVERALL_TARGET: f64 = 0.8;

    /// Coverage weight in the overall design-quality score.
    pub const OVERALL_COVERAGE: f64 = 0.4;
    /// Debt weight in the overall design-quality score.
    pub const OVERALL_DEBT: f64 = 0.4;
    /// Mean feature stability weight in the overall design-quality score.
    pub const OVERALL_STABILITY: f64 = 0.2;
}

/// How widely a technical-debt entry is felt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImpactScope {
    Component,
    Application,
    System,
}

impl ImpactScope {
    fn weight(&self) -> u8 {
        match self {
            ImpactScope::Component => 1,
            ImpactScope::Application => 2,
            ImpactScope::System => 3,
        }
    }
}

/// How hard a technical-debt entry is to pay down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    fn weight(&self) -> u8 {
        match self {
            Difficulty::Low => 1,
            Difficulty::Medium => 2,
            Difficulty::High => 3,
        }
    }
}

/// How urgently a technical-debt entry needs attention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    fn weight(&self) -> u8 {
        match self {
            Urgency::Low => 1,
            Urgency::Medium => 2,
            Urgency::High | Urgency::Critical => 3,
        }
    }
}

/// Input for [`StabilityTracker::record_technical_debt`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebtSpec {
    pub description: String,
    pub impact: ImpactScope,
    pub difficulty: Difficulty,
    pub urgency: Urgency,
}

/// A scored entry in the append-only technical-debt ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TechnicalDebtEntry {
    pub description: String,
    pub impact: ImpactScope,
    pub difficulty: Difficulty,
    pub urgency: Urgency,
    /// Sum of the three dimension weights, 3..=9.
    pub score: u8,
    pub severity: Severity,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Registration-time inputs for a tracked feature. Absent numeric inputs
/// contribute zero to their scoring term.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstraction_level: Option<AbstractionTier>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_coverage: Option<f64>,
    #[serde(default)]
    pub documented: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months_in_use: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug_rate: Option<f64>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            priority: Priority::Medium,
            abstraction_level: None,
            dependencies: Vec::new(),
            test_coverage: None,
            documented: false,
            months_in_use: None,
            bug_rate: None,
        }
    }
}

/// A tracked feature with its computed stability score.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureStability {
    pub name: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstraction_level: Option<AbstractionTier>,
    pub dependencies: Vec<String>,
    pub test_coverage: f64,
    pub documented: bool,
    pub months_in_use: f64,
    pub bug_rate: f64,
    /// Always within `[0, 1]`.
    pub stability_score: f64,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

/// Abstraction tiers a candidate feature intends to touch.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeatureRequirements {
    pub levels: Vec<AbstractionTier>,
}

/// Verdict of [`StabilityTracker::can_add_feature`]. A governance outcome,
/// never an error: callers branch on `can_add`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionCheck {
    pub can_add: bool,
    pub reasons: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

/// Stability Tracker — feature scoring and the technical-debt ledger.
pub struct StabilityTracker {
    features: HashMap<String, FeatureStability>,
    debts: Vec<TechnicalDebtEntry>,
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self {
            features: HashMap::new(),
            debts: Vec::new(),
        }
    }

    /// Register a feature and compute its stability score. Re-registering
    /// the same name overwrites and recomputes.
    pub fn register_feature(&mut self, name: impl Into<String>, config: FeatureConfig) -> f64 {
        let name = name.into();
        let test_coverage = config.test_coverage.unwrap_or(0.0);
        let months_in_use = config.months_in_use.unwrap_or(0.0);
        let bug_rate = config.bug_rate.unwrap_or(0.0);
        let score = stability_score(test_coverage, config.documented, months_in_use, bug_rate);

        info!(feature = %name, priority = ?config.priority, score, "Feature registered");
        self.features.insert(
            name.clone(),
            FeatureStability {
                name,
                priority: config.priority,
                abstraction_level: config.abstraction_level,
                dependencies: config.dependencies,
                test_coverage,
                documented: config.documented,
                months_in_use,
                bug_rate,
                stability_score: score,
                registered_at: chrono::Utc::now(),
            },
        );
        score
    }

    /// Append a technical-debt entry to the ledger and return its computed
    /// severity.
    pub fn record_technical_debt(&mut self, spec: DebtSpec) -> Severity {
        let score = spec.impact.weight() + spec.difficulty.weight() + spec.urgency.weight();
        let severity = match score {
            s if s >= 7 => Severity::Critical,
            s if s >= 5 => Severity::High,
            s if s >= 3 => Severity::Medium,
            _ => Severity::Low,
        };

        if severity == Severity::Critical {
            warn!(description = %spec.description, score, "Critical technical debt recorded");
        } else {
            debug!(description = %spec.description, score, severity = ?severity, "Technical debt recorded");
        }

        self.debts.push(TechnicalDebtEntry {
            description: spec.description,
            impact: spec.impact,
            difficulty: spec.difficulty,
            urgency: spec.urgency,
            score,
            severity,
            recorded_at: chrono::Utc::now(),
        });
        severity
    }

    /// Aggregate debt level in `[0, 1]`:
    /// (0.5·critical + 0.3·high + 0.1·remainder) / total. Zero for an
    /// empty ledger.
    pub fn debt_level(&self) -> f64 {
        if self.debts.is_empty() {
            return 0.0;
        }
        let critical = self.count_debt(Severity::Critical) as f64;
        let high = self.count_debt(Severity::High) as f64;
        let total = self.debts.len() as f64;
        let remainder = total - critical - high;
        (weights::DEBT_CRITICAL * critical
            + weights::DEBT_HIGH * high
            + weights::DEBT_REMAINDER * remainder)
            / total
    }

    /// Mean stored test coverage across all features. A tracker with no
    /// features reports full coverage: nothing registered means nothing
    /// untested.
    pub fn mean_test_coverage(&self) -> f64 {
        if self.features.is_empty() {
            return 1.0;
        }
        self.features
            .values()
            .map(|f| f.test_coverage)
            .sum::<f64>()
            / self.features.len() as f64
    }

    /// Mean stability score across all features, 1.0 when empty.
    pub fn mean_stability(&self) -> f64 {
        if self.features.is_empty() {
            return 1.0;
        }
        self.features
            .values()
            .map(|f| f.stability_score)
            .sum::<f64>()
            / self.features.len() as f64
    }

    /// Names of Critical-priority features below the stability floor.
    pub fn unstable_critical_features(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .features
            .values()
            .filter(|f| {
                f.priority == Priority::Critical
                    && f.stability_score < weights::CRITICAL_STABILITY_FLOOR
            })
            .map(|f| f.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureStability> {
        self.features.get(name)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn debts(&self) -> &[TechnicalDebtEntry] {
        &self.debts
    }

    /// Decide whether the system is healthy enough to admit `name`.
    ///
    /// Logical AND of the stability, debt and abstraction sub-checks; each
    /// failed condition contributes a reason and a recommendation naming
    /// the metric and its target.
    pub fn can_add_feature(&self, name: &str, requirements: &FeatureRequirements) -> AdmissionCheck {
        let mut reasons = Vec::new();
        let mut recommendations = Vec::new();

        // Stability sub-check.
        let unstable = self.unstable_critical_features();
        if !unstable.is_empty() {
            reasons.push(format!(
                "critical features below stability floor: {}",
                unstable.join(", ")
            ));
            recommendations.push(Recommendation {
                kind: "critical-stability".into(),
                priority: Severity::Critical,
                action: "stabilize critical-priority features before adding new ones".into(),
                current: self
                    .features
                    .values()
                    .filter(|f| f.priority == Priority::Critical)
                    .map(|f| f.stability_score)
                    .fold(f64::INFINITY, f64::min),
                target: weights::CRITICAL_STABILITY_FLOOR,
            });
        }
        let coverage = self.mean_test_coverage();
        if coverage < weights::COVERAGE_TARGET {
            reasons.push(format!("overall test coverage {:.2} is too low", coverage));
            recommendations.push(Recommendation {
                kind: "test-coverage".into(),
                priority: Severity::High,
                action: "raise mean test coverage across registered features".into(),
                current: coverage,
                target: weights::COVERAGE_TARGET,
            });
        }

        // Debt sub-check.
        let debt = self.debt_level();
        if debt > weights::DEBT_CEILING {
            reasons.push(format!("aggregate technical debt {:.2} is too high", debt));
            recommendations.push(Recommendation {
                kind: "technical-debt".into(),
                priority: Severity::High,
                action: "pay down high-severity technical debt".into(),
                current: debt,
                target: weights::DEBT_CEILING,
            });
        }
        let critical_debt = self.count_debt(Severity::Critical);
        if critical_debt > 0 {
            reasons.push(format!(
                "{} unresolved critical technical-debt entries",
                critical_debt
            ));
            recommendations.push(Recommendation {
                kind: "critical-debt".into(),
                priority: Severity::Critical,
                action: "resolve critical technical debt before adding features".into(),
                current: critical_debt as f64,
                target: 0.0,
            });
        }

        // Abstraction sub-check.
        let has_high = requirements.levels.iter().any(AbstractionTier::is_high);
        let has_low = requirements.levels.iter().any(AbstractionTier::is_low);
        if has_high && has_low {
            reasons.push("feature mixes high and low abstraction tiers".into());
        }

        let can_add = reasons.is_empty();
        debug!(feature = %name, can_add, reasons = reasons.len(), "Admission checked");
        AdmissionCheck {
            can_add,
            reasons,
            recommendations,
        }
    }

    fn count_debt(&self, severity: Severity) -> usize {
        self.debts
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted feature stability score, clamped to `[0, 1]`.
fn stability_score(test_coverage: f64, documented: bool, months_in_use: f64, bug_rate: f64) -> f64 {
    let documentation = if documented { 1.0 } else { 0.0 };
    let maturity = (months_in_use / weights::MATURITY_HORIZON_MONTHS).min(1.0);
    let score = weights::COVERAGE * test_coverage
        + weights::DOCUMENTATION * documentation
        + weights::MATURITY * maturity
        + weights::RELIABILITY * (1.0 - bug_rate);
    score.clamp(0.0, 1.0)
}

/// Snapshot report over tracked features and the debt ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignQualityReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub feature_count: usize,
    pub debt_count: usize,
    /// Critical-priority features below the stability floor.
    pub unstable_critical_features: Vec<String>,
    pub average_stability: f64,
    pub test_coverage: f64,
    pub debt_level: f64,
    /// 0.4·coverage + 0.4·(1 − debt level) + 0.2·average stability.
    pub overall_stability: f64,
    pub recommendations: Vec<Recommendation>,
}

impl StabilityTracker {
    /// Generate a point-in-time design-quality report.
    pub fn generate_design_quality_report(&self) -> DesignQualityReport {
        let coverage = self.mean_test_coverage();
        let debt = self.debt_level();
        let average_stability = self.mean_stability();
        let overall = weights::OVERALL_COVERAGE * coverage
            + weights::OVERALL_DEBT * (1.0 - debt)
            + weights::OVERALL_STABILITY * average_stability;

        let mut recommendations = Vec::new();
        if coverage < weights::COVERAGE_TARGET {
            recommendations.push(Recommendation {
                kind: "test-coverage".into(),
                priority: Severity::High,
                action: "raise mean test coverage across registered features".into(),
                current: coverage,
                target: weights::COVERAGE_TARGET,
            });
        }
        if debt > weights::DEBT_REPORT_TARGET {
            recommendations.push(Recommendation {
                kind: "technical-debt".into(),
                priority: Severity::Medium,
                action: "schedule debt pay-down before it blocks admission".into(),
                current: debt,
                target: weights::DEBT_REPORT_TARGET,
            });
        }
        if overall < weights::OVERALL_TARGET {
            recommendations.push(Recommendation {
                kind: "overall-stability".into(),
                priority: Severity::Medium,
                action: "improve coverage and stability of registered features".into(),
                current: overall,
                target: weights::OVERALL_TARGET,
            });
        }

        debug!(
            features = self.feature_count(),
            debts = self.debts.len(),
            overall,
            "Design quality report generated"
        );
        DesignQualityReport {
            timestamp: chrono::Utc::now(),
            feature_count: self.feature_count(),
            debt_count: self.debts.len(),
            unstable_critical_features: self.unstable_critical_features(),
            average_stability,
            test_coverage: coverage,
            debt_level: debt,
            overall_stability: overall,
            recommendations,
        }
    }
}
