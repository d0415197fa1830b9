//! Strata Types - the shared governance vocabulary
//!
//! Severities, priorities, abstraction tiers, violation records and
//! recommendation records used by every Strata component.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Severity of a violation or technical-debt entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Priority assigned to a feature at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// The canonical five-tier abstraction ordering.
///
/// Tiers are ordered from the most abstract (`System`, ordinal 0) down to
/// the least abstract (`Dom`, ordinal 4). Layer ids that spell one of the
/// canonical names map onto a tier; any other id has no tier and no
/// ordinal distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbstractionTier {
    System,
    Application,
    Service,
    Component,
    Dom,
}

/// Largest possible ordinal distance between two tiers.
pub const MAX_TIER_SPAN: u32 = 4;

impl AbstractionTier {
    /// Ordinal position in the canonical ordering, 0 (system) to 4 (dom).
    pub fn index(&self) -> u32 {
        match self {
            AbstractionTier::System => 0,
            AbstractionTier::Application => 1,
            AbstractionTier::Service => 2,
            AbstractionTier::Component => 3,
            AbstractionTier::Dom => 4,
        }
    }

    /// Map a layer id onto its canonical tier, if it names one.
    pub fn from_layer_id(id: &str) -> Option<Self> {
        match id {
            "system" => Some(AbstractionTier::System),
            "application" => Some(AbstractionTier::Application),
            "service" => Some(AbstractionTier::Service),
            "component" => Some(AbstractionTier::Component),
            "dom" => Some(AbstractionTier::Dom),
            _ => None,
        }
    }

    /// Absolute ordinal distance between two tiers. Symmetric, and zero
    /// for a tier against itself.
    pub fn distance(a: AbstractionTier, b: AbstractionTier) -> u32 {
        a.index().abs_diff(b.index())
    }

    /// True for the tiers above the service line (system, application).
    pub fn is_high(&self) -> bool {
        matches!(self, AbstractionTier::System | AbstractionTier::Application)
    }

    /// True for the tiers below the service line (component, dom).
    pub fn is_low(&self) -> bool {
        matches!(self, AbstractionTier::Component | AbstractionTier::Dom)
    }
}

impl std::fmt::Display for AbstractionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AbstractionTier::System => "system",
            AbstractionTier::Application => "application",
            AbstractionTier::Service => "service",
            AbstractionTier::Component => "component",
            AbstractionTier::Dom => "dom",
        };
        write!(f, "{}", name)
    }
}

/// The closed set of governance violation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A dependency edge references a layer that does not exist.
    InvalidDependency,
    /// The target layer does not allow the source layer to depend on it.
    UnauthorizedDependency,
    /// The named interface is not owned by the target layer.
    InterfaceMismatch,
    /// A layer acted outside its declared responsibilities.
    ResponsibilityViolation,
    /// Abstraction levels mixed beyond the permitted span.
    AbstractionLevelInconsistency,
    /// A gate policy rule matched the candidate feature.
    PolicyRule,
    /// A declared feature dependency is not registered.
    MissingDependency,
    /// A declared feature dependency is registered but not stable.
    UnstableDependency,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ViolationKind::InvalidDependency => "invalid-dependency",
            ViolationKind::UnauthorizedDependency => "unauthorized-dependency",
            ViolationKind::InterfaceMismatch => "interface-mismatch",
            ViolationKind::ResponsibilityViolation => "responsibility-violation",
            ViolationKind::AbstractionLevelInconsistency => "abstraction-level-inconsistency",
            ViolationKind::PolicyRule => "policy-rule",
            ViolationKind::MissingDependency => "missing-dependency",
            ViolationKind::UnstableDependency => "unstable-dependency",
        };
        write!(f, "{}", name)
    }
}

/// A recorded governance violation. Violations are diagnostics, not
/// errors: they are appended to a log and surfaced in reports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
    pub severity: Severity,
    /// Originating context, e.g. the edge or rule that produced this.
    pub context: String,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        severity: Severity,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            severity,
            context: context.into(),
            recorded_at: chrono::Utc::now(),
        }
    }
}

/// A remediation recommendation attached to a report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Severity,
    pub action: String,
    /// Current value of the metric that triggered this recommendation.
    pub current: f64,
    /// Threshold the metric should reach.
    pub target: f64,
}

/// Feature lifecycle states.
///
/// The documented order is proposed → approved → in-development → testing →
/// stable, with deprecated and removed as side branches. The order is
/// advisory: state updates are administrative and may set any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureState {
    Proposed,
    Approved,
    InDevelopment,
    Testing,
    Stable,
    Deprecated,
    Removed,
}

impl FeatureState {
    /// The next state in the documented lifecycle order, if any.
    pub fn documented_next(&self) -> Option<FeatureState> {
        match self {
            FeatureState::Proposed => Some(FeatureState::Approved),
            FeatureState::Approved => Some(FeatureState::InDevelopment),
            FeatureState::InDevelopment => Some(FeatureState::Testing),
            FeatureState::Testing => Some(FeatureState::Stable),
            FeatureState::Stable | FeatureState::Deprecated | FeatureState::Removed => None,
        }
    }
}

impl std::fmt::Display for FeatureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeatureState::Proposed => "proposed",
            FeatureState::Approved => "approved",
            FeatureState::InDevelopment => "in-development",
            FeatureState::Testing => "testing",
            FeatureState::Stable => "stable",
            FeatureState::Deprecated => "deprecated",
            FeatureState::Removed => "removed",
        };
        write!(f, "{}", name)
    }
}

/// Magnitude of the change a candidate feature introduces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeImpact {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl ChangeImpact {
    /// Major and critical impacts count as breaking changes.
    pub fn is_breaking(&self) -> bool {
        matches!(self, ChangeImpact::Major | ChangeImpact::Critical)
    }
}
