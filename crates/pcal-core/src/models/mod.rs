/// Implements `as_str`, `ALL`, `Display` and `FromStr` for a fieldless enum
/// whose serde representation is snake_case.
macro_rules! str_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::errors::PcalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err($crate::errors::PcalError::InvalidEnum {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

mod authority;
mod decision;
mod feedback;
mod incident;
mod narrative;
mod pattern;
mod snapshot;

pub use authority::{
    AccountabilityAnswer, AccountabilityQuestion, Approval, AuthorityChain, AuthorityNode,
    AuthorityNodeKind, Override,
};
pub use decision::{
    AuthorityType, Decision, DecisionDomain, DecisionOutcome, DecisionSource, DecisionStats,
    IngestOptions, Signal,
};
pub use feedback::{
    FeedbackCycleResult, FeedbackRule, FeedbackSignal, FeedbackState, Recommendation,
    RecommendationAction, RecommendationStatus,
};
pub use incident::{IncidentLink, LinkType};
pub use narrative::{
    Narrative, NarrativeQuery, NarrativeRequest, RiskItem, RiskReport, SafetyTrend, WindowStats,
};
pub use pattern::{Pattern, PatternSeverity, PatternSignature, PatternTrend, RepeatedMistake};
pub use snapshot::MemorySnapshot;
