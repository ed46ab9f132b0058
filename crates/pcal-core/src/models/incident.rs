//! Incident provenance edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    CausedBy,
    CorrelatedWith,
    MitigatedBy,
    PrecededBy,
}

str_enum!(LinkType, "link type", {
    CausedBy => "caused_by",
    CorrelatedWith => "correlated_with",
    MitigatedBy => "mitigated_by",
    PrecededBy => "preceded_by",
});

/// An edge from an external incident to a decision. Parallel edges between
/// the same pair accumulate as independent evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLink {
    pub id: String,
    pub incident_id: String,
    pub decision_id: String,
    pub link_type: LinkType,
    /// 0-100.
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}
