//! Point-in-time capture of platform memory, kept for later diffing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DecisionOutcome, Pattern, RepeatedMistake};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub patterns: Vec<Pattern>,
    pub repeated_mistakes: Vec<RepeatedMistake>,
    pub decision_count: usize,
    pub incident_link_count: usize,
    pub outcome_counts: BTreeMap<DecisionOutcome, usize>,
}

impl MemorySnapshot {
    pub fn to_json(&self) -> crate::errors::PcalResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
