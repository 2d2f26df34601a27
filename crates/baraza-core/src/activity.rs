//! Candidate activities — the options prioritised within a session.
//!
//! Activities are created in bulk with their session and are immutable
//! afterwards. Their ballot position (insertion order) is preserved by the
//! store because it is the final tie-break in ranked results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

// ─── Criteria map ────────────────────────────────────────────────────────────

/// Open map of named numeric criteria weights (e.g. adaptive capacity,
/// vulnerability reduction). Keys are domain-defined and extensible; values
/// are numeric by construction. The `BTreeMap` gives a canonical key order,
/// so the JSON form round-trips losslessly through storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaMap(pub BTreeMap<String, f64>);

impl CriteriaMap {
  /// Canonical JSON form for the storage blob column.
  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn from_json(s: &str) -> Result<Self> {
    Ok(serde_json::from_str(s)?)
  }
}

impl<const N: usize> From<[(&str, f64); N]> for CriteriaMap {
  fn from(pairs: [(&str, f64); N]) -> Self {
    Self(pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
  }
}

// ─── Classification tiers ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
  High,
  #[default]
  Medium,
  Low,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeToImpact {
  Short,
  #[default]
  Medium,
  Long,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapexTier {
  Low,
  #[default]
  Medium,
  High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaladaptationRisk {
  Low,
  #[default]
  Medium,
  High,
}

// ─── CandidateActivity ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateActivity {
  pub activity_id:        Uuid,
  pub session_id:         Uuid,
  /// Strategic-objective label, e.g. "SO1 — Agro-pastoral resilience".
  pub objective:          String,
  pub title:              String,
  pub description:        String,
  pub criteria:           CriteriaMap,
  pub priority:           PriorityTier,
  pub time_to_impact:     TimeToImpact,
  pub capex:              CapexTier,
  pub maladaptation_risk: MaladaptationRisk,
  pub created_at:         DateTime<Utc>,
}

/// One activity in a [`crate::session::NewSession`] batch.
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
  pub objective:          String,
  pub title:              String,
  #[serde(default)]
  pub description:        String,
  #[serde(default)]
  pub criteria:           CriteriaMap,
  #[serde(default)]
  pub priority:           PriorityTier,
  #[serde(default)]
  pub time_to_impact:     TimeToImpact,
  #[serde(default)]
  pub capex:              CapexTier,
  #[serde(default)]
  pub maladaptation_risk: MaladaptationRisk,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn criteria_round_trip_is_lossless() {
    let criteria =
      CriteriaMap::from([("ADP", 3.0), ("RVC", 2.5), ("SUS", 2.0)]);
    let json = criteria.to_json().unwrap();
    assert_eq!(CriteriaMap::from_json(&json).unwrap(), criteria);
    // Canonical key order: BTreeMap sorts, so the JSON form is stable.
    assert_eq!(json, r#"{"ADP":3.0,"RVC":2.5,"SUS":2.0}"#);
  }

  #[test]
  fn criteria_rejects_non_numeric_values() {
    assert!(CriteriaMap::from_json(r#"{"ADP":"high"}"#).is_err());
  }
}
