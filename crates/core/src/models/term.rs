use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A grading term (year, semester, quarter) synced from the SIS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Upstream school-year number (e.g. 35 for 2025-2026 in PowerSchool terms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_id: Option<i64>,
    pub synced_at: DateTime<Utc>,
}
