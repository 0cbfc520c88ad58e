use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A student record synced from the SIS.
///
/// `preferred_name` and `report_card_generated_at` are locally owned: they are
/// set through the portal, never appear in upstream payloads, and must survive
/// every upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enroll_status: Option<i64>,
    /// Upstream school reference (raw SIS id, same rationale as teachers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_ps_id: Option<i64>,
    /// Locally owned; set by staff through the portal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    /// Locally owned; stamped when a report card PDF is produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_card_generated_at: Option<DateTime<Utc>>,
    pub synced_at: DateTime<Utc>,
}
