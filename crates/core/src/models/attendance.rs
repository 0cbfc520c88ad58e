use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An attendance code definition (present, absent, tardy, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCode {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub counts_as_present: bool,
    pub synced_at: DateTime<Utc>,
}

/// One attendance mark for one student on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub student_id: i64,
    pub attendance_code_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<i64>,
    pub att_date: NaiveDate,
    pub synced_at: DateTime<Utc>,
}

/// An attendance mark as fetched from the SIS, before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedAttendance {
    pub ps_id: i64,
    pub ps_dcid: Option<i64>,
    pub student_ps_id: Option<i64>,
    pub attendance_code_ps_id: Option<i64>,
    pub school_ps_id: Option<i64>,
    pub att_date: Option<NaiveDate>,
}
