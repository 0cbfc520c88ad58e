use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A course definition synced from the SIS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub course_number: String,
    pub course_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_hours: Option<f64>,
    pub synced_at: DateTime<Utc>,
}

/// A scheduled section with its foreign keys resolved to local surrogate ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub course_id: i64,
    pub school_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_number: Option<String>,
    /// Period expression as the SIS renders it (e.g. "2(A)").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// A section as fetched from the SIS, before identifier reconciliation.
///
/// Foreign keys are upstream ids; the reconciler translates them to local
/// surrogate keys or skips the record.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedSection {
    pub ps_id: i64,
    pub ps_dcid: Option<i64>,
    pub course_ps_id: Option<i64>,
    pub school_ps_id: Option<i64>,
    pub term_ps_id: Option<i64>,
    pub teacher_ps_id: Option<i64>,
    pub section_number: Option<String>,
    pub expression: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn course_round_trip() {
        let course = Course {
            id: 3,
            ps_id: 700,
            ps_dcid: Some(55),
            course_number: "MATH2".into(),
            course_name: "Mathematics Grade 2".into(),
            credit_hours: Some(1.0),
            synced_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&course).unwrap();
        let back: Course = serde_json::from_str(&json).unwrap();
        assert_eq!(back, course);
    }

    #[test]
    fn section_optional_links_omitted() {
        let section = Section {
            id: 0,
            ps_id: 9001,
            ps_dcid: None,
            course_id: 3,
            school_id: 1,
            term_id: None,
            teacher_id: None,
            section_number: Some("1".into()),
            expression: Some("2(A)".into()),
            synced_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&section).unwrap();
        assert!(!json.contains("termId"));
        assert!(!json.contains("teacherId"));
        assert!(json.contains("\"courseId\":3"));
    }
}
