use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored grade for one student in one section, optionally tied to a
/// learning standard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    pub student_id: i64,
    pub section_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_id: Option<i64>,
    /// Store code naming the grading window (e.g. "Q1").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// A grade as fetched from the SIS, before identifier reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedGrade {
    pub ps_id: i64,
    pub student_ps_id: Option<i64>,
    pub section_ps_id: Option<i64>,
    pub standard_ps_id: Option<i64>,
    pub store_code: Option<String>,
    pub letter_grade: Option<String>,
    pub percent: Option<f64>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn grade_round_trip() {
        let grade = Grade {
            id: 12,
            ps_id: 77001,
            student_id: 9,
            section_id: 5,
            standard_id: Some(4),
            store_code: Some("Q1".into()),
            letter_grade: Some("A-".into()),
            percent: Some(91.5),
            comment: Some("Strong quarter".into()),
            synced_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&grade).unwrap();
        assert!(json.contains("\"storeCode\":\"Q1\""));
        let back: Grade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grade);
    }
}
