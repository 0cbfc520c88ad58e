use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A school building synced from the SIS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct School {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    /// Upstream primary identifier (upsert key).
    pub ps_id: i64,
    /// Upstream secondary identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn school_round_trip() {
        let school = School {
            id: 7,
            ps_id: 1001,
            ps_dcid: Some(42),
            name: "Springfield Elementary".into(),
            school_number: Some("0103".into()),
            city: Some("Springfield".into()),
            state: Some("IL".into()),
            synced_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&school).unwrap();
        assert!(json.contains("\"psId\":1001"));
        assert!(json.contains("\"psDcid\":42"));
        let back: School = serde_json::from_str(&json).unwrap();
        assert_eq!(back, school);
    }
}
