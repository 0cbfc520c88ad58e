use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A teacher record synced from the SIS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Upstream school reference; kept as the raw SIS id because teachers are
    /// base reference data synced before reconciliation maps exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_ps_id: Option<i64>,
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn teacher_round_trip() {
        let teacher = Teacher {
            id: 2,
            ps_id: 8812,
            ps_dcid: Some(620),
            first_name: "Edna".into(),
            last_name: "Krabappel".into(),
            email: Some("ekrabappel@springfield.edu".into()),
            school_ps_id: Some(1001),
            synced_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&teacher).unwrap();
        assert!(json.contains("\"firstName\":\"Edna\""));
        let back: Teacher = serde_json::from_str(&json).unwrap();
        assert_eq!(back, teacher);
    }
}
