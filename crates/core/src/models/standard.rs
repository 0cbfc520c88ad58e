use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A learning standard against which standards-based grades are recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Standard {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    /// Human-readable identifier (e.g. "M.2.NBT.5").
    pub identifier: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_area: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn standard_round_trip() {
        let standard = Standard {
            id: 4,
            ps_id: 311,
            identifier: "M.2.NBT.5".into(),
            name: "Fluently add and subtract within 100".into(),
            description: None,
            subject_area: Some("Mathematics".into()),
            synced_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&standard).unwrap();
        let back: Standard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, standard);
    }
}
