use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a sync run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SyncStatus {
    /// Terminal runs are immutable; no further transitions are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Failed)
    }
}

/// The entity types the synchronization engine knows how to pull.
///
/// `DEPENDENCY_ORDER` is the order `sync_all` processes them in: base
/// reference data before dependents, relational data before measurements,
/// contact endpoints before their association tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    School,
    Term,
    Teacher,
    Student,
    Course,
    Section,
    Standard,
    AttendanceCode,
    Grade,
    Attendance,
    Person,
    EmailAddress,
    PhoneNumber,
    PersonEmail,
    PersonPhone,
    StudentContact,
}

impl EntityKind {
    pub const DEPENDENCY_ORDER: [EntityKind; 16] = [
        EntityKind::School,
        EntityKind::Term,
        EntityKind::Teacher,
        EntityKind::Student,
        EntityKind::Course,
        EntityKind::Section,
        EntityKind::Standard,
        EntityKind::AttendanceCode,
        EntityKind::Grade,
        EntityKind::Attendance,
        EntityKind::Person,
        EntityKind::EmailAddress,
        EntityKind::PhoneNumber,
        EntityKind::PersonEmail,
        EntityKind::PersonPhone,
        EntityKind::StudentContact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::School => "school",
            EntityKind::Term => "term",
            EntityKind::Teacher => "teacher",
            EntityKind::Student => "student",
            EntityKind::Course => "course",
            EntityKind::Section => "section",
            EntityKind::Standard => "standard",
            EntityKind::AttendanceCode => "attendance_code",
            EntityKind::Grade => "grade",
            EntityKind::Attendance => "attendance",
            EntityKind::Person => "person",
            EntityKind::EmailAddress => "email_address",
            EntityKind::PhoneNumber => "phone_number",
            EntityKind::PersonEmail => "person_email",
            EntityKind::PersonPhone => "person_phone",
            EntityKind::StudentContact => "student_contact",
        }
    }

    pub fn parse(s: &str) -> Option<EntityKind> {
        Self::DEPENDENCY_ORDER
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record of a single sync attempt, for one entity type or a full run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: i64,
    /// Entity-type wire name, or "full" for an orchestrated run.
    pub entity_type: String,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub record_count: i64,
    pub skipped_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// JSON snapshot of per-step results for auditing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// An association record that could not be persisted because one of its
/// referenced entities is not locally known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub ps_id: i64,
    pub reason: String,
}

impl SkippedRecord {
    pub fn new(ps_id: i64, reason: impl Into<String>) -> Self {
        Self {
            ps_id,
            reason: reason.into(),
        }
    }
}

/// Outcome of one entity-type sync step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub entity_type: EntityKind,
    pub record_count: usize,
    pub skipped: Vec<SkippedRecord>,
    pub duration_ms: u64,
}

/// Row counts per synced table, for the status surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityCounts {
    pub schools: i64,
    pub terms: i64,
    pub teachers: i64,
    pub students: i64,
    pub courses: i64,
    pub sections: i64,
    pub standards: i64,
    pub attendance_codes: i64,
    pub grades: i64,
    pub attendance: i64,
    pub persons: i64,
    pub email_addresses: i64,
    pub phone_numbers: i64,
    pub student_contacts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sync_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&SyncStatus::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(
            serde_json::to_string(&SyncStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&SyncStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn terminal_states() {
        assert!(!SyncStatus::Pending.is_terminal());
        assert!(!SyncStatus::Running.is_terminal());
        assert!(SyncStatus::Completed.is_terminal());
        assert!(SyncStatus::Failed.is_terminal());
    }

    #[test]
    fn entity_kind_wire_names_round_trip() {
        for kind in EntityKind::DEPENDENCY_ORDER {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn entity_kind_parse_rejects_unknown() {
        assert_eq!(EntityKind::parse("bogus"), None);
        assert_eq!(EntityKind::parse("full"), None);
    }

    #[test]
    fn dependency_order_puts_references_before_dependents() {
        let order = EntityKind::DEPENDENCY_ORDER;
        let pos = |kind| order.iter().position(|k| *k == kind).unwrap();
        assert!(pos(EntityKind::School) < pos(EntityKind::Student));
        assert!(pos(EntityKind::Student) < pos(EntityKind::Section));
        assert!(pos(EntityKind::Section) < pos(EntityKind::Grade));
        assert!(pos(EntityKind::AttendanceCode) < pos(EntityKind::Attendance));
        assert!(pos(EntityKind::Person) < pos(EntityKind::PersonEmail));
        assert!(pos(EntityKind::EmailAddress) < pos(EntityKind::PersonEmail));
        assert!(pos(EntityKind::Person) < pos(EntityKind::StudentContact));
    }

    fn sample_sync_run() -> SyncRun {
        SyncRun {
            id: 1,
            entity_type: "full".to_string(),
            status: SyncStatus::Completed,
            started_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
            completed_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 2, 4, 0).unwrap()),
            record_count: 1240,
            skipped_count: 3,
            error_message: None,
            details: Some(serde_json::json!({ "steps": [] })),
        }
    }

    #[test]
    fn sync_run_round_trip() {
        let run = sample_sync_run();
        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains("\"entityType\":\"full\""));
        assert!(json.contains("\"recordCount\":1240"));
        assert!(json.contains("\"skippedCount\":3"));
        let back: SyncRun = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }

    #[test]
    fn skipped_record_reason() {
        let skipped = SkippedRecord::new(991, "student side: no local row for ps_id 50999");
        let json = serde_json::to_string(&skipped).unwrap();
        assert!(json.contains("\"psId\":991"));
        let back: SkippedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, skipped);
    }
}
