//! Contact graph entities: persons, their email/phone endpoints, and the
//! association records linking them to each other and to students.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contact person (guardian, emergency contact) synced from the SIS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_dcid: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub synced_at: DateTime<Utc>,
}

/// An email address record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    pub address: String,
    pub synced_at: DateTime<Utc>,
}

/// A phone number record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    /// Local surrogate key; 0 until persisted.
    pub id: i64,
    pub ps_id: i64,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// Person ↔ email association with local surrogate endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonEmailAssociation {
    pub ps_id: i64,
    pub person_id: i64,
    pub email_address_id: i64,
    pub is_primary: bool,
}

/// Person ↔ phone association with local surrogate endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonPhoneAssociation {
    pub ps_id: i64,
    pub person_id: i64,
    pub phone_number_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_type: Option<String>,
    pub is_preferred: bool,
}

/// Student ↔ contact-person association with local surrogate endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentContactAssociation {
    pub ps_id: i64,
    pub student_id: i64,
    pub person_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    pub is_emergency: bool,
    /// Whether this contact receives mailed report cards.
    pub receives_mail: bool,
}

/// Raw association payloads reference endpoints by upstream id only.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedPersonEmail {
    pub ps_id: i64,
    pub person_ps_id: Option<i64>,
    pub email_ps_id: Option<i64>,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedPersonPhone {
    pub ps_id: i64,
    pub person_ps_id: Option<i64>,
    pub phone_ps_id: Option<i64>,
    pub phone_type: Option<String>,
    pub is_preferred: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedStudentContact {
    pub ps_id: i64,
    pub student_ps_id: Option<i64>,
    pub person_ps_id: Option<i64>,
    pub relationship: Option<String>,
    pub is_emergency: bool,
    pub receives_mail: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn person_round_trip() {
        let person = Person {
            id: 3,
            ps_id: 61001,
            ps_dcid: Some(777),
            first_name: "Marge".into(),
            last_name: "Simpson".into(),
            is_active: true,
            synced_at: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&person).unwrap();
        let back: Person = serde_json::from_str(&json).unwrap();
        assert_eq!(back, person);
    }

    #[test]
    fn student_contact_association_camel_case() {
        let assoc = StudentContactAssociation {
            ps_id: 41,
            student_id: 9,
            person_id: 3,
            relationship: Some("Mother".into()),
            is_emergency: true,
            receives_mail: true,
        };
        let json = serde_json::to_string(&assoc).unwrap();
        assert!(json.contains("\"studentId\":9"));
        assert!(json.contains("\"receivesMail\":true"));
        let back: StudentContactAssociation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, assoc);
    }
}
