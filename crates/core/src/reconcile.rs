//! Identifier reconciliation: rewrites upstream id references in fetched
//! records to local surrogate keys.
//!
//! A record whose required reference cannot be resolved is skipped with a
//! reason and counted; it never aborts the step. Optional references that
//! cannot be resolved are dropped from the record instead.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::attendance::{Attendance, UnresolvedAttendance};
use crate::models::contact::{
    PersonEmailAssociation, PersonPhoneAssociation, StudentContactAssociation,
    UnresolvedPersonEmail, UnresolvedPersonPhone, UnresolvedStudentContact,
};
use crate::models::course::{Section, UnresolvedSection};
use crate::models::grade::{Grade, UnresolvedGrade};
use crate::models::sync::SkippedRecord;

/// Bulk lookup from upstream id to local surrogate key for one entity type.
pub struct IdMap {
    by_ps_id: HashMap<i64, i64>,
}

impl IdMap {
    /// Build from `(local_id, ps_id)` pairs as returned by the repository.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, i64)>) -> Self {
        Self {
            by_ps_id: pairs
                .into_iter()
                .map(|(local_id, ps_id)| (ps_id, local_id))
                .collect(),
        }
    }

    pub fn local_id(&self, ps_id: i64) -> Option<i64> {
        self.by_ps_id.get(&ps_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_ps_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ps_id.is_empty()
    }
}

/// Result of reconciling one batch.
pub struct ReconcileOutcome<T> {
    pub resolved: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> Default for ReconcileOutcome<T> {
    fn default() -> Self {
        Self {
            resolved: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Resolve a required reference, or record why the row was skipped.
fn require_ref(
    map: &IdMap,
    side: &str,
    ps_ref: Option<i64>,
    record_ps_id: i64,
    skipped: &mut Vec<SkippedRecord>,
) -> Option<i64> {
    match ps_ref {
        None => {
            skipped.push(SkippedRecord::new(
                record_ps_id,
                format!("{side} side: reference missing from upstream record"),
            ));
            None
        }
        Some(ps_id) => match map.local_id(ps_id) {
            Some(local_id) => Some(local_id),
            None => {
                skipped.push(SkippedRecord::new(
                    record_ps_id,
                    format!("{side} side: no local row for ps_id {ps_id}"),
                ));
                None
            }
        },
    }
}

/// Resolve an optional reference; an unknown upstream id drops the link.
fn optional_ref(map: &IdMap, ps_ref: Option<i64>) -> Option<i64> {
    ps_ref.and_then(|ps_id| map.local_id(ps_id))
}

pub fn resolve_sections(
    unresolved: Vec<UnresolvedSection>,
    courses: &IdMap,
    schools: &IdMap,
    terms: &IdMap,
    teachers: &IdMap,
    synced_at: DateTime<Utc>,
) -> ReconcileOutcome<Section> {
    let mut outcome = ReconcileOutcome::default();
    for section in unresolved {
        let Some(course_id) = require_ref(
            courses,
            "course",
            section.course_ps_id,
            section.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        let Some(school_id) = require_ref(
            schools,
            "school",
            section.school_ps_id,
            section.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        outcome.resolved.push(Section {
            id: 0,
            ps_id: section.ps_id,
            ps_dcid: section.ps_dcid,
            course_id,
            school_id,
            term_id: optional_ref(terms, section.term_ps_id),
            teacher_id: optional_ref(teachers, section.teacher_ps_id),
            section_number: section.section_number,
            expression: section.expression,
            synced_at,
        });
    }
    outcome
}

pub fn resolve_grades(
    unresolved: Vec<UnresolvedGrade>,
    students: &IdMap,
    sections: &IdMap,
    standards: &IdMap,
    synced_at: DateTime<Utc>,
) -> ReconcileOutcome<Grade> {
    let mut outcome = ReconcileOutcome::default();
    for grade in unresolved {
        let Some(student_id) = require_ref(
            students,
            "student",
            grade.student_ps_id,
            grade.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        let Some(section_id) = require_ref(
            sections,
            "section",
            grade.section_ps_id,
            grade.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        outcome.resolved.push(Grade {
            id: 0,
            ps_id: grade.ps_id,
            student_id,
            section_id,
            standard_id: optional_ref(standards, grade.standard_ps_id),
            store_code: grade.store_code,
            letter_grade: grade.letter_grade,
            percent: grade.percent,
            comment: grade.comment,
            synced_at,
        });
    }
    outcome
}

pub fn resolve_attendance(
    unresolved: Vec<UnresolvedAttendance>,
    students: &IdMap,
    codes: &IdMap,
    schools: &IdMap,
    synced_at: DateTime<Utc>,
) -> ReconcileOutcome<Attendance> {
    let mut outcome = ReconcileOutcome::default();
    for mark in unresolved {
        let Some(student_id) = require_ref(
            students,
            "student",
            mark.student_ps_id,
            mark.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        let Some(attendance_code_id) = require_ref(
            codes,
            "attendance_code",
            mark.attendance_code_ps_id,
            mark.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        let Some(att_date) = mark.att_date else {
            outcome.skipped.push(SkippedRecord::new(
                mark.ps_id,
                "date side: attendance date missing or unparseable".to_string(),
            ));
            continue;
        };
        outcome.resolved.push(Attendance {
            id: 0,
            ps_id: mark.ps_id,
            ps_dcid: mark.ps_dcid,
            student_id,
            attendance_code_id,
            school_id: optional_ref(schools, mark.school_ps_id),
            att_date,
            synced_at,
        });
    }
    outcome
}

pub fn resolve_person_emails(
    unresolved: Vec<UnresolvedPersonEmail>,
    persons: &IdMap,
    emails: &IdMap,
) -> ReconcileOutcome<PersonEmailAssociation> {
    let mut outcome = ReconcileOutcome::default();
    for assoc in unresolved {
        let Some(person_id) = require_ref(
            persons,
            "person",
            assoc.person_ps_id,
            assoc.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        let Some(email_address_id) = require_ref(
            emails,
            "email_address",
            assoc.email_ps_id,
            assoc.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        outcome.resolved.push(PersonEmailAssociation {
            ps_id: assoc.ps_id,
            person_id,
            email_address_id,
            is_primary: assoc.is_primary,
        });
    }
    outcome
}

pub fn resolve_person_phones(
    unresolved: Vec<UnresolvedPersonPhone>,
    persons: &IdMap,
    phones: &IdMap,
) -> ReconcileOutcome<PersonPhoneAssociation> {
    let mut outcome = ReconcileOutcome::default();
    for assoc in unresolved {
        let Some(person_id) = require_ref(
            persons,
            "person",
            assoc.person_ps_id,
            assoc.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        let Some(phone_number_id) = require_ref(
            phones,
            "phone_number",
            assoc.phone_ps_id,
            assoc.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        outcome.resolved.push(PersonPhoneAssociation {
            ps_id: assoc.ps_id,
            person_id,
            phone_number_id,
            phone_type: assoc.phone_type,
            is_preferred: assoc.is_preferred,
        });
    }
    outcome
}

pub fn resolve_student_contacts(
    unresolved: Vec<UnresolvedStudentContact>,
    students: &IdMap,
    persons: &IdMap,
) -> ReconcileOutcome<StudentContactAssociation> {
    let mut outcome = ReconcileOutcome::default();
    for assoc in unresolved {
        let Some(student_id) = require_ref(
            students,
            "student",
            assoc.student_ps_id,
            assoc.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        let Some(person_id) = require_ref(
            persons,
            "person",
            assoc.person_ps_id,
            assoc.ps_id,
            &mut outcome.skipped,
        ) else {
            continue;
        };
        outcome.resolved.push(StudentContactAssociation {
            ps_id: assoc.ps_id,
            student_id,
            person_id,
            relationship: assoc.relationship,
            is_emergency: assoc.is_emergency,
            receives_mail: assoc.receives_mail,
        });
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap()
    }

    fn grade(ps_id: i64, student_ps_id: i64, section_ps_id: i64) -> UnresolvedGrade {
        UnresolvedGrade {
            ps_id,
            student_ps_id: Some(student_ps_id),
            section_ps_id: Some(section_ps_id),
            standard_ps_id: None,
            store_code: Some("Q1".into()),
            letter_grade: Some("A".into()),
            percent: Some(95.0),
            comment: None,
        }
    }

    #[test]
    fn id_map_resolves_by_upstream_id() {
        let map = IdMap::from_pairs([(1, 50001), (2, 50002)]);
        assert_eq!(map.local_id(50001), Some(1));
        assert_eq!(map.local_id(50002), Some(2));
        assert_eq!(map.local_id(99999), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn one_unknown_reference_does_not_poison_the_batch() {
        let students = IdMap::from_pairs((1..=9).map(|i| (i, 50000 + i)));
        let sections = IdMap::from_pairs([(1, 3001)]);
        let standards = IdMap::from_pairs([]);

        let mut batch: Vec<_> = (1..=9).map(|i| grade(700 + i, 50000 + i, 3001)).collect();
        batch.push(grade(991, 59999, 3001)); // student never synced

        let outcome = resolve_grades(batch, &students, &sections, &standards, now());
        assert_eq!(outcome.resolved.len(), 9);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].ps_id, 991);
        assert!(outcome.skipped[0].reason.contains("student side"));
        assert!(outcome.skipped[0].reason.contains("59999"));
    }

    #[test]
    fn missing_required_reference_names_the_side() {
        let students = IdMap::from_pairs([(1, 50001)]);
        let sections = IdMap::from_pairs([(1, 3001)]);
        let standards = IdMap::from_pairs([]);

        let mut g = grade(700, 50001, 3001);
        g.section_ps_id = None;

        let outcome = resolve_grades(vec![g], &students, &sections, &standards, now());
        assert!(outcome.resolved.is_empty());
        assert!(outcome.skipped[0].reason.contains("section side"));
        assert!(outcome.skipped[0].reason.contains("missing"));
    }

    #[test]
    fn optional_references_resolve_or_drop() {
        let courses = IdMap::from_pairs([(10, 200)]);
        let schools = IdMap::from_pairs([(1, 100)]);
        let terms = IdMap::from_pairs([(5, 900)]);
        let teachers = IdMap::from_pairs([]);

        let section = UnresolvedSection {
            ps_id: 3001,
            ps_dcid: None,
            course_ps_id: Some(200),
            school_ps_id: Some(100),
            term_ps_id: Some(900),
            teacher_ps_id: Some(77), // never synced
            section_number: Some("2".into()),
            expression: None,
        };

        let outcome = resolve_sections(vec![section], &courses, &schools, &terms, &teachers, now());
        assert_eq!(outcome.resolved.len(), 1);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.resolved[0].term_id, Some(5));
        assert_eq!(outcome.resolved[0].teacher_id, None);
    }

    #[test]
    fn attendance_without_date_is_skipped() {
        let students = IdMap::from_pairs([(1, 50001)]);
        let codes = IdMap::from_pairs([(1, 10)]);
        let schools = IdMap::from_pairs([]);

        let mark = UnresolvedAttendance {
            ps_id: 88001,
            ps_dcid: None,
            student_ps_id: Some(50001),
            attendance_code_ps_id: Some(10),
            school_ps_id: None,
            att_date: None,
        };

        let outcome = resolve_attendance(vec![mark], &students, &codes, &schools, now());
        assert!(outcome.resolved.is_empty());
        assert!(outcome.skipped[0].reason.contains("date"));
    }

    #[test]
    fn student_contact_resolves_both_sides() {
        let students = IdMap::from_pairs([(9, 50001)]);
        let persons = IdMap::from_pairs([(3, 61001)]);

        let assoc = UnresolvedStudentContact {
            ps_id: 41,
            student_ps_id: Some(50001),
            person_ps_id: Some(61001),
            relationship: Some("Mother".into()),
            is_emergency: true,
            receives_mail: true,
        };

        let outcome = resolve_student_contacts(vec![assoc], &students, &persons);
        assert_eq!(outcome.resolved.len(), 1);
        assert_eq!(outcome.resolved[0].student_id, 9);
        assert_eq!(outcome.resolved[0].person_id, 3);
    }
}
