//! Maps raw named-query records into domain types.
//!
//! Records missing their upstream `id` (or another required column) are
//! logged and dropped; a malformed row never aborts a sync step.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::models::attendance::{AttendanceCode, UnresolvedAttendance};
use crate::models::contact::{
    EmailAddress, Person, PhoneNumber, UnresolvedPersonEmail, UnresolvedPersonPhone,
    UnresolvedStudentContact,
};
use crate::models::course::{Course, UnresolvedSection};
use crate::models::grade::UnresolvedGrade;
use crate::models::school::School;
use crate::models::staff::Teacher;
use crate::models::standard::Standard;
use crate::models::student::Student;
use crate::models::term::Term;

use super::models::{field_bool, field_date, field_f64, field_i64, field_str};

pub struct RecordMapper;

macro_rules! require {
    ($record:expr, $value:expr, $entity:literal, $column:literal) => {
        match $value {
            Some(v) => v,
            None => {
                warn!(entity = $entity, column = $column, "Dropping record with missing required column");
                return None;
            }
        }
    };
}

impl RecordMapper {
    pub fn map_schools(records: &[Value], synced_at: DateTime<Utc>) -> Vec<School> {
        records
            .iter()
            .filter_map(|r| Self::map_school(r, synced_at))
            .collect()
    }

    fn map_school(record: &Value, synced_at: DateTime<Utc>) -> Option<School> {
        Some(School {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "school", "id"),
            ps_dcid: field_i64(record, "dcid"),
            name: require!(record, field_str(record, "name"), "school", "name"),
            school_number: field_str(record, "school_number"),
            city: field_str(record, "city"),
            state: field_str(record, "state"),
            synced_at,
        })
    }

    pub fn map_terms(records: &[Value], synced_at: DateTime<Utc>) -> Vec<Term> {
        records
            .iter()
            .filter_map(|r| Self::map_term(r, synced_at))
            .collect()
    }

    fn map_term(record: &Value, synced_at: DateTime<Utc>) -> Option<Term> {
        Some(Term {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "term", "id"),
            ps_dcid: field_i64(record, "dcid"),
            name: require!(record, field_str(record, "name"), "term", "name"),
            abbreviation: field_str(record, "abbreviation"),
            start_date: field_date(record, "first_day"),
            end_date: field_date(record, "last_day"),
            year_id: field_i64(record, "year_id"),
            synced_at,
        })
    }

    pub fn map_teachers(records: &[Value], synced_at: DateTime<Utc>) -> Vec<Teacher> {
        records
            .iter()
            .filter_map(|r| Self::map_teacher(r, synced_at))
            .collect()
    }

    fn map_teacher(record: &Value, synced_at: DateTime<Utc>) -> Option<Teacher> {
        Some(Teacher {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "teacher", "id"),
            ps_dcid: field_i64(record, "dcid"),
            first_name: require!(record, field_str(record, "first_name"), "teacher", "first_name"),
            last_name: require!(record, field_str(record, "last_name"), "teacher", "last_name"),
            email: field_str(record, "email_addr"),
            school_ps_id: field_i64(record, "school_id"),
            synced_at,
        })
    }

    pub fn map_students(records: &[Value], synced_at: DateTime<Utc>) -> Vec<Student> {
        records
            .iter()
            .filter_map(|r| Self::map_student(r, synced_at))
            .collect()
    }

    fn map_student(record: &Value, synced_at: DateTime<Utc>) -> Option<Student> {
        Some(Student {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "student", "id"),
            ps_dcid: field_i64(record, "dcid"),
            first_name: require!(record, field_str(record, "first_name"), "student", "first_name"),
            last_name: require!(record, field_str(record, "last_name"), "student", "last_name"),
            student_number: field_str(record, "student_number"),
            grade_level: field_i64(record, "grade_level"),
            enroll_status: field_i64(record, "enroll_status"),
            school_ps_id: field_i64(record, "school_id"),
            preferred_name: None,
            report_card_generated_at: None,
            synced_at,
        })
    }

    pub fn map_courses(records: &[Value], synced_at: DateTime<Utc>) -> Vec<Course> {
        records
            .iter()
            .filter_map(|r| Self::map_course(r, synced_at))
            .collect()
    }

    fn map_course(record: &Value, synced_at: DateTime<Utc>) -> Option<Course> {
        Some(Course {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "course", "id"),
            ps_dcid: field_i64(record, "dcid"),
            course_number: require!(
                record,
                field_str(record, "course_number"),
                "course",
                "course_number"
            ),
            course_name: require!(record, field_str(record, "course_name"), "course", "course_name"),
            credit_hours: field_f64(record, "credit_hours"),
            synced_at,
        })
    }

    pub fn map_sections(records: &[Value]) -> Vec<UnresolvedSection> {
        records.iter().filter_map(Self::map_section).collect()
    }

    fn map_section(record: &Value) -> Option<UnresolvedSection> {
        Some(UnresolvedSection {
            ps_id: require!(record, field_i64(record, "id"), "section", "id"),
            ps_dcid: field_i64(record, "dcid"),
            course_ps_id: field_i64(record, "course_id"),
            school_ps_id: field_i64(record, "school_id"),
            term_ps_id: field_i64(record, "term_id"),
            teacher_ps_id: field_i64(record, "teacher_id"),
            section_number: field_str(record, "section_number"),
            expression: field_str(record, "expression"),
        })
    }

    pub fn map_standards(records: &[Value], synced_at: DateTime<Utc>) -> Vec<Standard> {
        records
            .iter()
            .filter_map(|r| Self::map_standard(r, synced_at))
            .collect()
    }

    fn map_standard(record: &Value, synced_at: DateTime<Utc>) -> Option<Standard> {
        Some(Standard {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "standard", "id"),
            identifier: require!(record, field_str(record, "identifier"), "standard", "identifier"),
            name: require!(record, field_str(record, "name"), "standard", "name"),
            description: field_str(record, "description"),
            subject_area: field_str(record, "subject_area"),
            synced_at,
        })
    }

    pub fn map_attendance_codes(records: &[Value], synced_at: DateTime<Utc>) -> Vec<AttendanceCode> {
        records
            .iter()
            .filter_map(|r| Self::map_attendance_code(r, synced_at))
            .collect()
    }

    fn map_attendance_code(record: &Value, synced_at: DateTime<Utc>) -> Option<AttendanceCode> {
        let counts_as_present = field_str(record, "presence_status")
            .map(|s| s.eq_ignore_ascii_case("present"))
            .or_else(|| field_bool(record, "counts_as_present"))
            .unwrap_or(false);
        Some(AttendanceCode {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "attendance_code", "id"),
            code: require!(record, field_str(record, "att_code"), "attendance_code", "att_code"),
            description: field_str(record, "description"),
            counts_as_present,
            synced_at,
        })
    }

    pub fn map_grades(records: &[Value]) -> Vec<UnresolvedGrade> {
        records.iter().filter_map(Self::map_grade).collect()
    }

    fn map_grade(record: &Value) -> Option<UnresolvedGrade> {
        Some(UnresolvedGrade {
            ps_id: require!(record, field_i64(record, "id"), "grade", "id"),
            student_ps_id: field_i64(record, "student_id"),
            section_ps_id: field_i64(record, "section_id"),
            standard_ps_id: field_i64(record, "standard_id"),
            store_code: field_str(record, "store_code"),
            letter_grade: field_str(record, "grade"),
            percent: field_f64(record, "percent"),
            comment: field_str(record, "comment_value"),
        })
    }

    pub fn map_attendance(records: &[Value]) -> Vec<UnresolvedAttendance> {
        records.iter().filter_map(Self::map_attendance_mark).collect()
    }

    fn map_attendance_mark(record: &Value) -> Option<UnresolvedAttendance> {
        Some(UnresolvedAttendance {
            ps_id: require!(record, field_i64(record, "id"), "attendance", "id"),
            ps_dcid: field_i64(record, "dcid"),
            student_ps_id: field_i64(record, "student_id"),
            attendance_code_ps_id: field_i64(record, "attendance_code_id"),
            school_ps_id: field_i64(record, "school_id"),
            att_date: field_date(record, "att_date"),
        })
    }

    pub fn map_persons(records: &[Value], synced_at: DateTime<Utc>) -> Vec<Person> {
        records
            .iter()
            .filter_map(|r| Self::map_person(r, synced_at))
            .collect()
    }

    fn map_person(record: &Value, synced_at: DateTime<Utc>) -> Option<Person> {
        Some(Person {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "person", "id"),
            ps_dcid: field_i64(record, "dcid"),
            first_name: require!(record, field_str(record, "first_name"), "person", "first_name"),
            last_name: require!(record, field_str(record, "last_name"), "person", "last_name"),
            is_active: field_bool(record, "is_active").unwrap_or(true),
            synced_at,
        })
    }

    pub fn map_email_addresses(records: &[Value], synced_at: DateTime<Utc>) -> Vec<EmailAddress> {
        records
            .iter()
            .filter_map(|r| Self::map_email_address(r, synced_at))
            .collect()
    }

    fn map_email_address(record: &Value, synced_at: DateTime<Utc>) -> Option<EmailAddress> {
        Some(EmailAddress {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "email_address", "id"),
            address: require!(
                record,
                field_str(record, "email_address"),
                "email_address",
                "email_address"
            ),
            synced_at,
        })
    }

    pub fn map_phone_numbers(records: &[Value], synced_at: DateTime<Utc>) -> Vec<PhoneNumber> {
        records
            .iter()
            .filter_map(|r| Self::map_phone_number(r, synced_at))
            .collect()
    }

    fn map_phone_number(record: &Value, synced_at: DateTime<Utc>) -> Option<PhoneNumber> {
        Some(PhoneNumber {
            id: 0,
            ps_id: require!(record, field_i64(record, "id"), "phone_number", "id"),
            number: require!(record, field_str(record, "phone_number"), "phone_number", "phone_number"),
            extension: field_str(record, "extension"),
            synced_at,
        })
    }

    pub fn map_person_email_associations(records: &[Value]) -> Vec<UnresolvedPersonEmail> {
        records.iter().filter_map(Self::map_person_email).collect()
    }

    fn map_person_email(record: &Value) -> Option<UnresolvedPersonEmail> {
        Some(UnresolvedPersonEmail {
            ps_id: require!(record, field_i64(record, "id"), "person_email", "id"),
            person_ps_id: field_i64(record, "person_id"),
            email_ps_id: field_i64(record, "email_address_id"),
            is_primary: field_bool(record, "is_primary").unwrap_or(false),
        })
    }

    pub fn map_person_phone_associations(records: &[Value]) -> Vec<UnresolvedPersonPhone> {
        records.iter().filter_map(Self::map_person_phone).collect()
    }

    fn map_person_phone(record: &Value) -> Option<UnresolvedPersonPhone> {
        Some(UnresolvedPersonPhone {
            ps_id: require!(record, field_i64(record, "id"), "person_phone", "id"),
            person_ps_id: field_i64(record, "person_id"),
            phone_ps_id: field_i64(record, "phone_number_id"),
            phone_type: field_str(record, "phone_type"),
            is_preferred: field_bool(record, "is_preferred").unwrap_or(false),
        })
    }

    pub fn map_student_contact_associations(records: &[Value]) -> Vec<UnresolvedStudentContact> {
        records.iter().filter_map(Self::map_student_contact).collect()
    }

    fn map_student_contact(record: &Value) -> Option<UnresolvedStudentContact> {
        Some(UnresolvedStudentContact {
            ps_id: require!(record, field_i64(record, "id"), "student_contact", "id"),
            student_ps_id: field_i64(record, "student_id"),
            person_ps_id: field_i64(record, "person_id"),
            relationship: field_str(record, "relationship"),
            is_emergency: field_bool(record, "is_emergency").unwrap_or(false),
            receives_mail: field_bool(record, "receives_mail").unwrap_or(false),
        })
    }
}
