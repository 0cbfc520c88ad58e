use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    attendance::{Attendance, AttendanceCode},
    contact::{
        EmailAddress, Person, PersonEmailAssociation, PersonPhoneAssociation, PhoneNumber,
        StudentContactAssociation,
    },
    course::{Course, Section},
    credential::SisCredential,
    grade::Grade,
    school::School,
    staff::Teacher,
    standard::Standard,
    student::Student,
    sync::{EntityCounts, EntityKind, SyncRun},
    term::Term,
};

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn upsert_schools(&self, schools: &[School]) -> Result<()>;
    async fn get_school_by_ps_id(&self, ps_id: i64) -> Result<Option<School>>;
    async fn list_schools(&self) -> Result<Vec<School>>;
}

#[async_trait]
pub trait TermRepository: Send + Sync {
    async fn upsert_terms(&self, terms: &[Term]) -> Result<()>;
    async fn get_term_by_ps_id(&self, ps_id: i64) -> Result<Option<Term>>;
    async fn list_terms(&self) -> Result<Vec<Term>>;
}

#[async_trait]
pub trait TeacherRepository: Send + Sync {
    async fn upsert_teachers(&self, teachers: &[Teacher]) -> Result<()>;
    async fn get_teacher_by_ps_id(&self, ps_id: i64) -> Result<Option<Teacher>>;
    async fn list_teachers(&self) -> Result<Vec<Teacher>>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn upsert_students(&self, students: &[Student]) -> Result<()>;
    async fn get_student_by_ps_id(&self, ps_id: i64) -> Result<Option<Student>>;
    async fn list_students(&self) -> Result<Vec<Student>>;
    /// Set the locally-owned preferred name; `None` clears it.
    async fn set_preferred_name(&self, student_id: i64, name: Option<&str>) -> Result<bool>;
    /// Record when a report card was last generated for the student.
    async fn set_report_card_generated(
        &self,
        student_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn upsert_courses(&self, courses: &[Course]) -> Result<()>;
    async fn get_course_by_ps_id(&self, ps_id: i64) -> Result<Option<Course>>;
    async fn list_courses(&self) -> Result<Vec<Course>>;
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn upsert_sections(&self, sections: &[Section]) -> Result<()>;
    async fn get_section_by_ps_id(&self, ps_id: i64) -> Result<Option<Section>>;
    async fn list_sections(&self) -> Result<Vec<Section>>;
}

#[async_trait]
pub trait StandardRepository: Send + Sync {
    async fn upsert_standards(&self, standards: &[Standard]) -> Result<()>;
    async fn get_standard_by_ps_id(&self, ps_id: i64) -> Result<Option<Standard>>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn upsert_attendance_codes(&self, codes: &[AttendanceCode]) -> Result<()>;
    async fn get_attendance_code_by_ps_id(&self, ps_id: i64) -> Result<Option<AttendanceCode>>;
    async fn upsert_attendance(&self, marks: &[Attendance]) -> Result<()>;
    async fn list_attendance_for_student(&self, student_id: i64) -> Result<Vec<Attendance>>;
}

#[async_trait]
pub trait GradeRepository: Send + Sync {
    async fn upsert_grades(&self, grades: &[Grade]) -> Result<()>;
    async fn list_grades_for_student(&self, student_id: i64) -> Result<Vec<Grade>>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn upsert_persons(&self, persons: &[Person]) -> Result<()>;
    async fn get_person_by_ps_id(&self, ps_id: i64) -> Result<Option<Person>>;
    async fn upsert_email_addresses(&self, addresses: &[EmailAddress]) -> Result<()>;
    async fn upsert_phone_numbers(&self, numbers: &[PhoneNumber]) -> Result<()>;
    async fn upsert_person_email_associations(
        &self,
        associations: &[PersonEmailAssociation],
    ) -> Result<()>;
    async fn upsert_person_phone_associations(
        &self,
        associations: &[PersonPhoneAssociation],
    ) -> Result<()>;
    async fn upsert_student_contact_associations(
        &self,
        associations: &[StudentContactAssociation],
    ) -> Result<()>;
    async fn list_contacts_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentContactAssociation>>;
}

/// Lifecycle of sync run records.
///
/// A run moves pending -> running -> completed | failed. The claim is a
/// conditional update so at most one run holds `running` at a time, and
/// terminal runs are never transitioned again.
#[async_trait]
pub trait SyncRunRepository: Send + Sync {
    /// Insert a new run in `pending` state.
    async fn create_run(&self, entity_type: &str) -> Result<SyncRun>;
    /// Atomically claim the run for execution. Returns false when another
    /// run is already running or the run left `pending` state.
    async fn try_claim_run(&self, id: i64) -> Result<bool>;
    async fn mark_completed(
        &self,
        id: i64,
        record_count: i64,
        skipped_count: i64,
        details: Option<&serde_json::Value>,
    ) -> Result<()>;
    async fn mark_failed(
        &self,
        id: i64,
        error_message: &str,
        record_count: i64,
        skipped_count: i64,
        details: Option<&serde_json::Value>,
    ) -> Result<()>;
    async fn get_run(&self, id: i64) -> Result<Option<SyncRun>>;
    async fn latest_run(&self) -> Result<Option<SyncRun>>;
    async fn list_runs(&self, limit: i64) -> Result<Vec<SyncRun>>;
    /// True while a run holds `running`. Unclaimed `pending` rows do not
    /// count; they never block a new sync.
    async fn any_run_in_progress(&self) -> Result<bool>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn get_credential(&self) -> Result<Option<SisCredential>>;
    async fn upsert_credential(&self, credential: &SisCredential) -> Result<()>;
    /// Persist a freshly minted access token on the stored credential.
    async fn save_token(&self, access_token: &str, expires_at: DateTime<Utc>) -> Result<()>;
}

/// Bulk `(local_id, ps_id)` lookups used by identifier reconciliation.
#[async_trait]
pub trait IdMapRepository: Send + Sync {
    async fn list_id_pairs(&self, kind: EntityKind) -> Result<Vec<(i64, i64)>>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn entity_counts(&self) -> Result<EntityCounts>;
}

/// Combined repository trait covering everything the engine persists.
pub trait SlateRepository:
    SchoolRepository
    + TermRepository
    + TeacherRepository
    + StudentRepository
    + CourseRepository
    + SectionRepository
    + StandardRepository
    + AttendanceRepository
    + GradeRepository
    + ContactRepository
    + SyncRunRepository
    + CredentialRepository
    + IdMapRepository
    + StatsRepository
{
}
