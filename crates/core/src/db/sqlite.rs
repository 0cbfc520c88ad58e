use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::error::{Result, SlateError};
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
    sync::{EntityCounts, EntityKind, SyncRun, SyncStatus},
    term::Term,
};

use super::repository::{
    AttendanceRepository, ContactRepository, CourseRepository, CredentialRepository,
    GradeRepository, IdMapRepository, SchoolRepository, SectionRepository, SlateRepository,
    StandardRepository, StatsRepository, StudentRepository, SyncRunRepository, TeacherRepository,
    TermRepository,
};

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn count_table(&self, table: &str) -> Result<i64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

impl SlateRepository for SqliteRepository {}

// -- Helper functions for TEXT-encoded values --

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!(value = %s, "Stored datetime is not RFC 3339, substituting now");
            Utc::now()
        })
}

fn datetime_to_str(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_opt_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|v| parse_datetime(&v))
}

fn parse_naive_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| {
        warn!(value = %s, "Stored date is not YYYY-MM-DD, substituting sentinel");
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
    })
}

fn naive_date_to_str(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_opt_date(s: Option<String>) -> Option<NaiveDate> {
    s.map(|v| parse_naive_date(&v))
}

fn parse_details(s: Option<String>) -> Option<serde_json::Value> {
    s.and_then(|v| serde_json::from_str(&v).ok())
}

fn parse_sync_status(s: &str) -> SyncStatus {
    match s {
        "pending" => SyncStatus::Pending,
        "running" => SyncStatus::Running,
        "completed" => SyncStatus::Completed,
        "failed" => SyncStatus::Failed,
        _ => SyncStatus::Failed,
    }
}

fn sync_status_to_str(s: &SyncStatus) -> &'static str {
    match s {
        SyncStatus::Pending => "pending",
        SyncStatus::Running => "running",
        SyncStatus::Completed => "completed",
        SyncStatus::Failed => "failed",
    }
}

// -- Row mappers --

fn row_to_school(r: &sqlx::sqlite::SqliteRow) -> School {
    School {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        name: r.get("name"),
        school_number: r.get("school_number"),
        city: r.get("city"),
        state: r.get("state"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_term(r: &sqlx::sqlite::SqliteRow) -> Term {
    Term {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        name: r.get("name"),
        abbreviation: r.get("abbreviation"),
        start_date: parse_opt_date(r.get("start_date")),
        end_date: parse_opt_date(r.get("end_date")),
        year_id: r.get("year_id"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_teacher(r: &sqlx::sqlite::SqliteRow) -> Teacher {
    Teacher {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        email: r.get("email"),
        school_ps_id: r.get("school_ps_id"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_student(r: &sqlx::sqlite::SqliteRow) -> Student {
    Student {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        student_number: r.get("student_number"),
        grade_level: r.get("grade_level"),
        enroll_status: r.get("enroll_status"),
        school_ps_id: r.get("school_ps_id"),
        preferred_name: r.get("preferred_name"),
        report_card_generated_at: parse_opt_datetime(r.get("report_card_generated_at")),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_course(r: &sqlx::sqlite::SqliteRow) -> Course {
    Course {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        course_number: r.get("course_number"),
        course_name: r.get("course_name"),
        credit_hours: r.get("credit_hours"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_section(r: &sqlx::sqlite::SqliteRow) -> Section {
    Section {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        course_id: r.get("course_id"),
        school_id: r.get("school_id"),
        term_id: r.get("term_id"),
        teacher_id: r.get("teacher_id"),
        section_number: r.get("section_number"),
        expression: r.get("expression"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_standard(r: &sqlx::sqlite::SqliteRow) -> Standard {
    Standard {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        identifier: r.get("identifier"),
        name: r.get("name"),
        description: r.get("description"),
        subject_area: r.get("subject_area"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_attendance_code(r: &sqlx::sqlite::SqliteRow) -> AttendanceCode {
    AttendanceCode {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        code: r.get("code"),
        description: r.get("description"),
        counts_as_present: r.get("counts_as_present"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_attendance(r: &sqlx::sqlite::SqliteRow) -> Attendance {
    Attendance {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        student_id: r.get("student_id"),
        attendance_code_id: r.get("attendance_code_id"),
        school_id: r.get("school_id"),
        att_date: parse_naive_date(r.get("att_date")),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_grade(r: &sqlx::sqlite::SqliteRow) -> Grade {
    Grade {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        student_id: r.get("student_id"),
        section_id: r.get("section_id"),
        standard_id: r.get("standard_id"),
        store_code: r.get("store_code"),
        letter_grade: r.get("letter_grade"),
        percent: r.get("percent"),
        comment: r.get("comment"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_person(r: &sqlx::sqlite::SqliteRow) -> Person {
    Person {
        id: r.get("id"),
        ps_id: r.get("ps_id"),
        ps_dcid: r.get("ps_dcid"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        is_active: r.get("is_active"),
        synced_at: parse_datetime(r.get("synced_at")),
    }
}

fn row_to_sync_run(r: &sqlx::sqlite::SqliteRow) -> SyncRun {
    SyncRun {
        id: r.get("id"),
        entity_type: r.get("entity_type"),
        status: parse_sync_status(r.get("status")),
        started_at: parse_datetime(r.get("started_at")),
        completed_at: parse_opt_datetime(r.get("completed_at")),
        record_count: r.get("record_count"),
        skipped_count: r.get("skipped_count"),
        error_message: r.get("error_message"),
        details: parse_details(r.get("details")),
    }
}

// -- SchoolRepository --

#[async_trait]
impl SchoolRepository for SqliteRepository {
    async fn upsert_schools(&self, schools: &[School]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for school in schools {
            sqlx::query(
                "INSERT INTO schools (ps_id, ps_dcid, name, school_number, city, state, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     name = excluded.name,
                     school_number = excluded.school_number,
                     city = excluded.city,
                     state = excluded.state,
                     synced_at = excluded.synced_at",
            )
            .bind(school.ps_id)
            .bind(school.ps_dcid)
            .bind(&school.name)
            .bind(&school.school_number)
            .bind(&school.city)
            .bind(&school.state)
            .bind(datetime_to_str(&school.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_school_by_ps_id(&self, ps_id: i64) -> Result<Option<School>> {
        let row = sqlx::query("SELECT * FROM schools WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_school))
    }

    async fn list_schools(&self) -> Result<Vec<School>> {
        let rows = sqlx::query("SELECT * FROM schools ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_school).collect())
    }
}

// -- TermRepository --

#[async_trait]
impl TermRepository for SqliteRepository {
    async fn upsert_terms(&self, terms: &[Term]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for term in terms {
            sqlx::query(
                "INSERT INTO terms (ps_id, ps_dcid, name, abbreviation, start_date, end_date, year_id, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     name = excluded.name,
                     abbreviation = excluded.abbreviation,
                     start_date = excluded.start_date,
                     end_date = excluded.end_date,
                     year_id = excluded.year_id,
                     synced_at = excluded.synced_at",
            )
            .bind(term.ps_id)
            .bind(term.ps_dcid)
            .bind(&term.name)
            .bind(&term.abbreviation)
            .bind(term.start_date.as_ref().map(naive_date_to_str))
            .bind(term.end_date.as_ref().map(naive_date_to_str))
            .bind(term.year_id)
            .bind(datetime_to_str(&term.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_term_by_ps_id(&self, ps_id: i64) -> Result<Option<Term>> {
        let row = sqlx::query("SELECT * FROM terms WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_term))
    }

    async fn list_terms(&self) -> Result<Vec<Term>> {
        let rows = sqlx::query("SELECT * FROM terms ORDER BY start_date")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_term).collect())
    }
}

// -- TeacherRepository --

#[async_trait]
impl TeacherRepository for SqliteRepository {
    async fn upsert_teachers(&self, teachers: &[Teacher]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for teacher in teachers {
            sqlx::query(
                "INSERT INTO teachers (ps_id, ps_dcid, first_name, last_name, email, school_ps_id, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     first_name = excluded.first_name,
                     last_name = excluded.last_name,
                     email = excluded.email,
                     school_ps_id = excluded.school_ps_id,
                     synced_at = excluded.synced_at",
            )
            .bind(teacher.ps_id)
            .bind(teacher.ps_dcid)
            .bind(&teacher.first_name)
            .bind(&teacher.last_name)
            .bind(&teacher.email)
            .bind(teacher.school_ps_id)
            .bind(datetime_to_str(&teacher.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_teacher_by_ps_id(&self, ps_id: i64) -> Result<Option<Teacher>> {
        let row = sqlx::query("SELECT * FROM teachers WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_teacher))
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>> {
        let rows = sqlx::query("SELECT * FROM teachers ORDER BY last_name, first_name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_teacher).collect())
    }
}

// -- StudentRepository --

#[async_trait]
impl StudentRepository for SqliteRepository {
    async fn upsert_students(&self, students: &[Student]) -> Result<()> {
        // preferred_name and report_card_generated_at are portal-owned and
        // deliberately absent from the conflict update.
        let mut tx = self.pool.begin().await?;
        for student in students {
            sqlx::query(
                "INSERT INTO students (ps_id, ps_dcid, first_name, last_name, student_number, grade_level, enroll_status, school_ps_id, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     first_name = excluded.first_name,
                     last_name = excluded.last_name,
                     student_number = excluded.student_number,
                     grade_level = excluded.grade_level,
                     enroll_status = excluded.enroll_status,
                     school_ps_id = excluded.school_ps_id,
                     synced_at = excluded.synced_at",
            )
            .bind(student.ps_id)
            .bind(student.ps_dcid)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(&student.student_number)
            .bind(student.grade_level)
            .bind(student.enroll_status)
            .bind(student.school_ps_id)
            .bind(datetime_to_str(&student.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_student_by_ps_id(&self, ps_id: i64) -> Result<Option<Student>> {
        let row = sqlx::query("SELECT * FROM students WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_student))
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query("SELECT * FROM students ORDER BY last_name, first_name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_student).collect())
    }

    async fn set_preferred_name(&self, student_id: i64, name: Option<&str>) -> Result<bool> {
        let result = sqlx::query("UPDATE students SET preferred_name = ?1 WHERE id = ?2")
            .bind(name)
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_report_card_generated(
        &self,
        student_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE students SET report_card_generated_at = ?1 WHERE id = ?2")
                .bind(datetime_to_str(&at))
                .bind(student_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

// -- CourseRepository --

#[async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_courses(&self, courses: &[Course]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for course in courses {
            sqlx::query(
                "INSERT INTO courses (ps_id, ps_dcid, course_number, course_name, credit_hours, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     course_number = excluded.course_number,
                     course_name = excluded.course_name,
                     credit_hours = excluded.credit_hours,
                     synced_at = excluded.synced_at",
            )
            .bind(course.ps_id)
            .bind(course.ps_dcid)
            .bind(&course.course_number)
            .bind(&course.course_name)
            .bind(course.credit_hours)
            .bind(datetime_to_str(&course.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_course_by_ps_id(&self, ps_id: i64) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT * FROM courses WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_course))
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query("SELECT * FROM courses ORDER BY course_number")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_course).collect())
    }
}

// -- SectionRepository --

#[async_trait]
impl SectionRepository for SqliteRepository {
    async fn upsert_sections(&self, sections: &[Section]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for section in sections {
            sqlx::query(
                "INSERT INTO sections (ps_id, ps_dcid, course_id, school_id, term_id, teacher_id, section_number, expression, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     course_id = excluded.course_id,
                     school_id = excluded.school_id,
                     term_id = excluded.term_id,
                     teacher_id = excluded.teacher_id,
                     section_number = excluded.section_number,
                     expression = excluded.expression,
                     synced_at = excluded.synced_at",
            )
            .bind(section.ps_id)
            .bind(section.ps_dcid)
            .bind(section.course_id)
            .bind(section.school_id)
            .bind(section.term_id)
            .bind(section.teacher_id)
            .bind(&section.section_number)
            .bind(&section.expression)
            .bind(datetime_to_str(&section.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_section_by_ps_id(&self, ps_id: i64) -> Result<Option<Section>> {
        let row = sqlx::query("SELECT * FROM sections WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_section))
    }

    async fn list_sections(&self) -> Result<Vec<Section>> {
        let rows = sqlx::query("SELECT * FROM sections ORDER BY ps_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_section).collect())
    }
}

// -- StandardRepository --

#[async_trait]
impl StandardRepository for SqliteRepository {
    async fn upsert_standards(&self, standards: &[Standard]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for standard in standards {
            sqlx::query(
                "INSERT INTO standards (ps_id, identifier, name, description, subject_area, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     identifier = excluded.identifier,
                     name = excluded.name,
                     description = excluded.description,
                     subject_area = excluded.subject_area,
                     synced_at = excluded.synced_at",
            )
            .bind(standard.ps_id)
            .bind(&standard.identifier)
            .bind(&standard.name)
            .bind(&standard.description)
            .bind(&standard.subject_area)
            .bind(datetime_to_str(&standard.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_standard_by_ps_id(&self, ps_id: i64) -> Result<Option<Standard>> {
        let row = sqlx::query("SELECT * FROM standards WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_standard))
    }
}

// -- AttendanceRepository --

#[async_trait]
impl AttendanceRepository for SqliteRepository {
    async fn upsert_attendance_codes(&self, codes: &[AttendanceCode]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for code in codes {
            sqlx::query(
                "INSERT INTO attendance_codes (ps_id, code, description, counts_as_present, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     code = excluded.code,
                     description = excluded.description,
                     counts_as_present = excluded.counts_as_present,
                     synced_at = excluded.synced_at",
            )
            .bind(code.ps_id)
            .bind(&code.code)
            .bind(&code.description)
            .bind(code.counts_as_present)
            .bind(datetime_to_str(&code.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_attendance_code_by_ps_id(&self, ps_id: i64) -> Result<Option<AttendanceCode>> {
        let row = sqlx::query("SELECT * FROM attendance_codes WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_attendance_code))
    }

    async fn upsert_attendance(&self, marks: &[Attendance]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for mark in marks {
            sqlx::query(
                "INSERT INTO attendance (ps_id, ps_dcid, student_id, attendance_code_id, school_id, att_date, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     student_id = excluded.student_id,
                     attendance_code_id = excluded.attendance_code_id,
                     school_id = excluded.school_id,
                     att_date = excluded.att_date,
                     synced_at = excluded.synced_at",
            )
            .bind(mark.ps_id)
            .bind(mark.ps_dcid)
            .bind(mark.student_id)
            .bind(mark.attendance_code_id)
            .bind(mark.school_id)
            .bind(naive_date_to_str(&mark.att_date))
            .bind(datetime_to_str(&mark.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_attendance_for_student(&self, student_id: i64) -> Result<Vec<Attendance>> {
        let rows =
            sqlx::query("SELECT * FROM attendance WHERE student_id = ?1 ORDER BY att_date")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(row_to_attendance).collect())
    }
}

// -- GradeRepository --

#[async_trait]
impl GradeRepository for SqliteRepository {
    async fn upsert_grades(&self, grades: &[Grade]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for grade in grades {
            sqlx::query(
                "INSERT INTO grades (ps_id, student_id, section_id, standard_id, store_code, letter_grade, percent, comment, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     student_id = excluded.student_id,
                     section_id = excluded.section_id,
                     standard_id = excluded.standard_id,
                     store_code = excluded.store_code,
                     letter_grade = excluded.letter_grade,
                     percent = excluded.percent,
                     comment = excluded.comment,
                     synced_at = excluded.synced_at",
            )
            .bind(grade.ps_id)
            .bind(grade.student_id)
            .bind(grade.section_id)
            .bind(grade.standard_id)
            .bind(&grade.store_code)
            .bind(&grade.letter_grade)
            .bind(grade.percent)
            .bind(&grade.comment)
            .bind(datetime_to_str(&grade.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_grades_for_student(&self, student_id: i64) -> Result<Vec<Grade>> {
        let rows = sqlx::query("SELECT * FROM grades WHERE student_id = ?1 ORDER BY ps_id")
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_grade).collect())
    }
}

// -- ContactRepository --

#[async_trait]
impl ContactRepository for SqliteRepository {
    async fn upsert_persons(&self, persons: &[Person]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for person in persons {
            sqlx::query(
                "INSERT INTO persons (ps_id, ps_dcid, first_name, last_name, is_active, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     ps_dcid = excluded.ps_dcid,
                     first_name = excluded.first_name,
                     last_name = excluded.last_name,
                     is_active = excluded.is_active,
                     synced_at = excluded.synced_at",
            )
            .bind(person.ps_id)
            .bind(person.ps_dcid)
            .bind(&person.first_name)
            .bind(&person.last_name)
            .bind(person.is_active)
            .bind(datetime_to_str(&person.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_person_by_ps_id(&self, ps_id: i64) -> Result<Option<Person>> {
        let row = sqlx::query("SELECT * FROM persons WHERE ps_id = ?1")
            .bind(ps_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_person))
    }

    async fn upsert_email_addresses(&self, addresses: &[EmailAddress]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for address in addresses {
            sqlx::query(
                "INSERT INTO email_addresses (ps_id, address, synced_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     address = excluded.address,
                     synced_at = excluded.synced_at",
            )
            .bind(address.ps_id)
            .bind(&address.address)
            .bind(datetime_to_str(&address.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_phone_numbers(&self, numbers: &[PhoneNumber]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for number in numbers {
            sqlx::query(
                "INSERT INTO phone_numbers (ps_id, number, extension, synced_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     number = excluded.number,
                     extension = excluded.extension,
                     synced_at = excluded.synced_at",
            )
            .bind(number.ps_id)
            .bind(&number.number)
            .bind(&number.extension)
            .bind(datetime_to_str(&number.synced_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_person_email_associations(
        &self,
        associations: &[PersonEmailAssociation],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for assoc in associations {
            sqlx::query(
                "INSERT INTO person_email_associations (ps_id, person_id, email_address_id, is_primary)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     person_id = excluded.person_id,
                     email_address_id = excluded.email_address_id,
                     is_primary = excluded.is_primary",
            )
            .bind(assoc.ps_id)
            .bind(assoc.person_id)
            .bind(assoc.email_address_id)
            .bind(assoc.is_primary)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_person_phone_associations(
        &self,
        associations: &[PersonPhoneAssociation],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for assoc in associations {
            sqlx::query(
                "INSERT INTO person_phone_associations (ps_id, person_id, phone_number_id, phone_type, is_preferred)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     person_id = excluded.person_id,
                     phone_number_id = excluded.phone_number_id,
                     phone_type = excluded.phone_type,
                     is_preferred = excluded.is_preferred",
            )
            .bind(assoc.ps_id)
            .bind(assoc.person_id)
            .bind(assoc.phone_number_id)
            .bind(&assoc.phone_type)
            .bind(assoc.is_preferred)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_student_contact_associations(
        &self,
        associations: &[StudentContactAssociation],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for assoc in associations {
            sqlx::query(
                "INSERT INTO student_contact_associations (ps_id, student_id, person_id, relationship, is_emergency, receives_mail)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(ps_id) DO UPDATE SET
                     student_id = excluded.student_id,
                     person_id = excluded.person_id,
                     relationship = excluded.relationship,
                     is_emergency = excluded.is_emergency,
                     receives_mail = excluded.receives_mail",
            )
            .bind(assoc.ps_id)
            .bind(assoc.student_id)
            .bind(assoc.person_id)
            .bind(&assoc.relationship)
            .bind(assoc.is_emergency)
            .bind(assoc.receives_mail)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_contacts_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentContactAssociation>> {
        let rows = sqlx::query(
            "SELECT * FROM student_contact_associations WHERE student_id = ?1 ORDER BY ps_id",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| StudentContactAssociation {
                ps_id: r.get("ps_id"),
                student_id: r.get("student_id"),
                person_id: r.get("person_id"),
                relationship: r.get("relationship"),
                is_emergency: r.get("is_emergency"),
                receives_mail: r.get("receives_mail"),
            })
            .collect())
    }
}

// -- SyncRunRepository --

#[async_trait]
impl SyncRunRepository for SqliteRepository {
    async fn create_run(&self, entity_type: &str) -> Result<SyncRun> {
        let now = datetime_to_str(&Utc::now());
        let result = sqlx::query(
            "INSERT INTO sync_runs (entity_type, status, started_at, record_count, skipped_count)
             VALUES (?1, ?2, ?3, 0, 0)",
        )
        .bind(entity_type)
        .bind(sync_status_to_str(&SyncStatus::Pending))
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(SyncRun {
            id: result.last_insert_rowid(),
            entity_type: entity_type.to_string(),
            status: SyncStatus::Pending,
            started_at: parse_datetime(&now),
            completed_at: None,
            record_count: 0,
            skipped_count: 0,
            error_message: None,
            details: None,
        })
    }

    async fn try_claim_run(&self, id: i64) -> Result<bool> {
        // Single conditional UPDATE: the claim succeeds only while no other
        // run holds `running`, without a separate check-then-set window.
        let result = sqlx::query(
            "UPDATE sync_runs SET status = 'running', started_at = ?1
             WHERE id = ?2 AND status = 'pending'
               AND NOT EXISTS (SELECT 1 FROM sync_runs WHERE status = 'running')",
        )
        .bind(datetime_to_str(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_completed(
        &self,
        id: i64,
        record_count: i64,
        skipped_count: i64,
        details: Option<&serde_json::Value>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sync_runs
             SET status = 'completed', completed_at = ?1, record_count = ?2, skipped_count = ?3, details = ?4
             WHERE id = ?5 AND status IN ('pending', 'running')",
        )
        .bind(datetime_to_str(&Utc::now()))
        .bind(record_count)
        .bind(skipped_count)
        .bind(details.map(|d| d.to_string()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SlateError::Sync(format!(
                "sync run {id} is missing or already in a terminal state"
            )));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: i64,
        error_message: &str,
        record_count: i64,
        skipped_count: i64,
        details: Option<&serde_json::Value>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sync_runs
             SET status = 'failed', completed_at = ?1, error_message = ?2, record_count = ?3, skipped_count = ?4, details = ?5
             WHERE id = ?6 AND status IN ('pending', 'running')",
        )
        .bind(datetime_to_str(&Utc::now()))
        .bind(error_message)
        .bind(record_count)
        .bind(skipped_count)
        .bind(details.map(|d| d.to_string()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SlateError::Sync(format!(
                "sync run {id} is missing or already in a terminal state"
            )));
        }
        Ok(())
    }

    async fn get_run(&self, id: i64) -> Result<Option<SyncRun>> {
        let row = sqlx::query("SELECT * FROM sync_runs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_sync_run))
    }

    async fn latest_run(&self) -> Result<Option<SyncRun>> {
        let row = sqlx::query("SELECT * FROM sync_runs ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_sync_run))
    }

    async fn list_runs(&self, limit: i64) -> Result<Vec<SyncRun>> {
        let rows = sqlx::query("SELECT * FROM sync_runs ORDER BY id DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_sync_run).collect())
    }

    async fn any_run_in_progress(&self) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sync_runs WHERE status = 'running'",
        )
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }
}

// -- CredentialRepository --

#[async_trait]
impl CredentialRepository for SqliteRepository {
    async fn get_credential(&self) -> Result<Option<SisCredential>> {
        let row = sqlx::query("SELECT * FROM sis_credentials WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| SisCredential {
            base_url: r.get("base_url"),
            client_id: r.get("client_id"),
            client_secret: r.get("client_secret"),
            access_token: r.get("access_token"),
            token_expires_at: parse_opt_datetime(r.get("token_expires_at")),
        }))
    }

    async fn upsert_credential(&self, credential: &SisCredential) -> Result<()> {
        // Replacing the credential invalidates any previously minted token.
        sqlx::query(
            "INSERT INTO sis_credentials (id, base_url, client_id, client_secret, access_token, token_expires_at)
             VALUES (1, ?1, ?2, ?3, NULL, NULL)
             ON CONFLICT(id) DO UPDATE SET
                 base_url = excluded.base_url,
                 client_id = excluded.client_id,
                 client_secret = excluded.client_secret,
                 access_token = NULL,
                 token_expires_at = NULL",
        )
        .bind(&credential.base_url)
        .bind(&credential.client_id)
        .bind(&credential.client_secret)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_token(&self, access_token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE sis_credentials SET access_token = ?1, token_expires_at = ?2 WHERE id = 1",
        )
        .bind(access_token)
        .bind(datetime_to_str(&expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// -- IdMapRepository --

fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::School => "schools",
        EntityKind::Term => "terms",
        EntityKind::Teacher => "teachers",
        EntityKind::Student => "students",
        EntityKind::Course => "courses",
        EntityKind::Section => "sections",
        EntityKind::Standard => "standards",
        EntityKind::AttendanceCode => "attendance_codes",
        EntityKind::Grade => "grades",
        EntityKind::Attendance => "attendance",
        EntityKind::Person => "persons",
        EntityKind::EmailAddress => "email_addresses",
        EntityKind::PhoneNumber => "phone_numbers",
        EntityKind::PersonEmail => "person_email_associations",
        EntityKind::PersonPhone => "person_phone_associations",
        EntityKind::StudentContact => "student_contact_associations",
    }
}

#[async_trait]
impl IdMapRepository for SqliteRepository {
    async fn list_id_pairs(&self, kind: EntityKind) -> Result<Vec<(i64, i64)>> {
        let rows = sqlx::query(&format!("SELECT id, ps_id FROM {}", table_for(kind)))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| (r.get("id"), r.get("ps_id"))).collect())
    }
}

// -- StatsRepository --

#[async_trait]
impl StatsRepository for SqliteRepository {
    async fn entity_counts(&self) -> Result<EntityCounts> {
        Ok(EntityCounts {
            schools: self.count_table("schools").await?,
            terms: self.count_table("terms").await?,
            teachers: self.count_table("teachers").await?,
            students: self.count_table("students").await?,
            courses: self.count_table("courses").await?,
            sections: self.count_table("sections").await?,
            standards: self.count_table("standards").await?,
            attendance_codes: self.count_table("attendance_codes").await?,
            grades: self.count_table("grades").await?,
            attendance: self.count_table("attendance").await?,
            persons: self.count_table("persons").await?,
            email_addresses: self.count_table("email_addresses").await?,
            phone_numbers: self.count_table("phone_numbers").await?,
            student_contacts: self.count_table("student_contact_associations").await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabasePool;

    async fn test_repo() -> SqliteRepository {
        let DatabasePool::Sqlite(pool) = DatabasePool::new_sqlite_memory().await.unwrap();
        SqliteRepository::new(pool)
    }

    #[test]
    fn stored_datetimes_round_trip() {
        let now = Utc::now();
        assert_eq!(parse_datetime(&datetime_to_str(&now)), now);

        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(parse_naive_date(&naive_date_to_str(&date)), date);
    }

    #[test]
    fn malformed_stored_values_fall_back() {
        // Hand-edited or corrupted rows get a stand-in rather than a panic.
        let fallback = parse_datetime("not-a-timestamp");
        assert!((Utc::now() - fallback).num_seconds() < 5);

        assert_eq!(
            parse_naive_date("03/15/2026"),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        );
    }

    fn school(ps_id: i64, name: &str) -> School {
        School {
            id: 0,
            ps_id,
            ps_dcid: Some(ps_id * 10),
            name: name.to_string(),
            school_number: None,
            city: None,
            state: None,
            synced_at: Utc::now(),
        }
    }

    fn student(ps_id: i64, first: &str, last: &str) -> Student {
        Student {
            id: 0,
            ps_id,
            ps_dcid: None,
            first_name: first.to_string(),
            last_name: last.to_string(),
            student_number: Some(format!("{ps_id}")),
            grade_level: Some(4),
            enroll_status: Some(0),
            school_ps_id: Some(100),
            preferred_name: None,
            report_card_generated_at: None,
            synced_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn school_upsert_is_idempotent() {
        let repo = test_repo().await;

        repo.upsert_schools(&[school(100, "Springfield Elementary")])
            .await
            .unwrap();
        let first = repo.get_school_by_ps_id(100).await.unwrap().unwrap();

        repo.upsert_schools(&[school(100, "Springfield Elementary School")])
            .await
            .unwrap();
        let second = repo.get_school_by_ps_id(100).await.unwrap().unwrap();

        // Same local row, updated upstream fields.
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Springfield Elementary School");
        assert_eq!(repo.list_schools().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn student_reupsert_preserves_locally_owned_fields() {
        let repo = test_repo().await;

        repo.upsert_students(&[student(50001, "Bartholomew", "Simpson")])
            .await
            .unwrap();
        let stored = repo.get_student_by_ps_id(50001).await.unwrap().unwrap();

        assert!(repo
            .set_preferred_name(stored.id, Some("Bart"))
            .await
            .unwrap());
        let generated_at = Utc::now();
        assert!(repo
            .set_report_card_generated(stored.id, generated_at)
            .await
            .unwrap());

        // The next sync changes upstream fields but must not clobber portal data.
        let mut updated = student(50001, "Bart", "Simpson");
        updated.grade_level = Some(5);
        repo.upsert_students(&[updated]).await.unwrap();

        let after = repo.get_student_by_ps_id(50001).await.unwrap().unwrap();
        assert_eq!(after.id, stored.id);
        assert_eq!(after.grade_level, Some(5));
        assert_eq!(after.preferred_name.as_deref(), Some("Bart"));
        assert!(after.report_card_generated_at.is_some());
    }

    #[tokio::test]
    async fn setters_report_unknown_students() {
        let repo = test_repo().await;
        assert!(!repo.set_preferred_name(999, Some("Nobody")).await.unwrap());
        assert!(!repo
            .set_report_card_generated(999, Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn grade_batch_rolls_back_on_constraint_violation() {
        let repo = test_repo().await;
        repo.upsert_schools(&[school(100, "Springfield Elementary")])
            .await
            .unwrap();
        repo.upsert_students(&[student(50001, "Bart", "Simpson")])
            .await
            .unwrap();
        repo.upsert_courses(&[Course {
            id: 0,
            ps_id: 200,
            ps_dcid: None,
            course_number: "MATH4".into(),
            course_name: "Mathematics 4".into(),
            credit_hours: None,
            synced_at: Utc::now(),
        }])
        .await
        .unwrap();

        let school_id = repo.get_school_by_ps_id(100).await.unwrap().unwrap().id;
        let course_id = repo.get_course_by_ps_id(200).await.unwrap().unwrap().id;
        let student_id = repo.get_student_by_ps_id(50001).await.unwrap().unwrap().id;

        repo.upsert_sections(&[Section {
            id: 0,
            ps_id: 3001,
            ps_dcid: None,
            course_id,
            school_id,
            term_id: None,
            teacher_id: None,
            section_number: Some("2".into()),
            expression: None,
            synced_at: Utc::now(),
        }])
        .await
        .unwrap();
        let section_id = repo.get_section_by_ps_id(3001).await.unwrap().unwrap().id;

        let good = Grade {
            id: 0,
            ps_id: 700,
            student_id,
            section_id,
            standard_id: None,
            store_code: Some("Q1".into()),
            letter_grade: Some("A".into()),
            percent: Some(95.0),
            comment: None,
            synced_at: Utc::now(),
        };
        let mut bad = good.clone();
        bad.ps_id = 701;
        bad.student_id = 424242; // no such local student

        let result = repo.upsert_grades(&[good, bad]).await;
        assert!(result.is_err());
        // The whole batch is one transaction; the valid row is rolled back too.
        assert!(repo
            .list_grades_for_student(student_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn sync_run_lifecycle() {
        let repo = test_repo().await;

        let run = repo.create_run("full").await.unwrap();
        assert_eq!(run.status, SyncStatus::Pending);
        // A run that is merely pending does not count as in progress.
        assert!(!repo.any_run_in_progress().await.unwrap());

        assert!(repo.try_claim_run(run.id).await.unwrap());
        let claimed = repo.get_run(run.id).await.unwrap().unwrap();
        assert_eq!(claimed.status, SyncStatus::Running);
        assert!(repo.any_run_in_progress().await.unwrap());

        // A second pending run cannot be claimed while the first is running.
        let other = repo.create_run("student").await.unwrap();
        assert!(!repo.try_claim_run(other.id).await.unwrap());

        let details = serde_json::json!({ "steps": [{ "entityType": "school", "recordCount": 3 }] });
        repo.mark_completed(run.id, 120, 2, Some(&details))
            .await
            .unwrap();

        let finished = repo.get_run(run.id).await.unwrap().unwrap();
        assert_eq!(finished.status, SyncStatus::Completed);
        assert_eq!(finished.record_count, 120);
        assert_eq!(finished.skipped_count, 2);
        assert!(finished.completed_at.is_some());
        assert_eq!(finished.details, Some(details));

        // The second run is claimable now.
        assert!(repo.try_claim_run(other.id).await.unwrap());
    }

    #[tokio::test]
    async fn terminal_runs_are_immutable() {
        let repo = test_repo().await;
        let run = repo.create_run("school").await.unwrap();
        assert!(repo.try_claim_run(run.id).await.unwrap());
        repo.mark_failed(run.id, "upstream API error (500): boom", 0, 0, None)
            .await
            .unwrap();

        let err = repo.mark_completed(run.id, 5, 0, None).await.unwrap_err();
        assert!(matches!(err, SlateError::Sync(_)), "got {err:?}");

        let stored = repo.get_run(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SyncStatus::Failed);
        assert_eq!(
            stored.error_message.as_deref(),
            Some("upstream API error (500): boom")
        );
    }

    #[tokio::test]
    async fn claim_requires_pending_state() {
        let repo = test_repo().await;
        let run = repo.create_run("term").await.unwrap();
        assert!(repo.try_claim_run(run.id).await.unwrap());
        // Re-claiming an already running run fails.
        assert!(!repo.try_claim_run(run.id).await.unwrap());
    }

    #[tokio::test]
    async fn latest_and_listing() {
        let repo = test_repo().await;
        let first = repo.create_run("school").await.unwrap();
        assert!(repo.try_claim_run(first.id).await.unwrap());
        repo.mark_completed(first.id, 3, 0, None).await.unwrap();
        let second = repo.create_run("student").await.unwrap();

        let latest = repo.latest_run().await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);

        let runs = repo.list_runs(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second.id);
    }

    #[tokio::test]
    async fn credential_replacement_clears_token() {
        let repo = test_repo().await;
        assert!(repo.get_credential().await.unwrap().is_none());

        let cred = SisCredential {
            base_url: "https://district.powerschool.com".into(),
            client_id: "abc".into(),
            client_secret: "shh".into(),
            access_token: None,
            token_expires_at: None,
        };
        repo.upsert_credential(&cred).await.unwrap();
        repo.save_token("tok-1", Utc::now()).await.unwrap();

        let stored = repo.get_credential().await.unwrap().unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("tok-1"));

        let mut rotated = cred.clone();
        rotated.client_secret = "new-secret".into();
        repo.upsert_credential(&rotated).await.unwrap();

        let after = repo.get_credential().await.unwrap().unwrap();
        assert_eq!(after.client_secret, "new-secret");
        assert!(after.access_token.is_none());
        assert!(after.token_expires_at.is_none());
    }

    #[tokio::test]
    async fn id_pairs_cover_every_row() {
        let repo = test_repo().await;
        repo.upsert_schools(&[school(100, "A"), school(101, "B")])
            .await
            .unwrap();

        let pairs = repo.list_id_pairs(EntityKind::School).await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().any(|(_, ps_id)| *ps_id == 100));
        assert!(pairs.iter().any(|(_, ps_id)| *ps_id == 101));
    }

    #[tokio::test]
    async fn entity_counts_reflect_tables() {
        let repo = test_repo().await;
        repo.upsert_schools(&[school(100, "A")]).await.unwrap();
        repo.upsert_students(&[student(50001, "Bart", "Simpson")])
            .await
            .unwrap();

        let counts = repo.entity_counts().await.unwrap();
        assert_eq!(counts.schools, 1);
        assert_eq!(counts.students, 1);
        assert_eq!(counts.grades, 0);
    }

    #[tokio::test]
    async fn term_dates_round_trip() {
        let repo = test_repo().await;
        repo.upsert_terms(&[Term {
            id: 0,
            ps_id: 900,
            ps_dcid: None,
            name: "Quarter 1".into(),
            abbreviation: Some("Q1".into()),
            start_date: NaiveDate::from_ymd_opt(2026, 8, 24),
            end_date: NaiveDate::from_ymd_opt(2026, 10, 30),
            year_id: Some(36),
            synced_at: Utc::now(),
        }])
        .await
        .unwrap();

        let term = repo.get_term_by_ps_id(900).await.unwrap().unwrap();
        assert_eq!(term.start_date, NaiveDate::from_ymd_opt(2026, 8, 24));
        assert_eq!(term.end_date, NaiveDate::from_ymd_opt(2026, 10, 30));
    }

    #[tokio::test]
    async fn contact_graph_round_trip() {
        let repo = test_repo().await;
        repo.upsert_students(&[student(50001, "Bart", "Simpson")])
            .await
            .unwrap();
        repo.upsert_persons(&[Person {
            id: 0,
            ps_id: 61001,
            ps_dcid: None,
            first_name: "Marge".into(),
            last_name: "Simpson".into(),
            is_active: true,
            synced_at: Utc::now(),
        }])
        .await
        .unwrap();

        let student_id = repo.get_student_by_ps_id(50001).await.unwrap().unwrap().id;
        let person_id = repo.get_person_by_ps_id(61001).await.unwrap().unwrap().id;

        repo.upsert_student_contact_associations(&[StudentContactAssociation {
            ps_id: 41,
            student_id,
            person_id,
            relationship: Some("Mother".into()),
            is_emergency: true,
            receives_mail: true,
        }])
        .await
        .unwrap();

        let contacts = repo.list_contacts_for_student(student_id).await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].person_id, person_id);
        assert!(contacts[0].receives_mail);
    }
}
