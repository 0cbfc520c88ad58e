//! SIS connectivity: OAuth token lifecycle, the paginated named-query
//! client, and mapping of raw records into domain types.

pub mod client;
pub mod mapper;
pub mod models;
pub mod queries;
pub mod token;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;
use tracing::info;

use crate::error::Result;
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

use self::client::PagedQueryClient;
use self::mapper::RecordMapper;

/// Upstream data source for every synced entity type.
///
/// The production implementation talks to PowerSchool; tests substitute
/// an in-memory source.
#[async_trait]
pub trait SisSource: Send + Sync {
    async fn fetch_schools(&self) -> Result<Vec<School>>;
    async fn fetch_terms(&self) -> Result<Vec<Term>>;
    async fn fetch_teachers(&self) -> Result<Vec<Teacher>>;
    async fn fetch_students(&self) -> Result<Vec<Student>>;
    async fn fetch_courses(&self) -> Result<Vec<Course>>;
    async fn fetch_sections(&self) -> Result<Vec<UnresolvedSection>>;
    async fn fetch_standards(&self) -> Result<Vec<Standard>>;
    async fn fetch_attendance_codes(&self) -> Result<Vec<AttendanceCode>>;
    async fn fetch_grades(&self) -> Result<Vec<UnresolvedGrade>>;
    async fn fetch_attendance(&self) -> Result<Vec<UnresolvedAttendance>>;
    async fn fetch_persons(&self) -> Result<Vec<Person>>;
    async fn fetch_email_addresses(&self) -> Result<Vec<EmailAddress>>;
    async fn fetch_phone_numbers(&self) -> Result<Vec<PhoneNumber>>;
    async fn fetch_person_email_associations(&self) -> Result<Vec<UnresolvedPersonEmail>>;
    async fn fetch_person_phone_associations(&self) -> Result<Vec<UnresolvedPersonPhone>>;
    async fn fetch_student_contact_associations(&self) -> Result<Vec<UnresolvedStudentContact>>;
}

/// PowerSchool-backed implementation of [`SisSource`].
pub struct PowerSchoolSource {
    client: PagedQueryClient,
}

impl PowerSchoolSource {
    pub fn new(client: PagedQueryClient) -> Self {
        Self { client }
    }

    async fn run(&self, query_name: &str) -> Result<Vec<serde_json::Value>> {
        let records = self.client.run_query(query_name, &Map::new()).await?;
        info!(query = %query_name, count = records.len(), "Fetched records");
        Ok(records)
    }
}

#[async_trait]
impl SisSource for PowerSchoolSource {
    async fn fetch_schools(&self) -> Result<Vec<School>> {
        let records = self.run(queries::SCHOOLS).await?;
        Ok(RecordMapper::map_schools(&records, Utc::now()))
    }

    async fn fetch_terms(&self) -> Result<Vec<Term>> {
        let records = self.run(queries::TERMS).await?;
        Ok(RecordMapper::map_terms(&records, Utc::now()))
    }

    async fn fetch_teachers(&self) -> Result<Vec<Teacher>> {
        let records = self.run(queries::TEACHERS).await?;
        Ok(RecordMapper::map_teachers(&records, Utc::now()))
    }

    async fn fetch_students(&self) -> Result<Vec<Student>> {
        let records = self.run(queries::STUDENTS).await?;
        Ok(RecordMapper::map_students(&records, Utc::now()))
    }

    async fn fetch_courses(&self) -> Result<Vec<Course>> {
        let records = self.run(queries::COURSES).await?;
        Ok(RecordMapper::map_courses(&records, Utc::now()))
    }

    async fn fetch_sections(&self) -> Result<Vec<UnresolvedSection>> {
        let records = self.run(queries::SECTIONS).await?;
        Ok(RecordMapper::map_sections(&records))
    }

    async fn fetch_standards(&self) -> Result<Vec<Standard>> {
        let records = self.run(queries::STANDARDS).await?;
        Ok(RecordMapper::map_standards(&records, Utc::now()))
    }

    async fn fetch_attendance_codes(&self) -> Result<Vec<AttendanceCode>> {
        let records = self.run(queries::ATTENDANCE_CODES).await?;
        Ok(RecordMapper::map_attendance_codes(&records, Utc::now()))
    }

    async fn fetch_grades(&self) -> Result<Vec<UnresolvedGrade>> {
        let records = self.run(queries::GRADES).await?;
        Ok(RecordMapper::map_grades(&records))
    }

    async fn fetch_attendance(&self) -> Result<Vec<UnresolvedAttendance>> {
        let records = self.run(queries::ATTENDANCE).await?;
        Ok(RecordMapper::map_attendance(&records))
    }

    async fn fetch_persons(&self) -> Result<Vec<Person>> {
        let records = self.run(queries::PERSONS).await?;
        Ok(RecordMapper::map_persons(&records, Utc::now()))
    }

    async fn fetch_email_addresses(&self) -> Result<Vec<EmailAddress>> {
        let records = self.run(queries::EMAIL_ADDRESSES).await?;
        Ok(RecordMapper::map_email_addresses(&records, Utc::now()))
    }

    async fn fetch_phone_numbers(&self) -> Result<Vec<PhoneNumber>> {
        let records = self.run(queries::PHONE_NUMBERS).await?;
        Ok(RecordMapper::map_phone_numbers(&records, Utc::now()))
    }

    async fn fetch_person_email_associations(&self) -> Result<Vec<UnresolvedPersonEmail>> {
        let records = self.run(queries::PERSON_EMAIL_ASSOCIATIONS).await?;
        Ok(RecordMapper::map_person_email_associations(&records))
    }

    async fn fetch_person_phone_associations(&self) -> Result<Vec<UnresolvedPersonPhone>> {
        let records = self.run(queries::PERSON_PHONE_ASSOCIATIONS).await?;
        Ok(RecordMapper::map_person_phone_associations(&records))
    }

    async fn fetch_student_contact_associations(&self) -> Result<Vec<UnresolvedStudentContact>> {
        let records = self.run(queries::STUDENT_CONTACT_ASSOCIATIONS).await?;
        Ok(RecordMapper::map_student_contact_associations(&records))
    }
}
