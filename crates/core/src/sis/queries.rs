//! Named queries exported by the PowerSchool plugin.
//!
//! Each name maps to a query definition bundled with the plugin; the
//! column names used by the mapper must match those definitions.

pub const SCHOOLS: &str = "com.slate.reportcards.schools";
pub const TERMS: &str = "com.slate.reportcards.terms";
pub const TEACHERS: &str = "com.slate.reportcards.teachers";
pub const STUDENTS: &str = "com.slate.reportcards.students";
pub const COURSES: &str = "com.slate.reportcards.courses";
pub const SECTIONS: &str = "com.slate.reportcards.sections";
pub const STANDARDS: &str = "com.slate.reportcards.standards";
pub const ATTENDANCE_CODES: &str = "com.slate.reportcards.attendance_codes";
pub const GRADES: &str = "com.slate.reportcards.grades";
pub const ATTENDANCE: &str = "com.slate.reportcards.attendance";
pub const PERSONS: &str = "com.slate.reportcards.persons";
pub const EMAIL_ADDRESSES: &str = "com.slate.reportcards.email_addresses";
pub const PHONE_NUMBERS: &str = "com.slate.reportcards.phone_numbers";
pub const PERSON_EMAIL_ASSOCIATIONS: &str = "com.slate.reportcards.person_email_associations";
pub const PERSON_PHONE_ASSOCIATIONS: &str = "com.slate.reportcards.person_phone_associations";
pub const STUDENT_CONTACT_ASSOCIATIONS: &str = "com.slate.reportcards.student_contact_associations";
