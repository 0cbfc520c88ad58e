pub mod attendance;
pub mod contact;
pub mod course;
pub mod credential;
pub mod grade;
pub mod school;
pub mod staff;
pub mod standard;
pub mod student;
pub mod sync;
pub mod term;
