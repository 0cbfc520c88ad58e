//! Slate Core — SIS synchronization engine, report-card domain models, and database layer.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod sis;
pub mod sync;

pub use error::{Result, SlateError};
