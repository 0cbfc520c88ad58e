//! Sync orchestration: dependency-ordered entity steps under a single
//! claimed run record.
//!
//! Steps are applied as they complete. A failing step halts the run and
//! marks it failed, but data persisted by earlier steps stays; re-running
//! the sync converges via idempotent upserts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::db::repository::SlateRepository;
use crate::error::{Result, SlateError};
use crate::models::sync::{EntityKind, StepOutcome, SyncRun};
use crate::reconcile::{
    resolve_attendance, resolve_grades, resolve_person_emails, resolve_person_phones,
    resolve_sections, resolve_student_contacts, IdMap,
};
use crate::sis::SisSource;

pub struct SyncOrchestrator<R> {
    repo: Arc<R>,
    source: Arc<dyn SisSource>,
    step_deadline: Option<Duration>,
}

impl<R: SlateRepository> SyncOrchestrator<R> {
    pub fn new(repo: Arc<R>, source: Arc<dyn SisSource>) -> Self {
        Self {
            repo,
            source,
            step_deadline: None,
        }
    }

    /// Abort any single entity step that runs longer than `deadline`.
    pub fn with_step_deadline(mut self, deadline: Duration) -> Self {
        self.step_deadline = Some(deadline);
        self
    }

    /// Sync a single entity type under its own run record.
    pub async fn sync_entity(&self, kind: EntityKind) -> Result<SyncRun> {
        let run = self.repo.create_run(kind.as_str()).await?;
        if !self.repo.try_claim_run(run.id).await? {
            let message = "another sync is already running";
            self.repo.mark_failed(run.id, message, 0, 0, None).await?;
            return Err(SlateError::Sync(message.to_string()));
        }

        info!(run_id = run.id, entity = %kind, "Starting entity sync");
        match self.run_step(kind).await {
            Ok(outcome) => {
                let details = serde_json::json!({ "steps": [&outcome] });
                self.repo
                    .mark_completed(
                        run.id,
                        outcome.record_count as i64,
                        outcome.skipped.len() as i64,
                        Some(&details),
                    )
                    .await?;
                info!(
                    run_id = run.id,
                    entity = %kind,
                    records = outcome.record_count,
                    skipped = outcome.skipped.len(),
                    "Entity sync completed"
                );
                self.finished_run(run.id).await
            }
            Err(e) => {
                error!(run_id = run.id, entity = %kind, error = %e, "Entity sync failed");
                self.repo
                    .mark_failed(run.id, &e.to_string(), 0, 0, None)
                    .await?;
                Err(e)
            }
        }
    }

    /// Sync every entity type in dependency order under one run record.
    ///
    /// The run halts on the first failing step; anything persisted by
    /// earlier steps is kept.
    pub async fn sync_all(&self) -> Result<SyncRun> {
        if self.repo.any_run_in_progress().await? {
            return Err(SlateError::Sync(
                "another sync is already running".to_string(),
            ));
        }

        let run = self.repo.create_run("full").await?;
        if !self.repo.try_claim_run(run.id).await? {
            let message = "another sync is already running";
            self.repo.mark_failed(run.id, message, 0, 0, None).await?;
            return Err(SlateError::Sync(message.to_string()));
        }

        info!(run_id = run.id, "Starting full sync");
        let mut steps: Vec<StepOutcome> = Vec::new();
        let mut total_records: i64 = 0;
        let mut total_skipped: i64 = 0;

        for kind in EntityKind::DEPENDENCY_ORDER {
            match self.run_step(kind).await {
                Ok(outcome) => {
                    total_records += outcome.record_count as i64;
                    total_skipped += outcome.skipped.len() as i64;
                    if !outcome.skipped.is_empty() {
                        warn!(
                            entity = %kind,
                            skipped = outcome.skipped.len(),
                            "Some records were skipped during reconciliation"
                        );
                    }
                    steps.push(outcome);
                }
                Err(e) => {
                    error!(run_id = run.id, entity = %kind, error = %e, "Full sync halted");
                    let details = serde_json::json!({ "steps": &steps });
                    self.repo
                        .mark_failed(
                            run.id,
                            &format!("{kind}: {e}"),
                            total_records,
                            total_skipped,
                            Some(&details),
                        )
                        .await?;
                    return Err(e);
                }
            }
        }

        let details = serde_json::json!({ "steps": steps });
        self.repo
            .mark_completed(run.id, total_records, total_skipped, Some(&details))
            .await?;
        info!(
            run_id = run.id,
            records = total_records,
            skipped = total_skipped,
            "Full sync completed"
        );
        self.finished_run(run.id).await
    }

    async fn finished_run(&self, id: i64) -> Result<SyncRun> {
        self.repo
            .get_run(id)
            .await?
            .ok_or_else(|| SlateError::Sync(format!("sync run {id} disappeared")))
    }

    async fn run_step(&self, kind: EntityKind) -> Result<StepOutcome> {
        match self.step_deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.step(kind))
                .await
                .map_err(|_| {
                    SlateError::Sync(format!(
                        "sync step {kind} exceeded its {}s deadline",
                        deadline.as_secs()
                    ))
                })?,
            None => self.step(kind).await,
        }
    }

    async fn id_map(&self, kind: EntityKind) -> Result<IdMap> {
        Ok(IdMap::from_pairs(self.repo.list_id_pairs(kind).await?))
    }

    async fn step(&self, kind: EntityKind) -> Result<StepOutcome> {
        let started = Instant::now();
        let (record_count, skipped) = match kind {
            EntityKind::School => {
                let schools = self.source.fetch_schools().await?;
                self.repo.upsert_schools(&schools).await?;
                (schools.len(), Vec::new())
            }
            EntityKind::Term => {
                let terms = self.source.fetch_terms().await?;
                self.repo.upsert_terms(&terms).await?;
                (terms.len(), Vec::new())
            }
            EntityKind::Teacher => {
                let teachers = self.source.fetch_teachers().await?;
                self.repo.upsert_teachers(&teachers).await?;
                (teachers.len(), Vec::new())
            }
            EntityKind::Student => {
                let students = self.source.fetch_students().await?;
                self.repo.upsert_students(&students).await?;
                (students.len(), Vec::new())
            }
            EntityKind::Course => {
                let courses = self.source.fetch_courses().await?;
                self.repo.upsert_courses(&courses).await?;
                (courses.len(), Vec::new())
            }
            EntityKind::Section => {
                let unresolved = self.source.fetch_sections().await?;
                let outcome = resolve_sections(
                    unresolved,
                    &self.id_map(EntityKind::Course).await?,
                    &self.id_map(EntityKind::School).await?,
                    &self.id_map(EntityKind::Term).await?,
                    &self.id_map(EntityKind::Teacher).await?,
                    Utc::now(),
                );
                self.repo.upsert_sections(&outcome.resolved).await?;
                (outcome.resolved.len(), outcome.skipped)
            }
            EntityKind::Standard => {
                let standards = self.source.fetch_standards().await?;
                self.repo.upsert_standards(&standards).await?;
                (standards.len(), Vec::new())
            }
            EntityKind::AttendanceCode => {
                let codes = self.source.fetch_attendance_codes().await?;
                self.repo.upsert_attendance_codes(&codes).await?;
                (codes.len(), Vec::new())
            }
            EntityKind::Grade => {
                let unresolved = self.source.fetch_grades().await?;
                let outcome = resolve_grades(
                    unresolved,
                    &self.id_map(EntityKind::Student).await?,
                    &self.id_map(EntityKind::Section).await?,
                    &self.id_map(EntityKind::Standard).await?,
                    Utc::now(),
                );
                self.repo.upsert_grades(&outcome.resolved).await?;
                (outcome.resolved.len(), outcome.skipped)
            }
            EntityKind::Attendance => {
                let unresolved = self.source.fetch_attendance().await?;
                let outcome = resolve_attendance(
                    unresolved,
                    &self.id_map(EntityKind::Student).await?,
                    &self.id_map(EntityKind::AttendanceCode).await?,
                    &self.id_map(EntityKind::School).await?,
                    Utc::now(),
                );
                self.repo.upsert_attendance(&outcome.resolved).await?;
                (outcome.resolved.len(), outcome.skipped)
            }
            EntityKind::Person => {
                let persons = self.source.fetch_persons().await?;
                self.repo.upsert_persons(&persons).await?;
                (persons.len(), Vec::new())
            }
            EntityKind::EmailAddress => {
                let addresses = self.source.fetch_email_addresses().await?;
                self.repo.upsert_email_addresses(&addresses).await?;
                (addresses.len(), Vec::new())
            }
            EntityKind::PhoneNumber => {
                let numbers = self.source.fetch_phone_numbers().await?;
                self.repo.upsert_phone_numbers(&numbers).await?;
                (numbers.len(), Vec::new())
            }
            EntityKind::PersonEmail => {
                let unresolved = self.source.fetch_person_email_associations().await?;
                let outcome = resolve_person_emails(
                    unresolved,
                    &self.id_map(EntityKind::Person).await?,
                    &self.id_map(EntityKind::EmailAddress).await?,
                );
                self.repo
                    .upsert_person_email_associations(&outcome.resolved)
                    .await?;
                (outcome.resolved.len(), outcome.skipped)
            }
            EntityKind::PersonPhone => {
                let unresolved = self.source.fetch_person_phone_associations().await?;
                let outcome = resolve_person_phones(
                    unresolved,
                    &self.id_map(EntityKind::Person).await?,
                    &self.id_map(EntityKind::PhoneNumber).await?,
                );
                self.repo
                    .upsert_person_phone_associations(&outcome.resolved)
                    .await?;
                (outcome.resolved.len(), outcome.skipped)
            }
            EntityKind::StudentContact => {
                let unresolved = self.source.fetch_student_contact_associations().await?;
                let outcome = resolve_student_contacts(
                    unresolved,
                    &self.id_map(EntityKind::Student).await?,
                    &self.id_map(EntityKind::Person).await?,
                );
                self.repo
                    .upsert_student_contact_associations(&outcome.resolved)
                    .await?;
                (outcome.resolved.len(), outcome.skipped)
            }
        };

        Ok(StepOutcome {
            entity_type: kind,
            record_count,
            skipped,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}
