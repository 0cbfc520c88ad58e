use std::path::Path;

use slate_core::config::SlateConfig;
use slate_core::db::repository::{StatsRepository, SyncRunRepository};

use super::open_repo;

/// Run the `status` command: print recent sync runs and row counts.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = SlateConfig::load(Path::new(config_path))?;
    config.validate()?;

    let repo = open_repo(&config).await?;

    match repo.latest_run().await? {
        Some(run) => {
            println!("Latest sync run:");
            println!("  Id:         {}", run.id);
            println!("  Type:       {}", run.entity_type);
            println!("  Status:     {:?}", run.status);
            println!("  Started:    {}", run.started_at.to_rfc3339());
            if let Some(completed_at) = run.completed_at {
                println!("  Completed:  {}", completed_at.to_rfc3339());
            }
            println!("  Records:    {}", run.record_count);
            println!("  Skipped:    {}", run.skipped_count);
            if let Some(error) = &run.error_message {
                println!("  Error:      {error}");
            }
        }
        None => println!("No sync runs recorded yet."),
    }

    let counts = repo.entity_counts().await?;
    println!();
    println!("Synced rows:");
    println!("  Schools:           {}", counts.schools);
    println!("  Terms:             {}", counts.terms);
    println!("  Teachers:          {}", counts.teachers);
    println!("  Students:          {}", counts.students);
    println!("  Courses:           {}", counts.courses);
    println!("  Sections:          {}", counts.sections);
    println!("  Standards:         {}", counts.standards);
    println!("  Attendance codes:  {}", counts.attendance_codes);
    println!("  Grades:            {}", counts.grades);
    println!("  Attendance:        {}", counts.attendance);
    println!("  Contacts:          {}", counts.persons);
    println!("  Email addresses:   {}", counts.email_addresses);
    println!("  Phone numbers:     {}", counts.phone_numbers);
    println!("  Student contacts:  {}", counts.student_contacts);

    Ok(())
}
