use std::path::Path;

use slate_core::config::{SlateConfig, SlateSection};
use slate_core::db::DatabasePool;
use tracing::info;

/// Run the `init` command: create the data directory, a starter config
/// file, and an empty database.
pub async fn run(config_path: &str, data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    info!("Created data directory {data_dir}");

    let db_path = format!("{}/slate.db", data_dir.trim_end_matches('/'));

    let config_file = Path::new(config_path);
    if config_file.exists() {
        println!("Configuration file {config_path} already exists, leaving it in place");
    } else {
        let config = SlateConfig {
            slate: SlateSection {
                instance_name: "My School District".to_string(),
                data_dir: data_dir.to_string(),
                public_url: None,
                database: slate_core::config::DatabaseConfig {
                    path: Some(db_path.clone()),
                },
            },
            sis: Default::default(),
        };
        std::fs::write(config_file, config.to_toml()?)?;
        println!("Wrote starter configuration to {config_path}");
    }

    // Creating the pool runs migrations, so the schema exists up front.
    let connect_str = format!("sqlite:{db_path}?mode=rwc");
    let DatabasePool::Sqlite(_pool) = DatabasePool::new_sqlite(&connect_str).await?;
    println!("Initialized database at {db_path}");
    println!();
    println!("Next steps:");
    println!("  1. Fill in the [sis] section of {config_path} with your PowerSchool credentials");
    println!("  2. Run `slate sync --dry-run` to verify connectivity");
    println!("  3. Run `slate sync` to pull data");

    Ok(())
}
