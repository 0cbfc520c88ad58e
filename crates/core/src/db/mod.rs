pub mod repository;
pub mod sqlite;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::Result;

pub enum DatabasePool {
    Sqlite(SqlitePool),
}

impl DatabasePool {
    /// Create a new SQLite database pool from a connection string and run migrations.
    pub async fn new_sqlite(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        Self::run_migrations(&pool).await?;
        Ok(DatabasePool::Sqlite(pool))
    }

    /// Create a new in-memory SQLite database pool and run migrations. Useful for testing.
    ///
    /// Capped at one connection so every query sees the same in-memory database.
    pub async fn new_sqlite_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;
        Self::run_migrations(&pool).await?;
        Ok(DatabasePool::Sqlite(pool))
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query("PRAGMA foreign_keys = ON;")
            .execute(pool)
            .await?;

        let migrations: &[&str] =
            &[include_str!("../../../../migrations/sqlite/001_initial_schema.sql")];

        for migration_sql in migrations {
            for statement in statements(migration_sql) {
                sqlx::query(&statement).execute(pool).await?;
            }
        }
        Ok(())
    }
}

/// Split a migration file into executable statements.
///
/// Comment lines are removed before splitting on `;`, so a semicolon
/// inside a comment cannot truncate the statement that follows it.
fn statements(sql: &str) -> Vec<String> {
    let without_comments = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_semicolons_do_not_split_statements() {
        let sql = "-- keyed by `ps_id`; used as the upsert key\n\
                   CREATE TABLE widgets (\n    id INTEGER PRIMARY KEY\n);\n\
                   -- trailing note\n\
                   CREATE INDEX idx_widgets_id ON widgets(id);\n";
        let stmts = statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TABLE widgets"));
        assert!(stmts[1].starts_with("CREATE INDEX"));
    }

    #[test]
    fn bundled_schema_splits_into_executable_statements() {
        let stmts = statements(include_str!(
            "../../../../migrations/sqlite/001_initial_schema.sql"
        ));
        assert!(!stmts.is_empty());
        for stmt in &stmts {
            assert!(
                stmt.starts_with("CREATE TABLE") || stmt.starts_with("CREATE INDEX"),
                "unexpected statement: {stmt}"
            );
        }
    }
}
