//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! Each migration is a SQL batch that transforms the schema.

use tokio_rusqlite::{Connection, params};

use crate::Error;

/// An ordered list of migrations tracked in its own version table.
#[derive(Debug)]
pub struct MigrationSet {
    /// Name of the table recording applied versions.
    pub table: &'static str,
    /// `(version, SQL)` pairs in ascending version order.
    pub steps: &'static [(i64, &'static str)],
}

/// Run any pending migrations.
///
/// This creates the version table if it doesn't exist, checks the
/// current version, and applies any migrations that haven't been run yet.
/// Every step runs in the same transaction as its version row.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection, schema: &'static MigrationSet) -> Result<(), Error> {
    conn.call(move |conn| -> Result<(), Error> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            schema.table
        ))
        .map_err(|e| Error::MigrationFailed(e.to_string()))?;

        let current: i64 = conn
            .query_row(&format!("SELECT COALESCE(MAX(version), 0) FROM {}", schema.table), [], |row| {
                row.get(0)
            })
            .map_err(|e| Error::MigrationFailed(e.to_string()))?;

        for (version, sql) in schema.steps {
            if *version <= current {
                continue;
            }
            let tx = conn.transaction().map_err(|e| Error::MigrationFailed(e.to_string()))?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                &format!("INSERT INTO {} (version, applied_at) VALUES (?1, ?2)", schema.table),
                params![version, super::now()],
            )
            .map_err(|e| Error::MigrationFailed(e.to_string()))?;
            tx.commit().map_err(|e| Error::MigrationFailed(e.to_string()))?;
            tracing::debug!(table = schema.table, version, "applied migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::sqlite::SCHEMA as CACHE_SCHEMA;
    use crate::store::SCHEMA as STORE_SCHEMA;

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn, &STORE_SCHEMA).await.unwrap();
        run(&conn, &STORE_SCHEMA).await.unwrap();

        let has_companies: bool = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='companies')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();

        assert!(has_companies);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn, &STORE_SCHEMA).await.unwrap();

        let table = STORE_SCHEMA.table;
        let count: i64 = conn
            .call(move |conn| conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0)))
            .await
            .unwrap();

        assert_eq!(count, STORE_SCHEMA.steps.len() as i64);
    }

    #[tokio::test]
    async fn test_schemas_share_one_database() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn, &STORE_SCHEMA).await.unwrap();
        run(&conn, &CACHE_SCHEMA).await.unwrap();

        let has_cache: bool = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='cache_entries')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();

        assert!(has_cache);
    }
}
