//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations.

use std::path::Path;

use tokio_rusqlite::Connection;

use super::migrations::{self, MigrationSet};
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;
     PRAGMA busy_timeout=5000;";

/// Open a database at the specified path.
///
/// Creates the file if it doesn't exist, applies performance pragmas,
/// and runs any pending migrations from `schema`.
pub async fn open(path: impl AsRef<Path>, schema: &'static MigrationSet) -> Result<Connection, Error> {
    let conn = Connection::open(path).await.map_err(Error::from)?;
    prepare(&conn, schema).await?;
    Ok(conn)
}

/// Open an in-memory database with the same configuration as file-based ones.
pub async fn open_in_memory(schema: &'static MigrationSet) -> Result<Connection, Error> {
    let conn = Connection::open_in_memory().await.map_err(Error::from)?;
    prepare(&conn, schema).await?;
    Ok(conn)
}

async fn prepare(conn: &Connection, schema: &'static MigrationSet) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
    })
    .await
    .map_err(Error::from)?;

    migrations::run(conn, schema).await
}

/// Round-trip a trivial statement through the background thread.
pub async fn ping(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SCHEMA;

    #[tokio::test]
    async fn test_open_in_memory() {
        let conn = open_in_memory(&SCHEMA).await.unwrap();
        let version = conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
        ping(&conn).await.unwrap();
    }
}
