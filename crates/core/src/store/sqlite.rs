//! SQLite implementation of [`RecordStore`].

use std::path::Path;

use tokio_rusqlite::rusqlite::{self, Row, Transaction, params, params_from_iter};
use tokio_rusqlite::Connection;

use super::{BatchOutcome, RecordStore, SCHEMA};
use crate::cursor::{self, ScanPosition, SearchPosition};
use crate::db::{self, connection};
use crate::query::CanonicalQuery;
use crate::record::{ACTIVE_STATUSES, CompanyRecord, RecordPage, Upserted, WriteStatus};
use crate::Error;

const COLUMNS: &str = "uid, name, manager, address, legal_form, status, registration_date, capital,
    main_activity, phone, email, website, created_at, updated_at";

const UPSERT: &str = "INSERT INTO companies (
        uid, name, manager, address, legal_form, status, registration_date, capital,
        main_activity, phone, email, website, created_at, updated_at, name_folded, address_folded
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13, ?14, ?15)
    ON CONFLICT(uid) DO UPDATE SET
        name = excluded.name,
        name_folded = excluded.name_folded,
        address_folded = excluded.address_folded,
        manager = excluded.manager,
        address = excluded.address,
        legal_form = excluded.legal_form,
        status = excluded.status,
        registration_date = excluded.registration_date,
        capital = excluded.capital,
        main_activity = excluded.main_activity,
        phone = excluded.phone,
        email = excluded.email,
        website = excluded.website,
        updated_at = excluded.updated_at
    WHERE companies.name IS NOT excluded.name
        OR companies.manager IS NOT excluded.manager
        OR companies.address IS NOT excluded.address
        OR companies.legal_form IS NOT excluded.legal_form
        OR companies.status IS NOT excluded.status
        OR companies.registration_date IS NOT excluded.registration_date
        OR companies.capital IS NOT excluded.capital
        OR companies.main_activity IS NOT excluded.main_activity
        OR companies.phone IS NOT excluded.phone
        OR companies.email IS NOT excluded.email
        OR companies.website IS NOT excluded.website";

/// Company store backed by a tokio-rusqlite connection.
///
/// Statements run on the connection's background thread; clones share it.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and apply pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let store = Self { conn: connection::open(path, &SCHEMA).await? };
        store.backfill_folded().await?;
        Ok(store)
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        Ok(Self { conn: connection::open_in_memory(&SCHEMA).await? })
    }

    /// Fill the folded search columns for rows written before they existed.
    async fn backfill_folded(&self) -> Result<(), Error> {
        let filled = self
            .conn
            .call(|conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                let pending = {
                    let mut stmt = tx.prepare("SELECT uid, name, address FROM companies WHERE name_folded IS NULL")?;
                    let rows = stmt.query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, Option<String>>(2)?))
                    })?;
                    rows.collect::<Result<Vec<_>, _>>()?
                };
                for (uid, name, address) in &pending {
                    tx.execute(
                        "UPDATE companies SET name_folded = ?2, address_folded = ?3 WHERE uid = ?1",
                        params![uid, fold(name), address.as_deref().map(fold)],
                    )?;
                }
                tx.commit()?;
                Ok(pending.len())
            })
            .await
            .map_err(Error::from)?;

        if filled > 0 {
            tracing::info!(rows = filled, "backfilled folded search columns");
        }
        Ok(())
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<CompanyRecord> {
    Ok(CompanyRecord {
        uid: row.get(0)?,
        name: row.get(1)?,
        manager: row.get(2)?,
        address: row.get(3)?,
        legal_form: row.get(4)?,
        status: row.get(5)?,
        registration_date: row.get(6)?,
        capital: row.get(7)?,
        main_activity: row.get(8)?,
        phone: row.get(9)?,
        email: row.get(10)?,
        website: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Unicode lower-casing used for the `*_folded` columns and their patterns.
fn fold(value: &str) -> String {
    value.to_lowercase()
}

fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Upsert one record inside its own savepoint.
///
/// A failing item rolls back only its savepoint, leaving the surrounding
/// transaction usable for the rest of the batch.
fn upsert_one(tx: &mut Transaction<'_>, record: &CompanyRecord, now: &str) -> Result<Upserted, Error> {
    let sp = tx.savepoint()?;

    let existed: bool = sp.query_row(
        "SELECT EXISTS(SELECT 1 FROM companies WHERE uid = ?1)",
        params![record.uid],
        |row| row.get(0),
    )?;

    sp.execute(
        UPSERT,
        params![
            &record.uid,
            &record.name,
            &record.manager,
            &record.address,
            &record.legal_form,
            &record.status,
            &record.registration_date,
            &record.capital,
            &record.main_activity,
            &record.phone,
            &record.email,
            &record.website,
            now,
            fold(&record.name),
            record.address.as_deref().map(fold),
        ],
    )?;

    let stored = sp.query_row(
        &format!("SELECT {COLUMNS} FROM companies WHERE uid = ?1"),
        params![record.uid],
        from_row,
    )?;
    sp.commit()?;

    let status = if existed { WriteStatus::Updated } else { WriteStatus::Created };
    Ok(Upserted { status, record: stored })
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, uid: &str) -> Result<Option<CompanyRecord>, Error> {
        let uid = uid.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CompanyRecord>, Error> {
                let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM companies WHERE uid = ?1"))?;

                match stmt.query_row(params![uid], from_row) {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn query(&self, query: &CanonicalQuery) -> Result<RecordPage, Error> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(name) = &query.name {
            args.push(escape_like(&fold(name)));
            clauses.push(format!("name_folded LIKE '%' || ?{} || '%' ESCAPE '\\'", args.len()));
        }
        if let Some(prefix) = &query.uid_prefix {
            args.push(escape_like(&fold(prefix)));
            clauses.push(format!("uid LIKE ?{} || '%' ESCAPE '\\'", args.len()));
        }
        if let Some(status) = &query.status {
            args.push(status.clone());
            clauses.push(format!("status = ?{}", args.len()));
        }
        if let Some(legal_form) = &query.legal_form {
            args.push(legal_form.clone());
            clauses.push(format!("legal_form = ?{}", args.len()));
        }
        if let Some(region) = &query.region {
            args.push(escape_like(&fold(region)));
            clauses.push(format!("address_folded LIKE '%' || ?{} || '%' ESCAPE '\\'", args.len()));
        }
        if query.active_only {
            let placeholders: Vec<String> = ACTIVE_STATUSES
                .iter()
                .map(|status| {
                    args.push((*status).to_string());
                    format!("?{}", args.len())
                })
                .collect();
            clauses.push(format!("status IN ({})", placeholders.join(", ")));
        }
        if let Some(token) = &query.cursor {
            let position: SearchPosition = cursor::decode(token)?;
            args.push(position.name);
            let name_idx = args.len();
            args.push(position.uid);
            let uid_idx = args.len();
            clauses.push(format!("(name > ?{name_idx} OR (name = ?{name_idx} AND uid > ?{uid_idx}))"));
        }

        let filter = if clauses.is_empty() { String::new() } else { format!("WHERE {}", clauses.join(" AND ")) };
        let limit = query.limit;
        let sql = format!("SELECT {COLUMNS} FROM companies {filter} ORDER BY name, uid LIMIT {}", limit + 1);

        let mut records = self
            .conn
            .call(move |conn| -> Result<Vec<CompanyRecord>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(args.iter()), from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)?;

        let next_cursor = if records.len() > limit {
            records.truncate(limit);
            match records.last() {
                Some(last) => Some(cursor::encode(&SearchPosition { name: last.name.clone(), uid: last.uid.clone() })?),
                None => None,
            }
        } else {
            None
        };

        Ok(RecordPage { records, next_cursor })
    }

    async fn upsert_batch(&self, records: &[CompanyRecord]) -> Result<BatchOutcome, Error> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let records = records.to_vec();
        self.conn
            .call(move |conn| -> Result<BatchOutcome, Error> {
                let now = db::now();
                let mut tx = conn.transaction()?;
                let outcomes = records
                    .iter()
                    .map(|record| upsert_one(&mut tx, record, &now))
                    .collect();
                tx.commit()?;
                Ok(outcomes)
            })
            .await
            .map_err(Error::from)
    }

    async fn scan(&self, cursor: Option<&str>, limit: usize) -> Result<RecordPage, Error> {
        let after = match cursor {
            Some(token) => cursor::decode::<ScanPosition>(token)?.uid,
            None => String::new(),
        };
        let limit = limit.max(1);

        let mut records = self
            .conn
            .call(move |conn| -> Result<Vec<CompanyRecord>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM companies WHERE uid > ?1 ORDER BY uid LIMIT ?2"))?;
                let rows = stmt.query_map(params![after, (limit + 1) as i64], from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)?;

        let next_cursor = if records.len() > limit {
            records.truncate(limit);
            match records.last() {
                Some(last) => Some(cursor::encode(&ScanPosition { uid: last.uid.clone() })?),
                None => None,
            }
        } else {
            None
        };

        Ok(RecordPage { records, next_cursor })
    }

    async fn delete(&self, uid: &str) -> Result<bool, Error> {
        let uid = uid.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM companies WHERE uid = ?1", params![uid])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn ping(&self) -> Result<(), Error> {
        connection::ping(&self.conn).await
    }
}
