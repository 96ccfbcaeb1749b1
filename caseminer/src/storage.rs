//! The storage sink: the `CaseStore` interface and its SQLite backing.
//!
//! The pipeline only requires atomic single-row upsert semantics keyed by
//! case id, a "not yet successfully processed" query, and an activity-log
//! append; everything in `SqliteStore` is generated from the schema
//! registry, so adding an enrichment category never means adding storage
//! code.

use rusqlite::{params, types::Value as SqlValue, Connection};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::normalize::NormalizedPayload;
use crate::parser::Verdict;
use crate::schema::{schema, Arity, ExtractionSchema, SCHEMAS};

/// Outcome status recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    /// The payload was stored.
    Success,
    /// The entity failed and should be retried on a future run.
    Error,
    /// Extraction produced nothing usable; the raw text is in the notes.
    Skipped,
}

impl ActivityStatus {
    /// The string persisted to the activity log.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

/// One press-release record eligible for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
}

/// Element accounting for one store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreReport {
    /// Elements written.
    pub stored: usize,
    /// Non-mapping elements dropped, reported rather than silently lost.
    pub skipped: usize,
}

/// The sink interface the pipeline drives.
///
/// Implementations must provide atomic single-row upsert semantics keyed by
/// case id; no other engine behavior is assumed.
pub trait CaseStore {
    /// Cases whose most recent activity-log status for `schema_name` is not
    /// `success`.
    fn pending_for(&self, schema_name: &str, limit: usize) -> Result<Vec<CaseRecord>>;

    /// Cases not yet classified (or classified `unknown`, which is retried).
    fn pending_classification(&self, limit: usize) -> Result<Vec<CaseRecord>>;

    /// Upserts a normalized payload for one case.
    fn store_payload(
        &self,
        case_id: &str,
        schema: &ExtractionSchema,
        payload: &NormalizedPayload,
        url: &str,
    ) -> Result<StoreReport>;

    /// Persists a classification verdict for one case.
    fn store_verdict(&self, case_id: &str, verdict: Verdict) -> Result<()>;

    /// Appends one activity-log row.
    fn log_activity(
        &self,
        case_id: &str,
        schema_name: &str,
        status: ActivityStatus,
        notes: &str,
    ) -> Result<()>;
}

/// SQLite-backed [`CaseStore`].
///
/// A connection is opened and closed around each unit of work; there is no
/// pooling and no shared handle, matching the one-request-at-a-time
/// processing model.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: String,
}

impl SqliteStore {
    /// Creates a store over the database at `path`.
    pub fn open(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing database file.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Creates every table the pipeline needs, if absent: the `cases`
    /// table, one table per registered schema, and the activity log.
    pub fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cases (
               id             TEXT PRIMARY KEY,
               title          TEXT,
               body           TEXT,
               url            TEXT,
               classification TEXT
             );
             CREATE TABLE IF NOT EXISTS activity_log (
               log_id      INTEGER PRIMARY KEY AUTOINCREMENT,
               timestamp   TEXT NOT NULL DEFAULT (datetime('now')),
               case_id     TEXT NOT NULL,
               schema_name TEXT NOT NULL,
               status      TEXT NOT NULL,
               notes       TEXT
             );",
        )?;

        for s in SCHEMAS.values() {
            conn.execute_batch(&table_ddl(s))?;
        }
        Ok(())
    }

    /// Inserts or replaces a case row. The crawler owns this table in
    /// production; tests and backfills use this entry point.
    pub fn upsert_case(&self, record: &CaseRecord) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO cases (id, title, body, url) VALUES (?1, ?2, ?3, ?4)",
            params![record.id, record.title, record.body, record.url],
        )?;
        Ok(())
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }
}

/// DDL for one schema's table, generated from the registry.
fn table_ddl(schema: &ExtractionSchema) -> String {
    let mut columns = String::new();
    for key in schema.expected_keys {
        columns.push_str(&format!(",\n  {key} TEXT"));
    }

    match schema.arity {
        Arity::Single => format!(
            "CREATE TABLE IF NOT EXISTS {name} (\n  case_id TEXT PRIMARY KEY{columns},\n  press_release_url TEXT\n);",
            name = schema.name
        ),
        Arity::List => format!(
            "CREATE TABLE IF NOT EXISTS {name} (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  case_id TEXT NOT NULL{columns}\n);",
            name = schema.name
        ),
    }
}

/// Converts a JSON value to a SQLite value, leaning on SQLite's dynamic
/// typing: structures become their JSON text.
fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(Value::Bool(b)) => SqlValue::Integer(*b as i64),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

impl CaseStore for SqliteStore {
    fn pending_for(&self, schema_name: &str, limit: usize) -> Result<Vec<CaseRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.title, c.body, c.url
             FROM cases c
             LEFT JOIN (
               SELECT case_id, status,
                      ROW_NUMBER() OVER (
                        PARTITION BY case_id
                        ORDER BY timestamp DESC, log_id DESC
                      ) AS rn
               FROM activity_log
               WHERE schema_name = ?1
             ) latest ON c.id = latest.case_id AND latest.rn = 1
             WHERE latest.status IS NULL OR latest.status != 'success'
             ORDER BY c.id
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![schema_name, limit as i64], |row| {
            Ok(CaseRecord {
                id: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                body: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn pending_classification(&self, limit: usize) -> Result<Vec<CaseRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, body, url FROM cases
             WHERE classification IS NULL OR classification = 'unknown'
             ORDER BY id
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(CaseRecord {
                id: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                body: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn store_payload(
        &self,
        case_id: &str,
        schema: &ExtractionSchema,
        payload: &NormalizedPayload,
        url: &str,
    ) -> Result<StoreReport> {
        let mut conn = self.connect()?;

        match payload {
            NormalizedPayload::Single(map) => {
                let mut columns = vec!["case_id"];
                columns.extend(schema.expected_keys);
                columns.push("press_release_url");

                let placeholders = (1..=columns.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
                    schema.name,
                    columns.join(", "),
                    placeholders
                );

                let mut values: Vec<SqlValue> = vec![SqlValue::Text(case_id.to_string())];
                for key in schema.expected_keys {
                    values.push(to_sql(map.get(*key)));
                }
                values.push(SqlValue::Text(url.to_string()));

                conn.execute(&sql, rusqlite::params_from_iter(values))?;
                info!(case_id, schema = schema.name, "stored single-object payload");
                Ok(StoreReport { stored: 1, skipped: 0 })
            }
            NormalizedPayload::List(items) => {
                let mut columns = vec!["case_id"];
                columns.extend(schema.expected_keys);
                let placeholders = (1..=columns.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    schema.name,
                    columns.join(", "),
                    placeholders
                );

                let tx = conn.transaction()?;
                tx.execute(
                    &format!("DELETE FROM {} WHERE case_id = ?1", schema.name),
                    params![case_id],
                )?;

                let mut report = StoreReport::default();
                {
                    let mut stmt = tx.prepare(&sql)?;
                    for item in items {
                        let Value::Object(map) = item else {
                            warn!(
                                case_id,
                                schema = schema.name,
                                element = %item,
                                "skipping non-object list element"
                            );
                            report.skipped += 1;
                            continue;
                        };
                        let mut values: Vec<SqlValue> =
                            vec![SqlValue::Text(case_id.to_string())];
                        for key in schema.expected_keys {
                            values.push(to_sql(map.get(*key)));
                        }
                        stmt.execute(rusqlite::params_from_iter(values))?;
                        report.stored += 1;
                    }
                }
                tx.commit()?;

                info!(
                    case_id,
                    schema = schema.name,
                    stored = report.stored,
                    skipped = report.skipped,
                    "stored list payload"
                );
                Ok(report)
            }
        }
    }

    fn store_verdict(&self, case_id: &str, verdict: Verdict) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE cases SET classification = ?1 WHERE id = ?2",
            params![verdict.as_str(), case_id],
        )?;
        Ok(())
    }

    fn log_activity(
        &self,
        case_id: &str,
        schema_name: &str,
        status: ActivityStatus,
        notes: &str,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO activity_log (case_id, schema_name, status, notes)
             VALUES (?1, ?2, ?3, ?4)",
            params![case_id, schema_name, status.as_str(), notes],
        )?;
        Ok(())
    }
}

/// Looks up a schema by name, as an error rather than an option.
pub fn require_schema(name: &str) -> Result<&'static ExtractionSchema> {
    schema(name).ok_or_else(|| crate::error::Error::unknown_schema(name))
}
