//! SQLite-backed repair store implementation.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{RepairFilter, RepairOutcome, RepairRecord, RepairStore};
use crate::db;
use crate::error::StoreError;

const REPAIR_COLUMNS: &str = "id, ticket_id, asset_id, technician_id, diagnosis, outcome, actions_taken, parts_used, returned_to_user, received_at, completed_at, returned_at";

/// SQLite-backed repair store.
pub struct SqliteRepairStore {
    conn: Mutex<Connection>,
}

impl SqliteRepairStore {
    /// Create a new SQLite repair store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite repair store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = db::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS repairs (
                id TEXT PRIMARY KEY,
                ticket_id TEXT NOT NULL,
                asset_id TEXT NOT NULL,
                technician_id TEXT NOT NULL,
                diagnosis TEXT,
                outcome TEXT NOT NULL,
                actions_taken TEXT,
                parts_used TEXT,
                returned_to_user INTEGER NOT NULL DEFAULT 0,
                received_at TEXT NOT NULL,
                completed_at TEXT,
                returned_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_repairs_asset ON repairs(asset_id, received_at);
            CREATE INDEX IF NOT EXISTS idx_repairs_ticket ON repairs(ticket_id, received_at);
            CREATE INDEX IF NOT EXISTS idx_repairs_outcome ON repairs(outcome);
            "#,
        )?;
        Ok(())
    }

    fn build_where_clause(
        filter: &RepairFilter,
    ) -> Result<(String, Vec<Box<dyn rusqlite::ToSql>>), StoreError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref ticket_id) = filter.ticket_id {
            conditions.push("ticket_id = ?");
            params.push(Box::new(ticket_id.clone()));
        }

        if let Some(ref asset_id) = filter.asset_id {
            conditions.push("asset_id = ?");
            params.push(Box::new(asset_id.clone()));
        }

        if let Some(ref outcome) = filter.outcome {
            conditions.push("outcome = ?");
            params.push(Box::new(db::enum_to_sql(outcome)?));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Ok((where_clause, params))
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RepairRecord> {
        let outcome: String = row.get(5)?;
        let received_at: String = row.get(9)?;

        Ok(RepairRecord {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            asset_id: row.get(2)?,
            technician_id: row.get(3)?,
            diagnosis: row.get(4)?,
            outcome: db::enum_from_sql(&outcome)?,
            actions_taken: row.get(6)?,
            parts_used: row.get(7)?,
            returned_to_user: row.get(8)?,
            received_at: db::parse_timestamp(&received_at)?,
            completed_at: db::parse_optional_timestamp(row.get(10)?)?,
            returned_at: db::parse_optional_timestamp(row.get(11)?)?,
        })
    }

    fn latest_where(&self, column: &str, value: &str) -> Result<Option<RepairRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM repairs WHERE {} = ? ORDER BY received_at DESC, rowid DESC LIMIT 1",
                    REPAIR_COLUMNS, column
                ),
                params![value],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }
}

impl RepairStore for SqliteRepairStore {
    fn insert(&self, record: &RepairRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO repairs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                REPAIR_COLUMNS
            ),
            params![
                record.id,
                record.ticket_id,
                record.asset_id,
                record.technician_id,
                record.diagnosis,
                db::enum_to_sql(&record.outcome)?,
                record.actions_taken,
                record.parts_used,
                record.returned_to_user,
                db::format_timestamp(&record.received_at),
                record.completed_at.as_ref().map(db::format_timestamp),
                record.returned_at.as_ref().map(db::format_timestamp),
            ],
        )?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<RepairRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let record = conn
            .query_row(
                &format!("SELECT {} FROM repairs WHERE id = ?", REPAIR_COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    fn update(&self, record: &RepairRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn.execute(
            "UPDATE repairs SET diagnosis = ?, outcome = ?, actions_taken = ?, parts_used = ?, returned_to_user = ?, completed_at = ?, returned_at = ? WHERE id = ?",
            params![
                record.diagnosis,
                db::enum_to_sql(&record.outcome)?,
                record.actions_taken,
                record.parts_used,
                record.returned_to_user,
                record.completed_at.as_ref().map(db::format_timestamp),
                record.returned_at.as_ref().map(db::format_timestamp),
                record.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::Database(format!("No repair with id {}", record.id)));
        }

        Ok(())
    }

    fn list(&self, filter: &RepairFilter) -> Result<Vec<RepairRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!(
            "SELECT {} FROM repairs {} ORDER BY received_at DESC, rowid DESC LIMIT ? OFFSET ?",
            REPAIR_COLUMNS, where_clause
        );

        let mut all_params = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(param_refs.as_slice(), Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count(&self, filter: &RepairFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM repairs {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    fn latest_for_asset(&self, asset_id: &str) -> Result<Option<RepairRecord>, StoreError> {
        self.latest_where("asset_id", asset_id)
    }

    fn latest_for_ticket(&self, ticket_id: &str) -> Result<Option<RepairRecord>, StoreError> {
        self.latest_where("ticket_id", ticket_id)
    }

    fn pending(&self) -> Result<Vec<RepairRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repairs WHERE outcome = ? ORDER BY received_at ASC, rowid ASC",
            REPAIR_COLUMNS
        ))?;
        let records = stmt
            .query_map(
                params![db::enum_to_sql(&RepairOutcome::Pending)?],
                Self::row_to_record,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
