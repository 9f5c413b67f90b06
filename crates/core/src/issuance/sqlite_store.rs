//! SQLite-backed issuance store implementation.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{Issuance, IssuanceFilter, IssuanceStatus, IssuanceStore, Recipient};
use crate::db;
use crate::directory::DirectoryKind;
use crate::error::StoreError;

const ISSUANCE_COLUMNS: &str = "id, asset_id, recipient_kind, recipient_id, issued_by, issued_at, expected_return, status, return_condition, returned_at, received_by, remarks";

/// SQLite-backed issuance store.
pub struct SqliteIssuanceStore {
    conn: Mutex<Connection>,
}

impl SqliteIssuanceStore {
    /// Create a new SQLite issuance store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite issuance store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS issuances (
                id TEXT PRIMARY KEY,
                asset_id TEXT NOT NULL,
                recipient_kind TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                issued_by TEXT NOT NULL,
                issued_at TEXT NOT NULL,
                expected_return TEXT,
                status TEXT NOT NULL,
                return_condition TEXT,
                returned_at TEXT,
                received_by TEXT,
                remarks TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_issuances_one_active
                ON issuances(asset_id) WHERE status = 'active';
            CREATE INDEX IF NOT EXISTS idx_issuances_asset ON issuances(asset_id, issued_at);
            CREATE INDEX IF NOT EXISTS idx_issuances_recipient ON issuances(recipient_id);
            "#,
        )?;
        Ok(())
    }

    fn build_where_clause(
        filter: &IssuanceFilter,
    ) -> Result<(String, Vec<Box<dyn rusqlite::ToSql>>), StoreError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref asset_id) = filter.asset_id {
            conditions.push("asset_id = ?");
            params.push(Box::new(asset_id.clone()));
        }

        if let Some(ref status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(db::enum_to_sql(status)?));
        }

        if let Some(ref recipient_id) = filter.recipient_id {
            conditions.push("recipient_id = ?");
            params.push(Box::new(recipient_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Ok((where_clause, params))
    }

    fn row_to_issuance(row: &rusqlite::Row) -> rusqlite::Result<Issuance> {
        let recipient_kind: String = row.get(2)?;
        let recipient_id: String = row.get(3)?;
        let issued_at: String = row.get(5)?;
        let status: String = row.get(7)?;
        let return_condition: Option<String> = row.get(8)?;

        let recipient = match db::enum_from_sql::<DirectoryKind>(&recipient_kind)? {
            DirectoryKind::Employee => Recipient::Employee(recipient_id),
            DirectoryKind::Department => Recipient::Department(recipient_id),
            other => {
                return Err(rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("{} cannot receive an asset", other).into(),
                ))
            }
        };

        Ok(Issuance {
            id: row.get(0)?,
            asset_id: row.get(1)?,
            recipient,
            issued_by: row.get(4)?,
            issued_at: db::parse_timestamp(&issued_at)?,
            expected_return: db::parse_optional_timestamp(row.get(6)?)?,
            status: db::enum_from_sql(&status)?,
            return_condition: return_condition
                .as_deref()
                .map(db::enum_from_sql)
                .transpose()?,
            returned_at: db::parse_optional_timestamp(row.get(9)?)?,
            received_by: row.get(10)?,
            remarks: row.get(11)?,
        })
    }
}

impl IssuanceStore for SqliteIssuanceStore {
    fn insert(&self, issuance: &Issuance) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO issuances ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ISSUANCE_COLUMNS
            ),
            params![
                issuance.id,
                issuance.asset_id,
                db::enum_to_sql(&issuance.recipient.directory_kind())?,
                issuance.recipient.id(),
                issuance.issued_by,
                db::format_timestamp(&issuance.issued_at),
                issuance.expected_return.as_ref().map(db::format_timestamp),
                db::enum_to_sql(&issuance.status)?,
                issuance
                    .return_condition
                    .as_ref()
                    .map(db::enum_to_sql)
                    .transpose()?,
                issuance.returned_at.as_ref().map(db::format_timestamp),
                issuance.received_by,
                issuance.remarks,
            ],
        )?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Issuance>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let issuance = conn
            .query_row(
                &format!("SELECT {} FROM issuances WHERE id = ?", ISSUANCE_COLUMNS),
                params![id],
                Self::row_to_issuance,
            )
            .optional()?;

        Ok(issuance)
    }

    fn update(&self, issuance: &Issuance) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn.execute(
            "UPDATE issuances SET status = ?, return_condition = ?, returned_at = ?, received_by = ?, remarks = ? WHERE id = ?",
            params![
                db::enum_to_sql(&issuance.status)?,
                issuance
                    .return_condition
                    .as_ref()
                    .map(db::enum_to_sql)
                    .transpose()?,
                issuance.returned_at.as_ref().map(db::format_timestamp),
                issuance.received_by,
                issuance.remarks,
                issuance.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::Database(format!(
                "No issuance with id {}",
                issuance.id
            )));
        }

        Ok(())
    }

    fn list(&self, filter: &IssuanceFilter) -> Result<Vec<Issuance>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!(
            "SELECT {} FROM issuances {} ORDER BY issued_at DESC, rowid DESC LIMIT ? OFFSET ?",
            ISSUANCE_COLUMNS, where_clause
        );

        let mut all_params = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let issuances = stmt
            .query_map(param_refs.as_slice(), Self::row_to_issuance)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(issuances)
    }

    fn count(&self, filter: &IssuanceFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM issuances {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    fn active_for_asset(&self, asset_id: &str) -> Result<Option<Issuance>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let issuance = conn
            .query_row(
                &format!(
                    "SELECT {} FROM issuances WHERE asset_id = ? AND status = 'active'",
                    ISSUANCE_COLUMNS
                ),
                params![asset_id],
                Self::row_to_issuance,
            )
            .optional()?;

        Ok(issuance)
    }

    fn assets_with_active_issuance(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT DISTINCT asset_id FROM issuances WHERE status = 'active'")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
