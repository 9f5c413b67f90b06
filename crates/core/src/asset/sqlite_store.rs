//! SQLite-backed asset store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Asset, AssetFilter, AssetStatus, AssetStore};
use crate::db;
use crate::error::StoreError;

const ASSET_COLUMNS: &str = "id, name, barcode, serial_number, model, category_id, department_id, notes, status, created_at, updated_at";

/// SQLite-backed asset store.
pub struct SqliteAssetStore {
    conn: Mutex<Connection>,
}

impl SqliteAssetStore {
    /// Create a new SQLite asset store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite asset store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS assets (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                barcode TEXT NOT NULL UNIQUE,
                serial_number TEXT,
                model TEXT,
                category_id TEXT NOT NULL,
                department_id TEXT NOT NULL,
                notes TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_assets_status ON assets(status);
            CREATE INDEX IF NOT EXISTS idx_assets_department ON assets(department_id);
            CREATE INDEX IF NOT EXISTS idx_assets_category ON assets(category_id);
            "#,
        )?;
        Ok(())
    }

    fn build_where_clause(
        filter: &AssetFilter,
    ) -> Result<(String, Vec<Box<dyn rusqlite::ToSql>>), StoreError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(db::enum_to_sql(status)?));
        }

        if let Some(ref department_id) = filter.department_id {
            conditions.push("department_id = ?");
            params.push(Box::new(department_id.clone()));
        }

        if let Some(ref category_id) = filter.category_id {
            conditions.push("category_id = ?");
            params.push(Box::new(category_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Ok((where_clause, params))
    }

    fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<Asset> {
        let status: String = row.get(8)?;
        let created_at: String = row.get(9)?;
        let updated_at: String = row.get(10)?;

        Ok(Asset {
            id: row.get(0)?,
            name: row.get(1)?,
            barcode: row.get(2)?,
            serial_number: row.get(3)?,
            model: row.get(4)?,
            category_id: row.get(5)?,
            department_id: row.get(6)?,
            notes: row.get(7)?,
            status: db::enum_from_sql(&status)?,
            created_at: db::parse_timestamp(&created_at)?,
            updated_at: db::parse_timestamp(&updated_at)?,
        })
    }
}

impl AssetStore for SqliteAssetStore {
    fn insert(&self, asset: &Asset) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO assets ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ASSET_COLUMNS
            ),
            params![
                asset.id,
                asset.name,
                asset.barcode,
                asset.serial_number,
                asset.model,
                asset.category_id,
                asset.department_id,
                asset.notes,
                db::enum_to_sql(&asset.status)?,
                db::format_timestamp(&asset.created_at),
                db::format_timestamp(&asset.updated_at),
            ],
        )?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Asset>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let asset = conn
            .query_row(
                &format!("SELECT {} FROM assets WHERE id = ?", ASSET_COLUMNS),
                params![id],
                Self::row_to_asset,
            )
            .optional()?;

        Ok(asset)
    }

    fn get_by_barcode(&self, barcode: &str) -> Result<Option<Asset>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let asset = conn
            .query_row(
                &format!("SELECT {} FROM assets WHERE barcode = ?", ASSET_COLUMNS),
                params![barcode],
                Self::row_to_asset,
            )
            .optional()?;

        Ok(asset)
    }

    fn update_status(
        &self,
        id: &str,
        status: AssetStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn.execute(
            "UPDATE assets SET status = ?, updated_at = ? WHERE id = ?",
            params![
                db::enum_to_sql(&status)?,
                db::format_timestamp(&updated_at),
                id
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::Database(format!("No asset with id {}", id)));
        }

        Ok(())
    }

    fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!(
            "SELECT {} FROM assets {} ORDER BY created_at ASC, rowid ASC LIMIT ? OFFSET ?",
            ASSET_COLUMNS, where_clause
        );

        let mut all_params = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let assets = stmt
            .query_map(param_refs.as_slice(), Self::row_to_asset)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(assets)
    }

    fn count(&self, filter: &AssetFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM assets {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }
}
