//! Small helpers shared by the SQLite stores.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Connection;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

/// Open a database file, enabling WAL so several stores can share it.
pub(crate) fn open(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

pub(crate) fn open_in_memory() -> Result<Connection, StoreError> {
    Ok(Connection::open_in_memory()?)
}

/// Current time at the precision the stores persist.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_optional_timestamp(
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

/// Store enums as their serde string form (e.g. "in_stock").
pub(crate) fn enum_to_sql<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(StoreError::Serialization(format!(
            "expected a string enum, got {}",
            other
        ))),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

pub(crate) fn enum_from_sql<T: DeserializeOwned>(value: &str) -> rusqlite::Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStatus;

    #[test]
    fn test_enum_round_trip() {
        let sql = enum_to_sql(&AssetStatus::UnderRepair).unwrap();
        assert_eq!(sql, "under_repair");
        let back: AssetStatus = enum_from_sql(&sql).unwrap();
        assert_eq!(back, AssetStatus::UnderRepair);
    }

    #[test]
    fn test_unknown_enum_value_is_an_error() {
        let result: rusqlite::Result<AssetStatus> = enum_from_sql("misplaced");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        let now = now();
        let formatted = format_timestamp(&now);
        assert!(formatted.ends_with('Z'));
        assert_eq!(parse_timestamp(&formatted).unwrap(), now);
        assert!(parse_timestamp("yesterday").is_err());
        assert_eq!(parse_optional_timestamp(None).unwrap(), None);
    }
}
