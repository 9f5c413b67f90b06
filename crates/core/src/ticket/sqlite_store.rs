//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::{Comment, Ticket, TicketFilter, TicketStatus, TicketStore};
use crate::db;
use crate::error::StoreError;

const TICKET_COLUMNS: &str = "id, title, description, priority, reporter_id, asset_id, assignee_id, status, resolved_at, closed_at, created_at, updated_at";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                priority TEXT NOT NULL,
                reporter_id TEXT NOT NULL,
                asset_id TEXT,
                assignee_id TEXT,
                status TEXT NOT NULL,
                resolved_at TEXT,
                closed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_asset_status ON tickets(asset_id, status);
            CREATE INDEX IF NOT EXISTS idx_tickets_assignee ON tickets(assignee_id);
            CREATE INDEX IF NOT EXISTS idx_tickets_reporter ON tickets(reporter_id);

            CREATE TABLE IF NOT EXISTS ticket_comments (
                id TEXT PRIMARY KEY,
                ticket_id TEXT NOT NULL REFERENCES tickets(id),
                author_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ticket_comments_ticket ON ticket_comments(ticket_id);
            "#,
        )?;
        Ok(())
    }

    fn build_where_clause(
        filter: &TicketFilter,
    ) -> Result<(String, Vec<Box<dyn rusqlite::ToSql>>), StoreError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(db::enum_to_sql(status)?));
        }

        if let Some(ref asset_id) = filter.asset_id {
            conditions.push("asset_id = ?");
            params.push(Box::new(asset_id.clone()));
        }

        if let Some(ref assignee_id) = filter.assignee_id {
            conditions.push("assignee_id = ?");
            params.push(Box::new(assignee_id.clone()));
        }

        if let Some(ref reporter_id) = filter.reporter_id {
            conditions.push("reporter_id = ?");
            params.push(Box::new(reporter_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Ok((where_clause, params))
    }

    /// SQL list of the open-family statuses, e.g. `'open', 'in_progress'`.
    fn open_family_sql() -> String {
        TicketStatus::OPEN_FAMILY
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let priority: String = row.get(3)?;
        let status: String = row.get(7)?;
        let resolved_at: Option<String> = row.get(8)?;
        let closed_at: Option<String> = row.get(9)?;
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;

        Ok(Ticket {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            priority: db::enum_from_sql(&priority)?,
            reporter_id: row.get(4)?,
            asset_id: row.get(5)?,
            assignee_id: row.get(6)?,
            status: db::enum_from_sql(&status)?,
            comments: Vec::new(),
            resolved_at: db::parse_optional_timestamp(resolved_at)?,
            closed_at: db::parse_optional_timestamp(closed_at)?,
            created_at: db::parse_timestamp(&created_at)?,
            updated_at: db::parse_timestamp(&updated_at)?,
        })
    }

    fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
        let created_at: String = row.get(4)?;
        Ok(Comment {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            author_id: row.get(2)?,
            text: row.get(3)?,
            created_at: db::parse_timestamp(&created_at)?,
        })
    }

    fn query_tickets(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Ticket>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let tickets = stmt
            .query_map(params, Self::row_to_ticket)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tickets)
    }
}

impl TicketStore for SqliteTicketStore {
    fn insert(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO tickets ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                TICKET_COLUMNS
            ),
            params![
                ticket.id,
                ticket.title,
                ticket.description,
                db::enum_to_sql(&ticket.priority)?,
                ticket.reporter_id,
                ticket.asset_id,
                ticket.assignee_id,
                db::enum_to_sql(&ticket.status)?,
                ticket.resolved_at.as_ref().map(db::format_timestamp),
                ticket.closed_at.as_ref().map(db::format_timestamp),
                db::format_timestamp(&ticket.created_at),
                db::format_timestamp(&ticket.updated_at),
            ],
        )?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        );

        let mut ticket = match result {
            Ok(ticket) => ticket,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, author_id, text, created_at FROM ticket_comments WHERE ticket_id = ? ORDER BY created_at ASC, rowid ASC",
        )?;
        ticket.comments = stmt
            .query_map(params![id], Self::row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ticket))
    }

    fn update(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn.execute(
            "UPDATE tickets SET status = ?, assignee_id = ?, resolved_at = ?, closed_at = ?, updated_at = ? WHERE id = ?",
            params![
                db::enum_to_sql(&ticket.status)?,
                ticket.assignee_id,
                ticket.resolved_at.as_ref().map(db::format_timestamp),
                ticket.closed_at.as_ref().map(db::format_timestamp),
                db::format_timestamp(&ticket.updated_at),
                ticket.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::Database(format!("No ticket with id {}", ticket.id)));
        }

        Ok(())
    }

    fn link_asset(&self, ticket_id: &str, asset_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn.execute(
            "UPDATE tickets SET asset_id = ?1 WHERE id = ?2 AND (asset_id IS NULL OR asset_id = ?1)",
            params![asset_id, ticket_id],
        )?;

        Ok(rows == 1)
    }

    fn add_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO ticket_comments (id, ticket_id, author_id, text, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                comment.id,
                comment.ticket_id,
                comment.author_id,
                comment.text,
                db::format_timestamp(&comment.created_at),
            ],
        )?;

        Ok(())
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!(
            "SELECT {} FROM tickets {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            TICKET_COLUMNS, where_clause
        );

        let mut all_params = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        Self::query_tickets(&conn, &sql, &param_refs)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    fn open_for_asset(&self, asset_id: &str) -> Result<Vec<Ticket>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM tickets WHERE asset_id = ? AND status IN ({}) ORDER BY created_at ASC, rowid ASC",
            TICKET_COLUMNS,
            Self::open_family_sql()
        );

        Self::query_tickets(&conn, &sql, &[&asset_id])
    }

    fn assets_with_open_tickets(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT DISTINCT asset_id FROM tickets WHERE asset_id IS NOT NULL AND status IN ({})",
            Self::open_family_sql()
        );

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketPriority;

    fn create_test_store() -> SqliteTicketStore {
        SqliteTicketStore::in_memory().expect("Failed to create in-memory store")
    }

    fn ticket(id: &str, asset_id: Option<&str>, status: TicketStatus) -> Ticket {
        let now = db::now();
        Ticket {
            id: id.to_string(),
            title: format!("Ticket {}", id),
            description: "Keyboard missing keys".to_string(),
            priority: TicketPriority::High,
            reporter_id: "u-1".to_string(),
            asset_id: asset_id.map(String::from),
            assignee_id: None,
            status,
            comments: Vec::new(),
            resolved_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn comment(id: &str, ticket_id: &str, text: &str) -> Comment {
        Comment {
            id: id.to_string(),
            ticket_id: ticket_id.to_string(),
            author_id: "u-1".to_string(),
            text: text.to_string(),
            created_at: db::now(),
        }
    }

    #[test]
    fn test_insert_and_get_ticket() {
        let store = create_test_store();
        let original = ticket("t-1", Some("a-1"), TicketStatus::Open);
        store.insert(&original).unwrap();

        let fetched = store.get("t-1").unwrap().unwrap();
        assert_eq!(fetched, original);
    }

    #[test]
    fn test_get_nonexistent_ticket() {
        let store = create_test_store();
        assert!(store.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_comments_are_ordered() {
        let store = create_test_store();
        store.insert(&ticket("t-1", None, TicketStatus::Open)).unwrap();
        store.add_comment(&comment("c-1", "t-1", "first")).unwrap();
        store.add_comment(&comment("c-2", "t-1", "second")).unwrap();

        let fetched = store.get("t-1").unwrap().unwrap();
        let texts: Vec<_> = fetched.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);

        // List results never carry comments.
        let listed = store.list(&TicketFilter::new()).unwrap();
        assert!(listed[0].comments.is_empty());
    }

    #[test]
    fn test_update_ticket() {
        let store = create_test_store();
        let mut t = ticket("t-1", None, TicketStatus::Open);
        store.insert(&t).unwrap();

        let now = db::now();
        t.status = TicketStatus::Resolved;
        t.assignee_id = Some("tech-1".to_string());
        t.resolved_at = Some(now);
        t.updated_at = now;
        store.update(&t).unwrap();

        let fetched = store.get("t-1").unwrap().unwrap();
        assert_eq!(fetched, t);

        let missing = ticket("t-404", None, TicketStatus::Open);
        assert!(store.update(&missing).is_err());
    }

    #[test]
    fn test_update_leaves_asset_link_alone() {
        let store = create_test_store();
        let stale = ticket("t-1", None, TicketStatus::Open);
        store.insert(&stale).unwrap();
        assert!(store.link_asset("t-1", "a-1").unwrap());

        // A write based on a copy read before the link must not clear it.
        let mut stale = stale;
        stale.status = TicketStatus::WaitingParts;
        stale.updated_at = db::now();
        store.update(&stale).unwrap();

        let fetched = store.get("t-1").unwrap().unwrap();
        assert_eq!(fetched.status, TicketStatus::WaitingParts);
        assert_eq!(fetched.asset_id.as_deref(), Some("a-1"));
    }

    #[test]
    fn test_link_asset_only_from_unlinked() {
        let store = create_test_store();
        store.insert(&ticket("t-1", None, TicketStatus::Open)).unwrap();

        assert!(store.link_asset("t-1", "a-1").unwrap());
        // Relinking to the same asset is a no-op success.
        assert!(store.link_asset("t-1", "a-1").unwrap());
        assert!(!store.link_asset("t-1", "a-2").unwrap());
        assert!(!store.link_asset("t-404", "a-1").unwrap());

        let fetched = store.get("t-1").unwrap().unwrap();
        assert_eq!(fetched.asset_id.as_deref(), Some("a-1"));
    }

    #[test]
    fn test_list_with_filters() {
        let store = create_test_store();
        store.insert(&ticket("t-1", Some("a-1"), TicketStatus::Open)).unwrap();
        store.insert(&ticket("t-2", Some("a-1"), TicketStatus::Closed)).unwrap();
        let mut assigned = ticket("t-3", Some("a-2"), TicketStatus::InProgress);
        assigned.assignee_id = Some("tech-1".to_string());
        store.insert(&assigned).unwrap();

        assert_eq!(store.list(&TicketFilter::new()).unwrap().len(), 3);
        assert_eq!(
            store.list(&TicketFilter::new().with_asset("a-1")).unwrap().len(),
            2
        );
        assert_eq!(
            store
                .count(&TicketFilter::new().with_status(TicketStatus::Closed))
                .unwrap(),
            1
        );
        let by_tech = store
            .list(&TicketFilter::new().with_assignee("tech-1"))
            .unwrap();
        assert_eq!(by_tech.len(), 1);
        assert_eq!(by_tech[0].id, "t-3");
        assert_eq!(
            store.count(&TicketFilter::new().with_reporter("u-1")).unwrap(),
            3
        );
    }

    #[test]
    fn test_list_pagination_newest_first() {
        let store = create_test_store();
        for i in 0..5 {
            store
                .insert(&ticket(&format!("t-{}", i), None, TicketStatus::Open))
                .unwrap();
        }

        let page = store
            .list(&TicketFilter::new().with_limit(2).with_offset(0))
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "t-4");

        let last = store
            .list(&TicketFilter::new().with_limit(2).with_offset(4))
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, "t-0");
    }

    #[test]
    fn test_open_for_asset() {
        let store = create_test_store();
        store.insert(&ticket("t-1", Some("a-1"), TicketStatus::Open)).unwrap();
        store
            .insert(&ticket("t-2", Some("a-1"), TicketStatus::WaitingParts))
            .unwrap();
        store.insert(&ticket("t-3", Some("a-1"), TicketStatus::Resolved)).unwrap();
        store.insert(&ticket("t-4", Some("a-2"), TicketStatus::Open)).unwrap();
        store.insert(&ticket("t-5", None, TicketStatus::Open)).unwrap();

        let open: Vec<_> = store
            .open_for_asset("a-1")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(open, vec!["t-1", "t-2"]);

        let mut assets = store.assets_with_open_tickets().unwrap();
        assets.sort();
        assert_eq!(assets, vec!["a-1", "a-2"]);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("tickets.db");

        {
            let store = SqliteTicketStore::new(&db_path).unwrap();
            store.insert(&ticket("t-1", None, TicketStatus::Open)).unwrap();
        }

        let reopened = SqliteTicketStore::new(&db_path).unwrap();
        assert!(reopened.get("t-1").unwrap().is_some());
    }
}
