use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "slidekit.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    // Workspaces created before write stamps were kept lack updated_at.
    ensure_kv_updated_at(conn)?;
    Ok(())
}

fn ensure_kv_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "kv_store", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE kv_store ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
        params![key, value, now],
    )?;
    Ok(())
}

pub fn kv_delete(conn: &Connection, key: &str) -> anyhow::Result<bool> {
    let rows = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
    Ok(rows > 0)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_get_set_delete() {
        let conn = open_in_memory().unwrap();

        assert_eq!(kv_get(&conn, "foo").unwrap(), None);

        kv_set(&conn, "foo", "bar").unwrap();
        assert_eq!(kv_get(&conn, "foo").unwrap(), Some("bar".into()));

        kv_set(&conn, "foo", "baz").unwrap();
        assert_eq!(kv_get(&conn, "foo").unwrap(), Some("baz".into()));

        assert!(kv_delete(&conn, "foo").unwrap());
        assert_eq!(kv_get(&conn, "foo").unwrap(), None);
        assert!(!kv_delete(&conn, "foo").unwrap());
    }

    #[test]
    fn old_kv_table_gains_updated_at() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE kv_store(key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO kv_store VALUES ('k', 'v')", []).unwrap();

        init_schema(&conn).unwrap();
        assert!(table_has_column(&conn, "kv_store", "updated_at").unwrap());
        assert_eq!(kv_get(&conn, "k").unwrap(), Some("v".into()));
    }
}
