//! Durable and session key/value storage. All reads and writes of the
//! persisted document go through a `Storage`.

use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::Path;

use crate::db;

pub trait Storage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove_item(&mut self, key: &str) -> anyhow::Result<()>;
}

/// Workspace-backed storage (`slidekit.sqlite3`).
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }
}

impl Storage for SqliteStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        db::kv_get(&self.conn, key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        db::kv_set(&self.conn, key, value)
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        db::kv_delete(&self.conn, key)?;
        Ok(())
    }
}

/// Process-lifetime storage. Used for session-scoped keys and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// Lets a caller keep a handle on a `MemoryStorage` after giving the engine a boxed one.
#[derive(Debug, Default, Clone)]
pub struct SharedMemoryStorage(std::rc::Rc<std::cell::RefCell<MemoryStorage>>);

impl SharedMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for SharedMemoryStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.0.borrow().get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.0.borrow_mut().set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.0.borrow_mut().remove_item(key)
    }
}
