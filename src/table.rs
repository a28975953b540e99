//! Design tables: ordered rows with generated ids. Every row operation looks
//! rows up by id, never by position.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{KitError, KitResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "col", alias = "columnName", default)]
    pub column_name: String,
    #[serde(rename = "pk", alias = "isPrimaryKey", default)]
    pub is_primary_key: bool,
    #[serde(rename = "fk", alias = "isForeignKey", default)]
    pub is_foreign_key: bool,
}

pub fn new_row_id() -> String {
    Uuid::new_v4().to_string()
}

impl Row {
    pub fn blank() -> Self {
        Self {
            id: new_row_id(),
            column_name: String::new(),
            is_primary_key: false,
            is_foreign_key: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Table {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub fields: String,
    pub primary_key: String,
}

impl Table {
    pub fn with_blank_row() -> Self {
        Self {
            name: String::new(),
            rows: vec![Row::blank()],
        }
    }

    /// Rows missing an id get a fresh one; an empty table gets one blank row.
    pub fn normalize(&mut self) {
        for row in &mut self.rows {
            if row.id.is_empty() {
                row.id = new_row_id();
            }
        }
        if self.rows.is_empty() {
            self.rows.push(Row::blank());
        }
    }

    pub fn add_row(&mut self) -> String {
        let row = Row::blank();
        let id = row.id.clone();
        self.rows.push(row);
        id
    }

    pub fn remove_row(&mut self, row_id: &str) -> KitResult<()> {
        let idx = self.position(row_id)?;
        self.rows.remove(idx);
        Ok(())
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_column(&mut self, row_id: &str, value: &str) -> KitResult<()> {
        let idx = self.position(row_id)?;
        self.rows[idx].column_name = value.to_string();
        Ok(())
    }

    /// Set or clear the PK flag on `row_id`; every other row loses it.
    pub fn set_primary_key(&mut self, row_id: &str, checked: bool) -> KitResult<()> {
        self.position(row_id)?;
        for row in &mut self.rows {
            row.is_primary_key = row.id == row_id && checked;
        }
        Ok(())
    }

    pub fn set_foreign_key(&mut self, row_id: &str, checked: bool) -> KitResult<()> {
        let idx = self.position(row_id)?;
        self.rows[idx].is_foreign_key = checked;
        Ok(())
    }

    /// Non-empty column names, comma-joined.
    pub fn field_summary(&self) -> String {
        summarize_fields(&self.rows)
    }

    /// Column name of the PK row, or empty.
    pub fn primary_key(&self) -> String {
        primary_key_of(&self.rows)
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            fields: self.field_summary(),
            primary_key: self.primary_key(),
        }
    }

    pub fn is_touched(&self) -> bool {
        !self.name.is_empty() || self.rows.iter().any(|r| !r.column_name.is_empty())
    }

    fn position(&self, row_id: &str) -> KitResult<usize> {
        self.rows
            .iter()
            .position(|r| r.id == row_id)
            .ok_or_else(|| KitError::RowNotFound(row_id.to_string()))
    }
}

pub fn summarize_fields(rows: &[Row]) -> String {
    rows.iter()
        .map(|r| r.column_name.as_str())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn primary_key_of(rows: &[Row]) -> String {
    rows.iter()
        .find(|r| r.is_primary_key)
        .map(|r| r.column_name.clone())
        .unwrap_or_default()
}
