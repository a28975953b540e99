//! M2M-Redesign slide: five free-form tables for the join-table redesign.

use serde::{Deserialize, Serialize};

use crate::error::{KitError, KitResult};
use crate::table::{Table, TableSummary};

pub const KEY: &str = "m2m_redesign";

pub const TABLE_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct M2mState {
    pub tables: Vec<Table>,
    pub summaries: Vec<TableSummary>,
}

impl Default for M2mState {
    /// Five tables with one blank row each. Row ids are fresh on every call,
    /// so two defaults agree on everything except `Row::id`.
    fn default() -> Self {
        let mut state = Self {
            tables: (0..TABLE_COUNT).map(|_| Table::with_blank_row()).collect(),
            summaries: Vec::new(),
        };
        state.refresh_summaries();
        state
    }
}

impl M2mState {
    pub fn normalize(&mut self) {
        for table in &mut self.tables {
            table.normalize();
        }
        self.refresh_summaries();
    }

    pub fn edit<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Table) -> KitResult<R>,
    ) -> KitResult<R> {
        let table = self
            .tables
            .get_mut(index)
            .ok_or_else(|| KitError::UnknownTable(index.to_string()))?;
        let out = f(table);
        self.refresh_summaries();
        out
    }

    pub fn is_touched(&self) -> bool {
        self.tables.iter().any(Table::is_touched)
    }

    pub fn refresh_summaries(&mut self) {
        self.summaries = self.tables.iter().map(Table::summary).collect();
    }
}
