//! Apply-Design slide: four named tables (attendee, instructor, workshop,
//! registration) plus the field/PK summaries that Review and export read.

use serde::{Deserialize, Serialize};

use crate::error::{KitError, KitResult};
use crate::table::{primary_key_of, summarize_fields, Row, Table};

pub const KEY: &str = "apply_design";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignTable {
    Attendee,
    Instructor,
    Workshop,
    Registration,
}

impl DesignTable {
    pub const ALL: [DesignTable; 4] = [
        DesignTable::Attendee,
        DesignTable::Instructor,
        DesignTable::Workshop,
        DesignTable::Registration,
    ];

    pub fn parse(s: &str) -> KitResult<Self> {
        match s {
            "attendee" => Ok(DesignTable::Attendee),
            "instructor" => Ok(DesignTable::Instructor),
            "workshop" => Ok(DesignTable::Workshop),
            "registration" => Ok(DesignTable::Registration),
            other => Err(KitError::UnknownTable(other.to_string())),
        }
    }

    /// Name shown when the student left the table unnamed.
    pub fn default_title(self) -> &'static str {
        match self {
            DesignTable::Attendee => "Table 1",
            DesignTable::Instructor => "Table 2",
            DesignTable::Workshop => "Table 3",
            DesignTable::Registration => "Table 4",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignSummaries {
    #[serde(rename = "attendeeFields")]
    pub attendee_fields: String,
    #[serde(rename = "attendeePK")]
    pub attendee_pk: String,
    #[serde(rename = "instructorFields")]
    pub instructor_fields: String,
    #[serde(rename = "workshopFields")]
    pub workshop_fields: String,
    #[serde(rename = "workshopPK")]
    pub workshop_pk: String,
    #[serde(rename = "regFields")]
    pub reg_fields: String,
    #[serde(rename = "regPK")]
    pub reg_pk: String,
}

impl DesignSummaries {
    /// Instructor fields alone do not count as progress.
    pub fn has_answers(&self) -> bool {
        [
            &self.attendee_pk,
            &self.workshop_pk,
            &self.reg_pk,
            &self.attendee_fields,
            &self.workshop_fields,
            &self.reg_fields,
        ]
        .iter()
        .any(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyDesignState {
    pub p_name: String,
    pub i_name: String,
    pub w_name: String,
    pub r_name: String,
    pub p_rows: Vec<Row>,
    pub i_rows: Vec<Row>,
    pub w_rows: Vec<Row>,
    pub r_rows: Vec<Row>,
    pub summaries: DesignSummaries,
}

impl Default for ApplyDesignState {
    /// One blank row per table. Row ids are fresh on every call, so two
    /// defaults agree on everything except `Row::id`.
    fn default() -> Self {
        Self {
            p_name: String::new(),
            i_name: String::new(),
            w_name: String::new(),
            r_name: String::new(),
            p_rows: vec![Row::blank()],
            i_rows: vec![Row::blank()],
            w_rows: vec![Row::blank()],
            r_rows: vec![Row::blank()],
            summaries: DesignSummaries::default(),
        }
    }
}

impl ApplyDesignState {
    /// Fill missing row ids, give empty tables a blank row, recompute summaries.
    pub fn normalize(&mut self) {
        for t in DesignTable::ALL {
            let _ = self.edit(t, |table| {
                table.normalize();
                Ok(())
            });
        }
    }

    pub fn table(&self, which: DesignTable) -> Table {
        let (name, rows) = match which {
            DesignTable::Attendee => (&self.p_name, &self.p_rows),
            DesignTable::Instructor => (&self.i_name, &self.i_rows),
            DesignTable::Workshop => (&self.w_name, &self.w_rows),
            DesignTable::Registration => (&self.r_name, &self.r_rows),
        };
        Table {
            name: name.clone(),
            rows: rows.clone(),
        }
    }

    /// Run `f` against one table; summaries are recomputed afterwards.
    pub fn edit<R>(
        &mut self,
        which: DesignTable,
        f: impl FnOnce(&mut Table) -> KitResult<R>,
    ) -> KitResult<R> {
        let (name, rows) = self.slots(which);
        let mut table = Table {
            name: std::mem::take(name),
            rows: std::mem::take(rows),
        };
        let out = f(&mut table);
        *name = table.name;
        *rows = table.rows;
        self.refresh_summaries();
        out
    }

    pub fn refresh_summaries(&mut self) {
        self.summaries = DesignSummaries {
            attendee_fields: summarize_fields(&self.p_rows),
            attendee_pk: primary_key_of(&self.p_rows),
            instructor_fields: summarize_fields(&self.i_rows),
            workshop_fields: summarize_fields(&self.w_rows),
            workshop_pk: primary_key_of(&self.w_rows),
            reg_fields: summarize_fields(&self.r_rows),
            reg_pk: primary_key_of(&self.r_rows),
        };
    }

    fn slots(&mut self, which: DesignTable) -> (&mut String, &mut Vec<Row>) {
        match which {
            DesignTable::Attendee => (&mut self.p_name, &mut self.p_rows),
            DesignTable::Instructor => (&mut self.i_name, &mut self.i_rows),
            DesignTable::Workshop => (&mut self.w_name, &mut self.w_rows),
            DesignTable::Registration => (&mut self.r_name, &mut self.r_rows),
        }
    }
}
