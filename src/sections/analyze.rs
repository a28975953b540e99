use serde::{Deserialize, Serialize};

use crate::error::{KitError, KitResult};

pub const KEY: &str = "analyze";

/// Four checklist boxes shown under each flat table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistFlags {
    pub dup: bool,
    pub red: bool,
    pub inc: bool,
    pub id: bool,
}

impl ChecklistFlags {
    pub fn any(&self) -> bool {
        self.dup || self.red || self.inc || self.id
    }

    fn slot(&mut self, flag: Flag) -> &mut bool {
        match flag {
            Flag::Duplicates => &mut self.dup,
            Flag::Redundancy => &mut self.red,
            Flag::Inconsistency => &mut self.inc,
            Flag::NoIds => &mut self.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Duplicates,
    Redundancy,
    Inconsistency,
    NoIds,
}

impl Flag {
    pub fn parse(s: &str) -> KitResult<Self> {
        match s {
            "dup" => Ok(Flag::Duplicates),
            "red" => Ok(Flag::Redundancy),
            "inc" => Ok(Flag::Inconsistency),
            "id" => Ok(Flag::NoIds),
            other => Err(KitError::UnknownOption(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatTable {
    Workshops,
    Registrations,
}

impl FlatTable {
    pub fn parse(s: &str) -> KitResult<Self> {
        match s {
            "workshops" => Ok(FlatTable::Workshops),
            "registrations" => Ok(FlatTable::Registrations),
            other => Err(KitError::UnknownTable(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeState {
    pub workshops: ChecklistFlags,
    pub registrations: ChecklistFlags,
}

impl AnalyzeState {
    pub fn set(&mut self, table: FlatTable, flag: Flag, value: bool) {
        let flags = match table {
            FlatTable::Workshops => &mut self.workshops,
            FlatTable::Registrations => &mut self.registrations,
        };
        *flags.slot(flag) = value;
    }

    pub fn any(&self) -> bool {
        self.workshops.any() || self.registrations.any()
    }

    /// Course-level flags: each checklist box OR-ed across both tables.
    pub fn observations(&self) -> ObservationFlags {
        let (w, r) = (self.workshops, self.registrations);
        ObservationFlags {
            obs_dup_rows: w.dup || r.dup,
            obs_redundancy: w.red || r.red,
            obs_inconsistency: w.inc || r.inc,
            obs_no_ids: w.id || r.id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObservationFlags {
    pub obs_dup_rows: bool,
    pub obs_redundancy: bool,
    pub obs_inconsistency: bool,
    #[serde(rename = "obsNoIDs")]
    pub obs_no_ids: bool,
}
