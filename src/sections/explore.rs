//! Explore slide: raw CSV, its parsed preview, notes, and the flat
//! workshop/registration views derived from the preview.

use serde::{Deserialize, Serialize};

use crate::csv::parse_csv;

pub const KEY: &str = "explore";

pub const SAMPLE_CSV: &str = include_str!("sample.csv");

pub const WORKSHOP_COLUMNS: [&str; 7] = [
    "WorkshopID",
    "WorkshopTitle",
    "WorkshopDate",
    "Location",
    "InstructorName",
    "InstructorEmail",
    "InstructorGender",
];

pub const REGISTRATION_COLUMNS: [&str; 8] = [
    "ParticipantName",
    "ParticipantEmail",
    "ParticipantPhone",
    "ParticipantGender",
    "WorkshopTitle",
    "PaymentMethod",
    "DiscountCode",
    "PricePaid",
];

const MAX_REGISTRATION_ROWS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExploreState {
    pub csv_text: String,
    pub csv_preview: Vec<Vec<String>>,
    pub exp_notes: String,
}

impl Default for ExploreState {
    fn default() -> Self {
        Self {
            csv_text: SAMPLE_CSV.trim_end().to_string(),
            csv_preview: Vec::new(),
            exp_notes: String::new(),
        }
    }
}

impl ExploreState {
    pub fn load_preview(&mut self) {
        self.csv_preview = parse_csv(&self.csv_text);
    }

    /// First mount shows the preview without an explicit reload.
    pub fn ensure_preview(&mut self) {
        if self.csv_preview.is_empty() {
            self.load_preview();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Examples {
    pub instructor: String,
    pub instructor_count: usize,
    pub participant: String,
    pub participant_count: usize,
}

/// Header row first in each view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatViews {
    pub workshops: Vec<Vec<String>>,
    pub registrations: Vec<Vec<String>>,
    pub examples: Examples,
}

pub fn derive_views(preview: &[Vec<String>]) -> FlatViews {
    let Some((header, body)) = preview.split_first() else {
        return FlatViews::default();
    };
    let idx = |name: &str| header.iter().position(|h| h == name);
    let cell = |row: &[String], i: Option<usize>| -> String {
        i.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    let w_idx: Vec<Option<usize>> = WORKSHOP_COLUMNS.iter().map(|c| idx(c)).collect();
    let id_col = idx("WorkshopID");
    let mut seen = std::collections::HashSet::new();
    let mut workshops = vec![header_row(&WORKSHOP_COLUMNS)];
    for row in body {
        let wid = cell(row, id_col);
        if wid.is_empty() || !seen.insert(wid) {
            continue;
        }
        workshops.push(w_idx.iter().map(|i| cell(row, *i)).collect());
    }

    let r_idx: Vec<Option<usize>> = REGISTRATION_COLUMNS.iter().map(|c| idx(c)).collect();
    let name_col = idx("ParticipantName");
    let mut registrations = vec![header_row(&REGISTRATION_COLUMNS)];
    registrations.extend(
        body.iter()
            .filter(|row| !cell(row, name_col).is_empty())
            .take(MAX_REGISTRATION_ROWS)
            .map(|row| r_idx.iter().map(|i| cell(row, *i)).collect()),
    );

    let (instructor, instructor_count) = most_frequent(body, idx("InstructorName"));
    let (participant, participant_count) = most_frequent(body, name_col);

    FlatViews {
        workshops,
        registrations,
        examples: Examples {
            instructor,
            instructor_count,
            participant,
            participant_count,
        },
    }
}

fn header_row(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

/// Highest count wins; on a tie the value seen first wins.
fn most_frequent(body: &[Vec<String>], col: Option<usize>) -> (String, usize) {
    let Some(col) = col else {
        return (String::new(), 0);
    };
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in body {
        let name = row.get(col).map(|s| s.trim()).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(n, _)| n == name) {
            Some((_, c)) => *c += 1,
            None => counts.push((name.to_string(), 1)),
        }
    }
    let mut top = (String::new(), 0);
    for (name, count) in counts {
        if count > top.1 {
            top = (name, count);
        }
    }
    top
}
