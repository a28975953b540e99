//! Identity lock: a one-way gate over the student's name and section.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::Refusal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Unset,
    Recording,
    Locked,
}

/// Two or more whitespace-separated name tokens, each starting with a letter.
pub fn is_full_name(s: &str) -> bool {
    static FULL_NAME: OnceLock<Regex> = OnceLock::new();
    let re = FULL_NAME.get_or_init(|| {
        Regex::new(r"^[A-Za-z][\w'-]+(\s+[A-Za-z][\w'-]+)+$").expect("static regex")
    });
    re.is_match(s.trim())
}

/// The name shape stored in the session-scoped identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionIdentity {
    pub first_name: String,
    pub last_name: String,
    pub section: String,
}

impl SessionIdentity {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLock {
    state: LockState,
    first: String,
    last: String,
    section: String,
}

impl Default for IdentityLock {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityLock {
    pub fn new() -> Self {
        Self {
            state: LockState::Unset,
            first: String::new(),
            last: String::new(),
            section: String::new(),
        }
    }

    /// Rebuild from persisted fields. A persisted lock is honored as-is.
    pub fn restored(full_name: &str, section: &str, locked: bool) -> Self {
        let (first, last) = split_name(full_name);
        let mut lock = Self {
            state: LockState::Unset,
            first,
            last,
            section: section.to_string(),
        };
        lock.state = if locked {
            LockState::Locked
        } else if lock.has_draft() {
            LockState::Recording
        } else {
            LockState::Unset
        };
        lock
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn last(&self) -> &str {
        &self.last
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn full_name(&self) -> String {
        join_name(&self.first, &self.last)
    }

    /// Returns false (and changes nothing) once locked.
    pub fn set_name(&mut self, first: &str, last: &str) -> bool {
        if self.is_locked() {
            return false;
        }
        self.first = first.to_string();
        self.last = last.to_string();
        self.settle_draft();
        true
    }

    pub fn set_section(&mut self, section: &str) -> bool {
        if self.is_locked() {
            return false;
        }
        self.section = section.to_string();
        self.settle_draft();
        true
    }

    /// `Unset/Recording -> Locked`, only with a full name and a known section.
    pub fn record(&mut self, known_sections: &[String]) -> Result<(), Refusal> {
        if self.is_locked() {
            return Err(Refusal::AlreadyLocked);
        }
        let name = self.full_name();
        if name.is_empty() {
            return Err(Refusal::NameMissing);
        }
        if !is_full_name(&name) {
            return Err(Refusal::NameNotFull);
        }
        if self.section.trim().is_empty() {
            return Err(Refusal::SectionMissing);
        }
        if !known_sections.iter().any(|s| s == &self.section) {
            return Err(Refusal::UnknownSection(self.section.clone()));
        }
        self.state = LockState::Locked;
        tracing::info!(section = %self.section, "identity recorded");
        Ok(())
    }

    pub fn session_identity(&self) -> SessionIdentity {
        SessionIdentity {
            first_name: self.first.trim().to_string(),
            last_name: self.last.trim().to_string(),
            section: self.section.clone(),
        }
    }

    fn has_draft(&self) -> bool {
        !self.first.trim().is_empty() || !self.last.trim().is_empty() || !self.section.is_empty()
    }

    fn settle_draft(&mut self) {
        self.state = if self.has_draft() {
            LockState::Recording
        } else {
            LockState::Unset
        };
    }
}

/// Export gate, checked in order: name present, name full, section present, locked.
pub fn check_export_ready(name: &str, section: &str, locked: bool) -> Result<(), Refusal> {
    if name.trim().is_empty() {
        return Err(Refusal::NameMissing);
    }
    if !is_full_name(name) {
        return Err(Refusal::NameNotFull);
    }
    if section.trim().is_empty() {
        return Err(Refusal::SectionMissing);
    }
    if !locked {
        return Err(Refusal::NotLocked);
    }
    Ok(())
}

fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections() -> Vec<String> {
        vec!["010 - 9:30".to_string(), "017 - 11:30".to_string()]
    }

    #[test]
    fn full_name_check() {
        assert!(is_full_name("Jane Doe"));
        assert!(is_full_name("  Mary-Ann  O'Neil Smith "));
        assert!(!is_full_name("Jane"));
        assert!(!is_full_name("J D"));
        assert!(!is_full_name("Jane 42"));
        assert!(!is_full_name(""));
    }

    #[test]
    fn states_move_unset_recording_locked() {
        let mut lock = IdentityLock::new();
        assert_eq!(lock.state(), LockState::Unset);
        lock.set_name("Jane", "");
        assert_eq!(lock.state(), LockState::Recording);
        assert_eq!(lock.record(&sections()), Err(Refusal::NameNotFull));

        lock.set_name("Jane", "Doe");
        assert_eq!(lock.record(&sections()), Err(Refusal::SectionMissing));
        lock.set_section("999 - 8:00");
        assert!(matches!(lock.record(&sections()), Err(Refusal::UnknownSection(_))));

        lock.set_section("010 - 9:30");
        lock.record(&sections()).unwrap();
        assert_eq!(lock.state(), LockState::Locked);
    }

    #[test]
    fn locked_fields_do_not_change() {
        let mut lock = IdentityLock::new();
        lock.set_name("Jane", "Doe");
        lock.set_section("010 - 9:30");
        lock.record(&sections()).unwrap();

        assert!(!lock.set_name("John", "Smith"));
        assert!(!lock.set_section("017 - 11:30"));
        assert_eq!(lock.full_name(), "Jane Doe");
        assert_eq!(lock.section(), "010 - 9:30");
        assert_eq!(lock.record(&sections()), Err(Refusal::AlreadyLocked));
    }

    #[test]
    fn export_gate_names_the_missing_piece() {
        assert_eq!(check_export_ready("", "x", true), Err(Refusal::NameMissing));
        assert_eq!(check_export_ready("Jane", "x", true), Err(Refusal::NameNotFull));
        assert_eq!(check_export_ready("Jane Doe", "", true), Err(Refusal::SectionMissing));
        assert_eq!(check_export_ready("Jane Doe", "010 - 9:30", false), Err(Refusal::NotLocked));
        assert_eq!(check_export_ready("Jane Doe", "010 - 9:30", true), Ok(()));
    }

    #[test]
    fn restored_splits_name() {
        let lock = IdentityLock::restored("Ana de la Cruz", "010 - 9:30", true);
        assert_eq!(lock.first(), "Ana");
        assert_eq!(lock.last(), "de la Cruz");
        assert!(lock.is_locked());
    }
}
