use serde::{Deserialize, Serialize};

use crate::error::{KitError, KitResult};

pub const KEY: &str = "propose";

pub const WORKSHOP_OPTIONS: [&str; 3] = [
    "Use a unique reference so rows always point to a valid instructor",
    "Prevent misattributing rows to the wrong instructor when names/emails are similar",
    "Keep one source of truth for instructors to avoid stale values",
];

pub const REGISTRATION_OPTIONS: [&str; 3] = [
    "Use a unique reference so rows always point to a valid participant",
    "Prevent misattributing rows to the wrong participant when names/emails are similar",
    "Keep one source of truth for participants to avoid stale values",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposeGroup {
    Workshops,
    Registrations,
}

impl ProposeGroup {
    pub fn parse(s: &str) -> KitResult<Self> {
        match s {
            "workshops" => Ok(ProposeGroup::Workshops),
            "registrations" => Ok(ProposeGroup::Registrations),
            other => Err(KitError::UnknownTable(other.to_string())),
        }
    }

    pub fn options(self) -> &'static [&'static str] {
        match self {
            ProposeGroup::Workshops => &WORKSHOP_OPTIONS,
            ProposeGroup::Registrations => &REGISTRATION_OPTIONS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposeState {
    pub workshops: Vec<String>,
    pub registrations: Vec<String>,
    /// `workshops` followed by `registrations`.
    pub solutions: Vec<String>,
}

impl ProposeState {
    /// Flip `option` in `group`. Returns whether it is now selected.
    pub fn toggle(&mut self, group: ProposeGroup, option: &str) -> KitResult<bool> {
        if !group.options().iter().any(|o| *o == option) {
            return Err(KitError::UnknownOption(option.to_string()));
        }
        let picked = match group {
            ProposeGroup::Workshops => &mut self.workshops,
            ProposeGroup::Registrations => &mut self.registrations,
        };
        let selected = match picked.iter().position(|p| p == option) {
            Some(i) => {
                picked.remove(i);
                false
            }
            None => {
                picked.push(option.to_string());
                true
            }
        };
        self.refresh_solutions();
        Ok(selected)
    }

    pub fn refresh_solutions(&mut self) {
        self.solutions = self
            .workshops
            .iter()
            .chain(&self.registrations)
            .cloned()
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_keeps_solutions_in_group_order() {
        let mut s = ProposeState::default();
        assert!(s.toggle(ProposeGroup::Registrations, REGISTRATION_OPTIONS[2]).unwrap());
        assert!(s.toggle(ProposeGroup::Workshops, WORKSHOP_OPTIONS[1]).unwrap());
        assert_eq!(s.solutions, vec![WORKSHOP_OPTIONS[1], REGISTRATION_OPTIONS[2]]);

        assert!(!s.toggle(ProposeGroup::Workshops, WORKSHOP_OPTIONS[1]).unwrap());
        assert_eq!(s.solutions, vec![REGISTRATION_OPTIONS[2]]);
    }

    #[test]
    fn options_are_scoped_to_their_group() {
        let mut s = ProposeState::default();
        let err = s.toggle(ProposeGroup::Workshops, REGISTRATION_OPTIONS[0]);
        assert!(matches!(err, Err(KitError::UnknownOption(_))));
        assert!(s.solutions.is_empty());
    }
}
