use thiserror::Error;

/// A precondition the student has to fix before identity can be recorded or an
/// export can run. `Display` is the message shown to the student.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("To download, go to 2. Welcome and enter your full name.")]
    NameMissing,
    #[error("To download, go to 2. Welcome and enter your first and last name.")]
    NameNotFull,
    #[error("To download, go to 2. Welcome and select your section.")]
    SectionMissing,
    #[error("Section \"{0}\" is not one of the course sections.")]
    UnknownSection(String),
    #[error("To download, go to 2. Welcome and click \"Record Name & Section\" to lock your identity.")]
    NotLocked,
    #[error("Name and section are already recorded for this session.")]
    AlreadyLocked,
}

impl Refusal {
    pub fn code(&self) -> &'static str {
        match self {
            Refusal::NameMissing => "name_missing",
            Refusal::NameNotFull => "name_not_full",
            Refusal::SectionMissing => "section_missing",
            Refusal::UnknownSection(_) => "section_unknown",
            Refusal::NotLocked => "not_locked",
            Refusal::AlreadyLocked => "already_locked",
        }
    }
}

#[derive(Debug, Error)]
pub enum KitError {
    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("section {expected} is not active (active slide: {active})")]
    SectionNotActive {
        expected: &'static str,
        active: String,
    },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("row not found: {0}")]
    RowNotFound(String),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error(transparent)]
    Refused(#[from] Refusal),

    #[error("export failed: {0}")]
    Export(String),
}

pub type KitResult<T> = Result<T, KitError>;
