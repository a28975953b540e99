//! Document id: a short hash over the answers, identity, salt and time.
//! Tamper evidence only; anyone holding the salt can recompute it.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::HashAlgorithm;
use crate::record::Record;
use crate::sections::analyze::AnalyzeState;

pub const DOC_ID_LEN: usize = 12;

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 31-multiplier rolling hash over UTF-16 units with 32-bit wraparound,
/// absolute value in hex, zero-padded to 8.
pub fn fallback_hash(input: &str) -> String {
    let h = input
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    format!("{:08x}", h.unsigned_abs())
}

#[derive(Debug, Serialize)]
struct ApplyKeys<'a> {
    #[serde(rename = "attendeePK")]
    attendee_pk: &'a str,
    #[serde(rename = "workshopPK")]
    workshop_pk: &'a str,
    #[serde(rename = "regPK")]
    reg_pk: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Answers<'a> {
    analyze: &'a AnalyzeState,
    propose: &'a [String],
    apply: ApplyKeys<'a>,
    m2m_count: usize,
}

#[derive(Debug, Serialize)]
struct VerifySource<'a> {
    name: &'a str,
    section: &'a str,
    time: &'a str,
    salt: &'a str,
    answers: Answers<'a>,
}

/// Canonical string hashed into the document id. Field order is fixed.
pub fn verify_source(record: &Record, salt: &str, time: &str) -> String {
    let s = &record.apply.summaries;
    let source = VerifySource {
        name: &record.meta.student_name,
        section: &record.meta.class_section,
        time,
        salt,
        answers: Answers {
            analyze: &record.analyze,
            propose: &record.propose.solutions,
            apply: ApplyKeys {
                attendee_pk: &s.attendee_pk,
                workshop_pk: &s.workshop_pk,
                reg_pk: &s.reg_pk,
            },
            m2m_count: record.m2m.tables.len(),
        },
    };
    serde_json::to_string(&source).unwrap_or_default()
}

pub fn doc_id(source: &str, algorithm: HashAlgorithm) -> String {
    let digest = match algorithm {
        HashAlgorithm::Sha256 => sha256_hex(source),
        HashAlgorithm::Fallback => fallback_hash(source),
    };
    digest.chars().take(DOC_ID_LEN).collect()
}
