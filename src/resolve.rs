//! Duplicate detection and the overwrite decision protocol.
//!
//! A freshly extracted paper is matched against the store by DOI first,
//! then by exact title. On a match the stored paper's id is propagated
//! onto the incoming record: the freshly computed content id can differ
//! when the document changed, and overwrite operations must target the
//! stored id.

use rusqlite::Connection;
use tracing::info;

use crate::model::{OverwriteSet, PaperRecord};
use crate::store::{self, StoreResult};

/// Terminal decision for one ingestion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateDecision {
    /// No stored paper matches; ingest every entity kind.
    NotFound,
    /// A match exists and every stored entity kind stays untouched.
    FoundKeepAll { existing_id: i64 },
    /// A match exists and the selected kinds are replaced.
    FoundSelectiveOverwrite {
        existing_id: i64,
        kinds: OverwriteSet,
    },
}

/// Operator intent for a matched paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteChoice {
    KeepAll,
    Overwrite(OverwriteSet),
}

/// Supplies the overwrite decision when a duplicate is found. The
/// interaction layer (CLI flags, an API parameter) implements this.
pub trait OverwritePolicy {
    fn decide(&self, existing: &PaperRecord, incoming: &PaperRecord) -> OverwriteChoice;
}

/// Default policy: keep everything already stored.
pub struct KeepExisting;

impl OverwritePolicy for KeepExisting {
    fn decide(&self, _existing: &PaperRecord, _incoming: &PaperRecord) -> OverwriteChoice {
        OverwriteChoice::KeepAll
    }
}

/// Policy with a predetermined kind set, as built from CLI flags.
pub struct FixedOverwrite(pub OverwriteSet);

impl OverwritePolicy for FixedOverwrite {
    fn decide(&self, _existing: &PaperRecord, _incoming: &PaperRecord) -> OverwriteChoice {
        if self.0.is_empty() {
            OverwriteChoice::KeepAll
        } else {
            OverwriteChoice::Overwrite(self.0)
        }
    }
}

/// Matches `incoming` against the store and, when a duplicate exists,
/// collects the overwrite decision. On a match `incoming.id` is rewritten
/// to the stored id.
pub fn resolve(
    connection: &Connection,
    incoming: &mut PaperRecord,
    policy: &dyn OverwritePolicy,
) -> StoreResult<DuplicateDecision> {
    let Some(existing) = find_match(connection, incoming)? else {
        return Ok(DuplicateDecision::NotFound);
    };

    info!(
        existing_id = existing.id,
        fresh_id = incoming.id,
        title = %existing.title,
        "paper already stored"
    );
    incoming.id = existing.id;

    match policy.decide(&existing, incoming) {
        OverwriteChoice::KeepAll => Ok(DuplicateDecision::FoundKeepAll {
            existing_id: existing.id,
        }),
        OverwriteChoice::Overwrite(kinds) if kinds.is_empty() => {
            Ok(DuplicateDecision::FoundKeepAll {
                existing_id: existing.id,
            })
        }
        OverwriteChoice::Overwrite(kinds) => Ok(DuplicateDecision::FoundSelectiveOverwrite {
            existing_id: existing.id,
            kinds,
        }),
    }
}

/// DOI match wins; the title is only consulted when no DOI match exists.
/// Title matching is exact and case-sensitive.
fn find_match(
    connection: &Connection,
    incoming: &PaperRecord,
) -> StoreResult<Option<PaperRecord>> {
    if let Some(doi) = incoming.doi.as_deref() {
        if store::papers::exists_by_doi(connection, doi)? {
            return store::papers::find_by_doi(connection, doi);
        }
    }

    if store::papers::exists_by_title(connection, &incoming.title)? {
        return store::papers::find_by_title(connection, &incoming.title);
    }

    Ok(None)
}
