//! Deterministic 64-bit identifier generation.
//!
//! Two modes: content-addressed ids (SHA-256 over salted content, first
//! 8 bytes) for papers and their extracted artifacts, and hierarchical ids
//! (paper/type/sequence bit-packing) for elements addressed by position
//! under a paper. Both stay within `[0, 2^63)` so they fit the signed
//! INTEGER columns of the storage schema.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Clears the sign bit so ids always land in the positive `i64` range.
const ID_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// Number of leading content characters that participate in a paper id.
const PAPER_CONTENT_PREFIX: usize = 1000;

/// Largest sequence value the 16-bit field of a hierarchical id can hold.
pub const MAX_SEQUENCE: u32 = 0xFFFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("sequence {0} exceeds the 16-bit hierarchical id field (max {MAX_SEQUENCE})")]
    SequenceOverflow(u32),
}

/// Element kinds addressable under a paper in a hierarchical id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Section,
    Table,
    Image,
    Reference,
    Citation,
    Author,
    Statistic,
    Finding,
    /// Reserved sentinel for element kinds outside the closed set.
    Other,
}

impl ElementType {
    pub fn code(self) -> u64 {
        match self {
            ElementType::Section => 0x0001,
            ElementType::Table => 0x0002,
            ElementType::Image => 0x0003,
            ElementType::Reference => 0x0004,
            ElementType::Citation => 0x0005,
            ElementType::Author => 0x0006,
            ElementType::Statistic => 0x0007,
            ElementType::Finding => 0x0008,
            ElementType::Other => 0xFFFF,
        }
    }
}

/// Derives a content-addressed id from `content` and `salt`.
///
/// Same inputs always produce the same id; the persistence layer treats an
/// unexpected duplicate key as a conflict rather than assuming the hash
/// space is collision-free.
pub fn content_id(content: &str, salt: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) & ID_MASK) as i64
}

/// Derives the stable paper id from a source locator and the leading
/// content prefix, so re-ingesting identical content reproduces the id.
pub fn paper_id(content: &str, source_file: &str) -> i64 {
    content_id(char_prefix(content, PAPER_CONTENT_PREFIX), source_file)
}

/// Packs `(paper_id, element_type, sequence)` into one 64-bit id:
/// low 32 bits of the paper id in the high half, then a 16-bit type code,
/// then the 16-bit sequence. Ids for different types or sequences under
/// the same paper never collide. Sequences above [`MAX_SEQUENCE`] are
/// rejected instead of wrapping.
pub fn hierarchical_id(
    paper_id: i64,
    element_type: ElementType,
    sequence: u32,
) -> Result<i64, IdentityError> {
    if sequence > MAX_SEQUENCE {
        return Err(IdentityError::SequenceOverflow(sequence));
    }

    let paper_bits = (paper_id as u64) & 0xFFFF_FFFF;
    let packed = (paper_bits << 32) | (element_type.code() << 16) | u64::from(sequence);
    Ok((packed & ID_MASK) as i64)
}

/// First `max_chars` characters of `s`, respecting char boundaries.
pub fn char_prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
