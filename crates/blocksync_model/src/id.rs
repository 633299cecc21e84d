//! Remote id normalization.

use crate::error::{ModelError, ModelResult};
use uuid::Uuid;

/// Normalizes a remote id to its dashed lowercase form.
///
/// Accepts dashed ids, 32-character hex ids, and document URLs whose
/// last path segment ends in an id (`.../Some-Title-0123...cdef?pvs=4`).
pub fn normalize_id(input: &str) -> ModelResult<String> {
    let trimmed = input.trim();
    let without_query = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    let segment = without_query.rsplit('/').next().unwrap_or(without_query);

    if let Ok(uuid) = Uuid::parse_str(segment) {
        return Ok(uuid.hyphenated().to_string());
    }

    if segment.len() >= 32 {
        let split = segment.len() - 32;
        if segment.is_char_boundary(split) {
            let tail = &segment[split..];
            if tail.chars().all(|c| c.is_ascii_hexdigit()) {
                if let Ok(uuid) = Uuid::parse_str(tail) {
                    return Ok(uuid.hyphenated().to_string());
                }
            }
        }
    }

    Err(ModelError::InvalidId(input.to_string()))
}

/// Returns the id without dashes, lowercased, for comparisons.
pub fn compact_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
