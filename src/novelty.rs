// 🔍 Novelty Filter - Drop candidates the registry already knows
// Left-anti-join of the batch against the snapshot under one key.

use crate::records::{CandidateRecord, ContactKey, RegistryRow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// KEY SPEC
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySpec {
    /// Known if some registry row carries the exact same name
    Name,

    /// Known if some registry row carries the exact same (phone, web_url, logo)
    Contact,
}

// ============================================================================
// FILTER
// ============================================================================

/// Keep the candidates that have no match in the registry under `key`.
///
/// Input order is preserved. When the registry is empty (first run) the
/// `description_date` of every kept candidate is cleared.
pub fn find_novel(
    candidates: &[CandidateRecord],
    registry: &[RegistryRow],
    key: KeySpec,
) -> Vec<CandidateRecord> {
    let mut novel: Vec<CandidateRecord> = match key {
        KeySpec::Name => {
            let known: HashSet<&str> = registry
                .iter()
                .filter_map(|row| row.name.as_deref())
                .collect();

            candidates
                .iter()
                .filter(|c| !known.contains(c.name.as_str()))
                .cloned()
                .collect()
        }
        KeySpec::Contact => {
            // Whole tuple compared, so a missing field only lines up with a
            // missing field in the same column of the same row.
            let known: HashSet<ContactKey<'_>> =
                registry.iter().map(RegistryRow::contact_key).collect();

            candidates
                .iter()
                .filter(|c| !known.contains(&c.contact_key()))
                .cloned()
                .collect()
        }
    };

    if registry.is_empty() {
        for candidate in &mut novel {
            candidate.description_date = None;
        }
    }

    novel
}

// ============================================================================
// TESTS
// ============================================================================
