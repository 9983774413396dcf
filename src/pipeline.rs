// 🔄 Reconciliation Pass - filter → classify → allocate → format
//
// A pass runs under one key: the name pass looks for renamed companies, the
// contact pass for companies whose contact details changed. The two passes
// are independent; the caller decides when each one's tables are written.

use crate::allocator::IdentifierAllocator;
use crate::classifier::{classify, AmbiguousMatch, ClassifyMode};
use crate::error::ReconcileError;
use crate::formatter::{format_tables, RegistryTables};
use crate::novelty::{find_novel, KeySpec};
use crate::records::{CandidateRecord, ClassifiedRecord, RegistryRow};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// PASS KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Name,
    Contact,
}

impl PassKind {
    pub fn key(&self) -> KeySpec {
        match self {
            PassKind::Name => KeySpec::Name,
            PassKind::Contact => KeySpec::Contact,
        }
    }

    pub fn mode(&self) -> ClassifyMode {
        match self {
            PassKind::Name => ClassifyMode::Name,
            PassKind::Contact => ClassifyMode::Contact,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::Name => "name",
            PassKind::Contact => "contact",
        }
    }
}

// ============================================================================
// PASS REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub kind: PassKind,
    pub candidates: usize,
    pub discarded: usize,
    pub new: usize,
    pub changed: usize,
    pub ambiguous: usize,

    /// Registry was empty: dates were cleared, ids start at 1
    pub first_run: bool,
}

impl PassReport {
    pub fn summary(&self) -> String {
        format!(
            "{} pass: {} candidates, {} already known, {} new, {} changed ({} ambiguous){}",
            self.kind.as_str(),
            self.candidates,
            self.discarded,
            self.new,
            self.changed,
            self.ambiguous,
            if self.first_run { ", first run" } else { "" }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassOutcome {
    pub report: PassReport,
    pub new: Vec<ClassifiedRecord>,
    pub changed: Vec<ClassifiedRecord>,
    pub ambiguous: Vec<AmbiguousMatch>,
    pub tables: RegistryTables,
}

// ============================================================================
// RUN
// ============================================================================

/// Reconcile one batch against one registry snapshot under `kind`.
///
/// Pure: same inputs, same output. Nothing is written.
pub fn run_pass(
    candidates: &[CandidateRecord],
    registry: &[RegistryRow],
    kind: PassKind,
) -> Result<PassOutcome, ReconcileError> {
    if let Some(index) = candidates.iter().position(|c| !c.has_name()) {
        return Err(ReconcileError::MalformedCandidate { index });
    }

    let first_run = registry.is_empty();
    if first_run {
        info!(pass = kind.as_str(), "registry is empty, treating batch as first load");
    }

    let novel = find_novel(candidates, registry, kind.key());
    let classification = classify(&novel, registry, kind.mode())?;

    let mut allocator = IdentifierAllocator::from_registry(registry);
    let new = allocator.allocate(classification.new);
    let changed = classification.changed;

    let tables = format_tables(&new, &changed)?;

    let report = PassReport {
        kind,
        candidates: candidates.len(),
        discarded: candidates.len() - novel.len(),
        new: new.len(),
        changed: changed.len(),
        ambiguous: classification.ambiguous.len(),
        first_run,
    };

    info!(
        pass = kind.as_str(),
        candidates = report.candidates,
        discarded = report.discarded,
        new = report.new,
        changed = report.changed,
        ambiguous = report.ambiguous,
        "reconciliation pass complete"
    );

    Ok(PassOutcome {
        report,
        new,
        changed,
        ambiguous: classification.ambiguous,
        tables,
    })
}

// ============================================================================
// TESTS
// ============================================================================
