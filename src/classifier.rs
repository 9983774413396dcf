// ⚖️ Change Classifier - NEW company or existing company that changed?
//
// NAME mode:    same IPO date AND (same phone OR same web url)
// CONTACT mode: NAME mode predicate OR (same name AND same IPO date)
//
// Missing values never match. When several registry rows satisfy the
// predicate, the first one in snapshot order wins and the tie is reported.

use crate::error::ReconcileError;
use crate::records::{optional_eq, CandidateRecord, ClassifiedRecord, RegistryRow, Status};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

// ============================================================================
// CLASSIFY MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifyMode {
    Name,
    Contact,
}

impl ClassifyMode {
    /// Status given to a candidate that matched an existing company
    pub fn changed_status(&self) -> Status {
        match self {
            ClassifyMode::Name => Status::NameChanged,
            ClassifyMode::Contact => Status::ContactChanged,
        }
    }
}

/// Does `row` describe the same company as `candidate` under `mode`?
pub fn matches_predicate(row: &RegistryRow, candidate: &CandidateRecord, mode: ClassifyMode) -> bool {
    let same_ipo = optional_eq(&row.ipo_date, &candidate.ipo_date);
    let same_contact = optional_eq(&row.phone, &candidate.phone)
        || optional_eq(&row.web_url, &candidate.web_url);

    match mode {
        ClassifyMode::Name => same_ipo && same_contact,
        ClassifyMode::Contact => {
            let same_name = row.name.as_deref() == Some(candidate.name.as_str());
            (same_ipo && same_contact) || (same_name && same_ipo)
        }
    }
}

// ============================================================================
// REGISTRY INDEX
// ============================================================================

/// Registry positions grouped by IPO date.
///
/// Both predicates require an equal IPO date, so only rows sharing the
/// candidate's date are ever inspected. Positions are kept ascending, which
/// preserves the snapshot-order tie-break.
#[derive(Debug, Default)]
pub struct RegistryIndex {
    by_ipo_date: HashMap<NaiveDate, Vec<usize>>,
}

impl RegistryIndex {
    pub fn build(registry: &[RegistryRow]) -> Self {
        let mut by_ipo_date: HashMap<NaiveDate, Vec<usize>> = HashMap::new();
        for (position, row) in registry.iter().enumerate() {
            if let Some(ipo_date) = row.ipo_date {
                by_ipo_date.entry(ipo_date).or_default().push(position);
            }
        }
        RegistryIndex { by_ipo_date }
    }

    /// Company ids of every row matching `candidate`, in snapshot order
    pub fn matching_ids(
        &self,
        registry: &[RegistryRow],
        candidate: &CandidateRecord,
        mode: ClassifyMode,
    ) -> Vec<i64> {
        let Some(ipo_date) = candidate.ipo_date else {
            return Vec::new();
        };

        self.by_ipo_date
            .get(&ipo_date)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&p| &registry[p])
                    .filter(|row| matches_predicate(row, candidate, mode))
                    .map(|row| row.company_id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// A candidate that matched more than one registry row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousMatch {
    pub candidate_name: String,
    pub mode: ClassifyMode,
    pub matching_ids: Vec<i64>,
    pub adopted_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Brand-new companies, no id yet
    pub new: Vec<ClassifiedRecord>,

    /// Existing companies, id recovered from the registry
    pub changed: Vec<ClassifiedRecord>,

    pub ambiguous: Vec<AmbiguousMatch>,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Split novel candidates into NEW and changed records.
///
/// Candidates are matched in parallel against the read-only snapshot; the
/// result keeps input order within each bucket.
pub fn classify(
    candidates: &[CandidateRecord],
    registry: &[RegistryRow],
    mode: ClassifyMode,
) -> Result<Classification, ReconcileError> {
    if let Some(index) = candidates.iter().position(|c| !c.has_name()) {
        return Err(ReconcileError::MalformedCandidate { index });
    }

    let index = RegistryIndex::build(registry);

    let matches: Vec<Vec<i64>> = candidates
        .par_iter()
        .map(|candidate| index.matching_ids(registry, candidate, mode))
        .collect();

    let mut result = Classification::default();

    for (candidate, ids) in candidates.iter().zip(matches) {
        match ids.first().copied() {
            None => result.new.push(ClassifiedRecord::new_company(candidate.clone())),
            Some(adopted_id) => {
                if ids.len() > 1 {
                    warn!(
                        candidate = %candidate.name,
                        mode = ?mode,
                        matches = ?ids,
                        adopted_id,
                        "candidate matches several registry rows, keeping the first"
                    );
                    result.ambiguous.push(AmbiguousMatch {
                        candidate_name: candidate.name.clone(),
                        mode,
                        matching_ids: ids.clone(),
                        adopted_id,
                    });
                }
                result.changed.push(ClassifiedRecord::changed(
                    candidate.clone(),
                    adopted_id,
                    mode.changed_status(),
                ));
            }
        }
    }

    debug!(
        mode = ?mode,
        candidates = candidates.len(),
        new = result.new.len(),
        changed = result.changed.len(),
        "classification done"
    );

    Ok(result)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn create_test_row(
        id: i64,
        name: &str,
        company: Option<&str>,
        phone: Option<&str>,
        ipo: &str,
    ) -> RegistryRow {
        let mut row = RegistryRow::new(id);
        row.name = Some(name.to_string());
        row.logo = company.map(|c| format!("https://static.finnhub.io/logo/{}", c));
        row.web_url = company.map(|c| format!("https://{}.com/", c));
        row.phone = phone.map(str::to_string);
        row.ipo_date = Some(date(ipo));
        row
    }

    /// Registry used throughout: five companies, Comp D without contact data
    fn registry() -> Vec<RegistryRow> {
        vec![
            create_test_row(1, "COMP A", Some("comp_a"), Some("123456789"), "2018-05-03"),
            create_test_row(2, "COMP B", Some("comp_b"), Some("234567891"), "2007-10-26"),
            create_test_row(3, "COMP C", Some("comp_c"), Some("3456789012"), "1998-12-08"),
            create_test_row(4, "Comp D", None, None, "1995-05-15"),
            create_test_row(5, "Comp E", Some("comp_e"), Some("4567890123"), "2012-04-27"),
        ]
    }

    fn candidate(name: &str, company: Option<&str>, phone: Option<&str>, ipo: &str) -> CandidateRecord {
        let mut c = CandidateRecord::new(name).with_ipo_date(date(ipo));
        if let Some(company) = company {
            c = c
                .with_logo(format!("https://static.finnhub.io/logo/{}", company))
                .with_web_url(format!("https://{}.com/", company));
        }
        if let Some(phone) = phone {
            c = c.with_phone(phone);
        }
        c
    }

    #[test]
    fn test_empty_batch() {
        let result = classify(&[], &registry(), ClassifyMode::Name).unwrap();
        assert!(result.new.is_empty());
        assert!(result.changed.is_empty());
    }

    #[test]
    fn test_name_and_phone_changed() {
        let c = candidate("COMP B NEW", Some("comp_b"), Some("234567891_new"), "2007-10-26");

        let result = classify(&[c], &registry(), ClassifyMode::Name).unwrap();

        assert_eq!(result.new.len(), 0);
        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.changed[0].company_id, Some(2));
        assert_eq!(result.changed[0].status, Status::NameChanged);
    }

    #[test]
    fn test_same_phone_different_url_adopts_id() {
        let c = CandidateRecord::new("COMP B")
            .with_phone("234567891")
            .with_web_url("https://different.example/")
            .with_ipo_date(date("2007-10-26"));

        let result = classify(&[c], &registry(), ClassifyMode::Name).unwrap();

        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.changed[0].company_id, Some(2));
    }

    #[test]
    fn test_name_and_url_changed() {
        let c = candidate("COMP C NEW", Some("comp_c_new"), Some("3456789012"), "1998-12-08");

        let result = classify(&[c], &registry(), ClassifyMode::Name).unwrap();

        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.changed[0].company_id, Some(3));
    }

    #[test]
    fn test_missing_contact_never_matches() {
        // Comp D has no phone and no url on file; a candidate also lacking
        // both cannot be tied to it.
        let c = candidate("COMP D NEW", None, None, "1995-05-15");

        let result = classify(&[c], &registry(), ClassifyMode::Name).unwrap();

        assert_eq!(result.new.len(), 1);
        assert_eq!(result.changed.len(), 0);
        assert_eq!(result.new[0].company_id, None);
    }

    #[test]
    fn test_only_name_changed() {
        let c = candidate("COMP E NEW", Some("comp_e"), Some("4567890123"), "2012-04-27");

        let result = classify(&[c], &registry(), ClassifyMode::Name).unwrap();

        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.changed[0].company_id, Some(5));
    }

    #[test]
    fn test_totally_new_company() {
        let c = candidate("COMP F", Some("comp_f"), Some("5678901234"), "2020-08-27");

        let result = classify(&[c], &registry(), ClassifyMode::Name).unwrap();

        assert_eq!(result.new.len(), 1);
        assert_eq!(result.new[0].status, Status::New);
        assert_eq!(result.new[0].company_id, None);
    }

    #[test]
    fn test_same_contact_different_ipo_is_new() {
        let c = candidate("COMP A", Some("comp_a"), Some("123456789"), "2019-01-01");
        let result = classify(&[c], &registry(), ClassifyMode::Name).unwrap();
        assert_eq!(result.new.len(), 1);
    }

    #[test]
    fn test_empty_registry_everything_new() {
        let batch = vec![
            candidate("COMP F", Some("comp_f"), Some("5678901234"), "2020-08-27"),
            candidate("COMP G", None, None, "2020-08-27"),
        ];

        let result = classify(&batch, &[], ClassifyMode::Contact).unwrap();

        assert_eq!(result.new.len(), 2);
        assert!(result.changed.is_empty());
    }

    #[test]
    fn test_candidate_without_ipo_is_new() {
        let c = CandidateRecord::new("COMP A").with_phone("123456789");
        let result = classify(&[c], &registry(), ClassifyMode::Contact).unwrap();
        assert_eq!(result.new.len(), 1);
    }

    #[test]
    fn test_contact_mode_matches_on_name_and_ipo() {
        // Every contact attribute changed, name and IPO date unchanged
        let c = candidate("Comp D", Some("comp_d"), Some("0000000000"), "1995-05-15");

        let name_mode = classify(&[c.clone()], &registry(), ClassifyMode::Name).unwrap();
        assert_eq!(name_mode.new.len(), 1);

        let contact_mode = classify(&[c], &registry(), ClassifyMode::Contact).unwrap();
        assert_eq!(contact_mode.changed.len(), 1);
        assert_eq!(contact_mode.changed[0].company_id, Some(4));
        assert_eq!(contact_mode.changed[0].status, Status::ContactChanged);
    }

    #[test]
    fn test_contact_mode_name_needs_same_ipo() {
        let c = candidate("Comp D", Some("comp_d"), Some("0000000000"), "1996-05-15");
        let result = classify(&[c], &registry(), ClassifyMode::Contact).unwrap();
        assert_eq!(result.new.len(), 1);
    }

    #[test]
    fn test_ambiguous_match_takes_first_row() {
        let mut rows = registry();
        // Dirty registry: company 7 duplicates company 2's IPO date and phone
        rows.push(create_test_row(7, "COMP B DUP", Some("comp_b_dup"), Some("234567891"), "2007-10-26"));

        let c = candidate("COMP B RENAMED", Some("comp_b_other"), Some("234567891"), "2007-10-26");
        let result = classify(&[c], &rows, ClassifyMode::Name).unwrap();

        assert_eq!(result.changed[0].company_id, Some(2));
        assert_eq!(result.ambiguous.len(), 1);
        assert_eq!(result.ambiguous[0].matching_ids, vec![2, 7]);
        assert_eq!(result.ambiguous[0].adopted_id, 2);
    }

    #[test]
    fn test_tie_break_follows_snapshot_order_not_id() {
        let rows = vec![
            create_test_row(9, "LATE", Some("shared"), None, "2001-01-01"),
            create_test_row(3, "EARLY", Some("shared"), None, "2001-01-01"),
        ];
        let c = candidate("SHARED CO", Some("shared"), None, "2001-01-01");

        let result = classify(&[c], &rows, ClassifyMode::Name).unwrap();

        assert_eq!(result.changed[0].company_id, Some(9));
    }

    #[test]
    fn test_blank_name_rejected() {
        let batch = vec![
            candidate("COMP F", None, None, "2020-08-27"),
            candidate("  ", None, None, "2020-08-27"),
        ];

        let err = classify(&batch, &registry(), ClassifyMode::Name).unwrap_err();
        assert_eq!(err, ReconcileError::MalformedCandidate { index: 1 });
    }

    #[test]
    fn test_output_keeps_input_order() {
        let batch: Vec<CandidateRecord> = (0..200)
            .map(|i| candidate(&format!("CO {}", i), None, Some(&format!("{}", i)), "2020-01-01"))
            .collect();

        let result = classify(&batch, &registry(), ClassifyMode::Name).unwrap();

        let names: Vec<String> = result.new.iter().map(|r| r.record.name.clone()).collect();
        let expected: Vec<String> = (0..200).map(|i| format!("CO {}", i)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_index_agrees_with_full_scan() {
        let rows = registry();
        let index = RegistryIndex::build(&rows);
        let probes = vec![
            candidate("COMP B NEW", Some("comp_b"), Some("x"), "2007-10-26"),
            candidate("Comp D", None, None, "1995-05-15"),
            candidate("COMP Z", None, None, "1980-01-01"),
        ];

        for mode in [ClassifyMode::Name, ClassifyMode::Contact] {
            for probe in &probes {
                let scanned: Vec<i64> = rows
                    .iter()
                    .filter(|r| matches_predicate(r, probe, mode))
                    .map(|r| r.company_id)
                    .collect();
                assert_eq!(index.matching_ids(&rows, probe, mode), scanned);
            }
        }
    }
}
