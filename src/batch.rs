// 📂 Batch Reader - company_profile2_<start>_<end>.csv → CandidateRecord
//
// The exporter writes the profile dump in slices of a few hundred companies,
// one CSV per slice, all with the same columns. Every slice in the folder is
// read, rows without a name are dropped and the first occurrence of each
// name wins.

use crate::records::CandidateRecord;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const BATCH_FILE_PATTERN: &str = r"^company_profile2_[0-9]*_[0-9]*\.csv$";

// ============================================================================
// RAW ROW
// ============================================================================

/// One CSV row as exported; unknown columns are ignored
#[derive(Debug, Deserialize)]
struct RawProfile {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    weburl: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    ipo: Option<String>,
    #[serde(default)]
    date_description: Option<String>,
}

/// Trim, and treat an empty cell as missing
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse date from string (supports YYYY-MM-DD and MM/DD/YYYY)
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();

    if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(date_str, "%m/%d/%Y") {
        return Some(date);
    }

    // Timestamps written by a previous export, e.g. "2021-06-01 00:00:00"
    date_str
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

// ============================================================================
// BATCH
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub files: Vec<String>,
    pub rows_loaded: usize,
    pub missing_ticker: usize,
    pub missing_name: usize,
    pub duplicate_names: usize,
    pub rows_kept: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub records: Vec<CandidateRecord>,
    pub summary: BatchSummary,
}

/// Batch files in `dir`, sorted by file name
pub fn list_batch_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = Regex::new(BATCH_FILE_PATTERN).context("Invalid batch file pattern")?;

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read batch directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| pattern.is_match(n))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Read every batch file in `dir` into deduplicated candidates.
///
/// Rows without a `date_description` are stamped with `processing_date`.
pub fn read_batch(dir: &Path, processing_date: NaiveDate) -> Result<Batch> {
    let files = list_batch_files(dir)?;
    if files.is_empty() {
        info!(dir = %dir.display(), "no batch files found");
    }

    let mut batch = Batch::default();
    let mut seen: HashSet<String> = HashSet::new();

    for path in &files {
        let loaded = load_file(path, processing_date, &mut batch.summary)?;
        debug!(file = %path.display(), rows = loaded.len(), "loaded batch file");

        for record in loaded {
            if seen.insert(record.name.clone()) {
                batch.records.push(record);
            } else {
                batch.summary.duplicate_names += 1;
            }
        }

        batch
            .summary
            .files
            .push(path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string());
    }

    batch.summary.rows_kept = batch.records.len();

    info!(
        files = batch.summary.files.len(),
        loaded = batch.summary.rows_loaded,
        kept = batch.summary.rows_kept,
        duplicates = batch.summary.duplicate_names,
        "batch read"
    );

    Ok(batch)
}

fn load_file(
    path: &Path,
    processing_date: NaiveDate,
    summary: &mut BatchSummary,
) -> Result<Vec<CandidateRecord>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open batch file {}", path.display()))?;
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let has_ticker = headers.iter().any(|h| h == "ticker");

    let mut records = Vec::new();

    for result in rdr.records() {
        let row = result.with_context(|| format!("Failed to read row in {}", path.display()))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let raw: RawProfile = row
            .deserialize(Some(&headers))
            .with_context(|| format!("{}:{}: malformed profile row", path.display(), line))?;

        summary.rows_loaded += 1;

        if has_ticker && clean(raw.ticker).is_none() {
            summary.missing_ticker += 1;
            continue;
        }

        let Some(name) = clean(raw.name) else {
            summary.missing_name += 1;
            continue;
        };

        let ipo_date = match clean(raw.ipo) {
            Some(s) => match parse_date(&s) {
                Some(d) => Some(d),
                None => bail!("{}:{}: cannot parse ipo date '{}'", path.display(), line, s),
            },
            None => None,
        };

        let description_date = match clean(raw.date_description) {
            Some(s) => match parse_date(&s) {
                Some(d) => d,
                None => bail!("{}:{}: cannot parse description date '{}'", path.display(), line, s),
            },
            None => processing_date,
        };

        records.push(CandidateRecord {
            name,
            logo: clean(raw.logo),
            web_url: clean(raw.weburl),
            phone: clean(raw.phone),
            ipo_date,
            description_date: Some(description_date),
        });
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "ticker,name,logo,weburl,phone,ipo,exchange\n";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn write(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn test_list_only_matching_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "company_profile2_500_999.csv", HEADER);
        write(tmp.path(), "company_profile2_0_499.csv", HEADER);
        write(tmp.path(), "company_profile2_0_499.csv.bak", HEADER);
        write(tmp.path(), "company_profile_0_499.csv", HEADER);
        write(tmp.path(), "notes.txt", "");

        let files = list_batch_files(tmp.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["company_profile2_0_499.csv", "company_profile2_500_999.csv"]);
    }

    #[test]
    fn test_read_batch_cleans_and_dedups() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "company_profile2_0_499.csv",
            &format!(
                "{}{}{}{}{}",
                HEADER,
                "AAA,COMP A,https://static.finnhub.io/logo/comp_a,https://comp_a.com/,123456789,2018-05-03,NYSE\n",
                ",COMP X,,,,,NYSE\n",
                "BBB,,,,,,NYSE\n",
                "DDD,Comp D,,,,1995-05-15,NASDAQ\n",
            ),
        );
        write(
            tmp.path(),
            "company_profile2_500_999.csv",
            &format!(
                "{}{}",
                HEADER, "AAA2,COMP A,https://other.example/logo,https://other.example/,1,2001-01-01,NYSE\n",
            ),
        );

        let batch = read_batch(tmp.path(), date("2021-06-01")).unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.summary.rows_loaded, 5);
        assert_eq!(batch.summary.missing_ticker, 1);
        assert_eq!(batch.summary.missing_name, 1);
        assert_eq!(batch.summary.duplicate_names, 1);
        assert_eq!(batch.summary.rows_kept, 2);

        let comp_a = &batch.records[0];
        assert_eq!(comp_a.name, "COMP A");
        assert_eq!(comp_a.web_url.as_deref(), Some("https://comp_a.com/"));
        assert_eq!(comp_a.ipo_date, Some(date("2018-05-03")));
        assert_eq!(comp_a.description_date, Some(date("2021-06-01")));

        let comp_d = &batch.records[1];
        assert_eq!(comp_d.phone, None);
        assert_eq!(comp_d.web_url, None);
        assert_eq!(comp_d.logo, None);
    }

    #[test]
    fn test_stamped_date_kept() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "company_profile2_0_9.csv",
            "name,logo,weburl,phone,ipo,date_description\nCOMP F,,,555,2020-08-27,2021-03-15\n",
        );

        let batch = read_batch(tmp.path(), date("2021-06-01")).unwrap();

        assert_eq!(batch.records[0].description_date, Some(date("2021-03-15")));
    }

    #[test]
    fn test_bad_ipo_date_fails_with_location() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "company_profile2_0_9.csv",
            "name,logo,weburl,phone,ipo\nCOMP F,,,555,not-a-date\n",
        );

        let err = read_batch(tmp.path(), date("2021-06-01")).unwrap_err();
        let message = format!("{:#}", err);

        assert!(message.contains("company_profile2_0_9.csv:2"));
        assert!(message.contains("not-a-date"));
    }

    #[test]
    fn test_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let batch = read_batch(tmp.path(), date("2021-06-01")).unwrap();
        assert!(batch.records.is_empty());
        assert!(batch.summary.files.is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2018-05-03"), Some(date("2018-05-03")));
        assert_eq!(parse_date("05/03/2018"), Some(date("2018-05-03")));
        assert_eq!(parse_date("2018-05-03 00:00:00"), Some(date("2018-05-03")));
        assert_eq!(parse_date("soon"), None);
    }
}
