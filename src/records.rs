// 🏢 Company Records - Shapes shared by every reconciliation stage
//
// CandidateRecord = one row from the incoming batch
// RegistryRow     = one company from the flattened registry snapshot
// ClassifiedRecord = candidate + decision + surrogate id

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// MATCHING HELPER
// ============================================================================

/// Equality for optional attributes where a missing value never matches.
///
/// `None == None` is `false` here: two companies that both lack a phone number
/// are not the same company.
pub fn optional_eq<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

// ============================================================================
// CANDIDATE RECORD
// ============================================================================

/// One incoming company profile, pending classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub logo: Option<String>,
    pub web_url: Option<String>,
    pub phone: Option<String>,
    pub ipo_date: Option<NaiveDate>,

    /// Date the profile was observed. Cleared on the first run because it
    /// does not mark a change there.
    pub description_date: Option<NaiveDate>,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>) -> Self {
        CandidateRecord {
            name: name.into(),
            logo: None,
            web_url: None,
            phone: None,
            ipo_date: None,
            description_date: None,
        }
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    pub fn with_web_url(mut self, web_url: impl Into<String>) -> Self {
        self.web_url = Some(web_url.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_ipo_date(mut self, ipo_date: NaiveDate) -> Self {
        self.ipo_date = Some(ipo_date);
        self
    }

    pub fn with_description_date(mut self, date: NaiveDate) -> Self {
        self.description_date = Some(date);
        self
    }

    /// A blank name cannot be matched or persisted
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

// ============================================================================
// REGISTRY ROW
// ============================================================================

/// One company as seen through the left-joined registry tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRow {
    pub company_id: i64,
    pub name: Option<String>,
    pub logo: Option<String>,
    pub web_url: Option<String>,
    pub phone: Option<String>,
    pub ipo_date: Option<NaiveDate>,
    pub description_date: Option<NaiveDate>,
}

impl RegistryRow {
    pub fn new(company_id: i64) -> Self {
        RegistryRow {
            company_id,
            name: None,
            logo: None,
            web_url: None,
            phone: None,
            ipo_date: None,
            description_date: None,
        }
    }

    /// Compound contact key; `None` fields are part of the key
    pub fn contact_key(&self) -> ContactKey<'_> {
        ContactKey {
            phone: self.phone.as_deref(),
            web_url: self.web_url.as_deref(),
            logo: self.logo.as_deref(),
        }
    }
}

/// `(phone, web_url, logo)` as one comparable tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactKey<'a> {
    pub phone: Option<&'a str>,
    pub web_url: Option<&'a str>,
    pub logo: Option<&'a str>,
}

impl CandidateRecord {
    pub fn contact_key(&self) -> ContactKey<'_> {
        ContactKey {
            phone: self.phone.as_deref(),
            web_url: self.web_url.as_deref(),
            logo: self.logo.as_deref(),
        }
    }
}

// ============================================================================
// CLASSIFIED RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Company not present in the registry
    New,

    /// Existing company found under a different name
    NameChanged,

    /// Existing company whose contact details changed
    ContactChanged,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::NameChanged => "NAME_CHANGED",
            Status::ContactChanged => "CONTACT_CHANGED",
        }
    }

    pub fn is_changed(&self) -> bool {
        !matches!(self, Status::New)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate after classification. `company_id` stays `None` for NEW records
/// until the allocator runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub company_id: Option<i64>,
    pub status: Status,
}

impl ClassifiedRecord {
    pub fn new_company(record: CandidateRecord) -> Self {
        ClassifiedRecord {
            record,
            company_id: None,
            status: Status::New,
        }
    }

    pub fn changed(record: CandidateRecord, company_id: i64, status: Status) -> Self {
        ClassifiedRecord {
            record,
            company_id: Some(company_id),
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_eq_requires_both_present() {
        assert!(optional_eq(&Some("123"), &Some("123")));
        assert!(!optional_eq(&Some("123"), &Some("456")));
        assert!(!optional_eq(&Some("123"), &None));
        assert!(!optional_eq::<&str>(&None, &None));
    }

    #[test]
    fn test_contact_key_keeps_missing_fields() {
        let mut row = RegistryRow::new(4);
        row.phone = Some("555".to_string());

        let candidate = CandidateRecord::new("Comp D").with_phone("555");
        assert_eq!(row.contact_key(), candidate.contact_key());

        let with_logo = candidate.with_logo("https://static.example/logo");
        assert_ne!(row.contact_key(), with_logo.contact_key());
    }

    #[test]
    fn test_blank_name_detected() {
        assert!(CandidateRecord::new("COMP A").has_name());
        assert!(!CandidateRecord::new("   ").has_name());
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&Status::NameChanged).unwrap();
        assert_eq!(json, "\"NAME_CHANGED\"");
        assert_eq!(Status::ContactChanged.to_string(), "CONTACT_CHANGED");
        assert!(!Status::New.is_changed());
    }
}
