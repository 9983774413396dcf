// 📋 Table Formatter - Project classified records into registry table rows
//
// company            <- new records (id only, sectors left empty)
// companydescription <- new + changed records
// companycontact     <- new records
// companyipo         <- new records

use crate::error::ReconcileError;
use crate::records::ClassifiedRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ROW SHAPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRow {
    pub company_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRow {
    pub description_date: Option<NaiveDate>,
    pub name: String,
    pub company_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRow {
    pub contact_date: Option<NaiveDate>,
    pub logo: Option<String>,
    pub phone: Option<String>,
    pub web_url: Option<String>,
    pub company_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpoRow {
    pub ipo_date: Option<NaiveDate>,
    pub company_id: i64,
}

/// The four row sets handed to the registry writer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryTables {
    pub identity: Vec<IdentityRow>,
    pub description: Vec<DescriptionRow>,
    pub contact: Vec<ContactRow>,
    pub ipo: Vec<IpoRow>,
}

impl RegistryTables {
    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
            && self.description.is_empty()
            && self.contact.is_empty()
            && self.ipo.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.identity.len() + self.description.len() + self.contact.len() + self.ipo.len()
    }
}

// ============================================================================
// FORMAT
// ============================================================================

fn company_id(record: &ClassifiedRecord) -> Result<i64, ReconcileError> {
    record.company_id.ok_or_else(|| ReconcileError::MissingIdentifier {
        name: record.record.name.clone(),
    })
}

fn description_row(record: &ClassifiedRecord) -> Result<DescriptionRow, ReconcileError> {
    Ok(DescriptionRow {
        description_date: record.record.description_date,
        name: record.record.name.clone(),
        company_id: company_id(record)?,
    })
}

/// Pure projection, no filtering.
///
/// Changed records only produce a description row: an existing company's new
/// contact details are not re-emitted as a contact row here.
pub fn format_tables(
    new_records: &[ClassifiedRecord],
    changed_records: &[ClassifiedRecord],
) -> Result<RegistryTables, ReconcileError> {
    let mut tables = RegistryTables::default();

    for record in new_records {
        let id = company_id(record)?;
        let r = &record.record;

        tables.identity.push(IdentityRow { company_id: id });
        tables.description.push(description_row(record)?);
        tables.contact.push(ContactRow {
            contact_date: r.description_date,
            logo: r.logo.clone(),
            phone: r.phone.clone(),
            web_url: r.web_url.clone(),
            company_id: id,
        });
        tables.ipo.push(IpoRow {
            ipo_date: r.ipo_date,
            company_id: id,
        });
    }

    for record in changed_records {
        tables.description.push(description_row(record)?);
    }

    Ok(tables)
}

// ============================================================================
// TESTS
// ============================================================================
