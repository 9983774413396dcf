use crate::batch::parse_date;
use crate::formatter::RegistryTables;
use crate::pipeline::PassOutcome;
use crate::records::RegistryRow;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Event for audit trail: every written pass and every ambiguous match
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Company registry: identity + three attribute tables keyed by id_company
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS company (
            id_company INTEGER PRIMARY KEY,
            id_naic_sector INTEGER,
            id_finnhub_classification INTEGER,
            id_gics_sector INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS companydescription (
            id_description INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            description TEXT,
            date_description TEXT,
            id_company INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS companycontact (
            id_contact INTEGER PRIMARY KEY AUTOINCREMENT,
            weburl TEXT,
            logo TEXT,
            phone TEXT,
            date_contact TEXT,
            id_company INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS companyipo (
            id_ipo INTEGER PRIMARY KEY AUTOINCREMENT,
            number_shares INTEGER,
            avg_share_price REAL,
            date_ipo TEXT,
            id_company INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_description_company ON companydescription(id_company)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contact_company ON companycontact(id_company)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ipo_company ON companyipo(id_company)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

fn to_sql_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn from_sql_date(value: Option<String>, column: &str, company_id: i64) -> Result<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| anyhow!("company {}: cannot parse {} '{}'", company_id, column, s)),
    }
}

/// Load the registry snapshot: one row per company, ordered by id.
///
/// Attribute tables are left-joined, so a company without a description,
/// contact or IPO row still appears with those fields empty. When a company
/// has several rows in one table, the most recently inserted one is used.
pub fn load_registry(conn: &Connection) -> Result<Vec<RegistryRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id_company,
                d.name, d.date_description,
                ct.logo, ct.weburl, ct.phone,
                i.date_ipo
         FROM company c
         LEFT JOIN companydescription d ON d.id_description =
             (SELECT MAX(id_description) FROM companydescription WHERE id_company = c.id_company)
         LEFT JOIN companycontact ct ON ct.id_contact =
             (SELECT MAX(id_contact) FROM companycontact WHERE id_company = c.id_company)
         LEFT JOIN companyipo i ON i.id_ipo =
             (SELECT MAX(id_ipo) FROM companyipo WHERE id_company = c.id_company)
         ORDER BY c.id_company",
    )?;

    type RawRow = (
        i64,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );

    let raw_rows: Vec<RawRow> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read registry snapshot")?;

    let mut registry = Vec::with_capacity(raw_rows.len());
    for (company_id, name, date_description, logo, weburl, phone, date_ipo) in raw_rows {
        registry.push(RegistryRow {
            company_id,
            name,
            logo,
            web_url: weburl,
            phone,
            ipo_date: from_sql_date(date_ipo, "date_ipo", company_id)?,
            description_date: from_sql_date(date_description, "date_description", company_id)?,
        });
    }

    debug!(rows = registry.len(), "loaded registry snapshot");
    Ok(registry)
}

/// Append the four formatted row sets. Returns the number of rows inserted.
///
/// Runs on whatever connection or transaction it is given; use `apply_pass`
/// for the all-or-nothing write.
pub fn write_tables(conn: &Connection, tables: &RegistryTables) -> Result<usize> {
    let mut inserted = 0;

    for row in &tables.identity {
        conn.execute("INSERT INTO company (id_company) VALUES (?1)", params![row.company_id])
            .with_context(|| format!("Failed to insert company {}", row.company_id))?;
        inserted += 1;
    }

    for row in &tables.description {
        conn.execute(
            "INSERT INTO companydescription (date_description, name, id_company) VALUES (?1, ?2, ?3)",
            params![to_sql_date(row.description_date), row.name, row.company_id],
        )
        .with_context(|| format!("Failed to insert description for company {}", row.company_id))?;
        inserted += 1;
    }

    for row in &tables.contact {
        conn.execute(
            "INSERT INTO companycontact (date_contact, logo, phone, weburl, id_company)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                to_sql_date(row.contact_date),
                row.logo,
                row.phone,
                row.web_url,
                row.company_id,
            ],
        )
        .with_context(|| format!("Failed to insert contact for company {}", row.company_id))?;
        inserted += 1;
    }

    for row in &tables.ipo {
        conn.execute(
            "INSERT INTO companyipo (date_ipo, id_company) VALUES (?1, ?2)",
            params![to_sql_date(row.ipo_date), row.company_id],
        )
        .with_context(|| format!("Failed to insert ipo for company {}", row.company_id))?;
        inserted += 1;
    }

    Ok(inserted)
}

/// Write a pass's tables and its audit events in one transaction.
///
/// Either every row lands or none does.
pub fn apply_pass(conn: &mut Connection, outcome: &PassOutcome, actor: &str) -> Result<usize> {
    let tx = conn.transaction().context("Failed to open transaction")?;

    let inserted = write_tables(&tx, &outcome.tables)?;

    for ambiguous in &outcome.ambiguous {
        let event = Event::new(
            "ambiguous_match",
            "company",
            &ambiguous.adopted_id.to_string(),
            serde_json::to_value(ambiguous)?,
            actor,
        );
        insert_event(&tx, &event)?;
    }

    let event = Event::new(
        "pass_applied",
        "pass",
        outcome.report.kind.as_str(),
        serde_json::json!({
            "report": outcome.report,
            "rows_inserted": inserted,
        }),
        actor,
    );
    insert_event(&tx, &event)?;

    tx.commit().context("Failed to commit registry write")?;

    info!(pass = outcome.report.kind.as_str(), rows = inserted, "registry updated");
    Ok(inserted)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                    })?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

pub fn count_companies(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM company", [], |row| row.get(0))?;

    Ok(count)
}
