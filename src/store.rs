use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conf::{Backend, Settings};
use crate::db::SqliteStore;
use crate::error::StoreError;
use crate::models::{ApplicationPatch, JobApplication, NewApplication};
use crate::rest::RestStore;

pub const TABLE: &str = "job_applications";

pub const COLUMNS: &str = "id, user_id, job_title, company, platform, location, employment_type, \
     date_applied, status, job_url, last_contact_date, follow_up_due_date, next_action, \
     contact_name, contact_email, contact_linkedin, notes, salary_range, key_requirements, \
     created_at, updated_at";

// --- Adapter trait ---

/// Row store holding job applications. Every call is scoped to `owner`;
/// rows belonging to anybody else are invisible and untouchable.
pub trait ApplicationStore {
    /// All of the owner's applications, most recently updated first.
    fn list(&self, owner: &str) -> Result<Vec<JobApplication>, StoreError>;

    /// Insert a new application. The store assigns id and both timestamps.
    fn create(&self, owner: &str, fields: &NewApplication) -> Result<JobApplication, StoreError>;

    /// Change only the fields present in `patch` and refresh `updated_at`.
    fn update(&self, owner: &str, id: Uuid, patch: &ApplicationPatch) -> Result<(), StoreError>;

    /// Remove an application. Missing rows report `StoreError::NotFound`.
    fn delete(&self, owner: &str, id: Uuid) -> Result<(), StoreError>;

    fn backend_name(&self) -> &str;
}

pub fn open_store(settings: &Settings) -> anyhow::Result<Box<dyn ApplicationStore>> {
    match settings.backend {
        Backend::Sqlite => {
            let store = SqliteStore::open(&settings.database_path()?)?;
            Ok(Box::new(store))
        }
        Backend::Rest => {
            let store = RestStore::from_settings(settings)?;
            Ok(Box::new(store))
        }
    }
}

// --- Persisted shape ---

/// One row of `job_applications`, column for column. Dates and timestamps
/// travel as text; optional fields are SQL/JSON null when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub id: String,
    pub user_id: String,
    pub job_title: String,
    pub company: String,
    pub platform: String,
    pub location: String,
    pub employment_type: String,
    pub date_applied: String,
    pub status: String,
    pub job_url: Option<String>,
    pub last_contact_date: Option<String>,
    pub follow_up_due_date: Option<String>,
    pub next_action: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_linkedin: Option<String>,
    pub notes: Option<String>,
    pub salary_range: Option<String>,
    pub key_requirements: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApplicationRow {
    pub fn new(owner: &str, app: &JobApplication) -> Self {
        Self {
            id: app.id.to_string(),
            user_id: owner.to_string(),
            job_title: app.job_title.clone(),
            company: app.company.clone(),
            platform: app.platform.as_str().to_string(),
            location: app.location.clone(),
            employment_type: app.employment_type.as_str().to_string(),
            date_applied: format_date(app.date_applied),
            status: app.status.as_str().to_string(),
            job_url: app.job_url.clone(),
            last_contact_date: app.last_contact_date.map(format_date),
            follow_up_due_date: app.follow_up_due_date.map(format_date),
            next_action: app.next_action.clone(),
            contact_name: app.contact_name.clone(),
            contact_email: app.contact_email.clone(),
            contact_linkedin: app.contact_linkedin.clone(),
            notes: app.notes.clone(),
            salary_range: app.salary_range.clone(),
            key_requirements: app.key_requirements.clone(),
            created_at: format_timestamp(app.created_at),
            updated_at: format_timestamp(app.updated_at),
        }
    }
}

impl TryFrom<ApplicationRow> for JobApplication {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(JobApplication {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| StoreError::Decode(format!("id '{}': {}", row.id, e)))?,
            job_title: row.job_title,
            company: row.company,
            platform: row.platform.parse().map_err(decode)?,
            location: row.location,
            employment_type: row.employment_type.parse().map_err(decode)?,
            date_applied: parse_date(&row.date_applied)?,
            status: row.status.parse().map_err(decode)?,
            job_url: row.job_url,
            last_contact_date: row.last_contact_date.as_deref().map(parse_date).transpose()?,
            follow_up_due_date: row.follow_up_due_date.as_deref().map(parse_date).transpose()?,
            next_action: row.next_action,
            contact_name: row.contact_name,
            contact_email: row.contact_email,
            contact_linkedin: row.contact_linkedin,
            notes: row.notes,
            salary_range: row.salary_range,
            key_requirements: row.key_requirements,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Insert payload for stores that assign id and timestamps server-side.
#[derive(Debug, Clone, Serialize)]
pub struct InsertRow<'a> {
    pub user_id: &'a str,
    pub job_title: &'a str,
    pub company: &'a str,
    pub platform: &'static str,
    pub location: &'a str,
    pub employment_type: &'static str,
    pub date_applied: String,
    pub status: &'static str,
    pub job_url: Option<&'a str>,
    pub last_contact_date: Option<String>,
    pub follow_up_due_date: Option<String>,
    pub next_action: Option<&'a str>,
    pub contact_name: Option<&'a str>,
    pub contact_email: Option<&'a str>,
    pub contact_linkedin: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub salary_range: Option<&'a str>,
    pub key_requirements: Option<&'a str>,
}

impl<'a> InsertRow<'a> {
    pub fn new(owner: &'a str, fields: &'a NewApplication) -> Self {
        Self {
            user_id: owner,
            job_title: &fields.job_title,
            company: &fields.company,
            platform: fields.platform.as_str(),
            location: &fields.location,
            employment_type: fields.employment_type.as_str(),
            date_applied: format_date(fields.date_applied),
            status: fields.status.as_str(),
            job_url: fields.job_url.as_deref(),
            last_contact_date: fields.last_contact_date.map(format_date),
            follow_up_due_date: fields.follow_up_due_date.map(format_date),
            next_action: fields.next_action.as_deref(),
            contact_name: fields.contact_name.as_deref(),
            contact_email: fields.contact_email.as_deref(),
            contact_linkedin: fields.contact_linkedin.as_deref(),
            notes: fields.notes.as_deref(),
            salary_range: fields.salary_range.as_deref(),
            key_requirements: fields.key_requirements.as_deref(),
        }
    }
}

/// Column assignments for a patch, in a fixed column order. `None` values
/// are written as null.
pub fn patch_columns(patch: &ApplicationPatch) -> Vec<(&'static str, Option<String>)> {
    let mut cols = Vec::new();

    if let Some(v) = &patch.job_title {
        cols.push(("job_title", Some(v.clone())));
    }
    if let Some(v) = &patch.company {
        cols.push(("company", Some(v.clone())));
    }
    if let Some(v) = patch.platform {
        cols.push(("platform", Some(v.as_str().to_string())));
    }
    if let Some(v) = &patch.location {
        cols.push(("location", Some(v.clone())));
    }
    if let Some(v) = patch.employment_type {
        cols.push(("employment_type", Some(v.as_str().to_string())));
    }
    if let Some(v) = patch.date_applied {
        cols.push(("date_applied", Some(format_date(v))));
    }
    if let Some(v) = patch.status {
        cols.push(("status", Some(v.as_str().to_string())));
    }
    if let Some(v) = &patch.job_url {
        cols.push(("job_url", v.clone()));
    }
    if let Some(v) = patch.last_contact_date {
        cols.push(("last_contact_date", v.map(format_date)));
    }
    if let Some(v) = patch.follow_up_due_date {
        cols.push(("follow_up_due_date", v.map(format_date)));
    }
    if let Some(v) = &patch.next_action {
        cols.push(("next_action", v.clone()));
    }
    if let Some(v) = &patch.contact_name {
        cols.push(("contact_name", v.clone()));
    }
    if let Some(v) = &patch.contact_email {
        cols.push(("contact_email", v.clone()));
    }
    if let Some(v) = &patch.contact_linkedin {
        cols.push(("contact_linkedin", v.clone()));
    }
    if let Some(v) = &patch.notes {
        cols.push(("notes", v.clone()));
    }
    if let Some(v) = &patch.salary_range {
        cols.push(("salary_range", v.clone()));
    }
    if let Some(v) = &patch.key_requirements {
        cols.push(("key_requirements", v.clone()));
    }

    cols
}

// --- Text encodings ---

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fixed width (microseconds, `Z`), so text order matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    // Some backends hand back a full timestamp for date columns.
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| StoreError::Decode(format!("date '{}': {}", s, e)))
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp '{}': {}", s, e)))
}

fn decode(err: crate::models::UnknownValue) -> StoreError {
    StoreError::Decode(err.to_string())
}
