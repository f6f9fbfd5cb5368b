use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

// --- Vocabularies ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Wishlist,
    Applied,
    Screening,
    Interview1,
    Interview2,
    Offer,
    Rejected,
    Withdrawn,
}

/// Visual category of a status, picked up by whatever renders badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Info,
    Progress,
    Success,
    Danger,
    Muted,
}

impl Status {
    /// Kanban column order.
    pub const ALL: [Status; 8] = [
        Status::Wishlist,
        Status::Applied,
        Status::Screening,
        Status::Interview1,
        Status::Interview2,
        Status::Offer,
        Status::Rejected,
        Status::Withdrawn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Wishlist => "wishlist",
            Status::Applied => "applied",
            Status::Screening => "screening",
            Status::Interview1 => "interview1",
            Status::Interview2 => "interview2",
            Status::Offer => "offer",
            Status::Rejected => "rejected",
            Status::Withdrawn => "withdrawn",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Wishlist => "Wishlist",
            Status::Applied => "Applied",
            Status::Screening => "HR Screening",
            Status::Interview1 => "Interview 1",
            Status::Interview2 => "Final Interview",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
            Status::Withdrawn => "Withdrawn",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            Status::Wishlist => Tone::Neutral,
            Status::Applied => Tone::Info,
            Status::Screening | Status::Interview1 | Status::Interview2 => Tone::Progress,
            Status::Offer => Tone::Success,
            Status::Rejected => Tone::Danger,
            Status::Withdrawn => Tone::Muted,
        }
    }

    /// Screening or any interview round.
    pub fn is_in_progress(self) -> bool {
        matches!(self, Status::Screening | Status::Interview1 | Status::Interview2)
    }

    /// No follow-up is expected once an application reaches one of these.
    pub fn is_settled(self) -> bool {
        matches!(self, Status::Offer | Status::Rejected | Status::Withdrawn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    Email,
    Website,
    Referral,
    Recruiter,
    Indeed,
    Glassdoor,
    Other,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::Linkedin,
        Platform::Email,
        Platform::Website,
        Platform::Referral,
        Platform::Recruiter,
        Platform::Indeed,
        Platform::Glassdoor,
        Platform::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linkedin => "linkedin",
            Platform::Email => "email",
            Platform::Website => "website",
            Platform::Referral => "referral",
            Platform::Recruiter => "recruiter",
            Platform::Indeed => "indeed",
            Platform::Glassdoor => "glassdoor",
            Platform::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Linkedin => "LinkedIn",
            Platform::Email => "Email",
            Platform::Website => "Company Website",
            Platform::Referral => "Referral",
            Platform::Recruiter => "Recruiter",
            Platform::Indeed => "Indeed",
            Platform::Glassdoor => "Glassdoor",
            Platform::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Remote,
    Hybrid,
}

impl EmploymentType {
    pub const ALL: [EmploymentType; 5] = [
        EmploymentType::FullTime,
        EmploymentType::PartTime,
        EmploymentType::Contract,
        EmploymentType::Remote,
        EmploymentType::Hybrid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full-time",
            EmploymentType::PartTime => "part-time",
            EmploymentType::Contract => "contract",
            EmploymentType::Remote => "remote",
            EmploymentType::Hybrid => "hybrid",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EmploymentType::FullTime => "Full-time",
            EmploymentType::PartTime => "Part-time",
            EmploymentType::Contract => "Contract",
            EmploymentType::Remote => "Remote",
            EmploymentType::Hybrid => "Hybrid",
        }
    }
}

/// A value outside one of the closed vocabularies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownValue {}

macro_rules! vocabulary_impls {
    ($ty:ty, $kind:literal) => {
        impl FromStr for $ty {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary_impls!(Status, "status");
vocabulary_impls!(Platform, "platform");
vocabulary_impls!(EmploymentType, "employment type");

// --- Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    pub job_title: String,
    pub company: String,
    pub platform: Platform,
    pub location: String,
    pub employment_type: EmploymentType,
    pub date_applied: NaiveDate,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "contactLinkedIn")]
    pub contact_linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_requirements: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the user fills in for a new application. The store assigns
/// the id and both timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub job_title: String,
    pub company: String,
    pub platform: Platform,
    pub location: String,
    pub employment_type: EmploymentType,
    pub date_applied: NaiveDate,
    pub status: Status,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub last_contact_date: Option<NaiveDate>,
    #[serde(default)]
    pub follow_up_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub next_action: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default, rename = "contactLinkedIn")]
    pub contact_linkedin: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub key_requirements: Option<String>,
}

impl NewApplication {
    /// Minimal field set; optional fields start absent.
    pub fn new(
        job_title: impl Into<String>,
        company: impl Into<String>,
        platform: Platform,
        date_applied: NaiveDate,
    ) -> Self {
        Self {
            job_title: job_title.into(),
            company: company.into(),
            platform,
            location: String::new(),
            employment_type: EmploymentType::FullTime,
            date_applied,
            status: Status::Applied,
            job_url: None,
            last_contact_date: None,
            follow_up_due_date: None,
            next_action: None,
            contact_name: None,
            contact_email: None,
            contact_linkedin: None,
            notes: None,
            salary_range: None,
            key_requirements: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.job_title.trim().is_empty() {
            missing.push("job title");
        }
        if self.company.trim().is_empty() {
            missing.push("company");
        }
        ValidationError::check(missing)
    }

    /// Optional text left blank is stored as absent, like an unfilled form
    /// field.
    pub fn normalize(&mut self) {
        for slot in [
            &mut self.job_url,
            &mut self.next_action,
            &mut self.contact_name,
            &mut self.contact_email,
            &mut self.contact_linkedin,
            &mut self.notes,
            &mut self.salary_range,
            &mut self.key_requirements,
        ] {
            if slot.as_deref().is_some_and(is_blank) {
                *slot = None;
            }
        }
    }

    /// Attach store-assigned identity and timestamps.
    pub fn into_application(self, id: Uuid, now: DateTime<Utc>) -> JobApplication {
        JobApplication {
            id,
            job_title: self.job_title,
            company: self.company,
            platform: self.platform,
            location: self.location,
            employment_type: self.employment_type,
            date_applied: self.date_applied,
            status: self.status,
            job_url: self.job_url,
            last_contact_date: self.last_contact_date,
            follow_up_due_date: self.follow_up_due_date,
            next_action: self.next_action,
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            contact_linkedin: self.contact_linkedin,
            notes: self.notes,
            salary_range: self.salary_range,
            key_requirements: self.key_requirements,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` leaves a field alone; for optional fields
/// `Some(None)` clears the value and `Some(Some(v))` replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub platform: Option<Platform>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub date_applied: Option<NaiveDate>,
    pub status: Option<Status>,
    pub job_url: Option<Option<String>>,
    pub last_contact_date: Option<Option<NaiveDate>>,
    pub follow_up_due_date: Option<Option<NaiveDate>>,
    pub next_action: Option<Option<String>>,
    pub contact_name: Option<Option<String>>,
    pub contact_email: Option<Option<String>>,
    pub contact_linkedin: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub salary_range: Option<Option<String>>,
    pub key_requirements: Option<Option<String>>,
}

impl ApplicationPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Required text fields may be left out but not blanked.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.job_title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            missing.push("job title");
        }
        if self.company.as_deref().is_some_and(|c| c.trim().is_empty()) {
            missing.push("company");
        }
        ValidationError::check(missing)
    }

    /// Setting optional text to blank clears it.
    pub fn normalize(&mut self) {
        for slot in [
            &mut self.job_url,
            &mut self.next_action,
            &mut self.contact_name,
            &mut self.contact_email,
            &mut self.contact_linkedin,
            &mut self.notes,
            &mut self.salary_range,
            &mut self.key_requirements,
        ] {
            if slot.as_ref().is_some_and(|v| v.as_deref().is_some_and(is_blank)) {
                *slot = Some(None);
            }
        }
    }

    /// Merge supplied fields into `app`. Identity and timestamps are not
    /// touched here; the caller owns `updated_at`.
    pub fn apply_to(&self, app: &mut JobApplication) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }

        set(&mut app.job_title, &self.job_title);
        set(&mut app.company, &self.company);
        set(&mut app.platform, &self.platform);
        set(&mut app.location, &self.location);
        set(&mut app.employment_type, &self.employment_type);
        set(&mut app.date_applied, &self.date_applied);
        set(&mut app.status, &self.status);
        set(&mut app.job_url, &self.job_url);
        set(&mut app.last_contact_date, &self.last_contact_date);
        set(&mut app.follow_up_due_date, &self.follow_up_due_date);
        set(&mut app.next_action, &self.next_action);
        set(&mut app.contact_name, &self.contact_name);
        set(&mut app.contact_email, &self.contact_email);
        set(&mut app.contact_linkedin, &self.contact_linkedin);
        set(&mut app.notes, &self.notes);
        set(&mut app.salary_range, &self.salary_range);
        set(&mut app.key_requirements, &self.key_requirements);
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Current time at the precision rows are persisted with (microseconds).
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Next `updated_at` for a record: now, but never at or before `previous`.
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}
