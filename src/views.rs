use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::{JobApplication, Platform, Status};

// --- Filtering and ordering ---

/// Filter-bar state. `None` for status or platform means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub search: String,
    pub status: Option<Status>,
    pub platform: Option<Platform>,
}

impl Filter {
    pub fn matches(&self, app: &JobApplication) -> bool {
        let query = self.search.to_lowercase();
        let matches_search = query.is_empty()
            || app.job_title.to_lowercase().contains(&query)
            || app.company.to_lowercase().contains(&query);
        let matches_status = self.status.is_none_or(|s| s == app.status);
        let matches_platform = self.platform.is_none_or(|p| p == app.platform);

        matches_search && matches_status && matches_platform
    }

    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || self.status.is_some() || self.platform.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Most recently updated first. Ties keep their incoming order.
pub fn sort_recent(apps: &mut [&JobApplication]) {
    apps.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// What the table shows: matching applications, most recent first.
pub fn visible<'a>(apps: &'a [JobApplication], filter: &Filter) -> Vec<&'a JobApplication> {
    let mut shown: Vec<&JobApplication> = apps.iter().filter(|a| filter.matches(a)).collect();
    sort_recent(&mut shown);
    shown
}

// --- Dashboard numbers ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub applied_this_week: usize,
    pub in_progress: usize,
    pub offers: usize,
    pub rejected: usize,
    pub overdue_follow_ups: usize,
}

impl DashboardStats {
    /// Counts over the full, unfiltered list as seen on `today`.
    pub fn compute(apps: &[JobApplication], today: NaiveDate) -> Self {
        let (week_start, week_end) = week_bounds(today);
        let mut stats = Self::default();

        for app in apps {
            if app.date_applied >= week_start && app.date_applied <= week_end {
                stats.applied_this_week += 1;
            }
            if app.status.is_in_progress() {
                stats.in_progress += 1;
            }
            match app.status {
                Status::Offer => stats.offers += 1,
                Status::Rejected => stats.rejected += 1,
                _ => {}
            }
            if is_overdue_follow_up(app, today) {
                stats.overdue_follow_ups += 1;
            }
        }

        stats
    }
}

/// Sunday-to-Saturday week containing `day`, both ends inclusive.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(day.weekday().num_days_from_sunday() as i64);
    (start, start + Duration::days(6))
}

// --- Follow-ups ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue,
    DueSoon,
    Upcoming,
}

/// Date-only classification used to highlight cards and rows.
pub fn follow_up_urgency(due: NaiveDate, today: NaiveDate) -> Urgency {
    if due < today {
        Urgency::Overdue
    } else if due > today && due < today + Duration::days(3) {
        Urgency::DueSoon
    } else {
        Urgency::Upcoming
    }
}

/// A follow-up that slipped on an application still in play.
pub fn is_overdue_follow_up(app: &JobApplication, today: NaiveDate) -> bool {
    app.follow_up_due_date.is_some_and(|due| due < today) && !app.status.is_settled()
}

// --- Kanban ---

pub struct Column<'a> {
    pub status: Status,
    pub applications: Vec<&'a JobApplication>,
}

/// One column per status in canonical order, cards in incoming order.
pub fn kanban_columns(apps: &[JobApplication]) -> Vec<Column<'_>> {
    Status::ALL
        .into_iter()
        .map(|status| Column {
            status,
            applications: apps.iter().filter(|a| a.status == status).collect(),
        })
        .collect()
}
