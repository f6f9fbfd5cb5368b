use chrono::NaiveDate;

use crate::models::JobApplication;
use crate::store::format_date;

pub const HEADERS: [&str; 14] = [
    "Job Title",
    "Company",
    "Platform",
    "Location",
    "Employment Type",
    "Date Applied",
    "Status",
    "Job URL",
    "Contact Name",
    "Contact Email",
    "Follow-up Due",
    "Next Action",
    "Salary Range",
    "Notes",
];

/// A ready-to-save CSV document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
}

impl CsvExport {
    pub fn new(apps: &[JobApplication], today: NaiveDate) -> Self {
        Self {
            file_name: file_name(today),
            contents: to_csv(apps),
        }
    }
}

pub fn file_name(today: NaiveDate) -> String {
    format!("job-applications-{}.csv", format_date(today))
}

/// Header line, then one fully quoted line per application in the order
/// given.
pub fn to_csv(apps: &[JobApplication]) -> String {
    let mut lines = Vec::with_capacity(apps.len() + 1);
    lines.push(HEADERS.join(","));
    for app in apps {
        let cells = row(app);
        let quoted: Vec<String> = cells.iter().map(|c| quote(c)).collect();
        lines.push(quoted.join(","));
    }
    lines.join("\n")
}

fn row(app: &JobApplication) -> [String; 14] {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        app.job_title.clone(),
        app.company.clone(),
        app.platform.as_str().to_string(),
        app.location.clone(),
        app.employment_type.as_str().to_string(),
        format_date(app.date_applied),
        app.status.as_str().to_string(),
        text(&app.job_url),
        text(&app.contact_name),
        text(&app.contact_email),
        app.follow_up_due_date.map(format_date).unwrap_or_default(),
        text(&app.next_action),
        text(&app.salary_range),
        text(&app.notes),
    ]
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewApplication, Platform};
    use chrono::Utc;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    /// Minimal reader for quoted cells, enough to check what we write.
    fn split_quoted(line: &str) -> Vec<String> {
        let mut cells = Vec::new();
        let mut cell = String::new();
        let mut chars = line.chars().peekable();
        let mut in_quotes = false;
        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                ('"', _) => in_quotes = !in_quotes,
                (',', false) => cells.push(std::mem::take(&mut cell)),
                _ => cell.push(c),
            }
        }
        cells.push(cell);
        cells
    }

    #[test]
    fn header_comes_first_and_unquoted() {
        let csv = to_csv(&[]);
        assert_eq!(
            csv,
            "Job Title,Company,Platform,Location,Employment Type,Date Applied,Status,\
             Job URL,Contact Name,Contact Email,Follow-up Due,Next Action,Salary Range,Notes"
        );
    }

    #[test]
    fn quotes_are_doubled_and_recoverable() {
        let mut new = NewApplication::new("Engineer", "Acme, Inc.", Platform::Linkedin, day(2));
        new.notes = Some("Said \"great fit\"".to_string());
        new.follow_up_due_date = Some(day(9));
        let app = new.into_application(Uuid::new_v4(), Utc::now());

        let csv = to_csv(std::slice::from_ref(&app));
        let line = csv.lines().nth(1).unwrap();
        assert!(line.ends_with(",\"Said \"\"great fit\"\"\""));

        let cells = split_quoted(line);
        assert_eq!(cells.len(), 14);
        assert_eq!(cells[1], "Acme, Inc.");
        assert_eq!(cells[5], "2024-01-02");
        assert_eq!(cells[10], "2024-01-09");
        assert_eq!(cells[13], "Said \"great fit\"");
    }

    #[test]
    fn missing_optionals_are_empty_quoted_cells() {
        let app = NewApplication::new("Engineer", "Acme", Platform::Email, day(2))
            .into_application(Uuid::new_v4(), Utc::now());
        let csv = to_csv(&[app]);
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "\"Engineer\",\"Acme\",\"email\",\"\",\"full-time\",\"2024-01-02\",\"applied\",\
             \"\",\"\",\"\",\"\",\"\",\"\",\"\""
        );
    }

    #[test]
    fn rows_keep_list_order() {
        let a = NewApplication::new("B-first", "Acme", Platform::Email, day(2))
            .into_application(Uuid::new_v4(), Utc::now());
        let b = NewApplication::new("A-second", "Acme", Platform::Email, day(2))
            .into_application(Uuid::new_v4(), Utc::now());
        let csv = to_csv(&[a, b]);
        let titles: Vec<String> = csv.lines().skip(1).map(|l| split_quoted(l)[0].clone()).collect();
        assert_eq!(titles, vec!["B-first", "A-second"]);
    }

    #[test]
    fn file_name_uses_export_date() {
        let export = CsvExport::new(&[], day(4));
        assert_eq!(export.file_name, "job-applications-2024-01-04.csv");
    }
}
