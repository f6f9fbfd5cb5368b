use chrono::NaiveDate;
use jobtrack::db::SqliteStore;
use jobtrack::error::StoreError;
use jobtrack::models::{ApplicationPatch, JobApplication, NewApplication, Platform, Status};
use jobtrack::store::ApplicationStore;
use jobtrack::tracker::{Session, Tracker};
use jobtrack::views::{visible, Filter};
use std::cell::Cell;
use std::rc::Rc;
use uuid::Uuid;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn fields(title: &str, company: &str) -> NewApplication {
    let mut f = NewApplication::new(title, company, Platform::Linkedin, day(2));
    f.location = "Remote".to_string();
    f.notes = Some("Said \"great fit\"".to_string());
    f
}

fn signed_in() -> Tracker {
    let mut tracker = Tracker::new(Box::new(SqliteStore::open_in_memory().unwrap()));
    tracker.sign_in(Session::new("alice"));
    tracker
}

/// Wraps a real store and starts failing every call once `broken` is set.
struct Breakable {
    inner: SqliteStore,
    broken: Rc<Cell<bool>>,
}

impl Breakable {
    fn check(&self) -> Result<(), StoreError> {
        if self.broken.get() {
            Err(StoreError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl ApplicationStore for Breakable {
    fn list(&self, owner: &str) -> Result<Vec<JobApplication>, StoreError> {
        self.check()?;
        self.inner.list(owner)
    }

    fn create(&self, owner: &str, fields: &NewApplication) -> Result<JobApplication, StoreError> {
        self.check()?;
        self.inner.create(owner, fields)
    }

    fn update(&self, owner: &str, id: Uuid, patch: &ApplicationPatch) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update(owner, id, patch)
    }

    fn delete(&self, owner: &str, id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(owner, id)
    }

    fn backend_name(&self) -> &str {
        "breakable"
    }
}

fn breakable() -> (Tracker, Rc<Cell<bool>>) {
    let broken = Rc::new(Cell::new(false));
    let store = Breakable {
        inner: SqliteStore::open_in_memory().unwrap(),
        broken: Rc::clone(&broken),
    };
    let mut tracker = Tracker::new(Box::new(store));
    tracker.sign_in(Session::new("alice"));
    (tracker, broken)
}

#[test]
fn added_record_is_listed_with_its_fields() {
    let mut tracker = signed_in();
    let input = fields("Engineer", "Acme");
    let added = tracker.add(input.clone()).unwrap();

    let listed = tracker.store().list("alice").unwrap();
    assert_eq!(listed.len(), 1);
    let stored = &listed[0];
    assert_eq!(stored.id, added.id);
    assert_eq!(stored.job_title, input.job_title);
    assert_eq!(stored.company, input.company);
    assert_eq!(stored.location, input.location);
    assert_eq!(stored.notes, input.notes);
    assert_eq!(stored.job_url, None);
    assert!(stored.updated_at >= stored.created_at);
}

#[test]
fn new_records_are_prepended_locally() {
    let mut tracker = signed_in();
    tracker.add(fields("First", "Acme")).unwrap();
    tracker.add(fields("Second", "Acme")).unwrap();

    let titles: Vec<&str> = tracker
        .applications()
        .iter()
        .map(|a| a.job_title.as_str())
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);
}

#[test]
fn status_update_changes_only_status_and_updated_at() {
    let mut tracker = signed_in();
    let before = tracker.add(fields("Engineer", "Acme")).unwrap();

    assert!(tracker.set_status(before.id, Status::Interview1));

    for after in [
        tracker.applications()[0].clone(),
        tracker.store().list("alice").unwrap()[0].clone(),
    ] {
        assert_eq!(after.status, Status::Interview1);
        assert!(after.updated_at > before.updated_at);

        let mut normalized = after.clone();
        normalized.status = before.status;
        normalized.updated_at = before.updated_at;
        assert_eq!(normalized, before);
    }
}

#[test]
fn cleared_optional_fields_come_back_absent() {
    let mut tracker = signed_in();
    let app = tracker.add(fields("Engineer", "Acme")).unwrap();
    let patch = ApplicationPatch {
        notes: Some(None),
        ..ApplicationPatch::default()
    };
    assert!(tracker.update(app.id, patch));

    tracker.load();
    assert_eq!(tracker.applications()[0].notes, None);
}

#[test]
fn delete_removes_and_repeat_delete_is_quiet() {
    let mut tracker = signed_in();
    let app = tracker.add(fields("Engineer", "Acme")).unwrap();

    assert!(tracker.delete(app.id));
    assert!(tracker.applications().is_empty());
    assert!(tracker.store().list("alice").unwrap().is_empty());

    assert!(tracker.delete(app.id));
    assert!(tracker.delete(Uuid::new_v4()));
    assert!(tracker.take_notices().is_empty());
}

#[test]
fn failed_mutations_leave_state_alone_and_raise_one_notice_each() {
    let (mut tracker, broken) = breakable();
    let app = tracker.add(fields("Engineer", "Acme")).unwrap();
    let before = tracker.snapshot();

    broken.set(true);
    assert!(tracker.add(fields("Designer", "Acme")).is_none());
    assert!(!tracker.set_status(app.id, Status::Offer));
    assert!(!tracker.delete(app.id));

    let after = tracker.snapshot();
    assert_eq!(after.version(), before.version());
    assert_eq!(after.applications(), before.applications());

    let notices = tracker.take_notices();
    let summaries: Vec<&str> = notices.iter().map(|n| n.summary).collect();
    assert_eq!(
        summaries,
        vec![
            "Failed to add application",
            "Failed to update application",
            "Failed to delete application",
        ]
    );
    assert!(tracker.take_notices().is_empty());
}

#[test]
fn failed_load_shows_an_empty_list() {
    let (mut tracker, broken) = breakable();
    tracker.add(fields("Engineer", "Acme")).unwrap();

    broken.set(true);
    tracker.load();
    assert!(tracker.applications().is_empty());
    assert!(!tracker.is_loading());
    assert_eq!(tracker.take_notices().len(), 1);

    broken.set(false);
    tracker.load();
    assert_eq!(tracker.applications().len(), 1);
}

#[test]
fn blank_required_fields_never_reach_the_store() {
    let mut tracker = signed_in();
    assert!(tracker.add(fields("  ", "Acme")).is_none());
    assert!(tracker.store().list("alice").unwrap().is_empty());

    let notices = tracker.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].detail.contains("job title"));
}

#[test]
fn users_never_see_each_other() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create("bob", &fields("Bob's job", "Initech")).unwrap();

    let mut tracker = Tracker::new(Box::new(store));
    tracker.sign_in(Session::new("alice"));
    assert!(tracker.applications().is_empty());

    tracker.sign_in(Session::new("bob"));
    assert_eq!(tracker.applications().len(), 1);

    tracker.sign_out();
    assert!(tracker.applications().is_empty());
}

#[test]
fn filtered_view_after_updates_is_most_recent_first() {
    let mut tracker = signed_in();
    let engineer = tracker.add(fields("Engineer", "Acme")).unwrap();
    let mut designer = fields("Designer", "Acme");
    designer.platform = Platform::Referral;
    let designer = tracker.add(designer).unwrap();
    tracker.add(fields("Analyst", "Globex")).unwrap();

    assert!(tracker.set_status(designer.id, Status::Offer));

    let filter = Filter {
        search: "ACME".to_string(),
        ..Filter::default()
    };
    let shown = visible(tracker.applications(), &filter);
    let ids: Vec<Uuid> = shown.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![designer.id, engineer.id]);
}

#[test]
fn export_uses_current_local_order() {
    let mut tracker = signed_in();
    tracker.add(fields("First", "Acme")).unwrap();
    tracker.add(fields("Second", "Acme")).unwrap();

    let export = tracker.export_csv(day(4));
    assert_eq!(export.file_name, "job-applications-2024-01-04.csv");

    let lines: Vec<&str> = export.contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("\"Second\""));
    assert!(lines[2].starts_with("\"First\""));
    assert!(lines[1].contains("\"Said \"\"great fit\"\"\""));
}
