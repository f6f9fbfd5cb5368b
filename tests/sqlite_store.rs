use chrono::NaiveDate;
use jobtrack::db::SqliteStore;
use jobtrack::models::{ApplicationPatch, EmploymentType, NewApplication, Platform, Status};
use jobtrack::store::ApplicationStore;
use uuid::Uuid;

fn full_fields() -> NewApplication {
    let mut f = NewApplication::new(
        "Platform Engineer",
        "Globex",
        Platform::Recruiter,
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
    );
    f.location = "Lisbon".to_string();
    f.employment_type = EmploymentType::Contract;
    f.status = Status::Screening;
    f.job_url = Some("https://globex.example/careers/42".to_string());
    f.last_contact_date = NaiveDate::from_ymd_opt(2024, 1, 5);
    f.follow_up_due_date = NaiveDate::from_ymd_opt(2024, 1, 12);
    f.next_action = Some("prepare system design".to_string());
    f.contact_name = Some("Sam".to_string());
    f.contact_email = Some("sam@globex.example".to_string());
    f.contact_linkedin = Some("https://linkedin.com/in/sam".to_string());
    f.notes = Some("Said \"great fit\"".to_string());
    f.salary_range = Some("€80-95k".to_string());
    f.key_requirements = Some("Kubernetes, Terraform".to_string());
    f
}

#[test]
fn records_survive_reopening_the_database() {
    let path = std::env::temp_dir().join(format!("jobtrack-test-{}.db", Uuid::new_v4()));

    let created = {
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        store.create("alice", &full_fields()).unwrap()
    };

    let store = SqliteStore::open(&path).unwrap();
    let listed = store.list("alice").unwrap();
    assert_eq!(listed, vec![created]);

    drop(store);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn every_field_round_trips() {
    let store = SqliteStore::open_in_memory().unwrap();
    let created = store.create("alice", &full_fields()).unwrap();
    let listed = store.list("alice").unwrap();
    assert_eq!(listed[0], created);
    assert_eq!(created.created_at, created.updated_at);
}

#[test]
fn patches_set_and_clear_independently() {
    let store = SqliteStore::open_in_memory().unwrap();
    let created = store.create("alice", &full_fields()).unwrap();

    let patch = ApplicationPatch {
        company: Some("Globex Corp".to_string()),
        contact_email: Some(None),
        follow_up_due_date: Some(NaiveDate::from_ymd_opt(2024, 1, 15)),
        ..ApplicationPatch::default()
    };
    store.update("alice", created.id, &patch).unwrap();

    let stored = store.list("alice").unwrap().remove(0);
    assert_eq!(stored.company, "Globex Corp");
    assert_eq!(stored.contact_email, None);
    assert_eq!(stored.follow_up_due_date, NaiveDate::from_ymd_opt(2024, 1, 15));
    assert_eq!(stored.contact_name, created.contact_name);
    assert_eq!(stored.notes, created.notes);
    assert!(stored.updated_at > created.updated_at);
}

#[test]
fn rapid_updates_keep_increasing_updated_at() {
    let store = SqliteStore::open_in_memory().unwrap();
    let created = store.create("alice", &full_fields()).unwrap();

    let mut last = created.updated_at;
    for status in [Status::Interview1, Status::Interview2, Status::Offer] {
        store
            .update("alice", created.id, &ApplicationPatch::status(status))
            .unwrap();
        let now = store.list("alice").unwrap()[0].updated_at;
        assert!(now > last);
        last = now;
    }
}

#[test]
fn missing_ids_report_not_found() {
    let store = SqliteStore::open_in_memory().unwrap();
    let id = Uuid::new_v4();
    assert!(store.delete("alice", id).unwrap_err().is_not_found());
    assert!(store
        .update("alice", id, &ApplicationPatch::status(Status::Offer))
        .unwrap_err()
        .is_not_found());
}
