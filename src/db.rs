use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    next_updated_at, timestamp_now, ApplicationPatch, JobApplication, NewApplication,
};
use crate::store::{
    format_timestamp, parse_timestamp, patch_columns, ApplicationRow, ApplicationStore, COLUMNS,
    TABLE,
};

pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("could not create {}: {}", parent.display(), e);
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init()?;
        tracing::debug!("sqlite store opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS job_applications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                job_title TEXT NOT NULL CHECK (length(trim(job_title)) > 0),
                company TEXT NOT NULL CHECK (length(trim(company)) > 0),
                platform TEXT NOT NULL CHECK (platform IN ('linkedin', 'email', 'website', 'referral', 'recruiter', 'indeed', 'glassdoor', 'other')),
                location TEXT NOT NULL DEFAULT '',
                employment_type TEXT NOT NULL CHECK (employment_type IN ('full-time', 'part-time', 'contract', 'remote', 'hybrid')),
                date_applied TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('wishlist', 'applied', 'screening', 'interview1', 'interview2', 'offer', 'rejected', 'withdrawn')),
                job_url TEXT,
                last_contact_date TEXT,
                follow_up_due_date TEXT,
                next_action TEXT,
                contact_name TEXT,
                contact_email TEXT,
                contact_linkedin TEXT,
                notes TEXT,
                salary_range TEXT,
                key_requirements TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_applications_owner_updated
                ON job_applications(user_id, updated_at DESC);
            "#,
        )?;
        Ok(())
    }

    fn insert_row(&self, row: &ApplicationRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO {TABLE} ({COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
            ),
            params![
                row.id,
                row.user_id,
                row.job_title,
                row.company,
                row.platform,
                row.location,
                row.employment_type,
                row.date_applied,
                row.status,
                row.job_url,
                row.last_contact_date,
                row.follow_up_due_date,
                row.next_action,
                row.contact_name,
                row.contact_email,
                row.contact_linkedin,
                row.notes,
                row.salary_range,
                row.key_requirements,
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    }

    fn current_updated_at(&self, owner: &str, id: Uuid) -> Result<Option<String>, StoreError> {
        let updated_at = self
            .conn
            .query_row(
                &format!("SELECT updated_at FROM {TABLE} WHERE id = ?1 AND user_id = ?2"),
                params![id.to_string(), owner],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated_at)
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<ApplicationRow> {
        Ok(ApplicationRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            job_title: row.get(2)?,
            company: row.get(3)?,
            platform: row.get(4)?,
            location: row.get(5)?,
            employment_type: row.get(6)?,
            date_applied: row.get(7)?,
            status: row.get(8)?,
            job_url: row.get(9)?,
            last_contact_date: row.get(10)?,
            follow_up_due_date: row.get(11)?,
            next_action: row.get(12)?,
            contact_name: row.get(13)?,
            contact_email: row.get(14)?,
            contact_linkedin: row.get(15)?,
            notes: row.get(16)?,
            salary_range: row.get(17)?,
            key_requirements: row.get(18)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
        })
    }
}

impl ApplicationStore for SqliteStore {
    fn list(&self, owner: &str) -> Result<Vec<JobApplication>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM {TABLE} WHERE user_id = ?1 ORDER BY updated_at DESC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map([owner], Self::row_to_application)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(JobApplication::try_from).collect()
    }

    fn create(&self, owner: &str, fields: &NewApplication) -> Result<JobApplication, StoreError> {
        let app = fields.clone().into_application(Uuid::new_v4(), timestamp_now());
        self.insert_row(&ApplicationRow::new(owner, &app))?;
        tracing::debug!("inserted application {} for {}", app.id, owner);
        Ok(app)
    }

    fn update(&self, owner: &str, id: Uuid, patch: &ApplicationPatch) -> Result<(), StoreError> {
        let previous = self
            .current_updated_at(owner, id)?
            .ok_or(StoreError::NotFound { id })?;
        let previous = parse_timestamp(&previous)?;
        let updated_at = format_timestamp(next_updated_at(previous, timestamp_now()));

        let columns = patch_columns(patch);
        let mut sql = format!("UPDATE {TABLE} SET updated_at = ?1");
        let mut values: Vec<Option<String>> = vec![Some(updated_at)];
        for (column, value) in columns {
            values.push(value);
            sql.push_str(&format!(", {} = ?{}", column, values.len()));
        }
        sql.push_str(&format!(
            " WHERE id = ?{} AND user_id = ?{}",
            values.len() + 1,
            values.len() + 2
        ));
        values.push(Some(id.to_string()));
        values.push(Some(owner.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    fn delete(&self, owner: &str, id: Uuid) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {TABLE} WHERE id = ?1 AND user_id = ?2"),
            params![id.to_string(), owner],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, Status};
    use chrono::NaiveDate;

    fn fields(title: &str) -> NewApplication {
        NewApplication::new(
            title,
            "Acme",
            Platform::Linkedin,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
    }

    #[test]
    fn rows_are_scoped_to_their_owner() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mine = store.create("alice", &fields("Engineer")).unwrap();
        store.create("bob", &fields("Designer")).unwrap();

        let listed = store.list("alice").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        let err = store
            .update("bob", mine.id, &ApplicationPatch::status(Status::Offer))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.delete("bob", mine.id).unwrap_err().is_not_found());
        assert_eq!(store.list("alice").unwrap()[0].status, Status::Applied);
    }

    #[test]
    fn update_refreshes_updated_at_and_reorders() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.create("alice", &fields("Engineer")).unwrap();
        let second = store.create("alice", &fields("Designer")).unwrap();

        store
            .update("alice", first.id, &ApplicationPatch::status(Status::Screening))
            .unwrap();

        let listed = store.list("alice").unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert!(listed[0].updated_at > first.updated_at);
        assert_eq!(listed[0].created_at, first.created_at);
    }

    #[test]
    fn blank_titles_violate_the_table_constraint() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.create("alice", &fields("   ")).unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert!(store.list("alice").unwrap().is_empty());
    }
}
