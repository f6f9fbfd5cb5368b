use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, StoreError};
use crate::export::CsvExport;
use crate::models::{
    next_updated_at, timestamp_now, ApplicationPatch, JobApplication, NewApplication, Status,
};
use crate::store::ApplicationStore;

/// Identity of the signed-in user. Handed to the tracker explicitly; the
/// tracker never looks for it anywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Immutable view of the application list at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    version: u64,
    applications: Arc<Vec<JobApplication>>,
}

impl Snapshot {
    /// Bumped on every publish, so consumers can skip recomputation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn applications(&self) -> &[JobApplication] {
        &self.applications
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}

/// One-shot message for the user about something that did not work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub summary: &'static str,
    pub detail: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// An outstanding list load, stamped with the session it was started for.
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    owner: String,
}

impl LoadTicket {
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

type Subscriber = Box<dyn FnMut(&Snapshot)>;

/// In-process source of truth for the signed-in user's applications.
///
/// The store is authoritative: local state only changes after the store
/// call for a mutation has succeeded. Failures never escape as errors;
/// they are logged and queued as [`Notice`]s for the caller to show.
pub struct Tracker {
    store: Box<dyn ApplicationStore>,
    session: Option<Session>,
    generation: u64,
    loading: bool,
    snapshot: Snapshot,
    notices: Vec<Notice>,
    subscribers: Vec<Subscriber>,
}

impl Tracker {
    pub fn new(store: Box<dyn ApplicationStore>) -> Self {
        Self {
            store,
            session: None,
            generation: 0,
            loading: false,
            snapshot: Snapshot::default(),
            notices: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn store(&self) -> &dyn ApplicationStore {
        self.store.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    pub fn applications(&self) -> &[JobApplication] {
        self.snapshot.applications()
    }

    /// Called with every newly published snapshot.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&Snapshot) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // --- Session lifecycle ---

    /// Switch to `session` and load its applications. Anything shown for a
    /// previous identity is dropped first.
    pub fn sign_in(&mut self, session: Session) {
        tracing::info!("session established for {}", session.user_id());
        self.reset_session(Some(session));
        self.load();
    }

    pub fn sign_out(&mut self) {
        if let Some(session) = &self.session {
            tracing::info!("session ended for {}", session.user_id());
        }
        self.reset_session(None);
    }

    fn reset_session(&mut self, session: Option<Session>) {
        self.session = session;
        self.generation += 1;
        self.loading = false;
        self.publish(Vec::new());
    }

    /// Start a load for the current session. `None` when signed out.
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        let owner = self.session.as_ref()?.user_id().to_string();
        self.loading = true;
        Some(LoadTicket {
            generation: self.generation,
            owner,
        })
    }

    /// Apply the outcome of a load. Results for a session that has since
    /// ended or changed are dropped; returns whether the result was used.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<JobApplication>, StoreError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!("dropping stale load for {}", ticket.owner);
            return false;
        }
        self.loading = false;
        match result {
            Ok(applications) => {
                tracing::debug!("loaded {} applications", applications.len());
                self.publish(applications);
            }
            Err(e) => {
                self.notify("Failed to load applications", &e);
                self.publish(Vec::new());
            }
        }
        true
    }

    pub fn load(&mut self) {
        if let Some(ticket) = self.begin_load() {
            let result = self.store.list(ticket.owner());
            self.finish_load(ticket, result);
        }
    }

    // --- Mutations ---

    pub fn add(&mut self, mut fields: NewApplication) -> Option<JobApplication> {
        let owner = self.owner().ok()?;
        fields.normalize();
        if let Err(e) = fields.validate() {
            self.notify("Application not saved", &e);
            return None;
        }

        match self.store.create(&owner, &fields) {
            Ok(app) => {
                tracing::info!("added application {} ({} at {})", app.id, app.job_title, app.company);
                let mut applications = Vec::with_capacity(self.snapshot.len() + 1);
                applications.push(app.clone());
                applications.extend(self.applications().iter().cloned());
                self.publish(applications);
                Some(app)
            }
            Err(e) => {
                self.notify("Failed to add application", &e);
                None
            }
        }
    }

    pub fn update(&mut self, id: Uuid, mut patch: ApplicationPatch) -> bool {
        let Ok(owner) = self.owner() else {
            return false;
        };
        patch.normalize();
        if let Err(e) = patch.validate() {
            self.notify("Application not saved", &e);
            return false;
        }

        match self.store.update(&owner, id, &patch) {
            Ok(()) => {
                let mut applications = self.applications().to_vec();
                let Some(app) = applications.iter_mut().find(|a| a.id == id) else {
                    tracing::debug!("updated application {} is not in the local list", id);
                    return true;
                };
                patch.apply_to(app);
                app.updated_at = next_updated_at(app.updated_at, timestamp_now());
                tracing::info!("updated application {}", id);
                self.publish(applications);
                true
            }
            Err(e) => {
                self.notify("Failed to update application", &e);
                false
            }
        }
    }

    /// Move an application to another kanban column.
    pub fn set_status(&mut self, id: Uuid, status: Status) -> bool {
        self.update(id, ApplicationPatch::status(status))
    }

    /// Remove an application. An id the store no longer knows about is
    /// already gone, which is what the caller asked for.
    pub fn delete(&mut self, id: Uuid) -> bool {
        let Ok(owner) = self.owner() else {
            return false;
        };

        match self.store.delete(&owner, id) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("application {} was already deleted", id);
            }
            Err(e) => {
                self.notify("Failed to delete application", &e);
                return false;
            }
        }

        let applications: Vec<JobApplication> = self
            .applications()
            .iter()
            .filter(|a| a.id != id)
            .cloned()
            .collect();
        tracing::info!("deleted application {}", id);
        self.publish(applications);
        true
    }

    // --- Queries ---

    /// Look up an application by full id or unambiguous id prefix.
    pub fn find(&self, key: &str) -> Option<&JobApplication> {
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        let mut matches = self
            .applications()
            .iter()
            .filter(|a| a.id.to_string().starts_with(&key));
        let first = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// CSV of the current local list, in its current order.
    pub fn export_csv(&self, today: NaiveDate) -> CsvExport {
        CsvExport::new(self.applications(), today)
    }

    // --- Internals ---

    fn owner(&self) -> Result<String, Error> {
        match &self.session {
            Some(session) => Ok(session.user_id().to_string()),
            None => {
                tracing::warn!("{}; ignoring request", Error::AuthRequired);
                Err(Error::AuthRequired)
            }
        }
    }

    fn notify(&mut self, summary: &'static str, err: &dyn fmt::Display) {
        tracing::warn!("{}: {}", summary, err);
        self.notices.push(Notice {
            summary,
            detail: err.to_string(),
        });
    }

    fn publish(&mut self, applications: Vec<JobApplication>) {
        self.snapshot = Snapshot {
            version: self.snapshot.version + 1,
            applications: Arc::new(applications),
        };
        for subscriber in &mut self.subscribers {
            subscriber(&self.snapshot);
        }
    }
}
