use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::conf::Settings;
use crate::error::StoreError;
use crate::models::{
    next_updated_at, timestamp_now, ApplicationPatch, JobApplication, NewApplication,
};
use crate::store::{
    format_timestamp, parse_timestamp, patch_columns, ApplicationRow, ApplicationStore,
    InsertRow, TABLE,
};

// --- PostgREST-style remote table ---

/// Talks to a hosted Postgres table through its REST gateway. Row-level
/// ownership is enforced twice: the access token identifies the user to the
/// gateway, and every query carries an explicit `user_id` filter.
#[derive(Debug)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    access_token: String,
    client: Client,
}

/// Status and body of a completed exchange.
#[derive(Debug)]
struct Reply {
    status: StatusCode,
    body: String,
}

#[derive(Debug, Deserialize)]
struct Stamp {
    updated_at: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, access_token: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: access_token.unwrap_or(api_key).to_string(),
            client: Client::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings
            .rest_url
            .as_deref()
            .ok_or_else(|| anyhow!("rest backend selected but JOBTRACK_REST_URL is not set"))?;
        let api_key = settings
            .rest_api_key
            .as_deref()
            .context("rest backend selected but JOBTRACK_REST_API_KEY is not set")?;
        Ok(Self::new(base_url, api_key, settings.rest_access_token.as_deref()))
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
            .header("content-type", "application/json")
    }

    fn returning(&self, builder: RequestBuilder) -> RequestBuilder {
        self.request(builder).header("Prefer", "return=representation")
    }

    // --- Requests ---

    fn list_request(&self, owner: &str) -> RequestBuilder {
        self.request(self.client.get(self.endpoint())).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(owner)),
            ("order", "updated_at.desc".to_string()),
        ])
    }

    fn create_request(&self, owner: &str, fields: &NewApplication) -> RequestBuilder {
        self.returning(self.client.post(self.endpoint()))
            .json(&InsertRow::new(owner, fields))
    }

    fn stamp_request(&self, owner: &str, id: Uuid) -> RequestBuilder {
        self.request(self.client.get(self.endpoint())).query(&[
            ("select", "updated_at".to_string()),
            ("id", eq(&id.to_string())),
            ("user_id", eq(owner)),
        ])
    }

    fn update_request(&self, owner: &str, id: Uuid, body: &Value) -> RequestBuilder {
        self.returning(self.client.patch(self.endpoint()))
            .query(&[("id", eq(&id.to_string())), ("user_id", eq(owner))])
            .json(body)
    }

    fn delete_request(&self, owner: &str, id: Uuid) -> RequestBuilder {
        self.returning(self.client.delete(self.endpoint()))
            .query(&[("id", eq(&id.to_string())), ("user_id", eq(owner))])
    }

    fn send(builder: RequestBuilder) -> Result<Reply, StoreError> {
        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        Ok(Reply { status, body })
    }

    // --- Replies ---

    fn check(reply: Reply) -> Result<String, StoreError> {
        if reply.status.is_success() {
            return Ok(reply.body);
        }
        Err(StoreError::Rejected {
            status: reply.status.as_u16(),
            body: reply.body,
        })
    }

    fn decode<T: DeserializeOwned>(reply: Reply) -> Result<Vec<T>, StoreError> {
        let body = Self::check(reply)?;
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn rows(reply: Reply) -> Result<Vec<JobApplication>, StoreError> {
        let rows: Vec<ApplicationRow> = Self::decode(reply)?;
        rows.into_iter().map(JobApplication::try_from).collect()
    }

    /// A write that matched no row for this owner.
    fn affected(reply: Reply, id: Uuid) -> Result<(), StoreError> {
        let rows: Vec<Value> = Self::decode(reply)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    fn previous_updated_at(&self, owner: &str, id: Uuid) -> Result<DateTime<Utc>, StoreError> {
        let stamps: Vec<Stamp> = Self::decode(Self::send(self.stamp_request(owner, id))?)?;
        let stamp = stamps
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { id })?;
        parse_timestamp(&stamp.updated_at)
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// JSON body for a PATCH: only the supplied columns plus `updated_at`.
/// Cleared optionals are sent as explicit nulls.
pub fn patch_body(patch: &ApplicationPatch, updated_at: DateTime<Utc>) -> Value {
    let mut body = Map::new();
    for (column, value) in patch_columns(patch) {
        body.insert(column.to_string(), value.map(Value::String).unwrap_or(Value::Null));
    }
    body.insert(
        "updated_at".to_string(),
        Value::String(format_timestamp(updated_at)),
    );
    Value::Object(body)
}

impl ApplicationStore for RestStore {
    fn list(&self, owner: &str) -> Result<Vec<JobApplication>, StoreError> {
        Self::rows(Self::send(self.list_request(owner))?)
    }

    fn create(&self, owner: &str, fields: &NewApplication) -> Result<JobApplication, StoreError> {
        Self::rows(Self::send(self.create_request(owner, fields))?)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    /// The row's own `updated_at` is read first so the new value is strictly
    /// later, whatever the local clock says.
    fn update(&self, owner: &str, id: Uuid, patch: &ApplicationPatch) -> Result<(), StoreError> {
        let previous = self.previous_updated_at(owner, id)?;
        let body = patch_body(patch, next_updated_at(previous, timestamp_now()));
        Self::affected(Self::send(self.update_request(owner, id, &body))?, id)
    }

    fn delete(&self, owner: &str, id: Uuid) -> Result<(), StoreError> {
        Self::affected(Self::send(self.delete_request(owner, id))?, id)
    }

    fn backend_name(&self) -> &str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, Status};
    use chrono::NaiveDate;
    use reqwest::Method;

    fn store() -> RestStore {
        RestStore::new("https://example.supabase.co/", "anon", Some("user-token"))
    }

    fn query(builder: RequestBuilder) -> (Method, Vec<(String, String)>) {
        let request = builder.build().unwrap();
        let pairs = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        (request.method().clone(), pairs)
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let store = RestStore::new("https://example.supabase.co/", "anon", None);
        assert_eq!(
            store.endpoint(),
            "https://example.supabase.co/rest/v1/job_applications"
        );
        assert_eq!(store.access_token, "anon");
    }

    #[test]
    fn every_request_is_scoped_to_the_owner() {
        let store = store();
        let id = Uuid::new_v4();
        let id_filter = pair("id", &format!("eq.{}", id));
        let owner_filter = pair("user_id", "eq.alice");

        let (method, list) = query(store.list_request("alice"));
        assert_eq!(method, Method::GET);
        assert!(list.contains(&owner_filter));
        assert!(list.contains(&pair("order", "updated_at.desc")));

        let (_, stamp) = query(store.stamp_request("alice", id));
        assert!(stamp.contains(&owner_filter));
        assert!(stamp.contains(&id_filter));
        assert!(stamp.contains(&pair("select", "updated_at")));

        let body = patch_body(&ApplicationPatch::status(Status::Offer), timestamp_now());
        let (method, update) = query(store.update_request("alice", id, &body));
        assert_eq!(method, Method::PATCH);
        assert!(update.contains(&owner_filter));
        assert!(update.contains(&id_filter));

        let (method, delete) = query(store.delete_request("alice", id));
        assert_eq!(method, Method::DELETE);
        assert!(delete.contains(&owner_filter));
        assert!(delete.contains(&id_filter));
    }

    #[test]
    fn writes_ask_for_the_affected_rows_back() {
        let store = store();
        let fields = NewApplication::new(
            "Engineer",
            "Acme",
            Platform::Linkedin,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        let request = store.create_request("alice", &fields).build().unwrap();
        let headers = request.headers();
        assert_eq!(headers["Prefer"], "return=representation");
        assert_eq!(headers["apikey"], "anon");
        assert_eq!(headers["authorization"], "Bearer user-token");

        let sent: Value = serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(sent["user_id"], "alice");
        assert_eq!(sent["status"], "applied");
    }

    #[test]
    fn patch_body_carries_only_supplied_columns() {
        let patch = ApplicationPatch {
            status: Some(Status::Rejected),
            follow_up_due_date: Some(None),
            ..ApplicationPatch::default()
        };
        let at = timestamp_now();
        let body = patch_body(&patch, at);
        let obj = body.as_object().unwrap();

        assert_eq!(obj.len(), 3);
        assert_eq!(obj["status"], "rejected");
        assert!(obj["follow_up_due_date"].is_null());
        assert_eq!(obj["updated_at"], format_timestamp(at));
    }

    #[test]
    fn empty_representation_means_not_found() {
        let id = Uuid::new_v4();
        let err = RestStore::affected(reply(200, "[]"), id).unwrap_err();
        assert!(err.is_not_found());
        assert!(RestStore::affected(reply(200, r#"[{"id":"x"}]"#), id).is_ok());
    }

    #[test]
    fn error_statuses_are_rejections() {
        let err = RestStore::rows(reply(409, "duplicate key")).unwrap_err();
        match err {
            StoreError::Rejected { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, "duplicate key");
            }
            other => panic!("unexpected error: {other}"),
        }
        let err = RestStore::affected(reply(401, "JWT expired"), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 401, .. }));
    }

    #[test]
    fn rows_decode_and_reject_unknown_values() {
        let app = NewApplication::new(
            "Engineer",
            "Acme",
            Platform::Referral,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
        .into_application(Uuid::new_v4(), timestamp_now());
        let mut row = ApplicationRow::new("alice", &app);
        let body = serde_json::to_string(&vec![row.clone()]).unwrap();
        assert_eq!(RestStore::rows(reply(200, &body)).unwrap(), vec![app]);

        row.status = "ghosted".to_string();
        let body = serde_json::to_string(&vec![row]).unwrap();
        assert!(matches!(
            RestStore::rows(reply(200, &body)).unwrap_err(),
            StoreError::Decode(_)
        ));
        assert!(matches!(
            RestStore::rows(reply(200, "not json")).unwrap_err(),
            StoreError::Decode(_)
        ));
    }

    #[test]
    fn owner_filter_uses_equality_operator() {
        assert_eq!(eq("user-42"), "eq.user-42");
    }
}
