use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{Config, Endpoint};
use crate::error::{Result, TickError};
use crate::model::{NewTask, Scope, Task, TaskPatch};
use crate::remote::{TaskBackend, error_message};
use crate::session::AuthContext;
use crate::task_id::TaskId;

/// Task table exposed over the hosted service's REST interface
/// (`/rest/v1/<table>`, PostgREST filter syntax).
///
/// Requests carry the signed-in user's access token when there is one, so
/// row-level security applies; otherwise the anon key.
pub struct RestBackend {
    client: Client,
    endpoint: Endpoint,
    table: String,
    auth: AuthContext,
}

impl RestBackend {
    pub fn new(config: &Config, auth: AuthContext) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint,
            table: config.table.clone(),
            auth,
        })
    }

    fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}", self.endpoint.url, self.table)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let bearer = self
            .auth
            .current()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.endpoint.anon_key.clone());

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.endpoint.anon_key)?);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            header_value(&format!("Bearer {bearer}"))?,
        );
        headers.insert("prefer", HeaderValue::from_static("return=representation"));
        Ok(headers)
    }

    fn request(&self, method: reqwest::Method, query: &[(&str, String)]) -> Result<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.rows_url())
            .headers(self.headers()?)
            .query(query))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().map_err(TickError::remote)?;
        let status = response.status();
        let body = response.text().map_err(TickError::remote)?;
        debug!(status = status.as_u16(), bytes = body.len(), "rest response");

        if !status.is_success() {
            return Err(TickError::Remote(error_message(status.as_u16(), &body)));
        }
        serde_json::from_str(&body)
            .map_err(|e| TickError::Remote(format!("unexpected response from backend: {e}")))
    }

    /// Mutations return the affected rows; none means the id matched nothing.
    fn single_row(&self, id: &TaskId, rows: Vec<Task>) -> Result<Task> {
        rows.into_iter()
            .next()
            .ok_or_else(|| TickError::Remote(format!("no task with id {id}")))
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| TickError::NotConfigured)
}

/// PostgREST query parameters for a fetch, ordered by id.
pub fn select_query(scope: &Scope) -> Vec<(&'static str, String)> {
    let mut query = vec![("select", "*".to_string()), ("order", "id.asc".to_string())];
    if let Scope::Owner(user) = scope {
        query.push((
            "or",
            format!("(assigned_to.eq.{user},created_by.eq.{user})"),
        ));
    }
    query
}

pub fn id_query(id: &TaskId) -> Vec<(&'static str, String)> {
    vec![("id", format!("eq.{id}"))]
}

impl TaskBackend for RestBackend {
    fn select_all(&self, scope: &Scope) -> Result<Vec<Task>> {
        debug!(table = %self.table, ?scope, "select tasks");
        let request = self.request(reqwest::Method::GET, &select_query(scope))?;
        self.send(request)
    }

    fn insert(&self, task: &NewTask) -> Result<Task> {
        debug!(table = %self.table, title = %task.title, "insert task");
        let request = self
            .request(reqwest::Method::POST, &[("select", "*".to_string())])?
            .json(&[task]);
        let rows: Vec<Task> = self.send(request)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| TickError::Remote("insert returned no row".into()))
    }

    fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        debug!(table = %self.table, %id, ?patch, "update task");
        let request = self
            .request(reqwest::Method::PATCH, &id_query(id))?
            .json(patch);
        let rows = self.send(request)?;
        self.single_row(id, rows)
    }

    fn delete(&self, id: &TaskId) -> Result<()> {
        debug!(table = %self.table, %id, "delete task");
        let request = self.request(reqwest::Method::DELETE, &id_query(id))?;
        let rows = self.send(request)?;
        self.single_row(id, rows).map(|_| ())
    }
}
