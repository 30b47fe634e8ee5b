use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::models::{ActivityEntry, ChecklistItem, TaskCounts};
use super::normalize::id_from_value;
use super::remote::*;
use crate::config::RemoteConfig;
use crate::errors::{BoardError, Result};

const LIST_PROJECTS: &str = "projects";
const LIST_COLUMNS: &str = "columns";
const LIST_TASKS: &str = "tasks";
const COUNT_TASKS: &str = "tasks/count";
const CREATE_PROJECT: &str = "projects/create";
const UPDATE_PROJECT: &str = "projects/update";
const CREATE_COLUMN: &str = "columns/create";
const UPDATE_COLUMN: &str = "columns/update";
const DELETE_COLUMN: &str = "columns/delete";
const CREATE_TASK: &str = "tasks/create";
const UPDATE_TASK: &str = "tasks/update";
const DELETE_TASK: &str = "tasks/delete";
const SAVE_CHECKLIST: &str = "tasks/checklist";
const LOG_ACTIVITY: &str = "activity/create";

/// Error bodies longer than this are cut before they reach logs.
const MAX_ERROR_BODY: usize = 512;

/// `RemoteBoard` over JSON/HTTP, one endpoint per operation.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct WithId<'a, T: Serialize> {
    id: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("taskboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value> {
        debug!(endpoint, "GET");
        let request = self.authorize(self.client.get(self.url(endpoint)).query(query));
        let response = request.send().await.map_err(|source| BoardError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        read_body(endpoint, response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value> {
        debug!(endpoint, "POST");
        let request = self.authorize(self.client.post(self.url(endpoint)).json(body));
        let response = request.send().await.map_err(|source| BoardError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        read_body(endpoint, response).await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let body = self.get(endpoint, query).await?;
        rows(endpoint, body)?
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| BoardError::malformed(endpoint, e.to_string()))
            })
            .collect()
    }

    async fn create<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<String> {
        let response = self.post(endpoint, body).await?;
        created_id(endpoint, &response)
    }
}

async fn read_body(endpoint: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(|source| BoardError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;

    if !status.is_success() {
        let mut body = text;
        if body.len() > MAX_ERROR_BODY {
            body.truncate(body.floor_char_boundary(MAX_ERROR_BODY));
        }
        return Err(BoardError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| BoardError::malformed(endpoint, e.to_string()))
}

/// List bodies arrive as an array, as `{"data": [...]}`, as a single row
/// object, or empty.
fn rows(endpoint: &str, body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(BoardError::malformed(
                endpoint,
                format!("expected array under \"data\", got {}", type_name(&other)),
            )),
            None => Ok(vec![Value::Object(map)]),
        },
        other => Err(BoardError::malformed(
            endpoint,
            format!("expected array, got {}", type_name(&other)),
        )),
    }
}

/// Create responses are `{"id": ..}` or a one-element array of that.
fn created_id(endpoint: &str, body: &Value) -> Result<String> {
    let row = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    row.and_then(|r| r.get("id"))
        .and_then(id_from_value)
        .ok_or_else(|| BoardError::malformed(endpoint, "create response has no id"))
}

fn counts_from_body(endpoint: &str, body: Value) -> Result<HashMap<String, TaskCounts>> {
    let parse = |v: Value| {
        serde_json::from_value::<TaskCounts>(v)
            .map_err(|e| BoardError::malformed(endpoint, e.to_string()))
    };
    match body {
        Value::Null => Ok(HashMap::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| -> Result<(String, TaskCounts)> {
                let project_id = item
                    .get("projectId")
                    .or_else(|| item.get("project_id"))
                    .and_then(id_from_value)
                    .ok_or_else(|| BoardError::malformed(endpoint, "count row has no projectId"))?;
                Ok((project_id, parse(item)?))
            })
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(project_id, counts)| -> Result<(String, TaskCounts)> {
                Ok((project_id, parse(counts)?))
            })
            .collect(),
        other => Err(BoardError::malformed(
            endpoint,
            format!("expected object, got {}", type_name(&other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl RemoteBoard for HttpRemote {
    #[instrument(skip(self))]
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        self.list(LIST_PROJECTS, &[]).await
    }

    #[instrument(skip(self))]
    async fn list_columns(&self, project_id: &str) -> Result<Vec<ColumnRecord>> {
        self.list(LIST_COLUMNS, &[("projectId", project_id)]).await
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<TaskRecord>> {
        self.list(LIST_TASKS, &[("projectId", project_id)]).await
    }

    #[instrument(skip(self))]
    async fn count_tasks(&self) -> Result<HashMap<String, TaskCounts>> {
        let body = self.get(COUNT_TASKS, &[]).await?;
        counts_from_body(COUNT_TASKS, body)
    }

    async fn create_project(&self, project: &NewProject) -> Result<String> {
        self.create(CREATE_PROJECT, project).await
    }

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<()> {
        self.post(UPDATE_PROJECT, &WithId { id, body: patch }).await?;
        Ok(())
    }

    async fn create_column(&self, column: &NewColumn) -> Result<String> {
        self.create(CREATE_COLUMN, column).await
    }

    async fn update_column(&self, id: &str, patch: &ColumnPatch) -> Result<()> {
        self.post(UPDATE_COLUMN, &WithId { id, body: patch }).await?;
        Ok(())
    }

    async fn delete_column(&self, id: &str) -> Result<()> {
        self.post(DELETE_COLUMN, &json!({ "id": id })).await?;
        Ok(())
    }

    async fn create_task(&self, task: &NewTask) -> Result<String> {
        self.create(CREATE_TASK, task).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        self.post(UPDATE_TASK, &WithId { id, body: patch }).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.post(DELETE_TASK, &json!({ "id": id })).await?;
        Ok(())
    }

    async fn save_checklist(&self, task_id: &str, items: &[ChecklistItem]) -> Result<()> {
        self.post(SAVE_CHECKLIST, &json!({ "taskId": task_id, "checklist": items }))
            .await?;
        Ok(())
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.post(LOG_ACTIVITY, entry).await?;
        Ok(())
    }
}
