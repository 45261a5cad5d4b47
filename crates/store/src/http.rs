//! REST persistence API client.
//!
//! ```text
//! GET    {base}/annotations?file=<id>     (or {base}/annotations/file/<id>)
//! POST   {base}/annotations
//! PUT    {base}/annotations/<id>
//! DELETE {base}/annotations/<id>
//! ```

use markup_model::{AnnotationId, FileId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::record::AnnotationRecord;
use crate::store::{AnnotationStore, StoreError};

/// How the list-by-file route is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    /// `annotations?file=<id>`
    #[default]
    Query,
    /// `annotations/file/<id>`
    Path,
}

pub struct HttpStore {
    base_url: String,
    list_style: ListStyle,
    agent: ureq::Agent,
    bearer: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, list_style: ListStyle, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { base_url, list_style, agent, bearer: None }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, file_id: FileId) -> String {
        match self.list_style {
            ListStyle::Query => format!("{}/annotations?file={}", self.base_url, file_id.0),
            ListStyle::Path => format!("{}/annotations/file/{}", self.base_url, file_id.0),
        }
    }

    fn item_url(&self, id: AnnotationId) -> String {
        format!("{}/annotations/{}", self.base_url, id)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let request = self.agent.request(method, url).set("Accept", "application/json");
        match &self.bearer {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn send_json(
        &self,
        method: &str,
        url: &str,
        record: &AnnotationRecord,
    ) -> Result<ureq::Response, StoreError> {
        let body = serde_json::to_string(&record.without_id())?;
        tracing::debug!(method, url, "annotation request");
        self.request(method, url)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(map_error)
    }
}

fn map_error(err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            StoreError::Http { status, body }
        }
        ureq::Error::Transport(transport) => StoreError::Transport(transport.to_string()),
    }
}

fn read_body(response: ureq::Response) -> Result<String, StoreError> {
    response.into_string().map_err(StoreError::Io)
}

impl AnnotationStore for HttpStore {
    fn create(&mut self, record: &AnnotationRecord) -> Result<AnnotationRecord, StoreError> {
        let url = format!("{}/annotations", self.base_url);
        let response = self.send_json("POST", &url, record)?;
        Ok(serde_json::from_str(&read_body(response)?)?)
    }

    fn update(&mut self, id: AnnotationId, record: &AnnotationRecord) -> Result<(), StoreError> {
        self.send_json("PUT", &self.item_url(id), record)?;
        Ok(())
    }

    fn delete(&mut self, id: AnnotationId) -> Result<(), StoreError> {
        let url = self.item_url(id);
        tracing::debug!(method = "DELETE", url = %url, "annotation request");
        self.request("DELETE", &url).call().map_err(map_error)?;
        Ok(())
    }

    fn list_by_file(&self, file_id: FileId) -> Result<Vec<AnnotationRecord>, StoreError> {
        let url = self.list_url(file_id);
        match self.request("GET", &url).call() {
            Ok(response) => Ok(serde_json::from_str(&read_body(response)?)?),
            Err(ureq::Error::Status(404, _)) => {
                tracing::debug!(file_id = file_id.0, "no annotations yet");
                Ok(Vec::new())
            }
            Err(err) => Err(map_error(err)),
        }
    }
}
