//! GridFTP endpoints driven through the Globus Transfer API.
//!
//! `gsiftp://ENDPOINT_ID/some%20path/` names a location on a Globus endpoint.
//! Bytes never pass through this process: resources expose a [`Delegation`]
//! whose control plane submits, polls and cancels transfer tasks.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::data::{Credential, Protocol, Selection, Stat, TransferCapability};
use crate::effects::{
    ControlPlane, Delegation, Drain, RemoteLocation, Resource, Session, Tap, TaskDetail, TaskId,
    TaskStatus, join_path,
};
use crate::error::{Error, Result};

pub const TRANSFER_API: &str = "https://transfer.api.globus.org/v0.10";

/// Decoded path component of a GridFTP URI, scheme and endpoint stripped.
pub fn path_from_uri(uri: &Url) -> String {
    let decoded = percent_decode_str(uri.path()).decode_utf8_lossy().into_owned();
    if decoded.is_empty() { "/".to_string() } else { decoded }
}

#[derive(Debug, Deserialize)]
struct SubmissionId {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct TaskDocument {
    status:            TaskStatus,
    #[serde(default)]
    bytes_transferred: u64,
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(rename = "DATA")]
    data: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
}

impl ListingEntry {
    fn is_dir(&self) -> bool { self.kind == "dir" }
}

/// Globus Transfer REST client.
pub struct GlobusClient {
    http:  reqwest::Client,
    token: String,
    base:  String,
}

impl GlobusClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http:  reqwest::Client::new(),
            token: token.into(),
            base:  TRANSFER_API.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn ls(&self, endpoint: &str, path: &str) -> Result<Vec<ListingEntry>> {
        let request = self
            .http
            .get(format!("{}/operation/endpoint/{endpoint}/ls", self.base))
            .query(&[("path", path)]);
        let listing: Listing = self.send(request).await?;
        Ok(listing.data)
    }

    fn stat_dir(self: Arc<Self>, endpoint: String, path: String, name: String) -> BoxFuture<'static, Result<Stat>> {
        async move {
            let mut children = Vec::new();
            for entry in self.ls(&endpoint, &path).await? {
                if entry.is_dir() {
                    let child = format!("{}/", join_path(&path, &entry.name));
                    children.push(Arc::clone(&self).stat_dir(endpoint.clone(), child, entry.name).await?);
                } else {
                    children.push(Stat::file(entry.name, entry.size));
                }
            }
            children.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(Stat::dir(name, children))
        }
        .boxed()
    }
}

#[async_trait]
impl ControlPlane for GlobusClient {
    async fn submit(&self, source: &RemoteLocation, destination: &RemoteLocation) -> Result<TaskId> {
        let submission: SubmissionId = self
            .send(self.http.get(format!("{}/submission_id", self.base)))
            .await?;
        let document = json!({
            "DATA_TYPE": "transfer",
            "submission_id": submission.value,
            "source_endpoint": source.endpoint,
            "destination_endpoint": destination.endpoint,
            "DATA": [{
                "DATA_TYPE": "transfer_item",
                "source_path": source.path,
                "destination_path": destination.path,
                "recursive": source.is_recursive(),
            }],
        });
        let result: SubmitResult = self
            .send(self.http.post(format!("{}/transfer", self.base)).json(&document))
            .await?;
        debug!(task = %result.task_id, "submitted transfer task");
        Ok(TaskId(result.task_id))
    }

    async fn task_detail(&self, task: &TaskId) -> Result<TaskDetail> {
        let doc: TaskDocument = self
            .send(self.http.get(format!("{}/task/{task}", self.base)))
            .await?;
        Ok(TaskDetail {
            bytes_transferred: doc.bytes_transferred,
            status:            doc.status,
        })
    }

    async fn cancel(&self, task: &TaskId) -> Result<()> {
        let _: serde_json::Value = self
            .send(self.http.post(format!("{}/task/{task}/cancel", self.base)))
            .await?;
        Ok(())
    }
}

pub struct GridFtpSession {
    uri:        Url,
    credential: Credential,
    base:       String,
    client:     Option<Arc<GlobusClient>>,
}

impl GridFtpSession {
    pub fn new(uri: Url, credential: Credential) -> Self {
        Self {
            uri,
            credential,
            base: TRANSFER_API.to_string(),
            client: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[async_trait]
impl Session for GridFtpSession {
    fn protocol(&self) -> Protocol { Protocol::GridFtp }

    fn uri(&self) -> &Url { &self.uri }

    async fn initialize(&mut self) -> Result<()> {
        let Credential::Globus { token } = &self.credential else {
            return Err(Error::AuthenticationRequired {
                protocol: Protocol::GridFtp,
                expected: "globus",
            });
        };
        self.client = Some(Arc::new(GlobusClient::new(token.clone()).with_base_url(&self.base)));
        Ok(())
    }

    async fn select(&self, selection: &Selection) -> Result<Arc<dyn Resource>> {
        let client = self
            .client
            .as_ref()
            .ok_or(Error::NotInitialized(Protocol::GridFtp))?;
        let endpoint = self
            .uri
            .host_str()
            .ok_or_else(|| Error::InvalidUri(format!("{} has no endpoint", self.uri)))?;
        let path = join_path(&path_from_uri(&self.uri), &selection.path);
        Ok(Arc::new(GridFtpResource {
            client: Arc::clone(client),
            location: RemoteLocation::new(endpoint, path),
        }))
    }
}

pub struct GridFtpResource {
    client:   Arc<GlobusClient>,
    location: RemoteLocation,
}

impl GridFtpResource {
    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported {
            protocol: Protocol::GridFtp,
            operation,
        }
    }
}

#[async_trait]
impl Resource for GridFtpResource {
    fn protocol(&self) -> Protocol { Protocol::GridFtp }

    fn path(&self) -> &str { &self.location.path }

    fn capability(&self) -> TransferCapability { TransferCapability::Delegated }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        Ok(Arc::new(GridFtpResource {
            client:   Arc::clone(&self.client),
            location: RemoteLocation::new(
                self.location.endpoint.clone(),
                join_path(&self.location.path, relative.trim_start_matches('/')),
            ),
        }))
    }

    fn delegation(&self) -> Option<Delegation> {
        Some(Delegation {
            plane:    Arc::clone(&self.client) as Arc<dyn ControlPlane>,
            location: self.location.clone(),
        })
    }

    async fn stat(&self) -> Result<Stat> {
        let RemoteLocation { endpoint, path } = &self.location;
        let trimmed = path.trim_end_matches('/');
        let (parent, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));

        if path.ends_with('/') || name.is_empty() {
            return Arc::clone(&self.client)
                .stat_dir(endpoint.clone(), path.clone(), name.to_string())
                .await;
        }

        let parent = format!("{parent}/");
        let entry = self
            .client
            .ls(endpoint, &parent)
            .await?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| Error::NotFound(format!("{endpoint}:{path}")))?;
        if entry.is_dir() {
            Arc::clone(&self.client)
                .stat_dir(endpoint.clone(), format!("{trimmed}/"), entry.name)
                .await
        } else {
            Ok(Stat::file(entry.name, entry.size))
        }
    }

    async fn tap(&self) -> Result<Box<dyn Tap>> { Err(self.unsupported("tap")) }

    async fn sink(&self) -> Result<Box<dyn Drain>> { Err(self.unsupported("sink")) }

    async fn sink_for(&self, _stat: &Stat) -> Result<Box<dyn Drain>> { Err(self.unsupported("sink")) }
}
