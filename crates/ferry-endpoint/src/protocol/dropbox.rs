//! Dropbox API v2 endpoint (`dropbox:///path`).
//!
//! OAuth only. Downloads stream `files/download`; uploads buffer slices and
//! append them to an upload session [`UPLOAD_CHUNK`] bytes at a time, falling
//! back to a single `files/upload` call for small files.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::data::{Credential, Protocol, Selection, Slice, Stat};
use crate::effects::{Drain, Resource, Session, StreamTap, Tap, join_path};
use crate::error::{Error, Result};

pub const API_BASE: &str = "https://api.dropboxapi.com/2";
pub const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// Bytes buffered before an upload session append.
pub const UPLOAD_CHUNK: usize = 8 * 1024 * 1024;

const API_ARG: &str = "Dropbox-API-Arg";

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum Metadata {
    File {
        name: String,
        id:   String,
        size: u64,
    },
    Folder {
        name: String,
        id:   String,
    },
    Deleted {
        name: String,
    },
}

#[derive(Debug, Deserialize)]
struct ListFolder {
    entries:  Vec<Metadata>,
    cursor:   String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct UploadSession {
    session_id: String,
}

/// Thin REST client shared by every resource of one session.
struct DropboxApi {
    http:         reqwest::Client,
    token:        String,
    api_base:     String,
    content_base: String,
}

impl DropboxApi {
    async fn rpc<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.api_base))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    async fn content(&self, endpoint: &str, arg: Value, body: Bytes) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.content_base))
            .bearer_auth(&self.token)
            .header(API_ARG, arg.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;
        check(response).await
    }

    async fn metadata(&self, path: &str) -> Result<Metadata> {
        self.rpc("files/get_metadata", json!({ "path": path })).await
    }

    async fn list_folder(&self, path: &str) -> Result<Vec<Metadata>> {
        let mut page: ListFolder = self.rpc("files/list_folder", json!({ "path": path })).await?;
        let mut entries = std::mem::take(&mut page.entries);
        while page.has_more {
            page = self
                .rpc("files/list_folder/continue", json!({ "cursor": page.cursor }))
                .await?;
            entries.append(&mut page.entries);
        }
        Ok(entries)
    }

    fn stat(self: Arc<Self>, path: String, name: String) -> BoxFuture<'static, Result<Stat>> {
        async move {
            let mut children = Vec::new();
            for entry in self.list_folder(&path).await? {
                match entry {
                    Metadata::File { name, id, size } => children.push(Stat::file(name, size).with_id(id)),
                    Metadata::Folder { name, id } => {
                        let child = join_path(&path, &name);
                        let stat = Arc::clone(&self).stat(child, name).await?;
                        children.push(stat.with_id(id));
                    }
                    Metadata::Deleted { .. } => {}
                }
            }
            children.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(Stat::dir(name, children))
        }
        .boxed()
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::CONFLICT && message.contains("not_found") {
        return Err(Error::NotFound(message));
    }
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Dropbox addresses the root as the empty string, everything else with a leading `/`.
fn api_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

pub struct DropboxSession {
    uri:          Url,
    credential:   Credential,
    http:         reqwest::Client,
    api_base:     String,
    content_base: String,
    api:          Option<Arc<DropboxApi>>,
}

impl DropboxSession {
    pub fn new(uri: Url, credential: Credential) -> Self {
        Self {
            uri,
            credential,
            http: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            content_base: CONTENT_BASE.to_string(),
            api: None,
        }
    }

    /// Point the session at different API hosts.
    #[must_use]
    pub fn with_base_urls(mut self, api_base: impl Into<String>, content_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.content_base = content_base.into();
        self
    }
}

#[async_trait]
impl Session for DropboxSession {
    fn protocol(&self) -> Protocol { Protocol::Dropbox }

    fn uri(&self) -> &Url { &self.uri }

    async fn initialize(&mut self) -> Result<()> {
        let Credential::OAuth { token } = &self.credential else {
            return Err(Error::AuthenticationRequired {
                protocol: Protocol::Dropbox,
                expected: "oauth",
            });
        };
        self.api = Some(Arc::new(DropboxApi {
            http:         self.http.clone(),
            token:        token.clone(),
            api_base:     self.api_base.clone(),
            content_base: self.content_base.clone(),
        }));
        Ok(())
    }

    async fn select(&self, selection: &Selection) -> Result<Arc<dyn Resource>> {
        let api = self
            .api
            .as_ref()
            .ok_or(Error::NotInitialized(Protocol::Dropbox))?;
        let path = api_path(&join_path(self.uri.path(), &selection.path));
        let id = selection.id_for(&selection.path).map(str::to_string);
        Ok(Arc::new(DropboxResource {
            api: Arc::clone(api),
            path,
            id,
        }))
    }
}

pub struct DropboxResource {
    api:  Arc<DropboxApi>,
    path: String,
    id:   Option<String>,
}

impl DropboxResource {
    /// `id:...` when the caller supplied one; Dropbox accepts it anywhere a path goes.
    fn locator(&self) -> &str { self.id.as_deref().unwrap_or(&self.path) }

    fn drain_at(&self, path: String) -> Box<dyn Drain> {
        Box::new(DropboxDrain {
            api: Arc::clone(&self.api),
            path,
            buf: BytesMut::new(),
            session: None,
            offset: 0,
        })
    }
}

#[async_trait]
impl Resource for DropboxResource {
    fn protocol(&self) -> Protocol { Protocol::Dropbox }

    fn path(&self) -> &str { &self.path }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        Ok(Arc::new(DropboxResource {
            api:  Arc::clone(&self.api),
            path: api_path(&join_path(&self.path, relative.trim_start_matches('/'))),
            id:   None,
        }))
    }

    async fn stat(&self) -> Result<Stat> {
        if self.id.is_none() && self.path.is_empty() {
            return Arc::clone(&self.api).stat(String::new(), String::new()).await;
        }
        match self.api.metadata(self.locator()).await? {
            Metadata::File { name, id, size } => Ok(Stat::file(name, size).with_id(id)),
            Metadata::Folder { name, id } => {
                let stat = Arc::clone(&self.api).stat(self.locator().to_string(), name).await?;
                Ok(stat.with_id(id))
            }
            Metadata::Deleted { name } => Err(Error::NotFound(name)),
        }
    }

    async fn tap(&self) -> Result<Box<dyn Tap>> {
        let arg = json!({ "path": self.locator() });
        let response = self
            .api
            .content("files/download", arg, Bytes::new())
            .await
            .map_err(|e| Error::tap(&self.path, e))?;
        let body = response.bytes_stream().map(|chunk| chunk.map_err(Error::from)).boxed();
        Ok(Box::new(StreamTap::new(body)))
    }

    async fn sink(&self) -> Result<Box<dyn Drain>> { Ok(self.drain_at(self.path.clone())) }

    async fn sink_for(&self, stat: &Stat) -> Result<Box<dyn Drain>> {
        Ok(self.drain_at(api_path(&join_path(&self.path, &stat.name))))
    }
}

struct DropboxDrain {
    api:     Arc<DropboxApi>,
    path:    String,
    buf:     BytesMut,
    session: Option<String>,
    offset:  u64,
}

impl DropboxDrain {
    async fn flush_chunk(&mut self, chunk: Bytes) -> Result<()> {
        let len = chunk.len() as u64;
        if let Some(session_id) = self.session.clone() {
            let arg = json!({
                "cursor": { "session_id": session_id, "offset": self.offset },
                "close": false,
            });
            self.api.content("files/upload_session/append_v2", arg, chunk).await?;
        } else {
            let started: UploadSession = self
                .api
                .content("files/upload_session/start", json!({ "close": false }), chunk)
                .await?
                .json()
                .await?;
            debug!(path = %self.path, session = %started.session_id, "started upload session");
            self.session = Some(started.session_id);
        }
        self.offset += len;
        Ok(())
    }

    /// Upload every full chunk at the head of `buf`.
    ///
    /// A chunk leaves `buf` only once the remote accepted it, so a failed
    /// call can be repeated without losing or duplicating bytes.
    async fn flush_full_chunks(&mut self) -> Result<()> {
        while self.buf.len() >= UPLOAD_CHUNK {
            let chunk = Bytes::copy_from_slice(&self.buf[..UPLOAD_CHUNK]);
            self.flush_chunk(chunk).await?;
            let _ = self.buf.split_to(UPLOAD_CHUNK);
        }
        Ok(())
    }
}

#[async_trait]
impl Drain for DropboxDrain {
    /// Flushes what earlier slices buffered, then buffers `slice`. On error
    /// `slice` was not taken and the drain is as it was before the call.
    async fn drain(&mut self, slice: Slice) -> Result<()> {
        self.flush_full_chunks()
            .await
            .map_err(|e| Error::write(&self.path, e))?;
        self.buf.extend_from_slice(slice.bytes());
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.flush_full_chunks().await?;
        let DropboxDrain {
            api,
            path,
            buf,
            session,
            offset,
        } = *this;
        let commit = json!({ "path": path, "mode": "overwrite" });
        match session {
            None => {
                api.content("files/upload", commit, buf.freeze()).await?;
            }
            Some(session_id) => {
                let arg = json!({
                    "cursor": { "session_id": session_id, "offset": offset },
                    "commit": commit,
                });
                api.content("files/upload_session/finish", arg, buf.freeze()).await?;
            }
        }
        Ok(())
    }
}
