//! Local filesystem endpoint (`file:///path`).
//!
//! Drains stage into a hidden `.NAME.ferry-part` file beside the target and
//! rename it into place on `finish`. A transfer that fails mid-stream leaves
//! the staging file behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

use crate::data::{Credential, Protocol, Selection, Slice, Stat};
use crate::effects::{Drain, Resource, Session, SliceStream, Tap, slices};
use crate::error::{Error, Result};

const STAGING_SUFFIX: &str = "ferry-part";

pub struct LocalSession {
    uri:         Url,
    root:        PathBuf,
    initialized: bool,
}

impl LocalSession {
    pub fn new(uri: Url, _credential: Credential) -> Result<Self> {
        let root = uri
            .to_file_path()
            .map_err(|_| Error::InvalidUri(uri.to_string()))?;
        Ok(Self {
            uri,
            root,
            initialized: false,
        })
    }
}

#[async_trait]
impl Session for LocalSession {
    fn protocol(&self) -> Protocol { Protocol::File }

    fn uri(&self) -> &Url { &self.uri }

    async fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    async fn select(&self, selection: &Selection) -> Result<Arc<dyn Resource>> {
        if !self.initialized {
            return Err(Error::NotInitialized(Protocol::File));
        }
        let path = if selection.path.is_empty() {
            self.root.clone()
        } else {
            join_relative(&self.root, &selection.path)
        };
        Ok(Arc::new(LocalResource::new(path)))
    }
}

/// Join a `/`-separated relative path component by component.
fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

pub struct LocalResource {
    path:    PathBuf,
    display: String,
}

impl LocalResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn stat_path(path: PathBuf) -> BoxFuture<'static, Result<Stat>> {
    async move {
        let meta = fs::metadata(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        let name = file_name(&path);
        if !meta.is_dir() {
            return Ok(Stat::file(name, meta.len()));
        }

        let mut entries = fs::read_dir(&path).await?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            children.push(stat_path(entry.path()).await?);
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Stat::dir(name, children))
    }
    .boxed()
}

#[async_trait]
impl Resource for LocalResource {
    fn protocol(&self) -> Protocol { Protocol::File }

    fn path(&self) -> &str { &self.display }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        Ok(Arc::new(LocalResource::new(join_relative(&self.path, relative))))
    }

    async fn stat(&self) -> Result<Stat> { stat_path(self.path.clone()).await }

    async fn tap(&self) -> Result<Box<dyn Tap>> {
        let file = File::open(&self.path)
            .await
            .map_err(|e| Error::tap(&self.display, e))?;
        Ok(Box::new(LocalTap { file }))
    }

    async fn sink(&self) -> Result<Box<dyn Drain>> { LocalDrain::create(self.path.clone()).await }

    async fn sink_for(&self, stat: &Stat) -> Result<Box<dyn Drain>> {
        LocalDrain::create(join_relative(&self.path, &stat.name)).await
    }
}

struct LocalTap {
    file: File,
}

impl Tap for LocalTap {
    fn open(self: Box<Self>, slice_size: usize) -> SliceStream {
        let body = ReaderStream::with_capacity(self.file, slice_size.max(1))
            .map(|chunk| chunk.map_err(Error::from))
            .boxed();
        slices(body, slice_size)
    }
}

struct LocalDrain {
    writer:  BufWriter<File>,
    staging: PathBuf,
    target:  PathBuf,
}

impl LocalDrain {
    async fn create(target: PathBuf) -> Result<Box<dyn Drain>> {
        let shown = target.display().to_string();
        let parent = target
            .parent()
            .ok_or_else(|| Error::drain(&shown, "no parent directory"))?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::drain(&shown, e))?;

        let staging = parent.join(format!(".{}.{STAGING_SUFFIX}", file_name(&target)));
        let file = File::create(&staging)
            .await
            .map_err(|e| Error::drain(&shown, e))?;
        debug!(staging = %staging.display(), "opened staging file");

        Ok(Box::new(LocalDrain {
            writer: BufWriter::new(file),
            staging,
            target,
        }))
    }
}

#[async_trait]
impl Drain for LocalDrain {
    async fn drain(&mut self, slice: Slice) -> Result<()> {
        self.writer
            .write_all(slice.bytes())
            .await
            .map_err(|e| Error::write(self.target.display().to_string(), e))
    }

    async fn finish(self: Box<Self>) -> Result<()> {
        let LocalDrain {
            mut writer,
            staging,
            target,
        } = *self;
        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        drop(writer);
        fs::rename(&staging, &target).await?;
        Ok(())
    }
}
