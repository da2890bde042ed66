//! In-process object store addressed as `memory:///path`.
//!
//! Backs dry runs and tests. The store can be told to fail tap or drain
//! construction or individual slice writes for chosen paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use url::Url;

use crate::data::{Credential, Protocol, Selection, Slice, Stat};
use crate::effects::{Drain, Resource, Session, StreamTap, Tap, join_path};
use crate::error::{Error, Result};

#[derive(Default)]
struct State {
    files:          BTreeMap<String, Bytes>,
    failing_taps:   HashSet<String>,
    failing_sinks:  HashSet<String>,
    failing_writes: HashMap<String, usize>,
    slice_lengths:  HashMap<String, Vec<usize>>,
}

/// Shared handle to an in-memory file tree. Clones see the same files.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

fn normalize(path: &str) -> String { path.trim_matches('/').to_string() }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, path: &str, bytes: impl Into<Bytes>) {
        self.lock().files.insert(normalize(path), bytes.into());
    }

    pub fn get(&self, path: &str) -> Option<Bytes> { self.lock().files.get(&normalize(path)).cloned() }

    pub fn contains(&self, path: &str) -> bool { self.lock().files.contains_key(&normalize(path)) }

    pub fn paths(&self) -> Vec<String> { self.lock().files.keys().cloned().collect() }

    /// Make `tap()` on `path` fail.
    pub fn fail_taps(&self, path: &str) { self.lock().failing_taps.insert(normalize(path)); }

    /// Make `sink()` for `path` fail.
    pub fn fail_sinks(&self, path: &str) { self.lock().failing_sinks.insert(normalize(path)); }

    /// Make the next `count` slice writes to `path` fail.
    pub fn fail_writes(&self, path: &str, count: usize) {
        self.lock().failing_writes.insert(normalize(path), count);
    }

    /// Lengths of every slice accepted by drains writing `path`, in order.
    pub fn slice_lengths(&self, path: &str) -> Vec<usize> {
        self.lock()
            .slice_lengths
            .get(&normalize(path))
            .cloned()
            .unwrap_or_default()
    }

    fn stat(&self, path: &str) -> Result<Stat> {
        let state = self.lock();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        if let Some(bytes) = state.files.get(path) {
            return Ok(Stat::file(name, bytes.len() as u64));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let below: Vec<(&str, u64)> = state
            .files
            .iter()
            .filter_map(|(key, bytes)| key.strip_prefix(&prefix).map(|rest| (rest, bytes.len() as u64)))
            .collect();
        if below.is_empty() && !path.is_empty() {
            return Err(Error::NotFound(format!("memory:///{path}")));
        }
        Ok(Stat::dir(name, tree(&below)))
    }
}

fn tree(entries: &[(&str, u64)]) -> Vec<Stat> {
    let mut dirs: BTreeMap<&str, Vec<(&str, u64)>> = BTreeMap::new();
    let mut files = Vec::new();
    for &(path, size) in entries {
        match path.split_once('/') {
            Some((head, rest)) => dirs.entry(head).or_default().push((rest, size)),
            None => files.push(Stat::file(path, size)),
        }
    }
    let mut out: Vec<Stat> = dirs
        .into_iter()
        .map(|(name, children)| Stat::dir(name, tree(&children)))
        .chain(files)
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

pub struct MemorySession {
    uri:         Url,
    store:       MemoryStore,
    initialized: bool,
}

impl MemorySession {
    pub fn new(uri: Url, store: MemoryStore, _credential: Credential) -> Self {
        Self {
            uri,
            store,
            initialized: false,
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    fn protocol(&self) -> Protocol { Protocol::Memory }

    fn uri(&self) -> &Url { &self.uri }

    async fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    async fn select(&self, selection: &Selection) -> Result<Arc<dyn Resource>> {
        if !self.initialized {
            return Err(Error::NotInitialized(Protocol::Memory));
        }
        let path = join_path(self.uri.path(), &selection.path);
        Ok(Arc::new(MemoryResource::new(self.store.clone(), &path)))
    }
}

pub struct MemoryResource {
    store: MemoryStore,
    path:  String,
}

impl MemoryResource {
    pub fn new(store: MemoryStore, path: &str) -> Self {
        Self {
            store,
            path: normalize(path),
        }
    }
}

#[async_trait]
impl Resource for MemoryResource {
    fn protocol(&self) -> Protocol { Protocol::Memory }

    fn path(&self) -> &str { &self.path }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        Ok(Arc::new(MemoryResource::new(
            self.store.clone(),
            &join_path(&self.path, relative.trim_start_matches('/')),
        )))
    }

    async fn stat(&self) -> Result<Stat> { self.store.stat(&self.path) }

    async fn tap(&self) -> Result<Box<dyn Tap>> {
        let state = self.store.lock();
        if state.failing_taps.contains(&self.path) {
            return Err(Error::tap(&self.path, "tap failure injected"));
        }
        let bytes = state
            .files
            .get(&self.path)
            .cloned()
            .ok_or_else(|| Error::tap(&self.path, "no such file"))?;
        Ok(Box::new(StreamTap::from_bytes(bytes)))
    }

    async fn sink(&self) -> Result<Box<dyn Drain>> { open_drain(&self.store, self.path.clone()) }

    async fn sink_for(&self, stat: &Stat) -> Result<Box<dyn Drain>> {
        let path = normalize(&join_path(&self.path, stat.name.trim_start_matches('/')));
        open_drain(&self.store, path)
    }
}

fn open_drain(store: &MemoryStore, path: String) -> Result<Box<dyn Drain>> {
    if store.lock().failing_sinks.contains(&path) {
        return Err(Error::drain(&path, "sink failure injected"));
    }
    Ok(Box::new(MemoryDrain {
        store: store.clone(),
        path,
        buf: BytesMut::new(),
    }))
}

/// Buffers slices and publishes the file on `finish`.
struct MemoryDrain {
    store: MemoryStore,
    path:  String,
    buf:   BytesMut,
}

#[async_trait]
impl Drain for MemoryDrain {
    async fn drain(&mut self, slice: Slice) -> Result<()> {
        let mut state = self.store.lock();
        if let Some(remaining) = state.failing_writes.get_mut(&self.path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::write(&self.path, "write failure injected"));
            }
        }
        state
            .slice_lengths
            .entry(self.path.clone())
            .or_default()
            .push(slice.len());
        drop(state);

        self.buf.extend_from_slice(slice.bytes());
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<()> {
        let MemoryDrain { store, path, buf } = *self;
        store.lock().files.insert(path, buf.freeze());
        Ok(())
    }
}
