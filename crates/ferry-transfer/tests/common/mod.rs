#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ferry_endpoint::protocol::MemoryResource;
use ferry_endpoint::{
    ControlPlane, Delegation, Drain, Error, MemoryStore, Protocol, RemoteLocation, Resource, Result, Stat,
    StreamTap, Tap, TaskDetail, TaskId, TaskStatus, TransferCapability,
};
use ferry_telemetry::TransferInfo;
use ferry_transfer::TransferRun;
use futures_util::{StreamExt, stream};

pub fn memory(store: &MemoryStore, path: &str) -> Arc<dyn Resource> { Arc::new(MemoryResource::new(store.clone(), path)) }

/// Collect every snapshot and the terminal result of a run.
pub async fn collect(mut run: TransferRun) -> (Vec<TransferInfo>, Option<ferry_transfer::TransferError>) {
    let mut seen = Vec::new();
    while let Some(event) = run.next().await {
        match event {
            Ok(info) => seen.push(info),
            Err(e) => return (seen, Some(e)),
        }
    }
    (seen, None)
}

pub fn detail(bytes_transferred: u64, status: TaskStatus) -> TaskDetail {
    TaskDetail {
        bytes_transferred,
        status,
    }
}

/// Control plane replaying a scripted sequence of task details.
/// The last entry repeats once the script runs out.
#[derive(Default)]
pub struct MockPlane {
    script:  Mutex<VecDeque<TaskDetail>>,
    last:    Mutex<Option<TaskDetail>>,
    submits: AtomicU32,
    polls:   AtomicU32,
    cancels: AtomicU32,
    failing: AtomicU32,
}

impl MockPlane {
    pub fn scripted(details: Vec<TaskDetail>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(details.into()),
            ..Self::default()
        })
    }

    pub fn submits(&self) -> u32 { self.submits.load(Ordering::SeqCst) }

    pub fn polls(&self) -> u32 { self.polls.load(Ordering::SeqCst) }

    pub fn cancels(&self) -> u32 { self.cancels.load(Ordering::SeqCst) }

    /// Make the next `count` status polls fail without consuming the script.
    pub fn fail_next_polls(&self, count: u32) { self.failing.store(count, Ordering::SeqCst); }
}

#[async_trait]
impl ControlPlane for MockPlane {
    async fn submit(&self, _source: &RemoteLocation, _destination: &RemoteLocation) -> Result<TaskId> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(TaskId("task-1".into()))
    }

    async fn task_detail(&self, _task: &TaskId) -> Result<TaskDetail> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing.store(failing - 1, Ordering::SeqCst);
            return Err(Error::Network("status endpoint unreachable".into()));
        }
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        (*last).ok_or_else(|| Error::InvalidResponse("empty script".into()))
    }

    async fn cancel(&self, _task: &TaskId) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Resource living on a mock control plane.
pub struct RemoteResource {
    plane:    Arc<MockPlane>,
    location: RemoteLocation,
}

impl RemoteResource {
    pub fn new(plane: &Arc<MockPlane>, path: &str) -> Arc<dyn Resource> {
        Arc::new(Self {
            plane:    Arc::clone(plane),
            location: RemoteLocation::new("ep", path),
        })
    }
}

#[async_trait]
impl Resource for RemoteResource {
    fn protocol(&self) -> Protocol { Protocol::GridFtp }

    fn path(&self) -> &str { &self.location.path }

    fn capability(&self) -> TransferCapability { TransferCapability::Delegated }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        Ok(RemoteResource::new(&self.plane, &format!("{}/{relative}", self.location.path)))
    }

    fn delegation(&self) -> Option<Delegation> {
        Some(Delegation {
            plane:    Arc::clone(&self.plane) as Arc<dyn ControlPlane>,
            location: self.location.clone(),
        })
    }

    async fn stat(&self) -> Result<Stat> { Ok(Stat::file("remote", 0)) }

    async fn tap(&self) -> Result<Box<dyn Tap>> { Err(unsupported("tap")) }

    async fn sink(&self) -> Result<Box<dyn Drain>> { Err(unsupported("sink")) }

    async fn sink_for(&self, _stat: &Stat) -> Result<Box<dyn Drain>> { Err(unsupported("sink")) }
}

fn unsupported(operation: &'static str) -> Error {
    Error::Unsupported {
        protocol: Protocol::GridFtp,
        operation,
    }
}

/// Source whose single file never produces a slice.
pub struct StalledSource;

#[async_trait]
impl Resource for StalledSource {
    fn protocol(&self) -> Protocol { Protocol::Memory }

    fn path(&self) -> &str { "stalled" }

    fn child(&self, _relative: &str) -> Result<Arc<dyn Resource>> { Ok(Arc::new(StalledSource)) }

    async fn stat(&self) -> Result<Stat> { Ok(Stat::file("stalled", 10)) }

    async fn tap(&self) -> Result<Box<dyn Tap>> { Ok(Box::new(StreamTap::new(stream::pending().boxed()))) }

    async fn sink(&self) -> Result<Box<dyn Drain>> { Err(unsupported("sink")) }

    async fn sink_for(&self, _stat: &Stat) -> Result<Box<dyn Drain>> { Err(unsupported("sink")) }
}

/// How a [`Faulty`] resource misbehaves.
#[derive(Clone)]
pub enum Fault {
    /// `child(name)` cannot be resolved.
    Unresolvable(String),
    /// The file at `name` disappears between listing and opening.
    Vanished(String),
}

/// Wraps a resource, failing one path in a way the wrapped endpoint never does.
pub struct Faulty {
    inner: Arc<dyn Resource>,
    fault: Fault,
}

impl Faulty {
    pub fn wrap(inner: Arc<dyn Resource>, fault: Fault) -> Arc<dyn Resource> { Arc::new(Self { inner, fault }) }
}

#[async_trait]
impl Resource for Faulty {
    fn protocol(&self) -> Protocol { self.inner.protocol() }

    fn path(&self) -> &str { self.inner.path() }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        if matches!(&self.fault, Fault::Unresolvable(name) if name == relative) {
            return Err(Error::InvalidUri(format!("cannot resolve {relative}")));
        }
        Ok(Faulty::wrap(self.inner.child(relative)?, self.fault.clone()))
    }

    async fn stat(&self) -> Result<Stat> { self.inner.stat().await }

    async fn tap(&self) -> Result<Box<dyn Tap>> {
        if matches!(&self.fault, Fault::Vanished(name) if self.inner.path().ends_with(name.as_str())) {
            return Err(Error::NotFound(self.inner.path().to_string()));
        }
        self.inner.tap().await
    }

    async fn sink(&self) -> Result<Box<dyn Drain>> { self.inner.sink().await }

    async fn sink_for(&self, stat: &Stat) -> Result<Box<dyn Drain>> { self.inner.sink_for(stat).await }
}

/// Shared count of open taps and the most ever open at once.
#[derive(Default)]
pub struct Gauge {
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    pub fn peak(&self) -> usize { self.peak.load(Ordering::SeqCst) }

    fn enter(self: &Arc<Self>) -> Open {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Open(Arc::clone(self))
    }
}

struct Open(Arc<Gauge>);

impl Drop for Open {
    fn drop(&mut self) { self.0.open.fetch_sub(1, Ordering::SeqCst); }
}

/// Directory of `files` ten-byte files whose taps take 10ms to produce
/// their only slice and report to a shared [`Gauge`].
pub struct SlowSource {
    gauge: Arc<Gauge>,
    files: usize,
    name:  String,
}

impl SlowSource {
    pub fn new(files: usize) -> (Arc<dyn Resource>, Arc<Gauge>) {
        let gauge = Arc::new(Gauge::default());
        let source = Arc::new(Self {
            gauge: Arc::clone(&gauge),
            files,
            name: "slow".into(),
        });
        (source, gauge)
    }
}

#[async_trait]
impl Resource for SlowSource {
    fn protocol(&self) -> Protocol { Protocol::Memory }

    fn path(&self) -> &str { &self.name }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        Ok(Arc::new(SlowSource {
            gauge: Arc::clone(&self.gauge),
            files: 0,
            name:  relative.to_string(),
        }))
    }

    async fn stat(&self) -> Result<Stat> {
        let children = (0..self.files).map(|i| Stat::file(format!("f{i}.bin"), 10)).collect();
        Ok(Stat::dir(self.name.clone(), children))
    }

    async fn tap(&self) -> Result<Box<dyn Tap>> {
        let open = self.gauge.enter();
        let body = stream::once(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(open);
            Ok(Bytes::from_static(b"0123456789"))
        });
        Ok(Box::new(StreamTap::new(body.boxed())))
    }

    async fn sink(&self) -> Result<Box<dyn Drain>> { Err(unsupported("sink")) }

    async fn sink_for(&self, _stat: &Stat) -> Result<Box<dyn Drain>> { Err(unsupported("sink")) }
}
