use std::sync::Arc;

use async_trait::async_trait;

use super::control::Delegation;
use super::drain::Drain;
use super::tap::Tap;
use crate::data::{Protocol, Stat, TransferCapability};
use crate::error::Result;

/// A resolved file or directory within a session.
///
/// Handles are cheap: building one performs no I/O. `stat`, `tap` and the
/// sinks do the actual work.
#[async_trait]
pub trait Resource: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Location within the protocol's namespace, for logs and reports.
    fn path(&self) -> &str;

    /// Whether bytes stream through this process or a remote moves them.
    fn capability(&self) -> TransferCapability { self.protocol().capability() }

    /// False for source-only endpoints.
    fn is_writable(&self) -> bool { true }

    /// Resource for `relative` (a `/`-separated path) below this one.
    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>>;

    /// Control plane and location for delegated resources.
    fn delegation(&self) -> Option<Delegation> { None }

    /// Metadata, enumerating children recursively for directories.
    async fn stat(&self) -> Result<Stat>;

    /// Source over this file's bytes. Fails with `TapConstruction`.
    async fn tap(&self) -> Result<Box<dyn Tap>>;

    /// Sink writing this resource itself. Fails with `DrainConstruction`.
    async fn sink(&self) -> Result<Box<dyn Drain>>;

    /// Sink writing `stat.name` (a relative path) below this directory.
    async fn sink_for(&self, stat: &Stat) -> Result<Box<dyn Drain>>;
}
