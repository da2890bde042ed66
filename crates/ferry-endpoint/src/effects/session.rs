use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::resource::Resource;
use crate::data::{Protocol, Selection};
use crate::error::Result;

/// Authenticated connection to one protocol endpoint.
///
/// Created per transfer endpoint, initialized once, then used to select
/// resources. Selecting before `initialize` fails with `NotInitialized`.
#[async_trait]
pub trait Session: Send + Sync {
    fn protocol(&self) -> Protocol;

    fn uri(&self) -> &Url;

    /// Bind and check the credential. Fails with `AuthenticationRequired`
    /// when the credential kind does not fit the protocol.
    async fn initialize(&mut self) -> Result<()>;

    /// Resolve a selection into a resource handle without touching the network.
    async fn select(&self, selection: &Selection) -> Result<Arc<dyn Resource>>;
}

/// Join `relative` onto `base` with exactly one `/` between them.
///
/// An empty `relative` returns `base`; an absolute `relative` replaces it.
pub fn join_path(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    if relative.starts_with('/') {
        return relative.to_string();
    }
    if base.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), relative)
}
