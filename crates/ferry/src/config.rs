use std::path::Path;

use anyhow::Context;
use ferry_endpoint::{Credential, Protocol};
use ferry_transfer::TransferOptions;
use serde::Deserialize;

/// Contents of a `ferry.toml` file.
///
/// ```toml
/// [transfer]
/// slice_size = 4194304
/// max_concurrent_files = 8
/// slice_write_policy = { mode = "retry", attempts = 3, backoff = 0.5 }
///
/// [credentials]
/// dropbox = "sl.XXXX"
/// globus = "AgXXXX"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub transfer:    TransferOptions,
    pub credentials: Credentials,
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Credentials {
    /// OAuth access token for `dropbox://`.
    pub dropbox: Option<String>,
    /// Globus transfer token for `gsiftp://`.
    pub globus:  Option<String>,
    /// Bearer token sent to `http(s)://` sources.
    pub http:    Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |token: &Option<String>| token.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("dropbox", &mask(&self.dropbox))
            .field("globus", &mask(&self.globus))
            .field("http", &mask(&self.http))
            .finish()
    }
}

pub const DEFAULT_CONFIG: &str = "ferry.toml";

impl Config {
    /// Read `path`, or `ferry.toml` in the working directory when present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None if Path::new(DEFAULT_CONFIG).is_file() => Self::read(Path::new(DEFAULT_CONFIG)),
            None => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> { Ok(toml::from_str(text)?) }

    /// Credential to hand to a session of `protocol`.
    pub fn credential_for(&self, protocol: Protocol) -> Credential {
        let token = match protocol {
            Protocol::Dropbox => self.credentials.dropbox.clone().map(Credential::oauth),
            Protocol::GridFtp => self.credentials.globus.clone().map(Credential::globus),
            Protocol::Http => self.credentials.http.clone().map(Credential::oauth),
            Protocol::File | Protocol::Memory => None,
        };
        token.unwrap_or_default()
    }
}
