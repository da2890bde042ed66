use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Local filesystem
    File,
    /// HTTP/HTTPS, source only
    Http,
    /// Dropbox API v2
    Dropbox,
    /// GridFTP endpoints driven through the Globus Transfer API
    GridFtp,
    /// In-process object store
    Memory,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::File => "file",
            Protocol::Http => "http",
            Protocol::Dropbox => "dropbox",
            Protocol::GridFtp => "gridftp",
            Protocol::Memory => "memory",
        }
    }

    /// Parse a protocol from a URI scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_lowercase().as_str() {
            "file" => Some(Protocol::File),
            "http" | "https" => Some(Protocol::Http),
            "dropbox" => Some(Protocol::Dropbox),
            "gsiftp" | "gridftp" | "globus" => Some(Protocol::GridFtp),
            "mem" | "memory" => Some(Protocol::Memory),
            _ => None,
        }
    }

    /// How this protocol moves bytes.
    pub fn capability(&self) -> TransferCapability {
        match self {
            Protocol::GridFtp => TransferCapability::Delegated,
            _ => TransferCapability::Streaming,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// How a resource takes part in a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferCapability {
    /// Bytes flow through this process as taps and drains.
    Streaming,
    /// The whole move is handed to a remote control plane and only polled.
    Delegated,
}
