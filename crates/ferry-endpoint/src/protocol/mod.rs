//! Protocol variants.

pub mod http;
pub mod local;
pub mod memory;

#[cfg(feature = "reqwest")]
pub mod dropbox;
#[cfg(feature = "reqwest")]
pub mod globus;

pub use http::{HttpResource, HttpSession};
pub use local::{LocalResource, LocalSession};
pub use memory::{MemoryResource, MemorySession, MemoryStore};

#[cfg(feature = "reqwest")]
pub use dropbox::{DropboxResource, DropboxSession};
#[cfg(feature = "reqwest")]
pub use globus::{GlobusClient, GridFtpResource, GridFtpSession, path_from_uri};
