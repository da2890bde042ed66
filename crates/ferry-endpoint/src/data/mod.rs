//! Immutable data shared by every endpoint: metadata, slices, credentials
//! and selection hints.

pub mod credential;
pub mod protocol;
pub mod selection;
pub mod slice;
pub mod stat;

pub use credential::Credential;
pub use protocol::{Protocol, TransferCapability};
pub use selection::{IdMap, Selection};
pub use slice::Slice;
pub use stat::Stat;
