//! Endpoint abstraction for ferry transfers.
//!
//! # Architecture
//!
//! - [`data`] - immutable types: [`Stat`], [`Slice`], [`Credential`], [`Selection`]
//! - [`effects`] - the [`Session`] / [`Resource`] / [`Tap`] / [`Drain`] contracts and
//!   the [`ControlPlane`] used by delegated protocols
//! - [`protocol`] - file, HTTP, Dropbox, GridFTP (Globus) and in-memory variants
//! - [`EndpointRegistry`] - opens a session from a URI
//!
//! A streaming resource moves bytes through this process as ordered slices.
//! A delegated resource only hands out a [`Delegation`]; the remote moves the
//! data and is polled for status.

pub mod data;
pub mod effects;
pub mod protocol;

mod error;
mod registry;

pub use data::{Credential, IdMap, Protocol, Selection, Slice, Stat, TransferCapability};
pub use effects::{
    BoxStream, ControlPlane, Delegation, Drain, HttpClient, RemoteLocation, Resource, Session,
    SliceStream, StreamTap, Tap, TaskDetail, TaskId, TaskStatus, slices,
};
#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;
pub use error::{Error, Result};
pub use protocol::MemoryStore;
pub use registry::EndpointRegistry;
