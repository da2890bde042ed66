//! Effectful contracts every protocol implements.
//!
//! A [`Session`] is an authenticated connection; it resolves [`Resource`]s,
//! which build [`Tap`]s and [`Drain`]s for byte streaming or expose a
//! [`Delegation`] when the protocol hands whole transfers to a
//! [`ControlPlane`].

mod control;
mod drain;
mod http;
mod resource;
mod session;
mod tap;

pub use control::{ControlPlane, Delegation, RemoteLocation, TaskDetail, TaskId, TaskStatus};
pub use drain::Drain;
pub use http::HttpClient;
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use resource::Resource;
pub use session::{Session, join_path};
pub use tap::{BoxStream, SliceStream, StreamTap, Tap, slices};
