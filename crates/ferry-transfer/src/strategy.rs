use ferry_endpoint::{Resource, TransferCapability};
use serde::Serialize;

use crate::error::{Result, TransferError};

/// How a transfer moves its bytes. Chosen once, before any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Tap-to-drain pipelines through this process.
    Streaming,
    /// The whole move is submitted to a remote control plane and polled.
    Delegated,
}

impl Strategy {
    /// Pick a strategy from the capabilities the two resources advertise.
    pub fn select(source: &dyn Resource, destination: &dyn Resource) -> Result<Self> {
        use TransferCapability::{Delegated, Streaming};

        match (source.capability(), destination.capability()) {
            (Delegated, Delegated) => Ok(Strategy::Delegated),
            (Delegated, Streaming) | (Streaming, Delegated) => Err(TransferError::Incompatible {
                source_protocol:      source.protocol(),
                destination_protocol: destination.protocol(),
            }),
            (Streaming, Streaming) if !destination.is_writable() => {
                Err(TransferError::ReadOnlyDestination(destination.protocol()))
            }
            (Streaming, Streaming) => Ok(Strategy::Streaming),
        }
    }
}
