use async_trait::async_trait;

use crate::data::Slice;
use crate::error::Result;

/// Streaming sink for a single destination file.
///
/// `drain` is called once per slice in source order. `finish` commits the
/// destination and is called at most once, only after the source completed
/// cleanly. A drain dropped without `finish` leaves whatever it already wrote.
#[async_trait]
pub trait Drain: Send {
    async fn drain(&mut self, slice: Slice) -> Result<()>;

    async fn finish(self: Box<Self>) -> Result<()>;
}
