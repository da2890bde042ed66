use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};

use crate::data::Slice;
use crate::error::Result;

/// A boxed, sendable stream.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Ordered slices of one file, ending after the last slice or the first error.
pub type SliceStream = BoxStream<'static, Result<Slice>>;

/// Streaming source over a single file's bytes.
///
/// Building a tap (via `Resource::tap`) does the opening I/O and may fail;
/// `open` itself never fails, errors arrive as items of the stream.
pub trait Tap: Send {
    /// Consume the tap and yield slices of at most `slice_size` bytes in
    /// ascending offset order. A `slice_size` of zero is treated as one.
    fn open(self: Box<Self>, slice_size: usize) -> SliceStream;
}

/// Tap over an already-open body stream of arbitrarily sized chunks.
pub struct StreamTap {
    body: BoxStream<'static, Result<Bytes>>,
}

impl StreamTap {
    pub fn new(body: BoxStream<'static, Result<Bytes>>) -> Self { Self { body } }

    /// Tap over a buffer already held in memory.
    pub fn from_bytes(bytes: Bytes) -> Self {
        let body: BoxStream<'static, Result<Bytes>> = if bytes.is_empty() {
            stream::empty().boxed()
        } else {
            stream::once(async move { Ok(bytes) }).boxed()
        };
        Self::new(body)
    }
}

impl Tap for StreamTap {
    fn open(self: Box<Self>, slice_size: usize) -> SliceStream { slices(self.body, slice_size) }
}

struct Rechunk {
    body:       BoxStream<'static, Result<Bytes>>,
    buf:        BytesMut,
    offset:     u64,
    slice_size: usize,
    exhausted:  bool,
    failed:     bool,
}

impl Rechunk {
    fn emit(&mut self, len: usize) -> Slice {
        let bytes = self.buf.split_to(len).freeze();
        let slice = Slice::new(self.offset, bytes);
        self.offset = slice.end();
        slice
    }
}

/// Regroup a body stream into slices of exactly `slice_size` bytes, the last
/// one possibly shorter.
///
/// Buffered bytes are dropped when the body fails; nothing follows the error.
pub fn slices(body: BoxStream<'static, Result<Bytes>>, slice_size: usize) -> SliceStream {
    let state = Rechunk {
        body,
        buf: BytesMut::new(),
        offset: 0,
        slice_size: slice_size.max(1),
        exhausted: false,
        failed: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if st.failed {
                return None;
            }
            if st.buf.len() >= st.slice_size {
                let len = st.slice_size;
                let slice = st.emit(len);
                return Some((Ok(slice), st));
            }
            if st.exhausted {
                if st.buf.is_empty() {
                    return None;
                }
                let len = st.buf.len();
                let slice = st.emit(len);
                return Some((Ok(slice), st));
            }
            match st.body.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    st.failed = true;
                    st.buf.clear();
                    return Some((Err(e), st));
                }
                None => st.exhausted = true,
            }
        }
    })
    .boxed()
}
