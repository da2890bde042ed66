use bytes::Bytes;

/// One contiguous chunk of a file in transit.
///
/// Produced by a tap and handed to a drain by value; the payload is a
/// reference-counted [`Bytes`] so a retrying drain can keep a cheap copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    offset: u64,
    bytes:  Bytes,
}

impl Slice {
    pub fn new(offset: u64, bytes: Bytes) -> Self { Self { offset, bytes } }

    /// Position of the first byte within the file.
    pub fn offset(&self) -> u64 { self.offset }

    pub fn len(&self) -> usize { self.bytes.len() }

    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    /// Offset one past the last byte.
    pub fn end(&self) -> u64 { self.offset + self.bytes.len() as u64 }

    pub fn bytes(&self) -> &Bytes { &self.bytes }

    pub fn into_bytes(self) -> Bytes { self.bytes }
}
