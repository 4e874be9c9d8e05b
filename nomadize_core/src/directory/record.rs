//! Variable-length daemon records
//!
//! The daemon stores each record as a fixed header followed immediately by
//! the payload, with no padding:
//!
//! ```text
//! +----------------+----------------+---------------------------+
//! | capacity (u32) | length (u32)   | payload (length bytes)    |
//! +----------------+----------------+---------------------------+
//! ```
//!
//! Both header fields are native-endian. Records are decoded once into
//! [`DataNode`] values; callers never see raw offsets.

use crate::error::DecodeError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::trace;

/// Size of the fixed record header in bytes
pub const DATA_NODE_HEADER_SIZE: usize = 8;

/// A decoded daemon record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    capacity: u32,
    payload: Bytes,
}

impl DataNode {
    /// Create a record whose capacity equals its payload length
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            capacity: payload.len() as u32,
            payload,
        }
    }

    /// Create a record from a text value
    pub fn from_text(value: &str) -> Self {
        Self::new(Bytes::copy_from_slice(value.as_bytes()))
    }

    /// Create a record with an explicit capacity
    pub fn with_capacity(capacity: u32, payload: impl Into<Bytes>) -> Result<Self, DecodeError> {
        let payload = payload.into();
        let length = payload.len() as u32;
        if length > capacity {
            return Err(DecodeError::LengthExceedsCapacity { length, capacity });
        }
        Ok(Self { capacity, payload })
    }

    /// Declared capacity of the record's data region
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Declared payload length
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text
    pub fn as_str(&self) -> Result<&str, DecodeError> {
        std::str::from_utf8(&self.payload).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Bytes this record occupies when encoded
    pub fn encoded_len(&self) -> usize {
        DATA_NODE_HEADER_SIZE + self.payload.len()
    }

    /// Decode one record, advancing `buf` past exactly header + declared length
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        if buf.remaining() < DATA_NODE_HEADER_SIZE {
            return Err(DecodeError::TruncatedHeader {
                needed: DATA_NODE_HEADER_SIZE,
                available: buf.remaining(),
            });
        }

        let capacity = buf.get_u32_ne();
        let length = buf.get_u32_ne();

        if length > capacity {
            return Err(DecodeError::LengthExceedsCapacity { length, capacity });
        }
        if length as usize > buf.remaining() {
            return Err(DecodeError::LengthOverrun {
                declared: length,
                available: buf.remaining(),
            });
        }

        let payload = buf.copy_to_bytes(length as usize);
        trace!("Decoded record: capacity={capacity}, length={length}");

        Ok(Self { capacity, payload })
    }

    /// Append the encoded record to `out`
    pub fn encode(&self, out: &mut BytesMut) {
        out.reserve(self.encoded_len());
        out.put_u32_ne(self.capacity);
        out.put_u32_ne(self.payload.len() as u32);
        out.put_slice(&self.payload);
    }
}

/// A fixed-capacity region holding packed records
///
/// Mirrors a daemon-allocated buffer: the capacity is declared up front and
/// the used length never exceeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBuffer {
    capacity: u32,
    data: BytesMut,
}

impl DirectoryBuffer {
    /// Create an empty buffer with the given capacity
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            data: BytesMut::with_capacity(capacity as usize),
        }
    }

    /// Wrap bytes already written into a buffer of the given capacity
    pub fn from_parts(capacity: u32, used: &[u8]) -> Result<Self, DecodeError> {
        if used.len() > capacity as usize {
            return Err(DecodeError::BufferFull {
                needed: used.len(),
                remaining: capacity as usize,
            });
        }
        let mut data = BytesMut::with_capacity(capacity as usize);
        data.extend_from_slice(used);
        Ok(Self { capacity, data })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Bytes currently in use
    pub fn used_len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.capacity as usize - self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Append a record; fails without writing if it does not fit
    pub fn push(&mut self, node: &DataNode) -> Result<(), DecodeError> {
        let needed = node.encoded_len();
        if needed > self.remaining() {
            return Err(DecodeError::BufferFull {
                needed,
                remaining: self.remaining(),
            });
        }
        node.encode(&mut self.data);
        Ok(())
    }

    /// Discard all records, keeping the capacity
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Iterate over the packed records in order
    pub fn records(&self) -> Records<'_> {
        Records {
            remaining: &self.data,
        }
    }

    /// Read the record at a 1-based index
    pub fn record(&self, index: u32) -> Option<Result<DataNode, DecodeError>> {
        let position = (index as usize).checked_sub(1)?;
        self.records().nth(position)
    }
}

/// Iterator over the records of a [`DirectoryBuffer`]
///
/// Stops after the first decode error.
#[derive(Debug)]
pub struct Records<'a> {
    remaining: &'a [u8],
}

impl Iterator for Records<'_> {
    type Item = Result<DataNode, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        match DataNode::decode(&mut self.remaining) {
            Ok(node) => Some(Ok(node)),
            Err(err) => {
                self.remaining = &[];
                Some(Err(err))
            }
        }
    }
}

/// Join decoded path segments into the daemon's `/`-separated node name
pub fn render_node_path(segments: &[DataNode]) -> Result<String, DecodeError> {
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(segment.as_str()?);
    }
    Ok(path)
}
