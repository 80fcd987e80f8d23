// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structural CBOR encoder used to assemble COSE_Sign / COSE_Sign1 messages.
//!
//! Containers (arrays, wrapped byte strings and reserved byte regions) are
//! opened without knowing their final length. Their definite-length head is
//! inserted when they are closed, shifting the already written content. The
//! same code path runs against a caller buffer or in measurement mode, where
//! nothing is written and only the encoded size is tracked.
//!
//! Errors are sticky: once an operation fails, later operations are no-ops and
//! the first error is reported by [`CborEncoder::error`] and
//! [`CborEncoder::finish`].

use std::ops::Range;

use crate::error::EncodeError;

const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_TAG: u8 = 6;
const CBOR_NULL: u8 = 0xF6;

/// Where encoded bytes go.
#[derive(Debug)]
pub enum EncodeTarget<'a> {
    /// Size calculation only; nothing is written.
    Measure,
    /// Encode into the caller's buffer.
    Buffer(&'a mut [u8]),
}

impl EncodeTarget<'_> {
    pub fn is_measure(&self) -> bool {
        matches!(self, EncodeTarget::Measure)
    }
}

/// Result of [`CborEncoder::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded<'a> {
    /// The encoded bytes, a prefix of the caller's buffer.
    Written(&'a [u8]),
    /// The size the encoding would need.
    Measured(usize),
}

impl<'a> Encoded<'a> {
    pub fn len(&self) -> usize {
        match self {
            Encoded::Written(b) => b.len(),
            Encoded::Measured(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Encoded::Written(b) => Some(b),
            Encoded::Measured(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NestingKind {
    Array,
    /// Byte string whose content is further CBOR (or raw bytes) written by the caller.
    Wrap,
    /// Byte string region filled directly through [`CborEncoder::reserved_region`].
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Nesting {
    kind: NestingKind,
    start: usize,
    items: u64,
}

/// Encoder bookkeeping that survives a suspended signing pass.
///
/// Obtained from [`CborEncoder::suspend`] and handed back to
/// [`CborEncoder::resume`] together with the same target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderState {
    len: usize,
    measuring: bool,
    nesting: Vec<Nesting>,
    error: Option<EncodeError>,
}

/// A CBOR definite-length head (major type + argument), at most 9 bytes.
#[derive(Debug, Clone, Copy)]
pub struct Head {
    bytes: [u8; 9],
    len: usize,
}

impl Head {
    pub fn new(major: u8, value: u64) -> Self {
        let mt = major << 5;
        let mut bytes = [0u8; 9];
        let len = if value < 24 {
            bytes[0] = mt | value as u8;
            1
        } else if value <= u8::MAX as u64 {
            bytes[0] = mt | 24;
            bytes[1] = value as u8;
            2
        } else if value <= u16::MAX as u64 {
            bytes[0] = mt | 25;
            bytes[1..3].copy_from_slice(&(value as u16).to_be_bytes());
            3
        } else if value <= u32::MAX as u64 {
            bytes[0] = mt | 26;
            bytes[1..5].copy_from_slice(&(value as u32).to_be_bytes());
            5
        } else {
            bytes[0] = mt | 27;
            bytes[1..9].copy_from_slice(&value.to_be_bytes());
            9
        };
        Self { bytes, len }
    }

    /// Head of a definite-length byte string.
    pub fn bytes_len(len: usize) -> Self {
        Self::new(MAJOR_BYTES, len as u64)
    }

    /// Head of a definite-length array.
    pub fn array_len(len: u64) -> Self {
        Self::new(MAJOR_ARRAY, len)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

pub struct CborEncoder<'a> {
    target: EncodeTarget<'a>,
    state: EncoderState,
}

impl<'a> CborEncoder<'a> {
    pub fn new(target: EncodeTarget<'a>) -> Self {
        let measuring = target.is_measure();
        Self {
            target,
            state: EncoderState {
                measuring,
                ..Default::default()
            },
        }
    }

    /// Re-attach previously suspended state to a target.
    ///
    /// For a buffer target this must be the same buffer the state was
    /// produced with; the bytes already in it are kept as written.
    pub fn resume(target: EncodeTarget<'a>, mut state: EncoderState) -> Self {
        let fits = match &target {
            EncodeTarget::Measure => state.measuring,
            EncodeTarget::Buffer(buf) => !state.measuring && state.len <= buf.len(),
        };
        if !fits && state.error.is_none() {
            state.error = Some(EncodeError::TargetMismatch);
        }
        Self { target, state }
    }

    /// Detach the bookkeeping so encoding can continue on a later call.
    pub fn suspend(self) -> EncoderState {
        self.state
    }

    pub fn is_measuring(&self) -> bool {
        self.target.is_measure()
    }

    pub fn error(&self) -> Option<EncodeError> {
        self.state.error
    }

    /// Bytes encoded so far (or that would have been, in measurement mode).
    pub fn len(&self) -> usize {
        self.state.len
    }

    pub fn is_empty(&self) -> bool {
        self.state.len == 0
    }

    /// Previously written output. `None` in measurement mode or when the
    /// range is outside what has been written.
    pub fn written(&self, range: Range<usize>) -> Option<&[u8]> {
        match &self.target {
            EncodeTarget::Measure => None,
            EncodeTarget::Buffer(buf) => buf[..self.state.len].get(range),
        }
    }

    pub fn add_tag(&mut self, tag: u64) {
        self.write(Head::new(MAJOR_TAG, tag).as_slice());
    }

    pub fn add_null(&mut self) {
        self.count_item();
        self.write(&[CBOR_NULL]);
    }

    /// Add a byte string item.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.count_item();
        self.write(Head::bytes_len(bytes.len()).as_slice());
        self.write(bytes);
    }

    /// Add bytes that are already encoded CBOR as one item.
    ///
    /// Inside a wrapped byte string this is also how raw payload bytes are
    /// streamed in.
    pub fn add_encoded(&mut self, encoded: &[u8]) {
        self.count_item();
        self.write(encoded);
    }

    pub fn open_array(&mut self) {
        self.open(NestingKind::Array);
    }

    pub fn close_array(&mut self) {
        if let Some(n) = self.pop(NestingKind::Array) {
            self.insert_head(n.start, Head::array_len(n.items));
        }
    }

    /// Start a byte string whose content is encoded by later calls.
    pub fn bstr_wrap(&mut self) {
        self.open(NestingKind::Wrap);
    }

    /// Close the innermost wrapped byte string and return the range of its
    /// content in the output.
    pub fn close_bstr_wrap(&mut self) -> Range<usize> {
        let Some(n) = self.pop(NestingKind::Wrap) else {
            return self.state.len..self.state.len;
        };
        let content_len = self.state.len - n.start;
        let head = Head::bytes_len(content_len);
        self.insert_head(n.start, head);
        let start = n.start + head.len;
        start..start + content_len
    }

    /// Reserve a byte string region to be filled in place later.
    ///
    /// The region is finalized with [`CborEncoder::close_bytes`] or dropped
    /// with [`CborEncoder::cancel_bytes`].
    pub fn open_bytes(&mut self) {
        self.open(NestingKind::Reserved);
    }

    /// The writable space of the open reserved region.
    pub fn reserved_region(&mut self) -> Result<&mut [u8], EncodeError> {
        if let Some(e) = self.state.error {
            return Err(e);
        }
        match self.state.nesting.last() {
            Some(n) if n.kind == NestingKind::Reserved => {}
            _ => return Err(EncodeError::NotReserved),
        }
        let len = self.state.len;
        match &mut self.target {
            EncodeTarget::Measure => Err(EncodeError::Measuring),
            EncodeTarget::Buffer(buf) => Ok(&mut buf[len..]),
        }
    }

    /// Finalize the reserved region with the number of bytes actually used.
    pub fn close_bytes(&mut self, used: usize) {
        let Some(n) = self.pop(NestingKind::Reserved) else {
            return;
        };
        let Some(end) = self.state.len.checked_add(used) else {
            self.fail(EncodeError::LengthOverflow);
            return;
        };
        if let EncodeTarget::Buffer(buf) = &self.target {
            if end > buf.len() {
                self.fail(EncodeError::BufferTooSmall);
                return;
            }
        }
        self.state.len = end;
        self.insert_head(n.start, Head::bytes_len(used));
    }

    /// Drop the open reserved region without emitting anything.
    pub fn cancel_bytes(&mut self) {
        if matches!(self.state.nesting.last(), Some(n) if n.kind == NestingKind::Reserved) {
            self.state.nesting.pop();
            if let Some(parent) = self.state.nesting.last_mut() {
                parent.items = parent.items.saturating_sub(1);
            }
        }
    }

    /// Complete the encoding.
    pub fn finish(self) -> Result<Encoded<'a>, EncodeError> {
        if let Some(e) = self.state.error {
            return Err(e);
        }
        if !self.state.nesting.is_empty() {
            return Err(EncodeError::Unclosed);
        }
        let len = self.state.len;
        match self.target {
            EncodeTarget::Measure => Ok(Encoded::Measured(len)),
            EncodeTarget::Buffer(buf) => {
                let buf: &'a [u8] = buf;
                Ok(Encoded::Written(&buf[..len]))
            }
        }
    }

    fn open(&mut self, kind: NestingKind) {
        if self.state.error.is_some() {
            return;
        }
        self.count_item();
        self.state.nesting.push(Nesting {
            kind,
            start: self.state.len,
            items: 0,
        });
    }

    fn pop(&mut self, kind: NestingKind) -> Option<Nesting> {
        if self.state.error.is_some() {
            return None;
        }
        match self.state.nesting.last() {
            Some(n) if n.kind == kind => self.state.nesting.pop(),
            _ => {
                self.fail(EncodeError::CloseMismatch);
                None
            }
        }
    }

    fn count_item(&mut self) {
        if let Some(n) = self.state.nesting.last_mut() {
            n.items += 1;
        }
    }

    fn fail(&mut self, e: EncodeError) {
        if self.state.error.is_none() {
            self.state.error = Some(e);
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.state.error.is_some() {
            return;
        }
        let Some(end) = self.state.len.checked_add(bytes.len()) else {
            self.fail(EncodeError::LengthOverflow);
            return;
        };
        let start = self.state.len;
        let fits = match &mut self.target {
            EncodeTarget::Measure => true,
            EncodeTarget::Buffer(buf) => match buf.get_mut(start..end) {
                Some(dst) => {
                    dst.copy_from_slice(bytes);
                    true
                }
                None => false,
            },
        };
        if !fits {
            self.fail(EncodeError::BufferTooSmall);
            return;
        }
        self.state.len = end;
    }

    fn insert_head(&mut self, at: usize, head: Head) {
        if self.state.error.is_some() {
            return;
        }
        let len = self.state.len;
        let Some(end) = len.checked_add(head.len) else {
            self.fail(EncodeError::LengthOverflow);
            return;
        };
        if let EncodeTarget::Buffer(buf) = &mut self.target {
            if end > buf.len() {
                self.fail(EncodeError::BufferTooSmall);
                return;
            }
            buf.copy_within(at..len, at + head.len);
            buf[at..at + head.len].copy_from_slice(head.as_slice());
        }
        self.state.len = end;
    }
}
