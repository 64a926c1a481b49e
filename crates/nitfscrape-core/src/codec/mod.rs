//! Record codec: the shared machinery behind every header type.
//!
//! A header is a tree of records. Each record is an ordered sequence of
//! fixed-width [`Field`]s and nested records, decoded front to back at
//! increasing offsets and encoded by concatenation in the same order.
//!
//! ## Architecture
//!
//! - [`field`]: the fixed-width field codec and `const` field descriptors
//! - [`Record`]: the capability every record type implements
//! - [`FieldReader`] / [`FieldWriter`]: cursors the records decode from and encode into
//! - [`visit`]: generic traversal of decoded records
//!
//! Truncation that a record chooses to tolerate rather than reject is
//! reported through [`Checked`], never logged as a side effect.

pub mod field;
pub mod visit;

use crate::error::{Error, Result};
use bytes::Bytes;
use std::fmt;

pub use field::{
    decode_field, encode_field, total_width, truncate_text, Field, FieldDefault, FieldKind,
    FieldRef, FieldValue,
};
pub use visit::{FieldVisitor, NullVisitor, StatsVisitor};

/// A non-fatal diagnostic produced while constructing a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Field or record the warning concerns
    pub field: &'static str,
    /// Human-readable description
    pub message: String,
}

impl Warning {
    /// Creates a new warning
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A successfully constructed value together with any warnings raised
/// while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Checked<T> {
    value: T,
    warnings: Vec<Warning>,
}

impl<T> Checked<T> {
    /// Wraps a value with its warnings
    pub fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    /// Wraps a value that raised no warnings
    pub fn clean(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    /// Returns the value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the warnings
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Returns true if any warning was raised
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Discards the warnings and returns the value
    pub fn into_value(self) -> T {
        self.value
    }

    /// Splits into value and warnings
    pub fn into_parts(self) -> (T, Vec<Warning>) {
        (self.value, self.warnings)
    }

    /// Moves this value's warnings into `sink` and returns the value
    pub fn drain_into(self, sink: &mut Vec<Warning>) -> T {
        sink.extend(self.warnings);
        self.value
    }
}

impl<T> From<T> for Checked<T> {
    fn from(value: T) -> Self {
        Self::clean(value)
    }
}

/// Capability shared by every header record.
///
/// Implementors describe how to decode themselves from a [`FieldReader`] and
/// encode into a [`FieldWriter`]; the provided methods add the buffer-level
/// entry points and the early truncation check.
pub trait Record: Sized {
    /// Extra decode-time configuration (e.g. digit widths); `()` for most records
    type Args: Copy;

    /// Record name used in errors and visitors
    const NAME: &'static str;

    /// Smallest number of bytes any encoding of this record can occupy
    fn minimum_length() -> usize;

    /// Exact number of bytes [`Record::to_bytes`] will produce
    fn encoded_len(&self) -> usize;

    /// Decodes the record at the reader's position
    fn decode(reader: &mut FieldReader<'_>, args: Self::Args) -> Result<Self>;

    /// Encodes the record at the writer's end
    fn encode(&self, writer: &mut FieldWriter) -> Result<()>;

    /// Walks the record's fields in encoded order
    fn visit(&self, visitor: &mut dyn FieldVisitor);

    /// Decodes from `buffer[start..]` with explicit arguments, returning the
    /// record and the number of bytes consumed.
    fn from_bytes_with(buffer: &[u8], start: usize, args: Self::Args) -> Result<(Self, usize)> {
        let mut reader = FieldReader::new(buffer, start);
        let record = reader.record_with::<Self>(args)?;
        Ok((record, reader.position() - start))
    }

    /// Decodes from `buffer[start..]`, returning the record and the number of
    /// bytes consumed.
    fn from_bytes(buffer: &[u8], start: usize) -> Result<(Self, usize)>
    where
        Self::Args: Default,
    {
        Self::from_bytes_with(buffer, start, Self::Args::default())
    }

    /// Encodes the record into a new buffer
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = FieldWriter::with_capacity(self.encoded_len());
        self.encode(&mut writer)?;
        Ok(writer.into_bytes())
    }
}

/// Forward-only decoding cursor over a byte buffer
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader positioned at `start`
    pub fn new(buffer: &'a [u8], start: usize) -> Self {
        Self {
            buffer,
            position: start,
        }
    }

    /// Current absolute offset into the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Fails with [`Error::TruncatedInput`] unless `needed` bytes remain
    pub fn require(&self, what: &'static str, needed: usize) -> Result<()> {
        let available = self.remaining();
        if available < needed {
            return Err(Error::truncated(what, self.position, needed, available));
        }
        Ok(())
    }

    /// Decodes a text field `skip` bytes ahead without advancing
    pub fn peek_text(&self, skip: usize, field: &Field) -> Result<String> {
        field::decode_text(self.buffer, self.position + skip, field)
    }

    /// Decodes a text field
    pub fn text(&mut self, field: &Field) -> Result<String> {
        let value = field::decode_text(self.buffer, self.position, field)?;
        self.position += field.width;
        Ok(value)
    }

    /// Decodes an unsigned integer field
    pub fn uint(&mut self, field: &Field) -> Result<u64> {
        let value = field::decode_uint(self.buffer, self.position, field)?;
        self.position += field.width;
        Ok(value)
    }

    /// Decodes a raw-bytes field
    pub fn raw(&mut self, field: &Field) -> Result<Bytes> {
        let value = field::decode_raw(self.buffer, self.position, field)?;
        self.position += field.width;
        Ok(value)
    }

    /// Reads a variable-length blob
    pub fn bytes(&mut self, what: &'static str, len: usize) -> Result<Bytes> {
        self.require(what, len)?;
        let value = Bytes::copy_from_slice(&self.buffer[self.position..self.position + len]);
        self.position += len;
        Ok(value)
    }

    /// Decodes a nested record that takes no arguments
    pub fn record<R: Record>(&mut self) -> Result<R>
    where
        R::Args: Default,
    {
        self.record_with(R::Args::default())
    }

    /// Decodes a nested record, checking its minimum length first
    pub fn record_with<R: Record>(&mut self, args: R::Args) -> Result<R> {
        self.require(R::NAME, R::minimum_length())?;
        R::decode(self, args)
    }
}

/// Append-only encoding buffer
#[derive(Debug, Clone, Default)]
pub struct FieldWriter {
    buffer: Vec<u8>,
}

impl FieldWriter {
    /// Creates an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Encodes a text field
    pub fn text(&mut self, field: &Field, value: &str) -> Result<()> {
        field::encode_text(value, field, &mut self.buffer)
    }

    /// Encodes an unsigned integer field
    pub fn uint(&mut self, field: &Field, value: u64) -> Result<()> {
        field::encode_uint(value, field, &mut self.buffer)
    }

    /// Encodes a raw-bytes field
    pub fn raw(&mut self, field: &Field, value: &[u8]) -> Result<()> {
        field::encode_raw(value, field, &mut self.buffer)
    }

    /// Encodes a field from a borrowed value of matching kind
    pub fn value(&mut self, field: &Field, value: FieldRef<'_>) -> Result<()> {
        match value {
            FieldRef::Text(text) => self.text(field, text),
            FieldRef::UInt(number) => self.uint(field, number),
            FieldRef::Raw(bytes) => self.raw(field, bytes),
        }
    }

    /// Appends a variable-length blob verbatim
    pub fn bytes(&mut self, value: &[u8]) {
        self.buffer.extend_from_slice(value);
    }

    /// Encodes a nested record
    pub fn record<R: Record>(&mut self, record: &R) -> Result<()> {
        record.encode(self)
    }

    /// Returns the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Generates `&str` getters for text fields
macro_rules! text_accessors {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&self) -> &str {
                &self.$name
            }
        )*
    };
}

/// Generates by-value getters for `Copy` fields
macro_rules! value_accessors {
    ($($(#[$meta:meta])* $name:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&self) -> $ty {
                self.$name
            }
        )*
    };
}

/// Generates chained builder setters for text fields of `self.inner`
macro_rules! text_setters {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(mut self, value: impl Into<String>) -> Self {
                self.inner.$name = value.into();
                self
            }
        )*
    };
}

/// Generates chained builder setters for `Copy` fields of `self.inner`
macro_rules! value_setters {
    ($($(#[$meta:meta])* $name:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(mut self, value: $ty) -> Self {
                self.inner.$name = value;
                self
            }
        )*
    };
}

pub(crate) use text_accessors;
pub(crate) use text_setters;
pub(crate) use value_accessors;
pub(crate) use value_setters;
