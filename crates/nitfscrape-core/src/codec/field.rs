//! Fixed-width field codec.
//!
//! Every header field is a fixed number of bytes holding one of three kinds
//! of value:
//!
//! - text: ASCII, right-padded with spaces to the field width
//! - unsigned integer: zero-padded decimal digits
//! - raw bytes: opaque, exactly the field width
//!
//! Records declare their fields as `const` [`Field`] descriptors so that the
//! mnemonic, width and default of a field are stated once and shared by the
//! decoder, the encoder and the builders.

use super::Warning;
use crate::error::{Error, Result};
use bytes::Bytes;

/// The kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Space-padded text
    Text,
    /// Zero-padded decimal digits
    UnsignedInt,
    /// Uninterpreted bytes
    RawBytes,
}

/// Value a field takes when a builder is not given one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// All spaces (text) or zero (integer)
    Blank,
    /// A specific text value
    Text(&'static str),
    /// A specific integer value
    UInt(u64),
}

/// Static description of a single fixed-width field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field mnemonic as used by the format
    pub name: &'static str,
    /// Encoded width in bytes
    pub width: usize,
    /// Kind of value held
    pub kind: FieldKind,
    /// Builder default
    pub default: FieldDefault,
}

impl Field {
    /// Declares a text field defaulting to blanks
    pub const fn text(name: &'static str, width: usize) -> Self {
        Self {
            name,
            width,
            kind: FieldKind::Text,
            default: FieldDefault::Blank,
        }
    }

    /// Declares an unsigned integer field defaulting to zero
    pub const fn uint(name: &'static str, width: usize) -> Self {
        Self {
            name,
            width,
            kind: FieldKind::UnsignedInt,
            default: FieldDefault::Blank,
        }
    }

    /// Declares a raw-bytes field defaulting to zero bytes
    pub const fn raw(name: &'static str, width: usize) -> Self {
        Self {
            name,
            width,
            kind: FieldKind::RawBytes,
            default: FieldDefault::Blank,
        }
    }

    /// Sets a text default
    pub const fn with_text(self, value: &'static str) -> Self {
        Self {
            default: FieldDefault::Text(value),
            ..self
        }
    }

    /// Sets an integer default
    pub const fn with_uint(self, value: u64) -> Self {
        Self {
            default: FieldDefault::UInt(value),
            ..self
        }
    }

    /// Default text value, already normalized
    pub fn initial_text(&self) -> String {
        match self.default {
            FieldDefault::Text(value) => trim_padding(value).to_string(),
            _ => String::new(),
        }
    }

    /// Default integer value
    pub fn initial_uint(&self) -> u64 {
        match self.default {
            FieldDefault::UInt(value) => value,
            _ => 0,
        }
    }

    /// Default raw value: `width` zero bytes
    pub fn initial_raw(&self) -> Bytes {
        Bytes::from(vec![0u8; self.width])
    }

    /// Largest integer expressible in this field's digits
    pub fn max_uint(&self) -> u64 {
        10u64.saturating_pow(self.width as u32) - 1
    }

    /// Validates a text value and returns it normalized (trailing blanks removed)
    pub fn check_text(&self, value: &str) -> Result<String> {
        let value = trim_padding(value);
        if value.len() > self.width {
            return Err(Error::ValueTooLong {
                field: self.name,
                width: self.width,
                actual: value.len(),
            });
        }
        Ok(value.to_string())
    }

    /// Validates that an integer fits in this field's digits
    pub fn check_uint(&self, value: u64) -> Result<u64> {
        if value > self.max_uint() {
            return Err(Error::ValueOutOfRange {
                field: self.name,
                width: self.width,
                value,
            });
        }
        Ok(value)
    }

    /// Validates that a raw value is exactly the field width
    pub fn check_raw(&self, value: &[u8]) -> Result<()> {
        if value.len() != self.width {
            return Err(Error::LengthMismatch {
                field: self.name,
                expected: self.width,
                actual: value.len(),
            });
        }
        Ok(())
    }
}

/// Sum of the widths of a list of fields
pub const fn total_width(fields: &[Field]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].width;
        i += 1;
    }
    total
}

/// An owned decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text with trailing padding removed
    Text(String),
    /// Unsigned integer
    UInt(u64),
    /// Raw bytes
    Raw(Bytes),
}

impl FieldValue {
    /// Borrows this value as a [`FieldRef`]
    pub fn as_field_ref(&self) -> FieldRef<'_> {
        match self {
            FieldValue::Text(s) => FieldRef::Text(s),
            FieldValue::UInt(v) => FieldRef::UInt(*v),
            FieldValue::Raw(b) => FieldRef::Raw(b),
        }
    }
}

/// A borrowed field value, handed to visitors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    /// Text with trailing padding removed
    Text(&'a str),
    /// Unsigned integer
    UInt(u64),
    /// Raw bytes
    Raw(&'a [u8]),
}

impl std::fmt::Display for FieldRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Text(s) => write!(f, "{:?}", s),
            FieldRef::UInt(v) => write!(f, "{}", v),
            FieldRef::Raw(b) => {
                for byte in b.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Decodes one field of any kind at `offset`
pub fn decode_field(buffer: &[u8], offset: usize, field: &Field) -> Result<FieldValue> {
    match field.kind {
        FieldKind::Text => decode_text(buffer, offset, field).map(FieldValue::Text),
        FieldKind::UnsignedInt => decode_uint(buffer, offset, field).map(FieldValue::UInt),
        FieldKind::RawBytes => decode_raw(buffer, offset, field).map(FieldValue::Raw),
    }
}

/// Encodes one field of any kind, always producing exactly `field.width` bytes
pub fn encode_field(value: &FieldValue, field: &Field) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(field.width);
    match (value, field.kind) {
        (FieldValue::Text(s), FieldKind::Text) => encode_text(s, field, &mut out)?,
        (FieldValue::UInt(v), FieldKind::UnsignedInt) => encode_uint(*v, field, &mut out)?,
        (FieldValue::Raw(b), FieldKind::RawBytes) => encode_raw(b, field, &mut out)?,
        _ => {
            return Err(Error::invalid_value(
                field.name,
                format!("value {:?} does not match field kind {:?}", value, field.kind),
            ))
        }
    }
    Ok(out)
}

/// Decodes a text field, removing trailing space padding
pub fn decode_text(buffer: &[u8], offset: usize, field: &Field) -> Result<String> {
    let bytes = slice(buffer, offset, field)?;
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::malformed(field.name, offset, "text is not valid UTF-8"))?;
    Ok(trim_padding(text).to_string())
}

/// Decodes a zero-padded decimal field
pub fn decode_uint(buffer: &[u8], offset: usize, field: &Field) -> Result<u64> {
    let bytes = slice(buffer, offset, field)?;
    let mut value: u64 = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(Error::malformed(
                field.name,
                offset,
                format!(
                    "expected {} decimal digits, found {:?}",
                    field.width,
                    String::from_utf8_lossy(bytes)
                ),
            ));
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(byte - b'0')))
            .ok_or_else(|| Error::malformed(field.name, offset, "integer overflow"))?;
    }
    Ok(value)
}

/// Decodes a raw-bytes field
pub fn decode_raw(buffer: &[u8], offset: usize, field: &Field) -> Result<Bytes> {
    slice(buffer, offset, field).map(Bytes::copy_from_slice)
}

/// Encodes text right-padded with spaces
pub fn encode_text(value: &str, field: &Field, out: &mut Vec<u8>) -> Result<()> {
    if value.len() > field.width {
        return Err(Error::ValueTooLong {
            field: field.name,
            width: field.width,
            actual: value.len(),
        });
    }
    out.extend_from_slice(value.as_bytes());
    out.resize(out.len() + field.width - value.len(), b' ');
    Ok(())
}

/// Encodes an integer as zero-padded decimal
pub fn encode_uint(value: u64, field: &Field, out: &mut Vec<u8>) -> Result<()> {
    field.check_uint(value)?;
    let digits = format!("{:0width$}", value, width = field.width);
    out.extend_from_slice(digits.as_bytes());
    Ok(())
}

/// Encodes raw bytes, which must match the field width exactly
pub fn encode_raw(value: &[u8], field: &Field, out: &mut Vec<u8>) -> Result<()> {
    field.check_raw(value)?;
    out.extend_from_slice(value);
    Ok(())
}

/// Shortens `value` to at most `width` bytes, reporting when it had to.
///
/// This is the opt-in alternative to [`Error::ValueTooLong`] for fields
/// where losing trailing text is preferable to refusing to write.
pub fn truncate_text(value: &str, width: usize, field: &'static str) -> (String, Option<Warning>) {
    let value = trim_padding(value);
    if value.len() <= width {
        return (value.to_string(), None);
    }

    let mut end = width;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let warning = Warning::new(
        field,
        format!("truncated from {} to {} bytes", value.len(), end),
    );
    (value[..end].to_string(), Some(warning))
}

fn slice<'a>(buffer: &'a [u8], offset: usize, field: &Field) -> Result<&'a [u8]> {
    let available = buffer.len().saturating_sub(offset);
    if available < field.width {
        return Err(Error::truncated(field.name, offset, field.width, available));
    }
    Ok(&buffer[offset..offset + field.width])
}

fn trim_padding(value: &str) -> &str {
    value.trim_end_matches(' ')
}
