//! Length-prefixed user-defined and extended header blocks.
//!
//! Layout: a 5-digit total length; when non-zero it is followed by a 3-digit
//! overflow index and `total - 8` bytes of body. A zero length means the
//! block is absent and occupies only those 5 bytes.

use crate::codec::{Checked, Field, FieldReader, FieldRef, FieldVisitor, FieldWriter, Record, Warning};
use crate::error::{Error, Result};
use bytes::Bytes;
use tracing::debug;

const LENGTH: Field = Field::uint("HDL", 5);
const OVERFLOW: Field = Field::uint("OFL", 3);

/// Bytes of the length and overflow-index prefix counted by the length field
const PREFIX_LEN: usize = 8;

/// Optional user-defined header block with an overflow counter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverflowHeader {
    overflow: u64,
    body: Option<Bytes>,
}

impl OverflowHeader {
    /// Largest body the 5-digit length field can describe
    pub const MAX_BODY_LEN: usize = 99_991;

    /// Largest value the overflow index field can hold
    pub const MAX_OVERFLOW_INDEX: u64 = 999;

    /// Creates a block.
    ///
    /// A body longer than [`OverflowHeader::MAX_BODY_LEN`] is cut to that
    /// length; the number of dropped bytes is added to the overflow counter
    /// and reported as a warning.
    pub fn new(overflow: u64, body: Option<impl Into<Bytes>>) -> Checked<Self> {
        let mut overflow = overflow;
        let mut warnings = Vec::new();

        let body = body.map(|body| {
            let mut body: Bytes = body.into();
            if body.len() > Self::MAX_BODY_LEN {
                let excess = body.len() - Self::MAX_BODY_LEN;
                debug!(
                    "truncating header body from {} to {} bytes",
                    body.len(),
                    Self::MAX_BODY_LEN
                );
                warnings.push(Warning::new(
                    "HD",
                    format!(
                        "body truncated from {} to {} bytes",
                        body.len(),
                        Self::MAX_BODY_LEN
                    ),
                ));
                body.truncate(Self::MAX_BODY_LEN);
                overflow += excess as u64;
            }
            body
        });

        Checked::new(Self { overflow, body }, warnings)
    }

    /// Creates a block holding `text`
    pub fn from_text(text: &str) -> Checked<Self> {
        Self::new(0, Some(Bytes::copy_from_slice(text.as_bytes())))
    }

    /// An absent block
    pub fn absent() -> Self {
        Self::default()
    }

    /// Overflow counter.
    ///
    /// When it exceeds [`OverflowHeader::MAX_OVERFLOW_INDEX`] the encoded
    /// index is clamped to 999.
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Body bytes, if present
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Returns true if the block carries a body
    pub fn is_present(&self) -> bool {
        self.body.is_some()
    }

    /// Value written to the 5-digit length field
    pub fn declared_len(&self) -> usize {
        self.body.as_ref().map_or(0, |body| PREFIX_LEN + body.len())
    }

    fn encoded_index(&self) -> u64 {
        self.overflow.min(Self::MAX_OVERFLOW_INDEX)
    }
}

impl Record for OverflowHeader {
    type Args = ();
    const NAME: &'static str = "OverflowHeader";

    fn minimum_length() -> usize {
        LENGTH.width
    }

    fn encoded_len(&self) -> usize {
        match &self.body {
            Some(body) => PREFIX_LEN + body.len(),
            None => LENGTH.width,
        }
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let start = reader.position();
        let total = reader.uint(&LENGTH)? as usize;
        if total == 0 {
            return Ok(Self::absent());
        }
        if total < PREFIX_LEN {
            return Err(Error::malformed(
                LENGTH.name,
                start,
                format!("length {} is shorter than its own {}-byte prefix", total, PREFIX_LEN),
            ));
        }

        reader.require(Self::NAME, total - LENGTH.width)?;
        let overflow = reader.uint(&OVERFLOW)?;
        let body = reader.bytes("HD", total - PREFIX_LEN)?;
        Ok(Self {
            overflow,
            body: Some(body),
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        writer.uint(&LENGTH, self.declared_len() as u64)?;
        if let Some(body) = &self.body {
            writer.uint(&OVERFLOW, self.encoded_index())?;
            writer.bytes(body);
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        visitor.field(&LENGTH, FieldRef::UInt(self.declared_len() as u64));
        if let Some(body) = &self.body {
            visitor.field(&OVERFLOW, FieldRef::UInt(self.encoded_index()));
            visitor.blob("HD", body);
        }
        visitor.exit_record(Self::NAME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absent() {
        let header = OverflowHeader::absent();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes, b"00000");

        let (decoded, consumed) = OverflowHeader::from_bytes(b"00000trailing", 0).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_round_trip() {
        let header = OverflowHeader::from_text("CMETAA00005hello").into_value();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"00024000");
        assert_eq!(bytes.len(), header.encoded_len());

        let (decoded, consumed) = OverflowHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, 24);
    }

    #[test]
    fn test_empty_body_is_present() {
        let header = OverflowHeader::new(3, Some(Vec::new())).into_value();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes, b"00008003");
        let (decoded, _) = OverflowHeader::from_bytes(&bytes, 0).unwrap();
        assert!(decoded.is_present());
        assert_eq!(decoded.overflow(), 3);
    }

    #[test]
    fn test_body_truncation_feeds_overflow() {
        let body = vec![b'x'; 100_000];
        let checked = OverflowHeader::new(0, Some(body));
        assert!(checked.has_warnings());

        let header = checked.into_value();
        assert_eq!(header.body().unwrap().len(), 99_991);
        assert_eq!(header.overflow(), 9);
        assert_eq!(header.declared_len(), 99_999);
        assert_eq!(header.to_bytes().unwrap().len(), 99_999);
    }

    #[test]
    fn test_overflow_index_clamped() {
        let header = OverflowHeader::new(1500, Some(&b"abc"[..])).into_value();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"00011999");
        assert_eq!(header.overflow(), 1500);
    }

    #[test]
    fn test_length_shorter_than_prefix() {
        let err = OverflowHeader::from_bytes(b"00005123", 0).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "HDL", .. }));
    }

    #[test]
    fn test_truncated_body() {
        let err = OverflowHeader::from_bytes(b"00020000abc", 0).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { .. }));
    }
}
