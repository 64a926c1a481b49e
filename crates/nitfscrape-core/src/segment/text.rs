//! Text segment subheader.
//!
//! This is a fixed-length layout: `TXSHDL` and `TXSOFL` are carried as plain
//! numbers and no extended subheader bytes are read, so a text subheader with
//! a non-zero `TXSHDL` decodes only its fixed prefix.

use crate::codec::{
    text_accessors, text_setters, total_width, value_accessors, value_setters, Field, FieldReader,
    FieldRef, FieldVisitor, FieldWriter, Record,
};
use crate::error::{Error, Result};
use crate::header::SecurityTags;

const TE: Field = Field::text("TE", 2).with_text("TE");
const TEXTID: Field = Field::text("TEXTID", 7);
const TXTALVL: Field = Field::uint("TXTALVL", 3);
const TXTDT: Field = Field::text("TXTDT", 14);
const TXTITL: Field = Field::text("TXTITL", 80);
const ENCRYP: Field = Field::uint("ENCRYP", 1).with_uint(0);
const TXTFMT: Field = Field::text("TXTFMT", 3);
const TXSHDL: Field = Field::uint("TXSHDL", 5);
const TXSOFL: Field = Field::uint("TXSOFL", 3);

const LEADING: [Field; 5] = [TE, TEXTID, TXTALVL, TXTDT, TXTITL];
const TRAILING: [Field; 4] = [ENCRYP, TXTFMT, TXSHDL, TXSOFL];

/// Subheader of a text segment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextSegmentHeader {
    text_id: String,
    attachment_level: u16,
    date_time: String,
    title: String,
    security: SecurityTags,
    encryption: u8,
    format: String,
    extended_length: u32,
    extended_overflow: u16,
}

impl TextSegmentHeader {
    /// Encoded length in bytes
    pub const LENGTH: usize = total_width(&LEADING) + SecurityTags::LENGTH + total_width(&TRAILING);

    /// Starts building a subheader from the defaults
    pub fn builder() -> TextSegmentHeaderBuilder {
        TextSegmentHeaderBuilder::default()
    }

    text_accessors! {
        /// TEXTID: text identifier
        text_id,
        /// TXTDT: text date and time
        date_time,
        /// TXTITL: text title
        title,
        /// TXTFMT: text format code, e.g. `STA` or `UT1`
        format,
    }

    value_accessors! {
        /// TXTALVL: attachment level
        attachment_level: u16,
        /// ENCRYP: encryption flag
        encryption: u8,
        /// TXSHDL: declared extended subheader length
        extended_length: u32,
        /// TXSOFL: extended subheader overflow index
        extended_overflow: u16,
    }

    /// Text security tags
    pub fn security(&self) -> &SecurityTags {
        &self.security
    }

    fn leading_entries(&self) -> [(&'static Field, FieldRef<'_>); 5] {
        [
            (&TE, FieldRef::Text("TE")),
            (&TEXTID, FieldRef::Text(&self.text_id)),
            (&TXTALVL, FieldRef::UInt(u64::from(self.attachment_level))),
            (&TXTDT, FieldRef::Text(&self.date_time)),
            (&TXTITL, FieldRef::Text(&self.title)),
        ]
    }

    fn trailing_entries(&self) -> [(&'static Field, FieldRef<'_>); 4] {
        [
            (&ENCRYP, FieldRef::UInt(u64::from(self.encryption))),
            (&TXTFMT, FieldRef::Text(&self.format)),
            (&TXSHDL, FieldRef::UInt(u64::from(self.extended_length))),
            (&TXSOFL, FieldRef::UInt(u64::from(self.extended_overflow))),
        ]
    }
}

impl Record for TextSegmentHeader {
    type Args = ();
    const NAME: &'static str = "TextSegmentHeader";

    fn minimum_length() -> usize {
        Self::LENGTH
    }

    fn encoded_len(&self) -> usize {
        Self::LENGTH
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let start = reader.position();
        let tag = reader.text(&TE)?;
        if tag != "TE" {
            return Err(Error::malformed(TE.name, start, format!("expected \"TE\", found {:?}", tag)));
        }

        Ok(Self {
            text_id: reader.text(&TEXTID)?,
            attachment_level: reader.uint(&TXTALVL)? as u16,
            date_time: reader.text(&TXTDT)?,
            title: reader.text(&TXTITL)?,
            security: reader.record::<SecurityTags>()?,
            encryption: reader.uint(&ENCRYP)? as u8,
            format: reader.text(&TXTFMT)?,
            extended_length: reader.uint(&TXSHDL)? as u32,
            extended_overflow: reader.uint(&TXSOFL)? as u16,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        for (field, value) in self.leading_entries() {
            writer.value(field, value)?;
        }
        writer.record(&self.security)?;
        for (field, value) in self.trailing_entries() {
            writer.value(field, value)?;
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        for (field, value) in self.leading_entries() {
            visitor.field(field, value);
        }
        self.security.visit(visitor);
        for (field, value) in self.trailing_entries() {
            visitor.field(field, value);
        }
        visitor.exit_record(Self::NAME);
    }
}

/// Builder for [`TextSegmentHeader`]
#[derive(Debug, Clone, Default)]
pub struct TextSegmentHeaderBuilder {
    inner: TextSegmentHeader,
}

impl TextSegmentHeaderBuilder {
    text_setters! {
        /// Sets TEXTID
        text_id,
        /// Sets TXTDT
        date_time,
        /// Sets TXTITL
        title,
        /// Sets TXTFMT
        format,
    }

    value_setters! {
        /// Sets TXTALVL
        attachment_level: u16,
        /// Sets ENCRYP
        encryption: u8,
        /// Sets TXSHDL
        extended_length: u32,
        /// Sets TXSOFL
        extended_overflow: u16,
        /// Sets the security tags
        security: SecurityTags,
    }

    /// Validates every field and returns the subheader
    pub fn build(mut self) -> Result<TextSegmentHeader> {
        let header = &mut self.inner;
        header.text_id = TEXTID.check_text(&header.text_id)?;
        TXTALVL.check_uint(u64::from(header.attachment_level))?;
        header.date_time = TXTDT.check_text(&header.date_time)?;
        header.title = TXTITL.check_text(&header.title)?;
        ENCRYP.check_uint(u64::from(header.encryption))?;
        header.format = TXTFMT.check_text(&header.format)?;
        TXSHDL.check_uint(u64::from(header.extended_length))?;
        TXSOFL.check_uint(u64::from(header.extended_overflow))?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixed_length() {
        assert_eq!(TextSegmentHeader::LENGTH, 285);
        let bytes = TextSegmentHeader::default().to_bytes().unwrap();
        assert_eq!(bytes.len(), 285);
        assert_eq!(&bytes[..2], b"TE");
        assert_eq!(&bytes[273..], b"0   00000000");
    }

    #[test]
    fn test_round_trip() {
        let header = TextSegmentHeader::builder()
            .text_id("TXT0001")
            .attachment_level(2)
            .date_time("20240102030405")
            .title("Mission notes")
            .format("STA")
            .build()
            .unwrap();

        let bytes = header.to_bytes().unwrap();
        let (decoded, consumed) = TextSegmentHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, 285);
        assert_eq!(decoded.format(), "STA");
    }

    #[test]
    fn test_builder_limits() {
        let err = TextSegmentHeader::builder().text_id("TOO-LONG-ID").build().unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { field: "TEXTID", .. }));

        let err = TextSegmentHeader::builder().attachment_level(1000).build().unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { field: "TXTALVL", .. }));
    }

    #[test]
    fn test_wrong_tag() {
        let mut bytes = TextSegmentHeader::default().to_bytes().unwrap();
        bytes[..2].copy_from_slice(b"DE");
        let err = TextSegmentHeader::from_bytes(&bytes, 0).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "TE", .. }));
    }

    #[test]
    fn test_non_digit_level() {
        let mut bytes = TextSegmentHeader::default().to_bytes().unwrap();
        bytes[9..12].copy_from_slice(b"0x1");
        let err = TextSegmentHeader::from_bytes(&bytes, 0).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "TXTALVL", offset: 9, .. }));
    }
}
