//! The file header and the records it is built from.
//!
//! ## Layout
//!
//! ```text
//! FHDR FVER CLEVEL STYPE OSTAID FDT FTITLE <security> FSCOP FSCPYS ENCRYP
//! FBKGC ONAME OPHONE FL HL <image table> <graphics table> NUMX <text table>
//! <des table> <res table> <user header> <extended header>
//! ```
//!
//! The header length field `HL` always equals the header's own encoded
//! length: builders compute it, and decoding rejects a header whose stored
//! value disagrees.

mod item_array;
mod overflow;
mod security;

use crate::codec::field::decode_uint;
use crate::codec::{
    text_accessors, text_setters, total_width, value_accessors, value_setters, Checked, Field,
    FieldReader, FieldRef, FieldVisitor, FieldWriter, Record, Warning,
};
use crate::error::{Error, Result};
use bytes::Bytes;
use tracing::trace;

pub use item_array::{ItemArrayTable, ItemWidths, SegmentKind};
pub use overflow::OverflowHeader;
pub use security::{SecurityTags, SecurityTagsBuilder};

/// Format and version marker at the start of every file
pub const MAGIC: &[u8; 9] = b"NITF02.10";

const FHDR: Field = Field::text("FHDR", 4).with_text("NITF");
const FVER: Field = Field::text("FVER", 5).with_text("02.10");
const CLEVEL: Field = Field::uint("CLEVEL", 2).with_uint(3);
const STYPE: Field = Field::text("STYPE", 4).with_text("BF01");
const OSTAID: Field = Field::text("OSTAID", 10);
const FDT: Field = Field::text("FDT", 14);
const FTITLE: Field = Field::text("FTITLE", 80);
const FSCOP: Field = Field::uint("FSCOP", 5);
const FSCPYS: Field = Field::uint("FSCPYS", 5);
const ENCRYP: Field = Field::text("ENCRYP", 1).with_text("0");
const FBKGC: Field = Field::raw("FBKGC", 3);
const ONAME: Field = Field::text("ONAME", 24);
const OPHONE: Field = Field::text("OPHONE", 18);
const FL: Field = Field::uint("FL", 12);
const HL: Field = Field::uint("HL", 6);
const NUMX: Field = Field::uint("NUMX", 3);

const LEADING: [Field; 7] = [FHDR, FVER, CLEVEL, STYPE, OSTAID, FDT, FTITLE];
const TRAILING: [Field; 9] = [FSCOP, FSCPYS, ENCRYP, FBKGC, ONAME, OPHONE, FL, HL, NUMX];

/// Absolute offset of the 6-digit header length field
pub const HEADER_LENGTH_OFFSET: u64 =
    (total_width(&LEADING) + SecurityTags::LENGTH + total_width(&TRAILING) - HL.width - NUMX.width)
        as u64;

/// Width in digits of the header length field
pub const HEADER_LENGTH_WIDTH: usize = HL.width;

/// Absolute offset of the 12-digit file length field
pub const FILE_LENGTH_OFFSET: u64 = HEADER_LENGTH_OFFSET - FL.width as u64;

/// Decodes the raw digits of the header length field, reporting errors at
/// the field's absolute offset.
pub fn decode_header_length(digits: &[u8]) -> Result<u64> {
    decode_uint(digits, 0, &HL).map_err(|err| match err {
        Error::MalformedField { field, details, .. } => {
            Error::malformed(field, HEADER_LENGTH_OFFSET as usize, details)
        }
        other => other,
    })
}

/// The file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    complexity_level: u8,
    system_type: String,
    originating_station: String,
    date_time: String,
    title: String,
    security: SecurityTags,
    copy_number: u32,
    copy_count: u32,
    encryption: String,
    background_color: Bytes,
    originator_name: String,
    originator_phone: String,
    file_length: u64,
    header_length: u64,
    tables: [ItemArrayTable; 5],
    reserved_count: u16,
    user_header: OverflowHeader,
    extended_header: OverflowHeader,
}

impl FileHeader {
    /// Starts building a header from the defaults
    pub fn builder() -> FileHeaderBuilder {
        FileHeaderBuilder::default()
    }

    text_accessors! {
        /// STYPE: system type
        system_type,
        /// OSTAID: originating station
        originating_station,
        /// FDT: file date and time, `CCYYMMDDhhmmss`
        date_time,
        /// FTITLE: file title
        title,
        /// ENCRYP: encryption flag
        encryption,
        /// ONAME: originator name
        originator_name,
        /// OPHONE: originator phone
        originator_phone,
    }

    value_accessors! {
        /// CLEVEL: complexity level
        complexity_level: u8,
        /// FSCOP: copy number
        copy_number: u32,
        /// FSCPYS: number of copies
        copy_count: u32,
        /// FL: total file length in bytes
        file_length: u64,
        /// HL: header length in bytes, equal to the encoded length
        header_length: u64,
        /// NUMX: reserved count, always zero in practice
        reserved_count: u16,
    }

    /// File security tags
    pub fn security(&self) -> &SecurityTags {
        &self.security
    }

    /// FBKGC: background colour, three raw bytes
    pub fn background_color(&self) -> &[u8] {
        &self.background_color
    }

    /// The item array table for one segment kind
    pub fn table(&self, kind: SegmentKind) -> &ItemArrayTable {
        &self.tables[kind.index()]
    }

    /// User-defined header block
    pub fn user_header(&self) -> &OverflowHeader {
        &self.user_header
    }

    /// Extended header block
    pub fn extended_header(&self) -> &OverflowHeader {
        &self.extended_header
    }

    /// Sum of every segment's subheader and item size
    pub fn segments_size(&self) -> u64 {
        self.tables.iter().map(ItemArrayTable::total_size).sum()
    }

    fn computed_len(&self) -> usize {
        total_width(&LEADING)
            + SecurityTags::LENGTH
            + total_width(&TRAILING)
            + self.tables.iter().map(|table| table.encoded_len()).sum::<usize>()
            + self.user_header.encoded_len()
            + self.extended_header.encoded_len()
    }

    fn leading_entries(&self) -> [(&'static Field, FieldRef<'_>); 7] {
        [
            (&FHDR, FieldRef::Text("NITF")),
            (&FVER, FieldRef::Text("02.10")),
            (&CLEVEL, FieldRef::UInt(u64::from(self.complexity_level))),
            (&STYPE, FieldRef::Text(&self.system_type)),
            (&OSTAID, FieldRef::Text(&self.originating_station)),
            (&FDT, FieldRef::Text(&self.date_time)),
            (&FTITLE, FieldRef::Text(&self.title)),
        ]
    }

    fn trailing_entries(&self) -> [(&'static Field, FieldRef<'_>); 8] {
        [
            (&FSCOP, FieldRef::UInt(u64::from(self.copy_number))),
            (&FSCPYS, FieldRef::UInt(u64::from(self.copy_count))),
            (&ENCRYP, FieldRef::Text(&self.encryption)),
            (&FBKGC, FieldRef::Raw(&self.background_color)),
            (&ONAME, FieldRef::Text(&self.originator_name)),
            (&OPHONE, FieldRef::Text(&self.originator_phone)),
            (&FL, FieldRef::UInt(self.file_length)),
            (&HL, FieldRef::UInt(self.header_length)),
        ]
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            complexity_level: CLEVEL.initial_uint() as u8,
            system_type: STYPE.initial_text(),
            originating_station: String::new(),
            date_time: String::new(),
            title: String::new(),
            security: SecurityTags::default(),
            copy_number: 0,
            copy_count: 0,
            encryption: ENCRYP.initial_text(),
            background_color: FBKGC.initial_raw(),
            originator_name: String::new(),
            originator_phone: String::new(),
            file_length: 0,
            header_length: 0,
            tables: SegmentKind::ALL.map(ItemArrayTable::empty),
            reserved_count: 0,
            user_header: OverflowHeader::absent(),
            extended_header: OverflowHeader::absent(),
        }
    }
}

impl Record for FileHeader {
    type Args = ();
    const NAME: &'static str = "FileHeader";

    fn minimum_length() -> usize {
        total_width(&LEADING)
            + SecurityTags::LENGTH
            + total_width(&TRAILING)
            + 5 * ItemArrayTable::minimum_length()
            + 2 * OverflowHeader::minimum_length()
    }

    fn encoded_len(&self) -> usize {
        self.computed_len()
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let start = reader.position();

        let fhdr = reader.text(&FHDR)?;
        let fver = reader.text(&FVER)?;
        if fhdr.as_bytes() != &MAGIC[..4] || fver.as_bytes() != &MAGIC[4..] {
            return Err(Error::not_this_format(format!("{}{}", fhdr, fver).as_bytes()));
        }

        let complexity_level = reader.uint(&CLEVEL)? as u8;
        let system_type = reader.text(&STYPE)?;
        let originating_station = reader.text(&OSTAID)?;
        let date_time = reader.text(&FDT)?;
        let title = reader.text(&FTITLE)?;
        let security = reader.record::<SecurityTags>()?;
        let copy_number = reader.uint(&FSCOP)? as u32;
        let copy_count = reader.uint(&FSCPYS)? as u32;
        let encryption = reader.text(&ENCRYP)?;
        let background_color = reader.raw(&FBKGC)?;
        let originator_name = reader.text(&ONAME)?;
        let originator_phone = reader.text(&OPHONE)?;
        let file_length = reader.uint(&FL)?;
        let header_length = reader.uint(&HL)?;

        let image = reader.record_with::<ItemArrayTable>(SegmentKind::Image.widths())?;
        let graphics = reader.record_with::<ItemArrayTable>(SegmentKind::Graphics.widths())?;
        let reserved_count = reader.uint(&NUMX)? as u16;
        let text = reader.record_with::<ItemArrayTable>(SegmentKind::Text.widths())?;
        let des = reader.record_with::<ItemArrayTable>(SegmentKind::DataExtension.widths())?;
        let res = reader.record_with::<ItemArrayTable>(SegmentKind::ReservedExtension.widths())?;

        let user_header = reader.record::<OverflowHeader>()?;
        let extended_header = reader.record::<OverflowHeader>()?;

        let consumed = (reader.position() - start) as u64;
        if header_length != consumed {
            return Err(Error::malformed(
                HL.name,
                start + HEADER_LENGTH_OFFSET as usize,
                format!("declares {} bytes but the header encodes {}", header_length, consumed),
            ));
        }
        trace!("decoded file header: {} bytes, file length {}", header_length, file_length);

        Ok(Self {
            complexity_level,
            system_type,
            originating_station,
            date_time,
            title,
            security,
            copy_number,
            copy_count,
            encryption,
            background_color,
            originator_name,
            originator_phone,
            file_length,
            header_length,
            tables: [image, graphics, text, des, res],
            reserved_count,
            user_header,
            extended_header,
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

        let [image, graphics, text, des, res] = &self.tables;
        writer.record(image)?;
        writer.record(graphics)?;
        writer.uint(&NUMX, u64::from(self.reserved_count))?;
        writer.record(text)?;
        writer.record(des)?;
        writer.record(res)?;

        writer.record(&self.user_header)?;
        writer.record(&self.extended_header)
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

        let [image, graphics, text, des, res] = &self.tables;
        image.visit(visitor);
        graphics.visit(visitor);
        visitor.field(&NUMX, FieldRef::UInt(u64::from(self.reserved_count)));
        text.visit(visitor);
        des.visit(visitor);
        res.visit(visitor);

        self.user_header.visit(visitor);
        self.extended_header.visit(visitor);
        visitor.exit_record(Self::NAME);
    }
}

/// Builder for [`FileHeader`].
///
/// `HL` is always computed. `FL` is computed as `HL` plus the size of every
/// segment listed in the item array tables unless set explicitly.
#[derive(Debug, Clone, Default)]
pub struct FileHeaderBuilder {
    inner: FileHeader,
    file_length: Option<u64>,
    warnings: Vec<Warning>,
}

impl FileHeaderBuilder {
    text_setters! {
        /// Sets STYPE
        system_type,
        /// Sets OSTAID
        originating_station,
        /// Sets FDT
        date_time,
        /// Sets FTITLE
        title,
        /// Sets ENCRYP
        encryption,
        /// Sets ONAME
        originator_name,
        /// Sets OPHONE
        originator_phone,
    }

    value_setters! {
        /// Sets CLEVEL
        complexity_level: u8,
        /// Sets FSCOP
        copy_number: u32,
        /// Sets FSCPYS
        copy_count: u32,
        /// Sets the security tags
        security: SecurityTags,
    }

    /// Sets FBKGC
    pub fn background_color(mut self, rgb: impl Into<Bytes>) -> Self {
        self.inner.background_color = rgb.into();
        self
    }

    /// Sets FL explicitly instead of deriving it
    pub fn file_length(mut self, length: u64) -> Self {
        self.file_length = Some(length);
        self
    }

    /// Sets the item array table for `kind`
    pub fn table(mut self, kind: SegmentKind, table: ItemArrayTable) -> Self {
        self.inner.tables[kind.index()] = table;
        self
    }

    /// Sets the user-defined header block, keeping any truncation warnings
    pub fn user_header(mut self, header: impl Into<Checked<OverflowHeader>>) -> Self {
        self.inner.user_header = header.into().drain_into(&mut self.warnings);
        self
    }

    /// Sets the extended header block, keeping any truncation warnings
    pub fn extended_header(mut self, header: impl Into<Checked<OverflowHeader>>) -> Self {
        self.inner.extended_header = header.into().drain_into(&mut self.warnings);
        self
    }

    /// Validates every field, computes `HL` (and `FL` if unset) and returns
    /// the header with any warnings collected along the way.
    pub fn build(self) -> Result<Checked<FileHeader>> {
        let Self {
            mut inner,
            file_length,
            warnings,
        } = self;

        CLEVEL.check_uint(u64::from(inner.complexity_level))?;
        inner.system_type = STYPE.check_text(&inner.system_type)?;
        inner.originating_station = OSTAID.check_text(&inner.originating_station)?;
        inner.date_time = FDT.check_text(&inner.date_time)?;
        inner.title = FTITLE.check_text(&inner.title)?;
        FSCOP.check_uint(u64::from(inner.copy_number))?;
        FSCPYS.check_uint(u64::from(inner.copy_count))?;
        inner.encryption = ENCRYP.check_text(&inner.encryption)?;
        FBKGC.check_raw(&inner.background_color)?;
        inner.originator_name = ONAME.check_text(&inner.originator_name)?;
        inner.originator_phone = OPHONE.check_text(&inner.originator_phone)?;

        for kind in SegmentKind::ALL {
            if inner.tables[kind.index()].widths() != kind.widths() {
                return Err(Error::invalid_value(
                    "ItemArrayTable",
                    format!("{} table built with widths {:?}", kind, inner.tables[kind.index()].widths()),
                ));
            }
        }

        inner.header_length = HL.check_uint(inner.computed_len() as u64)?;
        let derived = inner.header_length + inner.segments_size();
        inner.file_length = FL.check_uint(file_length.unwrap_or(derived))?;

        Ok(Checked::new(inner, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StatsVisitor;
    use pretty_assertions::assert_eq;

    fn sample_header() -> FileHeader {
        FileHeader::builder()
            .originating_station("STATION")
            .date_time("20240102030405")
            .title("Test collect")
            .originator_name("Analyst")
            .table(
                SegmentKind::Image,
                ItemArrayTable::for_kind(SegmentKind::Image, vec![439, 439], vec![4096, 8192]).unwrap(),
            )
            .table(
                SegmentKind::DataExtension,
                ItemArrayTable::for_kind(SegmentKind::DataExtension, vec![200], vec![1234]).unwrap(),
            )
            .build()
            .unwrap()
            .into_value()
    }

    #[test]
    fn test_header_length_offset() {
        assert_eq!(HEADER_LENGTH_OFFSET, 354);
        assert_eq!(FileHeader::minimum_length(), 388);
    }

    #[test]
    fn test_decode_header_length() {
        assert_eq!(FILE_LENGTH_OFFSET, 342);
        assert_eq!(decode_header_length(b"000439").unwrap(), 439);
        let err = decode_header_length(b"00x439").unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "HL", offset: 354, .. }));
    }

    #[test]
    fn test_default_header_is_minimal() {
        let header = FileHeader::builder().build().unwrap().into_value();
        assert_eq!(header.header_length(), 388);
        assert_eq!(header.file_length(), 388);

        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), 388);
        assert_eq!(&bytes[..9], MAGIC);
        assert_eq!(&bytes[354..360], b"000388");
    }

    #[test]
    fn test_header_length_self_consistent() {
        let header = sample_header();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(header.header_length() as usize, bytes.len());
        assert_eq!(header.encoded_len(), bytes.len());
        assert_eq!(
            header.file_length(),
            header.header_length() + 439 + 439 + 4096 + 8192 + 200 + 1234
        );
    }

    #[test]
    fn test_round_trip() {
        let header = FileHeader::builder()
            .title("With blocks")
            .background_color(vec![0xff, 0x00, 0x7f])
            .security(SecurityTags::builder().classification("R").build().unwrap())
            .user_header(OverflowHeader::from_text("USER DATA"))
            .extended_header(OverflowHeader::new(2, Some(&b"\x00\x01binary"[..])))
            .file_length(123_456)
            .build()
            .unwrap()
            .into_value();

        let bytes = header.to_bytes().unwrap();
        let (decoded, consumed) = FileHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.file_length(), 123_456);
        assert_eq!(decoded.user_header().body(), Some(&b"USER DATA"[..]));
    }

    #[test]
    fn test_tables_round_trip() {
        let header = sample_header();
        let bytes = header.to_bytes().unwrap();
        let (decoded, _) = FileHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded.table(SegmentKind::Image).len(), 2);
        assert_eq!(decoded.table(SegmentKind::DataExtension).item_sizes(), &[1234]);
        assert!(decoded.table(SegmentKind::Text).is_empty());
    }

    #[test]
    fn test_inconsistent_header_length_rejected() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[354..360].copy_from_slice(b"000400");
        let err = FileHeader::from_bytes(&bytes, 0).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "HL", .. }));
    }

    #[test]
    fn test_wrong_magic() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[4..9].copy_from_slice(b"02.00");
        let err = FileHeader::from_bytes(&bytes, 0).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_truncated() {
        let bytes = sample_header().to_bytes().unwrap();
        let err = FileHeader::from_bytes(&bytes[..300], 0).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { what: "FileHeader", .. }));

        let err = FileHeader::from_bytes(&bytes[..bytes.len() - 1], 0).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { .. }));
    }

    #[test]
    fn test_builder_rejects_bad_values() {
        let err = FileHeader::builder().title("x".repeat(81)).build().unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { field: "FTITLE", .. }));

        let err = FileHeader::builder()
            .background_color(vec![0u8; 2])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { field: "FBKGC", .. }));

        let err = FileHeader::builder().complexity_level(100).build().unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { field: "CLEVEL", .. }));
    }

    #[test]
    fn test_builder_rejects_table_for_wrong_kind() {
        let err = FileHeader::builder()
            .table(SegmentKind::Text, ItemArrayTable::empty(SegmentKind::Image))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn test_builder_forwards_truncation_warnings() {
        let checked = FileHeader::builder()
            .user_header(OverflowHeader::new(0, Some(vec![b'a'; 100_000])))
            .build()
            .unwrap();
        assert_eq!(checked.warnings().len(), 1);
        assert_eq!(checked.value().user_header().overflow(), 9);
    }

    #[test]
    fn test_visit_counts_bytes() {
        let header = sample_header();
        let mut stats = StatsVisitor::default();
        header.visit(&mut stats);
        assert_eq!(stats.byte_count, header.encoded_len());
    }
}
