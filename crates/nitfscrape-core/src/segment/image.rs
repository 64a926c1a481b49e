//! Image segment subheader.
//!
//! ## Layout
//!
//! ```text
//! IM IID1 IDATIM TGTID IID2 <security> ENCRYP ISORCE NROWS NCOLS PVTYPE
//! IREP ICAT ABPP PJUST ICORDS [IGEOLO] <comments> IC [COMRAT] <bands>
//! ISYNC IMODE NBPR NBPC NPPBH NPPBV NBPP IDLVL IALVL ILOC IMAG
//! <user data> <extended subheader>
//! ```
//!
//! `IGEOLO` is present only when `ICORDS` is non-blank and `COMRAT` only
//! when `IC` names a compressed image.

use super::bands::{ImageBands, ImageComments};
use crate::codec::{
    text_accessors, text_setters, total_width, value_accessors, value_setters, Checked, Field,
    FieldReader, FieldRef, FieldVisitor, FieldWriter, Record, Warning,
};
use crate::error::{Error, Result};
use crate::header::{OverflowHeader, SecurityTags};

const IM: Field = Field::text("IM", 2).with_text("IM");
const IID1: Field = Field::text("IID1", 10);
const IDATIM: Field = Field::text("IDATIM", 14);
const TGTID: Field = Field::text("TGTID", 17);
const IID2: Field = Field::text("IID2", 80);

const ENCRYP: Field = Field::text("ENCRYP", 1).with_text("0");
const ISORCE: Field = Field::text("ISORCE", 42);
const NROWS: Field = Field::uint("NROWS", 8);
const NCOLS: Field = Field::uint("NCOLS", 8);
const PVTYPE: Field = Field::text("PVTYPE", 3);
const IREP: Field = Field::text("IREP", 8).with_text("NODISPLY");
const ICAT: Field = Field::text("ICAT", 8).with_text("SAR");
const ABPP: Field = Field::uint("ABPP", 2);
const PJUST: Field = Field::text("PJUST", 1).with_text("R");
const ICORDS: Field = Field::text("ICORDS", 1).with_text("G");
const IGEOLO: Field = Field::text("IGEOLO", 60);

const IC: Field = Field::text("IC", 2).with_text("NC");
const COMRAT: Field = Field::text("COMRAT", 4);

const ISYNC: Field = Field::uint("ISYNC", 1).with_uint(0);
const IMODE: Field = Field::text("IMODE", 1).with_text("P");
const NBPR: Field = Field::uint("NBPR", 4).with_uint(1);
const NBPC: Field = Field::uint("NBPC", 4).with_uint(1);
const NPPBH: Field = Field::uint("NPPBH", 4);
const NPPBV: Field = Field::uint("NPPBV", 4);
const NBPP: Field = Field::uint("NBPP", 2);
const IDLVL: Field = Field::uint("IDLVL", 3);
const IALVL: Field = Field::uint("IALVL", 3);
const ILOC: Field = Field::text("ILOC", 10);
const IMAG: Field = Field::text("IMAG", 4).with_text("1.0 ");

const IDENTITY: [Field; 5] = [IM, IID1, IDATIM, TGTID, IID2];
const GEOMETRY: [Field; 10] = [ENCRYP, ISORCE, NROWS, NCOLS, PVTYPE, IREP, ICAT, ABPP, PJUST, ICORDS];
const DISPLAY: [Field; 11] = [ISYNC, IMODE, NBPR, NBPC, NPPBH, NPPBV, NBPP, IDLVL, IALVL, ILOC, IMAG];

/// Compression codes that carry no `COMRAT` field
const UNCOMPRESSED: [&str; 2] = ["NC", "NM"];

/// Subheader of an image segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSegmentHeader {
    image_id: String,
    date_time: String,
    target_id: String,
    title: String,
    security: SecurityTags,
    encryption: String,
    source: String,
    rows: u32,
    columns: u32,
    pixel_value_type: String,
    representation: String,
    category: String,
    actual_bits_per_pixel: u8,
    justification: String,
    coordinate_system: String,
    geolocation: String,
    comments: ImageComments,
    compression: String,
    compression_rate: String,
    bands: ImageBands,
    sync_code: u8,
    mode: String,
    blocks_per_row: u16,
    blocks_per_column: u16,
    pixels_per_block_horizontal: u16,
    pixels_per_block_vertical: u16,
    bits_per_pixel: u8,
    display_level: u16,
    attachment_level: u16,
    location: String,
    magnification: String,
    user_data: OverflowHeader,
    extended_subheader: OverflowHeader,
}

impl Default for ImageSegmentHeader {
    fn default() -> Self {
        Self {
            image_id: String::new(),
            date_time: String::new(),
            target_id: String::new(),
            title: String::new(),
            security: SecurityTags::default(),
            encryption: ENCRYP.initial_text(),
            source: String::new(),
            rows: 0,
            columns: 0,
            pixel_value_type: String::new(),
            representation: IREP.initial_text(),
            category: ICAT.initial_text(),
            actual_bits_per_pixel: 0,
            justification: PJUST.initial_text(),
            coordinate_system: ICORDS.initial_text(),
            geolocation: String::new(),
            comments: ImageComments::default(),
            compression: IC.initial_text(),
            compression_rate: String::new(),
            bands: ImageBands::default(),
            sync_code: ISYNC.initial_uint() as u8,
            mode: IMODE.initial_text(),
            blocks_per_row: NBPR.initial_uint() as u16,
            blocks_per_column: NBPC.initial_uint() as u16,
            pixels_per_block_horizontal: 0,
            pixels_per_block_vertical: 0,
            bits_per_pixel: 0,
            display_level: 0,
            attachment_level: 0,
            location: String::new(),
            magnification: IMAG.initial_text(),
            user_data: OverflowHeader::absent(),
            extended_subheader: OverflowHeader::absent(),
        }
    }
}

impl ImageSegmentHeader {
    /// Starts building a subheader from the defaults
    pub fn builder() -> ImageSegmentHeaderBuilder {
        ImageSegmentHeaderBuilder::default()
    }

    text_accessors! {
        /// IID1: image identifier
        image_id,
        /// IDATIM: image date and time
        date_time,
        /// TGTID: target identifier
        target_id,
        /// IID2: image title
        title,
        /// ENCRYP: encryption flag
        encryption,
        /// ISORCE: image source
        source,
        /// PVTYPE: pixel value type
        pixel_value_type,
        /// IREP: image representation
        representation,
        /// ICAT: image category
        category,
        /// PJUST: pixel justification
        justification,
        /// ICORDS: coordinate system, blank when the image is not georeferenced
        coordinate_system,
        /// IGEOLO: corner coordinates, empty when `ICORDS` is blank
        geolocation,
        /// IC: compression code
        compression,
        /// COMRAT: compression rate, empty for uncompressed images
        compression_rate,
        /// IMODE: image mode
        mode,
        /// ILOC: image location
        location,
        /// IMAG: magnification
        magnification,
    }

    value_accessors! {
        /// NROWS: significant rows
        rows: u32,
        /// NCOLS: significant columns
        columns: u32,
        /// ABPP: actual bits per pixel
        actual_bits_per_pixel: u8,
        /// ISYNC: sync code
        sync_code: u8,
        /// NBPR: blocks per row
        blocks_per_row: u16,
        /// NBPC: blocks per column
        blocks_per_column: u16,
        /// NPPBH: pixels per block horizontally
        pixels_per_block_horizontal: u16,
        /// NPPBV: pixels per block vertically
        pixels_per_block_vertical: u16,
        /// NBPP: bits per pixel per band
        bits_per_pixel: u8,
        /// IDLVL: display level
        display_level: u16,
        /// IALVL: attachment level
        attachment_level: u16,
    }

    /// Image security tags
    pub fn security(&self) -> &SecurityTags {
        &self.security
    }

    /// Image comments
    pub fn comments(&self) -> &ImageComments {
        &self.comments
    }

    /// Band descriptors
    pub fn bands(&self) -> &ImageBands {
        &self.bands
    }

    /// User-defined image data block (`UDIDL`)
    pub fn user_data(&self) -> &OverflowHeader {
        &self.user_data
    }

    /// Image extended subheader block (`IXSHDL`)
    pub fn extended_subheader(&self) -> &OverflowHeader {
        &self.extended_subheader
    }

    /// Returns true if the subheader carries `IGEOLO`
    pub fn has_geolocation(&self) -> bool {
        !self.coordinate_system.is_empty()
    }

    /// Returns true if the subheader carries `COMRAT`
    pub fn has_compression_rate(&self) -> bool {
        is_compressed(&self.compression)
    }

    fn identity_entries(&self) -> [(&'static Field, FieldRef<'_>); 5] {
        [
            (&IM, FieldRef::Text("IM")),
            (&IID1, FieldRef::Text(&self.image_id)),
            (&IDATIM, FieldRef::Text(&self.date_time)),
            (&TGTID, FieldRef::Text(&self.target_id)),
            (&IID2, FieldRef::Text(&self.title)),
        ]
    }

    fn geometry_entries(&self) -> [(&'static Field, FieldRef<'_>); 10] {
        [
            (&ENCRYP, FieldRef::Text(&self.encryption)),
            (&ISORCE, FieldRef::Text(&self.source)),
            (&NROWS, FieldRef::UInt(u64::from(self.rows))),
            (&NCOLS, FieldRef::UInt(u64::from(self.columns))),
            (&PVTYPE, FieldRef::Text(&self.pixel_value_type)),
            (&IREP, FieldRef::Text(&self.representation)),
            (&ICAT, FieldRef::Text(&self.category)),
            (&ABPP, FieldRef::UInt(u64::from(self.actual_bits_per_pixel))),
            (&PJUST, FieldRef::Text(&self.justification)),
            (&ICORDS, FieldRef::Text(&self.coordinate_system)),
        ]
    }

    fn display_entries(&self) -> [(&'static Field, FieldRef<'_>); 11] {
        [
            (&ISYNC, FieldRef::UInt(u64::from(self.sync_code))),
            (&IMODE, FieldRef::Text(&self.mode)),
            (&NBPR, FieldRef::UInt(u64::from(self.blocks_per_row))),
            (&NBPC, FieldRef::UInt(u64::from(self.blocks_per_column))),
            (&NPPBH, FieldRef::UInt(u64::from(self.pixels_per_block_horizontal))),
            (&NPPBV, FieldRef::UInt(u64::from(self.pixels_per_block_vertical))),
            (&NBPP, FieldRef::UInt(u64::from(self.bits_per_pixel))),
            (&IDLVL, FieldRef::UInt(u64::from(self.display_level))),
            (&IALVL, FieldRef::UInt(u64::from(self.attachment_level))),
            (&ILOC, FieldRef::Text(&self.location)),
            (&IMAG, FieldRef::Text(&self.magnification)),
        ]
    }
}

fn is_compressed(code: &str) -> bool {
    !UNCOMPRESSED.contains(&code)
}

impl Record for ImageSegmentHeader {
    type Args = ();
    const NAME: &'static str = "ImageSegmentHeader";

    fn minimum_length() -> usize {
        total_width(&IDENTITY)
            + SecurityTags::LENGTH
            + total_width(&GEOMETRY)
            + ImageComments::minimum_length()
            + IC.width
            + ImageBands::minimum_length()
            + total_width(&DISPLAY)
            + 2 * OverflowHeader::minimum_length()
    }

    fn encoded_len(&self) -> usize {
        let geolocation = if self.has_geolocation() { IGEOLO.width } else { 0 };
        let compression_rate = if self.has_compression_rate() { COMRAT.width } else { 0 };
        total_width(&IDENTITY)
            + SecurityTags::LENGTH
            + total_width(&GEOMETRY)
            + geolocation
            + self.comments.encoded_len()
            + IC.width
            + compression_rate
            + self.bands.encoded_len()
            + total_width(&DISPLAY)
            + self.user_data.encoded_len()
            + self.extended_subheader.encoded_len()
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let start = reader.position();
        let tag = reader.text(&IM)?;
        if tag != "IM" {
            return Err(Error::malformed(IM.name, start, format!("expected \"IM\", found {:?}", tag)));
        }

        let image_id = reader.text(&IID1)?;
        let date_time = reader.text(&IDATIM)?;
        let target_id = reader.text(&TGTID)?;
        let title = reader.text(&IID2)?;
        let security = reader.record::<SecurityTags>()?;
        let encryption = reader.text(&ENCRYP)?;
        let source = reader.text(&ISORCE)?;
        let rows = reader.uint(&NROWS)? as u32;
        let columns = reader.uint(&NCOLS)? as u32;
        let pixel_value_type = reader.text(&PVTYPE)?;
        let representation = reader.text(&IREP)?;
        let category = reader.text(&ICAT)?;
        let actual_bits_per_pixel = reader.uint(&ABPP)? as u8;
        let justification = reader.text(&PJUST)?;
        let coordinate_system = reader.text(&ICORDS)?;
        let geolocation = if coordinate_system.is_empty() {
            String::new()
        } else {
            reader.text(&IGEOLO)?
        };

        let comments = reader.record::<ImageComments>()?;
        let compression = reader.text(&IC)?;
        let compression_rate = if is_compressed(&compression) {
            reader.text(&COMRAT)?
        } else {
            String::new()
        };
        let bands = reader.record::<ImageBands>()?;

        let sync_code = reader.uint(&ISYNC)? as u8;
        let mode = reader.text(&IMODE)?;
        let blocks_per_row = reader.uint(&NBPR)? as u16;
        let blocks_per_column = reader.uint(&NBPC)? as u16;
        let pixels_per_block_horizontal = reader.uint(&NPPBH)? as u16;
        let pixels_per_block_vertical = reader.uint(&NPPBV)? as u16;
        let bits_per_pixel = reader.uint(&NBPP)? as u8;
        let display_level = reader.uint(&IDLVL)? as u16;
        let attachment_level = reader.uint(&IALVL)? as u16;
        let location = reader.text(&ILOC)?;
        let magnification = reader.text(&IMAG)?;
        let user_data = reader.record::<OverflowHeader>()?;
        let extended_subheader = reader.record::<OverflowHeader>()?;

        Ok(Self {
            image_id,
            date_time,
            target_id,
            title,
            security,
            encryption,
            source,
            rows,
            columns,
            pixel_value_type,
            representation,
            category,
            actual_bits_per_pixel,
            justification,
            coordinate_system,
            geolocation,
            comments,
            compression,
            compression_rate,
            bands,
            sync_code,
            mode,
            blocks_per_row,
            blocks_per_column,
            pixels_per_block_horizontal,
            pixels_per_block_vertical,
            bits_per_pixel,
            display_level,
            attachment_level,
            location,
            magnification,
            user_data,
            extended_subheader,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        for (field, value) in self.identity_entries() {
            writer.value(field, value)?;
        }
        writer.record(&self.security)?;
        for (field, value) in self.geometry_entries() {
            writer.value(field, value)?;
        }
        if self.has_geolocation() {
            writer.text(&IGEOLO, &self.geolocation)?;
        }
        writer.record(&self.comments)?;
        writer.text(&IC, &self.compression)?;
        if self.has_compression_rate() {
            writer.text(&COMRAT, &self.compression_rate)?;
        }
        writer.record(&self.bands)?;
        for (field, value) in self.display_entries() {
            writer.value(field, value)?;
        }
        writer.record(&self.user_data)?;
        writer.record(&self.extended_subheader)
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        for (field, value) in self.identity_entries() {
            visitor.field(field, value);
        }
        self.security.visit(visitor);
        for (field, value) in self.geometry_entries() {
            visitor.field(field, value);
        }
        if self.has_geolocation() {
            visitor.field(&IGEOLO, FieldRef::Text(&self.geolocation));
        }
        self.comments.visit(visitor);
        visitor.field(&IC, FieldRef::Text(&self.compression));
        if self.has_compression_rate() {
            visitor.field(&COMRAT, FieldRef::Text(&self.compression_rate));
        }
        self.bands.visit(visitor);
        for (field, value) in self.display_entries() {
            visitor.field(field, value);
        }
        self.user_data.visit(visitor);
        self.extended_subheader.visit(visitor);
        visitor.exit_record(Self::NAME);
    }
}

/// Builder for [`ImageSegmentHeader`]
#[derive(Debug, Clone, Default)]
pub struct ImageSegmentHeaderBuilder {
    inner: ImageSegmentHeader,
    warnings: Vec<Warning>,
}

impl ImageSegmentHeaderBuilder {
    text_setters! {
        /// Sets IID1
        image_id,
        /// Sets IDATIM
        date_time,
        /// Sets TGTID
        target_id,
        /// Sets IID2
        title,
        /// Sets ENCRYP
        encryption,
        /// Sets ISORCE
        source,
        /// Sets PVTYPE
        pixel_value_type,
        /// Sets IREP
        representation,
        /// Sets ICAT
        category,
        /// Sets PJUST
        justification,
        /// Sets ICORDS; a blank value removes `IGEOLO` from the layout
        coordinate_system,
        /// Sets IGEOLO
        geolocation,
        /// Sets IC; `NC` or `NM` removes `COMRAT` from the layout
        compression,
        /// Sets COMRAT
        compression_rate,
        /// Sets IMODE
        mode,
        /// Sets ILOC
        location,
        /// Sets IMAG
        magnification,
    }

    value_setters! {
        /// Sets NROWS
        rows: u32,
        /// Sets NCOLS
        columns: u32,
        /// Sets ABPP
        actual_bits_per_pixel: u8,
        /// Sets ISYNC
        sync_code: u8,
        /// Sets NBPR
        blocks_per_row: u16,
        /// Sets NBPC
        blocks_per_column: u16,
        /// Sets NPPBH
        pixels_per_block_horizontal: u16,
        /// Sets NPPBV
        pixels_per_block_vertical: u16,
        /// Sets NBPP
        bits_per_pixel: u8,
        /// Sets IDLVL
        display_level: u16,
        /// Sets IALVL
        attachment_level: u16,
        /// Sets the security tags
        security: SecurityTags,
        /// Sets the band descriptors
        bands: ImageBands,
    }

    /// Sets the comments, keeping any truncation warnings
    pub fn comments(mut self, comments: impl Into<Checked<ImageComments>>) -> Self {
        self.inner.comments = comments.into().drain_into(&mut self.warnings);
        self
    }

    /// Sets the user-defined image data block, keeping any truncation warnings
    pub fn user_data(mut self, block: impl Into<Checked<OverflowHeader>>) -> Self {
        self.inner.user_data = block.into().drain_into(&mut self.warnings);
        self
    }

    /// Sets the extended subheader block, keeping any truncation warnings
    pub fn extended_subheader(mut self, block: impl Into<Checked<OverflowHeader>>) -> Self {
        self.inner.extended_subheader = block.into().drain_into(&mut self.warnings);
        self
    }

    /// Validates every field and the conditional-field rules, returning the
    /// subheader with any warnings collected along the way.
    pub fn build(self) -> Result<Checked<ImageSegmentHeader>> {
        let Self {
            mut inner,
            warnings,
        } = self;

        inner.image_id = IID1.check_text(&inner.image_id)?;
        inner.date_time = IDATIM.check_text(&inner.date_time)?;
        inner.target_id = TGTID.check_text(&inner.target_id)?;
        inner.title = IID2.check_text(&inner.title)?;
        inner.encryption = ENCRYP.check_text(&inner.encryption)?;
        inner.source = ISORCE.check_text(&inner.source)?;
        NROWS.check_uint(u64::from(inner.rows))?;
        NCOLS.check_uint(u64::from(inner.columns))?;
        inner.pixel_value_type = PVTYPE.check_text(&inner.pixel_value_type)?;
        inner.representation = IREP.check_text(&inner.representation)?;
        inner.category = ICAT.check_text(&inner.category)?;
        ABPP.check_uint(u64::from(inner.actual_bits_per_pixel))?;
        inner.justification = PJUST.check_text(&inner.justification)?;
        inner.coordinate_system = ICORDS.check_text(&inner.coordinate_system)?;
        inner.geolocation = IGEOLO.check_text(&inner.geolocation)?;
        inner.compression = IC.check_text(&inner.compression)?;
        inner.compression_rate = COMRAT.check_text(&inner.compression_rate)?;
        ISYNC.check_uint(u64::from(inner.sync_code))?;
        inner.mode = IMODE.check_text(&inner.mode)?;
        NBPR.check_uint(u64::from(inner.blocks_per_row))?;
        NBPC.check_uint(u64::from(inner.blocks_per_column))?;
        NPPBH.check_uint(u64::from(inner.pixels_per_block_horizontal))?;
        NPPBV.check_uint(u64::from(inner.pixels_per_block_vertical))?;
        NBPP.check_uint(u64::from(inner.bits_per_pixel))?;
        IDLVL.check_uint(u64::from(inner.display_level))?;
        IALVL.check_uint(u64::from(inner.attachment_level))?;
        inner.location = ILOC.check_text(&inner.location)?;
        inner.magnification = IMAG.check_text(&inner.magnification)?;

        if !inner.has_geolocation() && !inner.geolocation.is_empty() {
            return Err(Error::invalid_value(
                IGEOLO.name,
                "corner coordinates given but ICORDS is blank",
            ));
        }
        if !inner.has_compression_rate() && !inner.compression_rate.is_empty() {
            return Err(Error::invalid_value(
                COMRAT.name,
                format!("compression rate given but IC is {}", inner.compression),
            ));
        }

        Ok(Checked::new(inner, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StatsVisitor;
    use crate::segment::{ImageBand, LookupTable};
    use pretty_assertions::assert_eq;

    fn sicd_like() -> ImageSegmentHeader {
        let bands = ImageBands::new(vec![
            ImageBand::builder().subcategory("I").build().unwrap(),
            ImageBand::builder().subcategory("Q").build().unwrap(),
        ])
        .unwrap();

        ImageSegmentHeader::builder()
            .image_id("SICD000")
            .date_time("20240102030405")
            .title("SAR collect")
            .source("SAR sensor")
            .rows(2048)
            .columns(4096)
            .pixel_value_type("R")
            .actual_bits_per_pixel(32)
            .geolocation("0".repeat(60))
            .bands(bands)
            .pixels_per_block_horizontal(4096)
            .pixels_per_block_vertical(2048)
            .bits_per_pixel(32)
            .display_level(1)
            .build()
            .unwrap()
            .into_value()
    }

    #[test]
    fn test_defaults() {
        let header = ImageSegmentHeader::default();
        assert_eq!(header.representation(), "NODISPLY");
        assert_eq!(header.category(), "SAR");
        assert_eq!(header.coordinate_system(), "G");
        assert_eq!(header.compression(), "NC");
        assert_eq!(header.blocks_per_row(), 1);
        assert_eq!(header.magnification(), "1.0");
        assert_eq!(header.bands().len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let header = sicd_like();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), header.encoded_len());
        assert_eq!(&bytes[..2], b"IM");

        let (decoded, consumed) = ImageSegmentHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.bands().bands()[1].subcategory(), "Q");
    }

    #[test]
    fn test_encoded_length() {
        let header = sicd_like();
        // 123 + 167 + 82 + 60 + 1 + 2 + (1 + 2 * 13) + 40 + 5 + 5
        assert_eq!(header.encoded_len(), 512);
        assert_eq!(ImageSegmentHeader::minimum_length(), 439);
    }

    #[test]
    fn test_blank_coordinates_drop_geolocation() {
        let with = sicd_like();
        let without = ImageSegmentHeader::builder()
            .coordinate_system("")
            .build()
            .unwrap()
            .into_value();
        assert!(with.has_geolocation());
        assert!(!without.has_geolocation());

        let bytes = without.to_bytes().unwrap();
        let (decoded, _) = ImageSegmentHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, without);
        assert_eq!(decoded.geolocation(), "");
    }

    #[test]
    fn test_compressed_image_carries_rate() {
        let header = ImageSegmentHeader::builder()
            .compression("C8")
            .compression_rate("N045")
            .comments(ImageComments::new(["first", "second"]))
            .build()
            .unwrap()
            .into_value();
        assert!(header.has_compression_rate());

        let bytes = header.to_bytes().unwrap();
        let (decoded, consumed) = ImageSegmentHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded.compression_rate(), "N045");
        assert_eq!(decoded.comments().len(), 2);
        assert_eq!(consumed, header.encoded_len());
    }

    #[test]
    fn test_conditional_field_rules() {
        let err = ImageSegmentHeader::builder()
            .coordinate_system(" ")
            .geolocation("N")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "IGEOLO", .. }));

        let err = ImageSegmentHeader::builder()
            .compression("NM")
            .compression_rate("1.0")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "COMRAT", .. }));
    }

    #[test]
    fn test_extension_blocks_round_trip() {
        let header = ImageSegmentHeader::builder()
            .user_data(OverflowHeader::from_text("UDID"))
            .extended_subheader(OverflowHeader::new(1, Some(&b"BLOCKA00010abcdefghij"[..])))
            .bands(ImageBands::single(
                ImageBand::builder()
                    .representation("LU")
                    .lookup_table(LookupTable::new(3, 2, vec![0u8, 1, 2, 3, 4, 5]).unwrap())
                    .build()
                    .unwrap(),
            ))
            .build()
            .unwrap()
            .into_value();

        let bytes = header.to_bytes().unwrap();
        let (decoded, _) = ImageSegmentHeader::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.extended_subheader().overflow(), 1);
        assert_eq!(decoded.user_data().body(), Some(&b"UDID"[..]));
    }

    #[test]
    fn test_builder_forwards_comment_warnings() {
        let checked = ImageSegmentHeader::builder()
            .comments(ImageComments::new(["c".repeat(120)]))
            .build()
            .unwrap();
        assert_eq!(checked.warnings().len(), 1);
        assert_eq!(checked.value().comments().comments()[0].len(), 80);
    }

    #[test]
    fn test_wrong_tag() {
        let mut bytes = sicd_like().to_bytes().unwrap();
        bytes[..2].copy_from_slice(b"TE");
        let err = ImageSegmentHeader::from_bytes(&bytes, 0).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "IM", offset: 0, .. }));
    }

    #[test]
    fn test_truncated() {
        let bytes = sicd_like().to_bytes().unwrap();
        let err = ImageSegmentHeader::from_bytes(&bytes[..200], 0).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { what: "ImageSegmentHeader", .. }));
    }

    #[test]
    fn test_visit_counts_bytes() {
        let header = sicd_like();
        let mut stats = StatsVisitor::default();
        header.visit(&mut stats);
        assert_eq!(stats.byte_count, header.encoded_len());
    }
}
