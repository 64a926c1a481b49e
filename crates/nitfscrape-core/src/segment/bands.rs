//! Nested records of the image subheader: band descriptors with their
//! optional lookup tables, and the comment block.

use crate::codec::{
    text_accessors, text_setters, total_width, truncate_text, Checked, Field, FieldReader,
    FieldRef, FieldVisitor, FieldWriter, Record, Warning,
};
use crate::error::{Error, Result};
use bytes::Bytes;
use tracing::debug;

const IREPBAND: Field = Field::text("IREPBAND", 2);
const ISUBCAT: Field = Field::text("ISUBCAT", 6);
const IFC: Field = Field::text("IFC", 1).with_text("N");
const IMFLT: Field = Field::text("IMFLT", 3);
const NLUTS: Field = Field::uint("NLUTS", 1);
const NELUT: Field = Field::uint("NELUT", 5);

const BAND_FIELDS: [Field; 5] = [IREPBAND, ISUBCAT, IFC, IMFLT, NLUTS];

const NBANDS: Field = Field::uint("NBANDS", 1);
const XBANDS: Field = Field::uint("XBANDS", 5);

const NICOM: Field = Field::uint("NICOM", 1);
const ICOM: Field = Field::text("ICOM", 80);

/// Lookup tables of one band: `rows` tables of `columns` entries each,
/// stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    rows: usize,
    columns: usize,
    data: Bytes,
}

impl LookupTable {
    /// Most tables a band may carry
    pub const MAX_ROWS: usize = 4;

    /// Most entries per table
    pub const MAX_COLUMNS: usize = 65_536;

    /// Creates a lookup table, checking the dimensions against the data
    pub fn new(rows: usize, columns: usize, data: impl Into<Bytes>) -> Result<Self> {
        if rows == 0 || rows > Self::MAX_ROWS {
            return Err(Error::invalid_value(
                NLUTS.name,
                format!("{} tables, expected 1 to {}", rows, Self::MAX_ROWS),
            ));
        }
        if columns == 0 || columns > Self::MAX_COLUMNS {
            return Err(Error::invalid_value(
                NELUT.name,
                format!("{} entries, expected 1 to {}", columns, Self::MAX_COLUMNS),
            ));
        }

        let data = data.into();
        if data.len() != rows * columns {
            return Err(Error::LengthMismatch {
                field: "LUTD",
                expected: rows * columns,
                actual: data.len(),
            });
        }

        Ok(Self {
            rows,
            columns,
            data,
        })
    }

    /// Number of tables
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Entries per table
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// All entries, row-major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Entries of table `index`
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        (index < self.rows).then(|| &self.data[index * self.columns..(index + 1) * self.columns])
    }

    fn encoded_len(&self) -> usize {
        NELUT.width + self.data.len()
    }
}

/// Descriptor of one image band
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBand {
    representation: String,
    subcategory: String,
    filter_condition: String,
    filter_code: String,
    lookup_table: Option<LookupTable>,
}

impl Default for ImageBand {
    fn default() -> Self {
        Self {
            representation: String::new(),
            subcategory: String::new(),
            filter_condition: IFC.initial_text(),
            filter_code: String::new(),
            lookup_table: None,
        }
    }
}

impl ImageBand {
    /// Starts building a band from the defaults
    pub fn builder() -> ImageBandBuilder {
        ImageBandBuilder::default()
    }

    text_accessors! {
        /// IREPBAND: band representation
        representation,
        /// ISUBCAT: band subcategory
        subcategory,
        /// IFC: filter condition
        filter_condition,
        /// IMFLT: standard image filter code
        filter_code,
    }

    /// Lookup tables, if the band has any
    pub fn lookup_table(&self) -> Option<&LookupTable> {
        self.lookup_table.as_ref()
    }

    fn entries(&self) -> [(&'static Field, &str); 4] {
        [
            (&IREPBAND, &self.representation),
            (&ISUBCAT, &self.subcategory),
            (&IFC, &self.filter_condition),
            (&IMFLT, &self.filter_code),
        ]
    }
}

impl Record for ImageBand {
    type Args = ();
    const NAME: &'static str = "ImageBand";

    fn minimum_length() -> usize {
        total_width(&BAND_FIELDS)
    }

    fn encoded_len(&self) -> usize {
        Self::minimum_length() + self.lookup_table.as_ref().map_or(0, LookupTable::encoded_len)
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let representation = reader.text(&IREPBAND)?;
        let subcategory = reader.text(&ISUBCAT)?;
        let filter_condition = reader.text(&IFC)?;
        let filter_code = reader.text(&IMFLT)?;

        let rows_offset = reader.position();
        let rows = reader.uint(&NLUTS)? as usize;
        let lookup_table = if rows == 0 {
            None
        } else {
            if rows > LookupTable::MAX_ROWS {
                return Err(Error::malformed(
                    NLUTS.name,
                    rows_offset,
                    format!("{} lookup tables, at most {} allowed", rows, LookupTable::MAX_ROWS),
                ));
            }
            let columns_offset = reader.position();
            let columns = reader.uint(&NELUT)? as usize;
            if columns == 0 || columns > LookupTable::MAX_COLUMNS {
                return Err(Error::malformed(
                    NELUT.name,
                    columns_offset,
                    format!("{} lookup table entries", columns),
                ));
            }
            let data = reader.bytes("LUTD", rows * columns)?;
            Some(LookupTable {
                rows,
                columns,
                data,
            })
        };

        Ok(Self {
            representation,
            subcategory,
            filter_condition,
            filter_code,
            lookup_table,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        for (field, value) in self.entries() {
            writer.text(field, value)?;
        }
        match &self.lookup_table {
            Some(table) => {
                writer.uint(&NLUTS, table.rows as u64)?;
                writer.uint(&NELUT, table.columns as u64)?;
                writer.bytes(&table.data);
            }
            None => writer.uint(&NLUTS, 0)?,
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        for (field, value) in self.entries() {
            visitor.field(field, FieldRef::Text(value));
        }
        match &self.lookup_table {
            Some(table) => {
                visitor.field(&NLUTS, FieldRef::UInt(table.rows as u64));
                visitor.field(&NELUT, FieldRef::UInt(table.columns as u64));
                visitor.blob("LUTD", &table.data);
            }
            None => visitor.field(&NLUTS, FieldRef::UInt(0)),
        }
        visitor.exit_record(Self::NAME);
    }
}

/// Builder for [`ImageBand`]
#[derive(Debug, Clone, Default)]
pub struct ImageBandBuilder {
    inner: ImageBand,
}

impl ImageBandBuilder {
    text_setters! {
        /// Sets IREPBAND
        representation,
        /// Sets ISUBCAT
        subcategory,
        /// Sets IFC
        filter_condition,
        /// Sets IMFLT
        filter_code,
    }

    /// Attaches lookup tables
    pub fn lookup_table(mut self, table: LookupTable) -> Self {
        self.inner.lookup_table = Some(table);
        self
    }

    /// Validates every field width and returns the band
    pub fn build(mut self) -> Result<ImageBand> {
        let band = &mut self.inner;
        band.representation = IREPBAND.check_text(&band.representation)?;
        band.subcategory = ISUBCAT.check_text(&band.subcategory)?;
        band.filter_condition = IFC.check_text(&band.filter_condition)?;
        band.filter_code = IMFLT.check_text(&band.filter_code)?;
        Ok(self.inner)
    }
}

/// The non-empty, count-prefixed list of band descriptors.
///
/// Up to nine bands are counted in a single digit; larger counts write `0`
/// there and follow it with a 5-digit count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBands {
    bands: Vec<ImageBand>,
}

impl Default for ImageBands {
    /// A single band with default fields
    fn default() -> Self {
        Self::single(ImageBand::default())
    }
}

impl ImageBands {
    /// Creates the list, rejecting an empty or oversized one
    pub fn new(bands: Vec<ImageBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::invalid_value(NBANDS.name, "an image needs at least one band"));
        }
        XBANDS.check_uint(bands.len() as u64)?;
        Ok(Self { bands })
    }

    /// A list holding one band
    pub fn single(band: ImageBand) -> Self {
        Self { bands: vec![band] }
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Returns true if there are no bands, which construction rules out
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// The bands in order
    pub fn bands(&self) -> &[ImageBand] {
        &self.bands
    }

    /// Iterates the bands
    pub fn iter(&self) -> std::slice::Iter<'_, ImageBand> {
        self.bands.iter()
    }

    fn uses_extended_count(&self) -> bool {
        self.bands.len() as u64 > NBANDS.max_uint()
    }
}

impl<'a> IntoIterator for &'a ImageBands {
    type Item = &'a ImageBand;
    type IntoIter = std::slice::Iter<'a, ImageBand>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Record for ImageBands {
    type Args = ();
    const NAME: &'static str = "ImageBands";

    fn minimum_length() -> usize {
        NBANDS.width + ImageBand::minimum_length()
    }

    fn encoded_len(&self) -> usize {
        let count = if self.uses_extended_count() {
            NBANDS.width + XBANDS.width
        } else {
            NBANDS.width
        };
        count + self.bands.iter().map(|band| band.encoded_len()).sum::<usize>()
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let mut count = reader.uint(&NBANDS)?;
        if count == 0 {
            let offset = reader.position();
            count = reader.uint(&XBANDS)?;
            if count == 0 {
                return Err(Error::malformed(XBANDS.name, offset, "image declares zero bands"));
            }
        }

        let mut bands = Vec::with_capacity(count as usize);
        for _ in 0..count {
            bands.push(reader.record::<ImageBand>()?);
        }
        Ok(Self { bands })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        if self.uses_extended_count() {
            writer.uint(&NBANDS, 0)?;
            writer.uint(&XBANDS, self.bands.len() as u64)?;
        } else {
            writer.uint(&NBANDS, self.bands.len() as u64)?;
        }
        for band in &self.bands {
            writer.record(band)?;
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        if self.uses_extended_count() {
            visitor.field(&NBANDS, FieldRef::UInt(0));
            visitor.field(&XBANDS, FieldRef::UInt(self.bands.len() as u64));
        } else {
            visitor.field(&NBANDS, FieldRef::UInt(self.bands.len() as u64));
        }
        for band in &self.bands {
            band.visit(visitor);
        }
        visitor.exit_record(Self::NAME);
    }
}

/// Up to nine free-text comments of 80 bytes each
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageComments {
    comments: Vec<String>,
}

impl ImageComments {
    /// Most comments the 1-digit count can describe
    pub const MAX_COMMENTS: usize = 9;

    /// Creates the comment block.
    ///
    /// Comments beyond the ninth are dropped and comments longer than 80
    /// bytes are shortened; each loss is reported as a warning.
    pub fn new<I, S>(comments: I) -> Checked<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept = Vec::new();
        let mut warnings = Vec::new();
        let mut dropped = 0usize;

        for comment in comments {
            if kept.len() == Self::MAX_COMMENTS {
                dropped += 1;
                continue;
            }
            let (comment, warning) = truncate_text(comment.as_ref(), ICOM.width, ICOM.name);
            if let Some(warning) = warning {
                debug!("{}", warning);
                warnings.push(warning);
            }
            kept.push(comment);
        }

        if dropped > 0 {
            let warning = Warning::new(
                NICOM.name,
                format!(
                    "only the first {} comments are kept, dropped {}",
                    Self::MAX_COMMENTS,
                    dropped
                ),
            );
            debug!("{}", warning);
            warnings.push(warning);
        }

        Checked::new(Self { comments: kept }, warnings)
    }

    /// Number of comments
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    /// Returns true if there are no comments
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// The comments, trailing padding removed
    pub fn comments(&self) -> &[String] {
        &self.comments
    }
}

impl Record for ImageComments {
    type Args = ();
    const NAME: &'static str = "ImageComments";

    fn minimum_length() -> usize {
        NICOM.width
    }

    fn encoded_len(&self) -> usize {
        NICOM.width + self.comments.len() * ICOM.width
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let count = reader.uint(&NICOM)? as usize;
        reader.require(Self::NAME, count * ICOM.width)?;
        let comments = (0..count)
            .map(|_| reader.text(&ICOM))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { comments })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        writer.uint(&NICOM, self.comments.len() as u64)?;
        for comment in &self.comments {
            writer.text(&ICOM, comment)?;
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        visitor.field(&NICOM, FieldRef::UInt(self.comments.len() as u64));
        for comment in &self.comments {
            visitor.field(&ICOM, FieldRef::Text(comment));
        }
        visitor.exit_record(Self::NAME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StatsVisitor;
    use pretty_assertions::assert_eq;

    fn band(representation: &str) -> ImageBand {
        ImageBand::builder()
            .representation(representation)
            .build()
            .unwrap()
    }

    #[test]
    fn test_band_without_lookup_table() {
        let band = ImageBand::builder()
            .representation("M")
            .subcategory("I")
            .build()
            .unwrap();
        let bytes = band.to_bytes().unwrap();
        assert_eq!(bytes, b"M I     N   0");
        assert_eq!(bytes.len(), 13);

        let (decoded, consumed) = ImageBand::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, band);
        assert_eq!(consumed, 13);
    }

    #[test]
    fn test_band_with_lookup_table() {
        let table = LookupTable::new(2, 3, vec![1u8, 2, 3, 4, 5, 6]).unwrap();
        let band = ImageBand::builder()
            .representation("LU")
            .lookup_table(table)
            .build()
            .unwrap();
        let bytes = band.to_bytes().unwrap();
        assert_eq!(bytes.len(), 18 + 6);
        assert_eq!(&bytes[12..18], b"200003");

        let (decoded, consumed) = ImageBand::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, band);
        assert_eq!(consumed, 24);
        let table = decoded.lookup_table().unwrap();
        assert_eq!(table.row(1), Some(&[4u8, 5, 6][..]));
        assert_eq!(table.row(2), None);
    }

    #[test]
    fn test_lookup_table_limits() {
        assert!(matches!(
            LookupTable::new(5, 1, vec![0u8; 5]).unwrap_err(),
            Error::InvalidValue { field: "NLUTS", .. }
        ));
        assert!(matches!(
            LookupTable::new(1, 65_537, vec![0u8; 65_537]).unwrap_err(),
            Error::InvalidValue { field: "NELUT", .. }
        ));
        assert!(matches!(
            LookupTable::new(2, 2, vec![0u8; 3]).unwrap_err(),
            Error::LengthMismatch { field: "LUTD", expected: 4, actual: 3 }
        ));
    }

    #[test]
    fn test_band_decode_rejects_too_many_tables() {
        let err = ImageBand::from_bytes(b"M I     N   500001", 0).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "NLUTS", offset: 12, .. }));
    }

    #[test]
    fn test_bands_single_digit_count() {
        let bands = ImageBands::new(vec![band("I"), band("Q")]).unwrap();
        let bytes = bands.to_bytes().unwrap();
        assert_eq!(bytes[0], b'2');
        assert_eq!(bytes.len(), 1 + 2 * 13);

        let (decoded, consumed) = ImageBands::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, bands);
        assert_eq!(consumed, bytes.len());
        assert_eq!(ImageBands::minimum_length(), 14);
    }

    #[test]
    fn test_bands_extended_count() {
        let bands = ImageBands::new((0..12).map(|_| band("M")).collect()).unwrap();
        let bytes = bands.to_bytes().unwrap();
        assert_eq!(&bytes[..6], b"000012");
        assert_eq!(bytes.len(), bands.encoded_len());

        let (decoded, _) = ImageBands::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded.len(), 12);
    }

    #[test]
    fn test_bands_must_not_be_empty() {
        assert!(matches!(
            ImageBands::new(Vec::new()).unwrap_err(),
            Error::InvalidValue { .. }
        ));
        let mut bytes = b"000000".to_vec();
        bytes.extend_from_slice(&[b' '; 13]);
        assert!(matches!(
            ImageBands::from_bytes(&bytes, 0).unwrap_err(),
            Error::MalformedField { field: "XBANDS", .. }
        ));
    }

    #[test]
    fn test_comments_round_trip() {
        for count in [0usize, 1, 9] {
            let comments =
                ImageComments::new((0..count).map(|i| format!("comment {}", i))).into_value();
            let bytes = comments.to_bytes().unwrap();
            assert_eq!(bytes.len(), 1 + 80 * count);

            let (decoded, consumed) = ImageComments::from_bytes(&bytes, 0).unwrap();
            assert_eq!(decoded, comments);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn test_comments_truncation_warns() {
        let long = "x".repeat(100);
        let checked = ImageComments::new(vec![long.as_str(), "short"]);
        assert_eq!(checked.warnings().len(), 1);
        assert_eq!(checked.warnings()[0].field, "ICOM");

        let comments = checked.into_value();
        assert_eq!(comments.comments()[0].len(), 80);
        assert_eq!(comments.comments()[1], "short");
    }

    #[test]
    fn test_comments_beyond_nine_dropped() {
        let checked = ImageComments::new((0..12).map(|i| i.to_string()));
        assert_eq!(checked.warnings().len(), 1);
        assert_eq!(checked.warnings()[0].field, "NICOM");
        assert_eq!(checked.value().len(), 9);
        assert_eq!(checked.value().comments()[8], "8");
    }

    #[test]
    fn test_comments_truncated_input() {
        let err = ImageComments::from_bytes(b"2short", 0).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { needed: 160, .. }));
    }

    #[test]
    fn test_visit_bytes_match_encoding() {
        let table = LookupTable::new(1, 4, vec![9u8; 4]).unwrap();
        let bands = ImageBands::new(vec![
            band("R"),
            ImageBand::builder().lookup_table(table).build().unwrap(),
        ])
        .unwrap();
        let mut stats = StatsVisitor::default();
        bands.visit(&mut stats);
        assert_eq!(stats.byte_count, bands.encoded_len());
        assert_eq!(stats.blob_count, 1);
    }
}
