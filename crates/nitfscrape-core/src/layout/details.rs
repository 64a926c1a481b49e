//! Reading a file's header and layout from a seekable stream.

use super::{ResolvedLayout, SegmentLocation};
use crate::codec::{Record, Warning};
use crate::error::{Error, Result};
use crate::header::{
    decode_header_length, FileHeader, SegmentKind, FILE_LENGTH_OFFSET, HEADER_LENGTH_OFFSET,
    HEADER_LENGTH_WIDTH, MAGIC,
};
use crate::segment::{DataExtensionHeader, ImageSegmentHeader, TextSegmentHeader};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration for [`NitfDetails`]
#[derive(Debug, Clone)]
pub struct DetailsConfig {
    /// Largest header length accepted before reading the header
    pub max_header_length: u64,
    /// Treat a file length field that disagrees with the layout as an error
    pub verify_file_length: bool,
}

impl Default for DetailsConfig {
    fn default() -> Self {
        Self {
            max_header_length: 999_999,
            verify_file_length: false,
        }
    }
}

impl DetailsConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest accepted header length
    pub fn max_header_length(mut self, max: u64) -> Self {
        self.max_header_length = max;
        self
    }

    /// Sets whether a file length mismatch is an error
    pub fn verify_file_length(mut self, verify: bool) -> Self {
        self.verify_file_length = verify;
        self
    }
}

/// The decoded file header of one file together with its resolved layout.
///
/// Both are immutable once read; segment bytes are fetched separately
/// through the `read_*` methods.
#[derive(Debug, Clone)]
pub struct NitfDetails {
    path: Option<PathBuf>,
    header: FileHeader,
    layout: ResolvedLayout,
    warnings: Vec<Warning>,
}

impl NitfDetails {
    /// Opens and reads a file with the default configuration
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &DetailsConfig::default())
    }

    /// Opens and reads a file
    pub fn open_with_config(path: impl AsRef<Path>, config: &DetailsConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| Error::file_read(path, err))?;

        let mut details =
            Self::from_reader_with_config(BufReader::new(file), config).map_err(|err| match err {
                Error::Io(source) => Error::file_read(path, source),
                other => other,
            })?;
        details.path = Some(path.to_path_buf());
        Ok(details)
    }

    /// Reads from any seekable stream with the default configuration
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, &DetailsConfig::default())
    }

    /// Reads from any seekable stream.
    ///
    /// Performs three bounded reads: the magic marker, the header length
    /// digits, and the header itself. Fewer than nine readable bytes is
    /// [`Error::NotThisFormat`], not a truncation.
    pub fn from_reader_with_config<R: Read + Seek>(mut reader: R, config: &DetailsConfig) -> Result<Self> {
        let mut magic = Vec::with_capacity(MAGIC.len());
        reader.seek(SeekFrom::Start(0))?;
        reader.by_ref().take(MAGIC.len() as u64).read_to_end(&mut magic)?;
        if magic.as_slice() != &MAGIC[..] {
            return Err(Error::not_this_format(&magic));
        }
        trace!("magic verified");

        let mut digits = [0u8; HEADER_LENGTH_WIDTH];
        read_exact_at(&mut reader, HEADER_LENGTH_OFFSET, &mut digits, "HL")?;
        let header_length = decode_header_length(&digits)?;
        if header_length > config.max_header_length {
            return Err(Error::malformed(
                "HL",
                HEADER_LENGTH_OFFSET as usize,
                format!(
                    "header length {} exceeds the configured maximum {}",
                    header_length, config.max_header_length
                ),
            ));
        }
        debug!("header length {}", header_length);

        let mut buffer = vec![0u8; header_length as usize];
        read_exact_at(&mut reader, 0, &mut buffer, FileHeader::NAME)?;
        let (header, _) = FileHeader::from_bytes(&buffer, 0)?;

        let layout = ResolvedLayout::from_header(&header);
        debug!(
            "resolved {} segments ending at offset {}",
            layout.total_segments(),
            layout.end_offset()
        );

        let mut warnings = Vec::new();
        if layout.end_offset() != header.file_length() {
            let message = format!(
                "file length field is {} but the segments end at {}",
                header.file_length(),
                layout.end_offset()
            );
            if config.verify_file_length {
                return Err(Error::malformed("FL", FILE_LENGTH_OFFSET as usize, message));
            }
            debug!("{}", message);
            warnings.push(Warning::new("FL", message));
        }

        Ok(Self {
            path: None,
            header,
            layout,
            warnings,
        })
    }

    /// The decoded file header
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Offsets of every segment
    pub fn layout(&self) -> &ResolvedLayout {
        &self.layout
    }

    /// Non-fatal inconsistencies found while reading
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Path the details were read from, if opened from one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the raw subheader bytes of a located segment
    pub fn read_subheader<R: Read + Seek>(&self, mut reader: R, location: &SegmentLocation) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; location.subheader_size as usize];
        read_exact_at(&mut reader, location.subheader_offset, &mut buffer, "subheader")?;
        Ok(buffer)
    }

    /// Reads and decodes the subheader of image segment `index`
    pub fn read_image_subheader<R: Read + Seek>(&self, reader: R, index: usize) -> Result<ImageSegmentHeader> {
        self.read_record(reader, SegmentKind::Image, index)
    }

    /// Reads and decodes the subheader of text segment `index`
    pub fn read_text_subheader<R: Read + Seek>(&self, reader: R, index: usize) -> Result<TextSegmentHeader> {
        self.read_record(reader, SegmentKind::Text, index)
    }

    /// Reads and decodes the subheader of data extension segment `index`
    pub fn read_extension_subheader<R: Read + Seek>(
        &self,
        reader: R,
        index: usize,
    ) -> Result<DataExtensionHeader> {
        self.read_record(reader, SegmentKind::DataExtension, index)
    }

    fn read_record<T, R>(&self, reader: R, kind: SegmentKind, index: usize) -> Result<T>
    where
        T: Record,
        T::Args: Default,
        R: Read + Seek,
    {
        let location = self.layout.location(kind, index).ok_or_else(|| {
            Error::invalid_value("index", format!("file has no {} segment {}", kind, index))
        })?;
        let buffer = self.read_subheader(reader, location)?;
        let (record, consumed) = T::from_bytes(&buffer, 0)?;
        if consumed as u64 != location.subheader_size {
            trace!(
                "{} {} decoded {} of {} subheader bytes",
                kind,
                index,
                consumed,
                location.subheader_size
            );
        }
        Ok(record)
    }
}

fn read_exact_at<R: Read + Seek>(reader: &mut R, offset: u64, buffer: &mut [u8], what: &'static str) -> Result<()> {
    reader.seek(SeekFrom::Start(offset))?;
    reader
        .read_exact(buffer)
        .map_err(|err| Error::from_read(err, what, offset, buffer.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ItemArrayTable;
    use crate::segment::{ImageBand, ImageBands, OverflowExtension, OverflowTarget, StandardExtension};
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    struct Sample {
        bytes: Vec<u8>,
        image: ImageSegmentHeader,
        text: TextSegmentHeader,
        extensions: Vec<DataExtensionHeader>,
    }

    fn sample_file() -> Sample {
        let image = ImageSegmentHeader::builder()
            .image_id("IMG1")
            .rows(4)
            .columns(4)
            .bits_per_pixel(8)
            .bands(ImageBands::single(ImageBand::builder().representation("M").build().unwrap()))
            .build()
            .unwrap()
            .into_value();
        let text = TextSegmentHeader::builder().text_id("NOTE").format("STA").build().unwrap();
        let extensions: Vec<DataExtensionHeader> = vec![
            StandardExtension::builder().id("XML_DATA_CONTENT").build().unwrap().into(),
            OverflowExtension::builder(OverflowTarget::UserDefinedHeader)
                .user_subheader(&b"xyz"[..])
                .build()
                .unwrap()
                .into(),
        ];

        let image_bytes = image.to_bytes().unwrap();
        let text_bytes = text.to_bytes().unwrap();
        let extension_bytes: Vec<Vec<u8>> = extensions.iter().map(|d| d.to_bytes().unwrap()).collect();

        let header = FileHeader::builder()
            .title("Synthetic")
            .table(
                SegmentKind::Image,
                ItemArrayTable::for_kind(SegmentKind::Image, vec![image_bytes.len() as u64], vec![16]).unwrap(),
            )
            .table(
                SegmentKind::Text,
                ItemArrayTable::for_kind(SegmentKind::Text, vec![text_bytes.len() as u64], vec![5]).unwrap(),
            )
            .table(
                SegmentKind::DataExtension,
                ItemArrayTable::for_kind(
                    SegmentKind::DataExtension,
                    extension_bytes.iter().map(|b| b.len() as u64).collect(),
                    vec![7, 0],
                )
                .unwrap(),
            )
            .build()
            .unwrap()
            .into_value();

        let mut bytes = header.to_bytes().unwrap();
        bytes.extend_from_slice(&image_bytes);
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&text_bytes);
        bytes.extend_from_slice(b"hello");
        bytes.extend_from_slice(&extension_bytes[0]);
        bytes.extend_from_slice(b"<a></a>");
        bytes.extend_from_slice(&extension_bytes[1]);

        Sample {
            bytes,
            image,
            text,
            extensions,
        }
    }

    #[test]
    fn test_from_reader() {
        let sample = sample_file();
        let details = NitfDetails::from_reader(Cursor::new(&sample.bytes)).unwrap();

        assert!(details.warnings().is_empty());
        assert!(details.path().is_none());
        assert_eq!(details.header().title(), "Synthetic");
        assert_eq!(details.layout().end_offset(), sample.bytes.len() as u64);
        assert_eq!(details.layout().total_segments(), 4);
    }

    #[test]
    fn test_typed_subheaders() {
        let sample = sample_file();
        let mut cursor = Cursor::new(&sample.bytes);
        let details = NitfDetails::from_reader(&mut cursor).unwrap();

        assert_eq!(details.read_image_subheader(&mut cursor, 0).unwrap(), sample.image);
        assert_eq!(details.read_text_subheader(&mut cursor, 0).unwrap(), sample.text);
        for (index, expected) in sample.extensions.iter().enumerate() {
            let decoded = details.read_extension_subheader(&mut cursor, index).unwrap();
            assert_eq!(&decoded, expected);
        }
        assert!(details
            .read_extension_subheader(&mut cursor, 1)
            .unwrap()
            .is_overflow());

        let err = details.read_image_subheader(&mut cursor, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "index", .. }));
    }

    #[test]
    fn test_read_subheader_bytes() {
        let sample = sample_file();
        let mut cursor = Cursor::new(&sample.bytes);
        let details = NitfDetails::from_reader(&mut cursor).unwrap();

        let location = *details.layout().location(SegmentKind::Text, 0).unwrap();
        let raw = details.read_subheader(&mut cursor, &location).unwrap();
        assert_eq!(raw.len(), 285);
        assert_eq!(&raw[..2], b"TE");

        let payload = location.item_offset as usize;
        assert_eq!(&sample.bytes[payload..payload + 5], b"hello");
    }

    #[test]
    fn test_open_path() {
        let sample = sample_file();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&sample.bytes).unwrap();

        let details = NitfDetails::open(file.path()).unwrap();
        assert_eq!(details.path(), Some(file.path()));
        assert_eq!(details.header().table(SegmentKind::DataExtension).len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = NitfDetails::open("/nonexistent/file.ntf").unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_not_this_format() {
        let err = NitfDetails::from_reader(Cursor::new(b"GIF89a....................".to_vec())).unwrap_err();
        assert!(matches!(err, Error::NotThisFormat { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_stream_shorter_than_magic() {
        for bytes in [&b""[..], &b"NITF"[..], &b"NITF02.1"[..]] {
            let err = NitfDetails::from_reader(Cursor::new(bytes.to_vec())).unwrap_err();
            assert!(matches!(err, Error::NotThisFormat { .. }), "{:?}", err);
            assert!(err.is_recoverable());
        }
    }

    #[test]
    fn test_short_stream() {
        let err = NitfDetails::from_reader(Cursor::new(b"NITF02.10".to_vec())).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { what: "HL", .. }));

        let sample = sample_file();
        let err = NitfDetails::from_reader(Cursor::new(&sample.bytes[..200])).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { what: "HL", .. }));

        let err = NitfDetails::from_reader(Cursor::new(&sample.bytes[..370])).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { what: "FileHeader", .. }));
    }

    #[test]
    fn test_bad_header_length_digits() {
        let mut bytes = sample_file().bytes;
        bytes[356] = b'?';
        let err = NitfDetails::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "HL", offset: 354, .. }));
    }

    #[test]
    fn test_max_header_length() {
        let sample = sample_file();
        let config = DetailsConfig::new().max_header_length(400);
        let err = NitfDetails::from_reader_with_config(Cursor::new(&sample.bytes), &config).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "HL", .. }));
    }

    #[test]
    fn test_file_length_mismatch() {
        let mut bytes = sample_file().bytes;
        bytes[342..354].copy_from_slice(b"000000000001");

        let details = NitfDetails::from_reader(Cursor::new(&bytes)).unwrap();
        assert_eq!(details.warnings().len(), 1);
        assert_eq!(details.warnings()[0].field, "FL");

        let strict = DetailsConfig::new().verify_file_length(true);
        let err = NitfDetails::from_reader_with_config(Cursor::new(&bytes), &strict).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "FL", offset: 342, .. }));
    }
}
