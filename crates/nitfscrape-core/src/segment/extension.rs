//! Data extension segment subheaders.
//!
//! The identifier decides the layout. A subheader whose `DESID` is
//! [`OVERFLOW_SENTINEL`] carries two extra fields, `DESOFLOW` and `DESITEM`,
//! naming the header section whose extensions spilled into this segment.
//! [`DataExtensionHeader`] peeks the identifier and dispatches to
//! [`StandardExtension`] or [`OverflowExtension`].

use crate::codec::{total_width, Field, FieldReader, FieldRef, FieldVisitor, FieldWriter, Record};
use crate::error::{Error, Result};
use crate::header::SecurityTags;
use bytes::Bytes;
use std::fmt;
use tracing::debug;

/// `DESID` value that selects the overflow layout
pub const OVERFLOW_SENTINEL: &str = "TRE_OVERFLOW";

const DE: Field = Field::text("DE", 2).with_text("DE");
const DESID: Field = Field::text("DESID", 25);
const DESVER: Field = Field::uint("DESVER", 2).with_uint(1);
const DESOFLOW: Field = Field::text("DESOFLOW", 6);
const DESITEM: Field = Field::uint("DESITEM", 3);
const DESSHL: Field = Field::uint("DESSHL", 4);

const STANDARD_FIXED: [Field; 4] = [DE, DESID, DESVER, DESSHL];
const OVERFLOW_FIXED: [Field; 6] = [DE, DESID, DESVER, DESOFLOW, DESITEM, DESSHL];

/// Header section whose extensions overflowed into a data extension segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverflowTarget {
    /// `UDHD`: file user-defined header
    UserDefinedHeader,
    /// `UDID`: image user-defined data
    UserDefinedImageData,
    /// `XHD`: file extended header
    ExtendedHeader,
    /// `IXSHD`: image extended subheader
    ImageExtendedSubheader,
    /// `SXSHD`: graphics extended subheader
    GraphicsExtendedSubheader,
    /// `TXSHD`: text extended subheader
    TextExtendedSubheader,
}

impl OverflowTarget {
    /// Every target, in code order
    pub const ALL: [OverflowTarget; 6] = [
        OverflowTarget::UserDefinedHeader,
        OverflowTarget::UserDefinedImageData,
        OverflowTarget::ExtendedHeader,
        OverflowTarget::ImageExtendedSubheader,
        OverflowTarget::GraphicsExtendedSubheader,
        OverflowTarget::TextExtendedSubheader,
    ];

    /// The `DESOFLOW` code
    pub fn as_code(&self) -> &'static str {
        match self {
            OverflowTarget::UserDefinedHeader => "UDHD",
            OverflowTarget::UserDefinedImageData => "UDID",
            OverflowTarget::ExtendedHeader => "XHD",
            OverflowTarget::ImageExtendedSubheader => "IXSHD",
            OverflowTarget::GraphicsExtendedSubheader => "SXSHD",
            OverflowTarget::TextExtendedSubheader => "TXSHD",
        }
    }

    /// Parses a `DESOFLOW` code, trailing blanks ignored
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim_end();
        Self::ALL.into_iter().find(|target| target.as_code() == code)
    }
}

impl fmt::Display for OverflowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_code())
    }
}

/// Blanks on either side of `DESID` do not hide the sentinel
fn is_sentinel(id: &str) -> bool {
    id.trim() == OVERFLOW_SENTINEL
}

fn check_tag(reader: &mut FieldReader<'_>) -> Result<()> {
    let start = reader.position();
    let tag = reader.text(&DE)?;
    if tag != "DE" {
        return Err(Error::malformed(DE.name, start, format!("expected \"DE\", found {:?}", tag)));
    }
    Ok(())
}

fn read_user_subheader(reader: &mut FieldReader<'_>) -> Result<Bytes> {
    let len = reader.uint(&DESSHL)? as usize;
    reader.bytes("DESSHF", len)
}

fn user_subheader_len(blob: &[u8]) -> Result<u64> {
    DESSHL.check_uint(blob.len() as u64)
}

/// Data extension subheader with the ordinary layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardExtension {
    id: String,
    version: u8,
    security: SecurityTags,
    user_subheader: Bytes,
}

impl Default for StandardExtension {
    fn default() -> Self {
        Self {
            id: String::new(),
            version: DESVER.initial_uint() as u8,
            security: SecurityTags::default(),
            user_subheader: Bytes::new(),
        }
    }
}

impl StandardExtension {
    /// Starts building a subheader from the defaults
    pub fn builder() -> StandardExtensionBuilder {
        StandardExtensionBuilder::default()
    }

    /// DESID: extension type identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// DESVER: extension version
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Security tags
    pub fn security(&self) -> &SecurityTags {
        &self.security
    }

    /// DESSHF: user-defined subheader bytes; `DESSHL` is their length
    pub fn user_subheader(&self) -> &[u8] {
        &self.user_subheader
    }
}

impl Record for StandardExtension {
    type Args = ();
    const NAME: &'static str = "StandardExtension";

    fn minimum_length() -> usize {
        total_width(&STANDARD_FIXED) + SecurityTags::LENGTH
    }

    fn encoded_len(&self) -> usize {
        Self::minimum_length() + self.user_subheader.len()
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        check_tag(reader)?;
        let id_offset = reader.position();
        let id = reader.text(&DESID)?;
        if is_sentinel(&id) {
            return Err(Error::malformed(
                DESID.name,
                id_offset,
                "overflow identifier in a standard extension subheader",
            ));
        }

        Ok(Self {
            id,
            version: reader.uint(&DESVER)? as u8,
            security: reader.record::<SecurityTags>()?,
            user_subheader: read_user_subheader(reader)?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        writer.text(&DE, "DE")?;
        writer.text(&DESID, &self.id)?;
        writer.uint(&DESVER, u64::from(self.version))?;
        writer.record(&self.security)?;
        writer.uint(&DESSHL, user_subheader_len(&self.user_subheader)?)?;
        writer.bytes(&self.user_subheader);
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        visitor.field(&DE, FieldRef::Text("DE"));
        visitor.field(&DESID, FieldRef::Text(&self.id));
        visitor.field(&DESVER, FieldRef::UInt(u64::from(self.version)));
        self.security.visit(visitor);
        visitor.field(&DESSHL, FieldRef::UInt(self.user_subheader.len() as u64));
        visitor.blob("DESSHF", &self.user_subheader);
        visitor.exit_record(Self::NAME);
    }
}

/// Builder for [`StandardExtension`]
#[derive(Debug, Clone, Default)]
pub struct StandardExtensionBuilder {
    inner: StandardExtension,
}

impl StandardExtensionBuilder {
    /// Sets DESID
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.inner.id = id.into();
        self
    }

    /// Sets DESVER
    pub fn version(mut self, version: u8) -> Self {
        self.inner.version = version;
        self
    }

    /// Sets the security tags
    pub fn security(mut self, security: SecurityTags) -> Self {
        self.inner.security = security;
        self
    }

    /// Sets DESSHF
    pub fn user_subheader(mut self, bytes: impl Into<Bytes>) -> Self {
        self.inner.user_subheader = bytes.into();
        self
    }

    /// Validates every field and returns the subheader
    pub fn build(mut self) -> Result<StandardExtension> {
        self.inner.id = DESID.check_text(&self.inner.id)?;
        if is_sentinel(&self.inner.id) {
            return Err(Error::invalid_value(
                DESID.name,
                "the overflow identifier requires OverflowExtension",
            ));
        }
        DESVER.check_uint(u64::from(self.inner.version))?;
        user_subheader_len(&self.inner.user_subheader)?;
        Ok(self.inner)
    }
}

/// Data extension subheader carrying overflowed header extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowExtension {
    version: u8,
    security: SecurityTags,
    target: OverflowTarget,
    item: u16,
    user_subheader: Bytes,
}

impl OverflowExtension {
    /// Starts building a subheader for `target`
    pub fn builder(target: OverflowTarget) -> OverflowExtensionBuilder {
        OverflowExtensionBuilder {
            inner: Self {
                version: DESVER.initial_uint() as u8,
                security: SecurityTags::default(),
                target,
                item: 0,
                user_subheader: Bytes::new(),
            },
        }
    }

    /// DESID, always [`OVERFLOW_SENTINEL`]
    pub fn id(&self) -> &str {
        OVERFLOW_SENTINEL
    }

    /// DESVER: extension version
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Security tags
    pub fn security(&self) -> &SecurityTags {
        &self.security
    }

    /// DESOFLOW: section the extensions overflowed from
    pub fn target(&self) -> OverflowTarget {
        self.target
    }

    /// DESITEM: 1-based number of the segment that overflowed, 0 for the file header
    pub fn item(&self) -> u16 {
        self.item
    }

    /// DESSHF: user-defined subheader bytes
    pub fn user_subheader(&self) -> &[u8] {
        &self.user_subheader
    }
}

impl Record for OverflowExtension {
    type Args = ();
    const NAME: &'static str = "OverflowExtension";

    fn minimum_length() -> usize {
        total_width(&OVERFLOW_FIXED) + SecurityTags::LENGTH
    }

    fn encoded_len(&self) -> usize {
        Self::minimum_length() + self.user_subheader.len()
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        check_tag(reader)?;
        let id_offset = reader.position();
        let id = reader.text(&DESID)?;
        if !is_sentinel(&id) {
            return Err(Error::malformed(
                DESID.name,
                id_offset,
                format!("expected {:?}, found {:?}", OVERFLOW_SENTINEL, id),
            ));
        }

        let version = reader.uint(&DESVER)? as u8;
        let security = reader.record::<SecurityTags>()?;
        let target_offset = reader.position();
        let code = reader.text(&DESOFLOW)?;
        let target = OverflowTarget::from_code(&code).ok_or_else(|| {
            Error::malformed(DESOFLOW.name, target_offset, format!("unknown overflow target {:?}", code))
        })?;
        let item = reader.uint(&DESITEM)? as u16;

        Ok(Self {
            version,
            security,
            target,
            item,
            user_subheader: read_user_subheader(reader)?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        writer.text(&DE, "DE")?;
        writer.text(&DESID, OVERFLOW_SENTINEL)?;
        writer.uint(&DESVER, u64::from(self.version))?;
        writer.record(&self.security)?;
        writer.text(&DESOFLOW, self.target.as_code())?;
        writer.uint(&DESITEM, u64::from(self.item))?;
        writer.uint(&DESSHL, user_subheader_len(&self.user_subheader)?)?;
        writer.bytes(&self.user_subheader);
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        visitor.field(&DE, FieldRef::Text("DE"));
        visitor.field(&DESID, FieldRef::Text(OVERFLOW_SENTINEL));
        visitor.field(&DESVER, FieldRef::UInt(u64::from(self.version)));
        self.security.visit(visitor);
        visitor.field(&DESOFLOW, FieldRef::Text(self.target.as_code()));
        visitor.field(&DESITEM, FieldRef::UInt(u64::from(self.item)));
        visitor.field(&DESSHL, FieldRef::UInt(self.user_subheader.len() as u64));
        visitor.blob("DESSHF", &self.user_subheader);
        visitor.exit_record(Self::NAME);
    }
}

/// Builder for [`OverflowExtension`]
#[derive(Debug, Clone)]
pub struct OverflowExtensionBuilder {
    inner: OverflowExtension,
}

impl OverflowExtensionBuilder {
    /// Sets DESVER
    pub fn version(mut self, version: u8) -> Self {
        self.inner.version = version;
        self
    }

    /// Sets the security tags
    pub fn security(mut self, security: SecurityTags) -> Self {
        self.inner.security = security;
        self
    }

    /// Sets DESITEM
    pub fn item(mut self, item: u16) -> Self {
        self.inner.item = item;
        self
    }

    /// Sets DESSHF
    pub fn user_subheader(mut self, bytes: impl Into<Bytes>) -> Self {
        self.inner.user_subheader = bytes.into();
        self
    }

    /// Validates every field and returns the subheader
    pub fn build(self) -> Result<OverflowExtension> {
        DESVER.check_uint(u64::from(self.inner.version))?;
        DESITEM.check_uint(u64::from(self.inner.item))?;
        user_subheader_len(&self.inner.user_subheader)?;
        Ok(self.inner)
    }
}

/// A data extension subheader of either layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataExtensionHeader {
    /// Ordinary layout
    Standard(StandardExtension),
    /// Overflow carrier layout
    Overflow(OverflowExtension),
}

impl DataExtensionHeader {
    /// DESID
    pub fn id(&self) -> &str {
        match self {
            DataExtensionHeader::Standard(header) => header.id(),
            DataExtensionHeader::Overflow(header) => header.id(),
        }
    }

    /// DESVER
    pub fn version(&self) -> u8 {
        match self {
            DataExtensionHeader::Standard(header) => header.version(),
            DataExtensionHeader::Overflow(header) => header.version(),
        }
    }

    /// Security tags
    pub fn security(&self) -> &SecurityTags {
        match self {
            DataExtensionHeader::Standard(header) => header.security(),
            DataExtensionHeader::Overflow(header) => header.security(),
        }
    }

    /// DESSHF
    pub fn user_subheader(&self) -> &[u8] {
        match self {
            DataExtensionHeader::Standard(header) => header.user_subheader(),
            DataExtensionHeader::Overflow(header) => header.user_subheader(),
        }
    }

    /// Returns true for the overflow layout
    pub fn is_overflow(&self) -> bool {
        matches!(self, DataExtensionHeader::Overflow(_))
    }

    /// The overflow fields, if this is the overflow layout
    pub fn as_overflow(&self) -> Option<&OverflowExtension> {
        match self {
            DataExtensionHeader::Overflow(header) => Some(header),
            DataExtensionHeader::Standard(_) => None,
        }
    }
}

impl From<StandardExtension> for DataExtensionHeader {
    fn from(header: StandardExtension) -> Self {
        DataExtensionHeader::Standard(header)
    }
}

impl From<OverflowExtension> for DataExtensionHeader {
    fn from(header: OverflowExtension) -> Self {
        DataExtensionHeader::Overflow(header)
    }
}

impl Record for DataExtensionHeader {
    type Args = ();
    const NAME: &'static str = "DataExtensionHeader";

    fn minimum_length() -> usize {
        StandardExtension::minimum_length()
    }

    fn encoded_len(&self) -> usize {
        match self {
            DataExtensionHeader::Standard(header) => header.encoded_len(),
            DataExtensionHeader::Overflow(header) => header.encoded_len(),
        }
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        let id = reader.peek_text(DE.width, &DESID)?;
        if is_sentinel(&id) {
            debug!("DESID {} at offset {} selects the overflow layout", id, reader.position());
            return reader.record::<OverflowExtension>().map(Self::Overflow);
        }
        reader.record::<StandardExtension>().map(Self::Standard)
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        match self {
            DataExtensionHeader::Standard(header) => header.encode(writer),
            DataExtensionHeader::Overflow(header) => header.encode(writer),
        }
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        match self {
            DataExtensionHeader::Standard(header) => header.visit(visitor),
            DataExtensionHeader::Overflow(header) => header.visit(visitor),
        }
    }
}
