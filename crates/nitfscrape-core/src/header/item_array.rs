//! Item array tables: the count-prefixed lists of (subheader size, item size)
//! pairs the file header keeps for each segment kind.

use crate::codec::{Field, FieldReader, FieldRef, FieldVisitor, FieldWriter, Record};
use crate::error::{Error, Result};
use std::fmt;

/// The five kinds of segment, in on-disk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Image segments
    Image,
    /// Graphics segments
    Graphics,
    /// Text segments
    Text,
    /// Data extension segments
    DataExtension,
    /// Reserved extension segments
    ReservedExtension,
}

impl SegmentKind {
    /// All kinds in the order segments appear in the file
    pub const ALL: [SegmentKind; 5] = [
        SegmentKind::Image,
        SegmentKind::Graphics,
        SegmentKind::Text,
        SegmentKind::DataExtension,
        SegmentKind::ReservedExtension,
    ];

    /// Digit widths of this kind's item array entries
    pub const fn widths(self) -> ItemWidths {
        match self {
            SegmentKind::Image => ItemWidths::new(6, 10),
            SegmentKind::Graphics => ItemWidths::new(4, 6),
            SegmentKind::Text => ItemWidths::new(4, 5),
            SegmentKind::DataExtension => ItemWidths::new(4, 9),
            SegmentKind::ReservedExtension => ItemWidths::new(4, 7),
        }
    }

    /// Position in [`SegmentKind::ALL`]
    pub const fn index(self) -> usize {
        match self {
            SegmentKind::Image => 0,
            SegmentKind::Graphics => 1,
            SegmentKind::Text => 2,
            SegmentKind::DataExtension => 3,
            SegmentKind::ReservedExtension => 4,
        }
    }

    /// Short lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Image => "image",
            SegmentKind::Graphics => "graphics",
            SegmentKind::Text => "text",
            SegmentKind::DataExtension => "des",
            SegmentKind::ReservedExtension => "res",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Digit widths of the two numbers in each item array entry.
///
/// These are fixed per segment kind by the format; they are never read
/// from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemWidths {
    /// Digits in each subheader length
    pub subheader: usize,
    /// Digits in each item length
    pub item: usize,
}

impl ItemWidths {
    /// Creates a width pair
    pub const fn new(subheader: usize, item: usize) -> Self {
        Self { subheader, item }
    }

    /// Encoded bytes per entry
    pub const fn entry_len(&self) -> usize {
        self.subheader + self.item
    }

    fn fields(&self) -> (Field, Field) {
        (
            Field::uint("LSH", self.subheader),
            Field::uint("LI", self.item),
        )
    }
}

const COUNT: Field = Field::uint("NUM", 3);

/// Count-prefixed table of subheader and item sizes for one segment kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArrayTable {
    widths: ItemWidths,
    subheader_sizes: Vec<u64>,
    item_sizes: Vec<u64>,
}

impl ItemArrayTable {
    /// Creates a table, validating that both size lists have equal length
    /// and that every size fits in its digit width.
    pub fn new(widths: ItemWidths, subheader_sizes: Vec<u64>, item_sizes: Vec<u64>) -> Result<Self> {
        if subheader_sizes.len() != item_sizes.len() {
            return Err(Error::invalid_value(
                "ItemArrayTable",
                format!(
                    "{} subheader sizes but {} item sizes",
                    subheader_sizes.len(),
                    item_sizes.len()
                ),
            ));
        }
        COUNT.check_uint(subheader_sizes.len() as u64)?;

        let (subheader_field, item_field) = widths.fields();
        for (&subheader, &item) in subheader_sizes.iter().zip(&item_sizes) {
            subheader_field.check_uint(subheader)?;
            item_field.check_uint(item)?;
        }

        Ok(Self {
            widths,
            subheader_sizes,
            item_sizes,
        })
    }

    /// Creates a table using the widths of `kind`
    pub fn for_kind(kind: SegmentKind, subheader_sizes: Vec<u64>, item_sizes: Vec<u64>) -> Result<Self> {
        Self::new(kind.widths(), subheader_sizes, item_sizes)
    }

    /// An empty table using the widths of `kind`
    pub fn empty(kind: SegmentKind) -> Self {
        Self {
            widths: kind.widths(),
            subheader_sizes: Vec::new(),
            item_sizes: Vec::new(),
        }
    }

    /// Digit widths this table was decoded or built with
    pub fn widths(&self) -> ItemWidths {
        self.widths
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.subheader_sizes.len()
    }

    /// Returns true if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.subheader_sizes.is_empty()
    }

    /// Subheader sizes, in segment order
    pub fn subheader_sizes(&self) -> &[u64] {
        &self.subheader_sizes
    }

    /// Item (payload) sizes, in segment order
    pub fn item_sizes(&self) -> &[u64] {
        &self.item_sizes
    }

    /// Iterates `(subheader_size, item_size)` pairs
    pub fn entries(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.subheader_sizes
            .iter()
            .copied()
            .zip(self.item_sizes.iter().copied())
    }

    /// Sum of every subheader and item size
    pub fn total_size(&self) -> u64 {
        self.entries().map(|(s, i)| s + i).sum()
    }
}

impl Record for ItemArrayTable {
    type Args = ItemWidths;
    const NAME: &'static str = "ItemArrayTable";

    fn minimum_length() -> usize {
        COUNT.width
    }

    fn encoded_len(&self) -> usize {
        COUNT.width + self.len() * self.widths.entry_len()
    }

    fn decode(reader: &mut FieldReader<'_>, widths: ItemWidths) -> Result<Self> {
        let count = reader.uint(&COUNT)? as usize;
        reader.require(Self::NAME, count * widths.entry_len())?;

        let (subheader_field, item_field) = widths.fields();
        let mut subheader_sizes = Vec::with_capacity(count);
        let mut item_sizes = Vec::with_capacity(count);
        for _ in 0..count {
            subheader_sizes.push(reader.uint(&subheader_field)?);
            item_sizes.push(reader.uint(&item_field)?);
        }

        Ok(Self {
            widths,
            subheader_sizes,
            item_sizes,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        writer.uint(&COUNT, self.len() as u64)?;
        let (subheader_field, item_field) = self.widths.fields();
        for (subheader, item) in self.entries() {
            writer.uint(&subheader_field, subheader)?;
            writer.uint(&item_field, item)?;
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        visitor.field(&COUNT, FieldRef::UInt(self.len() as u64));
        let (subheader_field, item_field) = self.widths.fields();
        for (subheader, item) in self.entries() {
            visitor.field(&subheader_field, FieldRef::UInt(subheader));
            visitor.field(&item_field, FieldRef::UInt(item));
        }
        visitor.exit_record(Self::NAME);
    }
}
