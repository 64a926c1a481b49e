//! Segment layout: where every subheader and payload sits in the file.
//!
//! Segments follow the file header back to back, grouped by kind in the
//! order of [`SegmentKind::ALL`]. Walking the five item array tables with a
//! running cursor that starts at the header length gives every segment's
//! absolute offsets without touching the segments themselves.
//!
//! [`NitfDetails`] is the file-level entry point: it reads and verifies the
//! header from a stream and resolves the layout once.

mod details;

use crate::header::{FileHeader, ItemArrayTable, SegmentKind};
use tracing::trace;

pub use details::{DetailsConfig, NitfDetails};

/// Absolute position and size of one segment's subheader and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLocation {
    /// Offset of the first subheader byte
    pub subheader_offset: u64,
    /// Subheader length in bytes
    pub subheader_size: u64,
    /// Offset of the first payload byte
    pub item_offset: u64,
    /// Payload length in bytes
    pub item_size: u64,
}

impl SegmentLocation {
    /// Offset one past the last payload byte
    pub fn end_offset(&self) -> u64 {
        self.item_offset + self.item_size
    }
}

/// Lays out the segments of one table starting at `cursor`.
///
/// Returns the cursor after the last segment and the locations, or `None`
/// with the cursor unchanged when the table is empty.
pub fn resolve_offsets(cursor: u64, table: &ItemArrayTable) -> (u64, Option<Vec<SegmentLocation>>) {
    if table.is_empty() {
        return (cursor, None);
    }

    let mut cursor = cursor;
    let locations = table
        .entries()
        .map(|(subheader_size, item_size)| {
            let location = SegmentLocation {
                subheader_offset: cursor,
                subheader_size,
                item_offset: cursor + subheader_size,
                item_size,
            };
            cursor = location.end_offset();
            location
        })
        .collect();
    (cursor, Some(locations))
}

/// Offsets of every segment in a file, per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    header_length: u64,
    segments: [Option<Vec<SegmentLocation>>; 5],
    end_offset: u64,
}

impl ResolvedLayout {
    /// Resolves the layout described by a decoded header
    pub fn from_header(header: &FileHeader) -> Self {
        let header_length = header.header_length();
        let mut cursor = header_length;
        let segments = SegmentKind::ALL.map(|kind| {
            let (end, locations) = resolve_offsets(cursor, header.table(kind));
            trace!(
                "{} segments: {} located, cursor {} -> {}",
                kind,
                locations.as_ref().map_or(0, Vec::len),
                cursor,
                end
            );
            cursor = end;
            locations
        });

        Self {
            header_length,
            segments,
            end_offset: cursor,
        }
    }

    /// Length of the file header, where the first segment starts
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// Offset one past the last segment; equals the file length of a
    /// well-formed file
    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }

    /// Locations of one kind's segments, or `None` if the file has none
    pub fn get(&self, kind: SegmentKind) -> Option<&[SegmentLocation]> {
        self.segments[kind.index()].as_deref()
    }

    /// Location of the `index`th segment of `kind`
    pub fn location(&self, kind: SegmentKind, index: usize) -> Option<&SegmentLocation> {
        self.get(kind).and_then(|locations| locations.get(index))
    }

    /// Iterates every kind in file order with its locations
    pub fn iter(&self) -> impl Iterator<Item = (SegmentKind, Option<&[SegmentLocation]>)> + '_ {
        SegmentKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }

    /// Number of segments across all kinds
    pub fn total_segments(&self) -> usize {
        self.segments.iter().flatten().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_offsets() {
        let table = ItemArrayTable::for_kind(SegmentKind::Text, vec![6, 6, 6], vec![100, 200, 50]).unwrap();
        let (end, locations) = resolve_offsets(1000, &table);
        let locations = locations.unwrap();

        let subheaders: Vec<u64> = locations.iter().map(|l| l.subheader_offset).collect();
        let items: Vec<u64> = locations.iter().map(|l| l.item_offset).collect();
        assert_eq!(subheaders, vec![1000, 1106, 1312]);
        assert_eq!(items, vec![1006, 1112, 1318]);
        assert_eq!(end, 1368);
    }

    #[test]
    fn test_empty_table_leaves_cursor() {
        let table = ItemArrayTable::empty(SegmentKind::Graphics);
        let (end, locations) = resolve_offsets(777, &table);
        assert_eq!(end, 777);
        assert!(locations.is_none());
    }

    #[test]
    fn test_layout_chains_kinds() {
        let header = FileHeader::builder()
            .table(
                SegmentKind::Image,
                ItemArrayTable::for_kind(SegmentKind::Image, vec![439], vec![1000]).unwrap(),
            )
            .table(
                SegmentKind::DataExtension,
                ItemArrayTable::for_kind(SegmentKind::DataExtension, vec![200, 209], vec![50, 3]).unwrap(),
            )
            .build()
            .unwrap()
            .into_value();

        let layout = ResolvedLayout::from_header(&header);
        let hl = header.header_length();
        assert_eq!(layout.header_length(), hl);

        let image = layout.location(SegmentKind::Image, 0).unwrap();
        assert_eq!(image.subheader_offset, hl);
        assert_eq!(image.item_offset, hl + 439);

        assert!(layout.get(SegmentKind::Graphics).is_none());
        assert!(layout.get(SegmentKind::Text).is_none());

        let des = layout.get(SegmentKind::DataExtension).unwrap();
        assert_eq!(des[0].subheader_offset, hl + 1439);
        assert_eq!(des[1].subheader_offset, hl + 1439 + 250);
        assert_eq!(des[1].item_offset, hl + 1439 + 250 + 209);

        assert_eq!(layout.end_offset(), header.file_length());
        assert_eq!(layout.total_segments(), 3);
    }

    #[test]
    fn test_iter_is_in_file_order() {
        let header = FileHeader::builder().build().unwrap().into_value();
        let layout = ResolvedLayout::from_header(&header);
        let kinds: Vec<SegmentKind> = layout.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, SegmentKind::ALL.to_vec());
        assert_eq!(layout.total_segments(), 0);
        assert_eq!(layout.end_offset(), 388);
    }
}
