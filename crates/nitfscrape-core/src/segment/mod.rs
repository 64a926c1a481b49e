//! Segment subheaders.
//!
//! Every segment listed in the file header's item array tables begins with a
//! subheader. This module decodes the three kinds the crate understands:
//!
//! - [`ImageSegmentHeader`], with its nested [`ImageComments`] and
//!   [`ImageBands`] records
//! - [`TextSegmentHeader`], a fixed-length layout
//! - [`DataExtensionHeader`], which dispatches on its identifier between the
//!   standard and overflow-carrier layouts
//!
//! Graphics and reserved extension subheaders are located but not decoded.

mod bands;
mod extension;
mod image;
mod text;

pub use bands::{ImageBand, ImageBandBuilder, ImageBands, ImageComments, LookupTable};
pub use extension::{
    DataExtensionHeader, OverflowExtension, OverflowExtensionBuilder, OverflowTarget,
    StandardExtension, StandardExtensionBuilder, OVERFLOW_SENTINEL,
};
pub use image::{ImageSegmentHeader, ImageSegmentHeaderBuilder};
pub use text::{TextSegmentHeader, TextSegmentHeaderBuilder};
