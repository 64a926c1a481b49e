//! # nitfscrape-core
//!
//! A library for reading the headers of NITF 2.1 container files and
//! locating every segment inside them.
//!
//! This crate provides the core functionality for:
//! - Decoding and encoding the fixed-width ASCII records that make up the
//!   file header and segment subheaders
//! - Resolving the absolute offset of every segment's subheader and payload
//! - Decoding image, text and data extension subheaders at those offsets
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`codec`]: Field codec, the [`Record`] trait and field visitors
//! - [`header`]: File header, security tags, item array tables and
//!   length-prefixed header blocks
//! - [`segment`]: Image, text and data extension subheaders
//! - [`layout`]: Offset resolution and the file-level [`NitfDetails`] reader
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use nitfscrape_core::{NitfDetails, SegmentKind};
//! use std::fs::File;
//!
//! let details = NitfDetails::open("./collect.ntf")?;
//! println!("header is {} bytes", details.header().header_length());
//!
//! if let Some(images) = details.layout().get(SegmentKind::Image) {
//!     for location in images {
//!         println!("image subheader at {}", location.subheader_offset);
//!     }
//! }
//!
//! let mut file = File::open("./collect.ntf")?;
//! let image = details.read_image_subheader(&mut file, 0)?;
//! println!("{} x {}", image.rows(), image.columns());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`FieldVisitor`]: walk the fields of any decoded record
//! - [`Record`]: the decode/encode capability shared by every header type

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod error;
pub mod header;
pub mod layout;
pub mod segment;

// Re-export primary types for convenience
pub use codec::{Checked, Field, FieldVisitor, NullVisitor, Record, StatsVisitor, Warning};
pub use error::{Error, Result};
pub use header::{FileHeader, ItemArrayTable, OverflowHeader, SecurityTags, SegmentKind};
pub use layout::{DetailsConfig, NitfDetails, ResolvedLayout, SegmentLocation};
pub use segment::{DataExtensionHeader, ImageSegmentHeader, TextSegmentHeader};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
