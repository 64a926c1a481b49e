//! Extensible record visiting traits.
//!
//! This module provides the [`FieldVisitor`] trait for walking any decoded
//! record field by field, in encoded order, without knowing its concrete type.

use super::field::{Field, FieldRef};

/// Trait for receiving the fields of a record.
///
/// Every method has a no-op default so implementations only override what
/// they need. Nested records are bracketed by [`enter_record`] and
/// [`exit_record`].
///
/// [`enter_record`]: FieldVisitor::enter_record
/// [`exit_record`]: FieldVisitor::exit_record
///
/// # Example
///
/// ```
/// use nitfscrape_core::codec::{Field, FieldRef, FieldVisitor};
///
/// struct Names(Vec<&'static str>);
///
/// impl FieldVisitor for Names {
///     fn field(&mut self, field: &Field, _value: FieldRef<'_>) {
///         self.0.push(field.name);
///     }
/// }
/// ```
pub trait FieldVisitor {
    /// Called before the fields of a (possibly nested) record
    fn enter_record(&mut self, name: &'static str) {
        let _ = name;
    }

    /// Called once per fixed-width field
    fn field(&mut self, field: &Field, value: FieldRef<'_>) {
        let _ = (field, value);
    }

    /// Called for a variable-length blob that is not a fixed-width field
    fn blob(&mut self, name: &'static str, bytes: &[u8]) {
        let _ = (name, bytes);
    }

    /// Called after the fields of a record
    fn exit_record(&mut self, name: &'static str) {
        let _ = name;
    }
}

/// A no-op visitor
pub struct NullVisitor;

impl FieldVisitor for NullVisitor {}

/// A visitor that collects statistics about a record tree
#[derive(Debug, Default)]
pub struct StatsVisitor {
    /// Number of records entered, including the root
    pub record_count: usize,
    /// Number of fixed-width fields
    pub field_count: usize,
    /// Number of variable-length blobs
    pub blob_count: usize,
    /// Total encoded bytes seen
    pub byte_count: usize,
}

impl FieldVisitor for StatsVisitor {
    fn enter_record(&mut self, _name: &'static str) {
        self.record_count += 1;
    }

    fn field(&mut self, field: &Field, _value: FieldRef<'_>) {
        self.field_count += 1;
        self.byte_count += field.width;
    }

    fn blob(&mut self, _name: &'static str, bytes: &[u8]) {
        self.blob_count += 1;
        self.byte_count += bytes.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_visitor() {
        let mut visitor = NullVisitor;
        visitor.enter_record("Anything");
        visitor.field(&Field::uint("N", 3), FieldRef::UInt(1));
        visitor.exit_record("Anything");
    }

    #[test]
    fn test_stats_visitor() {
        let mut visitor = StatsVisitor::default();
        visitor.enter_record("Root");
        visitor.field(&Field::text("A", 4), FieldRef::Text("x"));
        visitor.field(&Field::uint("B", 2), FieldRef::UInt(3));
        visitor.blob("LUT", &[0, 1, 2]);
        visitor.exit_record("Root");

        assert_eq!(visitor.record_count, 1);
        assert_eq!(visitor.field_count, 2);
        assert_eq!(visitor.blob_count, 1);
        assert_eq!(visitor.byte_count, 9);
    }
}
