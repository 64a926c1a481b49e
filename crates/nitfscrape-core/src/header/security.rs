//! Security tags: the fixed 167-byte classification block carried by the
//! file header and by every segment subheader.

use crate::codec::{
    text_accessors, text_setters, total_width, Field, FieldReader, FieldRef, FieldVisitor,
    FieldWriter, Record,
};
use crate::error::Result;

const CLAS: Field = Field::text("CLAS", 1).with_text("U");
const CLSY: Field = Field::text("CLSY", 2);
const CODE: Field = Field::text("CODE", 11);
const CTLH: Field = Field::text("CTLH", 2);
const REL: Field = Field::text("REL", 20);
const DCTP: Field = Field::text("DCTP", 2);
const DCDT: Field = Field::text("DCDT", 8);
const DCXM: Field = Field::text("DCXM", 4);
const DG: Field = Field::text("DG", 1);
const DGDT: Field = Field::text("DGDT", 8);
const CLTX: Field = Field::text("CLTX", 43);
const CAPT: Field = Field::text("CAPT", 1);
const CAUT: Field = Field::text("CAUT", 40);
const CRSN: Field = Field::text("CRSN", 1);
const SRDT: Field = Field::text("SRDT", 8);
const CTLN: Field = Field::text("CTLN", 15);

const LAYOUT: [Field; 16] = [
    CLAS, CLSY, CODE, CTLH, REL, DCTP, DCDT, DCXM, DG, DGDT, CLTX, CAPT, CAUT, CRSN, SRDT, CTLN,
];

/// Security classification tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityTags {
    classification: String,
    classification_system: String,
    codewords: String,
    control_and_handling: String,
    release_instructions: String,
    declassification_type: String,
    declassification_date: String,
    declassification_exemption: String,
    downgrade: String,
    downgrade_date: String,
    classification_text: String,
    authority_type: String,
    authority: String,
    reason: String,
    source_date: String,
    control_number: String,
}

impl Default for SecurityTags {
    fn default() -> Self {
        Self {
            classification: CLAS.initial_text(),
            classification_system: String::new(),
            codewords: String::new(),
            control_and_handling: String::new(),
            release_instructions: String::new(),
            declassification_type: String::new(),
            declassification_date: String::new(),
            declassification_exemption: String::new(),
            downgrade: String::new(),
            downgrade_date: String::new(),
            classification_text: String::new(),
            authority_type: String::new(),
            authority: String::new(),
            reason: String::new(),
            source_date: String::new(),
            control_number: String::new(),
        }
    }
}

impl SecurityTags {
    /// Encoded length in bytes
    pub const LENGTH: usize = total_width(&LAYOUT);

    /// Unclassified tags with every other field blank
    pub fn unclassified() -> Self {
        Self::default()
    }

    /// Starts building a set of tags from the defaults
    pub fn builder() -> SecurityTagsBuilder {
        SecurityTagsBuilder::default()
    }

    text_accessors! {
        /// CLAS: classification (`U`, `R`, `C`, `S` or `T`)
        classification,
        /// CLSY: classification system
        classification_system,
        /// CODE: codewords
        codewords,
        /// CTLH: control and handling
        control_and_handling,
        /// REL: releasing instructions
        release_instructions,
        /// DCTP: declassification type
        declassification_type,
        /// DCDT: declassification date
        declassification_date,
        /// DCXM: declassification exemption
        declassification_exemption,
        /// DG: downgrade
        downgrade,
        /// DGDT: downgrade date
        downgrade_date,
        /// CLTX: classification text
        classification_text,
        /// CAPT: classification authority type
        authority_type,
        /// CAUT: classification authority
        authority,
        /// CRSN: classification reason
        reason,
        /// SRDT: security source date
        source_date,
        /// CTLN: security control number
        control_number,
    }

    fn entries(&self) -> [(&'static Field, &str); 16] {
        [
            (&CLAS, &self.classification),
            (&CLSY, &self.classification_system),
            (&CODE, &self.codewords),
            (&CTLH, &self.control_and_handling),
            (&REL, &self.release_instructions),
            (&DCTP, &self.declassification_type),
            (&DCDT, &self.declassification_date),
            (&DCXM, &self.declassification_exemption),
            (&DG, &self.downgrade),
            (&DGDT, &self.downgrade_date),
            (&CLTX, &self.classification_text),
            (&CAPT, &self.authority_type),
            (&CAUT, &self.authority),
            (&CRSN, &self.reason),
            (&SRDT, &self.source_date),
            (&CTLN, &self.control_number),
        ]
    }

    fn entries_mut(&mut self) -> [(&'static Field, &mut String); 16] {
        [
            (&CLAS, &mut self.classification),
            (&CLSY, &mut self.classification_system),
            (&CODE, &mut self.codewords),
            (&CTLH, &mut self.control_and_handling),
            (&REL, &mut self.release_instructions),
            (&DCTP, &mut self.declassification_type),
            (&DCDT, &mut self.declassification_date),
            (&DCXM, &mut self.declassification_exemption),
            (&DG, &mut self.downgrade),
            (&DGDT, &mut self.downgrade_date),
            (&CLTX, &mut self.classification_text),
            (&CAPT, &mut self.authority_type),
            (&CAUT, &mut self.authority),
            (&CRSN, &mut self.reason),
            (&SRDT, &mut self.source_date),
            (&CTLN, &mut self.control_number),
        ]
    }
}

impl Record for SecurityTags {
    type Args = ();
    const NAME: &'static str = "SecurityTags";

    fn minimum_length() -> usize {
        Self::LENGTH
    }

    fn encoded_len(&self) -> usize {
        Self::LENGTH
    }

    fn decode(reader: &mut FieldReader<'_>, _args: ()) -> Result<Self> {
        Ok(Self {
            classification: reader.text(&CLAS)?,
            classification_system: reader.text(&CLSY)?,
            codewords: reader.text(&CODE)?,
            control_and_handling: reader.text(&CTLH)?,
            release_instructions: reader.text(&REL)?,
            declassification_type: reader.text(&DCTP)?,
            declassification_date: reader.text(&DCDT)?,
            declassification_exemption: reader.text(&DCXM)?,
            downgrade: reader.text(&DG)?,
            downgrade_date: reader.text(&DGDT)?,
            classification_text: reader.text(&CLTX)?,
            authority_type: reader.text(&CAPT)?,
            authority: reader.text(&CAUT)?,
            reason: reader.text(&CRSN)?,
            source_date: reader.text(&SRDT)?,
            control_number: reader.text(&CTLN)?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) -> Result<()> {
        for (field, value) in self.entries() {
            writer.text(field, value)?;
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn FieldVisitor) {
        visitor.enter_record(Self::NAME);
        for (field, value) in self.entries() {
            visitor.field(field, FieldRef::Text(value));
        }
        visitor.exit_record(Self::NAME);
    }
}

/// Builder for [`SecurityTags`]
#[derive(Debug, Clone, Default)]
pub struct SecurityTagsBuilder {
    inner: SecurityTags,
}

impl SecurityTagsBuilder {
    text_setters! {
        /// Sets CLAS
        classification,
        /// Sets CLSY
        classification_system,
        /// Sets CODE
        codewords,
        /// Sets CTLH
        control_and_handling,
        /// Sets REL
        release_instructions,
        /// Sets DCTP
        declassification_type,
        /// Sets DCDT
        declassification_date,
        /// Sets DCXM
        declassification_exemption,
        /// Sets DG
        downgrade,
        /// Sets DGDT
        downgrade_date,
        /// Sets CLTX
        classification_text,
        /// Sets CAPT
        authority_type,
        /// Sets CAUT
        authority,
        /// Sets CRSN
        reason,
        /// Sets SRDT
        source_date,
        /// Sets CTLN
        control_number,
    }

    /// Validates every field width and returns the tags
    pub fn build(mut self) -> Result<SecurityTags> {
        for (field, value) in self.inner.entries_mut() {
            *value = field.check_text(value)?;
        }
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StatsVisitor;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_length() {
        assert_eq!(SecurityTags::LENGTH, 167);
        assert_eq!(SecurityTags::unclassified().to_bytes().unwrap().len(), 167);
    }

    #[test]
    fn test_default_encoding() {
        let bytes = SecurityTags::unclassified().to_bytes().unwrap();
        assert_eq!(bytes[0], b'U');
        assert!(bytes[1..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn test_round_trip() {
        let tags = SecurityTags::builder()
            .classification("S")
            .classification_system("US")
            .release_instructions("USA GBR")
            .declassification_date("20301231")
            .authority("Originating agency")
            .control_number("CN-0001")
            .build()
            .unwrap();

        let bytes = tags.to_bytes().unwrap();
        let (decoded, consumed) = SecurityTags::from_bytes(&bytes, 0).unwrap();
        assert_eq!(decoded, tags);
        assert_eq!(consumed, 167);
        assert_eq!(decoded.release_instructions(), "USA GBR");
    }

    #[test]
    fn test_builder_rejects_wide_values() {
        let err = SecurityTags::builder()
            .classification("UU")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { field: "CLAS", .. }));
    }

    #[test]
    fn test_builder_normalizes_padding() {
        let tags = SecurityTags::builder().codewords("AB   ").build().unwrap();
        assert_eq!(tags.codewords(), "AB");
    }

    #[test]
    fn test_visit_covers_every_field() {
        let mut stats = StatsVisitor::default();
        SecurityTags::unclassified().visit(&mut stats);
        assert_eq!(stats.field_count, 16);
        assert_eq!(stats.byte_count, 167);
    }

    #[test]
    fn test_truncated() {
        let bytes = SecurityTags::unclassified().to_bytes().unwrap();
        let err = SecurityTags::from_bytes(&bytes[..100], 0).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { needed: 167, .. }));
    }
}
