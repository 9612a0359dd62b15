//! Output parsing.
//!
//! Everything here is a pure function of the transcript text: parsers never
//! fail, they return a best-effort [`ParsedRecord`] whose fields are
//! [`FieldValue::Absent`] where nothing could be extracted.

mod bgp;
mod extractor;
mod ospf;
mod record;
mod sfp;
mod table;
mod value;

pub use bgp::BgpSummaryParser;
pub use extractor::{FieldExtractor, FieldRule};
pub use ospf::OspfNeighborParser;
pub use record::{ParsedRecord, TableRow};
pub use sfp::{LANES, SfpInfoParser, SfpStatsParser};
pub use table::TableLayout;
pub use value::{FieldType, FieldValue};

/// Turns one command's output into a record.
pub trait OutputParser: Send + Sync {
    /// Parse `text`. Never fails; unmatched fields are absent.
    fn parse(&self, text: &str) -> ParsedRecord;
}

impl OutputParser for FieldExtractor {
    fn parse(&self, text: &str) -> ParsedRecord {
        ParsedRecord {
            fields: self.extract(text),
            ..ParsedRecord::default()
        }
        .with_transcript(text)
    }
}
