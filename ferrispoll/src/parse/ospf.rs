//! `show ip ospf neighbor` parser.
//!
//! ```text
//! Neighbor-ID  Pri State      Dead-Time Address   Interface Helper Age ER BFD     Area
//! -------------------------------------------------------------------------------------
//! 10.1.1.1     1   FULL/PTOP  00:00:35  10.1.1.1  vlan50    None   0   0  Enabled 0.0.0.0
//! ```
//!
//! Rows are keyed on the neighbor ID. Older firmware omits the helper and
//! BFD columns, so only the first six columns are required.

use super::OutputParser;
use super::record::ParsedRecord;
use super::table::TableLayout;
use super::value::FieldValue;

const LAYOUT: TableLayout = TableLayout {
    header_marker: "Neighbor",
    key_column: 0,
    min_columns: 6,
    columns: &[
        "neighbor_id",
        "priority",
        "state",
        "dead_time",
        "neighbor_address",
        "interface",
        "helper_status",
        "helper_age",
        "helper_er",
        "bfd_status",
        "area_id",
    ],
};

/// OSPF neighbor table parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct OspfNeighborParser;

impl OutputParser for OspfNeighborParser {
    fn parse(&self, text: &str) -> ParsedRecord {
        let neighbors = LAYOUT.parse(text);
        let mut record = ParsedRecord::default();
        record.fields.insert(
            "neighbor_count".into(),
            FieldValue::Number(neighbors.len() as f64),
        );
        record.tables.insert("neighbors".into(), neighbors);
        record.with_transcript(text)
    }
}
