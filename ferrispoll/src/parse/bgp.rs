//! `show ip bgp summary` parser.
//!
//! Summary counters are extracted with [`FieldExtractor`] rules; the peer
//! listing that follows is keyed on the neighbor address in the second
//! column (the first is a free-text description).

use std::sync::LazyLock;

use super::OutputParser;
use super::extractor::{FieldExtractor, FieldRule};
use super::record::ParsedRecord;
use super::table::TableLayout;
use super::value::{FieldType, FieldValue};

const PEERS: TableLayout = TableLayout {
    header_marker: "Neighbor",
    key_column: 1,
    min_columns: 8,
    columns: &[
        "description",
        "neighbor",
        "version",
        "as_number",
        "msg_rcvd",
        "msg_sent",
        "uptime",
        "state",
        "updown_count",
    ],
};

static SUMMARY: LazyLock<FieldExtractor> = LazyLock::new(|| {
    FieldExtractor::new([
        FieldRule::new("router_id", r"BGP router identifier is ([\d.]+)", FieldType::String),
        FieldRule::new("local_as", r"Local AS number (\d+)", FieldType::Number),
        FieldRule::new("established_count", r"Established Count\s*:\s*(\d+)", FieldType::Number),
        FieldRule::new("configured_count", r"Configured count\s*:\s*(\d+)", FieldType::Number),
        FieldRule::new(
            "total_change_version",
            r"Total Change version\s*:\s*([\d,]+)",
            FieldType::Number,
        ),
        FieldRule::new("forwarding_state", r"Forwarding State is (\w+)", FieldType::String),
    ])
});

/// BGP summary parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BgpSummaryParser;

impl OutputParser for BgpSummaryParser {
    fn parse(&self, text: &str) -> ParsedRecord {
        let mut record = ParsedRecord::default();
        SUMMARY.extract_into(text, &mut record.fields);

        let peers = PEERS.parse(text);
        record.fields.insert(
            "bgp_neighbor_count".into(),
            FieldValue::Number(peers.len() as f64),
        );
        record.tables.insert("bgp_neighbors".into(), peers);
        record.with_transcript(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
BGP router identifier is 10.0.0.1, Local AS number 65001
Forwarding State is Enabled
Established Count : 2
Configured count : 3
Total Change version : 1,204
Description  Neighbor     V  AS     MsgRcvd  MsgSent  Up/Down   State        Up/Down-Count
-------------------------------------------------------------------------------------------
core-a       10.0.0.2     4  65002  1523     1519     2d03h     Established  1
core-b       10.0.0.3     4  65003  1411     1410     2d01h     Established  3
edge-c       10.0.0.4     4  65004  0        0        never     Active
";

    #[test]
    fn test_summary_counters() {
        let record = BgpSummaryParser.parse(OUTPUT);
        assert_eq!(record.get("router_id"), Some(&FieldValue::Text("10.0.0.1".into())));
        assert_eq!(record.get("local_as"), Some(&FieldValue::Number(65001.0)));
        assert_eq!(record.get("established_count"), Some(&FieldValue::Number(2.0)));
        assert_eq!(record.get("configured_count"), Some(&FieldValue::Number(3.0)));
        assert_eq!(record.get("total_change_version"), Some(&FieldValue::Number(1204.0)));
        assert_eq!(
            record.get("forwarding_state"),
            Some(&FieldValue::Text("Enabled".into()))
        );
    }

    #[test]
    fn test_peer_table() {
        let record = BgpSummaryParser.parse(OUTPUT);
        let peers = record.table("bgp_neighbors").unwrap();

        assert_eq!(record.get("bgp_neighbor_count"), Some(&FieldValue::Number(3.0)));
        assert_eq!(peers[0]["description"], FieldValue::Text("core-a".into()));
        assert_eq!(peers[1]["updown_count"], FieldValue::Text("3".into()));
        assert_eq!(peers[2]["state"], FieldValue::Text("Active".into()));
        assert!(peers[2]["updown_count"].is_absent());
    }

    #[test]
    fn test_missing_summary_fields_are_absent() {
        let record = BgpSummaryParser.parse("% BGP not active\r\n");
        assert!(record.get("router_id").unwrap().is_absent());
        assert!(record.get("total_change_version").unwrap().is_absent());
        assert_eq!(record.get("bgp_neighbor_count"), Some(&FieldValue::Number(0.0)));
    }
}
