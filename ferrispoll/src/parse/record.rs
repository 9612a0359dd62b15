//! Parsed records.

use indexmap::IndexMap;
use serde::Serialize;

use super::value::FieldValue;

/// One row of a table-shaped output.
pub type TableRow = IndexMap<String, FieldValue>;

/// Typed result of parsing one command's output.
///
/// `fields` holds one entry per declared field, in declaration order.
/// `tables` holds row listings (OSPF neighbors, BGP peers). The transcript
/// the record was derived from is kept alongside but not serialized with
/// the data.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParsedRecord {
    #[serde(flatten)]
    pub fields: IndexMap<String, FieldValue>,

    #[serde(flatten)]
    pub tables: IndexMap<String, Vec<TableRow>>,

    #[serde(skip)]
    pub transcript: String,
}

impl ParsedRecord {
    /// A record whose declared fields are all absent.
    pub fn absent<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            fields: names
                .into_iter()
                .map(|name| (name.to_string(), FieldValue::Absent))
                .collect(),
            ..Self::default()
        }
    }

    /// Attach the verbatim transcript.
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = transcript.into();
        self
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Look up a table.
    pub fn table(&self, name: &str) -> Option<&[TableRow]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    /// True when nothing at all was extracted.
    ///
    /// Used as a quality signal: the command ran but the output did not
    /// have the expected shape.
    pub fn is_degraded(&self) -> bool {
        self.fields.values().all(FieldValue::is_absent)
            && self.tables.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_record_is_degraded() {
        let record = ParsedRecord::absent(["a", "b"]);
        assert_eq!(record.fields.len(), 2);
        assert!(record.is_degraded());
    }

    #[test]
    fn test_record_with_rows_is_not_degraded() {
        let mut record = ParsedRecord::absent(["a"]);
        let mut row = TableRow::new();
        row.insert("neighbor_id".into(), FieldValue::Text("10.0.0.1".into()));
        record.tables.insert("neighbors".into(), vec![row]);
        assert!(!record.is_degraded());
    }

    #[test]
    fn test_serializes_flat_without_transcript() {
        let mut record = ParsedRecord::absent(["missing"]).with_transcript("raw text");
        record.fields.insert("count".into(), FieldValue::Number(1.0));
        record.tables.insert("rows".into(), vec![]);

        let data = serde_json::to_value(&record).unwrap();
        assert_eq!(data["missing"], serde_json::Value::Null);
        assert_eq!(data["count"], serde_json::json!(1.0));
        assert_eq!(data["rows"], serde_json::json!([]));
        assert!(data.get("transcript").is_none());
    }
}
