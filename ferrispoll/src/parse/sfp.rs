//! Optical module parsers.
//!
//! `show sfp 100g <if>` is a key/value block handled entirely by
//! [`FieldExtractor`] rules. `show sfp stats 100g <if>` reports per-lane
//! power as `0=-5.20;1=-5.25;...` on one line; lanes are extracted
//! individually and averaged only when every lane parsed.

use std::sync::LazyLock;

use super::OutputParser;
use super::extractor::{FieldExtractor, FieldRule};
use super::record::ParsedRecord;
use super::value::{FieldType, FieldValue};

/// Lanes on a 100G module.
pub const LANES: usize = 4;

static INFO: LazyLock<FieldExtractor> = LazyLock::new(|| {
    use FieldType::{Number, String as Text};
    FieldExtractor::new([
        FieldRule::new("parent_interface", r"Parent\s*:\s*(.+)", Text),
        FieldRule::new("laser_status", r"MSA Laser Status\s*:\s*(\w+)", Text),
        FieldRule::new("operational_status", r"Operational Status\s*:\s*(\w+)", Text),
        FieldRule::new("laser_type", r"Laser Type\s*:\s*(.+)", Text),
        FieldRule::new("rx_power", r"RxPower\s*:\s*(-?[\d.]+)", Number).with_unit("dBm"),
        FieldRule::new("tx_power", r"TxPower\s*:\s*(-?[\d.]+)", Number).with_unit("dBm"),
        FieldRule::new("module_temperature", r"Module Temperature[^:\n]*:\s*(-?[\d.]+)", Number)
            .with_unit("C"),
        FieldRule::new("module_voltage", r"Module Voltage[^:\n]*:\s*(-?[\d.]+)", Number)
            .with_unit("V"),
        FieldRule::new("serial_number", r"Serial Number\s*:\s*(.+)", Text),
        FieldRule::new("vendor_name", r"Vendor Name\s*:\s*(.+)", Text),
        FieldRule::new("part_number", r"Part Number\s*:\s*(.+)", Text),
    ])
});

static STATS: LazyLock<FieldExtractor> = LazyLock::new(|| {
    FieldExtractor::new(
        lane_rules("rx", "Received Power").chain(lane_rules("tx", "Transmit Power")),
    )
});

fn lane_rules(prefix: &'static str, label: &'static str) -> impl Iterator<Item = FieldRule> {
    (0..LANES).map(move |lane| {
        FieldRule::new(
            format!("{prefix}_power_lane{lane}"),
            format!(r"{label}.*?\b{lane}=(-?[\d.]+)"),
            FieldType::Number,
        )
        .with_unit("dBm")
    })
}

/// Mean of all lanes rounded to 4 decimals, or None if any lane is missing.
fn lane_average(record: &ParsedRecord, prefix: &str) -> Option<f64> {
    let lanes = (0..LANES)
        .map(|lane| {
            record
                .get(&format!("{prefix}_power_lane{lane}"))
                .and_then(FieldValue::as_f64)
        })
        .collect::<Option<Vec<f64>>>()?;
    let mean = lanes.iter().sum::<f64>() / lanes.len() as f64;
    Some((mean * 10_000.0).round() / 10_000.0)
}

/// Optical module information parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SfpInfoParser;

impl OutputParser for SfpInfoParser {
    fn parse(&self, text: &str) -> ParsedRecord {
        ParsedRecord {
            fields: INFO.extract(text),
            ..ParsedRecord::default()
        }
        .with_transcript(text)
    }
}

/// Optical per-lane power parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SfpStatsParser;

impl OutputParser for SfpStatsParser {
    fn parse(&self, text: &str) -> ParsedRecord {
        let mut record = ParsedRecord {
            fields: STATS.extract(text),
            ..ParsedRecord::default()
        };
        for prefix in ["rx", "tx"] {
            if let Some(avg) = lane_average(&record, prefix) {
                record
                    .fields
                    .insert(format!("{prefix}_power_avg"), FieldValue::Number(avg));
            }
        }
        record.with_transcript(text)
    }
}
