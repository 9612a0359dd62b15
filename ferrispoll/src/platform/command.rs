//! Command specifications.

use std::sync::Arc;

use serde::Deserialize;

use crate::channel::SettleTime;
use crate::parse::{
    BgpSummaryParser, FieldExtractor, FieldRule, OspfNeighborParser, OutputParser, ParsedRecord,
    SfpInfoParser, SfpStatsParser,
};

/// Placeholder substituted with the interface identifier.
pub const INTERFACE_PLACEHOLDER: &str = "{interface}";

/// What a command is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandScope {
    /// Run once per device.
    #[default]
    Device,
    /// Run once per monitored interface.
    Interface,
}

/// Which parser handles a command's output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParserSpec {
    /// Configurable field rules.
    Fields { rules: Vec<FieldRule> },
    OspfNeighbors,
    BgpSummary,
    SfpInfo,
    SfpStats,
}

impl ParserSpec {
    /// Build the parser.
    pub fn build(&self) -> Arc<dyn OutputParser> {
        match self {
            ParserSpec::Fields { rules } => Arc::new(FieldExtractor::new(rules.clone())),
            ParserSpec::OspfNeighbors => Arc::new(OspfNeighborParser),
            ParserSpec::BgpSummary => Arc::new(BgpSummaryParser),
            ParserSpec::SfpInfo => Arc::new(SfpInfoParser),
            ParserSpec::SfpStats => Arc::new(SfpStatsParser),
        }
    }
}

/// A named command template.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Parameter name readings are stored under (e.g. `TEJAS_BGP_SUMMARY`).
    pub parameter: String,

    /// Command text; interface commands contain `{interface}`.
    pub template: String,

    #[serde(default)]
    pub scope: CommandScope,

    /// Settle timing for the response.
    #[serde(default)]
    pub settle: SettleTime,

    pub parser: ParserSpec,
}

impl CommandSpec {
    /// Create a device-scoped command with default settle timing.
    pub fn new(
        parameter: impl Into<String>,
        template: impl Into<String>,
        parser: ParserSpec,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            template: template.into(),
            scope: CommandScope::Device,
            settle: SettleTime::default(),
            parser,
        }
    }

    /// Bind to monitored interfaces.
    pub fn per_interface(mut self) -> Self {
        self.scope = CommandScope::Interface;
        self
    }

    /// Set the settle timing.
    pub fn with_settle(mut self, settle: SettleTime) -> Self {
        self.settle = settle;
        self
    }

    /// Render the command text.
    pub fn render(&self, interface: Option<&str>) -> String {
        match interface {
            Some(id) => self.template.replace(INTERFACE_PLACEHOLDER, id),
            None => self.template.clone(),
        }
    }
}

/// A command with its parser built.
#[derive(Clone)]
pub struct CompiledCommand {
    pub spec: CommandSpec,
    parser: Arc<dyn OutputParser>,
}

impl CompiledCommand {
    pub fn new(spec: CommandSpec) -> Self {
        let parser = spec.parser.build();
        Self { spec, parser }
    }

    /// Parse a transcript body.
    pub fn parse(&self, text: &str) -> ParsedRecord {
        self.parser.parse(text)
    }

    /// Record with every declared field absent, for commands that failed.
    pub fn absent_record(&self) -> ParsedRecord {
        let declared = self.parser.parse("");
        ParsedRecord::absent(declared.fields.keys().map(String::as_str))
    }
}

impl std::fmt::Debug for CompiledCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCommand")
            .field("spec", &self.spec)
            .field("parser", &"<OutputParser>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{FieldType, FieldValue};

    #[test]
    fn test_render_interface() {
        let spec = CommandSpec::new("SFP", "sh sfp 100g {interface}", ParserSpec::SfpInfo)
            .per_interface();
        assert_eq!(spec.render(Some("hu1/1")), "sh sfp 100g hu1/1");
        assert_eq!(spec.scope, CommandScope::Interface);
    }

    #[test]
    fn test_absent_record_declares_every_field() {
        let command = CompiledCommand::new(CommandSpec::new(
            "OSPF",
            "sh ip ospf ne",
            ParserSpec::OspfNeighbors,
        ));
        let record = command.absent_record();
        assert_eq!(record.get("neighbor_count"), Some(&FieldValue::Absent));
        assert!(record.is_degraded());

        let command = CompiledCommand::new(CommandSpec::new("SFP", "x", ParserSpec::SfpInfo));
        assert_eq!(command.absent_record().fields.len(), 11);
    }

    #[test]
    fn test_deserialize_generic_parameter() {
        let spec: CommandSpec = serde_json::from_str(
            r#"{
                "parameter": "CPU_UTIL",
                "template": "show processes cpu",
                "settle": {"window": 1500},
                "parser": {"kind": "fields", "rules": [
                    {"name": "cpu_5s", "pattern": "five seconds:\\s*(\\d+)%", "type": "number", "unit": "%"}
                ]}
            }"#,
        )
        .unwrap();

        assert_eq!(spec.scope, CommandScope::Device);
        let command = CompiledCommand::new(spec);
        let record = command.parse("CPU utilization for five seconds: 12%/0%");
        assert_eq!(record.get("cpu_5s"), Some(&FieldValue::Number(12.0)));
        assert!(matches!(
            command.spec.parser,
            ParserSpec::Fields { ref rules } if rules[0].field_type == FieldType::Number
        ));
    }
}
