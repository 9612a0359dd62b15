//! Declarative field extraction.
//!
//! A [`FieldExtractor`] applies an ordered list of [`FieldRule`]s to one block
//! of text. Each rule searches the text independently for the first match of
//! its pattern and coerces the first capture group to the declared type.
//! Every rule produces an entry in the output, in rule order; a rule that does
//! not match yields [`FieldValue::Absent`].

use indexmap::IndexMap;
use log::warn;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::value::{FieldType, FieldValue};
use crate::error::{ConfigError, Result};

/// One named extraction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Output field name.
    pub name: String,

    /// Regex searched in the text; the first capture group is the value.
    pub pattern: String,

    /// Declared type.
    #[serde(default, rename = "type")]
    pub field_type: FieldType,

    /// Unit, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl FieldRule {
    /// Create a new rule.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            field_type,
            unit: None,
        }
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    fn compile(&self) -> std::result::Result<Regex, regex::Error> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .build()
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: FieldRule,
    /// None when the pattern failed to compile.
    regex: Option<Regex>,
}

/// Compiled, ordered rule set.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: Vec<CompiledRule>,
}

impl FieldExtractor {
    /// Compile `rules`.
    ///
    /// A rule with a malformed pattern is reported once here and then always
    /// extracts as absent.
    pub fn new(rules: impl IntoIterator<Item = FieldRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let regex = match rule.compile() {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!("field '{}': invalid pattern '{}': {}", rule.name, rule.pattern, e);
                        None
                    }
                };
                CompiledRule { rule, regex }
            })
            .collect();
        Self { rules }
    }

    /// Compile `rules`, rejecting the first malformed pattern.
    pub fn strict(rules: impl IntoIterator<Item = FieldRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| match rule.compile() {
                Ok(regex) => Ok(CompiledRule {
                    rule,
                    regex: Some(regex),
                }),
                Err(source) => Err(ConfigError::InvalidPattern {
                    name: rule.name.clone(),
                    source,
                }),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Extract every declared field from `text`.
    pub fn extract(&self, text: &str) -> IndexMap<String, FieldValue> {
        let mut fields = IndexMap::with_capacity(self.rules.len());
        self.extract_into(text, &mut fields);
        fields
    }

    /// Extract into an existing map, preserving rule order after its entries.
    pub fn extract_into(&self, text: &str, fields: &mut IndexMap<String, FieldValue>) {
        for compiled in &self.rules {
            let value = compiled
                .regex
                .as_ref()
                .and_then(|regex| regex.captures(text))
                .and_then(|caps| caps.get(1))
                .map(|m| FieldValue::coerce(m.as_str(), compiled.rule.field_type))
                .unwrap_or(FieldValue::Absent);
            fields.insert(compiled.rule.name.clone(), value);
        }
    }
}
