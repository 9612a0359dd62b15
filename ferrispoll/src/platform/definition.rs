//! Device family definitions.

use std::time::Duration;

use serde::Deserialize;

use super::command::{CommandScope, CommandSpec, CompiledCommand};
use crate::channel::SettleTime;
use crate::error::{ConfigError, Result};
use crate::session::{DEFAULT_PROMPT_PATTERN, SessionProfile};

fn one_second() -> SettleTime {
    SettleTime::new(Duration::from_secs(1))
}

/// Everything family-specific: terminal bootstrap, teardown, failure
/// markers and the commands to poll.
///
/// Families are plain data and can be loaded from JSON as well as built in
/// code.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceFamily {
    /// Family name (e.g., "tejas").
    pub name: String,

    /// Commands sent once after login; output discarded.
    #[serde(default)]
    pub bootstrap: Vec<String>,

    /// Command sent before closing the channel.
    #[serde(default)]
    pub exit_command: Option<String>,

    /// Prompt regex; when set, a response completes as soon as it appears.
    #[serde(default)]
    pub prompt_pattern: Option<String>,

    /// Output substrings that mark a command as rejected by the device.
    #[serde(default)]
    pub failed_when_contains: Vec<String>,

    #[serde(default = "one_second")]
    pub banner_settle: SettleTime,

    #[serde(default = "one_second")]
    pub bootstrap_settle: SettleTime,

    /// Commands to poll, in order.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

impl DeviceFamily {
    /// Create a family with no commands.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bootstrap: vec![],
            exit_command: None,
            prompt_pattern: None,
            failed_when_contains: vec![],
            banner_settle: one_second(),
            bootstrap_settle: one_second(),
            commands: vec![],
        }
    }

    /// Add a bootstrap command.
    pub fn with_bootstrap(mut self, command: impl Into<String>) -> Self {
        self.bootstrap.push(command.into());
        self
    }

    /// Set the exit command.
    pub fn with_exit_command(mut self, command: impl Into<String>) -> Self {
        self.exit_command = Some(command.into());
        self
    }

    /// Set the prompt pattern.
    pub fn with_prompt(mut self, pattern: impl Into<String>) -> Self {
        self.prompt_pattern = Some(pattern.into());
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Set banner and bootstrap settle timing.
    pub fn with_login_settle(mut self, banner: SettleTime, bootstrap: SettleTime) -> Self {
        self.banner_settle = banner;
        self.bootstrap_settle = bootstrap;
        self
    }

    /// Add a command.
    pub fn with_command(mut self, command: CommandSpec) -> Self {
        self.commands.push(command);
        self
    }

    /// Validate patterns and build parsers.
    pub fn compile(&self) -> Result<CompiledFamily> {
        let pattern = self
            .prompt_pattern
            .as_deref()
            .unwrap_or(DEFAULT_PROMPT_PATTERN);

        let invalid = |source| ConfigError::InvalidPattern {
            name: format!("{}.prompt_pattern", self.name),
            source,
        };
        let prompt_line = regex::Regex::new(pattern).map_err(invalid)?;
        let prompt = match &self.prompt_pattern {
            Some(p) => Some(regex::bytes::Regex::new(p).map_err(invalid)?),
            None => None,
        };

        let profile = SessionProfile {
            bootstrap: self.bootstrap.clone(),
            exit_command: self.exit_command.clone(),
            prompt,
            prompt_line,
            banner_settle: self.banner_settle,
            bootstrap_settle: self.bootstrap_settle,
            ..SessionProfile::default()
        };

        Ok(CompiledFamily {
            name: self.name.clone(),
            profile,
            failed_when_contains: self.failed_when_contains.clone(),
            commands: self.commands.iter().cloned().map(CompiledCommand::new).collect(),
        })
    }
}

/// A family ready to drive sessions.
#[derive(Debug, Clone)]
pub struct CompiledFamily {
    pub name: String,
    pub profile: SessionProfile,
    pub failed_when_contains: Vec<String>,
    pub commands: Vec<CompiledCommand>,
}

impl CompiledFamily {
    /// The failure marker contained in `output`, if any.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|marker| output.contains(marker.as_str()))
            .map(String::as_str)
    }

    /// Commands of the given scope, in declaration order.
    pub fn commands_for(&self, scope: CommandScope) -> impl Iterator<Item = &CompiledCommand> {
        self.commands.iter().filter(move |c| c.spec.scope == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ParserSpec;

    #[test]
    fn test_compile_builds_profile() {
        let family = DeviceFamily::new("lab")
            .with_bootstrap("terminal length 0")
            .with_exit_command("exit")
            .with_prompt(r"lab-\d+#\s*$")
            .with_command(CommandSpec::new("A", "show a", ParserSpec::BgpSummary))
            .compile()
            .unwrap();

        assert_eq!(family.profile.bootstrap, vec!["terminal length 0"]);
        assert!(family.profile.prompt.as_ref().unwrap().is_match(b"lab-01# "));
        assert!(family.profile.prompt_line.is_match("lab-01#"));
        assert_eq!(family.commands.len(), 1);
    }

    #[test]
    fn test_bad_prompt_is_config_error() {
        let err = DeviceFamily::new("lab").with_prompt("((").compile().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_detect_failure() {
        let family = DeviceFamily::new("lab")
            .with_failure_pattern("% Invalid input")
            .compile()
            .unwrap();
        assert_eq!(
            family.detect_failure("sh foo\r\n% Invalid input detected at '^'\r\n"),
            Some("% Invalid input")
        );
        assert_eq!(family.detect_failure("all good"), None);
    }

    #[test]
    fn test_deserialize_defaults() {
        let family: DeviceFamily = serde_json::from_str(r#"{"name": "bare"}"#).unwrap();
        assert_eq!(family.banner_settle.window, Duration::from_secs(1));
        assert!(family.commands.is_empty());
        assert!(family.compile().unwrap().profile.prompt.is_none());
    }
}
