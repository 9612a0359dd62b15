//! Captured command output.

use std::time::Duration;

use regex::Regex;

use crate::channel::Completion;

/// Verbatim output of one command, plus where its body lies.
#[derive(Debug, Clone)]
pub struct Transcript {
    /// The command that was sent.
    pub command: String,

    /// Everything read back, escape sequences stripped.
    pub raw: String,

    /// Time from send to completion.
    pub elapsed: Duration,

    /// How completion was detected.
    pub completion: Completion,

    /// Byte range of `raw` without the command echo and trailing prompt.
    body: std::ops::Range<usize>,
}

impl Transcript {
    /// Build a transcript, locating the body using `prompt`.
    pub(crate) fn new(
        command: impl Into<String>,
        raw: String,
        elapsed: Duration,
        completion: Completion,
        prompt: &Regex,
    ) -> Self {
        let command = command.into();
        let body = body_range(&raw, &command, prompt);
        Self {
            command,
            raw,
            elapsed,
            completion,
            body,
        }
    }

    /// Output without the command echo and trailing prompt.
    pub fn body(&self) -> &str {
        &self.raw[self.body.clone()]
    }

    /// Whether the device produced nothing beyond echo and prompt.
    pub fn is_empty(&self) -> bool {
        self.body().trim().is_empty()
    }
}

fn body_range(raw: &str, command: &str, prompt: &Regex) -> std::ops::Range<usize> {
    let bytes = raw.as_bytes();
    let mut start = 0;
    let mut end = raw.len();

    // Command echo is the first line
    let lead = raw.len() - raw.trim_start_matches(['\r', '\n']).len();
    if raw[lead..].starts_with(command) {
        start = match memchr::memchr(b'\n', &bytes[lead..]) {
            Some(pos) => lead + pos + 1,
            None => raw.len(),
        };
    }

    // Trailing prompt is an unterminated last line
    let last_line = match memchr::memrchr(b'\n', &bytes[start..end]) {
        Some(pos) => start + pos + 1,
        None => start,
    };
    if last_line < end && prompt.is_match(raw[last_line..end].trim_end()) {
        end = last_line;
    }

    start..end.max(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Regex {
        Regex::new(r"[$#>]\s*$").unwrap()
    }

    #[test]
    fn test_body_strips_echo_and_prompt() {
        let raw = "sh ip ospf ne\r\nNeighbor-ID  Pri\r\n10.1.1.1  1\r\nR1# ".to_string();
        let t = Transcript::new(
            "sh ip ospf ne",
            raw,
            Duration::ZERO,
            Completion::Quiet,
            &prompt(),
        );
        assert_eq!(t.body(), "Neighbor-ID  Pri\r\n10.1.1.1  1\r\n");
        assert!(!t.is_empty());
    }

    #[test]
    fn test_echo_and_prompt_only_is_empty() {
        let t = Transcript::new(
            "sh sfp 100g 1/1/1",
            "sh sfp 100g 1/1/1\r\nR1#".to_string(),
            Duration::ZERO,
            Completion::Prompt,
            &prompt(),
        );
        assert_eq!(t.body(), "");
        assert!(t.is_empty());
    }

    #[test]
    fn test_output_without_prompt_is_kept() {
        let t = Transcript::new(
            "show x",
            "show x\r\nvalue: 1\r\nlast line".to_string(),
            Duration::ZERO,
            Completion::WindowElapsed,
            &prompt(),
        );
        assert_eq!(t.body(), "value: 1\r\nlast line");
    }
}
