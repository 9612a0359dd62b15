//! Deciding when a command's response is complete.
//!
//! The devices this crate talks to give no reliable end-of-output marker.
//! Each command therefore carries a [`SettleTime`]: a `window` that bounds
//! how long we wait at all, and a `quiet` period after which an idle channel
//! counts as finished. The legacy behavior of sleeping the whole window and
//! draining whatever is buffered is still available as
//! [`SettleMode::FixedDelay`] for devices that need it.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use serde::Deserialize;
use tokio::time::Instant;

use super::buffer::TranscriptBuffer;
use crate::error::Result;
use crate::transport::Shell;

/// How completion of a response is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Finish once no new bytes arrived for `quiet`, bounded by `window`.
    #[default]
    Quiescent,

    /// Sleep for `window`, then drain everything currently buffered.
    FixedDelay,
}

/// Settle timing for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettleTime {
    /// Upper bound on the wait for a response.
    #[serde(with = "millis")]
    pub window: Duration,

    /// Idle period that counts as end of output.
    #[serde(with = "millis")]
    pub quiet: Duration,

    /// Completion strategy.
    pub mode: SettleMode,
}

impl SettleTime {
    /// Quiescence-based settle bounded by `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    /// Legacy fixed-delay settle.
    pub fn fixed(window: Duration) -> Self {
        Self {
            window,
            mode: SettleMode::FixedDelay,
            ..Self::default()
        }
    }

    /// Set the quiet period.
    pub fn with_quiet(mut self, quiet: Duration) -> Self {
        self.quiet = quiet;
        self
    }
}

impl Default for SettleTime {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(2),
            quiet: Duration::from_millis(500),
            mode: SettleMode::Quiescent,
        }
    }
}

/// Why a drain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The channel went idle for the quiet period.
    Quiet,
    /// The family prompt appeared at the tail of the output.
    Prompt,
    /// The window ran out while output was still arriving.
    WindowElapsed,
    /// Fixed delay elapsed and the buffered output was drained.
    FixedDelay,
    /// Nothing arrived at all.
    NoOutput,
}

/// Read from `shell` into `buffer` until the response is complete.
///
/// `echo` is the command line just sent, if any. The quiet period only
/// starts once bytes past the echoed line have arrived, so a device that
/// echoes at once and thinks for a while is bounded by `window` alone.
///
/// Never fails on silence; callers decide whether [`Completion::NoOutput`]
/// is an error. Errors are channel failures only.
pub async fn drain<S: Shell>(
    shell: &mut S,
    buffer: &mut TranscriptBuffer,
    settle: &SettleTime,
    prompt: Option<&Regex>,
    echo: Option<&str>,
) -> Result<Completion> {
    match settle.mode {
        SettleMode::FixedDelay => drain_fixed(shell, buffer, settle).await,
        SettleMode::Quiescent => drain_quiescent(shell, buffer, settle, prompt, echo).await,
    }
}

async fn drain_fixed<S: Shell>(
    shell: &mut S,
    buffer: &mut TranscriptBuffer,
    settle: &SettleTime,
) -> Result<Completion> {
    tokio::time::sleep(settle.window).await;

    let mut received = false;
    while let Some(chunk) = shell.read_chunk(Duration::ZERO).await? {
        received = true;
        buffer.extend(&chunk);
    }

    Ok(if received {
        Completion::FixedDelay
    } else {
        Completion::NoOutput
    })
}

async fn drain_quiescent<S: Shell>(
    shell: &mut S,
    buffer: &mut TranscriptBuffer,
    settle: &SettleTime,
    prompt: Option<&Regex>,
    echo: Option<&str>,
) -> Result<Completion> {
    let deadline = Instant::now() + settle.window;
    let start = buffer.len();
    let mut responding = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(if responding {
                Completion::WindowElapsed
            } else {
                Completion::NoOutput
            });
        }

        // Until the response proper shows up, the whole window is available
        let wait = if responding {
            settle.quiet.min(remaining)
        } else {
            remaining
        };

        match shell.read_chunk(wait).await? {
            Some(chunk) => {
                trace!("settle: {} bytes", chunk.len());
                buffer.extend(&chunk);
                if !responding {
                    responding = past_echo(&buffer.as_slice()[start..], echo);
                }
                if responding && prompt.is_some_and(|p| buffer.tail_contains(p)) {
                    return Ok(Completion::Prompt);
                }
            }
            None if responding && wait == settle.quiet => return Ok(Completion::Quiet),
            None => {}
        }
    }
}

/// Whether `output` holds anything beyond the echoed command line.
fn past_echo(output: &[u8], echo: Option<&str>) -> bool {
    let lead = output
        .iter()
        .take_while(|&&b| matches!(b, b'\r' | b'\n'))
        .count();
    let output = &output[lead..];

    let Some(echo) = echo.map(str::as_bytes) else {
        return !output.is_empty();
    };

    if output.starts_with(echo) {
        let rest = &output[echo.len()..];
        return memchr::memchr(b'\n', rest).is_some_and(|pos| pos + 1 < rest.len());
    }

    // A partial echo is still the echo; anything else is output
    !echo.starts_with(output)
}

/// Serde helper for durations written as integer milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Behavior, MockConnector, Reply, Script};
    use crate::transport::{Connector, Endpoint};

    async fn shell_for(script: Script) -> crate::transport::mock::MockShell {
        let connector = MockConnector::new().host("r1", Behavior::Device(script));
        let endpoint = Endpoint {
            host: "r1".into(),
            port: 22,
            username: "admin".into(),
            password: "secret".to_string().into(),
        };
        connector.open(&endpoint).await.unwrap()
    }

    fn fast() -> SettleTime {
        SettleTime::new(Duration::from_millis(400)).with_quiet(Duration::from_millis(40))
    }

    #[tokio::test]
    async fn test_quiet_completion_collects_all_chunks() {
        let script = Script::new("R1#").reply(
            "show x",
            Reply::Chunked {
                gap: Duration::from_millis(10),
                parts: vec!["line one\r\n".into(), "line two\r\n".into()],
            },
        );
        let mut shell = shell_for(script).await;
        let mut buffer = TranscriptBuffer::default();

        // Discard banner
        drain(&mut shell, &mut buffer, &fast(), None, None).await.unwrap();
        buffer.clear();

        shell.send(b"show x\n").await.unwrap();
        let completion = drain(&mut shell, &mut buffer, &fast(), None, Some("show x"))
            .await
            .unwrap();

        assert_eq!(completion, Completion::Quiet);
        let text = buffer.take_text();
        assert!(text.contains("line one"));
        assert!(text.contains("line two"));
        assert!(text.ends_with("R1#"));
    }

    #[tokio::test]
    async fn test_prompt_completion_is_early() {
        let script = Script::new("R1#").reply("show y", Reply::text("data\r\n"));
        let mut shell = shell_for(script).await;
        let mut buffer = TranscriptBuffer::default();
        let prompt = Regex::new(r"R1#\s*$").unwrap();

        drain(&mut shell, &mut buffer, &fast(), Some(&prompt), None)
            .await
            .unwrap();
        buffer.clear();

        shell.send(b"show y\n").await.unwrap();
        let settle = SettleTime::new(Duration::from_secs(5)).with_quiet(Duration::from_secs(2));
        let started = std::time::Instant::now();
        let completion = drain(&mut shell, &mut buffer, &settle, Some(&prompt), Some("show y"))
            .await
            .unwrap();

        assert_eq!(completion, Completion::Prompt);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_silence_reports_no_output() {
        let script = Script::new("R1#").reply("mute", Reply::Silent);
        let mut shell = shell_for(script).await;
        let mut buffer = TranscriptBuffer::default();

        drain(&mut shell, &mut buffer, &fast(), None, None).await.unwrap();
        buffer.clear();

        shell.send(b"mute\n").await.unwrap();
        let completion = drain(&mut shell, &mut buffer, &fast(), None, Some("mute"))
            .await
            .unwrap();
        assert_eq!(completion, Completion::NoOutput);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_fixed_delay_drains_buffered_output() {
        let script = Script::new("R1#").reply("show z", Reply::text("z-output\r\n"));
        let mut shell = shell_for(script).await;
        let mut buffer = TranscriptBuffer::default();

        shell.send(b"show z\n").await.unwrap();
        let settle = SettleTime::fixed(Duration::from_millis(50));
        let completion = drain(&mut shell, &mut buffer, &settle, None, None).await.unwrap();

        assert_eq!(completion, Completion::FixedDelay);
        let text = buffer.take_text();
        assert!(text.contains("Welcome"));
        assert!(text.contains("z-output"));
    }

    #[tokio::test]
    async fn test_quiet_period_starts_after_echo() {
        let script = Script::new("R1#").reply(
            "sh ip ospf ne",
            Reply::Output {
                after: Duration::from_millis(150),
                text: "10.1.1.1  1  FULL/PTOP\r\n".into(),
            },
        );
        let mut shell = shell_for(script).await;
        let mut buffer = TranscriptBuffer::default();

        drain(&mut shell, &mut buffer, &fast(), None, None).await.unwrap();
        buffer.clear();

        shell.send(b"sh ip ospf ne\n").await.unwrap();
        let completion = drain(&mut shell, &mut buffer, &fast(), None, Some("sh ip ospf ne"))
            .await
            .unwrap();

        assert_eq!(completion, Completion::Quiet);
        let text = buffer.take_text();
        assert!(text.starts_with("sh ip ospf ne"));
        assert!(text.contains("FULL/PTOP"));
    }

    #[test]
    fn test_past_echo() {
        assert!(!past_echo(b"", Some("show x")));
        assert!(!past_echo(b"sho", Some("show x")));
        assert!(!past_echo(b"show x\r\n", Some("show x")));
        assert!(past_echo(b"show x\r\nR1#", Some("show x")));
        assert!(past_echo(b"\r\nshow x\r\nvalue: 1", Some("show x")));
        assert!(past_echo(b"value: 1", Some("show x")));
        assert!(past_echo(b"Welcome", None));
    }

    #[test]
    fn test_settle_deserializes_millis() {
        let settle: SettleTime =
            serde_json::from_str(r#"{"window": 3000, "mode": "fixed_delay"}"#).unwrap();
        assert_eq!(settle.window, Duration::from_secs(3));
        assert_eq!(settle.quiet, Duration::from_millis(500));
        assert_eq!(settle.mode, SettleMode::FixedDelay);
    }
}
