//! Scripted in-memory connector used by the session, orchestrator and
//! fleet tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use super::{Connector, Endpoint, Shell};
use crate::error::{ChannelError, Result, TransportError};

/// What a scripted device does when a line is sent to it.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Emit the text after the given delay, then the prompt.
    Output { after: Duration, text: String },
    /// Emit the text in several chunks spaced `gap` apart, then the prompt.
    Chunked { gap: Duration, parts: Vec<String> },
    /// Echo nothing at all.
    Silent,
    /// Drop the channel.
    Hangup,
}

impl Reply {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Reply::Output {
            after: Duration::from_millis(5),
            text: text.into(),
        }
    }
}

/// How a scripted host behaves on connect.
#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    /// Connection refused after the given delay.
    Unreachable(Duration),
    /// Password rejected.
    RejectAuth,
    /// Login succeeds and commands are answered from the script.
    Device(Script),
}

/// Per-host command script.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub(crate) banner: String,
    pub(crate) prompt: String,
    pub(crate) replies: HashMap<String, Reply>,
    pub(crate) echo: bool,
    pub(crate) fail_close: bool,
}

impl Script {
    pub(crate) fn new(prompt: impl Into<String>) -> Self {
        Self {
            banner: "Welcome\r\n".to_string(),
            prompt: prompt.into(),
            replies: HashMap::new(),
            echo: true,
            fail_close: false,
        }
    }

    pub(crate) fn reply(mut self, command: impl Into<String>, reply: Reply) -> Self {
        self.replies.insert(command.into(), reply);
        self
    }

    pub(crate) fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

/// Everything sent to a host, in order.
pub(crate) type SentLog = Arc<Mutex<Vec<String>>>;

/// Connector that answers from per-host scripts.
#[derive(Debug, Default, Clone)]
pub(crate) struct MockConnector {
    hosts: HashMap<String, Behavior>,
    logs: Arc<Mutex<HashMap<String, SentLog>>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn host(mut self, host: impl Into<String>, behavior: Behavior) -> Self {
        self.hosts.insert(host.into(), behavior);
        self
    }

    /// Lines sent to `host` so far.
    pub(crate) fn sent(&self, host: &str) -> Vec<String> {
        self.logs
            .lock()
            .unwrap()
            .get(host)
            .map(|log| log.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

impl Connector for MockConnector {
    type Shell = MockShell;

    async fn open(&self, endpoint: &Endpoint) -> Result<MockShell> {
        match self.hosts.get(&endpoint.host).cloned() {
            None => Err(TransportError::ConnectionFailed {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "no route"),
            }
            .into()),
            Some(Behavior::Unreachable(delay)) => {
                tokio::time::sleep(delay).await;
                Err(TransportError::Timeout(delay).into())
            }
            Some(Behavior::RejectAuth) => Err(TransportError::AuthenticationFailed {
                user: endpoint.username.clone(),
            }
            .into()),
            Some(Behavior::Device(script)) => {
                let log = SentLog::default();
                self.logs
                    .lock()
                    .unwrap()
                    .insert(endpoint.host.clone(), log.clone());
                let banner = format!("{}{}", script.banner, script.prompt);
                let mut shell = MockShell {
                    script,
                    pending: VecDeque::new(),
                    log,
                    hung_up: false,
                };
                shell.schedule(Duration::from_millis(2), banner);
                Ok(shell)
            }
        }
    }
}

/// Scripted shell.
pub(crate) struct MockShell {
    script: Script,
    /// Output chunks with the instant they become readable.
    pending: VecDeque<(Instant, Vec<u8>)>,
    log: SentLog,
    hung_up: bool,
}

impl MockShell {
    /// Queue `text` to become readable `delay` after the previous chunk.
    fn schedule(&mut self, delay: Duration, text: String) {
        let now = Instant::now();
        let base = self
            .pending
            .back()
            .map(|(at, _)| (*at).max(now))
            .unwrap_or(now);
        self.pending.push_back((base + delay, text.into_bytes()));
    }
}

impl Shell for MockShell {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.hung_up {
            return Err(ChannelError::Closed.into());
        }

        let line = String::from_utf8_lossy(data).trim_end().to_string();
        self.log.lock().unwrap().push(line.clone());

        let echo = if self.script.echo {
            format!("{}\r\n", line)
        } else {
            String::new()
        };
        let prompt = self.script.prompt.clone();

        match self.script.replies.get(&line).cloned() {
            Some(Reply::Output { after, text }) => {
                self.schedule(Duration::ZERO, echo);
                self.schedule(after, format!("{}{}", text, prompt));
            }
            Some(Reply::Chunked { gap, parts }) => {
                self.schedule(Duration::ZERO, echo);
                for part in parts {
                    self.schedule(gap, part);
                }
                self.schedule(gap, prompt);
            }
            Some(Reply::Silent) => {}
            Some(Reply::Hangup) => self.hung_up = true,
            None => self.schedule(Duration::ZERO, format!("{}{}", echo, prompt)),
        }
        Ok(())
    }

    async fn read_chunk(&mut self, wait: Duration) -> Result<Option<Vec<u8>>> {
        if self.hung_up && self.pending.is_empty() {
            return Err(ChannelError::Closed.into());
        }

        let deadline = Instant::now() + wait;
        match self.pending.front().map(|(at, _)| *at) {
            Some(at) if at <= deadline => {
                tokio::time::sleep_until(at).await;
                Ok(self.pending.pop_front().map(|(_, bytes)| bytes))
            }
            _ => {
                tokio::time::sleep_until(deadline).await;
                Ok(None)
            }
        }
    }

    async fn close(self) -> Result<()> {
        if self.script.fail_close {
            return Err(ChannelError::Closed.into());
        }
        Ok(())
    }
}
