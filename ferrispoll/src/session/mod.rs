//! Interactive session: one authenticated terminal on one device.
//!
//! A session is single-use. It is established once (connect, login, open
//! the shell, discard the banner, run the family's bootstrap commands),
//! then commands are executed strictly one at a time, then it is closed.
//! The terminal has a single prompt and a single output stream, so
//! `execute` takes `&mut self` and there is never more than one command in
//! flight.

mod state;
mod transcript;

pub use state::SessionState;
pub use transcript::Transcript;

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use thiserror::Error;

use crate::channel::{Completion, SettleTime, TranscriptBuffer, drain};
use crate::error::{Error, ErrorKind, Result, SessionError};
use crate::transport::{Connector, Endpoint, Shell};

/// Default pattern for recognizing a trailing prompt line.
pub const DEFAULT_PROMPT_PATTERN: &str = r"[$#>]\s*$";

static DEFAULT_PROMPT_LINE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(DEFAULT_PROMPT_PATTERN).expect("valid prompt pattern"));

/// Terminal behavior a session needs from its device family.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    /// Commands sent once after login, output discarded.
    pub bootstrap: Vec<String>,

    /// Command sent before closing, if any.
    pub exit_command: Option<String>,

    /// Prompt that marks the end of a response, if the family has a reliable one.
    pub prompt: Option<regex::bytes::Regex>,

    /// Pattern for stripping the trailing prompt line from transcripts.
    pub prompt_line: regex::Regex,

    /// Wait for the login banner.
    pub banner_settle: SettleTime,

    /// Wait after each bootstrap command.
    pub bootstrap_settle: SettleTime,

    /// Search depth for prompt detection.
    pub search_depth: usize,
}

impl Default for SessionProfile {
    fn default() -> Self {
        Self {
            bootstrap: Vec::new(),
            exit_command: None,
            prompt: None,
            prompt_line: DEFAULT_PROMPT_LINE.clone(),
            banner_settle: SettleTime::new(Duration::from_secs(1)),
            bootstrap_settle: SettleTime::new(Duration::from_secs(1)),
            search_depth: 1000,
        }
    }
}

/// Session could not be established.
#[derive(Error, Debug)]
#[error("{error} (reached {reached})")]
pub struct SessionFailure {
    /// Furthest state reached before failing.
    pub reached: SessionState,

    /// What went wrong.
    #[source]
    pub error: Error,
}

impl SessionFailure {
    /// Failure classification.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// A single-use interactive session over a [`Shell`].
pub struct InteractiveSession<S: Shell> {
    /// Device host, for logging.
    host: String,

    /// The open shell (None once closed).
    shell: Option<S>,

    /// Current lifecycle state.
    state: SessionState,

    /// Output accumulated for the current command.
    buffer: TranscriptBuffer,

    /// Family terminal behavior.
    profile: SessionProfile,
}

impl<S: Shell> InteractiveSession<S> {
    /// Connect, log in and bootstrap the terminal.
    ///
    /// On success the session is [`SessionState::Ready`]. On failure the
    /// shell (if any) has already been closed.
    pub async fn establish<C>(
        connector: &C,
        endpoint: &Endpoint,
        profile: SessionProfile,
    ) -> std::result::Result<Self, SessionFailure>
    where
        C: Connector<Shell = S>,
    {
        debug!(
            "{}: {} -> {}",
            endpoint.host,
            SessionState::Disconnected,
            SessionState::Authenticating
        );

        let shell = connector.open(endpoint).await.map_err(|error| SessionFailure {
            reached: SessionState::Authenticating,
            error,
        })?;

        let mut session = Self {
            host: endpoint.host.clone(),
            shell: Some(shell),
            state: SessionState::Authenticating,
            buffer: TranscriptBuffer::new(profile.search_depth),
            profile,
        };

        if let Err(error) = session.bootstrap().await {
            session.abort().await;
            return Err(SessionFailure {
                reached: SessionState::Authenticating,
                error,
            });
        }

        session.transition(SessionState::Ready);
        Ok(session)
    }

    /// Discard the banner and run the bootstrap commands.
    async fn bootstrap(&mut self) -> Result<()> {
        let banner_settle = self.profile.banner_settle;
        let completion = self.drain(&banner_settle, None).await?;
        trace!("{}: banner discarded ({:?})", self.host, completion);
        self.buffer.clear();

        let bootstrap_settle = self.profile.bootstrap_settle;
        for command in self.profile.bootstrap.clone() {
            debug!("{}: bootstrap '{}'", self.host, command);
            self.exchange(&command, &bootstrap_settle).await?;
            self.buffer.clear();
        }

        Ok(())
    }

    /// Send a command and collect its response.
    ///
    /// A command that produces no output within its settle window yields
    /// [`SessionError::CommandTimeout`] and leaves the session `Ready`. Any
    /// other error leaves it `Failed`.
    pub async fn execute(&mut self, command: &str, settle: &SettleTime) -> Result<Transcript> {
        if self.state != SessionState::Ready {
            return Err(SessionError::InvalidState {
                state: self.state.name(),
                expected: SessionState::Ready.name(),
            }
            .into());
        }

        self.transition(SessionState::Executing);
        self.buffer.clear();
        let start = Instant::now();

        let completion = match self.exchange(command, settle).await {
            Ok(completion) => completion,
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };

        self.transition(SessionState::Ready);

        if completion == Completion::NoOutput {
            return Err(SessionError::CommandTimeout {
                command: command.to_string(),
                window: settle.window,
            }
            .into());
        }

        let raw = self.buffer.take_text();
        let elapsed = start.elapsed();
        debug!(
            "{}: '{}' -> {} bytes in {:?} ({:?})",
            self.host,
            command,
            raw.len(),
            elapsed,
            completion
        );

        Ok(Transcript::new(
            command,
            raw,
            elapsed,
            completion,
            &self.profile.prompt_line,
        ))
    }

    /// Send the exit command and close the shell.
    ///
    /// Teardown is best-effort: the error is logged and returned so the
    /// caller can record it, but captured data is unaffected.
    pub async fn close(mut self) -> Result<()> {
        self.transition(SessionState::Draining);

        if let Some(exit) = self.profile.exit_command.clone() {
            if let Err(e) = self.send_line(&exit).await {
                debug!("{}: exit command failed: {}", self.host, e);
            }
        }

        let result = match self.shell.take() {
            Some(shell) => shell.close().await,
            None => Ok(()),
        };

        match &result {
            Ok(()) => self.transition(SessionState::Closed),
            Err(e) => {
                warn!("{}: teardown failed: {}", self.host, e);
                self.transition(SessionState::Failed);
            }
        }
        result
    }

    /// Close the shell after a failure, ignoring errors.
    async fn abort(&mut self) {
        self.transition(SessionState::Failed);
        if let Some(shell) = self.shell.take() {
            if let Err(e) = shell.close().await {
                debug!("{}: close after failure: {}", self.host, e);
            }
        }
    }

    /// Get the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get the device host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Discard anything still buffered, send `command` and wait for its response.
    async fn exchange(&mut self, command: &str, settle: &SettleTime) -> Result<Completion> {
        self.discard_pending().await?;
        self.send_line(command).await?;
        self.drain(settle, Some(command)).await
    }

    /// Drop output that arrived after the previous command completed.
    async fn discard_pending(&mut self) -> Result<()> {
        let shell = self.shell.as_mut().ok_or(SessionError::InvalidState {
            state: SessionState::Closed.name(),
            expected: SessionState::Ready.name(),
        })?;

        let mut stale = 0;
        while let Some(chunk) = shell.read_chunk(Duration::ZERO).await? {
            stale += chunk.len();
        }
        if stale > 0 {
            debug!("{}: discarded {} stale bytes", self.host, stale);
        }
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        let shell = self.shell.as_mut().ok_or(SessionError::InvalidState {
            state: SessionState::Closed.name(),
            expected: SessionState::Ready.name(),
        })?;
        shell.send(format!("{}\n", line).as_bytes()).await
    }

    async fn drain(&mut self, settle: &SettleTime, echo: Option<&str>) -> Result<Completion> {
        let shell = self.shell.as_mut().ok_or(SessionError::InvalidState {
            state: SessionState::Closed.name(),
            expected: SessionState::Ready.name(),
        })?;
        drain(
            shell,
            &mut self.buffer,
            settle,
            self.profile.prompt.as_ref(),
            echo,
        )
        .await
    }

    fn transition(&mut self, next: SessionState) {
        trace!("{}: {} -> {}", self.host, self.state, next);
        self.state = next;
    }
}

impl<S: Shell> Drop for InteractiveSession<S> {
    fn drop(&mut self) {
        if self.shell.is_some() {
            warn!("session to {} dropped without close()", self.host);
        }
    }
}
