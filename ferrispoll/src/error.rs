//! Error types for ferrispoll.

use std::io;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Main error type for ferrispoll operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel read/write errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Interactive session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key did not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (PTY shell I/O).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open the session channel
    #[error("Failed to open channel: {0}")]
    OpenFailed(String),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Interactive session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No output arrived before the settle window ran out
    #[error("No output for '{command}' within {window:?}")]
    CommandTimeout { command: String, window: Duration },

    /// Operation is not valid in the current session state
    #[error("Session is {state}, expected {expected}")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Device family is not known to the catalog
    #[error("Unknown device family '{name}'")]
    UnknownFamily { name: String },

    /// Family name registered twice
    #[error("Device family '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// Invalid regex in a family or rule definition
    #[error("Invalid pattern for '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be decoded
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Inventory lookup failed
    #[error("Inventory error: {message}")]
    Inventory { message: String },
}

/// Reading sink errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Record could not be encoded
    #[error("Failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),

    /// Underlying storage failed
    #[error("Failed to write reading: {0}")]
    Io(#[from] io::Error),

    /// Storage rejected the write
    #[error("Sink rejected reading: {message}")]
    Rejected { message: String },
}

/// Failure classification reported in poll results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Unreachable host or connect/read timeout.
    ConnectionError,
    /// Credentials rejected.
    AuthenticationError,
    /// Unexpected channel or SSH behavior.
    ProtocolError,
    /// No output observed within the settle window.
    CommandTimeoutError,
    /// Extraction produced only absent values.
    ParseError,
    /// Persistence failure.
    SinkWriteError,
    /// Unknown family or unreadable configuration.
    ConfigurationError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::ConnectionError => "ConnectionError",
            ErrorKind::AuthenticationError => "AuthenticationError",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::CommandTimeoutError => "CommandTimeoutError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::SinkWriteError => "SinkWriteError",
            ErrorKind::ConfigurationError => "ConfigurationError",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Classify this error for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(e) => match e {
                TransportError::ConnectionFailed { .. } | TransportError::Timeout(_) => {
                    ErrorKind::ConnectionError
                }
                TransportError::Ssh(russh::Error::IO(_)) => ErrorKind::ConnectionError,
                TransportError::AuthenticationFailed { .. } => ErrorKind::AuthenticationError,
                TransportError::Ssh(_)
                | TransportError::HostKeyChanged { .. }
                | TransportError::HostKeyUnknown { .. }
                | TransportError::KnownHosts(_) => ErrorKind::ProtocolError,
            },
            Error::Channel(_) => ErrorKind::ProtocolError,
            Error::Session(SessionError::CommandTimeout { .. }) => ErrorKind::CommandTimeoutError,
            Error::Session(SessionError::InvalidState { .. }) => ErrorKind::ProtocolError,
            Error::Config(_) => ErrorKind::ConfigurationError,
            Error::Sink(_) => ErrorKind::SinkWriteError,
        }
    }

    /// Whether the session survives this error.
    ///
    /// Only command timeouts leave the shell usable for the next command.
    pub fn is_command_local(&self) -> bool {
        matches!(self, Error::Session(SessionError::CommandTimeout { .. }))
    }
}

/// Result type alias using ferrispoll's Error.
pub type Result<T> = std::result::Result<T, Error>;
