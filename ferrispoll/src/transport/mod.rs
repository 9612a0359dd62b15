//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level connection management: opening the
//! TCP/SSH connection, password login, and the interactive PTY shell the
//! session drives. The [`Connector`] and [`Shell`] traits are the seam the
//! session is written against, so the state machine can run over any
//! byte-oriented interactive terminal.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;
use std::time::Duration;

pub use config::{Endpoint, HostKeyVerification, SshSettings};
pub use ssh::{SshConnector, SshShell};

use crate::error::Result;

/// An open, authenticated interactive terminal.
pub trait Shell: Send {
    /// Write raw bytes to the terminal.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `wait` for the next chunk of output.
    ///
    /// Returns `Ok(None)` when nothing arrived in time and an error when the
    /// channel is gone.
    fn read_chunk(&mut self, wait: Duration)
    -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Close the terminal and the underlying connection.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens authenticated shells.
pub trait Connector: Send + Sync {
    /// Shell type produced by this connector.
    type Shell: Shell;

    /// Connect, log in with a password and open a PTY shell.
    fn open(&self, endpoint: &Endpoint) -> impl Future<Output = Result<Self::Shell>> + Send;
}
