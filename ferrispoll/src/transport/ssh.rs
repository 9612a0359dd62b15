//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{Endpoint, HostKeyVerification, SshSettings};
use super::{Connector, Shell};
use crate::error::{ChannelError, Result, TransportError};

/// Opens password-authenticated PTY shells over russh.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    settings: SshSettings,
}

impl SshConnector {
    /// Create a connector with the given settings.
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }

    /// Connect to the SSH server.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Handle<SshHandler>> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(self.settings.timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: endpoint.host.clone(),
            port: endpoint.port,
            host_key_verification: self.settings.host_key_verification.clone(),
            known_hosts_path: self.settings.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let session = tokio::time::timeout(
            self.settings.timeout,
            client::connect(ssh_config, (endpoint.host.as_str(), endpoint.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.settings.timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key error over russh's generic one
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    source,
                },
                (None, e) => TransportError::Ssh(e),
            }
        })?;

        Ok(session)
    }

    /// Authenticate with the server using the endpoint's password.
    async fn authenticate(
        &self,
        session: &mut Handle<SshHandler>,
        endpoint: &Endpoint,
    ) -> Result<()> {
        let result = tokio::time::timeout(
            self.settings.timeout,
            session.authenticate_password(
                endpoint.username.as_str(),
                endpoint.password.expose_secret(),
            ),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.settings.timeout))?
        .map_err(TransportError::Ssh)?;

        if !result.success() {
            return Err(TransportError::AuthenticationFailed {
                user: endpoint.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Open a new PTY channel with a shell on this connection.
    async fn open_channel(&self, session: &Handle<SshHandler>) -> Result<Channel<Msg>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| ChannelError::OpenFailed(e.to_string()))?;

        channel
            .request_pty(
                true,
                "xterm",
                self.settings.terminal_width,
                self.settings.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(ChannelError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(ChannelError::Ssh)?;

        Ok(channel)
    }
}

impl Connector for SshConnector {
    type Shell = SshShell;

    async fn open(&self, endpoint: &Endpoint) -> Result<SshShell> {
        debug!("connecting to {}", endpoint.socket_addr());
        let mut session = self.connect(endpoint).await?;

        self.authenticate(&mut session, endpoint).await?;
        debug!("authenticated to {} as {}", endpoint.host, endpoint.username);

        let channel = self.open_channel(&session).await?;
        Ok(SshShell { session, channel })
    }
}

/// An interactive PTY shell on an authenticated russh session.
pub struct SshShell {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The PTY channel running the device CLI.
    channel: Channel<Msg>,
}

impl Shell for SshShell {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel.data(data).await.map_err(ChannelError::Ssh)?;
        Ok(())
    }

    async fn read_chunk(&mut self, wait: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = tokio::time::Instant::now() + wait;

        loop {
            let msg = match tokio::time::timeout_at(deadline, self.channel.wait()).await {
                Ok(msg) => msg,
                Err(_) => return Ok(None),
            };

            match msg {
                Some(ChannelMsg::Data { data }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::ExtendedData { data, .. }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => {
                    trace!("ignoring channel message: {:?}", other);
                }
            }
        }
    }

    async fn close(self) -> Result<()> {
        if let Err(e) = self.channel.eof().await {
            debug!("channel eof failed: {}", e);
        }
        if let Err(e) = self.channel.close().await {
            debug!("channel close failed: {}", e);
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
