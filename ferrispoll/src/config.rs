//! Poller configuration and file loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ConfigError, Result};
use crate::inventory::StaticInventory;
use crate::platform::{DeviceFamily, FamilyRegistry};
use crate::transport::{HostKeyVerification, SshSettings};

/// Default number of devices polled at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Settings for a [`FleetPoller`](crate::poll::FleetPoller).
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Devices polled at once.
    pub concurrency: usize,

    /// SSH connection settings.
    pub ssh: SshSettings,

    /// Upper bound on one device's whole poll, login included.
    pub device_deadline: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            ssh: SshSettings::default(),
            device_deadline: None,
        }
    }
}

impl PollerConfig {
    /// Start building a configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use ferrispoll::PollerConfig;
    ///
    /// let config = PollerConfig::builder()
    ///     .concurrency(10)
    ///     .timeout(Duration::from_secs(5))
    ///     .device_deadline(Duration::from_secs(60))
    ///     .build();
    /// assert_eq!(config.concurrency, 10);
    /// ```
    pub fn builder() -> PollerConfigBuilder {
        PollerConfigBuilder::default()
    }
}

/// Builder for [`PollerConfig`].
#[derive(Debug, Clone, Default)]
pub struct PollerConfigBuilder {
    config: PollerConfig,
}

impl PollerConfigBuilder {
    /// Set the worker pool size (default: 5).
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the connect and authentication timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.ssh.timeout = timeout;
        self
    }

    /// Bound each device's poll.
    pub fn device_deadline(mut self, deadline: Duration) -> Self {
        self.config.device_deadline = Some(deadline);
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.config.ssh.terminal_width = width;
        self.config.ssh.terminal_height = height;
        self
    }

    /// Set host key verification mode (default: AcceptNew).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.config.ssh.host_key_verification = mode;
        self
    }

    /// Set a custom known_hosts file path.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ssh.known_hosts_path = Some(path.into());
        self
    }

    pub fn build(self) -> PollerConfig {
        self.config
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    families: Vec<DeviceFamily>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&text)
        .map_err(|source| ConfigError::Decode {
            path: display,
            source,
        })
        .map_err(Into::into)
}

/// Load device families from a JSON file on top of the built-in ones.
///
/// A family in the file replaces a built-in family of the same name.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<FamilyRegistry> {
    let file: CatalogFile = read_json(path.as_ref())?;
    let mut registry = FamilyRegistry::with_builtin()?;
    for family in file.families {
        registry.replace(family)?;
    }
    Ok(registry)
}

/// Load a device inventory snapshot from a JSON file.
pub fn load_inventory(path: impl AsRef<Path>) -> Result<StaticInventory> {
    read_json(path.as_ref())
}
