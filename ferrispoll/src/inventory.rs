//! Device inventory.
//!
//! The inventory is an external collaborator: per cycle it supplies the
//! active devices with their resolved credentials and monitored interfaces.
//! [`StaticInventory`] is an in-memory snapshot, usually loaded from JSON.

use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::transport::Endpoint;

fn default_port() -> u16 {
    22
}

fn enabled() -> bool {
    true
}

fn secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// A polled device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    /// Inventory identity, used as the sink key.
    pub id: String,

    pub hostname: String,

    /// Management address.
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Device family name in the command catalog.
    pub family: String,

    #[serde(default = "enabled")]
    pub active: bool,
}

/// An interface on a device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitoredInterface {
    /// Device-local identifier substituted into command templates.
    pub interface: String,

    /// Human label.
    #[serde(default)]
    pub label: String,

    #[serde(default = "enabled")]
    pub monitored: bool,
}

impl MonitoredInterface {
    pub fn new(interface: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            label: label.into(),
            monitored: true,
        }
    }
}

/// Resolved login credential.
#[derive(Debug, Deserialize)]
pub struct Credential {
    pub username: String,

    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.username.clone(), self.password.expose_secret())
    }
}

/// Everything needed to poll one device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceTarget {
    #[serde(flatten)]
    pub device: Device,

    pub credential: Credential,

    #[serde(default)]
    pub interfaces: Vec<MonitoredInterface>,
}

impl DeviceTarget {
    pub fn new(device: Device, credential: Credential) -> Self {
        Self {
            device,
            credential,
            interfaces: vec![],
        }
    }

    /// Add an interface.
    pub fn with_interface(mut self, interface: MonitoredInterface) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Interfaces flagged as monitored, in inventory order.
    pub fn monitored_interfaces(&self) -> impl Iterator<Item = &MonitoredInterface> {
        self.interfaces.iter().filter(|i| i.monitored)
    }

    /// SSH endpoint for this device.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.device.address.clone(),
            port: self.device.port,
            username: self.credential.username.clone(),
            password: SecretString::from(self.credential.password.expose_secret().to_string()),
        }
    }
}

/// Source of devices to poll.
pub trait Inventory: Send + Sync {
    /// Active devices for this cycle.
    fn targets(&self) -> impl Future<Output = Result<Vec<DeviceTarget>>> + Send;

    /// One active device by id.
    fn target(&self, id: &str) -> impl Future<Output = Result<Option<DeviceTarget>>> + Send {
        async move {
            Ok(self
                .targets()
                .await?
                .into_iter()
                .find(|t| t.device.id == id))
        }
    }
}

/// In-memory inventory snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticInventory {
    devices: Vec<DeviceTarget>,
}

impl StaticInventory {
    pub fn new(devices: Vec<DeviceTarget>) -> Self {
        Self { devices }
    }

    /// All devices, including inactive ones.
    pub fn devices(&self) -> &[DeviceTarget] {
        &self.devices
    }
}

impl Inventory for StaticInventory {
    async fn targets(&self) -> Result<Vec<DeviceTarget>> {
        Ok(self
            .devices
            .iter()
            .filter(|t| t.device.active)
            .cloned()
            .collect())
    }
}
