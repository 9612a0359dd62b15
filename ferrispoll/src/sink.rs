//! Reading sinks.
//!
//! A sink persists one [`Reading`] per (device, interface, parameter,
//! timestamp). Writes are independent: a failed write is reported to the
//! caller and never affects other writes in the same cycle.

use std::future::Future;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::trace;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{Result, SinkError};
use crate::parse::ParsedRecord;

/// One stored reading.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub device_id: String,

    /// Device hostname.
    pub device: String,

    /// Owning interface for interface-scoped parameters; never set for
    /// device-scoped ones.
    pub interface: Option<String>,

    pub parameter: String,

    /// Structured values.
    #[serde(rename = "data")]
    pub record: ParsedRecord,

    /// Verbatim transcript.
    pub raw_output: String,

    pub taken_at: DateTime<Utc>,
}

/// Destination for readings.
pub trait ReadingSink: Send + Sync {
    /// Persist one reading.
    fn write(&self, reading: &Reading) -> impl Future<Output = Result<()>> + Send;
}

/// Keeps readings in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    readings: Mutex<Vec<Reading>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn readings(&self) -> Vec<Reading> {
        match self.readings.lock() {
            Ok(readings) => readings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ReadingSink for MemorySink {
    async fn write(&self, reading: &Reading) -> Result<()> {
        let mut readings = self.readings.lock().map_err(|_| SinkError::Rejected {
            message: "memory sink lock poisoned".into(),
        })?;
        readings.push(reading.clone());
        Ok(())
    }
}

/// Appends readings as JSON lines.
#[derive(Debug)]
pub struct JsonLinesSink {
    file: tokio::sync::Mutex<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(SinkError::Io)?;
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
        })
    }
}

impl ReadingSink for JsonLinesSink {
    async fn write(&self, reading: &Reading) -> Result<()> {
        let mut line = serde_json::to_vec(reading).map_err(SinkError::Encode)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await.map_err(SinkError::Io)?;
        file.flush().await.map_err(SinkError::Io)?;
        trace!(
            "sink: {} {} {:?}",
            reading.device_id, reading.parameter, reading.interface
        );
        Ok(())
    }
}
