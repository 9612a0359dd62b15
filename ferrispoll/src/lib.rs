//! # Ferrispoll
//!
//! Async SSH CLI telemetry poller for network device fleets.
//!
//! Ferrispoll logs into devices that only offer an interactive command line,
//! runs a per-family set of show commands, and turns the free-text output
//! into typed records handed to a reading sink.
//!
//! ## Features
//!
//! - Async SSH connections via russh, password login, PTY shell
//! - Interactive session state machine with quiescence-based response completion
//! - ANSI escape stripping of device output
//! - Declarative field extraction plus OSPF, BGP and optical module parsers
//! - Bounded-concurrency fleet polling with per-device isolation
//! - Device families and inventories loadable from JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ferrispoll::{FamilyRegistry, FleetPoller, MemorySink, PollerConfig, config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferrispoll::Error> {
//!     let inventory = config::load_inventory("inventory.json")?;
//!     let poller = FleetPoller::over_ssh(
//!         FamilyRegistry::with_builtin()?,
//!         Arc::new(MemorySink::new()),
//!         PollerConfig::default(),
//!     );
//!
//!     let report = poller.poll_cycle(&inventory).await?;
//!     println!("{}", report.to_document());
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod inventory;
pub mod parse;
pub mod platform;
pub mod poll;
pub mod session;
pub mod sink;
pub mod transport;

// Re-export main types for convenience
pub use config::PollerConfig;
pub use error::{Error, ErrorKind};
pub use inventory::{
    Credential, Device, DeviceTarget, Inventory, MonitoredInterface, StaticInventory,
};
pub use parse::{FieldExtractor, FieldRule, FieldType, FieldValue, OutputParser, ParsedRecord};
pub use platform::{CommandCatalog, CommandSpec, DeviceFamily, FamilyRegistry};
pub use poll::{CycleReport, DeviceOutcome, FleetPoller, PollResult};
pub use session::{InteractiveSession, SessionState};
pub use sink::{JsonLinesSink, MemorySink, Reading, ReadingSink};
pub use transport::{SshConnector, SshSettings};
