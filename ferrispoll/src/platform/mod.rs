//! Device family catalog.
//!
//! A [`DeviceFamily`] supplies everything vendor-specific: the terminal
//! bootstrap sequence, teardown, failure markers and the set of
//! [`CommandSpec`]s with their parsers. Families are compiled once and looked
//! up by name through a [`CommandCatalog`].

mod command;
mod definition;
mod registry;
pub mod vendors;

pub use command::{CommandScope, CommandSpec, CompiledCommand, INTERFACE_PLACEHOLDER, ParserSpec};
pub use definition::{CompiledFamily, DeviceFamily};
pub use registry::FamilyRegistry;

use std::sync::Arc;

use crate::error::Result;

/// Source of command sets per device family.
pub trait CommandCatalog: Send + Sync {
    /// Look up a compiled family, failing with a configuration error if unknown.
    fn family(&self, name: &str) -> Result<Arc<CompiledFamily>>;
}
