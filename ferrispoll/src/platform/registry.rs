//! Registry of device families.

use std::collections::HashMap;
use std::sync::Arc;

use super::CommandCatalog;
use super::definition::{CompiledFamily, DeviceFamily};
use super::vendors;
use crate::error::{ConfigError, Result};

/// Compiled device families by name.
///
/// A registry is built once per cycle and shared read-only by every worker.
#[derive(Debug, Default, Clone)]
pub struct FamilyRegistry {
    families: HashMap<String, Arc<CompiledFamily>>,
}

impl FamilyRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            families: HashMap::new(),
        }
    }

    /// Create a registry with the built-in families.
    pub fn with_builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(vendors::tejas::family())?;
        Ok(registry)
    }

    /// Register a family definition.
    pub fn register(&mut self, family: DeviceFamily) -> Result<()> {
        if self.contains(&family.name) {
            return Err(ConfigError::AlreadyRegistered {
                name: family.name.clone(),
            }
            .into());
        }
        let compiled = family.compile()?;
        self.families.insert(family.name, Arc::new(compiled));
        Ok(())
    }

    /// Register or replace a family definition.
    pub fn replace(&mut self, family: DeviceFamily) -> Result<()> {
        let compiled = family.compile()?;
        self.families.insert(family.name, Arc::new(compiled));
        Ok(())
    }

    /// Get a family by name.
    pub fn get(&self, name: &str) -> Option<&Arc<CompiledFamily>> {
        self.families.get(name)
    }

    /// Check if a family is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }
}

impl CommandCatalog for FamilyRegistry {
    fn family(&self, name: &str) -> Result<Arc<CompiledFamily>> {
        self.get(name).cloned().ok_or_else(|| {
            ConfigError::UnknownFamily {
                name: name.to_string(),
            }
            .into()
        })
    }
}
