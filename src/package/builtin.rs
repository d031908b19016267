//! Built-in packages
//!
//! Packages that ship with the product are compiled into the binary via
//! `include_str!` and instantiated once, so resolving them never touches
//! a cache tier or the network.

use crate::error::PackResult;
use crate::package::{FactoryRegistry, SharedPackage};
use std::collections::HashMap;

// Built-in bundles embedded at compile time
const BUILTIN_SUPPORT_ASSISTANT: &str = include_str!("../../bundles/support-assistant.json");
const BUILTIN_VOICE_RECEPTIONIST: &str = include_str!("../../bundles/voice-receptionist.json");

/// Ids and sources of every built-in bundle
const BUILTINS: &[(&str, &str)] = &[
    ("support-assistant", BUILTIN_SUPPORT_ASSISTANT),
    ("voice-receptionist", BUILTIN_VOICE_RECEPTIONIST),
];

/// Fixed table of already-instantiated packages
#[derive(Clone, Default)]
pub struct StaticRegistry {
    packages: HashMap<String, SharedPackage>,
}

impl StaticRegistry {
    /// Registry with no packages
    pub fn empty() -> Self {
        Self::default()
    }

    /// Instantiate all built-in bundles
    pub fn builtin(factories: &FactoryRegistry) -> PackResult<Self> {
        let mut registry = Self::empty();
        for (id, source) in BUILTINS {
            let package = factories.build(id, source)?;
            registry.insert(*id, package);
        }
        Ok(registry)
    }

    /// Add or replace a package
    pub fn insert(&mut self, id: impl Into<String>, package: SharedPackage) {
        self.packages.insert(id.into(), package);
    }

    /// O(1) lookup, no I/O
    pub fn get(&self, id: &str) -> Option<SharedPackage> {
        self.packages.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.packages.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.packages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
