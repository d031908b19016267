//! Package factories
//!
//! Bundles carry a `kind` tag. Each tag maps to a registered factory that
//! instantiates the package, so new package runtimes plug in without the
//! loader knowing about them.

use crate::error::{PackError, PackResult};
use crate::package::{DeclarativePackage, Package, PackageDefinition, SharedPackage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Builds packages of one kind from parsed bundles
pub trait PackageFactory: Send + Sync {
    /// The `kind` tag this factory handles
    fn kind(&self) -> &'static str;

    /// Instantiate a package from its definition
    fn instantiate(&self, id: &str, definition: PackageDefinition) -> PackResult<SharedPackage>;
}

/// Factory for `"declarative"` bundles
#[derive(Debug, Default)]
pub struct DeclarativeFactory;

impl PackageFactory for DeclarativeFactory {
    fn kind(&self) -> &'static str {
        "declarative"
    }

    fn instantiate(&self, _id: &str, definition: PackageDefinition) -> PackResult<SharedPackage> {
        Ok(Arc::new(DeclarativePackage::new(definition)))
    }
}

/// Registry of package factories keyed by kind
#[derive(Clone)]
pub struct FactoryRegistry {
    factories: HashMap<&'static str, Arc<dyn PackageFactory>>,
}

impl FactoryRegistry {
    /// Empty registry
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with all built-in factories
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(DeclarativeFactory));
        registry
    }

    /// Register a factory, replacing any previous one for the same kind
    pub fn register(&mut self, factory: Arc<dyn PackageFactory>) {
        debug!("Registered package factory: {}", factory.kind());
        self.factories.insert(factory.kind(), factory);
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Parse, instantiate and verify a package from bundle source
    pub fn build(&self, id: &str, source: &str) -> PackResult<SharedPackage> {
        let definition = PackageDefinition::parse(id, source)?;
        self.instantiate(id, definition)
    }

    /// Instantiate and verify a package from a parsed definition
    pub fn instantiate(&self, id: &str, definition: PackageDefinition) -> PackResult<SharedPackage> {
        let factory = self
            .factories
            .get(definition.kind.as_str())
            .ok_or_else(|| PackError::UnknownPackageKind(definition.kind.clone()))?;

        let package = factory.instantiate(id, definition)?;
        verify_package(id, package.as_ref())?;
        Ok(package)
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Check that a package exposes a usable capability surface.
fn verify_package(id: &str, package: &dyn Package) -> PackResult<()> {
    let info = package.metadata();

    if info.name.trim().is_empty() {
        return Err(PackError::invalid_bundle(id, "package name is empty"));
    }
    if package.agents().is_empty() {
        return Err(PackError::invalid_bundle(id, "package declares no agents"));
    }

    let mut seen = HashSet::new();
    for agent in package.agents() {
        if agent.id.trim().is_empty() {
            return Err(PackError::invalid_bundle(id, "agent with empty id"));
        }
        if !seen.insert(agent.id.as_str()) {
            return Err(PackError::invalid_bundle(
                id,
                format!("duplicate agent id '{}'", agent.id),
            ));
        }
    }

    let tools: HashSet<&str> = package.tools().iter().map(|t| t.name.as_str()).collect();
    for agent in package.agents() {
        if let Some(missing) = agent.tools.iter().find(|t| !tools.contains(t.as_str())) {
            return Err(PackError::invalid_bundle(
                id,
                format!("agent '{}' references undeclared tool '{}'", agent.id, missing),
            ));
        }
    }

    Ok(())
}
