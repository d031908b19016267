//! Agent packages
//!
//! A package is a bundle of agent and tool definitions identified by an
//! opaque id. Bundles are JSON documents tagged with a `kind`; the
//! [`FactoryRegistry`] turns a parsed bundle into a ready-to-run
//! [`Package`] trait object that callers share immutably.

pub mod builtin;
pub mod factory;

pub use builtin::StaticRegistry;
pub use factory::{DeclarativeFactory, FactoryRegistry, PackageFactory};

use crate::error::{PackError, PackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a loaded package
pub type SharedPackage = Arc<dyn Package>;

/// Capability surface every loaded package exposes
pub trait Package: Send + Sync + fmt::Debug {
    /// Identity and shape of the package
    fn metadata(&self) -> PackageInfo;

    /// Look up an agent by id
    fn agent(&self, id: &str) -> Option<&AgentDefinition>;

    /// All agents, in bundle order
    fn agents(&self) -> &[AgentDefinition];

    /// All tools the package declares
    fn tools(&self) -> &[ToolDefinition];
}

/// Kind of conversational agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Chat,
    Voice,
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Voice => write!(f, "voice"),
        }
    }
}

/// An agent declared by a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Agent id, unique within the package
    pub id: String,

    /// Display name
    pub name: String,

    /// Chat or voice
    #[serde(rename = "type")]
    pub agent_type: AgentType,

    /// System instructions
    #[serde(default)]
    pub instructions: String,

    /// Names of tools this agent may call
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A tool declared by a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name referenced by agents
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// JSON schema for the tool arguments
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// Parsed bundle document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDefinition {
    /// Factory tag, e.g. "declarative"
    pub kind: String,

    /// Package name
    pub name: String,

    /// Package version
    pub version: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Agents in the package
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,

    /// Tools in the package
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

impl PackageDefinition {
    /// Parse bundle source code
    pub fn parse(id: &str, source: &str) -> PackResult<Self> {
        serde_json::from_str(source)
            .map_err(|e| PackError::invalid_bundle(id, format!("malformed bundle: {}", e)))
    }
}

/// What `Package::metadata` reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub kind: String,
    pub agent_count: usize,
    pub agent_types: BTreeSet<AgentType>,
    pub tool_count: usize,
}

/// Package built directly from its bundle definition
#[derive(Debug, Clone)]
pub struct DeclarativePackage {
    definition: PackageDefinition,
}

impl DeclarativePackage {
    pub fn new(definition: PackageDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &PackageDefinition {
        &self.definition
    }
}

impl Package for DeclarativePackage {
    fn metadata(&self) -> PackageInfo {
        PackageInfo {
            name: self.definition.name.clone(),
            version: self.definition.version.clone(),
            kind: self.definition.kind.clone(),
            agent_count: self.definition.agents.len(),
            agent_types: self.definition.agents.iter().map(|a| a.agent_type).collect(),
            tool_count: self.definition.tools.len(),
        }
    }

    fn agent(&self, id: &str) -> Option<&AgentDefinition> {
        self.definition.agents.iter().find(|a| a.id == id)
    }

    fn agents(&self) -> &[AgentDefinition] {
        &self.definition.agents
    }

    fn tools(&self) -> &[ToolDefinition] {
        &self.definition.tools
    }
}

/// Validate that a package id is safe to use as a file name.
pub fn validate_package_id(id: &str) -> PackResult<()> {
    let invalid = |reason: &str| PackError::InvalidPackageId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if id.len() > 128 {
        return Err(invalid("must be at most 128 characters"));
    }
    if id.contains("..") || id.starts_with('.') {
        return Err(invalid("must not start with '.' or contain '..'"));
    }
    // manifest.json lives alongside bundle files
    if id == "manifest" {
        return Err(invalid("'manifest' is reserved"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(invalid(
            "must contain only alphanumeric characters, '-', '_' or '.'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "kind": "declarative",
        "name": "billing-support",
        "version": "2.1.0",
        "agents": [
            {"id": "triage", "name": "Triage", "type": "chat", "tools": ["lookup_invoice"]},
            {"id": "phone", "name": "Phone line", "type": "voice"}
        ],
        "tools": [
            {"name": "lookup_invoice", "description": "Find an invoice", "parameters": {"type": "object"}}
        ]
    }"#;

    #[test]
    fn parse_bundle() {
        let def = PackageDefinition::parse("billing", BUNDLE).unwrap();
        assert_eq!(def.kind, "declarative");
        assert_eq!(def.agents.len(), 2);
        assert_eq!(def.agents[1].agent_type, AgentType::Voice);
        assert!(def.agents[1].tools.is_empty());
    }

    #[test]
    fn parse_malformed_bundle() {
        let err = PackageDefinition::parse("billing", "module.exports = {}").unwrap_err();
        assert!(matches!(err, PackError::InvalidBundle { .. }));
    }

    #[test]
    fn declarative_metadata() {
        let pkg = DeclarativePackage::new(PackageDefinition::parse("billing", BUNDLE).unwrap());
        let info = pkg.metadata();

        assert_eq!(info.name, "billing-support");
        assert_eq!(info.agent_count, 2);
        assert_eq!(info.tool_count, 1);
        assert!(info.agent_types.contains(&AgentType::Chat));
        assert!(info.agent_types.contains(&AgentType::Voice));
        assert_eq!(pkg.agent("triage").unwrap().name, "Triage");
        assert!(pkg.agent("missing").is_none());
    }

    #[test]
    fn package_id_validation() {
        assert!(validate_package_id("acme-support_v2.1").is_ok());
        assert!(validate_package_id("").is_err());
        assert!(validate_package_id("../etc/passwd").is_err());
        assert!(validate_package_id("a/b").is_err());
        assert!(validate_package_id(".hidden").is_err());
        assert!(validate_package_id("manifest").is_err());
        assert!(validate_package_id(&"x".repeat(129)).is_err());
    }
}
