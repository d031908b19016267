//! Agentpack - Tiered chatbot package loader
//!
//! Resolves agent packages by id through an in-memory cache, a
//! checksum-gated disk cache and remote object storage, with built-in
//! packages served from a static registry.

pub mod cache;
pub mod checksum;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod fakes;
pub mod loader;
pub mod package;
pub mod resolver;
pub mod ui;

pub use error::{PackError, PackResult};
pub use loader::{PackageLoader, PreloadSummary};
pub use resolver::{PackageResolver, PackageSource};
