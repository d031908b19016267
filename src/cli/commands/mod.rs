//! CLI command implementations

pub mod builtins;
pub mod cache;
pub mod config;
pub mod invalidate;
pub mod preload;
pub mod resolve;

pub use builtins::execute as builtins;
pub use cache::execute as cache;
pub use config::execute as config;
pub use invalidate::execute as invalidate;
pub use preload::execute as preload;
pub use resolve::execute as resolve;
