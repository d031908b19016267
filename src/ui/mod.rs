//! Terminal output for the CLI
//!
//! Decorated output with symbols and progress bars on a terminal, plain
//! `[OK]`/`[FAIL]` lines in pipes and CI.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    key_value, section, step_error, step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{LoadProgress, TaskSpinner};
