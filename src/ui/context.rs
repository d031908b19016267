//! Terminal detection for CLI output

use console::Term;

/// Environment variables set by common CI systems
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Decides between decorated output (symbols, progress bars) and plain
/// line-oriented output for pipes and CI logs
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    fancy: bool,
}

impl UiContext {
    pub fn detect() -> Self {
        let on_ci = CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self {
            fancy: Term::stdout().is_term() && !on_ci,
        }
    }

    pub fn plain() -> Self {
        Self { fancy: false }
    }

    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }
}
