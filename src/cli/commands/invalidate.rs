//! Invalidate command - drop a package from the local caches

use crate::cli::args::InvalidateArgs;
use crate::config::Config;
use crate::error::PackResult;
use crate::package::validate_package_id;
use crate::resolver::PackageResolver;
use crate::ui::{self, UiContext};

/// Execute the invalidate command
pub async fn execute(args: InvalidateArgs, config: &Config) -> PackResult<()> {
    validate_package_id(&args.id)?;

    let resolver = PackageResolver::from_config(config)?;
    resolver.loader().invalidate_package(&args.id).await;

    ui::step_ok(&UiContext::detect(), &format!("Invalidated {}", args.id));
    Ok(())
}
