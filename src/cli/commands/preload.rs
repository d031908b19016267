//! Preload command - warm the caches for several packages

use crate::cli::args::PreloadArgs;
use crate::config::Config;
use crate::error::{PackError, PackResult};
use crate::resolver::PackageResolver;
use crate::ui::{self, LoadProgress, UiContext};

/// Execute the preload command
pub async fn execute(args: PreloadArgs, config: &Config) -> PackResult<()> {
    let ctx = UiContext::detect();
    let resolver = PackageResolver::from_config(config)?;

    let progress = LoadProgress::new(&ctx, args.ids.len() as u64);
    let summary = resolver
        .loader()
        .preload_packages_with(&args.ids, |id, ok| progress.on_package(id, ok))
        .await;
    progress.finish();

    // Plain mode already printed a line per package as it finished
    if ctx.use_fancy_output() {
        for id in &summary.succeeded {
            ui::step_ok(&ctx, id);
        }
        for id in &summary.failed {
            ui::step_error(&ctx, id);
        }
    }

    if summary.failed.is_empty() {
        ui::step_ok(&ctx, &format!("Preloaded {} package(s)", summary.succeeded.len()));
        Ok(())
    } else {
        Err(PackError::User(format!(
            "{} of {} package(s) failed to load",
            summary.failed.len(),
            args.ids.len()
        )))
    }
}
