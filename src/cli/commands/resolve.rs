//! Resolve command - load a package and print its metadata

use crate::cli::args::ResolveArgs;
use crate::config::Config;
use crate::error::{PackError, PackResult};
use crate::loader::LoaderStats;
use crate::package::{AgentDefinition, PackageInfo};
use crate::resolver::{PackageResolver, PackageSource};
use crate::ui::{self, TaskSpinner, UiContext};
use console::style;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveJson<'a> {
    id: &'a str,
    source: PackageSource,
    metadata: PackageInfo,
    agents: &'a [AgentDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<LoaderStats>,
}

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> PackResult<()> {
    let ctx = UiContext::detect();
    let resolver = PackageResolver::from_config(config)?;

    let spinner = (!args.json).then(|| TaskSpinner::start(&ctx, &format!("Resolving {}", args.id)));
    let resolved = resolver.resolve(&args.id).await;
    if let Some(spinner) = spinner {
        spinner.stop();
    }

    let (package, source) = resolved.ok_or_else(|| PackError::PackageNotFound(args.id.clone()))?;
    let stats = args.stats.then(|| resolver.loader().loader_stats());

    if args.json {
        let out = ResolveJson {
            id: &args.id,
            source,
            metadata: package.metadata(),
            agents: package.agents(),
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let info = package.metadata();
    ui::section(&ctx, &format!("{} {}", info.name, info.version));
    ui::key_value(&ctx, "source", &source.to_string());
    ui::key_value(&ctx, "kind", &info.kind);
    ui::key_value(&ctx, "tools", &info.tool_count.to_string());
    println!();

    println!("{:<20} {:<8} {}", style("AGENT").bold(), style("TYPE").bold(), style("NAME").bold());
    for agent in package.agents() {
        println!("{:<20} {:<8} {}", agent.id, agent.agent_type.to_string(), agent.name);
    }

    if let Some(stats) = stats {
        println!();
        print_stats(&ctx, &stats);
    }

    Ok(())
}

fn print_stats(ctx: &UiContext, stats: &LoaderStats) {
    ui::section(ctx, "Loader statistics");
    ui::key_value(ctx, "memory hits", &stats.memory_cache_hits.to_string());
    ui::key_value(ctx, "memory misses", &stats.memory_cache_misses.to_string());
    ui::key_value(ctx, "disk hits", &stats.disk_cache_hits.to_string());
    ui::key_value(ctx, "disk misses", &stats.disk_cache_misses.to_string());
    ui::key_value(ctx, "remote loads", &stats.remote_loads.to_string());
    ui::key_value(ctx, "errors", &stats.errors.to_string());
    ui::key_value(
        ctx,
        "avg load time",
        &format!("{:.1} ms", stats.average_load_time_ms),
    );
}
