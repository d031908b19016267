//! Cache command - inspect and maintain the disk cache

use crate::cache::{format_bytes, CacheSizeStatus, DiskCache, DiskCacheEntry, DiskCacheOptions};
use crate::checksum::short_checksum;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::{PackError, PackResult};
use crate::ui::{self, UiContext};
use console::style;
use std::io::{self, Write};
use std::sync::Arc;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> PackResult<()> {
    let cache = DiskCache::new(DiskCacheOptions::from_config(config), Arc::new(SystemClock));

    match args.action {
        CacheAction::List { format } => list_entries(&cache, format).await,
        CacheAction::Info => show_info(&cache).await,
        CacheAction::Cleanup => cleanup(&cache).await,
        CacheAction::Clear { yes } => clear(&cache, yes).await,
    }
}

async fn list_entries(cache: &DiskCache, format: OutputFormat) -> PackResult<()> {
    let entries = cache.entries().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.package_id);
            }
        }
        OutputFormat::Table if entries.is_empty() => {
            ui::step_info(&UiContext::detect(), "No cached packages");
        }
        OutputFormat::Table => print_table(&entries),
    }

    Ok(())
}

fn print_table(entries: &[DiskCacheEntry]) {
    println!(
        "{:<32} {:<14} {:>10} {:<20}",
        "PACKAGE", "CHECKSUM", "SIZE", "CACHED"
    );
    println!("{}", "-".repeat(79));

    for entry in entries {
        println!(
            "{:<32} {:<14} {:>10} {:<20}",
            entry.package_id,
            short_checksum(&entry.checksum),
            format_bytes(entry.size),
            entry.cached_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} package(s)", entries.len());
}

async fn show_info(cache: &DiskCache) -> PackResult<()> {
    let ctx = UiContext::detect();
    let stats = cache.stats().await;

    ui::section(&ctx, "Disk cache");
    ui::key_value(&ctx, "directory", &stats.dir.display().to_string());
    ui::key_value(
        &ctx,
        "enabled",
        if stats.enabled { "yes" } else { "no (directory unusable or disabled)" },
    );
    ui::key_value(&ctx, "entries", &stats.entries.to_string());

    let percent = CacheSizeStatus::percentage(stats.total_size_bytes, stats.max_size_bytes);
    let usage = format!(
        "{} / {} ({:.0}%)",
        format_bytes(stats.total_size_bytes),
        format_bytes(stats.max_size_bytes),
        percent
    );
    let usage = match stats.size_status() {
        CacheSizeStatus::Ok => style(usage).green(),
        CacheSizeStatus::Warning => style(usage).yellow(),
        CacheSizeStatus::Exceeded => style(usage).red(),
    };
    ui::key_value(&ctx, "usage", &usage.to_string());

    let last_cleanup = stats
        .last_cleanup
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    ui::key_value(&ctx, "last cleanup", &last_cleanup);

    Ok(())
}

/// Maintenance commands have nothing to act on when the tier is off
async fn require_enabled(cache: &DiskCache) -> PackResult<()> {
    if cache.is_enabled().await {
        Ok(())
    } else {
        Err(PackError::DiskCacheDisabled(cache.dir().display().to_string()))
    }
}

async fn cleanup(cache: &DiskCache) -> PackResult<()> {
    require_enabled(cache).await?;
    let ctx = UiContext::detect();
    let report = cache.cleanup().await?;

    if report.removed() == 0 {
        ui::step_ok(&ctx, "Nothing to clean up");
        return Ok(());
    }

    for id in &report.expired {
        println!("  {} {} (expired)", style("•").red(), id);
    }
    for id in &report.evicted {
        println!("  {} {} (evicted)", style("•").red(), id);
    }
    ui::step_ok(
        &ctx,
        &format!(
            "Removed {} package(s), freed {}",
            report.removed(),
            format_bytes(report.freed_bytes)
        ),
    );

    Ok(())
}

async fn clear(cache: &DiskCache, skip_confirm: bool) -> PackResult<()> {
    require_enabled(cache).await?;
    let ctx = UiContext::detect();
    let entries = cache.entries().await;

    if entries.is_empty() {
        ui::step_info(&ctx, "No cached packages to clear");
        return Ok(());
    }

    println!("This will remove {} cached package(s):", entries.len());
    for entry in &entries {
        println!("  {} {}", style("•").red(), entry.package_id);
    }
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    cache.clear().await?;
    ui::step_ok(&ctx, &format!("Cleared {} package(s)", entries.len()));

    Ok(())
}
