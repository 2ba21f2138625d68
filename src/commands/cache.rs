use crate::config::Config;
use crate::context::Context;
use crate::error::Result;
use anyhow::Context as _;
use chrono::{DateTime, Local};
use colored::Colorize;
use std::path::PathBuf;

/// A file in the download cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Files under the cache directory, sorted by path.
pub fn cache_entries(config: &Config) -> Result<Vec<CacheEntry>> {
    let mut entries = Vec::new();
    if !config.cache_dir.exists() {
        return Ok(entries);
    }

    for entry in walkdir::WalkDir::new(&config.cache_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| anyhow::anyhow!("Failed to read cache directory: {}", e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry
            .metadata()
            .map_err(|e| anyhow::anyhow!("Failed to read metadata: {}", e))?;
        entries.push(CacheEntry {
            path: entry.into_path(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    Ok(entries)
}

pub fn cache(ctx: &Context) -> Result<()> {
    let cache_dir = &ctx.config.cache_dir;
    println!("{}", "==> Download Cache".bold().green());
    println!();
    println!(
        "{}: {}",
        "Location".bold(),
        cache_dir.display().to_string().cyan()
    );

    let entries = cache_entries(&ctx.config)?;
    if entries.is_empty() {
        println!("{}: {}", "Status".bold(), "Empty".dimmed());
        return Ok(());
    }

    println!();
    for entry in &entries {
        let name = entry
            .path
            .strip_prefix(cache_dir)
            .unwrap_or(&entry.path)
            .display()
            .to_string();
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>10}  {}  {}",
            format_size(entry.size),
            modified.dimmed(),
            name
        );
    }

    let total: u64 = entries.iter().map(|e| e.size).sum();
    println!();
    println!(
        "{}: {} in {} files",
        "Size".bold(),
        format_size(total).cyan(),
        entries.len().to_string().cyan()
    );
    println!("Run {} to clean the cache", "rpm-get clean".dimmed());
    Ok(())
}

/// Delete every file in the cache directory. Returns the number of files and
/// bytes removed.
pub fn clean_cache(config: &Config) -> Result<(usize, u64)> {
    let entries = cache_entries(config)?;
    let mut freed = 0u64;
    for entry in &entries {
        std::fs::remove_file(&entry.path)
            .with_context(|| format!("Failed to remove {}", entry.path.display()))?;
        freed += entry.size;
    }
    Ok((entries.len(), freed))
}

pub fn clean(ctx: &Context) -> Result<()> {
    println!("Cleaning download cache...");
    let (count, freed) = clean_cache(&ctx.config)?;

    if count == 0 {
        println!("{} Cache is already empty", "✓".green());
        return Ok(());
    }

    println!(
        "{} Removed {} files, freed {}",
        "✓".green().bold(),
        count.to_string().bold(),
        format_size(freed).bold()
    );
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
