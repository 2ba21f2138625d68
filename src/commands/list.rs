use crate::commands::known_packages;
use crate::commands::query::is_supported;
use crate::context::Context;
use crate::error::Result;
use colored::Colorize;

/// What `list` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMode {
    /// Available packages, marking the installed ones.
    #[default]
    Status,
    /// Names only, no install status.
    Raw,
    Installed,
    NotInstalled,
}

/// One row of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub installed: Option<String>,
}

pub fn list_entries(ctx: &Context, mode: ListMode, include_unsupported: bool) -> Result<Vec<ListEntry>> {
    let state = ctx.state().load()?;

    let entries = known_packages(ctx)
        .into_iter()
        .filter(|name| include_unsupported || is_supported(ctx, name))
        .map(|name| {
            let installed = state.packages.get(&name).map(|p| p.version.clone());
            ListEntry { name, installed }
        })
        .filter(|entry| match mode {
            ListMode::Status | ListMode::Raw => true,
            ListMode::Installed => entry.installed.is_some(),
            ListMode::NotInstalled => entry.installed.is_none(),
        })
        .collect();

    Ok(entries)
}

pub fn list(ctx: &Context, mode: ListMode, include_unsupported: bool) -> Result<()> {
    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stdout());
    let entries = list_entries(ctx, mode, include_unsupported)?;

    for entry in entries {
        match (mode, &entry.installed) {
            (ListMode::Status, Some(version)) if is_tty => println!(
                "{} {} {}",
                entry.name.bold().green(),
                version.dimmed(),
                "[installed]".cyan()
            ),
            (ListMode::Status, Some(version)) => {
                println!("{} {} [installed]", entry.name, version)
            }
            (ListMode::Installed, Some(version)) => println!("{} {}", entry.name, version),
            _ => println!("{}", entry.name),
        }
    }
    Ok(())
}
