//! Command handlers for Argus's CLI commands

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::debug;
use walkdir::WalkDir;

use argus::models::{ContractInput, PlatformInfo};

mod analyze;
mod health;
mod platforms;
mod validate;

pub use analyze::AnalyzeCommand;
pub use health::HealthCommand;
pub use platforms::PlatformsCommand;
pub use validate::ValidateCommand;

/// Read contract sources from files and directories.
///
/// Directories are walked recursively and only files with one of the
/// platform's extensions are taken; files named explicitly are always read.
pub fn collect_contracts(paths: &[PathBuf], platform: &PlatformInfo) -> Result<Vec<ContractInput>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_ignored_dir(e.path()))
            {
                let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
                if entry.file_type().is_file() && has_platform_extension(entry.path(), platform) {
                    files.push(entry.into_path());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }

    files.sort();
    files.dedup();
    debug!("Collected {} contract file(s) for {}", files.len(), platform.id);

    files
        .into_iter()
        .map(|file| {
            let code = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read contract {}", file.display()))?;
            Ok(ContractInput::new(display_name(&file), code, &platform.id)
                .with_language(&platform.language))
        })
        .collect()
}

fn has_platform_extension(path: &Path, platform: &PlatformInfo) -> bool {
    platform.accepts_extension(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref(),
    )
}

/// Build output and dependency folders never hold contracts under review
fn is_ignored_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| {
            matches!(
                name,
                ".git" | "node_modules" | "build" | "out" | "target" | "cache" | "artifacts"
            )
        })
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.strip_prefix("./")
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}
