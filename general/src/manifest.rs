//! Reading the secretary's folder manifest.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use infantry::core::paths::normalize_repo_relative;

/// Non-blank manifest lines, in order.
pub fn read_manifest(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read folder manifest {}", path.display()))?;
    Ok(parse_manifest(&contents))
}

pub fn parse_manifest(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn a manifest entry into a repo-relative mission folder.
///
/// Absolute entries must lie under `repo_root`; relative ones are taken as
/// already repo-relative.
pub fn to_repo_relative(repo_root: &Path, entry: &str) -> Result<String> {
    let path = Path::new(entry);
    let relative = if path.is_absolute() {
        path.strip_prefix(repo_root)
            .map_err(|_| anyhow!("mission folder {entry} is outside {}", repo_root.display()))?
            .to_string_lossy()
            .into_owned()
    } else {
        entry.to_string()
    };
    normalize_repo_relative(&relative).ok_or_else(|| {
        anyhow!("mission folder {entry} does not name a folder inside the repository")
    })
}
