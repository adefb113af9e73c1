use std::fmt;
use std::path::Path;

use anyhow::Result;
use walkdir::WalkDir;

const WELL_KNOWN_BUILD_FILES: [&str; 2] = ["Dockerfile", "Containerfile"];

/// Walk the build context to find container build files.
/// Returns a sorted list of paths relative to `context`.
pub fn discover_build_files(context: &Path, max_depth: usize) -> Result<Vec<String>> {
    for name in WELL_KNOWN_BUILD_FILES {
        if context.join(name).is_file() {
            return Ok(vec![name.to_string()]);
        }
    }

    let mut matches = Vec::new();
    let walker = WalkDir::new(context)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !should_skip(e));

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() || !is_build_file(entry.file_name().to_str()) {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(context) {
            matches.push(rel.to_string_lossy().to_string());
        }
    }

    matches.sort();
    Ok(matches)
}

fn is_build_file(name: Option<&str>) -> bool {
    let Some(name) = name else { return false };
    WELL_KNOWN_BUILD_FILES.iter().any(|known| {
        name == *known
            || name.strip_prefix(known).is_some_and(|rest| rest.starts_with('.'))
            || name.strip_suffix(known).is_some_and(|rest| rest.ends_with('.'))
    })
}

fn should_skip(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    matches!(
        entry.file_name().to_str().unwrap_or_default(),
        ".git" | "target" | "node_modules" | "__pycache__" | "build" | "dist" | ".venv"
    )
}

/// How a source directory declares itself installable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    SetupPy,
    Pyproject,
    SetupCfg,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupPy => f.write_str("setup.py"),
            Self::Pyproject => f.write_str("pyproject.toml"),
            Self::SetupCfg => f.write_str("setup.cfg"),
        }
    }
}

/// Detect a package manifest at the top of `dir`.
pub fn detect_package(dir: &Path) -> Option<PackageKind> {
    [
        PackageKind::SetupPy,
        PackageKind::Pyproject,
        PackageKind::SetupCfg,
    ]
    .into_iter()
    .find(|kind| dir.join(kind.to_string()).is_file())
}
