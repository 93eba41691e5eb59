use anyhow::{Context, Result, bail};
use log::{debug, trace};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    constants::{MANIFEST_FILE, PACKAGES_DIR},
    error::GenerateError,
};

/// Package directories a command should process, in processing order.
///
/// `package` may be an absolute path, a path starting with `./` or `../`
/// (relative to `cwd`), or a bare name under `packages/`. Without it every
/// subdirectory of `packages/` holding a package.json is returned, sorted.
pub fn resolve_packages(cwd: &Path, package: Option<&str>) -> Result<Vec<PathBuf>> {
    let Some(package) = package else {
        return discover_packages(cwd);
    };

    let as_path = Path::new(package);
    let dir = if as_path.is_absolute() {
        as_path.to_path_buf()
    } else if package.starts_with("./") || package.starts_with("../") {
        cwd.join(as_path)
    } else {
        cwd.join(PACKAGES_DIR).join(package)
    };

    if !dir.is_dir() {
        bail!(GenerateError::Discovery(format!("Package not found: {}", dir.display())));
    }
    debug!("Resolved package '{}' to {}", package, dir.display());
    Ok(vec![dir])
}

fn discover_packages(cwd: &Path) -> Result<Vec<PathBuf>> {
    let packages_dir = cwd.join(PACKAGES_DIR);
    if !packages_dir.is_dir() {
        bail!(GenerateError::Discovery(format!(
            "Packages directory not found: {}",
            packages_dir.display()
        )));
    }

    let entries = fs::read_dir(&packages_dir)
        .with_context(|| format!("Failed to read {}", packages_dir.display()))?;

    let mut packages = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Failed to read {}", packages_dir.display()))?.path();
        if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
            trace!("Discovered package at {}", path.display());
            packages.push(path);
        }
    }
    packages.sort();

    debug!("Discovered {} packages in {}", packages.len(), packages_dir.display());
    Ok(packages)
}
