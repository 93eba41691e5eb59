use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    constants::{BACKUP_INFIX, MANIFEST_FILE},
    error::GenerateError,
    types::ExportsRecord,
};

/// A package.json, field order preserved.
pub type Manifest = Map<String, Value>;

/// Read `<root>/package.json`, requiring a non-empty `name` and `version`.
pub fn read_manifest(root: &Path) -> Result<Manifest> {
    let path = root.join(MANIFEST_FILE);
    let invalid = |reason: String| GenerateError::Manifest { path: path.clone(), reason };

    let content = fs::read_to_string(&path).map_err(|err| invalid(err.to_string()))?;
    let value: Value = serde_json::from_str(&content).map_err(|err| invalid(err.to_string()))?;
    let Value::Object(manifest) = value else {
        return Err(invalid("expected a JSON object".to_string()).into());
    };

    if !validate_manifest(&manifest) {
        return Err(invalid("'name' and 'version' must be non-empty strings".to_string()).into());
    }

    debug!("Read manifest for {} from {}", package_name(&manifest).unwrap_or_default(), path.display());
    Ok(manifest)
}

pub fn validate_manifest(manifest: &Manifest) -> bool {
    let non_empty = |field: &str| manifest.get(field).and_then(Value::as_str).is_some_and(|s| !s.is_empty());
    non_empty("name") && non_empty("version")
}

pub fn package_name(manifest: &Manifest) -> Option<&str> {
    manifest.get("name").and_then(Value::as_str)
}

/// Copy package.json next to itself as `package.json.backup.<epoch-ms>`.
pub fn backup_manifest(root: &Path) -> Result<PathBuf> {
    let source = root.join(MANIFEST_FILE);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_millis();
    let backup = root.join(format!("{MANIFEST_FILE}{BACKUP_INFIX}{millis}"));

    fs::copy(&source, &backup)
        .with_context(|| format!("Failed to back up {} to {}", source.display(), backup.display()))?;
    info!("Backed up {} to {}", source.display(), backup.display());
    Ok(backup)
}

/// Replace the `exports` field and write the manifest back with 2-space indentation.
pub fn write_exports(root: &Path, mut manifest: Manifest, record: &ExportsRecord) -> Result<()> {
    let path = root.join(MANIFEST_FILE);
    let exports = serde_json::to_value(record).context("Failed to serialize exports")?;
    manifest.insert("exports".to_string(), exports);

    let mut content = serde_json::to_string_pretty(&Value::Object(manifest))
        .context("Failed to serialize package.json")?;
    content.push('\n');

    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {} exports to {}", record.len(), path.display());
    Ok(())
}
