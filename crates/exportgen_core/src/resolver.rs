use log::trace;
use path_clean::clean;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::constants::{INDEX_FILES, RESOLVE_EXTENSIONS};

/// Resolve an import specifier to a file accepted by `exists`.
///
/// Handles relative specifiers and `tsconfig.json` path aliases. Bare package
/// imports resolve to `None`: they never point inside the analyzed project.
pub fn resolve(
    from_file: &Path,
    request: &str,
    tsconfig_paths: &HashMap<String, Vec<String>>,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    trace!("Resolving: '{}' from {}", request, from_file.display());

    if request.starts_with("./") || request.starts_with("../") || request == "." || request == ".."
    {
        let base = from_file.parent().unwrap_or(Path::new(""));
        let candidate = clean(base.join(request));
        let result = resolve_file(&candidate, &exists);
        if result.is_none() {
            trace!("Failed to resolve relative import '{}'", request);
        }
        return result;
    }

    // Longest matching alias wins so that `@app/ui` beats `@app`.
    let mut aliases: Vec<(&String, &Vec<String>)> = tsconfig_paths
        .iter()
        .filter(|(alias, _)| {
            request == alias.as_str()
                || request.strip_prefix(alias.as_str()).is_some_and(|rest| rest.starts_with('/'))
        })
        .collect();
    aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    for (alias, targets) in aliases {
        trace!("Matched alias '{}' for request '{}'", alias, request);
        let remainder = request[alias.len()..].trim_start_matches('/');
        for target in targets {
            let candidate =
                if remainder.is_empty() { PathBuf::from(target) } else { Path::new(target).join(remainder) };
            if let Some(resolved) = resolve_file(&clean(candidate), &exists) {
                trace!("Resolved alias '{}' to {:?}", alias, resolved);
                return Some(resolved);
            }
        }
    }

    trace!("Treating '{}' as an external package", request);
    None
}

fn resolve_file(p: &Path, exists: &impl Fn(&Path) -> bool) -> Option<PathBuf> {
    // Try exact path first
    if p.extension().is_some() && exists(p) {
        return Some(p.to_path_buf());
    }

    // `./x.js` written in TypeScript sources points at `./x.ts`
    if let Some(ext) = p.extension().and_then(|e| e.to_str()) {
        let swapped: &[&str] = match ext {
            "js" => &["ts", "tsx"],
            "jsx" => &["tsx"],
            "mjs" => &["mts"],
            "cjs" => &["cts"],
            _ => &[],
        };
        for ext in swapped {
            let candidate = p.with_extension(ext);
            if exists(&candidate) {
                return Some(candidate);
            }
        }
    }

    // Try adding extensions
    for ext in RESOLVE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{}", p.display(), ext));
        if exists(&candidate) {
            return Some(candidate);
        }
    }

    // Try index files
    for index_file in INDEX_FILES {
        let candidate = p.join(index_file);
        if exists(&candidate) {
            return Some(candidate);
        }
    }

    None
}
