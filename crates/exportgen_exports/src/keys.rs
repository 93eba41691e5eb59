//! Export key derivation.
//!
//! Keys are pure functions of a package-relative path:
//!
//! | Source path            | Key              |
//! |------------------------|------------------|
//! | `src/index.ts`         | `.`              |
//! | `src/core/index.ts`    | `./core`         |
//! | `lib/utils/format.js`  | `./utils/format` |
//! | `base.json`            | `./base`         |
//!
//! Precise scanning refines the file key with the exported symbol.

use exportgen_core::{DECLARATION_SUFFIX, SOURCE_EXTENSIONS};

use crate::constants::MAIN_EXPORT_KEY;

/// Strip a leading `./`, a leading `src/` or `lib/` segment and the source extension.
pub fn base_path(source_path: &str) -> String {
    let normalized = source_path.replace('\\', "/");
    let mut path = normalized.as_str();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    let path = path.strip_prefix("src/").or_else(|| path.strip_prefix("lib/")).unwrap_or(path);
    strip_source_extension(path).to_string()
}

fn strip_source_extension(path: &str) -> &str {
    if let Some(stripped) = path.strip_suffix(DECLARATION_SUFFIX) {
        return stripped;
    }
    match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') && SOURCE_EXTENSIONS.contains(&ext) => {
            stem
        }
        _ => path,
    }
}

/// Key of a whole source file.
pub fn export_key(relative_path: &str) -> String {
    let base = base_path(relative_path);
    if base.is_empty() || base == MAIN_EXPORT_KEY {
        return MAIN_EXPORT_KEY.to_string();
    }

    let (dir, name) = base.rsplit_once('/').unwrap_or(("", base.as_str()));
    if name == "index" {
        if dir.is_empty() { MAIN_EXPORT_KEY.to_string() } else { format!("./{dir}") }
    } else {
        format!("./{base}")
    }
}

/// Key of a root JSON file: `./<basename without .json>`.
pub fn json_export_key(file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    format!("./{}", name.strip_suffix(".json").unwrap_or(name))
}

/// Key of one exported symbol. Default exports keep the file key.
pub fn symbol_export_key(relative_path: &str, export_name: &str, is_default: bool) -> String {
    let base = export_key(relative_path);
    if is_default {
        base
    } else {
        join_key(&base, export_name)
    }
}

/// Key of a re-export statement: `/*` for namespaces, `/name` for a single
/// name and `/{a,b}` for several.
pub fn re_export_key(relative_path: &str, names: &[String], is_namespace: bool) -> String {
    let base = export_key(relative_path);
    if is_namespace {
        return join_key(&base, "*");
    }
    match names {
        [single] => join_key(&base, single),
        _ => join_key(&base, &format!("{{{}}}", names.join(","))),
    }
}

fn join_key(base: &str, segment: &str) -> String {
    if base == MAIN_EXPORT_KEY { format!("./{segment}") } else { format!("{base}/{segment}") }
}
