use indexmap::IndexMap;
use log::{debug, info, trace, warn};

use crate::{
    constants::{DEFAULT_PRIORITY, MAIN_EXPORT_CANDIDATES, MAIN_EXPORT_HINTS, MAIN_EXPORT_KEY},
    keys::base_path,
    types::{
        ConditionalExport, ExportEntry, ExportGeneratorOptions, ExportsRecord, FormatTarget,
        PackageExport,
    },
};

/// Render `exports` into an exports map, then make sure "." is present.
pub fn generate_exports(exports: &[PackageExport], options: &ExportGeneratorOptions) -> ExportsRecord {
    let mut record = render_exports(exports, options);
    ensure_main_export(&mut record);
    debug!("Generated {} export entries", record.len());
    record
}

/// Sorted rendering without the main-export fallback.
///
/// Later exports with an already-rendered key replace the earlier value.
pub fn render_exports(exports: &[PackageExport], options: &ExportGeneratorOptions) -> ExportsRecord {
    let mut record = ExportsRecord::new();
    for exp in sort_exports(exports, &options.export_priorities) {
        trace!("Rendering export '{}' from {}", exp.key, exp.source_path);
        record.insert(exp.key.clone(), render_entry(exp, options));
    }
    record
}

/// Base record plus `custom key -> existing key` aliases.
///
/// Mappings whose source key is not generated are logged and skipped.
pub fn generate_custom_exports(
    exports: &[PackageExport],
    options: &ExportGeneratorOptions,
    mappings: Option<&IndexMap<String, String>>,
) -> ExportsRecord {
    let mut record = generate_exports(exports, options);
    let Some(mappings) = mappings else {
        return record;
    };

    for source_key in unresolved_mappings(&record, mappings) {
        warn!("Custom mapping source key \"{}\" not found in generated exports", source_key);
    }

    let aliases: Vec<(String, ExportEntry)> = mappings
        .iter()
        .filter_map(|(custom, source)| record.get(source).map(|v| (custom.clone(), v.clone())))
        .collect();
    for (custom, entry) in aliases {
        debug!("Mapped custom export '{}'", custom);
        record.insert(custom, entry);
    }
    record
}

/// Source keys of `mappings` that `record` does not contain.
pub fn unresolved_mappings<'m>(
    record: &ExportsRecord,
    mappings: &'m IndexMap<String, String>,
) -> Vec<&'m str> {
    mappings
        .values()
        .filter(|source| !record.contains_key(source.as_str()))
        .map(String::as_str)
        .collect()
}

/// Bind "." to a likely entry point when it is missing.
///
/// Returns the key "." was copied from, if any. The source entry is kept.
pub fn ensure_main_export(record: &mut ExportsRecord) -> Option<String> {
    if record.contains_key(MAIN_EXPORT_KEY) || record.is_empty() {
        return None;
    }

    let source = MAIN_EXPORT_CANDIDATES
        .iter()
        .find(|c| record.contains_key(**c))
        .map(|c| c.to_string())
        .or_else(|| {
            record
                .keys()
                .find(|k| MAIN_EXPORT_HINTS.iter().any(|hint| k.contains(hint)))
                .cloned()
        });

    let source = match source {
        Some(source) => {
            info!("Created main export \".\" pointing to \"{}\"", source);
            source
        }
        None => {
            let first = record.keys().min()?.clone();
            warn!("Created main export \".\" pointing to \"{}\" as fallback", first);
            first
        }
    };

    let entry = record.get(&source)?.clone();
    record.shift_insert(0, MAIN_EXPORT_KEY.to_string(), entry);
    Some(source)
}

/// "." is valid output only when present and every entry is well-formed.
pub fn validate_exports(record: &ExportsRecord) -> bool {
    if !record.contains_key(MAIN_EXPORT_KEY) {
        warn!("Missing main export \".\"");
        return false;
    }

    for (key, entry) in record {
        if !entry.is_valid() {
            warn!("Invalid export format for key \"{}\"", key);
            return false;
        }
    }
    true
}

pub fn generate_summary(record: &ExportsRecord) -> String {
    let total = record.len();
    let dual = record.values().filter(|e| e.is_dual_format()).count();
    format!(
        "Generated {} exports:\n  - {} dual-format (ESM + CJS)\n  - {} simple exports",
        total,
        dual,
        total - dual
    )
}

/// "." first, then ascending priority, then key.
pub fn sort_exports<'e>(
    exports: &'e [PackageExport],
    priorities: &IndexMap<String, i64>,
) -> Vec<&'e PackageExport> {
    let mut sorted: Vec<&PackageExport> = exports.iter().collect();
    sorted.sort_by(|a, b| {
        let a_rank = (a.key != MAIN_EXPORT_KEY, export_priority(&a.key, priorities));
        let b_rank = (b.key != MAIN_EXPORT_KEY, export_priority(&b.key, priorities));
        a_rank.cmp(&b_rank).then_with(|| a.key.cmp(&b.key))
    });
    sorted
}

/// Priority of the first prefix in `priorities` that `key` starts with.
pub fn export_priority(key: &str, priorities: &IndexMap<String, i64>) -> i64 {
    if key == MAIN_EXPORT_KEY {
        return 0;
    }
    priorities
        .iter()
        .find(|(prefix, _)| key.starts_with(prefix.as_str()))
        .map(|(_, priority)| *priority)
        .unwrap_or(DEFAULT_PRIORITY)
}

fn render_entry(exp: &PackageExport, options: &ExportGeneratorOptions) -> ExportEntry {
    if exp.is_json() {
        return ExportEntry::Path(ensure_relative(&join_segments(&[&exp.source_path])));
    }

    let base = base_path(&exp.source_path);
    if exp.dual_format && options.dual_format {
        let target = |dir: &str, ext: &str| FormatTarget {
            default: output_path(options, dir, &base, ext),
            types: exp
                .has_types
                .then(|| output_path(options, dir, &base, &options.extensions.types)),
        };
        return ExportEntry::Conditional(ConditionalExport {
            import: Some(target(&options.esm_dir, &options.extensions.esm)),
            require: Some(target(&options.cjs_dir, &options.extensions.cjs)),
        });
    }

    // Single format always points at the ESM build.
    ExportEntry::Path(output_path(options, &options.esm_dir, &base, &options.extensions.esm))
}

fn output_path(options: &ExportGeneratorOptions, format_dir: &str, base: &str, ext: &str) -> String {
    let file = format!("{base}{ext}");
    ensure_relative(&join_segments(&[&options.dist_dir, format_dir, &file]))
}

/// Join path fragments with `/`, dropping empty and `.` segments.
fn join_segments(parts: &[&str]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for part in parts {
        for segment in part.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.last().is_some_and(|s| *s != "..") {
                        segments.pop();
                    } else {
                        segments.push("..");
                    }
                }
                s => segments.push(s),
            }
        }
    }
    segments.join("/")
}

/// Every target starts with `./`, including ones that leave the package.
fn ensure_relative(path: &str) -> String {
    if path.starts_with("./") {
        path.to_string()
    } else {
        format!("./{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(key: &str, source: &str, dual: bool, types: bool) -> PackageExport {
        PackageExport {
            key: key.to_string(),
            source_path: source.to_string(),
            dual_format: dual,
            has_types: types,
            metadata: None,
        }
    }

    fn path(p: &str) -> ExportEntry {
        ExportEntry::Path(p.to_string())
    }

    fn target(default: &str, types: Option<&str>) -> Option<FormatTarget> {
        Some(FormatTarget { default: default.to_string(), types: types.map(str::to_string) })
    }

    #[test]
    fn test_dual_format_main_export() {
        let record = generate_exports(
            &[export(".", "src/index.ts", true, true)],
            &ExportGeneratorOptions::default(),
        );
        let expected = serde_json::json!({
            ".": {
                "import": { "default": "./dist/esm/index.js", "types": "./dist/esm/index.d.ts" },
                "require": { "default": "./dist/cjs/index.cjs", "types": "./dist/cjs/index.d.ts" }
            }
        });
        assert_eq!(serde_json::to_value(&record).unwrap(), expected);
    }

    #[test]
    fn test_dual_format_without_types() {
        let record =
            render_exports(&[export("./a", "src/a.js", true, false)], &ExportGeneratorOptions::default());
        assert_eq!(
            record["./a"],
            ExportEntry::Conditional(ConditionalExport {
                import: target("./dist/esm/a.js", None),
                require: target("./dist/cjs/a.cjs", None),
            })
        );
    }

    #[test]
    fn test_json_export_renders_literal_path() {
        let exports = [export("./base", "base.json", false, false)];
        let record = render_exports(&exports, &ExportGeneratorOptions::default());
        assert_eq!(serde_json::to_value(&record).unwrap(), serde_json::json!({ "./base": "./base.json" }));
        assert!(!validate_exports(&record));

        let record = generate_exports(&exports, &ExportGeneratorOptions::default());
        assert!(validate_exports(&record));
        assert_eq!(record["."], path("./base.json"));
    }

    #[test]
    fn test_single_format_uses_esm_paths() {
        let options = ExportGeneratorOptions { dual_format: false, ..Default::default() };
        let record = render_exports(&[export("./utils/a", "src/utils/a.ts", true, true)], &options);
        assert_eq!(record["./utils/a"], path("./dist/esm/utils/a.js"));

        let record = render_exports(
            &[export("./b", "lib/b.ts", false, true)],
            &ExportGeneratorOptions::default(),
        );
        assert_eq!(record["./b"], path("./dist/esm/b.js"));
    }

    #[test]
    fn test_sort_main_first_then_alphabetical() {
        let exports = [
            export("./utils/composer", "src/utils/composer.ts", false, false),
            export(".", "src/index.ts", false, false),
            export("./base", "src/base.ts", false, false),
        ];
        let record = render_exports(&exports, &ExportGeneratorOptions::default());
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![".", "./base", "./utils/composer"]);
    }

    #[test]
    fn test_sort_by_priority_prefix() {
        let mut options = ExportGeneratorOptions::default();
        options.export_priorities.insert("./presets".to_string(), 1);
        options.export_priorities.insert("./presets/legacy".to_string(), 50);
        options.export_priorities.insert("./core".to_string(), 2);
        let exports = [
            export("./a", "src/a.ts", false, false),
            export("./core/x", "src/core/x.ts", false, false),
            export("./presets/legacy", "src/presets/legacy.ts", false, false),
            export("./presets/react", "src/presets/react.ts", false, false),
        ];
        let record = render_exports(&exports, &options);
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        // first matching prefix wins, so "./presets/legacy" gets 1
        assert_eq!(keys, vec!["./presets/legacy", "./presets/react", "./core/x", "./a"]);
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let exports = [
            export("./a", "src/a.ts", false, false),
            export("./a", "src/a.js", true, false),
        ];
        let record = render_exports(&exports, &ExportGeneratorOptions::default());
        assert_eq!(record.len(), 1);
        assert!(record["./a"].is_dual_format());
    }

    #[test]
    fn test_ensure_main_export_candidates() {
        let mut record = ExportsRecord::new();
        record.insert("./alpha".to_string(), path("./dist/esm/alpha.js"));
        record.insert("./main".to_string(), path("./dist/esm/main.js"));
        assert_eq!(ensure_main_export(&mut record).as_deref(), Some("./main"));
        assert_eq!(record.get_index(0).unwrap().0, ".");
        assert_eq!(record["."], path("./dist/esm/main.js"));
        assert!(record.contains_key("./main"));
    }

    #[test]
    fn test_ensure_main_export_hints_then_alphabetical() {
        let mut record = ExportsRecord::new();
        record.insert("./zeta".to_string(), path("./z.js"));
        record.insert("./presets/default-config".to_string(), path("./d.js"));
        assert_eq!(ensure_main_export(&mut record).as_deref(), Some("./presets/default-config"));

        let mut record = ExportsRecord::new();
        record.insert("./zeta".to_string(), path("./z.js"));
        record.insert("./alpha".to_string(), path("./a.js"));
        assert_eq!(ensure_main_export(&mut record).as_deref(), Some("./alpha"));
        assert_eq!(record["."], path("./a.js"));
    }

    #[test]
    fn test_ensure_main_export_noop() {
        let mut empty = ExportsRecord::new();
        assert_eq!(ensure_main_export(&mut empty), None);
        assert!(empty.is_empty());

        let mut present = ExportsRecord::new();
        present.insert(".".to_string(), path("./index.js"));
        assert_eq!(ensure_main_export(&mut present), None);
        assert_eq!(present.len(), 1);
    }

    #[test]
    fn test_generated_exports_always_validate() {
        let inputs = vec![
            vec![export("./utils/x", "src/utils/x.ts", true, true)],
            vec![export("./base", "base.json", false, false), export("./strict", "strict.json", false, false)],
            vec![export("./a", "lib/a.js", false, false), export(".", "src/index.ts", true, false)],
        ];
        for exports in inputs {
            let record = generate_exports(&exports, &ExportGeneratorOptions::default());
            assert!(validate_exports(&record), "{:?}", record);
        }
    }

    #[test]
    fn test_custom_mappings() {
        let exports = [
            export(".", "src/index.ts", true, true),
            export("./core/javascript", "src/core/javascript.ts", true, true),
        ];
        let mut mappings = IndexMap::new();
        mappings.insert("./js".to_string(), "./core/javascript".to_string());
        mappings.insert("./missing".to_string(), "./not/there".to_string());

        let options = ExportGeneratorOptions::default();
        let record = generate_custom_exports(&exports, &options, Some(&mappings));
        assert_eq!(record["./js"], record["./core/javascript"]);
        assert!(!record.contains_key("./missing"));
        assert_eq!(record.len(), 3);

        let base = generate_exports(&exports, &options);
        assert_eq!(unresolved_mappings(&base, &mappings), vec!["./not/there"]);
    }

    #[test]
    fn test_custom_mappings_none_is_base_record() {
        let exports = [export(".", "src/index.ts", false, false)];
        let options = ExportGeneratorOptions::default();
        assert_eq!(generate_custom_exports(&exports, &options, None), generate_exports(&exports, &options));
    }

    #[test]
    fn test_validate_rejects_malformed_entries() {
        let mut record = ExportsRecord::new();
        record.insert(".".to_string(), path("./index.js"));
        assert!(validate_exports(&record));

        record.insert("./bad".to_string(), path("dist/bad.js"));
        assert!(!validate_exports(&record));

        let mut record = ExportsRecord::new();
        record.insert(".".to_string(), ExportEntry::Conditional(ConditionalExport { import: None, require: None }));
        assert!(!validate_exports(&record));
    }

    #[test]
    fn test_summary() {
        let record = generate_exports(
            &[
                export(".", "src/index.ts", true, true),
                export("./a", "src/a.ts", true, false),
                export("./base", "base.json", false, false),
            ],
            &ExportGeneratorOptions::default(),
        );
        assert_eq!(
            generate_summary(&record),
            "Generated 3 exports:\n  - 2 dual-format (ESM + CJS)\n  - 1 simple exports"
        );
    }

    #[test]
    fn test_join_segments() {
        assert_eq!(join_segments(&["./dist", "esm", "a/b.js"]), "dist/esm/a/b.js");
        assert_eq!(join_segments(&["dist/", "./cjs", "x.cjs"]), "dist/cjs/x.cjs");
        assert_eq!(join_segments(&["../out", "esm", "a.js"]), "../out/esm/a.js");
    }

    #[test]
    fn test_dist_dir_outside_package_stays_valid() {
        let options = ExportGeneratorOptions {
            dist_dir: "../out".to_string(),
            dual_format: false,
            ..Default::default()
        };
        let record = generate_exports(&[export(".", "src/index.ts", true, true)], &options);
        assert_eq!(record["."], path("./../out/esm/index.js"));
        assert!(validate_exports(&record));

        let dual = ExportGeneratorOptions { dist_dir: "../out".to_string(), ..Default::default() };
        let record = generate_exports(&[export(".", "src/index.ts", true, false)], &dual);
        let ExportEntry::Conditional(entry) = &record["."] else {
            panic!("expected a conditional export");
        };
        assert_eq!(entry.require, target("./../out/cjs/index.cjs", None));
        assert!(validate_exports(&record));
    }
}
