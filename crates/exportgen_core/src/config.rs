use log::{debug, trace, warn};
use std::{collections::HashMap, fs, path::Path};

/// Path aliases declared in `<root>/tsconfig.json`, keyed without the trailing `/*`.
///
/// Targets are made absolute against `compilerOptions.baseUrl`. A missing or
/// unreadable tsconfig yields no aliases.
pub fn read_tsconfig_paths(root: &Path) -> HashMap<String, Vec<String>> {
    let tsconfig_path = root.join("tsconfig.json");
    let mut paths = HashMap::new();

    let Ok(content) = fs::read_to_string(&tsconfig_path) else {
        trace!("No tsconfig at {:?}", tsconfig_path);
        return paths;
    };

    let json = match serde_json::from_str::<serde_json::Value>(&strip_json_comments(&content)) {
        Ok(json) => json,
        Err(err) => {
            warn!("Ignoring unparsable {}: {}", tsconfig_path.display(), err);
            return paths;
        }
    };

    if let Some(compiler_options) = json.get("compilerOptions")
        && let Some(paths_obj) = compiler_options.get("paths").and_then(|p| p.as_object())
    {
        let base_url = compiler_options.get("baseUrl").and_then(|b| b.as_str()).unwrap_or(".");
        let base_path = root.join(base_url);

        for (alias, targets) in paths_obj {
            let resolved_targets: Vec<String> = targets
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|t| t.as_str())
                .map(|t| base_path.join(t.trim_end_matches("/*")).to_string_lossy().to_string())
                .collect();

            if !resolved_targets.is_empty() {
                let alias_key = alias.trim_end_matches("/*").to_string();
                trace!("Found tsconfig path alias: '{}' -> {:?}", alias_key, resolved_targets);
                paths.insert(alias_key, resolved_targets);
            }
        }
    }

    debug!("Loaded {} tsconfig path aliases", paths.len());
    paths
}

/// Remove `//` and `/* */` comments outside of string literals.
fn strip_json_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}
