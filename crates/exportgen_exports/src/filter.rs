use log::{debug, trace, warn};
use regex::Regex;

use crate::types::PackageExport;

/// A key pattern where `*` matches any run of characters.
///
/// Patterns are unanchored: `core` matches `./core/x`.
#[derive(Debug)]
pub struct KeyPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug)]
enum Matcher {
    Regex(Regex),
    Literal(String),
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Self {
        let translated =
            pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
        let matcher = match Regex::new(&translated) {
            Ok(re) => Matcher::Regex(re),
            Err(err) => {
                warn!("Invalid pattern '{}' ({}), matching it literally", pattern, err);
                Matcher::Literal(pattern.to_string())
            }
        };
        Self { source: pattern.to_string(), matcher }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, key: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(key),
            Matcher::Literal(lit) => key.contains(lit.as_str()),
        }
    }
}

pub fn matches_pattern(key: &str, pattern: &str) -> bool {
    KeyPattern::new(pattern).is_match(key)
}

/// Keep exports whose key matches any include pattern (when given) and no
/// exclude pattern.
pub fn filter_exports(
    exports: Vec<PackageExport>,
    include: &[String],
    exclude: &[String],
) -> Vec<PackageExport> {
    if include.is_empty() && exclude.is_empty() {
        return exports;
    }

    let include: Vec<KeyPattern> = include.iter().map(|p| KeyPattern::new(p)).collect();
    let exclude: Vec<KeyPattern> = exclude.iter().map(|p| KeyPattern::new(p)).collect();
    let before = exports.len();

    let filtered: Vec<PackageExport> = exports
        .into_iter()
        .filter(|exp| {
            let included = include.is_empty() || include.iter().any(|p| p.is_match(&exp.key));
            let excluded = exclude.iter().any(|p| p.is_match(&exp.key));
            if !included || excluded {
                trace!("Filtered out export '{}'", exp.key);
            }
            included && !excluded
        })
        .collect();

    debug!("Filtered exports: {} -> {}", before, filtered.len());
    filtered
}
