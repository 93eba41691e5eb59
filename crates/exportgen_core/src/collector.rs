use anyhow::Result;
use ignore::WalkBuilder;
use log::{debug, trace};
use std::path::{Path, PathBuf};

use crate::constants::{ANALYZED_EXTENSIONS, IGNORED_DIRS, TEST_FILE_MARKERS};

pub struct CollectorConfig {
    pub root: PathBuf,
    /// Extensions (without the dot) of files to collect
    pub extensions: Vec<String>,
    pub skip_tests: bool,
    /// Directory names never descended into
    pub ignored_dirs: Vec<String>,
}

impl CollectorConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: ANALYZED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            skip_tests: true,
            ignored_dirs: IGNORED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Walk `cfg.root` and return every matching source file, sorted.
pub fn collect_source_files(cfg: &CollectorConfig) -> Result<Vec<PathBuf>> {
    debug!("Collecting source files under {}", cfg.root.display());
    let ignored = cfg.ignored_dirs.clone();
    let walker = WalkBuilder::new(&cfg.root)
        .standard_filters(false)
        .hidden(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && entry.depth() > 0 && ignored.iter().any(|d| entry.file_name() == d.as_str()))
        })
        .build();

    let mut files: Vec<PathBuf> = Vec::new();
    for res in walker {
        let dent = res?;
        let p = dent.path();
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        if cfg.skip_tests && is_test_file(p) {
            trace!("Skipping test file: {}", p.display());
            continue;
        }

        if let Some(ext) = p.extension().and_then(|e| e.to_str())
            && cfg.extensions.iter().any(|e| e == ext)
        {
            trace!("Collected source file: {}", p.display());
            files.push(p.to_path_buf());
        }
    }

    files.sort();
    debug!("Collected {} source files", files.len());
    Ok(files)
}

pub fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    TEST_FILE_MARKERS.iter().any(|m| name.contains(m))
}
