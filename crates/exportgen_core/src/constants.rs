//! Constants for file extensions, index files and directories skipped during
//! analysis.
//!
//! ## Supported Extensions
//!
//! - **TypeScript**: `.ts`, `.tsx`, `.mts` (ES module), `.cts` (CommonJS)
//! - **JavaScript**: `.js`, `.jsx`, `.mjs` (ES module), `.cjs` (CommonJS)
//!
//! Project analysis only walks [`ANALYZED_EXTENSIONS`] by default; the wider
//! [`SOURCE_EXTENSIONS`] list is used when stripping extensions from paths and
//! when resolving import specifiers.

/// Every JavaScript/TypeScript source extension the tool understands
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "ts",  // TypeScript
    "tsx", // TypeScript with JSX
    "mts", // TypeScript module
    "cts", // TypeScript CommonJS
    "js",  // JavaScript
    "jsx", // JavaScript with JSX
    "mjs", // JavaScript module
    "cjs", // JavaScript CommonJS
];

/// Extensions picked up by a project analysis unless overridden
pub const ANALYZED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Extensions to try when resolving module imports (in priority order)
pub const RESOLVE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Index file names to try when resolving directory imports
pub const INDEX_FILES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.mts",
    "index.cts",
    "index.js",
    "index.jsx",
    "index.mjs",
    "index.cjs",
];

/// Directory names never descended into
pub const IGNORED_DIRS: &[&str] = &["node_modules", "dist", "build", ".git"];

/// File name fragments marking test files (`*.test.*`, `*.spec.*`)
pub const TEST_FILE_MARKERS: &[&str] = &[".test.", ".spec."];

/// Suffix of TypeScript declaration files
pub const DECLARATION_SUFFIX: &str = ".d.ts";
