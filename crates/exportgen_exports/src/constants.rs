//! Fixed file names, glob patterns and defaults of the export pipeline.

/// Source globs matched by the fast scanner, relative to the package root
pub const DEFAULT_SOURCE_PATTERNS: &[&str] =
    &["src/**/*.ts", "src/**/*.js", "lib/**/*.ts", "lib/**/*.js"];

/// Files and directories never turned into exports by the fast scanner
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "**/*.test.ts",
    "**/*.test.js",
    "**/*.spec.ts",
    "**/*.spec.js",
    "**/*.d.ts",
    "**/tests/**",
    "**/test/**",
    "**/__tests__/**",
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
];

/// Bundler configs whose presence marks a package as dual-format
pub const BUNDLER_CONFIGS: &[&str] = &[
    "rslib.config.ts",
    "rslib.config.js",
    "rollup.config.ts",
    "rollup.config.js",
    "webpack.config.ts",
    "webpack.config.js",
];

/// Root JSON files that are tooling, not package content
pub const IGNORED_JSON_FILES: &[&str] =
    &["package.json", "package-lock.json", "tsconfig.json", "jest.config.json"];

/// Keys tried, in order, when the main export "." is missing
pub const MAIN_EXPORT_CANDIDATES: &[&str] =
    &["./index", "./main", "./base", "./src/index", "./lib/index"];

/// Key fragments suggesting a main entry point
pub const MAIN_EXPORT_HINTS: &[&str] = &["base", "index", "main", "default"];

pub const MAIN_EXPORT_KEY: &str = ".";

/// Priority of keys without a matching `exportPriorities` prefix
pub const DEFAULT_PRIORITY: i64 = 99;

pub const DEFAULT_DIST_DIR: &str = "./dist";
pub const DEFAULT_ESM_DIR: &str = "esm";
pub const DEFAULT_CJS_DIR: &str = "cjs";
pub const DEFAULT_ESM_EXTENSION: &str = ".js";
pub const DEFAULT_CJS_EXTENSION: &str = ".cjs";
pub const DEFAULT_TYPES_EXTENSION: &str = ".d.ts";

/// Configuration files looked up in the working directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "exports.config.json",
    "exports.config.toml",
    "exports.config.ts",
    "exports.config.js",
    "exports.config.mjs",
    "exports.config.cjs",
];

/// Monorepo directory holding one package per subdirectory
pub const PACKAGES_DIR: &str = "packages";

pub const MANIFEST_FILE: &str = "package.json";

/// Backups are written as `package.json.backup.<epoch-ms>`
pub const BACKUP_INFIX: &str = ".backup.";
