use exportgen_exports::{GenerateArgs, GenerateError, ScanMode, run_generate};
use serde_json::{Value, json};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
    let file_path = dir.join(path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// packages/core: dual-format TypeScript library
/// packages/tsconfig: JSON-only package
fn monorepo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    create_test_file(
        root,
        "packages/core/package.json",
        r#"{"name": "@acme/core", "version": "1.0.0", "type": "module", "scripts": {"build": "rslib build"}}"#,
    );
    create_test_file(root, "packages/core/rslib.config.ts", "export default {};");
    create_test_file(root, "packages/core/src/index.ts", "export * from './utils/composer';");
    create_test_file(root, "packages/core/src/utils/composer.ts", "export function compose() {}");
    create_test_file(root, "packages/core/src/presets/react.js", "export const react = {};");
    create_test_file(root, "packages/core/src/presets/react.test.ts", "");

    create_test_file(root, "packages/tsconfig/package.json", r#"{"name": "@acme/tsconfig", "version": "2.0.0"}"#);
    create_test_file(root, "packages/tsconfig/base.json", "{}");
    create_test_file(root, "packages/tsconfig/strict.json", "{}");

    temp_dir
}

fn generate(args: &GenerateArgs, cwd: &Path) -> anyhow::Result<String> {
    colored::control::set_override(false);
    let mut out = Vec::new();
    run_generate(args, cwd, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_generate_all_packages() {
    let temp_dir = monorepo();
    let root = temp_dir.path();

    let out = generate(&GenerateArgs::default(), root).unwrap();
    assert!(out.contains("✓ Updated exports for @acme/core"));
    assert!(out.contains("✓ Updated exports for @acme/tsconfig"));

    let core = read_json(&root.join("packages/core/package.json"));
    assert_eq!(
        core["exports"],
        json!({
            ".": {
                "import": {"default": "./dist/esm/index.js", "types": "./dist/esm/index.d.ts"},
                "require": {"default": "./dist/cjs/index.cjs", "types": "./dist/cjs/index.d.ts"}
            },
            "./presets/react": {
                "import": {"default": "./dist/esm/presets/react.js"},
                "require": {"default": "./dist/cjs/presets/react.cjs"}
            },
            "./utils/composer": {
                "import": {"default": "./dist/esm/utils/composer.js", "types": "./dist/esm/utils/composer.d.ts"},
                "require": {"default": "./dist/cjs/utils/composer.cjs", "types": "./dist/cjs/utils/composer.d.ts"}
            }
        })
    );
    assert_eq!(core["scripts"]["build"], "rslib build");
    assert_eq!(core["type"], "module");

    let keys: Vec<&String> = core["exports"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec![".", "./presets/react", "./utils/composer"]);

    let tsconfig = read_json(&root.join("packages/tsconfig/package.json"));
    assert_eq!(
        tsconfig["exports"],
        json!({".": "./base.json", "./base": "./base.json", "./strict": "./strict.json"})
    );
}

#[test]
fn test_written_manifest_format() {
    let temp_dir = monorepo();
    let root = temp_dir.path();
    let args = GenerateArgs { package: Some("tsconfig".to_string()), ..Default::default() };
    generate(&args, root).unwrap();

    let written = fs::read_to_string(root.join("packages/tsconfig/package.json")).unwrap();
    assert!(written.starts_with("{\n  \"name\": \"@acme/tsconfig\",\n  \"version\": \"2.0.0\",\n  \"exports\": {\n    \".\": \"./base.json\","));
    assert!(written.ends_with("}\n"));
}

#[test]
fn test_single_format_and_filters() {
    let temp_dir = monorepo();
    let root = temp_dir.path();
    let args = GenerateArgs {
        package: Some("core".to_string()),
        no_dual_format: true,
        exclude: Some(vec!["presets/*".to_string()]),
        ..Default::default()
    };
    generate(&args, root).unwrap();

    let core = read_json(&root.join("packages/core/package.json"));
    assert_eq!(
        core["exports"],
        json!({".": "./dist/esm/index.js", "./utils/composer": "./dist/esm/utils/composer.js"})
    );
}

#[test]
fn test_config_file_and_mappings() {
    let temp_dir = monorepo();
    let root = temp_dir.path();
    create_test_file(
        root,
        "exports.config.json",
        r#"{
            "global": {"exportPriorities": {"./utils": 1}},
            "packages": {"@acme/core": {"mappings": {"./compose": "./utils/composer", "./gone": "./missing"}}}
        }"#,
    );

    let args = GenerateArgs { package: Some("core".to_string()), dry_run: true, ..Default::default() };
    let out = generate(&args, root).unwrap();

    let json_start = out.find("{\n").unwrap();
    let json_end = out.rfind('}').unwrap();
    let printed: Value = serde_json::from_str(&out[json_start..=json_end]).unwrap();
    let keys: Vec<&String> = printed.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec![".", "./utils/composer", "./presets/react", "./compose"]);
    assert_eq!(printed["./compose"], printed["./utils/composer"]);

    let core = read_json(&root.join("packages/core/package.json"));
    assert!(core.get("exports").is_none());
}

#[test]
fn test_cli_patterns_replace_config_patterns() {
    let temp_dir = monorepo();
    let root = temp_dir.path();
    create_test_file(root, "exports.config.json", r#"{"global": {"include": ["presets"]}}"#);

    let args = GenerateArgs {
        package: Some("core".to_string()),
        include: Some(vec!["utils".to_string()]),
        ..Default::default()
    };
    generate(&args, root).unwrap();

    let core = read_json(&root.join("packages/core/package.json"));
    let keys: Vec<&String> = core["exports"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec![".", "./utils/composer"]);
}

#[test]
fn test_backup() {
    let temp_dir = monorepo();
    let root = temp_dir.path();
    let original = fs::read_to_string(root.join("packages/core/package.json")).unwrap();

    let args = GenerateArgs { package: Some("core".to_string()), backup: true, ..Default::default() };
    let mut out = Vec::new();
    let report = run_generate(&args, root, &mut out).unwrap();

    let backup = report.packages[0].backup.clone().unwrap();
    assert_eq!(backup.parent().unwrap(), root.join("packages/core"));
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
}

#[test]
fn test_precise_mode() {
    let temp_dir = monorepo();
    let root = temp_dir.path();
    create_test_file(root, "packages/core/src/utils/cycle-a.ts", "import { b } from './cycle-b';\nexport const a = 1;");
    create_test_file(root, "packages/core/src/utils/cycle-b.ts", "import { a } from './cycle-a';\nexport const b = 2;");

    let args = GenerateArgs {
        package: Some("core".to_string()),
        precise: true,
        dry_run: true,
        ..Default::default()
    };
    colored::control::set_override(false);
    let mut out = Vec::new();
    let report = run_generate(&args, root, &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    let package = &report.packages[0];
    assert_eq!(package.scan_mode, ScanMode::Precise);
    assert!(package.record.contains_key("."));
    assert!(package.record.contains_key("./utils/composer/compose"));
    assert!(package.record.contains_key("./presets/react/react"));
    assert!(out.contains("circular dependency detected"));
}

#[test]
fn test_missing_package() {
    let temp_dir = monorepo();
    let args = GenerateArgs { package: Some("nope".to_string()), ..Default::default() };
    let err = generate(&args, temp_dir.path()).unwrap_err();
    assert!(matches!(err.downcast_ref::<GenerateError>(), Some(GenerateError::Discovery(_))));
}

#[test]
fn test_failure_aborts_remaining_packages() {
    let temp_dir = monorepo();
    let root = temp_dir.path();
    create_test_file(root, "packages/aaa/package.json", r#"{"name": "", "version": "1.0.0"}"#);

    assert!(generate(&GenerateArgs::default(), root).is_err());
    let core = read_json(&root.join("packages/core/package.json"));
    assert!(core.get("exports").is_none());
}
