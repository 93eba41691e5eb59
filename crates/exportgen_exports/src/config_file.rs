//! Loading of `exports.config.*` files.
//!
//! JSON and TOML files are deserialized directly. Script configs
//! (`.ts`, `.js`, `.mjs`, `.cjs`) are parsed with oxc and their default
//! export is evaluated statically; only literal data is understood:
//!
//! ```js
//! const shared = { exclude: ["test/*"] };
//! export default defineConfig({ global: shared, packages: {} });
//! ```
//!
//! Any load failure is logged and the file is treated as absent.

use anyhow::{Context, Result, anyhow, bail};
use exportgen_core::source_type_for;
use log::{debug, info, warn};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use serde_json::{Map, Number, Value};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{config::ExportsConfigFile, constants::CONFIG_FILE_NAMES};

const MAX_DEPTH: usize = 32;

/// First conventional config file present in `dir`.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

/// Load the explicit config file, or the first one found in `cwd`.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Option<ExportsConfigFile> {
    let path = match explicit {
        Some(path) => cwd.join(path),
        None => match find_config_file(cwd) {
            Some(path) => path,
            None => {
                debug!("No configuration file found in {}", cwd.display());
                return None;
            }
        },
    };

    match read_config_file(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            Some(config)
        }
        Err(err) => {
            warn!("Ignoring configuration file {}: {:#}", path.display(), err);
            None
        }
    }
}

pub fn read_config_file(path: &Path) -> Result<ExportsConfigFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let config: ExportsConfigFile = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).context("Invalid JSON configuration")?,
        Some("toml") => toml::from_str(&content).context("Invalid TOML configuration")?,
        Some("ts" | "js" | "mjs" | "cjs" | "mts" | "cts") => {
            let value = evaluate_script_config(path, &content)?;
            serde_json::from_value(value).context("Configuration does not match the expected shape")?
        }
        _ => bail!("Unsupported configuration format"),
    };

    config.validate()?;
    Ok(config)
}

/// Statically evaluate the exported object of a script config.
pub fn evaluate_script_config(path: &Path, src: &str) -> Result<Value> {
    let allocator = Allocator::default();
    let ParserReturn { program, errors, panicked, .. } =
        OxcParser::new(&allocator, src, source_type_for(path)).parse();

    if panicked || !errors.is_empty() {
        bail!("Failed to parse {} ({} syntax errors)", path.display(), errors.len());
    }

    let mut evaluator = Evaluator::default();
    let mut exported = None;

    for stmt in &program.body {
        match stmt {
            Statement::VariableDeclaration(decl) => evaluator.declare(decl),
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(Declaration::VariableDeclaration(var)) = &decl.declaration {
                    evaluator.declare(var);
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                let expr = decl
                    .declaration
                    .as_expression()
                    .ok_or_else(|| anyhow!("Default export is not an expression"))?;
                exported = Some(evaluator.eval(expr, 0)?);
            }
            Statement::ExpressionStatement(stmt) => {
                if let Expression::AssignmentExpression(assign) = &stmt.expression
                    && is_module_exports(&assign.left)
                {
                    exported = Some(evaluator.eval(&assign.right, 0)?);
                }
            }
            _ => {}
        }
    }

    exported.ok_or_else(|| anyhow!("No default export or module.exports assignment"))
}

fn is_module_exports(target: &AssignmentTarget) -> bool {
    matches!(
        target,
        AssignmentTarget::StaticMemberExpression(member)
            if member.property.name == "exports"
                && matches!(&member.object, Expression::Identifier(id) if id.name == "module")
    )
}

/// Values of top-level `const` bindings seen so far.
#[derive(Default)]
struct Evaluator {
    bindings: HashMap<String, Value>,
}

impl Evaluator {
    fn declare(&mut self, decl: &VariableDeclaration) {
        if decl.kind != VariableDeclarationKind::Const {
            return;
        }
        for declarator in &decl.declarations {
            let (BindingPatternKind::BindingIdentifier(id), Some(init)) =
                (&declarator.id.kind, &declarator.init)
            else {
                continue;
            };
            match self.eval(init, 0) {
                Ok(value) => {
                    self.bindings.insert(id.name.to_string(), value);
                }
                Err(err) => debug!("Not a static value '{}': {:#}", id.name, err),
            }
        }
    }

    fn eval(&self, expr: &Expression, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            bail!("Configuration is nested too deeply");
        }

        match expr {
            Expression::StringLiteral(lit) => Ok(Value::String(lit.value.to_string())),
            Expression::NumericLiteral(lit) => number(lit.value),
            Expression::BooleanLiteral(lit) => Ok(Value::Bool(lit.value)),
            Expression::NullLiteral(_) => Ok(Value::Null),
            Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => {
                let text = tpl
                    .quasis
                    .iter()
                    .map(|q| q.value.cooked.as_ref().unwrap_or(&q.value.raw).to_string())
                    .collect::<String>();
                Ok(Value::String(text))
            }
            Expression::ArrayExpression(arr) => {
                let mut items = Vec::with_capacity(arr.elements.len());
                for element in &arr.elements {
                    let expr = element
                        .as_expression()
                        .ok_or_else(|| anyhow!("Unsupported array element"))?;
                    items.push(self.eval(expr, depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            Expression::ObjectExpression(obj) => {
                let mut map = Map::new();
                for prop in &obj.properties {
                    let ObjectPropertyKind::ObjectProperty(prop) = prop else {
                        bail!("Spread properties are not supported");
                    };
                    if prop.kind != PropertyKind::Init || prop.method {
                        bail!("Only plain properties are supported");
                    }
                    let key = prop
                        .key
                        .static_name()
                        .ok_or_else(|| anyhow!("Computed property keys are not supported"))?;
                    map.insert(key.to_string(), self.eval(&prop.value, depth + 1)?);
                }
                Ok(Value::Object(map))
            }
            Expression::Identifier(id) => self
                .bindings
                .get(id.name.as_str())
                .cloned()
                .ok_or_else(|| anyhow!("Unknown identifier '{}'", id.name)),
            Expression::TSAsExpression(e) => self.eval(&e.expression, depth + 1),
            Expression::TSSatisfiesExpression(e) => self.eval(&e.expression, depth + 1),
            Expression::ParenthesizedExpression(e) => self.eval(&e.expression, depth + 1),
            Expression::CallExpression(call) => match &call.arguments[..] {
                [arg] => {
                    let expr = arg
                        .as_expression()
                        .ok_or_else(|| anyhow!("Unsupported call argument"))?;
                    self.eval(expr, depth + 1)
                }
                _ => bail!("Only single-argument wrapper calls are supported"),
            },
            _ => bail!("Unsupported expression in configuration"),
        }
    }
}

fn number(value: f64) -> Result<Value> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Ok(Value::from(value as i64));
    }
    Number::from_f64(value).map(Value::Number).ok_or_else(|| anyhow!("Invalid number {}", value))
}
