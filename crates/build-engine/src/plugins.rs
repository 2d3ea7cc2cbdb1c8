//! Plugin Resolution
//!
//! Reads `plugins { }` blocks and checks them against the composer's plugin
//! registry: unknown ids are rejected, aliases are canonicalised and
//! ordering constraints between applied plugins are enforced.

use gradle_composer_core::{ComposerConfig, PluginRole, ReferenceError, Result, SchemaError};
use gradle_composer_dsl::{Expr, Statement, StatementKind};
use serde::Serialize;
use tracing::debug;

use crate::dependencies::is_valid_version;
use crate::eval::{invalid, join_field, unknown};
use crate::repositories::describe_statement;

/// A plugin as written in a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDeclaration {
    pub id: String,
    pub version: Option<String>,
    pub apply: bool,
}

/// A plugin after registry lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginReference {
    /// Canonical id
    pub id: String,
    /// Id as written, when it was an alias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub apply: bool,
    /// Plugins this one must be applied after
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
    #[serde(skip)]
    pub role: PluginRole,
}

/// Parse the body of a `plugins { }` block
pub fn parse_plugins(body: &[Statement], field: &str) -> Result<Vec<PluginDeclaration>> {
    body.iter()
        .map(|statement| match &statement.kind {
            StatementKind::Expr(expr) => declaration(expr, field),
            _ => Err(unknown(field, &describe_statement(statement))),
        })
        .collect()
}

fn declaration(expr: &Expr, field: &str) -> Result<PluginDeclaration> {
    match expr {
        Expr::Infix { lhs, op, rhs } => {
            let mut decl = declaration(lhs, field)?;
            match op.as_str() {
                "version" => {
                    let version = rhs
                        .as_str()
                        .ok_or_else(|| invalid(&join_field(field, "version"), "a version string", rhs))?;
                    if !is_valid_version(version) {
                        return Err(SchemaError::InvalidVersion {
                            field: join_field(field, &decl.id),
                            version: version.to_string(),
                        }
                        .into());
                    }
                    decl.version = Some(version.to_string());
                }
                _ => match rhs.as_ref() {
                    Expr::Bool(apply) => decl.apply = *apply,
                    other => return Err(invalid(&join_field(field, "apply"), "`true` or `false`", other)),
                },
            }
            Ok(decl)
        }
        Expr::Chain(segments) => {
            let id = match segments.as_slice() {
                [call] if call.block.is_none() => match (call.name.as_str(), call.single_arg()) {
                    ("id", Some(Expr::Str(id))) => id.clone(),
                    ("kotlin", Some(Expr::Str(module))) => format!("org.jetbrains.kotlin.{}", module),
                    _ => return Err(unknown(field, &expr.describe())),
                },
                _ => return Err(unknown(field, &expr.describe())),
            };
            Ok(PluginDeclaration {
                id,
                version: None,
                apply: true,
            })
        }
        _ => Err(unknown(field, &expr.describe())),
    }
}

/// Registry-backed plugin resolver
pub struct PluginRegistry<'a> {
    config: &'a ComposerConfig,
}

impl<'a> PluginRegistry<'a> {
    /// Registry over the plugins known to `config`
    pub fn new(config: &'a ComposerConfig) -> Self {
        Self { config }
    }

    /// Canonicalise declarations and enforce ordering between applied plugins
    pub fn resolve(&self, declarations: &[PluginDeclaration], field: &str) -> Result<Vec<PluginReference>> {
        let mut resolved: Vec<PluginReference> = Vec::with_capacity(declarations.len());

        for decl in declarations {
            let spec = self.config.find_plugin(&decl.id).ok_or_else(|| SchemaError::UnknownPlugin {
                id: decl.id.clone(),
                field: field.to_string(),
            })?;

            if resolved.iter().any(|p| p.id == spec.id) {
                return Err(SchemaError::Duplicate {
                    field: field.to_string(),
                    name: spec.id.clone(),
                }
                .into());
            }

            if decl.apply {
                for required in &spec.after {
                    let required_id = self
                        .config
                        .find_plugin(required)
                        .map(|r| r.id.as_str())
                        .unwrap_or(required.as_str());
                    let applied_before = resolved.iter().any(|p| p.apply && p.id == required_id);
                    if !applied_before {
                        return Err(ReferenceError::PluginOrder {
                            plugin: spec.id.clone(),
                            required: required_id.to_string(),
                            field: join_field(field, &spec.id),
                        }
                        .into());
                    }
                }
            }

            debug!("Plugin {} (apply = {})", spec.id, decl.apply);
            resolved.push(PluginReference {
                id: spec.id.clone(),
                declared_as: (decl.id != spec.id).then(|| decl.id.clone()),
                version: decl.version.clone(),
                apply: decl.apply,
                after: spec.after.clone(),
                role: spec.role,
            });
        }

        Ok(resolved)
    }
}

/// Whether any applied plugin has the given role
pub fn has_role(plugins: &[PluginReference], pred: impl Fn(PluginRole) -> bool) -> bool {
    plugins.iter().any(|p| p.apply && pred(p.role))
}
