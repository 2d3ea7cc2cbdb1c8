//! `settings.gradle.kts`
//!
//! Declares the project tree (`include`), the root project's name and
//! plugin management. The loader only needs the include list; the composer
//! interprets the whole script.

use std::path::{Path, PathBuf};
use gradle_composer_core::{ComposerConfig, Result, SchemaError};
use gradle_composer_dsl::{Arg, Expr, Script, Statement, StatementKind};
use serde::Serialize;
use tracing::debug;

use crate::eval::{invalid, join_field, unknown, Evaluator};
use crate::plugins::{parse_plugins, PluginReference, PluginRegistry};
use crate::relocation::normalize_path;
use crate::repositories::{describe_statement, parse_repositories, Repository};

/// Field prefix for settings errors
pub const SETTINGS_FIELD: &str = "settings";

/// Interpreted settings script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// `rootProject.name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_name: Option<String>,
    /// Project paths as written in `include(...)`, `:`-prefixed
    pub includes: Vec<String>,
    /// `pluginManagement { includeBuild(...) }` directories
    pub included_builds: Vec<PathBuf>,
    pub plugin_repositories: Vec<Repository>,
    pub repositories: Vec<Repository>,
    pub plugins: Vec<PluginReference>,
}

impl Settings {
    /// Interpret a settings script located in `root_dir`
    pub fn from_script(script: &Script, config: &ComposerConfig, root_dir: &Path) -> Result<Self> {
        let eval = Evaluator::new(config, false);
        let registry = PluginRegistry::new(config);
        let mut settings = Settings::default();

        for statement in &script.statements {
            if let StatementKind::Assign { target, value } = &statement.kind {
                if target.as_slice() == ["rootProject", "name"] {
                    let field = join_field(SETTINGS_FIELD, "rootProject.name");
                    settings.root_name = Some(eval.string(value, &field)?);
                    continue;
                }
                return Err(unknown(SETTINGS_FIELD, &target.join(".")));
            }

            let call = match statement.chain() {
                Some([call]) => call,
                _ => return Err(unknown(SETTINGS_FIELD, &describe_statement(statement))),
            };
            let field = join_field(SETTINGS_FIELD, &call.name);
            let body = call.block.as_deref().unwrap_or(&[]);

            match call.name.as_str() {
                "include" => {
                    for path in include_args(call.args(), &field)? {
                        if !settings.includes.contains(&path) {
                            settings.includes.push(path);
                        }
                    }
                }
                "pluginManagement" => settings.plugin_management(body, &eval, root_dir, &field)?,
                "dependencyResolutionManagement" => {
                    for statement in body {
                        match statement.chain() {
                            Some([repos]) if repos.name == "repositories" => {
                                let repos_field = join_field(&field, "repositories");
                                let inner = repos.block.as_deref().unwrap_or(&[]);
                                settings.repositories = parse_repositories(inner, &eval, &repos_field)?;
                            }
                            _ => return Err(unknown(&field, &describe_statement(statement))),
                        }
                    }
                }
                "plugins" => {
                    let declarations = parse_plugins(body, &field)?;
                    settings.plugins = registry.resolve(&declarations, &field)?;
                }
                other => return Err(unknown(SETTINGS_FIELD, other)),
            }
        }

        debug!("Settings include {:?}", settings.includes);
        Ok(settings)
    }

    fn plugin_management(
        &mut self,
        body: &[Statement],
        eval: &Evaluator<'_>,
        root_dir: &Path,
        field: &str,
    ) -> Result<()> {
        for statement in body {
            let call = match statement.chain() {
                Some([call]) => call,
                _ => return Err(unknown(field, &describe_statement(statement))),
            };
            match call.name.as_str() {
                "repositories" => {
                    let inner = call.block.as_deref().unwrap_or(&[]);
                    self.plugin_repositories =
                        parse_repositories(inner, eval, &join_field(field, "repositories"))?;
                }
                "includeBuild" => {
                    let build_field = join_field(field, "includeBuild");
                    let path = call
                        .single_arg()
                        .ok_or_else(|| invalid(&build_field, "a directory", &Expr::Chain(vec![call.clone()])))?;
                    let path = eval.string(path, &build_field)?;
                    self.included_builds.push(normalize_path(&root_dir.join(path)));
                }
                other => return Err(unknown(field, other)),
            }
        }
        Ok(())
    }
}

/// Every project the `include(...)` calls of a settings script create.
///
/// Including `:feature:login` also creates `:feature`, listed ahead of its
/// first child.
pub fn included_projects(script: &Script) -> Result<Vec<String>> {
    let mut projects: Vec<String> = Vec::new();
    for statement in &script.statements {
        if let Some([call]) = statement.chain() {
            if call.name == "include" {
                for path in include_args(call.args(), &join_field(SETTINGS_FIELD, "include"))? {
                    for project in with_parents(&path) {
                        if !projects.contains(&project) {
                            projects.push(project);
                        }
                    }
                }
            }
        }
    }
    Ok(projects)
}

/// `:a:b:c` -> `:a`, `:a:b`, `:a:b:c`
fn with_parents(path: &str) -> impl Iterator<Item = String> + '_ {
    path.match_indices(':')
        .skip(1)
        .map(move |(index, _)| path[..index].to_string())
        .chain(std::iter::once(path.to_string()))
}

fn include_args(args: &[Arg], field: &str) -> Result<Vec<String>> {
    args.iter()
        .map(|arg| -> Result<String> {
            let path = arg
                .value
                .as_str()
                .ok_or_else(|| invalid(field, "a project path", &arg.value))?;
            canonical_project_path(path).ok_or_else(|| {
                SchemaError::InvalidValue {
                    field: field.to_string(),
                    message: format!("`{}` is not a valid project path", path),
                }
                .into()
            })
        })
        .collect()
}

/// `app` -> `:app`; rejects empty segments
pub fn canonical_project_path(path: &str) -> Option<String> {
    let trimmed = path.strip_prefix(':').unwrap_or(path);
    if trimmed.is_empty() || trimmed.split(':').any(|part| part.trim().is_empty()) {
        return None;
    }
    Some(format!(":{}", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::ErrorKind;
    use gradle_composer_dsl::Parser;

    const SETTINGS: &str = r#"
pluginManagement {
    includeBuild("../flutter/packages/flutter_tools/gradle")
    repositories {
        google()
        mavenCentral()
        gradlePluginPortal()
    }
}

plugins {
    id("dev.flutter.flutter-plugin-loader") version "1.0.0"
    id("com.android.application") version "8.7.0" apply false
    id("org.jetbrains.kotlin.android") version "2.1.0" apply false
}

rootProject.name = "flaviocodigos"
include(":app")
include("feature:login", ":app")
"#;

    #[test]
    fn test_implicit_parent_projects() {
        assert_eq!(with_parents(":app").collect::<Vec<_>>(), vec![":app"]);
        assert_eq!(
            with_parents(":a:b:c").collect::<Vec<_>>(),
            vec![":a", ":a:b", ":a:b:c"]
        );

        let script = Parser::parse_str("include(\":libs:core\", \":libs\", \":libs:ui\")").unwrap();
        assert_eq!(included_projects(&script).unwrap(), vec![":libs", ":libs:core", ":libs:ui"]);
    }

    #[test]
    fn test_settings_script() {
        let config = ComposerConfig::default();
        let script = Parser::parse_str(SETTINGS).unwrap();
        let settings = Settings::from_script(&script, &config, Path::new("/work/android")).unwrap();

        assert_eq!(settings.root_name.as_deref(), Some("flaviocodigos"));
        assert_eq!(settings.includes, vec![":app", ":feature:login"]);
        assert_eq!(
            settings.included_builds,
            vec![PathBuf::from("/work/flutter/packages/flutter_tools/gradle")]
        );
        assert_eq!(settings.plugin_repositories.len(), 3);
        assert_eq!(settings.plugins.len(), 3);
        assert!(!settings.plugins[1].apply);

        assert_eq!(
            included_projects(&script).unwrap(),
            vec![":app", ":feature", ":feature:login"]
        );
    }

    #[test]
    fn test_project_paths() {
        assert_eq!(canonical_project_path("app").as_deref(), Some(":app"));
        assert_eq!(canonical_project_path(":a:b").as_deref(), Some(":a:b"));
        assert!(canonical_project_path(":").is_none());
        assert!(canonical_project_path("a::b").is_none());
    }

    #[test]
    fn test_settings_errors() {
        let config = ComposerConfig::default();
        let root = Path::new("/work");

        let script = Parser::parse_str("include(\"::\")").unwrap();
        let err = Settings::from_script(&script, &config, root).unwrap_err();
        assert_eq!(err.field(), Some("settings.include"));

        let script = Parser::parse_str("enableFeaturePreview(\"TYPESAFE_PROJECT_ACCESSORS\")").unwrap();
        let err = Settings::from_script(&script, &config, root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.field(), Some("settings.enableFeaturePreview"));
    }
}
