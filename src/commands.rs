//! CLI commands for Gradle Composer
//!
//! Each command loads the composer configuration, reads the project tree and
//! composes it. Output rendering stays here so the library crates never print.

use std::fmt;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::ValueEnum;
use gradle_composer_core::{ComposeError, ComposerConfig};
use gradle_composer_engine::{compose_dir, BuildPlan};
use tracing::info;

/// Plan output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// TOML document
    Toml,
}

/// `compose`: print the resolved build plan
pub struct ComposeCommand {
    /// Root project directory
    pub project_path: PathBuf,
    /// Output format
    pub format: OutputFormat,
    /// Explicit composer configuration file
    pub config_path: Option<PathBuf>,
}

impl ComposeCommand {
    /// Execute the compose command, returning the rendered plan
    pub async fn execute(&self) -> Result<String> {
        let plan = compose(&self.project_path, self.config_path.as_deref()).await?;
        let rendered = match self.format {
            OutputFormat::Json => plan.to_json().context("failed to render plan as JSON")?,
            OutputFormat::Toml => plan.to_toml().context("failed to render plan as TOML")?,
        };
        Ok(rendered)
    }
}

/// `check`: validate without printing the plan
pub struct CheckCommand {
    /// Root project directory
    pub project_path: PathBuf,
    /// Explicit composer configuration file
    pub config_path: Option<PathBuf>,
}

/// Summary of a successful check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Project paths in evaluation order
    pub evaluation_order: Vec<String>,
    /// Number of directory relocations applied
    pub relocations: usize,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ok: {} project(s) [{}], {} relocation(s)",
            self.evaluation_order.len(),
            self.evaluation_order.join(", "),
            self.relocations
        )
    }
}

impl CheckCommand {
    /// Execute the check command
    pub async fn execute(&self) -> Result<CheckReport> {
        let plan = compose(&self.project_path, self.config_path.as_deref()).await?;
        Ok(CheckReport {
            evaluation_order: plan.evaluation_order.clone(),
            relocations: plan.relocations.len(),
        })
    }
}

async fn compose(project_path: &Path, config_path: Option<&Path>) -> Result<BuildPlan> {
    let config = ComposerConfig::load(config_path)
        .await
        .context("failed to load composer configuration")?;

    info!("Composing project: {:?}", project_path);
    let plan = compose_dir(&config, project_path)
        .await
        .with_context(|| format!("failed to compose {}", project_path.display()))?;
    Ok(plan)
}

/// One-line description of a failure: taxonomy class, field and message
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ComposeError>() {
        Some(compose_err) => match compose_err.field() {
            Some(field) => format!("{:?} error at `{}`: {}", compose_err.kind(), field, compose_err),
            None => format!("{:?} error: {}", compose_err.kind(), compose_err),
        },
        None => format!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use gradle_composer_core::ErrorKind;
    use tempfile::TempDir;

    const APP_SCRIPT: &str = r#"
plugins {
    id("com.android.application")
}

android {
    namespace = "com.example.app"
    compileSdk = 34
    defaultConfig {
        applicationId = "com.example.app"
        minSdk = 21
    }
    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("SIGNING")
        }
    }
}
"#;

    fn project(signing: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("settings.gradle.kts"), "include(\":app\")").unwrap();
        fs::write(root.join("build.gradle.kts"), "allprojects {\n repositories { google() }\n}").unwrap();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app").join("build.gradle.kts"), APP_SCRIPT.replace("SIGNING", signing)).unwrap();
        temp
    }

    fn compose_command(root: &Path, format: OutputFormat) -> ComposeCommand {
        let config_path = root.join("composer.toml");
        fs::write(&config_path, "").unwrap();
        ComposeCommand {
            project_path: root.to_path_buf(),
            format,
            config_path: Some(config_path),
        }
    }

    #[test]
    fn test_compose_renders_json_and_toml() {
        let temp = project("debug");

        let json = tokio_test::block_on(compose_command(temp.path(), OutputFormat::Json).execute()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["evaluationOrder"], serde_json::json!([":", ":app"]));
        assert_eq!(value["projects"][":app"]["android"]["compileSdk"], 34);

        let toml = tokio_test::block_on(compose_command(temp.path(), OutputFormat::Toml).execute()).unwrap();
        assert!(toml.contains("evaluationOrder"));

        let again = tokio_test::block_on(compose_command(temp.path(), OutputFormat::Json).execute()).unwrap();
        assert_eq!(json, again);
    }

    #[test]
    fn test_check_reports_offending_field() {
        let temp = project("release-missing");
        let config_path = temp.path().join("composer.toml");
        fs::write(&config_path, "").unwrap();
        let check = CheckCommand {
            project_path: temp.path().to_path_buf(),
            config_path: Some(config_path),
        };

        let err = tokio_test::block_on(check.execute()).unwrap_err();
        let compose_err = err.downcast_ref::<ComposeError>().unwrap();
        assert_eq!(compose_err.kind(), ErrorKind::Reference);
        assert_eq!(compose_err.field(), Some("android.buildTypes.release.signingConfig"));

        let message = describe_error(&err);
        assert!(message.contains("release-missing"));
        assert!(message.contains("android.buildTypes.release.signingConfig"));
    }

    #[test]
    fn test_check_report_display() {
        let temp = project("debug");
        let check = CheckCommand {
            project_path: temp.path().to_path_buf(),
            config_path: Some(compose_command(temp.path(), OutputFormat::Json).config_path.unwrap()),
        };
        let report = tokio_test::block_on(check.execute()).unwrap();
        assert_eq!(report.evaluation_order, vec![":".to_string(), ":app".to_string()]);
        assert_eq!(report.to_string(), "ok: 2 project(s) [:, :app], 0 relocation(s)");
    }
}
