//! Composer Configuration
//!
//! Manages the composer's own settings:
//! - the registry of known plugins and their ordering constraints
//! - properties published by the cross-platform framework plugin
//!
//! Stored as TOML; every table is optional and falls back to the defaults.

use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ComposeError, Result};

/// What a plugin contributes to a project
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PluginRole {
    /// Android application plugin, enables the `android {}` block
    AndroidApplication,
    /// Android library plugin, enables the `android {}` block
    AndroidLibrary,
    /// Cross-platform framework plugin, enables the framework block and properties
    Framework,
    #[default]
    Generic,
}

impl PluginRole {
    /// Whether the plugin enables the `android { }` block
    pub fn is_android(&self) -> bool {
        matches!(self, PluginRole::AndroidApplication | PluginRole::AndroidLibrary)
    }
}

/// A plugin the composer knows about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginSpec {
    /// Canonical plugin id
    pub id: String,
    /// Alternative ids resolving to this plugin
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Plugins that must be applied before this one
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default)]
    pub role: PluginRole,
}

impl PluginSpec {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            aliases: Vec::new(),
            after: Vec::new(),
            role: PluginRole::Generic,
        }
    }

    fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    fn after(mut self, id: &str) -> Self {
        self.after.push(id.to_string());
        self
    }

    fn role(mut self, role: PluginRole) -> Self {
        self.role = role;
        self
    }

    /// Check whether `id` names this plugin
    pub fn matches(&self, id: &str) -> bool {
        self.id == id || self.aliases.iter().any(|a| a == id)
    }
}

/// Properties published by the framework plugin (`flutter.minSdkVersion` ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct FrameworkProperties {
    /// Name of the extension object and block in scripts
    pub extension: String,
    /// Plugin that publishes the properties
    pub plugin: String,
    pub compile_sdk_version: u32,
    pub min_sdk_version: u32,
    pub target_sdk_version: u32,
    pub ndk_version: String,
    pub version_code: u32,
    pub version_name: String,
}

impl Default for FrameworkProperties {
    fn default() -> Self {
        Self {
            extension: "flutter".to_string(),
            plugin: "dev.flutter.flutter-gradle-plugin".to_string(),
            compile_sdk_version: 35,
            min_sdk_version: 21,
            target_sdk_version: 35,
            ndk_version: "27.0.12077973".to_string(),
            version_code: 1,
            version_name: "1.0.0".to_string(),
        }
    }
}

/// Value of a framework property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Int(u32),
    Text(String),
}

impl FrameworkProperties {
    /// Look up a property by its script name
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "compileSdkVersion" => Some(PropertyValue::Int(self.compile_sdk_version)),
            "minSdkVersion" => Some(PropertyValue::Int(self.min_sdk_version)),
            "targetSdkVersion" => Some(PropertyValue::Int(self.target_sdk_version)),
            "ndkVersion" => Some(PropertyValue::Text(self.ndk_version.clone())),
            "versionCode" => Some(PropertyValue::Int(self.version_code)),
            "versionName" => Some(PropertyValue::Text(self.version_name.clone())),
            _ => None,
        }
    }
}

/// Main composer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComposerConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Known plugins
    pub plugins: Vec<PluginSpec>,
    /// Framework-provided properties
    pub framework: FrameworkProperties,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            plugins: default_plugins(),
            framework: FrameworkProperties::default(),
        }
    }
}

fn default_plugins() -> Vec<PluginSpec> {
    vec![
        PluginSpec::new("com.android.application").role(PluginRole::AndroidApplication),
        PluginSpec::new("com.android.library").role(PluginRole::AndroidLibrary),
        PluginSpec::new("org.jetbrains.kotlin.android").alias("kotlin-android"),
        PluginSpec::new("org.jetbrains.kotlin.kapt").alias("kotlin-kapt"),
        PluginSpec::new("org.jetbrains.kotlin.plugin.compose"),
        PluginSpec::new("dev.flutter.flutter-gradle-plugin")
            .after("com.android.application")
            .after("org.jetbrains.kotlin.android")
            .role(PluginRole::Framework),
        PluginSpec::new("dev.flutter.flutter-plugin-loader"),
        PluginSpec::new("com.google.gms.google-services").after("com.android.application"),
        PluginSpec::new("com.google.firebase.crashlytics")
            .after("com.google.gms.google-services"),
    ]
}

impl ComposerConfig {
    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        ProjectDirs::from("dev", "gradle-composer", "gradle-composer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ComposerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. When no path is given and the default
    /// file is absent, the built-in defaults are used.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::config_file() {
                Some(p) if p.exists() => p,
                _ => {
                    info!("Config file not found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading config from {:?}", config_file);
        let contents = tokio::fs::read_to_string(&config_file).await?;
        Self::from_toml_str(&contents)
    }

    /// Find the plugin registered under `id` or one of its aliases
    pub fn find_plugin(&self, id: &str) -> Option<&PluginSpec> {
        self.plugins.iter().find(|p| p.matches(id))
    }

    fn validate(&self) -> Result<()> {
        for plugin in &self.plugins {
            for required in &plugin.after {
                if self.find_plugin(required).is_none() {
                    return Err(ComposeError::Config(format!(
                        "plugin `{}` must load after unregistered plugin `{}`",
                        plugin.id, required
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ComposerConfig::default();
        assert_eq!(config.framework.min_sdk_version, 21);
        let kotlin = config.find_plugin("kotlin-android").unwrap();
        assert_eq!(kotlin.id, "org.jetbrains.kotlin.android");
        assert!(config.find_plugin("com.example.nope").is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ComposerConfig::from_toml_str(
            r#"
            [framework]
            min-sdk-version = 23
            version-name = "2.1.0"
            "#,
        )
        .unwrap();

        assert_eq!(config.framework.min_sdk_version, 23);
        assert_eq!(config.framework.compile_sdk_version, 35);
        assert_eq!(
            config.framework.get("versionName"),
            Some(PropertyValue::Text("2.1.0".into()))
        );
        assert!(config.find_plugin("com.android.application").is_some());
    }

    #[test]
    fn test_custom_plugin_registry() {
        let config = ComposerConfig::from_toml_str(
            r#"
            [[plugins]]
            id = "com.android.application"
            role = "android-application"

            [[plugins]]
            id = "io.sentry.android.gradle"
            after = ["com.android.application"]
            "#,
        )
        .unwrap();

        assert_eq!(config.plugins.len(), 2);
        assert!(config.find_plugin("kotlin-android").is_none());
    }

    #[test]
    fn test_dangling_registry_order_rejected() {
        let err = ComposerConfig::from_toml_str(
            r#"
            [[plugins]]
            id = "a"
            after = ["b"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.toml");
        std::fs::write(&path, "[framework]\ncompile-sdk-version = 34\n").unwrap();

        let config = tokio_test::block_on(ComposerConfig::load(Some(&path))).unwrap();
        assert_eq!(config.framework.compile_sdk_version, 34);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = tokio_test::block_on(ComposerConfig::load(Some(&dir.path().join("nope.toml"))));
        assert!(matches!(result, Err(ComposeError::Io(_))));
    }
}
