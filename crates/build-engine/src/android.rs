//! Android Extension
//!
//! Interprets a project's `android { }` block: identity (namespace,
//! application id), SDK levels, Java compatibility, signing configs and the
//! per-variant override table. Missing required values and dangling
//! signing-config references are reported with the full field path, e.g.
//! `android.buildTypes.release.signingConfig`.

use std::path::{Path, PathBuf};
use gradle_composer_core::{ReferenceError, Result, SchemaError};
use gradle_composer_dsl::{Expr, Segment, Statement, StatementKind};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::eval::{invalid, join_field, unknown, Evaluator, JavaVersion};
use crate::relocation::normalize_path;
use crate::repositories::describe_statement;
use crate::signing::{parse_signing_configs, SigningConfig, DEBUG_SIGNING_CONFIG};

static PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").unwrap());

/// Plugin that provides the `android { }` extension for applications
pub const APPLICATION_PLUGIN: &str = "com.android.application";

/// Variants every Android project has without declaring them
pub const IMPLICIT_BUILD_TYPES: [&str; 2] = ["debug", "release"];

/// `compileOptions { }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_compatibility: Option<JavaVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_compatibility: Option<JavaVersion>,
    pub core_library_desugaring: bool,
}

/// `kotlinOptions { }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KotlinOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm_target: Option<String>,
}

/// Resolved `defaultConfig { }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    pub min_sdk: u32,
    pub target_sdk: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_instrumentation_runner: Option<String>,
    pub multi_dex_enabled: bool,
}

/// A single override value in a build type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Bool(bool),
    Text(String),
    Files(Vec<String>),
}

/// Per-variant overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildVariantConfig {
    pub name: String,
    /// Name of a declared signing config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_config: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub overrides: IndexMap<String, OverrideValue>,
}

impl BuildVariantConfig {
    /// Variant with no overrides
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            signing_config: None,
            overrides: IndexMap::new(),
        }
    }
}

/// Which Android plugin the project applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AndroidKind {
    Application,
    Library,
}

/// Fully resolved `android { }` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidExtension {
    pub kind: AndroidKind,
    pub namespace: String,
    pub compile_sdk: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,
    pub compile_options: CompileOptions,
    pub kotlin_options: KotlinOptions,
    pub default_config: DefaultConfig,
    pub signing_configs: IndexMap<String, SigningConfig>,
    pub build_types: IndexMap<String, BuildVariantConfig>,
}

#[derive(Default)]
struct DefaultConfigDraft {
    application_id: Option<String>,
    min_sdk: Option<u32>,
    target_sdk: Option<u32>,
    version_code: Option<u32>,
    version_name: Option<String>,
    test_instrumentation_runner: Option<String>,
    multi_dex_enabled: bool,
}

/// Accumulates assignments before required fields are checked
struct Draft<'a> {
    eval: &'a Evaluator<'a>,
    project_dir: &'a Path,
    kind: AndroidKind,
    namespace: Option<String>,
    compile_sdk: Option<u32>,
    ndk_version: Option<String>,
    compile_options: CompileOptions,
    kotlin_options: KotlinOptions,
    default_config: DefaultConfigDraft,
    signing_configs: IndexMap<String, SigningConfig>,
    build_types: IndexMap<String, BuildVariantConfig>,
}

impl AndroidExtension {
    /// Interpret an `android { }` block.
    ///
    /// `field` is the path of the block itself, normally `android`.
    pub fn from_block(
        body: &[Statement],
        eval: &Evaluator<'_>,
        kind: AndroidKind,
        project_dir: &Path,
        field: &str,
    ) -> Result<Self> {
        let mut signing_configs = IndexMap::new();
        let mut build_types = IndexMap::new();
        for name in IMPLICIT_BUILD_TYPES {
            build_types.insert(name.to_string(), BuildVariantConfig::new(name));
        }
        if kind == AndroidKind::Application {
            signing_configs.insert(DEBUG_SIGNING_CONFIG.to_string(), SigningConfig::debug());
            if let Some(debug) = build_types.get_mut("debug") {
                debug.signing_config = Some(DEBUG_SIGNING_CONFIG.to_string());
            }
        }

        let mut draft = Draft {
            eval,
            project_dir,
            kind,
            namespace: None,
            compile_sdk: None,
            ndk_version: None,
            compile_options: CompileOptions::default(),
            kotlin_options: KotlinOptions::default(),
            default_config: DefaultConfigDraft::default(),
            signing_configs,
            build_types,
        };

        for statement in body {
            draft.statement(statement, field)?;
        }
        draft.finish(field)
    }

    /// Effective application id for a variant, including its suffix
    pub fn application_id_for(&self, variant: &str) -> Option<String> {
        let base = self.default_config.application_id.as_ref()?;
        let suffix = self
            .build_types
            .get(variant)
            .and_then(|bt| bt.overrides.get("applicationIdSuffix"));
        match suffix {
            Some(OverrideValue::Text(suffix)) => Some(format!("{}{}", base, suffix)),
            _ => Some(base.clone()),
        }
    }
}

impl<'a> Draft<'a> {
    fn statement(&mut self, statement: &Statement, field: &str) -> Result<()> {
        match &statement.kind {
            StatementKind::Assign { target, value } if target.len() == 1 => {
                let name = target[0].as_str();
                let prop_field = join_field(field, name);
                match name {
                    "namespace" => self.namespace = Some(self.package(value, &prop_field)?),
                    "compileSdk" => self.compile_sdk = Some(self.eval.positive(value, &prop_field)?),
                    "ndkVersion" => self.ndk_version = Some(self.eval.string(value, &prop_field)?),
                    other => return Err(unknown(field, other)),
                }
                Ok(())
            }
            StatementKind::Expr(_) => {
                let block = match statement.chain() {
                    Some([segment]) if segment.args.is_none() => segment,
                    _ => return Err(unknown(field, &describe_statement(statement))),
                };
                let body = block.block.as_deref().unwrap_or(&[]);
                let block_field = join_field(field, &block.name);
                match block.name.as_str() {
                    "compileOptions" => self.compile_options(body, &block_field),
                    "kotlinOptions" => self.kotlin_options(body, &block_field),
                    "defaultConfig" => self.default_config(body, &block_field),
                    "signingConfigs" => parse_signing_configs(
                        body,
                        self.eval,
                        self.project_dir,
                        &mut self.signing_configs,
                        &block_field,
                    ),
                    "buildTypes" => self.build_types(body, &block_field),
                    other => Err(unknown(field, other)),
                }
            }
            _ => Err(unknown(field, &describe_statement(statement))),
        }
    }

    fn package(&self, value: &Expr, field: &str) -> Result<String> {
        let text = self.eval.string(value, field)?;
        if !PACKAGE_RE.is_match(&text) {
            return Err(SchemaError::InvalidValue {
                field: field.to_string(),
                message: format!("`{}` is not a valid package name", text),
            }
            .into());
        }
        Ok(text)
    }

    fn compile_options(&mut self, body: &[Statement], field: &str) -> Result<()> {
        for (name, value) in assignments(body, field)? {
            let prop_field = join_field(field, name);
            match name {
                "sourceCompatibility" => {
                    self.compile_options.source_compatibility = Some(self.eval.java_version(value, &prop_field)?)
                }
                "targetCompatibility" => {
                    self.compile_options.target_compatibility = Some(self.eval.java_version(value, &prop_field)?)
                }
                "isCoreLibraryDesugaringEnabled" => {
                    self.compile_options.core_library_desugaring = self.eval.bool(value, &prop_field)?
                }
                other => return Err(unknown(field, other)),
            }
        }
        Ok(())
    }

    fn kotlin_options(&mut self, body: &[Statement], field: &str) -> Result<()> {
        for (name, value) in assignments(body, field)? {
            let prop_field = join_field(field, name);
            match name {
                "jvmTarget" => {
                    let text = self.eval.string(value, &prop_field)?;
                    if JavaVersion::parse(&text).is_none() {
                        return Err(invalid(&prop_field, "a JVM target such as \"11\"", value));
                    }
                    self.kotlin_options.jvm_target = Some(text);
                }
                other => return Err(unknown(field, other)),
            }
        }
        Ok(())
    }

    fn default_config(&mut self, body: &[Statement], field: &str) -> Result<()> {
        for (name, value) in assignments(body, field)? {
            let prop_field = join_field(field, name);
            let config = &mut self.default_config;
            match name {
                "applicationId" if self.kind == AndroidKind::Application => {
                    let id = self.eval.string(value, &prop_field)?;
                    if !PACKAGE_RE.is_match(&id) {
                        return Err(SchemaError::InvalidValue {
                            field: prop_field,
                            message: format!("`{}` is not a valid application id", id),
                        }
                        .into());
                    }
                    config.application_id = Some(id);
                }
                "minSdk" => config.min_sdk = Some(self.eval.positive(value, &prop_field)?),
                "targetSdk" => config.target_sdk = Some(self.eval.positive(value, &prop_field)?),
                "versionCode" => config.version_code = Some(self.eval.positive(value, &prop_field)?),
                "versionName" => config.version_name = Some(self.eval.string(value, &prop_field)?),
                "testInstrumentationRunner" => {
                    config.test_instrumentation_runner = Some(self.eval.string(value, &prop_field)?)
                }
                "multiDexEnabled" => config.multi_dex_enabled = self.eval.bool(value, &prop_field)?,
                other => return Err(unknown(field, other)),
            }
        }
        Ok(())
    }

    fn build_types(&mut self, body: &[Statement], field: &str) -> Result<()> {
        for statement in body {
            let call = match statement.chain() {
                Some([call]) => call,
                _ => return Err(unknown(field, &describe_statement(statement))),
            };
            let (name, create) = self.build_type_target(call, field)?;
            let variant_field = join_field(field, &name);

            if create {
                if self.build_types.contains_key(&name) {
                    return Err(SchemaError::Duplicate {
                        field: field.to_string(),
                        name,
                    }
                    .into());
                }
                debug!("Declaring build type {}", name);
                self.build_types.insert(name.clone(), BuildVariantConfig::new(&name));
            } else if !self.build_types.contains_key(&name) {
                return Err(unknown(field, &name));
            }

            if let Some(block) = &call.block {
                for statement in block {
                    self.build_type_statement(&name, statement, &variant_field)?;
                }
            }
        }
        Ok(())
    }

    /// `release { }`, `getByName("release") { }` or `create("staging") { }`
    fn build_type_target(&self, call: &Segment, field: &str) -> Result<(String, bool)> {
        match (call.name.as_str(), &call.args) {
            (name, None) => Ok((name.to_string(), false)),
            ("getByName" | "named", Some(_)) | ("create" | "register", Some(_)) => {
                let arg = call
                    .single_arg()
                    .ok_or_else(|| unknown(field, &call.name))?;
                let name = self.eval.string(arg, field)?;
                Ok((name, matches!(call.name.as_str(), "create" | "register")))
            }
            (other, _) => Err(unknown(field, other)),
        }
    }

    fn build_type_statement(&mut self, variant: &str, statement: &Statement, field: &str) -> Result<()> {
        let (key, value) = match &statement.kind {
            StatementKind::Assign { target, value } if target.len() == 1 => (target[0].as_str(), Some(value)),
            StatementKind::Expr(_) => match statement.chain() {
                Some([call]) if call.name == "proguardFiles" && call.block.is_none() => ("proguardFiles", None),
                _ => return Err(unknown(field, &describe_statement(statement))),
            },
            _ => return Err(unknown(field, &describe_statement(statement))),
        };
        let prop_field = join_field(field, key);

        let override_value = match (key, value) {
            ("signingConfig", Some(value)) => {
                let name = self.signing_ref(value, &prop_field)?;
                if let Some(config) = self.build_types.get_mut(variant) {
                    config.signing_config = Some(name);
                }
                return Ok(());
            }
            ("isMinifyEnabled" | "isShrinkResources" | "isDebuggable", Some(value)) => {
                OverrideValue::Bool(self.eval.bool(value, &prop_field)?)
            }
            ("applicationIdSuffix" | "versionNameSuffix", Some(value)) => {
                OverrideValue::Text(self.eval.string(value, &prop_field)?)
            }
            ("proguardFiles", None) => {
                let args = match statement.chain() {
                    Some([call]) => call.args(),
                    _ => &[],
                };
                let files = args
                    .iter()
                    .map(|arg| self.proguard_file(&arg.value, &prop_field))
                    .collect::<Result<Vec<_>>>()?;
                OverrideValue::Files(files)
            }
            (other, _) => return Err(unknown(field, other)),
        };

        if let Some(config) = self.build_types.get_mut(variant) {
            config.overrides.insert(key.to_string(), override_value);
        }
        Ok(())
    }

    /// `signingConfigs.getByName("name")`, checked against configs declared so far
    fn signing_ref(&self, value: &Expr, field: &str) -> Result<String> {
        let name = match value.as_chain() {
            Some([configs, lookup])
                if configs.name == "signingConfigs"
                    && configs.is_plain()
                    && matches!(lookup.name.as_str(), "getByName" | "named") =>
            {
                match lookup.single_arg() {
                    Some(arg) => self.eval.string(arg, field)?,
                    None => return Err(invalid(field, "signingConfigs.getByName(\"name\")", value)),
                }
            }
            _ => return Err(invalid(field, "signingConfigs.getByName(\"name\")", value)),
        };

        if !self.signing_configs.contains_key(&name) {
            return Err(ReferenceError::UndeclaredSigningConfig {
                name,
                field: field.to_string(),
            }
            .into());
        }
        Ok(name)
    }

    /// `getDefaultProguardFile("x")` stays symbolic; project files resolve
    /// against the project directory
    fn proguard_file(&self, value: &Expr, field: &str) -> Result<String> {
        if let Some([default]) = value.as_chain() {
            if default.name == "getDefaultProguardFile" && default.block.is_none() {
                return match default.single_arg() {
                    Some(arg) => Ok(format!("default:{}", self.eval.string(arg, field)?)),
                    None => Err(invalid(field, "a proguard file", value)),
                };
            }
        }
        let path = self.eval.file(value, field)?;
        Ok(resolve_in(self.project_dir, &path).display().to_string())
    }

    fn finish(self, field: &str) -> Result<AndroidExtension> {
        let namespace = self.namespace.ok_or_else(|| SchemaError::MissingField {
            field: join_field(field, "namespace"),
        })?;
        let compile_sdk = self.compile_sdk.ok_or_else(|| SchemaError::MissingField {
            field: join_field(field, "compileSdk"),
        })?;

        let default_field = join_field(field, "defaultConfig");
        let draft = self.default_config;
        let min_sdk = draft.min_sdk.ok_or_else(|| SchemaError::MissingField {
            field: join_field(&default_field, "minSdk"),
        })?;
        let target_sdk = draft.target_sdk.unwrap_or(compile_sdk);

        for (name, level) in [("minSdk", min_sdk), ("targetSdk", target_sdk)] {
            if level > compile_sdk {
                return Err(SchemaError::InvalidValue {
                    field: join_field(&default_field, name),
                    message: format!("{} {} exceeds compileSdk {}", name, level, compile_sdk),
                }
                .into());
            }
        }

        let application_id = match self.kind {
            AndroidKind::Application => Some(draft.application_id.unwrap_or_else(|| namespace.clone())),
            AndroidKind::Library => None,
        };

        if let (Some(target), Some(jvm)) = (
            self.compile_options.target_compatibility,
            self.kotlin_options.jvm_target.as_deref().and_then(JavaVersion::parse),
        ) {
            if target != jvm {
                warn!(
                    "{}: kotlinOptions.jvmTarget {} differs from targetCompatibility {}",
                    namespace, jvm, target
                );
            }
        }

        Ok(AndroidExtension {
            kind: self.kind,
            namespace,
            compile_sdk,
            ndk_version: self.ndk_version,
            compile_options: self.compile_options,
            kotlin_options: self.kotlin_options,
            default_config: DefaultConfig {
                application_id,
                min_sdk,
                target_sdk,
                version_code: draft.version_code,
                version_name: draft.version_name,
                test_instrumentation_runner: draft.test_instrumentation_runner,
                multi_dex_enabled: draft.multi_dex_enabled,
            },
            signing_configs: self.signing_configs,
            build_types: self.build_types,
        })
    }
}

/// Single-name assignments of a nested block
fn assignments<'s>(body: &'s [Statement], field: &str) -> Result<Vec<(&'s str, &'s Expr)>> {
    body.iter()
        .map(|statement| match &statement.kind {
            StatementKind::Assign { target, value } if target.len() == 1 => Ok((target[0].as_str(), value)),
            _ => Err(unknown(field, &describe_statement(statement))),
        })
        .collect()
}

/// Directory a relative path in an `android` block resolves against
pub fn resolve_in(project_dir: &Path, path: &str) -> PathBuf {
    normalize_path(&project_dir.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::{ComposeError, ComposerConfig, ErrorKind};
    use gradle_composer_dsl::Parser;

    fn android(src: &str, framework: bool) -> Result<AndroidExtension> {
        let config = ComposerConfig::default();
        let eval = Evaluator::new(&config, framework);
        let script = Parser::parse_str(src).unwrap();
        let body = match script.statements[0].chain() {
            Some([android]) => android.block.clone().unwrap_or_default(),
            _ => panic!("expected an android block"),
        };
        AndroidExtension::from_block(
            &body,
            &eval,
            AndroidKind::Application,
            Path::new("/work/android/app"),
            "android",
        )
    }

    fn with_release_signing(name: &str) -> String {
        format!(
            r#"
            android {{
                namespace = "com.example.app"
                compileSdk = 34
                defaultConfig {{
                    applicationId = "com.example.app"
                    minSdk = 21
                }}
                buildTypes {{
                    release {{
                        signingConfig = signingConfigs.getByName("{}")
                    }}
                }}
            }}
            "#,
            name
        )
    }

    #[test]
    fn test_release_signed_with_debug() {
        let ext = android(&with_release_signing("debug"), false).unwrap();
        assert_eq!(ext.compile_sdk, 34);
        assert_eq!(ext.default_config.min_sdk, 21);
        assert_eq!(ext.default_config.target_sdk, 34);
        assert_eq!(ext.default_config.application_id.as_deref(), Some("com.example.app"));
        assert_eq!(ext.build_types["release"].signing_config.as_deref(), Some("debug"));
        assert_eq!(ext.build_types["debug"].signing_config.as_deref(), Some("debug"));
    }

    #[test]
    fn test_undeclared_signing_config() {
        let err = android(&with_release_signing("release-missing"), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.field(), Some("android.buildTypes.release.signingConfig"));
        assert!(err.to_string().contains("release-missing"));
    }

    #[test]
    fn test_flutter_template() {
        let ext = android(
            r#"
            android {
                namespace = "com.example.flaviocodigos"
                compileSdk = flutter.compileSdkVersion
                ndkVersion = "27.0.12077973"
                compileOptions {
                    sourceCompatibility = JavaVersion.VERSION_11
                    targetCompatibility = JavaVersion.VERSION_11
                }
                kotlinOptions {
                    jvmTarget = JavaVersion.VERSION_11.toString()
                }
                defaultConfig {
                    minSdk = flutter.minSdkVersion
                    targetSdk = flutter.targetSdkVersion
                    versionCode = flutter.versionCode
                    versionName = flutter.versionName
                }
            }
            "#,
            true,
        )
        .unwrap();

        assert_eq!(ext.compile_sdk, 35);
        assert_eq!(ext.default_config.application_id.as_deref(), Some("com.example.flaviocodigos"));
        assert_eq!(ext.default_config.version_name.as_deref(), Some("1.0.0"));
        assert_eq!(ext.compile_options.target_compatibility.map(|v| v.major()), Some(11));
        assert_eq!(ext.kotlin_options.jvm_target.as_deref(), Some("11"));
    }

    #[test]
    fn test_signing_declared_and_overrides() {
        let ext = android(
            r#"
            android {
                namespace = "com.example.app"
                compileSdk = 34
                defaultConfig { minSdk = 24 }
                signingConfigs {
                    create("upload") {
                        storeFile = file("upload.jks")
                        keyAlias = "upload"
                    }
                }
                buildTypes {
                    getByName("release") {
                        signingConfig = signingConfigs.getByName("upload")
                        isMinifyEnabled = true
                        proguardFiles(getDefaultProguardFile("proguard-android-optimize.txt"), "proguard-rules.pro")
                    }
                    create("staging") {
                        applicationIdSuffix = ".staging"
                    }
                }
            }
            "#,
            false,
        )
        .unwrap();

        let release = &ext.build_types["release"];
        assert_eq!(release.signing_config.as_deref(), Some("upload"));
        assert_eq!(release.overrides["isMinifyEnabled"], OverrideValue::Bool(true));
        assert_eq!(
            release.overrides["proguardFiles"],
            OverrideValue::Files(vec![
                "default:proguard-android-optimize.txt".into(),
                "/work/android/app/proguard-rules.pro".into(),
            ])
        );
        assert_eq!(ext.build_types.keys().collect::<Vec<_>>(), vec!["debug", "release", "staging"]);
        assert_eq!(ext.application_id_for("staging").as_deref(), Some("com.example.app.staging"));
        assert_eq!(
            ext.signing_configs["upload"].store_file,
            Some(resolve_in(Path::new("/work/android/app"), "upload.jks"))
        );
    }

    #[test]
    fn test_required_fields() {
        let err = android("android { namespace = \"com.example.app\"\n defaultConfig { minSdk = 21 } }", false)
            .unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::MissingField { .. })));
        assert_eq!(err.field(), Some("android.compileSdk"));

        let err = android("android { namespace = \"com.example.app\"\n compileSdk = 34 }", false).unwrap_err();
        assert_eq!(err.field(), Some("android.defaultConfig.minSdk"));

        let err = android("android { compileSdk = 34\n defaultConfig { minSdk = 21 } }", false).unwrap_err();
        assert_eq!(err.field(), Some("android.namespace"));
    }

    #[test]
    fn test_invalid_values() {
        let err = android(
            "android { namespace = \"com.example.app\"\n compileSdk = 30\n defaultConfig { minSdk = 33 } }",
            false,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("android.defaultConfig.minSdk"));

        let err = android("android { namespace = \"not a package\" }", false).unwrap_err();
        assert_eq!(err.field(), Some("android.namespace"));

        let err = android("android { compileSdk = flutter.compileSdkVersion }", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);

        let err = android("android { lint { abortOnError = false } }", false).unwrap_err();
        assert_eq!(err.field(), Some("android.lint"));

        let err = android("android { buildTypes { staging { } } }", false).unwrap_err();
        assert_eq!(err.field(), Some("android.buildTypes.staging"));
    }
}
