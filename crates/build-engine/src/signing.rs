//! Signing Configurations
//!
//! `signingConfigs { create("release") { ... } }` inside an `android` block.
//! Passwords are kept for the downstream toolchain but never serialised in
//! clear text.

use std::path::{Path, PathBuf};
use gradle_composer_core::{ReferenceError, Result, SchemaError};
use gradle_composer_dsl::{Statement, StatementKind};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::eval::{join_field, unknown, Evaluator};
use crate::relocation::normalize_path;
use crate::repositories::describe_statement;

/// Name of the signing config the Android application plugin always declares
pub const DEBUG_SIGNING_CONFIG: &str = "debug";

/// A named set of keystore credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file: Option<PathBuf>,
    #[serde(serialize_with = "redact", skip_serializing_if = "Option::is_none")]
    pub store_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    #[serde(serialize_with = "redact", skip_serializing_if = "Option::is_none")]
    pub key_password: Option<String>,
}

impl SigningConfig {
    /// Empty config, as created by `create("name")`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            store_file: None,
            store_password: None,
            key_alias: None,
            key_password: None,
        }
    }

    /// The implicit debug config backed by the user's debug keystore
    pub fn debug() -> Self {
        Self {
            name: DEBUG_SIGNING_CONFIG.to_string(),
            store_file: Some(debug_keystore()),
            store_password: Some("android".to_string()),
            key_alias: Some("androiddebugkey".to_string()),
            key_password: Some("android".to_string()),
        }
    }

    /// Key password, falling back to the store password
    pub fn effective_key_password(&self) -> Option<&str> {
        self.key_password.as_deref().or(self.store_password.as_deref())
    }
}

fn redact<S: Serializer>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str("********"),
        None => serializer.serialize_none(),
    }
}

/// Default location of the debug keystore
pub fn debug_keystore() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".android")
        .join("debug.keystore")
}

/// Apply a `signingConfigs { }` block to `configs`
pub fn parse_signing_configs(
    body: &[Statement],
    eval: &Evaluator<'_>,
    project_dir: &Path,
    configs: &mut IndexMap<String, SigningConfig>,
    field: &str,
) -> Result<()> {
    for statement in body {
        let call = match statement.chain() {
            Some([call]) => call,
            _ => return Err(unknown(field, &describe_statement(statement))),
        };
        let name = match call.single_arg() {
            Some(arg) => eval.string(arg, field)?,
            None => return Err(unknown(field, &call.name)),
        };
        let config_field = join_field(field, &name);

        let config = match call.name.as_str() {
            "create" | "register" => {
                if configs.contains_key(&name) {
                    return Err(SchemaError::Duplicate {
                        field: field.to_string(),
                        name,
                    }
                    .into());
                }
                debug!("Declaring signing config {}", name);
                configs.entry(name.clone()).or_insert_with(|| SigningConfig::new(&name))
            }
            "getByName" | "named" => match configs.get_mut(&name) {
                Some(config) => config,
                None => {
                    return Err(ReferenceError::UndeclaredSigningConfig {
                        name,
                        field: config_field,
                    }
                    .into())
                }
            },
            other => return Err(unknown(field, other)),
        };

        if let Some(block) = &call.block {
            apply_properties(config, block, eval, project_dir, &config_field)?;
        }
    }
    Ok(())
}

fn apply_properties(
    config: &mut SigningConfig,
    body: &[Statement],
    eval: &Evaluator<'_>,
    project_dir: &Path,
    field: &str,
) -> Result<()> {
    for statement in body {
        let (name, value) = match &statement.kind {
            StatementKind::Assign { target, value } if target.len() == 1 => (target[0].as_str(), value),
            _ => return Err(unknown(field, &describe_statement(statement))),
        };
        let prop_field = join_field(field, name);
        match name {
            "storeFile" => {
                let path = eval.file(value, &prop_field)?;
                config.store_file = Some(normalize_path(&project_dir.join(path)));
            }
            "storePassword" => config.store_password = Some(eval.string(value, &prop_field)?),
            "keyAlias" => config.key_alias = Some(eval.string(value, &prop_field)?),
            "keyPassword" => config.key_password = Some(eval.string(value, &prop_field)?),
            other => return Err(unknown(field, other)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::{ComposerConfig, ErrorKind};
    use gradle_composer_dsl::Parser;

    fn parse(src: &str, configs: &mut IndexMap<String, SigningConfig>) -> Result<()> {
        let config = ComposerConfig::default();
        let eval = Evaluator::new(&config, false);
        let script = Parser::parse_str(src).unwrap();
        parse_signing_configs(
            &script.statements,
            &eval,
            Path::new("/work/android/app"),
            configs,
            "android.signingConfigs",
        )
    }

    #[test]
    fn test_create_and_update() {
        let mut configs = IndexMap::new();
        configs.insert("debug".to_string(), SigningConfig::debug());

        parse(
            r#"
            create("release") {
                storeFile = file("../keys/upload.jks")
                storePassword = "secret"
                keyAlias = "upload"
            }
            getByName("debug") {
                keyAlias = "other"
            }
            "#,
            &mut configs,
        )
        .unwrap();

        let release = &configs["release"];
        assert_eq!(release.store_file, Some(PathBuf::from("/work/android/keys/upload.jks")));
        assert_eq!(release.effective_key_password(), Some("secret"));
        assert_eq!(configs["debug"].key_alias.as_deref(), Some("other"));
        assert_eq!(configs.keys().collect::<Vec<_>>(), vec!["debug", "release"]);
    }

    #[test]
    fn test_passwords_are_redacted() {
        let json = serde_json::to_string(&SigningConfig::debug()).unwrap();
        assert!(!json.contains("\"android\""));
        assert!(json.contains("********"));
        assert!(json.contains("androiddebugkey"));
    }

    #[test]
    fn test_errors() {
        let mut configs = IndexMap::new();
        let err = parse("getByName(\"upload\") { }", &mut configs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.field(), Some("android.signingConfigs.upload"));

        let err = parse("create(\"a\") { storeType = \"jks\" }", &mut configs).unwrap_err();
        assert_eq!(err.field(), Some("android.signingConfigs.a.storeType"));

        let err = parse("create(\"a\")", &mut configs).unwrap_err();
        assert!(matches!(err, gradle_composer_core::ComposeError::Schema(SchemaError::Duplicate { .. })));
    }
}
