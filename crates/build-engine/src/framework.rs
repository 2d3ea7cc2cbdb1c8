//! Framework extension block (`flutter { source = "../.." }`)

use std::path::{Path, PathBuf};
use gradle_composer_core::{Result, SchemaError};
use gradle_composer_dsl::{Statement, StatementKind};
use serde::Serialize;

use crate::eval::{join_field, unknown, Evaluator};
use crate::relocation::normalize_path;
use crate::repositories::describe_statement;

/// Settings handed to the cross-platform framework plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkExtension {
    /// Framework project root, resolved against the project directory
    pub source: PathBuf,
    /// Entry point, relative to `source`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl FrameworkExtension {
    /// Interpret the framework block; `source` is required
    pub fn from_block(body: &[Statement], eval: &Evaluator<'_>, project_dir: &Path, field: &str) -> Result<Self> {
        let mut source = None;
        let mut target = None;

        for statement in body {
            let (name, value) = match &statement.kind {
                StatementKind::Assign { target, value } if target.len() == 1 => (target[0].as_str(), value),
                _ => return Err(unknown(field, &describe_statement(statement))),
            };
            let prop_field = join_field(field, name);
            match name {
                "source" => {
                    let path = eval.string(value, &prop_field)?;
                    source = Some(normalize_path(&project_dir.join(path)));
                }
                "target" => target = Some(eval.string(value, &prop_field)?),
                other => return Err(unknown(field, other)),
            }
        }

        let source = source.ok_or_else(|| SchemaError::MissingField {
            field: join_field(field, "source"),
        })?;
        Ok(Self { source, target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::ComposerConfig;
    use gradle_composer_dsl::Parser;

    fn parse(src: &str) -> Result<FrameworkExtension> {
        let config = ComposerConfig::default();
        let eval = Evaluator::new(&config, true);
        let script = Parser::parse_str(src).unwrap();
        FrameworkExtension::from_block(&script.statements, &eval, Path::new("/work/android/app"), "flutter")
    }

    #[test]
    fn test_source_resolves_to_framework_root() {
        let ext = parse("source = \"../..\"\ntarget = \"lib/main_dev.dart\"").unwrap();
        assert_eq!(ext.source, PathBuf::from("/work"));
        assert_eq!(ext.target.as_deref(), Some("lib/main_dev.dart"));
    }

    #[test]
    fn test_source_required() {
        let err = parse("target = \"lib/main.dart\"").unwrap_err();
        assert_eq!(err.field(), Some("flutter.source"));
        assert_eq!(parse("flavor = \"dev\"").unwrap_err().field(), Some("flutter.flavor"));
    }
}
