//! Artifact repositories (`repositories { google(); mavenCentral() }`)

use gradle_composer_core::{Result, SchemaError};
use gradle_composer_dsl::{Expr, Statement, StatementKind};
use serde::Serialize;

use crate::eval::{invalid, join_field, unknown, Evaluator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Repository {
    Google,
    MavenCentral,
    GradlePluginPortal,
    MavenLocal,
    Maven { url: String },
}

/// Parse the body of a `repositories { }` block
pub fn parse_repositories(body: &[Statement], eval: &Evaluator<'_>, field: &str) -> Result<Vec<Repository>> {
    let mut repositories = Vec::new();
    for statement in body {
        let segment = match statement.chain() {
            Some([segment]) => segment,
            Some(segments) => {
                return Err(unknown(field, &Expr::Chain(segments.to_vec()).describe()));
            }
            None => return Err(unknown(field, &describe_statement(statement))),
        };

        let repository = match (segment.name.as_str(), &segment.args, &segment.block) {
            ("google", Some(args), None) if args.is_empty() => Repository::Google,
            ("mavenCentral", Some(args), None) if args.is_empty() => Repository::MavenCentral,
            ("gradlePluginPortal", Some(args), None) if args.is_empty() => Repository::GradlePluginPortal,
            ("mavenLocal", Some(args), None) if args.is_empty() => Repository::MavenLocal,
            ("maven", Some(args), None) => {
                let maven_field = join_field(field, "maven");
                match args.as_slice() {
                    [arg] if arg.name.is_none() || arg.name.as_deref() == Some("url") => Repository::Maven {
                        url: url(&arg.value, eval, &maven_field)?,
                    },
                    _ => return Err(unknown(field, "maven")),
                }
            }
            ("maven", None, Some(block)) => maven_block(block, eval, &join_field(field, "maven"))?,
            (name, _, _) => return Err(unknown(field, name)),
        };

        if !repositories.contains(&repository) {
            repositories.push(repository);
        }
    }
    Ok(repositories)
}

fn maven_block(body: &[Statement], eval: &Evaluator<'_>, field: &str) -> Result<Repository> {
    let mut found = None;
    for statement in body {
        match &statement.kind {
            StatementKind::Assign { target, value } if target.len() == 1 && target[0] == "url" => {
                found = Some(url(value, eval, &join_field(field, "url"))?);
            }
            _ => return Err(unknown(field, &describe_statement(statement))),
        }
    }
    found
        .map(|url| Repository::Maven { url })
        .ok_or_else(|| {
            SchemaError::MissingField {
                field: join_field(field, "url"),
            }
            .into()
        })
}

/// `"https://..."` or `uri("https://...")`
fn url(expr: &Expr, eval: &Evaluator<'_>, field: &str) -> Result<String> {
    let text = match expr.as_chain() {
        Some([uri]) if uri.name == "uri" => match uri.single_arg() {
            Some(arg) => eval.string(arg, field)?,
            None => return Err(invalid(field, "a URL", expr)),
        },
        _ => eval.string(expr, field)?,
    };
    if text.trim().is_empty() {
        return Err(invalid(field, "a URL", expr));
    }
    Ok(text)
}

/// Short rendering of a statement for error messages
pub fn describe_statement(statement: &Statement) -> String {
    match &statement.kind {
        StatementKind::Assign { target, .. } => target.join("."),
        StatementKind::Val { name, .. } => name.clone(),
        StatementKind::Expr(expr) => expr.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::{ComposerConfig, ErrorKind};
    use gradle_composer_dsl::Parser;

    fn parse(src: &str) -> Result<Vec<Repository>> {
        let config = ComposerConfig::default();
        let eval = Evaluator::new(&config, false);
        let script = Parser::parse_str(src).unwrap();
        parse_repositories(&script.statements, &eval, "repositories")
    }

    #[test]
    fn test_repositories() {
        let repos = parse(
            "google()\nmavenCentral()\nmaven { url = uri(\"https://jitpack.io\") }\nmaven(\"https://a.example\")\ngoogle()",
        )
        .unwrap();
        assert_eq!(
            repos,
            vec![
                Repository::Google,
                Repository::MavenCentral,
                Repository::Maven { url: "https://jitpack.io".into() },
                Repository::Maven { url: "https://a.example".into() },
            ]
        );
    }

    #[test]
    fn test_unknown_repository() {
        let err = parse("jcenter()").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.field(), Some("repositories.jcenter"));

        let err = parse("maven { }").unwrap_err();
        assert_eq!(err.field(), Some("repositories.maven.url"));
    }
}
