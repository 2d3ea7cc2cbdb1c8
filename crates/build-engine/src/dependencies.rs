//! Dependency Declarations
//!
//! Parses `dependencies { }` blocks into coordinates and enforces the
//! platform rule: an artifact declared without a version must be covered by
//! a platform import declared *before* it. A platform that only shows up
//! afterwards is rejected rather than silently deferred.

use std::fmt;
use std::ops::Deref;
use gradle_composer_core::{ReferenceError, Result, SchemaError};
use gradle_composer_dsl::{Arg, Expr, Segment, Statement};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::eval::{invalid, join_field, unknown, Evaluator};
use crate::repositories::describe_statement;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").unwrap());

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    let plain = r"[0-9A-Za-z][0-9A-Za-z._+\-]*";
    Regex::new(&format!(
        r"^(?:{plain}|\+|[\[(]\s*(?:{plain})?\s*,\s*(?:{plain})?\s*[\])]|\[{plain}\])$",
        plain = plain
    ))
    .unwrap()
});

/// Check whether `version` is a syntactically valid version or range
pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.is_match(version) && !version.contains("..") && !version.ends_with('.')
}

/// Dependency configuration a declaration is added to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    Implementation,
    Api,
    CompileOnly,
    RuntimeOnly,
    TestImplementation,
    AndroidTestImplementation,
    DebugImplementation,
    ReleaseImplementation,
    CoreLibraryDesugaring,
    Kapt,
    Ksp,
    /// Buildscript classpath
    Classpath,
}

impl Scope {
    /// Scope for a configuration name such as `implementation`
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "implementation" => Scope::Implementation,
            "api" => Scope::Api,
            "compileOnly" => Scope::CompileOnly,
            "runtimeOnly" => Scope::RuntimeOnly,
            "testImplementation" => Scope::TestImplementation,
            "androidTestImplementation" => Scope::AndroidTestImplementation,
            "debugImplementation" => Scope::DebugImplementation,
            "releaseImplementation" => Scope::ReleaseImplementation,
            "coreLibraryDesugaring" => Scope::CoreLibraryDesugaring,
            "kapt" => Scope::Kapt,
            "ksp" => Scope::Ksp,
            "classpath" => Scope::Classpath,
            _ => return None,
        })
    }

    /// Configuration name as written in scripts
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Implementation => "implementation",
            Scope::Api => "api",
            Scope::CompileOnly => "compileOnly",
            Scope::RuntimeOnly => "runtimeOnly",
            Scope::TestImplementation => "testImplementation",
            Scope::AndroidTestImplementation => "androidTestImplementation",
            Scope::DebugImplementation => "debugImplementation",
            Scope::ReleaseImplementation => "releaseImplementation",
            Scope::CoreLibraryDesugaring => "coreLibraryDesugaring",
            Scope::Kapt => "kapt",
            Scope::Ksp => "ksp",
            Scope::Classpath => "classpath",
        }
    }
}

/// Which block the dependencies come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyBlock {
    /// `buildscript { dependencies { classpath(...) } }`
    Buildscript,
    /// A project's `dependencies { }`
    Project,
}

impl DependencyBlock {
    fn allows(&self, scope: Scope) -> bool {
        match self {
            DependencyBlock::Buildscript => scope == Scope::Classpath,
            DependencyBlock::Project => scope != Scope::Classpath,
        }
    }
}

/// `group:artifact[:version[:classifier]][@extension]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl Coordinate {
    /// Parse coordinate notation, validating every part
    pub fn parse(notation: &str, field: &str) -> Result<Self> {
        let malformed = |reason: &str| {
            SchemaError::MalformedCoordinate {
                field: field.to_string(),
                coordinate: notation.to_string(),
                reason: reason.to_string(),
            }
        };

        let (body, extension) = match notation.split_once('@') {
            Some((body, ext)) if NAME_RE.is_match(ext) => (body, Some(ext.to_string())),
            Some(_) => return Err(malformed("invalid extension").into()),
            None => (notation, None),
        };

        let parts: Vec<&str> = body.split(':').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(malformed("expected `group:artifact[:version]`").into());
        }
        if !NAME_RE.is_match(parts[0]) {
            return Err(malformed("invalid group").into());
        }
        if !NAME_RE.is_match(parts[1]) {
            return Err(malformed("invalid artifact").into());
        }

        let version = match parts.get(2) {
            Some(v) => {
                Self::check_version(v, field)?;
                Some(v.to_string())
            }
            None => None,
        };
        let classifier = match parts.get(3) {
            Some(c) if NAME_RE.is_match(c) => Some(c.to_string()),
            Some(_) => return Err(malformed("invalid classifier").into()),
            None => None,
        };

        Ok(Coordinate {
            group: parts[0].to_string(),
            artifact: parts[1].to_string(),
            version,
            classifier,
            extension,
        })
    }

    fn check_version(version: &str, field: &str) -> Result<()> {
        if is_valid_version(version) {
            Ok(())
        } else {
            Err(SchemaError::InvalidVersion {
                field: field.to_string(),
                version: version.to_string(),
            }
            .into())
        }
    }

    /// Whether a platform with this coordinate pins versions for `other`
    pub fn covers(&self, other: &Coordinate) -> bool {
        other.group == self.group || other.group.starts_with(&format!("{}.", self.group))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        if let Some(extension) = &self.extension {
            write!(f, "@{}", extension)?;
        }
        Ok(())
    }
}

/// What a declaration points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DependencyNotation {
    Module { coordinate: Coordinate },
    Platform { coordinate: Coordinate, enforced: bool },
    Project { path: String },
    Files { paths: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDeclaration {
    pub scope: Scope,
    #[serde(flatten)]
    pub notation: DependencyNotation,
}

impl DependencyDeclaration {
    /// The external coordinate, for module and platform declarations
    pub fn coordinate(&self) -> Option<&Coordinate> {
        match &self.notation {
            DependencyNotation::Module { coordinate } | DependencyNotation::Platform { coordinate, .. } => {
                Some(coordinate)
            }
            _ => None,
        }
    }

    /// `platform(...)` or `enforcedPlatform(...)`
    pub fn is_platform(&self) -> bool {
        matches!(self.notation, DependencyNotation::Platform { .. })
    }
}

/// Dependency declarations of a project or buildscript, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencySet {
    declarations: Vec<DependencyDeclaration>,
}

impl DependencySet {
    /// Wrap declarations without validating them
    pub fn new(declarations: Vec<DependencyDeclaration>) -> Self {
        Self { declarations }
    }

    /// Paths of `project(":x")` dependencies
    pub fn project_paths(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().filter_map(|d| match &d.notation {
            DependencyNotation::Project { path } => Some(path.as_str()),
            _ => None,
        })
    }

    /// Every unversioned module needs an earlier platform covering it
    pub fn validate(&self, field: &str) -> Result<()> {
        let declarations = &self.declarations;
        for (index, declaration) in declarations.iter().enumerate() {
            let coordinate = match &declaration.notation {
                DependencyNotation::Module { coordinate } if coordinate.version.is_none() => coordinate,
                _ => continue,
            };

            let covering = |d: &DependencyDeclaration| {
                d.is_platform() && d.coordinate().map_or(false, |p| p.covers(coordinate))
            };

            if declarations[..index].iter().any(covering) {
                continue;
            }

            let decl_field = join_field(field, declaration.scope.as_str());
            if let Some(later) = declarations[index + 1..].iter().find(|d| covering(*d)) {
                let platform = later.coordinate().map(|c| c.to_string()).unwrap_or_default();
                return Err(ReferenceError::PlatformDeclaredAfter {
                    coordinate: coordinate.to_string(),
                    platform,
                    field: decl_field,
                }
                .into());
            }

            return Err(SchemaError::MissingVersion {
                field: decl_field,
                coordinate: coordinate.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Extend<DependencyDeclaration> for DependencySet {
    fn extend<I: IntoIterator<Item = DependencyDeclaration>>(&mut self, iter: I) {
        self.declarations.extend(iter);
    }
}

impl Deref for DependencySet {
    type Target = [DependencyDeclaration];

    fn deref(&self) -> &Self::Target {
        &self.declarations
    }
}

/// Parse the body of a `dependencies { }` block.
///
/// Platform ordering is not checked here: a project may spread its
/// declarations over several blocks, so [`DependencySet::validate`] runs once
/// over the combined list.
pub fn parse_dependencies(
    body: &[Statement],
    eval: &Evaluator<'_>,
    field: &str,
    block: DependencyBlock,
) -> Result<DependencySet> {
    let mut declarations = Vec::new();

    for statement in body {
        let call = match statement.chain() {
            Some([call]) if call.args.is_some() && call.block.is_none() => call,
            _ => return Err(unknown(field, &describe_statement(statement))),
        };
        let scope = Scope::from_name(&call.name)
            .filter(|scope| block.allows(*scope))
            .ok_or_else(|| SchemaError::UnknownScope {
                field: field.to_string(),
                scope: call.name.clone(),
            })?;

        let decl_field = join_field(field, scope.as_str());
        let notation = notation(call, eval, &decl_field)?;
        debug!("{} {:?}", scope.as_str(), notation);
        declarations.push(DependencyDeclaration { scope, notation });
    }

    Ok(DependencySet::new(declarations))
}

fn notation(call: &Segment, eval: &Evaluator<'_>, field: &str) -> Result<DependencyNotation> {
    let args = call.args();

    // implementation(group = "g", name = "a", version = "v")
    if !args.is_empty() && args.iter().all(|a| a.name.is_some()) {
        return named_notation(args, eval, field);
    }

    let arg = call
        .single_arg()
        .ok_or_else(|| invalid(field, "one dependency notation", &Expr::Chain(vec![call.clone()])))?;

    if let Expr::Str(text) = arg {
        return Ok(DependencyNotation::Module {
            coordinate: Coordinate::parse(text, field)?,
        });
    }

    let inner = match arg.as_chain() {
        Some([inner]) if inner.block.is_none() => inner,
        _ => return Err(invalid(field, "a dependency notation", arg)),
    };

    match inner.name.as_str() {
        "platform" | "enforcedPlatform" => {
            let text = inner
                .single_arg()
                .ok_or_else(|| invalid(field, "a platform coordinate", arg))?;
            let text = eval.string(text, field)?;
            let coordinate = Coordinate::parse(&text, field)?;
            if coordinate.version.is_none() {
                return Err(SchemaError::MissingVersion {
                    field: field.to_string(),
                    coordinate: text,
                }
                .into());
            }
            Ok(DependencyNotation::Platform {
                coordinate,
                enforced: inner.name == "enforcedPlatform",
            })
        }
        "project" => {
            let path = inner
                .single_arg()
                .ok_or_else(|| invalid(field, "a project path", arg))?;
            Ok(DependencyNotation::Project {
                path: eval.string(path, field)?,
            })
        }
        "files" => {
            let paths = inner
                .args()
                .iter()
                .map(|a| eval.string(&a.value, field))
                .collect::<Result<Vec<_>>>()?;
            if paths.is_empty() {
                return Err(invalid(field, "at least one file", arg));
            }
            Ok(DependencyNotation::Files { paths })
        }
        _ => Err(invalid(field, "a dependency notation", arg)),
    }
}

fn named_notation(args: &[Arg], eval: &Evaluator<'_>, field: &str) -> Result<DependencyNotation> {
    let mut group = None;
    let mut name = None;
    let mut version = None;
    for arg in args {
        let value = eval.string(&arg.value, field)?;
        match arg.name.as_deref() {
            Some("group") => group = Some(value),
            Some("name") => name = Some(value),
            Some("version") => version = Some(value),
            Some(other) => return Err(unknown(field, other)),
            None => return Err(invalid(field, "named arguments only", &arg.value)),
        }
    }

    let group = group.ok_or_else(|| SchemaError::MissingField {
        field: join_field(field, "group"),
    })?;
    let name = name.ok_or_else(|| SchemaError::MissingField {
        field: join_field(field, "name"),
    })?;
    let mut notation = format!("{}:{}", group, name);
    if let Some(version) = version {
        notation.push(':');
        notation.push_str(&version);
    }
    Ok(DependencyNotation::Module {
        coordinate: Coordinate::parse(&notation, field)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::{ComposeError, ComposerConfig, ErrorKind};
    use gradle_composer_dsl::Parser;

    fn parse(src: &str, block: DependencyBlock) -> Result<DependencySet> {
        let config = ComposerConfig::default();
        let eval = Evaluator::new(&config, false);
        let script = Parser::parse_str(src).unwrap();
        let set = parse_dependencies(&script.statements, &eval, "dependencies", block)?;
        set.validate("dependencies")?;
        Ok(set)
    }

    #[test]
    fn test_versions() {
        for ok in ["33.10.0", "1.0.0-alpha01", "1.+", "+", "[1.0,2.0)", "(,3.0]", "[1.2]", "latest.release"] {
            assert!(is_valid_version(ok), "{} should be valid", ok);
        }
        for bad in ["", "1..2", "1.", "1 0", "[1.0", "-1"] {
            assert!(!is_valid_version(bad), "{} should be invalid", bad);
        }
    }

    #[test]
    fn test_coordinate_parse() {
        let c = Coordinate::parse("com.google.firebase:firebase-bom:33.10.0", "f").unwrap();
        assert_eq!(c.group, "com.google.firebase");
        assert_eq!(c.version.as_deref(), Some("33.10.0"));

        let c = Coordinate::parse("com.example:lib:1.0:sources@jar", "f").unwrap();
        assert_eq!(c.classifier.as_deref(), Some("sources"));
        assert_eq!(c.to_string(), "com.example:lib:1.0:sources@jar");

        assert!(Coordinate::parse("justone", "f").is_err());
        assert!(Coordinate::parse("a::1.0", "f").is_err());
        assert!(Coordinate::parse("a:b:c:d:e", "f").is_err());
        let err = Coordinate::parse("a:b:1..0", "f").unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::InvalidVersion { .. })));
    }

    #[test]
    fn test_platform_then_artifact() {
        let deps = parse(
            r#"
            implementation(platform("com.google.firebase:firebase-bom:33.10.0"))
            implementation("com.google.firebase:firebase-analytics")
            implementation(project(":core"))
            implementation(group = "androidx.core", name = "core-ktx", version = "1.13.1")
            "#,
            DependencyBlock::Project,
        )
        .unwrap();

        assert_eq!(deps.len(), 4);
        assert!(deps[0].is_platform());
        assert_eq!(deps[1].coordinate().unwrap().version, None);
        assert_eq!(deps[2].notation, DependencyNotation::Project { path: ":core".into() });
        assert_eq!(deps[3].coordinate().unwrap().artifact, "core-ktx");
        assert_eq!(deps.project_paths().collect::<Vec<_>>(), vec![":core"]);
    }

    #[test]
    fn test_platform_after_artifact_rejected() {
        let err = parse(
            r#"
            implementation("com.google.firebase:firebase-analytics")
            implementation(platform("com.google.firebase:firebase-bom:33.10.0"))
            "#,
            DependencyBlock::Project,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.field(), Some("dependencies.implementation"));
        assert!(err.to_string().contains("firebase-bom"));
    }

    #[test]
    fn test_unversioned_without_platform() {
        let err = parse("implementation(\"com.squareup.okhttp3:okhttp\")", DependencyBlock::Project).unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::MissingVersion { .. })));

        let err = parse("implementation(platform(\"androidx.compose:compose-bom\"))", DependencyBlock::Project)
            .unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::MissingVersion { .. })));
    }

    #[test]
    fn test_platform_covers_subgroups() {
        parse(
            r#"
            implementation(platform("androidx.compose:compose-bom:2024.09.00"))
            implementation("androidx.compose.ui:ui")
            "#,
            DependencyBlock::Project,
        )
        .unwrap();
    }

    #[test]
    fn test_scopes_per_block() {
        let deps = parse(
            "classpath(\"com.android.tools.build:gradle:7.0.4\")",
            DependencyBlock::Buildscript,
        )
        .unwrap();
        assert_eq!(deps[0].scope, Scope::Classpath);

        let err = parse("classpath(\"com.android.tools.build:gradle:7.0.4\")", DependencyBlock::Project)
            .unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::UnknownScope { .. })));

        let err = parse("implementation(\"a:b:1.0\")", DependencyBlock::Buildscript).unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::UnknownScope { .. })));
    }

    #[test]
    fn test_malformed_notation() {
        let err = parse("implementation(\"not-a-coordinate\")", DependencyBlock::Project).unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::MalformedCoordinate { .. })));
        assert!(parse("implementation(libs.okhttp)", DependencyBlock::Project).is_err());
        assert!(parse("implementation(group = \"a\")", DependencyBlock::Project).is_err());
    }
}
