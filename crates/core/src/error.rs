//! Error types for Gradle Composer
//!
//! Centralized error handling using thiserror. Configuration failures fall
//! into three classes (schema, reference, structural); every variant names
//! the offending field so the caller can point at it.

use std::path::PathBuf;
use thiserror::Error;

/// Taxonomy class of a configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed script text
    Syntax,
    /// Unknown or missing fields, malformed values
    Schema,
    /// Dangling named references
    Reference,
    /// Cycles and conflicts in directory relocation
    Structural,
    /// Composer configuration or file access
    Environment,
}

/// Unknown, missing or malformed fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown field `{field}`")]
    UnknownField { field: String },

    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("unknown plugin `{id}`")]
    UnknownPlugin { id: String, field: String },

    #[error("invalid value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },

    #[error("malformed dependency coordinate `{coordinate}` in `{field}`: {reason}")]
    MalformedCoordinate {
        field: String,
        coordinate: String,
        reason: String,
    },

    #[error("invalid version `{version}` in `{field}`")]
    InvalidVersion { field: String, version: String },

    #[error("dependency `{coordinate}` in `{field}` has no version and no platform provides one")]
    MissingVersion { field: String, coordinate: String },

    #[error("unknown dependency scope `{scope}` in `{field}`")]
    UnknownScope { field: String, scope: String },

    #[error("`{name}` is declared twice in `{field}`")]
    Duplicate { field: String, name: String },
}

impl SchemaError {
    /// Field path the error is about
    pub fn field(&self) -> &str {
        match self {
            SchemaError::UnknownField { field }
            | SchemaError::MissingField { field }
            | SchemaError::UnknownPlugin { field, .. }
            | SchemaError::InvalidValue { field, .. }
            | SchemaError::MalformedCoordinate { field, .. }
            | SchemaError::InvalidVersion { field, .. }
            | SchemaError::MissingVersion { field, .. }
            | SchemaError::UnknownScope { field, .. }
            | SchemaError::Duplicate { field, .. } => field,
        }
    }
}

/// Dangling named references
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("signing config `{name}` referenced by `{field}` is not declared")]
    UndeclaredSigningConfig { name: String, field: String },

    #[error("plugin `{plugin}` must be applied after `{required}`")]
    PluginOrder {
        plugin: String,
        required: String,
        field: String,
    },

    #[error("platform `{platform}` is declared after `{coordinate}`, which relies on it")]
    PlatformDeclaredAfter {
        coordinate: String,
        platform: String,
        field: String,
    },

    #[error("project `{path}` referenced by `{field}` does not exist")]
    UnknownProject { path: String, field: String },

    #[error("`{property}` needs the `{plugin}` plugin to be applied")]
    PluginNotApplied {
        property: String,
        plugin: String,
        field: String,
    },

    #[error("`{name}` used in `{field}` is not defined")]
    UndefinedValue { name: String, field: String },
}

impl ReferenceError {
    /// Field path the error is about
    pub fn field(&self) -> &str {
        match self {
            ReferenceError::UndeclaredSigningConfig { field, .. }
            | ReferenceError::PluginOrder { field, .. }
            | ReferenceError::PlatformDeclaredAfter { field, .. }
            | ReferenceError::UnknownProject { field, .. }
            | ReferenceError::PluginNotApplied { field, .. }
            | ReferenceError::UndefinedValue { field, .. } => field,
        }
    }
}

/// Cycles and conflicts in the project graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("project evaluation order forms a cycle: {}", .projects.join(" -> "))]
    EvaluationCycle { projects: Vec<String> },

    #[error("build directory relocation forms a cycle: {}", .projects.join(" -> "))]
    RelocationCycle { projects: Vec<String> },

    #[error("build directory {path:?} of `{second}` is already claimed by `{first}`")]
    BuildDirConflict {
        first: String,
        second: String,
        path: PathBuf,
    },
}

impl StructuralError {
    /// Field path the error is about
    pub fn field(&self) -> &str {
        match self {
            StructuralError::EvaluationCycle { .. } => "evaluationDependsOn",
            StructuralError::RelocationCycle { .. } | StructuralError::BuildDirConflict { .. } => {
                "layout.buildDirectory"
            }
        }
    }
}

/// Script text that does not parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}:{column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Main error type for Gradle Composer
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("syntax error in {file}: {source}")]
    Syntax {
        file: String,
        #[source]
        source: SyntaxError,
    },

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Gradle Composer operations
pub type Result<T> = std::result::Result<T, ComposeError>;

impl ComposeError {
    /// Taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComposeError::Syntax { .. } => ErrorKind::Syntax,
            ComposeError::Schema(_) => ErrorKind::Schema,
            ComposeError::Reference(_) => ErrorKind::Reference,
            ComposeError::Structural(_) => ErrorKind::Structural,
            ComposeError::Config(_) | ComposeError::TomlParse(_) | ComposeError::Io(_) => {
                ErrorKind::Environment
            }
        }
    }

    /// The offending field path, when the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            ComposeError::Schema(e) => Some(e.field()),
            ComposeError::Reference(e) => Some(e.field()),
            ComposeError::Structural(e) => Some(e.field()),
            _ => None,
        }
    }

    /// Wrap a syntax error with the file it came from
    pub fn syntax(file: impl Into<String>, source: SyntaxError) -> Self {
        ComposeError::Syntax {
            file: file.into(),
            source,
        }
    }
}
