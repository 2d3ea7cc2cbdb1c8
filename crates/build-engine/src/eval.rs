//! Value Evaluation
//!
//! Turns script expressions into typed values for a given field. There is no
//! general expression evaluator: each field asks for the type it needs and
//! anything else is rejected with the field path attached.

use std::fmt;
use gradle_composer_core::{
    ComposeError, ComposerConfig, PropertyValue, ReferenceError, Result, SchemaError,
};
use gradle_composer_dsl::{Expr, Segment};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::relocation::DirValue;

/// Java language level (`JavaVersion.VERSION_11`, `"1.8"` ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JavaVersion(u32);

impl JavaVersion {
    /// Parse `8`, `1.8`, `11`, `VERSION_1_8` or `VERSION_11`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix("VERSION_").unwrap_or(s);
        let s = s.replace('_', ".");
        let major = match s.strip_prefix("1.") {
            Some(minor) => minor.parse().ok().filter(|m| (1..=10).contains(m))?,
            None => s.parse().ok().filter(|m| (5..=30).contains(m))?,
        };
        Some(JavaVersion(major))
    }

    /// Major language level (8 for `1.8`)
    pub fn major(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 9 {
            write!(f, "1.{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for JavaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A `val` binding visible to later statements
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Directory value, possibly a lazy build-directory reference
    Dir(DirValue),
    /// Plain string
    Text(String),
}

/// `val` bindings of one script scope, in declaration order
pub type Bindings = IndexMap<String, Binding>;

/// Typed access to expression values
pub struct Evaluator<'a> {
    config: &'a ComposerConfig,
    framework_applied: bool,
}

impl<'a> Evaluator<'a> {
    /// `framework_applied` gates access to framework-provided properties
    pub fn new(config: &'a ComposerConfig, framework_applied: bool) -> Self {
        Self {
            config,
            framework_applied,
        }
    }

    /// String literal, text framework property or `JavaVersion.X.toString()`
    pub fn string(&self, expr: &Expr, field: &str) -> Result<String> {
        if let Expr::Str(s) = expr {
            return Ok(s.clone());
        }
        if let Some(PropertyValue::Text(s)) = self.framework_property(expr, field)? {
            return Ok(s);
        }
        // JavaVersion.VERSION_11.toString()
        if let Some([java, constant, to_string]) = expr.as_chain() {
            if java.name == "JavaVersion"
                && java.is_plain()
                && to_string.name == "toString"
                && to_string.args().is_empty()
            {
                if let Some(version) = JavaVersion::parse(&constant.name) {
                    return Ok(version.to_string());
                }
            }
        }
        Err(invalid(field, "a string", expr))
    }

    /// Integer literal or integer framework property
    pub fn int(&self, expr: &Expr, field: &str) -> Result<i64> {
        if let Expr::Int(i) = expr {
            return Ok(*i);
        }
        if let Some(PropertyValue::Int(i)) = self.framework_property(expr, field)? {
            return Ok(i64::from(i));
        }
        Err(invalid(field, "an integer", expr))
    }

    /// Positive integer such as an SDK level or version code
    pub fn positive(&self, expr: &Expr, field: &str) -> Result<u32> {
        let value = self.int(expr, field)?;
        u32::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                SchemaError::InvalidValue {
                    field: field.to_string(),
                    message: format!("expected a positive integer, found {}", value),
                }
                .into()
            })
    }

    /// `true` or `false` literal
    pub fn bool(&self, expr: &Expr, field: &str) -> Result<bool> {
        match expr {
            Expr::Bool(b) => Ok(*b),
            _ => Err(invalid(field, "`true` or `false`", expr)),
        }
    }

    /// `JavaVersion.VERSION_11`, `"11"`, `"1.8"` or a bare integer
    pub fn java_version(&self, expr: &Expr, field: &str) -> Result<JavaVersion> {
        let text = match expr {
            Expr::Str(s) => Some(s.as_str()),
            Expr::Int(_) => None,
            Expr::Chain(segments) => match segments.as_slice() {
                [java, constant] if java.name == "JavaVersion" && java.is_plain() && constant.is_plain() => {
                    Some(constant.name.as_str())
                }
                _ => None,
            },
            _ => None,
        };
        let parsed = match expr {
            Expr::Int(i) => JavaVersion::parse(&i.to_string()),
            _ => text.and_then(JavaVersion::parse),
        };
        parsed.ok_or_else(|| invalid(field, "a Java version", expr))
    }

    /// `file("path")` or a plain string path
    pub fn file(&self, expr: &Expr, field: &str) -> Result<String> {
        if let Some([file]) = expr.as_chain() {
            if file.name == "file" && file.block.is_none() {
                if let Some(arg) = file.single_arg() {
                    return self.string(arg, field);
                }
            }
        }
        self.string(expr, field)
    }

    /// Properties such as `flutter.minSdkVersion`
    fn framework_property(&self, expr: &Expr, field: &str) -> Result<Option<PropertyValue>> {
        let framework = &self.config.framework;
        let segments: &[Segment] = match expr.as_chain() {
            Some(segments) => segments,
            None => return Ok(None),
        };
        let [extension, property] = segments else {
            return Ok(None);
        };
        if extension.name != framework.extension || !extension.is_plain() || !property.is_plain() {
            return Ok(None);
        }

        let full = format!("{}.{}", extension.name, property.name);
        if !self.framework_applied {
            return Err(ReferenceError::PluginNotApplied {
                property: full,
                plugin: framework.plugin.clone(),
                field: field.to_string(),
            }
            .into());
        }
        match framework.get(&property.name) {
            Some(value) => Ok(Some(value)),
            None => Err(ReferenceError::UndefinedValue {
                name: full,
                field: field.to_string(),
            }
            .into()),
        }
    }
}

/// Schema error for a value of the wrong shape
pub fn invalid(field: &str, expected: &str, found: &Expr) -> ComposeError {
    SchemaError::InvalidValue {
        field: field.to_string(),
        message: format!("expected {}, found `{}`", expected, found.describe()),
    }
    .into()
}

/// Schema error for an unrecognised statement inside `field`
pub fn unknown(field: &str, name: &str) -> ComposeError {
    SchemaError::UnknownField {
        field: join_field(field, name),
    }
    .into()
}

/// `android` + `compileSdk` -> `android.compileSdk`
pub fn join_field(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}
