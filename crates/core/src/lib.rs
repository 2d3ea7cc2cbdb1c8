//! Gradle Composer Core - shared types
//!
//! This crate holds the pieces every other Gradle Composer crate leans on:
//! the configuration-error taxonomy and the composer's own configuration
//! (plugin registry and framework-provided properties).

pub mod config;
pub mod error;

pub use config::{ComposerConfig, FrameworkProperties, PluginRole, PluginSpec, PropertyValue};
pub use error::{
    ComposeError, ErrorKind, ReferenceError, Result, SchemaError, StructuralError, SyntaxError,
};

/// Gradle Composer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool name
pub const APP_NAME: &str = "Gradle Composer";
