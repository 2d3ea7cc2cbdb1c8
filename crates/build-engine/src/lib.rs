//! Build Configuration Engine
//!
//! Turns parsed Gradle Kotlin DSL scripts into a validated, deterministic
//! [`BuildPlan`]: plugins with ordering constraints, the Android extension,
//! dependencies with platform imports, repositories, registered tasks and
//! relocated build directories.

pub mod android;
pub mod composer;
pub mod dependencies;
pub mod eval;
pub mod framework;
pub mod loader;
pub mod plan;
pub mod plugins;
pub mod relocation;
pub mod repositories;
pub mod settings;
pub mod signing;
pub mod tasks;

pub use android::{AndroidExtension, AndroidKind, BuildVariantConfig, DefaultConfig};
pub use composer::{Composer, ProjectSources, SubprojectSource};
pub use dependencies::{Coordinate, DependencyDeclaration, DependencyNotation, DependencySet, Scope};
pub use eval::JavaVersion;
pub use framework::FrameworkExtension;
pub use loader::{ProjectLoader, BUILD_SCRIPT, SETTINGS_SCRIPT};
pub use plan::{BuildPlan, Buildscript, ProjectPlan};
pub use plugins::{PluginDeclaration, PluginReference, PluginRegistry};
pub use relocation::{DirValue, DirectoryRelocationRule, RelocationContext, RuleScope, ROOT_PROJECT};
pub use repositories::Repository;
pub use settings::Settings;
pub use signing::SigningConfig;
pub use tasks::RegisteredTask;

use std::path::Path;
use gradle_composer_core::{ComposerConfig, Result};

/// Load the project tree at `dir` and compose it
pub async fn compose_dir(config: &ComposerConfig, dir: impl AsRef<Path>) -> Result<BuildPlan> {
    let sources = ProjectLoader::load(dir).await?;
    Composer::new(config).compose(&sources)
}
