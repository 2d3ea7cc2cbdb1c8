//! Gradle Composer
//!
//! Reads a multi-project Gradle Kotlin DSL build (settings script, root
//! script and one script per subproject), validates it and produces a
//! deterministic build plan for the downstream toolchain.
//!
//! ## Architecture
//!
//! - `gradle-composer-core`: error taxonomy and composer configuration
//! - `gradle-composer-dsl`: lexer and parser for the declarative DSL subset
//! - `gradle-composer-engine`: plugin resolution, the Android extension,
//!   dependencies, build-directory relocation and plan composition

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;

pub use gradle_composer_core as core;
pub use gradle_composer_dsl as dsl;
pub use gradle_composer_engine as engine;

pub use gradle_composer_core::{APP_NAME, VERSION};

/// Prelude module for convenient imports
pub mod prelude {
    pub use gradle_composer_core::{ComposeError, ComposerConfig, ErrorKind};
    pub use gradle_composer_dsl::Parser;
    pub use gradle_composer_engine::{compose_dir, BuildPlan, Composer, ProjectLoader, RelocationContext};
}
