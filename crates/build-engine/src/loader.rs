//! Project Loader
//!
//! Reads a project tree from disk: the optional `settings.gradle.kts`, the
//! root `build.gradle.kts` and the script of every subproject. Subprojects
//! come from `include(...)` in the settings script, or, without one, from
//! child directories that contain a `build.gradle.kts`.

use std::path::{Path, PathBuf};
use gradle_composer_core::{ComposeError, Result};
use gradle_composer_dsl::{Parser, Script};
use tracing::{debug, info};

use crate::composer::{ProjectSources, SubprojectSource};
use crate::relocation::project_dir;
use crate::settings::included_projects;

/// Kotlin DSL build script name
pub const BUILD_SCRIPT: &str = "build.gradle.kts";
/// Kotlin DSL settings script name
pub const SETTINGS_SCRIPT: &str = "settings.gradle.kts";
/// Groovy build script name, recognised only to report it
pub const GROOVY_BUILD_SCRIPT: &str = "build.gradle";

/// Loads [`ProjectSources`] from a directory
pub struct ProjectLoader;

impl ProjectLoader {
    /// Load the project tree rooted at `dir`
    pub async fn load(dir: impl AsRef<Path>) -> Result<ProjectSources> {
        let root_dir = tokio::fs::canonicalize(dir.as_ref()).await?;
        info!("Loading project tree from {:?}", root_dir);

        let root_script = root_dir.join(BUILD_SCRIPT);
        if !is_file(&root_script).await {
            if is_file(&root_dir.join(GROOVY_BUILD_SCRIPT)).await {
                return Err(ComposeError::Config(format!(
                    "{} uses a Groovy build script; only {} is supported",
                    root_dir.display(),
                    BUILD_SCRIPT
                )));
            }
            return Err(ComposeError::Config(format!(
                "no {} found in {}",
                BUILD_SCRIPT,
                root_dir.display()
            )));
        }

        let settings = read_optional(&root_dir.join(SETTINGS_SCRIPT)).await?;
        let root = Parser::parse_file(&root_script).await?;

        let paths = match &settings {
            Some(script) => included_projects(script)?,
            None => discover(&root_dir).await?,
        };

        let mut subprojects = Vec::with_capacity(paths.len());
        for path in paths {
            let dir = project_dir(&root_dir, &path);
            let script = read_optional(&dir.join(BUILD_SCRIPT)).await?;
            debug!("Subproject {} at {:?} (script: {})", path, dir, script.is_some());
            subprojects.push(SubprojectSource { path, dir, script });
        }

        Ok(ProjectSources {
            root_dir,
            settings,
            root,
            subprojects,
        })
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn read_optional(path: &Path) -> Result<Option<Script>> {
    if is_file(path).await {
        Ok(Some(Parser::parse_file(path).await?))
    } else {
        Ok(None)
    }
}

/// Child directories holding a build script, sorted by name
async fn discover(root_dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    let mut entries = tokio::fs::read_dir(root_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path: PathBuf = entry.path();
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        if is_file(&path.join(BUILD_SCRIPT)).await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names.into_iter().map(|name| format!(":{}", name)).collect())
}
