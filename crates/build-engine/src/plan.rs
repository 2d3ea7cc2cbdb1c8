//! Build Plan
//!
//! The read-only result of composition, handed to the downstream toolchain.
//! Every map keeps declaration order so that composing the same sources twice
//! yields byte-identical output.

use std::path::{Path, PathBuf};
use indexmap::IndexMap;
use serde::Serialize;

use crate::android::AndroidExtension;
use crate::dependencies::DependencySet;
use crate::framework::FrameworkExtension;
use crate::plugins::PluginReference;
use crate::relocation::{DirectoryRelocationRule, ROOT_PROJECT};
use crate::repositories::Repository;
use crate::settings::Settings;
use crate::tasks::RegisteredTask;

/// `buildscript { }` of the root script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Buildscript {
    pub repositories: Vec<Repository>,
    pub classpath: DependencySet,
}

/// One fully resolved project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPlan {
    pub path: String,
    pub name: String,
    pub dir: PathBuf,
    /// Final build output directory after relocation
    pub build_dir: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluation_depends_on: Vec<String>,
    pub plugins: Vec<PluginReference>,
    pub repositories: Vec<Repository>,
    pub dependencies: DependencySet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<RegisteredTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<FrameworkExtension>,
}

/// Fully resolved configuration of a project tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPlan {
    pub root_dir: PathBuf,
    /// Order in which project scripts were evaluated, root first
    pub evaluation_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    pub buildscript: Buildscript,
    pub projects: IndexMap<String, ProjectPlan>,
    /// Every build-directory assignment, in evaluation order
    pub relocations: Vec<DirectoryRelocationRule>,
}

impl BuildPlan {
    /// Plan of the project at `path` (`:app`)
    pub fn project(&self, path: &str) -> Option<&ProjectPlan> {
        self.projects.get(path)
    }

    /// Plan of the root project
    pub fn root(&self) -> Option<&ProjectPlan> {
        self.projects.get(ROOT_PROJECT)
    }

    /// Final build directory of a project
    pub fn build_dir(&self, path: &str) -> Option<&Path> {
        self.projects.get(path).map(|p| p.build_dir.as_path())
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Pretty-printed TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
