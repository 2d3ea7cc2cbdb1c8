//! Build Directory Relocation
//!
//! The project tree shares one notion of "where does each project write its
//! outputs". Rather than mutable global state, that notion lives in an
//! explicit [`RelocationContext`] which every script evaluation step receives.
//!
//! A project's build directory is either a fixed path (an eager `.get()` or a
//! `file(...)`) or derived lazily from another project's build directory
//! (`rootProject.layout.buildDirectory.dir("x")`). Lazy links are resolved
//! once every script has run; they must not form a cycle, and no two projects
//! may end up with the same directory.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use gradle_composer_core::{ReferenceError, Result, StructuralError};
use gradle_composer_dsl::{Expr, Segment};
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::debug;

use crate::eval::{invalid, Binding, Bindings};

/// Path of the root project
pub const ROOT_PROJECT: &str = ":";

/// A directory value as written in a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DirValue {
    /// Absolute, already resolved path
    Fixed { path: PathBuf },
    /// `relative` below another project's (final) build directory
    BuildDirOf { project: String, relative: PathBuf },
}

impl DirValue {
    /// Directory fixed at composition time
    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        DirValue::Fixed {
            path: normalize_path(&path.into()),
        }
    }

    /// Append a relative path (`.dir("x")`)
    pub fn join(&self, rel: &str) -> Self {
        match self {
            DirValue::Fixed { path } => DirValue::fixed(path.join(rel)),
            DirValue::BuildDirOf { project, relative } => DirValue::BuildDirOf {
                project: project.clone(),
                relative: relative.join(rel),
            },
        }
    }
}

/// Where a relocation rule was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    /// A single project's own script, or a rule naming that project
    Project,
    /// A `subprojects { }` block in the root script
    Subprojects,
    /// An `allprojects { }` block in the root script
    AllProjects,
}

/// One build-directory assignment, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryRelocationRule {
    pub project: String,
    pub scope: RuleScope,
    pub target: DirValue,
    pub declared_at: String,
}

/// Identity and location of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectLocation {
    /// Gradle path (`:`, `:app`, `:feature:login`)
    pub path: String,
    pub name: String,
    pub dir: PathBuf,
}

/// Where an expression is being evaluated
pub struct DirScope<'a> {
    /// Project that `project` and bare `layout` refer to
    pub project: &'a str,
    pub bindings: &'a Bindings,
}

/// Explicit build-directory state shared by all projects
#[derive(Debug, Clone)]
pub struct RelocationContext {
    projects: IndexMap<String, ProjectLocation>,
    assignments: IndexMap<String, DirValue>,
    rules: Vec<DirectoryRelocationRule>,
}

impl RelocationContext {
    /// Create a context for the given projects; the first one should be the root
    pub fn new(projects: impl IntoIterator<Item = ProjectLocation>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.path.clone(), p)).collect(),
            assignments: IndexMap::new(),
            rules: Vec::new(),
        }
    }

    /// Location of the project at `path`
    pub fn project(&self, path: &str) -> Option<&ProjectLocation> {
        self.projects.get(path)
    }

    /// All projects, root first, in declaration order
    pub fn projects(&self) -> impl Iterator<Item = &ProjectLocation> {
        self.projects.values()
    }

    /// Look up a project, failing with a reference error naming `field`
    pub fn require_project(&self, path: &str, field: &str) -> Result<&ProjectLocation> {
        self.projects.get(path).ok_or_else(|| {
            ReferenceError::UnknownProject {
                path: path.to_string(),
                field: field.to_string(),
            }
            .into()
        })
    }

    /// Rules recorded so far
    pub fn rules(&self) -> &[DirectoryRelocationRule] {
        &self.rules
    }

    /// Assign a new build directory to `project`; later assignments win
    pub fn relocate(&mut self, project: &str, scope: RuleScope, target: DirValue, declared_at: &str) -> Result<()> {
        self.require_project(project, declared_at)?;
        debug!("Relocating build directory of {} to {:?}", project, target);
        self.assignments.insert(project.to_string(), target.clone());
        self.rules.push(DirectoryRelocationRule {
            project: project.to_string(),
            scope,
            target,
            declared_at: declared_at.to_string(),
        });
        Ok(())
    }

    /// Current build directory of `project`, following lazy links
    pub fn current_build_dir(&self, project: &str) -> Result<PathBuf> {
        let mut visited = Vec::new();
        self.current_inner(project, &mut visited)
    }

    fn current_inner(&self, project: &str, visited: &mut Vec<String>) -> Result<PathBuf> {
        if visited.iter().any(|p| p == project) {
            let start = visited.iter().position(|p| p == project).unwrap_or(0);
            let mut cycle: Vec<String> = visited[start..].to_vec();
            cycle.push(project.to_string());
            return Err(StructuralError::RelocationCycle { projects: cycle }.into());
        }
        visited.push(project.to_string());

        match self.assignments.get(project) {
            Some(DirValue::Fixed { path }) => Ok(path.clone()),
            Some(DirValue::BuildDirOf { project: base, relative }) => {
                let base_dir = self.current_inner(base, visited)?;
                Ok(normalize_path(&base_dir.join(relative)))
            }
            None => {
                let location = self.require_project(project, "layout.buildDirectory")?;
                Ok(location.dir.join("build"))
            }
        }
    }

    /// Resolve a directory value against the current state
    pub fn resolve_now(&self, value: &DirValue) -> Result<PathBuf> {
        match value {
            DirValue::Fixed { path } => Ok(path.clone()),
            DirValue::BuildDirOf { project, relative } => {
                Ok(normalize_path(&self.current_build_dir(project)?.join(relative)))
            }
        }
    }

    /// Evaluate a directory expression such as
    /// `rootProject.layout.buildDirectory.dir("../../build").get()`
    pub fn eval_dir(&self, expr: &Expr, scope: &DirScope<'_>, field: &str) -> Result<DirValue> {
        let segments = expr
            .as_chain()
            .ok_or_else(|| invalid(field, "a directory", expr))?;

        let (mut value, rest) = self.dir_base(segments, scope, expr, field)?;

        for segment in rest {
            value = match (segment.name.as_str(), segment.args.as_deref()) {
                ("dir", Some(_)) => {
                    let arg = segment
                        .single_arg()
                        .ok_or_else(|| invalid(field, "one path argument to `dir`", expr))?;
                    value.join(&self.eval_text(arg, scope, field)?)
                }
                ("get", Some([])) => DirValue::Fixed {
                    path: self.resolve_now(&value)?,
                },
                _ => return Err(invalid(field, "a directory", expr)),
            };
        }
        Ok(value)
    }

    /// Base directory of a chain and the segments still to apply
    fn dir_base<'s>(
        &self,
        segments: &'s [Segment],
        scope: &DirScope<'_>,
        expr: &Expr,
        field: &str,
    ) -> Result<(DirValue, &'s [Segment])> {
        let first = &segments[0];

        if first.is_plain() {
            if let Some(binding) = scope.bindings.get(&first.name) {
                return match binding {
                    Binding::Dir(dir) => Ok((dir.clone(), &segments[1..])),
                    Binding::Text(_) => Err(invalid(field, "a directory", expr)),
                };
            }
        }

        let (project, rest) = match self.project_ref(segments, scope, field)? {
            Some(found) => found,
            None => {
                return Err(ReferenceError::UndefinedValue {
                    name: first.name.clone(),
                    field: field.to_string(),
                }
                .into())
            }
        };
        let location = self.require_project(&project, field)?;

        match rest {
            [file, tail @ ..] if file.name == "file" => {
                let arg = file
                    .single_arg()
                    .ok_or_else(|| invalid(field, "one path argument to `file`", expr))?;
                let rel = self.eval_text(arg, scope, field)?;
                Ok((DirValue::fixed(location.dir.join(rel)), tail))
            }
            [layout, dir, tail @ ..] if layout.name == "layout" && layout.is_plain() && dir.is_plain() => {
                match dir.name.as_str() {
                    "buildDirectory" => Ok((
                        DirValue::BuildDirOf {
                            project,
                            relative: PathBuf::new(),
                        },
                        tail,
                    )),
                    "projectDirectory" => Ok((DirValue::fixed(location.dir.clone()), tail)),
                    _ => Err(invalid(field, "a directory", expr)),
                }
            }
            _ => Err(invalid(field, "a directory", expr)),
        }
    }

    /// Leading project reference of a chain: `rootProject`, `project`,
    /// `project(":x")`, or nothing (the current project)
    pub fn project_ref<'s>(
        &self,
        segments: &'s [Segment],
        scope: &DirScope<'_>,
        field: &str,
    ) -> Result<Option<(String, &'s [Segment])>> {
        let first = match segments.first() {
            Some(first) => first,
            None => return Ok(None),
        };
        match first.name.as_str() {
            "rootProject" if first.is_plain() => Ok(Some((ROOT_PROJECT.to_string(), &segments[1..]))),
            "project" if first.is_plain() => Ok(Some((scope.project.to_string(), &segments[1..]))),
            "project" if first.block.is_none() => {
                let path = first
                    .single_arg()
                    .and_then(Expr::as_str)
                    .ok_or_else(|| invalid(field, "a project path", &Expr::Chain(segments.to_vec())))?;
                self.require_project(path, field)?;
                Ok(Some((path.to_string(), &segments[1..])))
            }
            "layout" | "file" => Ok(Some((scope.project.to_string(), segments))),
            _ => Ok(None),
        }
    }

    /// String expression used as a path component
    pub fn eval_text(&self, expr: &Expr, scope: &DirScope<'_>, field: &str) -> Result<String> {
        match expr {
            Expr::Str(s) => Ok(s.clone()),
            Expr::Chain(segments) => {
                if let [single] = segments.as_slice() {
                    if single.is_plain() {
                        if let Some(Binding::Text(text)) = scope.bindings.get(&single.name) {
                            return Ok(text.clone());
                        }
                    }
                }
                match self.project_ref(segments, scope, field)? {
                    Some((project, [name])) if name.name == "name" && name.is_plain() => {
                        Ok(self.require_project(&project, field)?.name.clone())
                    }
                    _ => Err(invalid(field, "a string", expr)),
                }
            }
            _ => Err(invalid(field, "a string", expr)),
        }
    }

    /// Resolve every project's final build directory.
    ///
    /// Fails on lazy cycles and on two projects sharing a directory.
    pub fn finish(&self) -> Result<IndexMap<String, PathBuf>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let nodes: IndexMap<&str, NodeIndex> = self
            .projects
            .keys()
            .map(|path| (path.as_str(), graph.add_node(path.as_str())))
            .collect();

        for (project, value) in &self.assignments {
            if let DirValue::BuildDirOf { project: base, .. } = value {
                let from = nodes[project.as_str()];
                let to = *nodes
                    .get(base.as_str())
                    .ok_or_else(|| ReferenceError::UnknownProject {
                        path: base.clone(),
                        field: "layout.buildDirectory".to_string(),
                    })?;
                graph.add_edge(from, to, ());
            }
        }

        let order = match toposort(&graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                let start = graph[cycle.node_id()];
                return Err(StructuralError::RelocationCycle {
                    projects: self.cycle_from(start),
                }
                .into());
            }
        };

        // edges point from a project to the one it derives from, so walk backwards
        let mut resolved: IndexMap<String, PathBuf> = IndexMap::new();
        for node in order.into_iter().rev() {
            let path = graph[node];
            let dir = match self.assignments.get(path) {
                Some(DirValue::Fixed { path }) => path.clone(),
                Some(DirValue::BuildDirOf { project, relative }) => {
                    normalize_path(&resolved[project.as_str()].join(relative))
                }
                None => self.projects[path].dir.join("build"),
            };
            resolved.insert(path.to_string(), dir);
        }

        let mut ordered = IndexMap::new();
        let mut claimed: IndexMap<PathBuf, String> = IndexMap::new();
        for path in self.projects.keys() {
            let dir = resolved[path.as_str()].clone();
            if let Some(first) = claimed.get(&dir) {
                return Err(StructuralError::BuildDirConflict {
                    first: first.clone(),
                    second: path.clone(),
                    path: dir,
                }
                .into());
            }
            claimed.insert(dir.clone(), path.clone());
            ordered.insert(path.clone(), dir);
        }
        Ok(ordered)
    }

    /// Follow lazy links from `start` until a project repeats
    fn cycle_from(&self, start: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = start.to_string();
        while seen.insert(current.clone()) {
            chain.push(current.clone());
            match self.assignments.get(&current) {
                Some(DirValue::BuildDirOf { project, .. }) => current = project.clone(),
                _ => break,
            }
        }
        let begin = chain.iter().position(|p| *p == current).unwrap_or(0);
        let mut cycle = chain.split_off(begin);
        cycle.push(current);
        cycle
    }
}

/// Lexically normalise `.` and `..` components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Directory of a project path below the root (`:feature:login` -> `feature/login`)
pub fn project_dir(root: &Path, path: &str) -> PathBuf {
    path.split(':')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |dir, part| dir.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::{ComposeError, ErrorKind};
    use gradle_composer_dsl::{Parser, StatementKind};

    fn location(path: &str, dir: &str) -> ProjectLocation {
        ProjectLocation {
            path: path.to_string(),
            name: path.rsplit(':').next().unwrap_or_default().to_string(),
            dir: PathBuf::from(dir),
        }
    }

    fn context() -> RelocationContext {
        RelocationContext::new(vec![
            location(":", "/work/android"),
            location(":app", "/work/android/app"),
            location(":lib", "/work/android/lib"),
        ])
    }

    fn expr(src: &str) -> Expr {
        let script = Parser::parse_str(&format!("x = {}", src)).unwrap();
        match &script.statements[0].kind {
            StatementKind::Assign { value, .. } => value.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/work/android/build/../../build")),
            PathBuf::from("/work/build")
        );
        assert_eq!(normalize_path(Path::new("a/./../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn test_project_dir() {
        assert_eq!(
            project_dir(Path::new("/r"), ":feature:login"),
            PathBuf::from("/r/feature/login")
        );
        assert_eq!(project_dir(Path::new("/r"), ":"), PathBuf::from("/r"));
    }

    #[test]
    fn test_eager_root_relocation() {
        let mut ctx = context();
        let bindings = Bindings::new();
        let scope = DirScope { project: ":", bindings: &bindings };

        let value = ctx
            .eval_dir(&expr("rootProject.layout.buildDirectory.dir(\"../../build\").get()"), &scope, "x")
            .unwrap();
        assert_eq!(value, DirValue::fixed("/work/build"));

        ctx.relocate(":", RuleScope::Project, value.clone(), "x").unwrap();

        let mut bindings = Bindings::new();
        bindings.insert("newBuildDir".into(), Binding::Dir(value));
        let scope = DirScope { project: ":app", bindings: &bindings };
        let sub = ctx.eval_dir(&expr("newBuildDir.dir(project.name)"), &scope, "x").unwrap();
        ctx.relocate(":app", RuleScope::Subprojects, sub, "x").unwrap();

        let dirs = ctx.finish().unwrap();
        assert_eq!(dirs[":"], PathBuf::from("/work/build"));
        assert_eq!(dirs[":app"], PathBuf::from("/work/build/app"));
        assert_eq!(dirs[":lib"], PathBuf::from("/work/android/lib/build"));
        assert_eq!(ctx.rules().len(), 2);
    }

    #[test]
    fn test_lazy_link_follows_later_assignment() {
        let mut ctx = context();
        let bindings = Bindings::new();
        let scope = DirScope { project: ":app", bindings: &bindings };

        let lazy = ctx
            .eval_dir(&expr("rootProject.layout.buildDirectory.dir(\"app-out\")"), &scope, "x")
            .unwrap();
        ctx.relocate(":app", RuleScope::Project, lazy, "x").unwrap();
        ctx.relocate(":", RuleScope::Project, DirValue::fixed("/out"), "x").unwrap();

        let dirs = ctx.finish().unwrap();
        assert_eq!(dirs[":app"], PathBuf::from("/out/app-out"));
    }

    #[test]
    fn test_lazy_cycle_rejected() {
        let mut ctx = context();
        let bindings = Bindings::new();

        let scope = DirScope { project: ":app", bindings: &bindings };
        let to_lib = ctx.eval_dir(&expr("project(\":lib\").layout.buildDirectory.dir(\"a\")"), &scope, "x").unwrap();
        ctx.relocate(":app", RuleScope::Project, to_lib, "x").unwrap();

        let scope = DirScope { project: ":lib", bindings: &bindings };
        let to_app = ctx.eval_dir(&expr("project(\":app\").layout.buildDirectory.dir(\"b\")"), &scope, "x").unwrap();
        ctx.relocate(":lib", RuleScope::Project, to_app, "x").unwrap();

        let err = ctx.finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        match err {
            ComposeError::Structural(StructuralError::RelocationCycle { projects }) => {
                assert_eq!(projects.len(), 3);
                assert_eq!(projects.first(), projects.last());
            }
            other => panic!("unexpected {:?}", other),
        }

        // an eager read of a cyclic value fails the same way
        assert!(ctx.current_build_dir(":app").is_err());
    }

    #[test]
    fn test_conflict_rejected() {
        let mut ctx = context();
        ctx.relocate(":app", RuleScope::Project, DirValue::fixed("/shared"), "x").unwrap();
        ctx.relocate(":lib", RuleScope::Project, DirValue::fixed("/shared/./"), "x").unwrap();

        match ctx.finish().unwrap_err() {
            ComposeError::Structural(StructuralError::BuildDirConflict { first, second, path }) => {
                assert_eq!(first, ":app");
                assert_eq!(second, ":lib");
                assert_eq!(path, PathBuf::from("/shared"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_references() {
        let ctx = context();
        let bindings = Bindings::new();
        let scope = DirScope { project: ":app", bindings: &bindings };

        let err = ctx.eval_dir(&expr("project(\":nope\").layout.buildDirectory"), &scope, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);

        let err = ctx.eval_dir(&expr("missingVal.dir(\"a\")"), &scope, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);

        let err = ctx.eval_dir(&expr("layout.buildDirectory.map(\"a\")"), &scope, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }
}
