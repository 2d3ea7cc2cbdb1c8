//! Composition
//!
//! Runs the whole pipeline over a loaded project tree:
//!
//! 1. interpret `settings.gradle.kts`, if present
//! 2. evaluate the root script; `allprojects { }` / `subprojects { }` bodies
//!    run once per target project, immediately, against the shared
//!    [`RelocationContext`]
//! 3. evaluate project scripts, honouring `evaluationDependsOn`
//! 4. resolve every build directory and emit a [`BuildPlan`]
//!
//! Any error aborts composition; nothing is partially applied.

use std::path::{Path, PathBuf};
use gradle_composer_core::{
    ComposeError, ComposerConfig, PluginRole, ReferenceError, Result, SchemaError, StructuralError,
};
use gradle_composer_dsl::{Expr, Script, Segment, Statement, StatementKind};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::android::{AndroidExtension, AndroidKind, APPLICATION_PLUGIN};
use crate::dependencies::{parse_dependencies, DependencyBlock, DependencyDeclaration, DependencyNotation, DependencySet};
use crate::eval::{invalid, join_field, unknown, Binding, Bindings, Evaluator};
use crate::framework::FrameworkExtension;
use crate::plan::{BuildPlan, Buildscript, ProjectPlan};
use crate::plugins::{has_role, parse_plugins, PluginReference, PluginRegistry};
use crate::relocation::{DirScope, DirValue, ProjectLocation, RelocationContext, RuleScope, ROOT_PROJECT};
use crate::repositories::{describe_statement, parse_repositories, Repository};
use crate::settings::Settings;
use crate::tasks::{is_registration, parse_registration, TaskDeclaration};

/// A subproject and its script, if it has one
#[derive(Debug, Clone)]
pub struct SubprojectSource {
    pub path: String,
    pub dir: PathBuf,
    pub script: Option<Script>,
}

/// Parsed scripts of a project tree
#[derive(Debug, Clone)]
pub struct ProjectSources {
    pub root_dir: PathBuf,
    pub settings: Option<Script>,
    pub root: Script,
    pub subprojects: Vec<SubprojectSource>,
}

#[derive(Debug, Default)]
struct ProjectDraft {
    plugins: Vec<PluginReference>,
    repositories: Vec<Repository>,
    dependencies: Vec<DependencyDeclaration>,
    evaluation_depends_on: Vec<String>,
    tasks: Vec<TaskDeclaration>,
    android: Option<AndroidExtension>,
    framework: Option<FrameworkExtension>,
}

/// Mutable state threaded through one composition
struct Composition {
    ctx: RelocationContext,
    drafts: IndexMap<String, ProjectDraft>,
    buildscript: Buildscript,
}

impl Composition {
    fn draft(&mut self, path: &str, field: &str) -> Result<&mut ProjectDraft> {
        self.drafts.get_mut(path).ok_or_else(|| {
            ReferenceError::UnknownProject {
                path: path.to_string(),
                field: field.to_string(),
            }
            .into()
        })
    }
}

/// Where a statement is being evaluated
struct Site<'s> {
    /// Project that `project` and bare `layout` refer to
    project: &'s str,
    scope: RuleScope,
    /// Field path prefix (`subprojects`, `allprojects` or empty)
    prefix: &'s str,
    /// Statement comes from the root script
    in_root: bool,
}

/// Plugins applied by one script and what they enable
struct Applied<'c> {
    eval: Evaluator<'c>,
    android: Option<AndroidKind>,
    framework: bool,
}

impl<'c> Applied<'c> {
    fn none(config: &'c ComposerConfig) -> Self {
        Self {
            eval: Evaluator::new(config, false),
            android: None,
            framework: false,
        }
    }
}

#[derive(PartialEq)]
enum Stage {
    Start,
    Plugins,
    Body,
}

/// Composes a [`BuildPlan`] from project sources
pub struct Composer<'a> {
    config: &'a ComposerConfig,
}

impl<'a> Composer<'a> {
    /// Composer using `config` for plugins and framework properties
    pub fn new(config: &'a ComposerConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline
    pub fn compose(&self, sources: &ProjectSources) -> Result<BuildPlan> {
        info!("Composing build plan for {:?}", sources.root_dir);

        let settings = match &sources.settings {
            Some(script) => Some(Settings::from_script(script, self.config, &sources.root_dir)?),
            None => None,
        };
        if let Some(settings) = &settings {
            for include in &settings.includes {
                if !sources.subprojects.iter().any(|s| &s.path == include) {
                    return Err(ReferenceError::UnknownProject {
                        path: include.clone(),
                        field: "settings.include".to_string(),
                    }
                    .into());
                }
            }
        }

        let root_name = settings
            .as_ref()
            .and_then(|s| s.root_name.clone())
            .unwrap_or_else(|| dir_name(&sources.root_dir));
        let mut locations = vec![ProjectLocation {
            path: ROOT_PROJECT.to_string(),
            name: root_name,
            dir: sources.root_dir.clone(),
        }];
        for sub in &sources.subprojects {
            if locations.iter().any(|l| l.path == sub.path) {
                return Err(SchemaError::Duplicate {
                    field: "settings.include".to_string(),
                    name: sub.path.clone(),
                }
                .into());
            }
            locations.push(ProjectLocation {
                path: sub.path.clone(),
                name: sub.path.rsplit(':').next().unwrap_or_default().to_string(),
                dir: sub.dir.clone(),
            });
        }

        let mut state = Composition {
            drafts: locations
                .iter()
                .map(|l| (l.path.clone(), ProjectDraft::default()))
                .collect(),
            ctx: RelocationContext::new(locations),
            buildscript: Buildscript::default(),
        };

        self.evaluate_root(&sources.root, &mut state)?;
        state.buildscript.classpath.validate("buildscript.dependencies")?;

        let order = evaluation_order(&state.drafts)?;
        debug!("Evaluation order: {:?}", order);
        for path in order.iter().skip(1) {
            let source = sources.subprojects.iter().find(|s| &s.path == path);
            if let Some(SubprojectSource {
                script: Some(script), ..
            }) = source
            {
                self.evaluate_project(path, script, &mut state)?;
            }
        }

        let build_dirs = state.ctx.finish()?;
        let mut projects = IndexMap::new();
        for location in state.ctx.projects() {
            let draft = state.drafts.shift_remove(&location.path).unwrap_or_default();
            let dependencies = DependencySet::new(draft.dependencies);
            dependencies.validate("dependencies")?;
            let tasks = draft
                .tasks
                .iter()
                .map(|task| task.resolve(&build_dirs))
                .collect::<Result<Vec<_>>>()?;
            let build_dir = build_dirs.get(&location.path).cloned().ok_or_else(|| {
                ReferenceError::UnknownProject {
                    path: location.path.clone(),
                    field: "layout.buildDirectory".to_string(),
                }
            })?;

            projects.insert(
                location.path.clone(),
                ProjectPlan {
                    path: location.path.clone(),
                    name: location.name.clone(),
                    dir: location.dir.clone(),
                    build_dir,
                    evaluation_depends_on: draft.evaluation_depends_on,
                    plugins: draft.plugins,
                    repositories: draft.repositories,
                    dependencies,
                    tasks,
                    android: draft.android,
                    framework: draft.framework,
                },
            );
        }

        info!("Composed {} project(s)", projects.len());
        Ok(BuildPlan {
            root_dir: sources.root_dir.clone(),
            evaluation_order: order,
            settings,
            buildscript: state.buildscript,
            projects,
            relocations: state.ctx.rules().to_vec(),
        })
    }

    fn evaluate_root(&self, script: &Script, state: &mut Composition) -> Result<()> {
        // `allprojects`/`subprojects` bodies never see the root's plugins
        let shared_eval = Evaluator::new(self.config, false);
        let mut applied = Applied::none(self.config);
        let mut bindings = Bindings::new();
        let mut stage = Stage::Start;
        let site = Site {
            project: ROOT_PROJECT,
            scope: RuleScope::Project,
            prefix: "",
            in_root: true,
        };

        for statement in &script.statements {
            match block_of(statement) {
                Some(("buildscript", body)) => {
                    if stage != Stage::Start {
                        return Err(misplaced("buildscript"));
                    }
                    self.buildscript(body, &shared_eval, state)?;
                }
                Some(("plugins", body)) => {
                    if stage != Stage::Start {
                        return Err(misplaced("plugins"));
                    }
                    stage = Stage::Plugins;
                    applied = self.apply_plugins(ROOT_PROJECT, body, state)?;
                }
                Some((name @ ("allprojects" | "subprojects"), body)) => {
                    stage = Stage::Body;
                    let (targets, scope): (Vec<String>, RuleScope) = {
                        let all = state.ctx.projects().map(|p| p.path.clone());
                        if name == "allprojects" {
                            (all.collect(), RuleScope::AllProjects)
                        } else {
                            (all.filter(|p| p != ROOT_PROJECT).collect(), RuleScope::Subprojects)
                        }
                    };
                    for target in &targets {
                        debug!("Evaluating {} body for {}", name, target);
                        let target_site = Site {
                            project: target,
                            scope,
                            prefix: name,
                            in_root: true,
                        };
                        let mut local = bindings.clone();
                        for statement in body {
                            self.common_statement(statement, &target_site, &shared_eval, &mut local, state)?;
                        }
                    }
                }
                Some((name, body)) if self.is_extension(name) => {
                    stage = Stage::Body;
                    self.extension_block(ROOT_PROJECT, name, body, &applied, state)?;
                }
                _ => {
                    stage = Stage::Body;
                    self.common_statement(statement, &site, &applied.eval, &mut bindings, state)?;
                }
            }
        }

        self.require_android(ROOT_PROJECT, &applied, state)
    }

    fn buildscript(&self, body: &[Statement], eval: &Evaluator<'_>, state: &mut Composition) -> Result<()> {
        for statement in body {
            match block_of(statement) {
                Some(("repositories", inner)) => {
                    state.buildscript.repositories = parse_repositories(inner, eval, "buildscript.repositories")?;
                }
                Some(("dependencies", inner)) => {
                    let set = parse_dependencies(inner, eval, "buildscript.dependencies", DependencyBlock::Buildscript)?;
                    state.buildscript.classpath.extend(set.iter().cloned());
                }
                _ => return Err(unknown("buildscript", &describe_statement(statement))),
            }
        }
        Ok(())
    }

    fn resolve_plugins(&self, body: &[Statement]) -> Result<Vec<PluginReference>> {
        let declarations = parse_plugins(body, "plugins")?;
        PluginRegistry::new(self.config).resolve(&declarations, "plugins")
    }

    fn evaluate_project(&self, path: &str, script: &Script, state: &mut Composition) -> Result<()> {
        debug!("Evaluating project {}", path);
        let mut applied = Applied::none(self.config);
        let mut bindings = Bindings::new();
        let mut stage = Stage::Start;
        let site = Site {
            project: path,
            scope: RuleScope::Project,
            prefix: "",
            in_root: false,
        };

        for statement in &script.statements {
            match block_of(statement) {
                Some(("plugins", body)) => {
                    if stage != Stage::Start {
                        return Err(misplaced("plugins"));
                    }
                    stage = Stage::Plugins;
                    applied = self.apply_plugins(path, body, state)?;
                }
                Some((name, body)) if self.is_extension(name) => {
                    stage = Stage::Body;
                    self.extension_block(path, name, body, &applied, state)?;
                }
                _ => {
                    stage = Stage::Body;
                    self.common_statement(statement, &site, &applied.eval, &mut bindings, state)?;
                }
            }
        }

        self.require_android(path, &applied, state)
    }

    /// Resolve a `plugins { }` block and record it on the project
    fn apply_plugins(&self, path: &str, body: &[Statement], state: &mut Composition) -> Result<Applied<'a>> {
        let plugins = self.resolve_plugins(body)?;
        let framework = has_role(&plugins, |r| r == PluginRole::Framework);
        let android = if has_role(&plugins, |r| r == PluginRole::AndroidApplication) {
            Some(AndroidKind::Application)
        } else if has_role(&plugins, |r| r == PluginRole::AndroidLibrary) {
            Some(AndroidKind::Library)
        } else {
            None
        };
        state.draft(path, "plugins")?.plugins = plugins;
        Ok(Applied {
            eval: Evaluator::new(self.config, framework),
            android,
            framework,
        })
    }

    fn is_extension(&self, name: &str) -> bool {
        name == "android" || name == self.config.framework.extension
    }

    /// `android { }` or the framework block of one project
    fn extension_block(
        &self,
        path: &str,
        name: &str,
        body: &[Statement],
        applied: &Applied<'_>,
        state: &mut Composition,
    ) -> Result<()> {
        let project_dir = state.ctx.require_project(path, name)?.dir.clone();
        if name == "android" {
            let kind = applied.android.ok_or_else(|| ReferenceError::PluginNotApplied {
                property: "android".to_string(),
                plugin: APPLICATION_PLUGIN.to_string(),
                field: "android".to_string(),
            })?;
            let extension = AndroidExtension::from_block(body, &applied.eval, kind, &project_dir, "android")?;
            let draft = state.draft(path, "android")?;
            if draft.android.is_some() {
                return Err(SchemaError::Duplicate {
                    field: "android".to_string(),
                    name: path.to_string(),
                }
                .into());
            }
            draft.android = Some(extension);
            return Ok(());
        }

        let framework = &self.config.framework;
        if !applied.framework {
            return Err(ReferenceError::PluginNotApplied {
                property: name.to_string(),
                plugin: framework.plugin.clone(),
                field: name.to_string(),
            }
            .into());
        }
        let extension = FrameworkExtension::from_block(body, &applied.eval, &project_dir, name)?;
        state.draft(path, name)?.framework = Some(extension);
        Ok(())
    }

    /// An applied Android plugin needs its required fields even without a block
    fn require_android(&self, path: &str, applied: &Applied<'_>, state: &mut Composition) -> Result<()> {
        let Some(kind) = applied.android else {
            return Ok(());
        };
        if state.draft(path, "android")?.android.is_some() {
            return Ok(());
        }
        let project_dir = state.ctx.require_project(path, "android")?.dir.clone();
        let extension = AndroidExtension::from_block(&[], &applied.eval, kind, &project_dir, "android")?;
        state.draft(path, "android")?.android = Some(extension);
        Ok(())
    }

    /// Statements shared by the root script, `allprojects`/`subprojects`
    /// bodies and project scripts
    fn common_statement(
        &self,
        statement: &Statement,
        site: &Site<'_>,
        eval: &Evaluator<'_>,
        bindings: &mut Bindings,
        state: &mut Composition,
    ) -> Result<()> {
        match &statement.kind {
            StatementKind::Val { name, ty, value } => {
                let field = join_field(site.prefix, name);
                let binding = {
                    let scope = DirScope {
                        project: site.project,
                        bindings,
                    };
                    bind(&state.ctx, ty.as_deref(), value, &scope, &field)?
                };
                debug!("val {} = {:?}", name, binding);
                bindings.insert(name.clone(), binding);
                Ok(())
            }
            StatementKind::Assign { target, value } => {
                // `layout.buildDirectory = ...`
                let segments: Vec<Segment> = target
                    .iter()
                    .map(|name| Segment {
                        name: name.clone(),
                        ..Segment::default()
                    })
                    .collect();
                let field = join_field(site.prefix, &target.join("."));
                let scope = DirScope {
                    project: site.project,
                    bindings,
                };
                match state.ctx.project_ref(&segments, &scope, &field)? {
                    Some((project, rest)) if is_build_dir(rest) => {
                        let value = state.ctx.eval_dir(value, &scope, &field)?;
                        relocate(state, site, &project, value)
                    }
                    _ => Err(unknown(site.prefix, &target.join("."))),
                }
            }
            StatementKind::Expr(expr) => {
                let segments = expr
                    .as_chain()
                    .ok_or_else(|| unknown(site.prefix, &expr.describe()))?;

                match block_of(statement) {
                    Some(("repositories", body)) => {
                        let field = join_field(site.prefix, "repositories");
                        let repositories = parse_repositories(body, eval, &field)?;
                        let draft = state.draft(site.project, &field)?;
                        for repository in repositories {
                            if !draft.repositories.contains(&repository) {
                                draft.repositories.push(repository);
                            }
                        }
                        return Ok(());
                    }
                    Some(("dependencies", body)) => {
                        let field = join_field(site.prefix, "dependencies");
                        let set = parse_dependencies(body, eval, &field, DependencyBlock::Project)?;
                        for declaration in set.iter() {
                            if let DependencyNotation::Project { path } = &declaration.notation {
                                let dep_field = join_field(&field, declaration.scope.as_str());
                                state.ctx.require_project(path, &dep_field)?;
                            }
                        }
                        state
                            .draft(site.project, &field)?
                            .dependencies
                            .extend(set.iter().cloned());
                        return Ok(());
                    }
                    _ => {}
                }

                if is_registration(segments) {
                    let field = join_field(site.prefix, "tasks");
                    let task = {
                        let scope = DirScope {
                            project: site.project,
                            bindings,
                        };
                        parse_registration(segments, eval, &state.ctx, &scope, &field)?
                    };
                    debug!("Registered task {} ({})", task.name, task.task_type);
                    let draft = state.draft(site.project, &field)?;
                    if draft.tasks.iter().any(|t| t.name == task.name) {
                        return Err(SchemaError::Duplicate { field, name: task.name }.into());
                    }
                    draft.tasks.push(task);
                    return Ok(());
                }

                let field = join_field(site.prefix, &expr.describe());
                let scope = DirScope {
                    project: site.project,
                    bindings,
                };
                let (project, rest) = match segments.first() {
                    Some(first) if first.name == "evaluationDependsOn" => (site.project.to_string(), segments),
                    _ => match state.ctx.project_ref(segments, &scope, &field)? {
                        Some(found) => found,
                        None => return Err(unknown(site.prefix, &expr.describe())),
                    },
                };

                match rest {
                    [call] if call.name == "evaluationDependsOn" && site.in_root => {
                        let field = join_field(site.prefix, "evaluationDependsOn");
                        let target = call
                            .single_arg()
                            .and_then(Expr::as_str)
                            .map(|p| absolute_path(&project, p))
                            .ok_or_else(|| invalid(&field, "a project path", expr))?;
                        state.ctx.require_project(&target, &field)?;
                        if target == project || project == ROOT_PROJECT || target == ROOT_PROJECT {
                            debug!("Ignoring evaluationDependsOn({}) for {}", target, project);
                            return Ok(());
                        }
                        let draft = state.draft(&project, &field)?;
                        if !draft.evaluation_depends_on.contains(&target) {
                            draft.evaluation_depends_on.push(target);
                        }
                        Ok(())
                    }
                    [_, _, setter]
                        if is_build_dir(&rest[..2])
                            && matches!(setter.name.as_str(), "value" | "set")
                            && setter.block.is_none() =>
                    {
                        let field = join_field(site.prefix, "layout.buildDirectory");
                        let arg = setter
                            .single_arg()
                            .ok_or_else(|| invalid(&field, "one directory", expr))?;
                        let value = state.ctx.eval_dir(arg, &scope, &field)?;
                        relocate(state, site, &project, value)
                    }
                    _ => Err(unknown(site.prefix, &expr.describe())),
                }
            }
        }
    }
}

fn relocate(state: &mut Composition, site: &Site<'_>, project: &str, value: DirValue) -> Result<()> {
    let field = join_field(site.prefix, "layout.buildDirectory");
    let scope = if project == site.project {
        site.scope
    } else {
        RuleScope::Project
    };
    state.ctx.relocate(project, scope, value, &field)
}

/// `layout.buildDirectory` with no call parts
fn is_build_dir(segments: &[Segment]) -> bool {
    matches!(
        segments,
        [layout, dir] if layout.name == "layout" && layout.is_plain() && dir.name == "buildDirectory" && dir.is_plain()
    )
}

/// Name and body of a `name { ... }` block statement
fn block_of(statement: &Statement) -> Option<(&str, &[Statement])> {
    match statement.chain() {
        Some([segment]) if segment.args.is_none() && segment.type_args.is_empty() => {
            segment.block.as_deref().map(|body| (segment.name.as_str(), body))
        }
        _ => None,
    }
}

fn misplaced(block: &str) -> ComposeError {
    SchemaError::InvalidValue {
        field: block.to_string(),
        message: "must appear before any other statement".to_string(),
    }
    .into()
}

/// Bind a `val` according to its declared type
fn bind(ctx: &RelocationContext, ty: Option<&str>, value: &Expr, scope: &DirScope<'_>, field: &str) -> Result<Binding> {
    match ty {
        Some("String") => Ok(Binding::Text(ctx.eval_text(value, scope, field)?)),
        Some("Directory" | "Provider<Directory>" | "DirectoryProperty") => {
            Ok(Binding::Dir(ctx.eval_dir(value, scope, field)?))
        }
        Some(other) => Err(SchemaError::InvalidValue {
            field: field.to_string(),
            message: format!("unsupported binding type `{}`", other),
        }
        .into()),
        None => match value {
            Expr::Str(_) => Ok(Binding::Text(ctx.eval_text(value, scope, field)?)),
            Expr::Chain(segments) if segments.last().map_or(false, |s| s.name == "name" && s.is_plain()) => {
                Ok(Binding::Text(ctx.eval_text(value, scope, field)?))
            }
            _ => Ok(Binding::Dir(ctx.eval_dir(value, scope, field)?)),
        },
    }
}

/// Resolve a project path relative to `base` (`app` from `:` -> `:app`)
fn absolute_path(base: &str, path: &str) -> String {
    if path.starts_with(':') {
        path.to_string()
    } else if base == ROOT_PROJECT {
        format!(":{}", path)
    } else {
        format!("{}:{}", base, path)
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Root first, then subprojects in declaration order with every
/// `evaluationDependsOn` target moved ahead of its dependents
fn evaluation_order(drafts: &IndexMap<String, ProjectDraft>) -> Result<Vec<String>> {
    fn visit(
        path: &str,
        drafts: &IndexMap<String, ProjectDraft>,
        order: &mut Vec<String>,
        visiting: &mut Vec<String>,
    ) -> Result<()> {
        if order.iter().any(|p| p == path) {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|p| p == path) {
            let mut projects = visiting[start..].to_vec();
            projects.push(path.to_string());
            return Err(StructuralError::EvaluationCycle { projects }.into());
        }
        visiting.push(path.to_string());
        if let Some(draft) = drafts.get(path) {
            for dependency in &draft.evaluation_depends_on {
                visit(dependency, drafts, order, visiting)?;
            }
        }
        visiting.pop();
        order.push(path.to_string());
        Ok(())
    }

    let mut order = vec![ROOT_PROJECT.to_string()];
    let mut visiting = Vec::new();
    for path in drafts.keys().filter(|p| p.as_str() != ROOT_PROJECT) {
        visit(path, drafts, &mut order, &mut visiting)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradle_composer_core::{ComposeError, ErrorKind};
    use gradle_composer_dsl::Parser;

    const ROOT_SCRIPT: &str = r#"
buildscript {
    repositories {
        google()
        mavenCentral()
    }
    dependencies {
        classpath("com.android.tools.build:gradle:7.0.4")
        classpath("com.google.gms:google-services:4.4.2")
    }
}

allprojects {
    repositories {
        google()
        mavenCentral()
    }
}

val newBuildDir: Directory = rootProject.layout.buildDirectory.dir("../../build").get()
rootProject.layout.buildDirectory.value(newBuildDir)

subprojects {
    val newSubprojectBuildDir: Directory = newBuildDir.dir(project.name)
    project.layout.buildDirectory.value(newSubprojectBuildDir)
}

subprojects {
    project.evaluationDependsOn(":app")
}

tasks.register<Delete>("clean") {
    delete(rootProject.layout.buildDirectory)
}
"#;

    const APP_SCRIPT: &str = r#"
plugins {
    id("com.android.application")
    id("kotlin-android")
    // The Flutter Gradle Plugin must be applied after the Android and Kotlin Gradle plugins.
    id("dev.flutter.flutter-gradle-plugin")
    id("com.google.gms.google-services")
}

android {
    namespace = "com.example.flaviocodigos"
    compileSdk = flutter.compileSdkVersion
    ndkVersion = "27.0.12077973"

    compileOptions {
        sourceCompatibility = JavaVersion.VERSION_11
        targetCompatibility = JavaVersion.VERSION_11
    }

    kotlinOptions {
        jvmTarget = JavaVersion.VERSION_11.toString()
    }

    defaultConfig {
        applicationId = "com.example.flaviocodigos"
        minSdk = flutter.minSdkVersion
        targetSdk = flutter.targetSdkVersion
        versionCode = flutter.versionCode
        versionName = flutter.versionName
    }

    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("debug")
        }
    }
}

flutter {
    source = "../.."
}

dependencies {
    implementation(platform("com.google.firebase:firebase-bom:33.10.0"))
    implementation("com.google.firebase:firebase-analytics")
}
"#;

    fn sources(root: &str, subprojects: &[(&str, &str)]) -> ProjectSources {
        ProjectSources {
            root_dir: PathBuf::from("/work/android"),
            settings: None,
            root: Parser::parse_str(root).unwrap(),
            subprojects: subprojects
                .iter()
                .map(|(path, script)| SubprojectSource {
                    path: path.to_string(),
                    dir: PathBuf::from("/work/android").join(path.trim_start_matches(':')),
                    script: Some(Parser::parse_str(script).unwrap()),
                })
                .collect(),
        }
    }

    fn compose(root: &str, subprojects: &[(&str, &str)]) -> Result<BuildPlan> {
        let config = ComposerConfig::default();
        Composer::new(&config).compose(&sources(root, subprojects))
    }

    fn app(body: &str) -> String {
        format!("plugins {{\n id(\"com.android.application\")\n}}\n{}", body)
    }

    const MINIMAL_ANDROID: &str = r#"
android {
    namespace = "com.example.app"
    compileSdk = 34
    defaultConfig {
        applicationId = "com.example.app"
        minSdk = 21
    }
    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("SIGNING")
        }
    }
}
"#;

    #[test]
    fn test_flutter_project_composes() {
        let plan = compose(ROOT_SCRIPT, &[(":app", APP_SCRIPT)]).unwrap();

        assert_eq!(plan.build_dir(":"), Some(Path::new("/work/build")));
        assert_eq!(plan.build_dir(":app"), Some(Path::new("/work/build/app")));
        assert_eq!(plan.evaluation_order, vec![":", ":app"]);
        assert_eq!(plan.buildscript.classpath.len(), 2);
        assert_eq!(plan.buildscript.repositories, vec![Repository::Google, Repository::MavenCentral]);

        let root = plan.root().unwrap();
        assert_eq!(root.name, "android");
        assert_eq!(root.tasks[0].deletes, vec![PathBuf::from("/work/build")]);
        assert_eq!(root.repositories.len(), 2);

        let app = plan.project(":app").unwrap();
        let android = app.android.as_ref().unwrap();
        assert_eq!(android.namespace, "com.example.flaviocodigos");
        assert_eq!(android.compile_sdk, 35);
        assert_eq!(android.build_types["release"].signing_config.as_deref(), Some("debug"));
        assert_eq!(app.framework.as_ref().unwrap().source, PathBuf::from("/work"));
        assert_eq!(app.dependencies.len(), 2);
        assert_eq!(app.plugins.len(), 4);
        // self-dependency from the subprojects block is ignored
        assert!(app.evaluation_depends_on.is_empty());

        assert_eq!(plan.relocations.len(), 2);
        assert_eq!(plan.relocations[1].scope, RuleScope::Subprojects);
    }

    #[test]
    fn test_composition_is_deterministic() {
        let first = compose(ROOT_SCRIPT, &[(":app", APP_SCRIPT)]).unwrap();
        let second = compose(ROOT_SCRIPT, &[(":app", APP_SCRIPT)]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.to_toml().unwrap(), second.to_toml().unwrap());
    }

    #[test]
    fn test_signing_reference() {
        let plan = compose("", &[(":app", &app(&MINIMAL_ANDROID.replace("SIGNING", "debug")))]).unwrap();
        let android = plan.project(":app").unwrap().android.as_ref().unwrap();
        assert_eq!(android.compile_sdk, 34);
        assert_eq!(android.default_config.min_sdk, 21);
        assert_eq!(android.default_config.application_id.as_deref(), Some("com.example.app"));
        assert_eq!(android.build_types["release"].signing_config.as_deref(), Some("debug"));

        let err = compose("", &[(":app", &app(&MINIMAL_ANDROID.replace("SIGNING", "release-missing")))])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("release-missing"));
        assert_eq!(err.field(), Some("android.buildTypes.release.signingConfig"));
    }

    #[test]
    fn test_plugin_errors() {
        let err = compose("", &[(":app", "plugins {\n id(\"com.example.unknown\")\n}")]).unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::UnknownPlugin { .. })));
        assert!(err.to_string().contains("com.example.unknown"));

        let err = compose(
            "",
            &[(
                ":app",
                "plugins {\n id(\"dev.flutter.flutter-gradle-plugin\")\n id(\"com.android.application\")\n}",
            )],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);

        let err = compose("", &[(":app", "repositories { google() }\nplugins { id(\"com.android.application\") }")])
            .unwrap_err();
        assert_eq!(err.field(), Some("plugins"));
    }

    #[test]
    fn test_missing_required_fields() {
        let err = compose("", &[(":app", &app("android {\n namespace = \"com.example.app\"\n}"))]).unwrap_err();
        assert!(matches!(err, ComposeError::Schema(SchemaError::MissingField { .. })));
        assert_eq!(err.field(), Some("android.compileSdk"));

        // applied plugin without any android block
        let err = compose("", &[(":app", &app(""))]).unwrap_err();
        assert_eq!(err.field(), Some("android.namespace"));
    }

    #[test]
    fn test_extension_without_plugin() {
        let err = compose("", &[(":app", "android { namespace = \"com.example.app\" }")]).unwrap_err();
        assert!(matches!(err, ComposeError::Reference(ReferenceError::PluginNotApplied { .. })));

        let err = compose("", &[(":app", "flutter { source = \"../..\" }")]).unwrap_err();
        assert_eq!(err.field(), Some("flutter"));
    }

    #[test]
    fn test_platform_declared_after_artifact() {
        let script = r#"
dependencies {
    implementation("com.google.firebase:firebase-analytics")
    implementation(platform("com.google.firebase:firebase-bom:33.10.0"))
}
"#;
        let err = compose("", &[(":lib", script)]).unwrap_err();
        assert!(matches!(err, ComposeError::Reference(ReferenceError::PlatformDeclaredAfter { .. })));
    }

    #[test]
    fn test_platform_in_earlier_block() {
        let bom = "implementation(platform(\"com.google.firebase:firebase-bom:33.10.0\"))";
        let analytics = "implementation(\"com.google.firebase:firebase-analytics\")";

        let script = format!("dependencies {{\n{}\n}}\ndependencies {{\n{}\n}}", bom, analytics);
        let plan = compose("", &[(":app", &script)]).unwrap();
        assert_eq!(plan.project(":app").unwrap().dependencies.len(), 2);

        let root = format!("allprojects {{\n dependencies {{\n{}\n }}\n}}", bom);
        let app_script = format!("dependencies {{\n{}\n}}", analytics);
        let plan = compose(&root, &[(":app", &app_script)]).unwrap();
        let deps = &plan.project(":app").unwrap().dependencies;
        assert!(deps[0].is_platform());
        assert_eq!(deps.len(), 2);

        let script = format!("dependencies {{\n{}\n}}\ndependencies {{\n{}\n}}", analytics, bom);
        let err = compose("", &[(":app", &script)]).unwrap_err();
        assert!(matches!(err, ComposeError::Reference(ReferenceError::PlatformDeclaredAfter { .. })));
    }

    #[test]
    fn test_single_module_android_root() {
        let plan = compose(&app(&MINIMAL_ANDROID.replace("SIGNING", "debug")), &[]).unwrap();
        let android = plan.root().unwrap().android.as_ref().unwrap();
        assert_eq!(android.compile_sdk, 34);
        assert_eq!(android.namespace, "com.example.app");

        let err = compose(&app(""), &[]).unwrap_err();
        assert_eq!(err.field(), Some("android.namespace"));

        let err = compose("android {\n namespace = \"com.example.app\"\n}", &[]).unwrap_err();
        assert!(matches!(err, ComposeError::Reference(ReferenceError::PluginNotApplied { .. })));
    }

    #[test]
    fn test_project_dependencies() {
        let plan = compose(
            "",
            &[(":app", "dependencies {\n implementation(project(\":core\"))\n}"), (":core", "")],
        )
        .unwrap();
        assert_eq!(plan.project(":app").unwrap().dependencies.project_paths().collect::<Vec<_>>(), vec![":core"]);

        let err = compose("", &[(":app", "dependencies {\n implementation(project(\":nope\"))\n}")]).unwrap_err();
        assert_eq!(err.field(), Some("dependencies.implementation"));
    }

    #[test]
    fn test_build_dir_conflict() {
        let err = compose(
            "",
            &[(":app", "layout.buildDirectory.set(rootProject.layout.buildDirectory)")],
        )
        .unwrap_err();
        match err {
            ComposeError::Structural(StructuralError::BuildDirConflict { first, second, path }) => {
                assert_eq!(first, ":");
                assert_eq!(second, ":app");
                assert_eq!(path, PathBuf::from("/work/android/build"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lazy_relocation_cycle() {
        let err = compose(
            "rootProject.layout.buildDirectory.set(project(\":app\").layout.buildDirectory.dir(\"root\"))",
            &[(":app", "layout.buildDirectory = rootProject.layout.buildDirectory.dir(\"app\")")],
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::Structural(StructuralError::RelocationCycle { .. })));
        assert_eq!(err.field(), Some("layout.buildDirectory"));
    }

    #[test]
    fn test_evaluation_order() {
        let plan = compose(
            "project(\":app\").evaluationDependsOn(\":lib\")",
            &[(":app", ""), (":lib", "")],
        )
        .unwrap();
        assert_eq!(plan.evaluation_order, vec![":", ":lib", ":app"]);
        assert_eq!(plan.project(":app").unwrap().evaluation_depends_on, vec![":lib"]);

        let err = compose(
            "project(\":app\").evaluationDependsOn(\":lib\")\nproject(\":lib\").evaluationDependsOn(\":app\")",
            &[(":app", ""), (":lib", "")],
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::Structural(StructuralError::EvaluationCycle { .. })));

        let err = compose("subprojects {\n project.evaluationDependsOn(\":nope\")\n}", &[(":app", "")]).unwrap_err();
        assert_eq!(err.field(), Some("subprojects.evaluationDependsOn"));
    }

    #[test]
    fn test_unknown_statements() {
        let err = compose("apply(plugin = \"java\")", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);

        let err = compose("subprojects {\n afterEvaluate { }\n}", &[(":app", "")]).unwrap_err();
        assert_eq!(err.field(), Some("subprojects.afterEvaluate"));
    }
}
