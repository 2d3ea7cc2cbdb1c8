//! Registered tasks (`tasks.register<Delete>("clean") { ... }`)
//!
//! Only the declaration is recorded. Paths passed to `delete(...)` may be
//! lazy build-directory providers, so they are resolved after relocation.

use std::path::PathBuf;
use gradle_composer_core::{ReferenceError, Result};
use gradle_composer_dsl::{Expr, Segment, StatementKind};
use indexmap::IndexMap;
use serde::Serialize;

use crate::eval::{invalid, join_field, unknown, Evaluator};
use crate::relocation::{normalize_path, DirScope, DirValue, RelocationContext};
use crate::repositories::describe_statement;

/// Task type used when `register` has no type argument
pub const DEFAULT_TASK_TYPE: &str = "DefaultTask";

/// A task as declared, before build directories are final
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDeclaration {
    pub name: String,
    pub task_type: String,
    pub group: Option<String>,
    pub description: Option<String>,
    pub deletes: Vec<DirValue>,
}

/// A task in the build plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredTask {
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletes: Vec<PathBuf>,
}

/// Whether a chain is `tasks.register...`
pub fn is_registration(segments: &[Segment]) -> bool {
    matches!(segments, [tasks, register] if tasks.name == "tasks" && tasks.is_plain() && register.name == "register")
}

/// Interpret `tasks.register<Type>("name") { ... }`
pub fn parse_registration(
    segments: &[Segment],
    eval: &Evaluator<'_>,
    ctx: &RelocationContext,
    scope: &DirScope<'_>,
    field: &str,
) -> Result<TaskDeclaration> {
    let register = match segments {
        [_, register] => register,
        _ => return Err(unknown(field, "register")),
    };
    let chain = Expr::Chain(segments.to_vec());
    let name = register
        .single_arg()
        .ok_or_else(|| invalid(field, "a task name", &chain))?;
    let name = eval.string(name, field)?;
    let task_type = match register.type_args.as_slice() {
        [] => DEFAULT_TASK_TYPE.to_string(),
        [ty] => ty.clone(),
        _ => return Err(invalid(field, "a single task type", &chain)),
    };
    let task_field = join_field(field, &name);

    let mut task = TaskDeclaration {
        name,
        task_type,
        group: None,
        description: None,
        deletes: Vec::new(),
    };

    for statement in register.block.as_deref().unwrap_or(&[]) {
        match &statement.kind {
            StatementKind::Assign { target, value } if target.len() == 1 => {
                let prop_field = join_field(&task_field, &target[0]);
                match target[0].as_str() {
                    "group" => task.group = Some(eval.string(value, &prop_field)?),
                    "description" => task.description = Some(eval.string(value, &prop_field)?),
                    other => return Err(unknown(&task_field, other)),
                }
            }
            StatementKind::Expr(_) => match statement.chain() {
                Some([delete]) if delete.name == "delete" && task.task_type == "Delete" && delete.block.is_none() => {
                    let delete_field = join_field(&task_field, "delete");
                    for arg in delete.args() {
                        task.deletes.push(delete_target(&arg.value, ctx, scope, &delete_field)?);
                    }
                }
                _ => return Err(unknown(&task_field, &describe_statement(statement))),
            },
            _ => return Err(unknown(&task_field, &describe_statement(statement))),
        }
    }
    Ok(task)
}

fn delete_target(value: &Expr, ctx: &RelocationContext, scope: &DirScope<'_>, field: &str) -> Result<DirValue> {
    match value {
        Expr::Str(path) => {
            let location = ctx.require_project(scope.project, field)?;
            Ok(DirValue::fixed(location.dir.join(path)))
        }
        _ => ctx.eval_dir(value, scope, field),
    }
}

impl TaskDeclaration {
    /// Resolve delete targets against final build directories
    pub fn resolve(&self, build_dirs: &IndexMap<String, PathBuf>) -> Result<RegisteredTask> {
        let deletes = self
            .deletes
            .iter()
            .map(|target| match target {
                DirValue::Fixed { path } => Ok(path.clone()),
                DirValue::BuildDirOf { project, relative } => build_dirs
                    .get(project)
                    .map(|dir| normalize_path(&dir.join(relative)))
                    .ok_or_else(|| {
                        ReferenceError::UnknownProject {
                            path: project.clone(),
                            field: format!("tasks.{}.delete", self.name),
                        }
                        .into()
                    }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RegisteredTask {
            name: self.name.clone(),
            task_type: self.task_type.clone(),
            group: self.group.clone(),
            description: self.description.clone(),
            deletes,
        })
    }
}
