//! Gradle Kotlin DSL subset
//!
//! Lexer, syntax tree and parser for declarative build scripts
//! (`build.gradle.kts`, `settings.gradle.kts`). Only the declarative subset
//! is understood; arbitrary Kotlin is rejected with a syntax error.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Arg, Expr, Position, Script, Segment, Statement, StatementKind};
pub use parser::Parser;
