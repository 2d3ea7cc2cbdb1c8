//! Script syntax tree
//!
//! Build scripts are a sequence of statements: assignments, `val` bindings
//! and expression statements. Nearly everything interesting is a member
//! chain such as `tasks.register<Delete>("clean") { ... }`, where each link
//! may carry type arguments, call arguments and a trailing block.

/// Source position of a statement (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A parsed script
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `a.b = value`
    Assign { target: Vec<String>, value: Expr },
    /// `val name: Type = value`
    Val {
        name: String,
        ty: Option<String>,
        value: Expr,
    },
    /// Any other expression, usually a call or a block
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Str(String),
    Int(i64),
    Bool(bool),
    Chain(Vec<Segment>),
    /// `lhs op rhs` with `op` one of the infix words (`version`, `apply`)
    Infix {
        lhs: Box<Expr>,
        op: String,
        rhs: Box<Expr>,
    },
}

/// One link of a member chain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    pub name: String,
    /// `<Delete>` in `register<Delete>(...)`
    pub type_args: Vec<String>,
    /// `None` for a plain property access, `Some` for a call
    pub args: Option<Vec<Arg>>,
    /// Trailing lambda block
    pub block: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

impl Segment {
    /// A plain property access with no call parts
    pub fn is_plain(&self) -> bool {
        self.type_args.is_empty() && self.args.is_none() && self.block.is_none()
    }

    /// Positional arguments, or an empty slice for property access
    pub fn args(&self) -> &[Arg] {
        self.args.as_deref().unwrap_or(&[])
    }

    /// The sole positional argument of a one-argument call
    pub fn single_arg(&self) -> Option<&Expr> {
        match self.args() {
            [arg] if arg.name.is_none() => Some(&arg.value),
            _ => None,
        }
    }
}

impl Expr {
    /// Contents of a string literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Segments of a member chain
    pub fn as_chain(&self) -> Option<&[Segment]> {
        match self {
            Expr::Chain(segments) => Some(segments),
            _ => None,
        }
    }

    /// Dotted names of the chain, ignoring call parts (`a.b(1).c` -> `a.b.c`)
    pub fn dotted(&self) -> Option<String> {
        self.as_chain().map(|segments| {
            segments
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(".")
        })
    }

    /// Short human-readable rendering used in error messages
    pub fn describe(&self) -> String {
        match self {
            Expr::Str(s) => format!("\"{}\"", s),
            Expr::Int(i) => i.to_string(),
            Expr::Bool(b) => b.to_string(),
            Expr::Chain(_) => self.dotted().unwrap_or_default(),
            Expr::Infix { lhs, op, rhs } => {
                format!("{} {} {}", lhs.describe(), op, rhs.describe())
            }
        }
    }
}

impl Statement {
    /// The expression statement's chain, if this is one
    pub fn chain(&self) -> Option<&[Segment]> {
        match &self.kind {
            StatementKind::Expr(expr) => expr.as_chain(),
            _ => None,
        }
    }
}
