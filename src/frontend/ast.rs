//! AST for the Vel language.
//!
//! Nodes carry zero-based line/column spans and remember the file they were
//! parsed from, so queries over an AST with inlined imports can tell local
//! nodes from foreign ones.

use std::path::PathBuf;

use crate::alerts::LineSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: LineSpan,
}

/// A `#` comment attached to a statement by the comment-fusion pass, or left
/// trailing at module level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub span: LineSpan,
}

/// Root node of one parsed file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub origin: PathBuf,
    pub body: Vec<Stmt>,
    /// Comments after the last statement, populated by comment fusion.
    pub trailing_comments: Vec<Comment>,
    pub span: LineSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: LineSpan,
    /// Comments preceding the statement, populated by comment fusion.
    pub leading_comments: Vec<Comment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
    Assign(Assign),
    Import(Import),
    Block(Block),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assign {
    pub target: Ident,
    pub value: Expr,
}

/// Marker distinguishing same-language imports from foreign-language ones.
/// Only `Vel` imports participate in the dependency graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportKind {
    Vel,
    Foreign,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    /// The literal kind tag as written (`vel`, `py`, ...).
    pub tag: Ident,
    pub kind: ImportKind,
    pub path: ModulePath,
}

/// Reference to another module named by an import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModulePath {
    /// Dotted target, exactly as written (`a.b.c`).
    pub target: String,
    pub span: LineSpan,
    /// File that physically contains this reference.
    pub origin: PathBuf,
    /// Sub-module inlined by the import-resolve pass, if the target file
    /// could be parsed.
    pub resolved: Option<Box<Module>>,
}

/// A `def name { ... }` block, which introduces a nested scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub name: Ident,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Number { text: String, span: LineSpan },
    Str { text: String, span: LineSpan },
    Name(Ident),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: LineSpan,
    },
}

impl Expr {
    #[must_use]
    pub fn span(&self) -> LineSpan {
        match self {
            Expr::Number { span, .. } | Expr::Str { span, .. } | Expr::Binary { span, .. } => *span,
            Expr::Name(ident) => ident.span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}
