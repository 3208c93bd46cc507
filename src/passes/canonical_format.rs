//! Canonical printer: regenerates normalized source text from the AST.
//!
//! The printer reaches a fixed point after one pass: its output reparses to
//! the same structure and prints to the same text. Comment placement relies
//! on `comment-fusion` having attached comments first.

use std::fmt::Write as _;

use crate::error::Result;
use crate::frontend::ast::{Comment, Expr, Module, Stmt, StmtKind};
use crate::passes::{ModuleIr, Pass, CANONICAL_FORMAT, COMMENT_FUSION};

const INDENT: &str = "    ";

pub struct CanonicalFormatPass;

impl Pass for CanonicalFormatPass {
    fn name(&self) -> &'static str {
        CANONICAL_FORMAT
    }

    fn must_follow(&self) -> &'static [&'static str] {
        &[COMMENT_FUSION]
    }

    fn run(&self, ir: &mut ModuleIr) -> Result<()> {
        let Some(module) = ir.ast.as_ref() else {
            return Ok(());
        };
        ir.formatted = Some(print_module(module));
        Ok(())
    }
}

fn print_module(module: &Module) -> String {
    let mut out = String::new();
    print_stmts(&mut out, &module.body, 0);
    print_comments(&mut out, &module.trailing_comments, 0);
    out
}

fn print_stmts(out: &mut String, stmts: &[Stmt], depth: usize) {
    for stmt in stmts {
        print_comments(out, &stmt.leading_comments, depth);
        indent(out, depth);
        match &stmt.kind {
            StmtKind::Assign(assign) => {
                let _ = writeln!(out, "{} = {}", assign.target.name, print_expr(&assign.value));
            }
            StmtKind::Import(import) => {
                let _ = writeln!(out, "import {} from {};", import.tag.name, import.path.target);
            }
            StmtKind::Block(block) => {
                let _ = writeln!(out, "def {} {{", block.name.name);
                print_stmts(out, &block.body, depth + 1);
                indent(out, depth);
                out.push_str("}\n");
            }
        }
    }
}

fn print_comments(out: &mut String, comments: &[Comment], depth: usize) {
    for comment in comments {
        indent(out, depth);
        if comment.text.is_empty() {
            out.push_str("#\n");
        } else {
            let _ = writeln!(out, "# {}", comment.text);
        }
    }
}

fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Number { text, .. } | Expr::Str { text, .. } => text.clone(),
        Expr::Name(ident) => ident.name.clone(),
        Expr::Binary { op, lhs, rhs, .. } => {
            format!("{} {} {}", print_expr(lhs), op.as_str(), print_expr(rhs))
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{run_pipeline, PassRegistry, Schedule};
    use expect_test::expect;

    fn format_text(text: &str) -> String {
        let registry = PassRegistry::with_defaults();
        let ir = run_pipeline(text, "main.vel", &Schedule::formatting(), &registry)
            .unwrap_or_else(|err| panic!("pipeline fault: {err}"));
        ir.formatted.unwrap_or_default()
    }

    #[test]
    fn normalizes_spacing_and_terminators() {
        let formatted = format_text("x=1;y  =   2\n");
        expect![[r#"
            x = 1
            y = 2
        "#]]
        .assert_eq(&formatted);
    }

    #[test]
    fn prints_imports_blocks_and_comments() {
        let formatted = format_text("# header\nimport vel from dep\ndef setup{\nx=1+2\n}\n# tail\n");
        expect![[r#"
            # header
            import vel from dep;
            def setup {
                x = 1 + 2
            }
            # tail
        "#]]
        .assert_eq(&formatted);
    }

    #[test]
    fn formatting_is_a_fixed_point() {
        let once = format_text("x=1\n# note\ndef b{y=x}\n");
        let twice = format_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_formats_to_empty_output() {
        assert_eq!(format_text(""), "");
    }
}
