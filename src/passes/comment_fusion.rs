//! Attaches lexer-collected comments to the statements they precede, so the
//! canonical printer can re-emit them. Must run before `canonical-format`.

use std::collections::VecDeque;

use crate::error::Result;
use crate::frontend::ast::{Comment, Stmt, StmtKind};
use crate::passes::{ModuleIr, Pass, COMMENT_FUSION};

pub struct CommentFusionPass;

impl Pass for CommentFusionPass {
    fn name(&self) -> &'static str {
        COMMENT_FUSION
    }

    fn run(&self, ir: &mut ModuleIr) -> Result<()> {
        let Some(module) = ir.ast.as_mut() else {
            return Ok(());
        };
        let mut pending: VecDeque<Comment> = ir.comments.drain(..).collect();
        fuse_into(&mut module.body, &mut pending);
        module.trailing_comments.extend(pending);
        Ok(())
    }
}

/// Attach each comment to the first statement starting on or after its line;
/// comments inside a block fall through to the block's own statements.
fn fuse_into(stmts: &mut [Stmt], pending: &mut VecDeque<Comment>) {
    for stmt in stmts {
        while pending
            .front()
            .is_some_and(|c| c.span.start_line <= stmt.span.start_line)
        {
            if let Some(comment) = pending.pop_front() {
                stmt.leading_comments.push(comment);
            }
        }
        if let StmtKind::Block(block) = &mut stmt.kind {
            fuse_into(&mut block.body, pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{run_pipeline, PassRegistry, Schedule};

    fn fused(text: &str) -> ModuleIr {
        let registry = PassRegistry::with_defaults();
        run_pipeline(
            text,
            "main.vel",
            &Schedule::of(vec![COMMENT_FUSION]),
            &registry,
        )
        .unwrap_or_else(|err| panic!("pipeline fault: {err}"))
    }

    #[test]
    fn leading_comment_attaches_to_next_statement() {
        let ir = fused("# note\nx = 1\n");
        let module = ir.ast.as_ref().map(|m| &m.body);
        let stmts = module.map(Vec::as_slice).unwrap_or(&[]);
        assert_eq!(stmts[0].leading_comments.len(), 1);
        assert_eq!(stmts[0].leading_comments[0].text, "note");
        assert!(ir.comments.is_empty(), "comments were drained");
    }

    #[test]
    fn comment_inside_block_attaches_to_inner_statement() {
        let ir = fused("def setup {\n    # inner\n    x = 1\n}\n");
        let binding = Vec::new();
        let stmts = ir.ast.as_ref().map(|m| &m.body).unwrap_or(&binding);
        match &stmts[0].kind {
            StmtKind::Block(block) => {
                assert_eq!(block.body[0].leading_comments.len(), 1);
                assert_eq!(block.body[0].leading_comments[0].text, "inner");
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn comment_after_everything_becomes_trailing() {
        let ir = fused("x = 1\n# done\n");
        let trailing = ir
            .ast
            .as_ref()
            .map(|m| m.trailing_comments.as_slice())
            .unwrap_or(&[]);
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing[0].text, "done");
    }
}
