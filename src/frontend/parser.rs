//! Recursive-descent parser for Vel.
//!
//! The parser is tolerant: malformed statements report an alert and recovery
//! skips to the next statement boundary, so a single bad line does not hide
//! diagnostics for the rest of the file.

use std::path::Path;

use crate::alerts::{Alert, AlertSink, LineSpan, PARSE_ORIGIN};
use crate::frontend::ast::{
    Assign, BinOp, Block, Comment, Expr, Ident, Import, ImportKind, Module, ModulePath, Stmt,
    StmtKind,
};
use crate::frontend::lexer::{lex, Keyword, Token, TokenKind};
use crate::source::SourceFile;

/// Result of the parse stage: the root node (absent on hard failure), the
/// comments collected by the lexer, and the accumulated parse alerts.
#[derive(Debug)]
pub struct ParseOutcome {
    pub module: Option<Module>,
    pub comments: Vec<Comment>,
    pub errors: Vec<Alert>,
    pub warnings: Vec<Alert>,
}

/// Parse one file into an AST plus parse-level alerts.
pub fn parse(file: &SourceFile) -> ParseOutcome {
    let mut sink = AlertSink::new();
    let lexed = lex(file, &mut sink);
    let comments = lexed
        .comments
        .iter()
        .map(|c| Comment {
            text: c.text.clone(),
            span: LineSpan::from_offsets(file, c.start, c.end),
        })
        .collect();

    let mut parser = Parser {
        tokens: lexed.tokens,
        pos: 0,
        file,
        sink,
    };
    let module = parser.parse_module();
    let (errors, warnings) = parser.sink.into_parts();
    ParseOutcome {
        module: Some(module),
        comments,
        errors,
        warnings,
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    file: &'a SourceFile,
    sink: AlertSink,
}

impl Parser<'_> {
    fn parse_module(&mut self) -> Module {
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::RBrace => {
                    let span = self.current_span();
                    self.sink.push_error("unmatched `}`", span, PARSE_ORIGIN);
                    self.bump();
                }
                _ => {
                    if let Some(stmt) = self.parse_stmt() {
                        body.push(stmt);
                    }
                }
            }
        }
        Module {
            origin: self.file.path().to_path_buf(),
            body,
            trailing_comments: Vec::new(),
            span: LineSpan::from_offsets(self.file, 0, self.file.text.len()),
        }
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        let start = self.current().start;
        let kind = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Import) => self.parse_import()?,
            TokenKind::Keyword(Keyword::Def) => self.parse_block()?,
            TokenKind::Ident => self.parse_assign()?,
            _ => {
                let span = self.current_span();
                let lexeme = self.current().lexeme.clone();
                self.sink.push_error(
                    format!("expected statement, found `{lexeme}`"),
                    span,
                    PARSE_ORIGIN,
                );
                self.recover();
                return None;
            }
        };
        let end = self.previous_end(start);
        Some(Stmt {
            kind,
            span: LineSpan::from_offsets(self.file, start, end),
            leading_comments: Vec::new(),
        })
    }

    fn parse_assign(&mut self) -> Option<StmtKind> {
        let stmt_start = self.current().start;
        let target = self.expect_ident()?;
        if !self.eat(TokenKind::Eq) {
            let span = self.current_span();
            self.sink
                .push_error("expected `=` after name", span, PARSE_ORIGIN);
            self.recover();
            return None;
        }
        let Some(value) = self.parse_expr() else {
            // Span covers the whole malformed line, not just the hole.
            let line = self.file.line_col(stmt_start).line as usize;
            let (line_start, line_end) = self.file.line_bounds(line).unwrap_or((stmt_start, stmt_start));
            let end = self.file.text[line_start..line_end]
                .trim_end_matches('\n')
                .len()
                + line_start;
            self.sink.push_error(
                "expected expression after `=`",
                LineSpan::from_offsets(self.file, line_start, end),
                PARSE_ORIGIN,
            );
            self.recover();
            return None;
        };
        self.expect_terminator();
        Some(StmtKind::Assign(Assign { target, value }))
    }

    fn parse_import(&mut self) -> Option<StmtKind> {
        self.bump(); // `import`
        let tag = self.expect_ident()?;
        if !self.eat(TokenKind::Keyword(Keyword::From)) {
            let span = self.current_span();
            self.sink
                .push_error("expected `from` in import", span, PARSE_ORIGIN);
            self.recover();
            return None;
        }
        let path_start = self.current().start;
        let first = self.expect_ident()?;
        let mut target = first.name;
        let mut path_end = self.previous_end(path_start);
        while self.eat(TokenKind::Dot) {
            let Some(segment) = self.expect_ident() else {
                self.recover();
                return None;
            };
            target.push('.');
            target.push_str(&segment.name);
            path_end = self.previous_end(path_start);
        }
        self.eat(TokenKind::Semi);
        let kind = if tag.name == "vel" {
            ImportKind::Vel
        } else {
            ImportKind::Foreign
        };
        Some(StmtKind::Import(Import {
            tag,
            kind,
            path: ModulePath {
                target,
                span: LineSpan::from_offsets(self.file, path_start, path_end),
                origin: self.file.path().to_path_buf(),
                resolved: None,
            },
        }))
    }

    fn parse_block(&mut self) -> Option<StmtKind> {
        self.bump(); // `def`
        let name = self.expect_ident()?;
        if !self.eat(TokenKind::LBrace) {
            let span = self.current_span();
            self.sink
                .push_error("expected `{` after block name", span, PARSE_ORIGIN);
            self.recover();
            return None;
        }
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                TokenKind::Eof => {
                    let span = self.current_span();
                    self.sink
                        .push_error("missing `}` to close block", span, PARSE_ORIGIN);
                    break;
                }
                _ => {
                    if let Some(stmt) = self.parse_stmt() {
                        body.push(stmt);
                    }
                }
            }
        }
        Some(StmtKind::Block(Block { name, body }))
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_primary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_primary()?;
            let span = LineSpan {
                start_line: lhs.span().start_line,
                start_col: lhs.span().start_col,
                end_line: rhs.span().end_line,
                end_col: rhs.span().end_col,
            };
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Some(lhs)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.current().clone();
        let span = LineSpan::from_offsets(self.file, token.start, token.end);
        match token.kind {
            TokenKind::Number => {
                self.bump();
                Some(Expr::Number {
                    text: token.lexeme,
                    span,
                })
            }
            TokenKind::Str => {
                self.bump();
                Some(Expr::Str {
                    text: token.lexeme,
                    span,
                })
            }
            TokenKind::Ident => {
                self.bump();
                Some(Expr::Name(Ident {
                    name: token.lexeme,
                    span,
                }))
            }
            _ => None,
        }
    }

    fn expect_ident(&mut self) -> Option<Ident> {
        let token = self.current().clone();
        if token.kind == TokenKind::Ident {
            self.bump();
            Some(Ident {
                name: token.lexeme,
                span: LineSpan::from_offsets(self.file, token.start, token.end),
            })
        } else {
            let span = LineSpan::from_offsets(self.file, token.start, token.end);
            self.sink.push_error(
                format!("expected name, found `{}`", describe(&token)),
                span,
                PARSE_ORIGIN,
            );
            None
        }
    }

    fn expect_terminator(&mut self) {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semi => {
                self.bump();
            }
            TokenKind::Eof | TokenKind::RBrace => {}
            _ => {
                let span = self.current_span();
                let lexeme = self.current().lexeme.clone();
                self.sink.push_error(
                    format!("unexpected `{lexeme}` after expression"),
                    span,
                    PARSE_ORIGIN,
                );
                self.recover();
            }
        }
    }

    /// Skip to the next statement boundary after an error.
    fn recover(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semi) {
            self.bump();
        }
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or_else(|| unreachable!("lexer always emits an EOF token"))
    }

    fn current_span(&self) -> LineSpan {
        let token = self.current();
        LineSpan::from_offsets(self.file, token.start, token.end)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        } else {
            self.pos = self.tokens.len().saturating_sub(1);
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn previous_end(&self, fallback: usize) -> usize {
        if self.pos == 0 {
            return fallback;
        }
        self.tokens
            .get(self.pos - 1)
            .map(|t| t.end)
            .unwrap_or(fallback)
    }
}

fn describe(token: &Token) -> String {
    if token.kind == TokenKind::Eof {
        "end of file".to_string()
    } else {
        token.lexeme.clone()
    }
}
