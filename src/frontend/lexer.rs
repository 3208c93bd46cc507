//! Hand-rolled lexer for Vel source text.
//!
//! Comments are collected out of band so the comment-fusion pass can attach
//! them to statements; the token stream itself stays trivia-free apart from
//! newlines, which act as statement terminators.

use crate::alerts::{AlertSink, LineSpan, PARSE_ORIGIN};
use crate::source::SourceFile;

/// Reserved keywords recognised by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Import,
    From,
    Def,
}

impl Keyword {
    fn from_ident(text: &str) -> Option<Self> {
        match text {
            "import" => Some(Keyword::Import),
            "from" => Some(Keyword::From),
            "def" => Some(Keyword::Def),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Import => "import",
            Keyword::From => "from",
            Keyword::Def => "def",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword(Keyword),
    Number,
    Str,
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    Dot,
    Semi,
    LBrace,
    RBrace,
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub start: usize,
    pub end: usize,
}

/// A `#` comment stripped from the token stream, text without the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub comments: Vec<CommentToken>,
}

/// Lex `file` fully, reporting malformed input into `alerts`.
pub fn lex(file: &SourceFile, alerts: &mut AlertSink) -> LexOutput {
    let text = file.text.as_str();
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let ch = text[pos..].chars().next().unwrap_or('\0');
        let start = pos;
        match ch {
            ' ' | '\t' | '\r' => {
                pos += 1;
            }
            '\n' => {
                tokens.push(simple(TokenKind::Newline, "\n", start));
                pos += 1;
            }
            '#' => {
                let end = line_end(text, pos);
                let body = text[pos + 1..end].trim().to_string();
                comments.push(CommentToken {
                    text: body,
                    start,
                    end,
                });
                pos = end;
            }
            '=' => {
                tokens.push(simple(TokenKind::Eq, "=", start));
                pos += 1;
            }
            '+' => {
                tokens.push(simple(TokenKind::Plus, "+", start));
                pos += 1;
            }
            '-' => {
                tokens.push(simple(TokenKind::Minus, "-", start));
                pos += 1;
            }
            '*' => {
                tokens.push(simple(TokenKind::Star, "*", start));
                pos += 1;
            }
            '/' => {
                tokens.push(simple(TokenKind::Slash, "/", start));
                pos += 1;
            }
            '.' => {
                tokens.push(simple(TokenKind::Dot, ".", start));
                pos += 1;
            }
            ';' => {
                tokens.push(simple(TokenKind::Semi, ";", start));
                pos += 1;
            }
            '{' => {
                tokens.push(simple(TokenKind::LBrace, "{", start));
                pos += 1;
            }
            '}' => {
                tokens.push(simple(TokenKind::RBrace, "}", start));
                pos += 1;
            }
            '"' => {
                pos = lex_string(text, start, &mut tokens, alerts, file);
            }
            c if c.is_ascii_digit() => {
                let end = scan_while(text, pos, |c| c.is_ascii_digit() || c == '.');
                tokens.push(Token {
                    kind: TokenKind::Number,
                    lexeme: text[start..end].to_string(),
                    start,
                    end,
                });
                pos = end;
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = scan_while(text, pos, |c| c.is_alphanumeric() || c == '_');
                let lexeme = &text[start..end];
                let kind = Keyword::from_ident(lexeme)
                    .map(TokenKind::Keyword)
                    .unwrap_or(TokenKind::Ident);
                tokens.push(Token {
                    kind,
                    lexeme: lexeme.to_string(),
                    start,
                    end,
                });
                pos = end;
            }
            other => {
                let end = pos + other.len_utf8();
                alerts.push_error(
                    format!("unexpected character `{other}`"),
                    LineSpan::from_offsets(file, start, end),
                    PARSE_ORIGIN,
                );
                pos = end;
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        lexeme: String::new(),
        start: text.len(),
        end: text.len(),
    });
    LexOutput { tokens, comments }
}

fn simple(kind: TokenKind, lexeme: &str, start: usize) -> Token {
    Token {
        kind,
        lexeme: lexeme.to_string(),
        start,
        end: start + lexeme.len(),
    }
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|idx| from + idx)
        .unwrap_or(text.len())
}

fn scan_while(text: &str, from: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut end = from;
    for (idx, ch) in text[from..].char_indices() {
        if !pred(ch) {
            return from + idx;
        }
        end = from + idx + ch.len_utf8();
    }
    end
}

fn lex_string(
    text: &str,
    start: usize,
    tokens: &mut Vec<Token>,
    alerts: &mut AlertSink,
    file: &SourceFile,
) -> usize {
    let mut end = start + 1;
    let mut closed = false;
    for (idx, ch) in text[start + 1..].char_indices() {
        if ch == '"' {
            end = start + 1 + idx + 1;
            closed = true;
            break;
        }
        if ch == '\n' {
            end = start + 1 + idx;
            break;
        }
        end = start + 1 + idx + ch.len_utf8();
    }
    if !closed {
        alerts.push_error(
            "unterminated string literal",
            LineSpan::from_offsets(file, start, end),
            PARSE_ORIGIN,
        );
    }
    tokens.push(Token {
        kind: TokenKind::Str,
        lexeme: text[start..end].to_string(),
        start,
        end,
    });
    end
}
