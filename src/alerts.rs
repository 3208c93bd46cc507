//! Alert model shared by the parser, the analysis passes, and the workspace.

use std::fmt;

use crate::source::{LineCol, SourceFile};

/// Origin label carried by the parse stage; the formatting service refuses to
/// trust the AST when an error with this origin is present.
pub const PARSE_ORIGIN: &str = "parse";

/// Severity level of an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

/// Zero-based line/column span; the end position is exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl LineSpan {
    #[must_use]
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Build a span from byte offsets into a source file.
    #[must_use]
    pub fn from_offsets(file: &SourceFile, start: usize, end: usize) -> Self {
        let LineCol {
            line: start_line,
            column: start_col,
        } = file.line_col(start);
        let LineCol {
            line: end_line,
            column: end_col,
        } = file.line_col(end);
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

/// A single error or warning produced by the parser or an analysis pass.
/// Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
    pub span: LineSpan,
    pub origin: &'static str,
}

impl Alert {
    #[must_use]
    pub fn error(message: impl Into<String>, span: LineSpan, origin: &'static str) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            origin,
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, span: LineSpan, origin: &'static str) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
            origin,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}:{}: {}",
            self.severity.as_str(),
            self.origin,
            self.span.start_line,
            self.span.start_col,
            self.message
        )
    }
}

/// Accumulator used while a pipeline stage runs; alerts are split by severity
/// with per-severity source order preserved.
#[derive(Debug, Default)]
pub struct AlertSink {
    errors: Vec<Alert>,
    warnings: Vec<Alert>,
}

impl AlertSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, alert: Alert) {
        match alert.severity {
            Severity::Error => self.errors.push(alert),
            Severity::Warning => self.warnings.push(alert),
        }
    }

    pub fn push_error(&mut self, message: impl Into<String>, span: LineSpan, origin: &'static str) {
        self.push(Alert::error(message, span, origin));
    }

    pub fn push_warning(
        &mut self,
        message: impl Into<String>,
        span: LineSpan,
        origin: &'static str,
    ) {
        self.push(Alert::warning(message, span, origin));
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[Alert] {
        &self.errors
    }

    #[must_use]
    pub fn warnings(&self) -> &[Alert] {
        &self.warnings
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Alert>, Vec<Alert>) {
        (self.errors, self.warnings)
    }
}
