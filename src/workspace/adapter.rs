//! Translates internal alerts into editor-protocol diagnostics.

use crate::alerts::{Alert, Severity};
use crate::lsp::types::{Diagnostic, Position, Range};

/// Convert accumulated alerts to protocol diagnostics: errors first, then
/// warnings, each sublist preserving source order. No deduplication; passes
/// are responsible for not re-reporting.
#[must_use]
pub fn to_protocol(errors: &[Alert], warnings: &[Alert]) -> Vec<Diagnostic> {
    errors
        .iter()
        .chain(warnings.iter())
        .map(convert)
        .collect()
}

fn convert(alert: &Alert) -> Diagnostic {
    Diagnostic {
        range: Range {
            start: Position::new(alert.span.start_line, alert.span.start_col),
            end: Position::new(alert.span.end_line, alert.span.end_col),
        },
        severity: Some(severity_to_protocol(alert.severity)),
        source: Some(String::from("vel")),
        message: alert.message.clone(),
    }
}

fn severity_to_protocol(severity: Severity) -> i32 {
    match severity {
        Severity::Error => 1,
        Severity::Warning => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::LineSpan;

    #[test]
    fn errors_come_before_warnings_in_source_order() {
        let errors = vec![
            Alert::error("e1", LineSpan::new(3, 0, 3, 1), "parse"),
            Alert::error("e2", LineSpan::new(5, 0, 5, 1), "parse"),
        ];
        let warnings = vec![Alert::warning("w1", LineSpan::new(1, 0, 1, 1), "symbol-resolve")];

        let diags = to_protocol(&errors, &warnings);
        assert_eq!(diags.len(), errors.len() + warnings.len());
        let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["e1", "e2", "w1"]);
        assert_eq!(diags[0].severity, Some(1));
        assert_eq!(diags[2].severity, Some(2));
    }

    #[test]
    fn range_copies_the_span_verbatim() {
        let errors = vec![Alert::error("bad", LineSpan::new(2, 4, 2, 9), "parse")];
        let diags = to_protocol(&errors, &[]);
        assert_eq!(diags[0].range.start, Position::new(2, 4));
        assert_eq!(diags[0].range.end, Position::new(2, 9));
    }

    #[test]
    fn duplicates_surface_as_duplicates() {
        let errors = vec![
            Alert::error("same", LineSpan::new(0, 0, 0, 1), "parse"),
            Alert::error("same", LineSpan::new(0, 0, 0, 1), "symbol-resolve"),
        ];
        let diags = to_protocol(&errors, &[]);
        assert_eq!(diags.len(), 2);
    }
}
