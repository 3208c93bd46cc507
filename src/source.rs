use std::fmt;
use std::path::{Path, PathBuf};

/// Captured line/column information (zero-based, matching editor protocol
/// positions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

/// Collision-resistant digest of document content, used for change detection.
///
/// Staleness is decided by recomputing the fingerprint of the current text
/// and comparing, never by timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    #[must_use]
    pub fn of(text: &str) -> Self {
        Self(*blake3::hash(text.as_bytes()).as_bytes())
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One source document: path, text, fingerprint, and line-start table for
/// byte-offset to line/column mapping.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub fingerprint: Fingerprint,
    line_starts: Vec<usize>,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = Fingerprint::of(&text);
        let line_starts = compute_line_starts(&text);
        Self {
            path: path.into(),
            text,
            fingerprint,
            line_starts,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map a byte offset into the text to a zero-based line/column.
    /// Offsets past the end clamp to the final position.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text.len());
        let index = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(index).copied().unwrap_or(0);
        LineCol {
            line: u32::try_from(index).unwrap_or(u32::MAX),
            column: u32::try_from(offset.saturating_sub(line_start)).unwrap_or(u32::MAX),
        }
    }

    /// Start and end byte offsets (exclusive) for a zero-based line.
    #[must_use]
    pub fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len());
        Some((start, end))
    }

    /// Number of lines, counted the way the editor protocol does: one per
    /// newline-terminated segment plus any trailing partial line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::with_capacity(text.lines().count() + 1);
    starts.push(0);
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + ch.len_utf8());
        }
    }
    starts
}
