//! Living workspace of a Vel project.
//!
//! Process-wide cache mapping each file to the module IR of its most recently
//! completed successful pipeline run. Staleness is decided by content
//! fingerprint, never timestamps. A failed run is logged and discarded; the
//! previous entry, if any, stays visible to the client.

pub mod adapter;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::alerts::LineSpan;
use crate::error::Result;
use crate::frontend::ast::{ImportKind, Module, Stmt, StmtKind};
use crate::lsp::types::{Diagnostic, Position, Range, TextEdit};
use crate::passes::{run_pipeline, ModuleIr, PassRegistry, Schedule};
use crate::source::Fingerprint;
use crate::symtab::{DefinitionSite, Symbol};

/// Cached result for one file: the IR plus the protocol diagnostics derived
/// from it at build time. Replaced wholesale on rebuild, never mutated.
#[derive(Debug)]
pub struct ModuleInfo {
    pub ir: ModuleIr,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleInfo {
    fn new(ir: ModuleIr) -> Self {
        let diagnostics = adapter::to_protocol(&ir.errors, &ir.warnings);
        Self { ir, diagnostics }
    }
}

/// A same-language or foreign import reference found in a module's AST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRef {
    /// Dotted target as written.
    pub target: String,
    /// Kind tag as written (`vel`, `py`, ...).
    pub tag: String,
    /// File whose text physically contains the reference.
    pub origin: PathBuf,
    pub span: LineSpan,
    /// Path of the module inlined for this reference, when resolution ran
    /// and succeeded.
    pub resolved: Option<PathBuf>,
}

/// Workspace cache and the query services layered over it.
///
/// Designed for one logical worker: callers serialize requests per file.
/// Entries are added on first analysis and never evicted.
pub struct Workspace {
    documents: HashMap<PathBuf, String>,
    modules: HashMap<PathBuf, ModuleInfo>,
    registry: PassRegistry,
    analysis_schedule: Schedule,
    rebuilds: u64,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::with_pipeline(PassRegistry::with_defaults(), Schedule::analysis())
    }

    /// Build a workspace around a custom pass registry and analysis schedule.
    #[must_use]
    pub fn with_pipeline(registry: PassRegistry, analysis_schedule: Schedule) -> Self {
        Self {
            documents: HashMap::new(),
            modules: HashMap::new(),
            registry,
            analysis_schedule,
            rebuilds: 0,
        }
    }

    /// Number of pipeline runs that replaced a cache entry. Observability
    /// hook for the idempotence guarantee.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn open_document(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.documents.insert(path.into(), text.into());
    }

    pub fn update_document(&mut self, path: &Path, text: impl Into<String>) {
        self.documents.insert(path.to_path_buf(), text.into());
    }

    #[must_use]
    pub fn document_text(&self, path: &Path) -> Option<&str> {
        self.documents.get(path).map(String::as_str)
    }

    /// Close the editor buffer. The cache entry stays; the cache never
    /// evicts.
    pub fn close_document(&mut self, path: &Path) {
        self.documents.remove(path);
    }

    /// Quick syntax check: parse only, no analysis passes.
    pub fn ensure_fresh(&mut self, path: &Path) {
        self.refresh_with(path, &Schedule::quick());
    }

    /// Full analysis so symbol and dependency queries have data.
    pub fn ensure_analyzed(&mut self, path: &Path) {
        let schedule = self.analysis_schedule.clone();
        self.refresh_with(path, &schedule);
    }

    fn refresh_with(&mut self, path: &Path, schedule: &Schedule) {
        let text = match self.current_text(path) {
            Ok(text) => text,
            Err(err) => {
                error!(path = %path.display(), %err, "cannot read document content");
                return;
            }
        };
        let fingerprint = Fingerprint::of(&text);
        if let Some(existing) = self.modules.get(path) {
            let analyzed_enough = schedule.is_empty() || existing.ir.sym_tab.is_some();
            if existing.ir.fingerprint() == fingerprint && analyzed_enough {
                return;
            }
        }

        match run_pipeline(text, path, schedule, &self.registry) {
            // Only a result with a valid module root may replace the entry;
            // this protects the cache from a partially constructed IR.
            Ok(ir) if ir.ast.is_some() => {
                self.rebuilds += 1;
                debug!(path = %path.display(), "cache entry replaced");
                self.modules.insert(path.to_path_buf(), ModuleInfo::new(ir));
            }
            Ok(_) => {
                warn!(
                    path = %path.display(),
                    "pipeline produced no module root; previous entry retained"
                );
            }
            Err(err) => {
                error!(path = %path.display(), %err, "pipeline fault; previous entry retained");
            }
        }
    }

    fn current_text(&self, path: &Path) -> Result<String> {
        if let Some(text) = self.documents.get(path) {
            return Ok(text.clone());
        }
        Ok(fs::read_to_string(path)?)
    }

    #[must_use]
    pub fn module(&self, path: &Path) -> Option<&ModuleInfo> {
        self.modules.get(path)
    }

    /// Diagnostics of the current cache entry, without recomputing. `None`
    /// when the path was never analyzed; publishing is then a no-op.
    #[must_use]
    pub fn diagnostics(&self, path: &Path) -> Option<&[Diagnostic]> {
        self.modules
            .get(path)
            .map(|info| info.diagnostics.as_slice())
    }

    /// Canonical formatting as one full-document replacement edit.
    ///
    /// When parsing reported an error, or the pipeline faulted, the original
    /// text is returned unchanged rather than a corrupted reformat.
    pub fn format_document(&mut self, path: &Path) -> Result<TextEdit> {
        let text = self.current_text(path)?;
        let formatted = match run_pipeline(&text, path, &Schedule::formatting(), &self.registry) {
            Ok(ir) => {
                if ir.has_parse_errors() {
                    text.clone()
                } else {
                    ir.formatted.unwrap_or_else(|| text.clone())
                }
            }
            Err(err) => {
                error!(path = %path.display(), %err, "formatting fault; returning input unchanged");
                text.clone()
            }
        };
        Ok(full_document_edit(formatted))
    }

    /// Import references of `path`. Shallow mode keeps only references whose
    /// text lives in `path` itself; deep mode walks the whole subtree,
    /// including modules inlined by import resolution. Foreign-kind imports
    /// are excluded from both. `None` when the path has no cache entry.
    #[must_use]
    pub fn dependencies(&self, path: &Path, deep: bool) -> Option<Vec<ImportRef>> {
        let info = self.modules.get(path)?;
        let module = info.ir.ast.as_ref()?;
        let all = collect_imports(module);
        if deep {
            Some(all)
        } else {
            Some(all.into_iter().filter(|dep| dep.origin == path).collect())
        }
    }

    /// Every symbol whose defining scope originates in `path`, flattened in
    /// scope pre-order, each scope's entries in table order. `None` when the
    /// path has no cache entry.
    #[must_use]
    pub fn symbols(&self, path: &Path) -> Option<Vec<Symbol>> {
        let info = self.modules.get(path)?;
        Some(
            info.ir
                .sym_tab
                .as_ref()
                .map(|table| table.symbols_from(path))
                .unwrap_or_default(),
        )
    }

    /// Definition sites of every symbol in `symbols(path)`, in the same
    /// order.
    #[must_use]
    pub fn definitions(&self, path: &Path) -> Option<Vec<DefinitionSite>> {
        let symbols = self.symbols(path)?;
        Some(
            symbols
                .into_iter()
                .flat_map(|symbol| symbol.defn)
                .collect(),
        )
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// One replacement edit spanning the whole document, from its start to one
/// line past its last line. Sub-document edits are never produced because
/// the pipeline cannot guarantee positional correspondence between old and
/// new text.
fn full_document_edit(new_text: String) -> TextEdit {
    let last_line = u32::try_from(new_text.lines().count()).unwrap_or(u32::MAX);
    TextEdit {
        range: Range {
            start: Position::new(0, 0),
            end: Position::new(last_line.saturating_add(1), 0),
        },
        new_text,
    }
}

/// Walk a module tree with an explicit frontier and collect every
/// same-language import reference in document order.
fn collect_imports(module: &Module) -> Vec<ImportRef> {
    let mut out = Vec::new();
    let mut frontier: Vec<&[Stmt]> = vec![&module.body];
    while let Some(stmts) = frontier.pop() {
        // Children are queued after the current list is fully scanned, so
        // same-file references keep their source order.
        let mut nested: Vec<&[Stmt]> = Vec::new();
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Import(import) => {
                    if import.kind != ImportKind::Vel {
                        continue;
                    }
                    out.push(ImportRef {
                        target: import.path.target.clone(),
                        tag: import.tag.name.clone(),
                        origin: import.path.origin.clone(),
                        span: import.path.span,
                        resolved: import
                            .path
                            .resolved
                            .as_deref()
                            .map(|sub| sub.origin.clone()),
                    });
                    if let Some(sub) = import.path.resolved.as_deref() {
                        nested.push(&sub.body);
                    }
                }
                StmtKind::Block(block) => nested.push(&block.body),
                StmtKind::Assign(_) => {}
            }
        }
        // Reversed so the frontier pops them in discovery order.
        frontier.extend(nested.into_iter().rev());
    }
    out
}
