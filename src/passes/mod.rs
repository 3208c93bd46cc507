//! Pass pipeline: module IR, the `Pass` trait, pass registration, and the
//! schedule-driven runner.
//!
//! Parsing always runs first and is not part of a schedule. An empty schedule
//! is the quick-check mode used by the workspace on every edit; fuller
//! schedules add analysis or formatting stages. A schedule may name a target
//! pass, in which case execution halts right after it.

mod canonical_format;
mod comment_fusion;
mod import_resolve;
mod symbol_resolve;

pub use canonical_format::CanonicalFormatPass;
pub use comment_fusion::CommentFusionPass;
pub use import_resolve::ImportResolvePass;
pub use symbol_resolve::SymbolResolvePass;

use std::path::{Path, PathBuf};

use crate::alerts::{Alert, Severity};
use crate::error::{Error, Result};
use crate::frontend::ast;
use crate::frontend::parser;
use crate::source::{Fingerprint, SourceFile};
use crate::symtab::SymbolTable;

pub const COMMENT_FUSION: &str = "comment-fusion";
pub const SYMBOL_RESOLVE: &str = "symbol-resolve";
pub const IMPORT_RESOLVE: &str = "import-resolve";
pub const CANONICAL_FORMAT: &str = "canonical-format";

/// Parsed and annotated representation of one source file, together with its
/// accumulated alerts and the content fingerprint the text hashed to.
///
/// Built privately by a pipeline run; the workspace only publishes a
/// completed one, never a partially transformed working copy.
#[derive(Debug)]
pub struct ModuleIr {
    pub source: SourceFile,
    /// Absent only on hard parse failure.
    pub ast: Option<ast::Module>,
    /// Comments not yet attached to the AST; drained by comment fusion.
    pub comments: Vec<ast::Comment>,
    pub errors: Vec<Alert>,
    pub warnings: Vec<Alert>,
    pub sym_tab: Option<SymbolTable>,
    /// Canonical text produced by the formatting pass.
    pub formatted: Option<String>,
}

impl ModuleIr {
    #[must_use]
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.source.fingerprint
    }

    pub fn push_alert(&mut self, alert: Alert) {
        match alert.severity {
            Severity::Error => self.errors.push(alert),
            Severity::Warning => self.warnings.push(alert),
        }
    }

    /// True when the parse stage itself reported an error; the AST must not
    /// be trusted for rewriting in that case.
    #[must_use]
    pub fn has_parse_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|alert| alert.origin == crate::alerts::PARSE_ORIGIN)
    }
}

/// One analysis or transformation stage. Stateless across files; receives the
/// IR produced by its predecessor and may mutate the AST or annotate the IR.
pub trait Pass {
    fn name(&self) -> &'static str;

    /// Passes that must appear earlier whenever both are scheduled.
    fn must_follow(&self) -> &'static [&'static str] {
        &[]
    }

    /// Run over one module. An `Err` is a pipeline fault, not a diagnostic:
    /// it aborts the run and is handled at the workspace boundary.
    fn run(&self, ir: &mut ModuleIr) -> Result<()>;
}

/// Explicit capability table mapping pass names to implementations, resolved
/// at startup. Later registrations shadow earlier ones, so embedders can
/// override a built-in stage.
pub struct PassRegistry {
    passes: Vec<Box<dyn Pass>>,
}

impl PassRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    /// Registry with every built-in pass.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(CommentFusionPass));
        registry.register(Box::new(ImportResolvePass));
        registry.register(Box::new(SymbolResolvePass));
        registry.register(Box::new(CanonicalFormatPass));
        registry
    }

    pub fn register(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&dyn Pass> {
        self.passes
            .iter()
            .rev()
            .find(|pass| pass.name() == name)
            .map(AsRef::as_ref)
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Ordered list of pass names chosen by the caller, with an optional target
/// pass after which execution stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub passes: Vec<&'static str>,
    pub target: Option<&'static str>,
}

impl Schedule {
    /// Parse only, no analysis: the fast syntax-check mode.
    #[must_use]
    pub fn quick() -> Self {
        Self::default()
    }

    /// Full analysis: resolve imports, then build symbol tables.
    #[must_use]
    pub fn analysis() -> Self {
        Self {
            passes: vec![IMPORT_RESOLVE, SYMBOL_RESOLVE],
            target: None,
        }
    }

    /// Comment fusion plus canonical printing, halting after the printer.
    #[must_use]
    pub fn formatting() -> Self {
        Self {
            passes: vec![COMMENT_FUSION, CANONICAL_FORMAT],
            target: Some(CANONICAL_FORMAT),
        }
    }

    #[must_use]
    pub fn of(passes: Vec<&'static str>) -> Self {
        Self {
            passes,
            target: None,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// Run the pipeline over one document: parse, then execute `schedule` in
/// order against the resulting IR.
///
/// Alerts accumulate inside the returned IR; an `Err` is a pipeline fault and
/// means the run produced nothing usable.
pub fn run_pipeline(
    text: impl Into<String>,
    path: impl Into<PathBuf>,
    schedule: &Schedule,
    registry: &PassRegistry,
) -> Result<ModuleIr> {
    let source = SourceFile::new(path, text);
    let outcome = parser::parse(&source);
    let mut ir = ModuleIr {
        source,
        ast: outcome.module,
        comments: outcome.comments,
        errors: outcome.errors,
        warnings: outcome.warnings,
        sym_tab: None,
        formatted: None,
    };

    if schedule.is_empty() {
        return Ok(ir);
    }

    check_order(schedule, registry)?;
    for &name in &schedule.passes {
        let pass = registry
            .resolve(name)
            .ok_or_else(|| Error::internal(format!("unknown pass `{name}` in schedule")))?;
        pass.run(&mut ir)?;
        if schedule.target == Some(name) {
            break;
        }
    }
    Ok(ir)
}

/// Validate declared ordering dependencies against the scheduled order.
fn check_order(schedule: &Schedule, registry: &PassRegistry) -> Result<()> {
    for (idx, name) in schedule.passes.iter().enumerate() {
        let Some(pass) = registry.resolve(name) else {
            continue;
        };
        for dep in pass.must_follow() {
            if let Some(dep_idx) = schedule.passes.iter().position(|p| p == dep) {
                if dep_idx > idx {
                    return Err(Error::internal(format!(
                        "pass `{name}` must run after `{dep}`"
                    )));
                }
            }
        }
    }
    Ok(())
}
