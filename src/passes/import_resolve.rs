//! Inlines same-language import targets into the AST so deep dependency and
//! cross-file symbol queries can walk one tree.
//!
//! Resolution carries an explicit visited set; a file is inlined at most once
//! per run, so import cycles terminate.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::alerts::{Alert, LineSpan};
use crate::error::Result;
use crate::frontend::ast::{ImportKind, Module, Stmt, StmtKind};
use crate::frontend::parser;
use crate::passes::{ModuleIr, Pass, IMPORT_RESOLVE};
use crate::source::SourceFile;

pub struct ImportResolvePass;

impl Pass for ImportResolvePass {
    fn name(&self) -> &'static str {
        IMPORT_RESOLVE
    }

    fn run(&self, ir: &mut ModuleIr) -> Result<()> {
        let base_dir = ir
            .source
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let Some(module) = ir.ast.as_mut() else {
            return Ok(());
        };

        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(module.origin.clone());
        let mut unresolved: Vec<Alert> = Vec::new();
        resolve_stmts(&mut module.body, &base_dir, &mut visited, &mut unresolved);

        for alert in unresolved {
            ir.push_alert(alert);
        }
        Ok(())
    }
}

fn resolve_stmts(
    stmts: &mut [Stmt],
    base_dir: &Path,
    visited: &mut HashSet<PathBuf>,
    unresolved: &mut Vec<Alert>,
) {
    for stmt in stmts {
        match &mut stmt.kind {
            StmtKind::Import(import) => {
                if import.kind != ImportKind::Vel || import.path.resolved.is_some() {
                    continue;
                }
                let target = target_file(base_dir, &import.path.target);
                if visited.contains(&target) {
                    continue;
                }
                match load_module(&target) {
                    Some(mut sub) => {
                        visited.insert(target);
                        resolve_stmts(&mut sub.body, base_dir, visited, unresolved);
                        import.path.resolved = Some(Box::new(sub));
                    }
                    None => {
                        debug!(target_path = %target.display(), "import target not found");
                        unresolved.push(Alert::warning(
                            format!("cannot resolve import `{}`", import.path.target),
                            import.path.span,
                            IMPORT_RESOLVE,
                        ));
                    }
                }
            }
            StmtKind::Block(block) => {
                resolve_stmts(&mut block.body, base_dir, visited, unresolved);
            }
            StmtKind::Assign(_) => {}
        }
    }
}

fn target_file(base_dir: &Path, dotted: &str) -> PathBuf {
    let mut path = base_dir.to_path_buf();
    for segment in dotted.split('.') {
        path.push(segment);
    }
    path.set_extension("vel");
    path
}

fn load_module(path: &Path) -> Option<Module> {
    let text = fs::read_to_string(path).ok()?;
    let source = SourceFile::new(path, text);
    let outcome = parser::parse(&source);
    let mut module = outcome.module?;
    // Sub-module alerts belong to the sub-file's own analysis, not to the
    // importing module; only the structure is carried over.
    module.span = LineSpan::default();
    Some(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{run_pipeline, PassRegistry, Schedule};
    use std::fs;
    use tempfile::tempdir;

    fn resolve_in_dir(entry_text: &str, files: &[(&str, &str)]) -> ModuleIr {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        for (name, text) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            fs::write(&path, text).unwrap_or_else(|err| panic!("write: {err}"));
        }
        let entry = dir.path().join("main.vel");
        fs::write(&entry, entry_text).unwrap_or_else(|err| panic!("write: {err}"));
        let registry = PassRegistry::with_defaults();
        run_pipeline(
            entry_text,
            entry,
            &Schedule::of(vec![IMPORT_RESOLVE]),
            &registry,
        )
        .unwrap_or_else(|err| panic!("pipeline fault: {err}"))
    }

    fn first_import(ir: &ModuleIr) -> &crate::frontend::ast::Import {
        let stmts = ir
            .ast
            .as_ref()
            .map(|m| m.body.as_slice())
            .unwrap_or_default();
        match &stmts[0].kind {
            StmtKind::Import(import) => import,
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn resolves_existing_vel_import() {
        let ir = resolve_in_dir("import vel from dep;\n", &[("dep.vel", "a = 1\n")]);
        let import = first_import(&ir);
        assert!(import.path.resolved.is_some());
        assert!(ir.warnings.is_empty());
    }

    #[test]
    fn missing_target_warns_instead_of_faulting() {
        let ir = resolve_in_dir("import vel from ghost;\n", &[]);
        let import = first_import(&ir);
        assert!(import.path.resolved.is_none());
        assert_eq!(ir.warnings.len(), 1);
        assert_eq!(ir.warnings[0].origin, IMPORT_RESOLVE);
    }

    #[test]
    fn foreign_imports_are_ignored() {
        let ir = resolve_in_dir("import py from os;\n", &[]);
        let import = first_import(&ir);
        assert!(import.path.resolved.is_none());
        assert!(ir.warnings.is_empty());
    }

    #[test]
    fn import_cycles_terminate() {
        let ir = resolve_in_dir(
            "import vel from a;\n",
            &[("a.vel", "import vel from b;\n"), ("b.vel", "import vel from a;\n")],
        );
        // a inlined under main; b inlined under a; the back-edge to a stays
        // unresolved because a was already visited.
        let import = first_import(&ir);
        assert!(import.path.resolved.is_some());
    }

    #[test]
    fn dotted_target_maps_to_nested_path() {
        let ir = resolve_in_dir(
            "import vel from pkg.dep;\n",
            &[("pkg/dep.vel", "a = 1\n")],
        );
        let import = first_import(&ir);
        assert!(import.path.resolved.is_some());
    }
}
