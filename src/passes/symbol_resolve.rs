//! Builds the nested-scope symbol table for a module and warns about uses of
//! names with no visible definition.

use std::path::Path;

use crate::error::Result;
use crate::frontend::ast::{Expr, Stmt, StmtKind};
use crate::passes::{ModuleIr, Pass, IMPORT_RESOLVE, SYMBOL_RESOLVE};
use crate::symtab::{DefinitionSite, ScopeId, SymbolKind, SymbolTable};

pub struct SymbolResolvePass;

impl Pass for SymbolResolvePass {
    fn name(&self) -> &'static str {
        SYMBOL_RESOLVE
    }

    fn must_follow(&self) -> &'static [&'static str] {
        // Inlined imports contribute scopes; resolve them first when both
        // passes are scheduled.
        &[IMPORT_RESOLVE]
    }

    fn run(&self, ir: &mut ModuleIr) -> Result<()> {
        let Some(module) = ir.ast.as_ref() else {
            return Ok(());
        };
        let module_name = module
            .origin
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        let mut table = SymbolTable::new(module_name, module.origin.clone());
        let mut resolver = Resolver {
            table: &mut table,
            warnings: Vec::new(),
        };
        resolver.walk(&module.body, ScopeId::ROOT, &module.origin);
        let warnings = resolver.warnings;
        for alert in warnings {
            ir.push_alert(alert);
        }
        ir.sym_tab = Some(table);
        Ok(())
    }
}

struct Resolver<'a> {
    table: &'a mut SymbolTable,
    warnings: Vec<crate::alerts::Alert>,
}

impl Resolver<'_> {
    fn walk(&mut self, stmts: &[Stmt], scope: ScopeId, origin: &Path) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Assign(assign) => {
                    self.check_expr(&assign.value, scope);
                    self.table.define(
                        scope,
                        assign.target.name.clone(),
                        SymbolKind::Variable,
                        DefinitionSite {
                            path: origin.to_path_buf(),
                            span: assign.target.span,
                        },
                    );
                }
                StmtKind::Import(import) => {
                    let leaf = import
                        .path
                        .target
                        .rsplit('.')
                        .next()
                        .unwrap_or(&import.path.target);
                    self.table.define(
                        scope,
                        leaf.to_string(),
                        SymbolKind::Module,
                        DefinitionSite {
                            path: origin.to_path_buf(),
                            span: import.path.span,
                        },
                    );
                    if let Some(sub) = import.path.resolved.as_deref() {
                        let child =
                            self.table
                                .push_scope(scope, import.path.target.clone(), &sub.origin);
                        self.walk(&sub.body, child, &sub.origin);
                    }
                }
                StmtKind::Block(block) => {
                    self.table.define(
                        scope,
                        block.name.name.clone(),
                        SymbolKind::Block,
                        DefinitionSite {
                            path: origin.to_path_buf(),
                            span: block.name.span,
                        },
                    );
                    let child = self.table.push_scope(scope, block.name.name.clone(), origin);
                    self.walk(&block.body, child, origin);
                }
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr, scope: ScopeId) {
        match expr {
            Expr::Name(ident) => {
                if self.table.lookup(scope, &ident.name).is_none() {
                    self.warnings.push(crate::alerts::Alert::warning(
                        format!("use of undefined name `{}`", ident.name),
                        ident.span,
                        SYMBOL_RESOLVE,
                    ));
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs, scope);
                self.check_expr(rhs, scope);
            }
            Expr::Number { .. } | Expr::Str { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{run_pipeline, PassRegistry, Schedule};

    fn analyzed(text: &str) -> ModuleIr {
        let registry = PassRegistry::with_defaults();
        run_pipeline(
            text,
            "main.vel",
            &Schedule::of(vec![SYMBOL_RESOLVE]),
            &registry,
        )
        .unwrap_or_else(|err| panic!("pipeline fault: {err}"))
    }

    fn names(ir: &ModuleIr) -> Vec<String> {
        ir.sym_tab
            .as_ref()
            .map(|t| {
                t.symbols_from(Path::new("main.vel"))
                    .into_iter()
                    .map(|s| s.name)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn assignment_defines_symbol_in_module_scope() {
        let ir = analyzed("x = 1\n");
        assert_eq!(names(&ir), vec!["x"]);
        assert!(ir.warnings.is_empty());
    }

    #[test]
    fn block_creates_nested_scope() {
        let ir = analyzed("def setup {\n    y = 2\n}\n");
        assert_eq!(names(&ir), vec!["setup", "y"]);
    }

    #[test]
    fn undefined_name_use_warns() {
        let ir = analyzed("x = y\n");
        assert_eq!(ir.warnings.len(), 1);
        assert!(ir.warnings[0].message.contains("`y`"));
        assert_eq!(ir.warnings[0].origin, SYMBOL_RESOLVE);
    }

    #[test]
    fn outer_definition_is_visible_inside_block() {
        let ir = analyzed("x = 1\ndef setup {\n    y = x\n}\n");
        assert!(ir.warnings.is_empty());
    }

    #[test]
    fn import_defines_module_symbol_by_leaf_name() {
        let ir = analyzed("import vel from pkg.dep;\n");
        assert_eq!(names(&ir), vec!["dep"]);
    }
}
