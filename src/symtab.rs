//! Nested-scope symbol table built by the `symbol-resolve` pass.
//!
//! Scopes form a tree rooted at the module scope. The tree is arena-backed:
//! scopes refer to each other through `ScopeId` indices, so parent links are
//! lookups, never ownership, and the structure cannot be made cyclic by
//! accident.

use std::path::{Path, PathBuf};

use crate::alerts::LineSpan;

/// Handle to a scope inside a [`SymbolTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

impl ScopeId {
    pub const ROOT: Self = ScopeId(0);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Block,
    Module,
}

impl SymbolKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Block => "block",
            SymbolKind::Module => "module",
        }
    }
}

/// One place a symbol is defined: the file and span of the defining node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefinitionSite {
    pub path: PathBuf,
    pub span: LineSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Owning scope, usable for lookups against the table that produced it.
    pub scope: ScopeId,
    /// Every definition in source order; re-assignment appends.
    pub defn: Vec<DefinitionSite>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub id: ScopeId,
    /// Module path for the root scope, block name for nested scopes.
    pub name: String,
    /// File whose text produced the entries of this scope.
    pub origin: PathBuf,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    entries: Vec<Symbol>,
}

impl Scope {
    /// Entries in table order (insertion order of first definition).
    #[must_use]
    pub fn entries(&self) -> &[Symbol] {
        &self.entries
    }
}

/// Arena of scopes rooted at the module scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    /// Create a table with its root module scope.
    #[must_use]
    pub fn new(module_name: impl Into<String>, origin: impl Into<PathBuf>) -> Self {
        Self {
            scopes: vec![Scope {
                id: ScopeId::ROOT,
                name: module_name.into(),
                origin: origin.into(),
                parent: None,
                children: Vec::new(),
                entries: Vec::new(),
            }],
        }
    }

    /// Add a child scope under `parent`.
    pub fn push_scope(
        &mut self,
        parent: ScopeId,
        name: impl Into<String>,
        origin: impl Into<PathBuf>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            id,
            name: name.into(),
            origin: origin.into(),
            parent: Some(parent),
            children: Vec::new(),
            entries: Vec::new(),
        });
        if let Some(scope) = self.scopes.get_mut(parent.0) {
            scope.children.push(id);
        }
        id
    }

    /// Define `name` in `scope`, or append a definition site if it already
    /// exists there.
    pub fn define(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        kind: SymbolKind,
        site: DefinitionSite,
    ) {
        let name = name.into();
        let Some(data) = self.scopes.get_mut(scope.0) else {
            return;
        };
        if let Some(existing) = data.entries.iter_mut().find(|sym| sym.name == name) {
            existing.defn.push(site);
            return;
        }
        data.entries.push(Symbol {
            name,
            kind,
            scope,
            defn: vec![site],
        });
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    /// Resolve `name` starting at `scope` and walking parent links.
    #[must_use]
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.scope(id)?;
            if let Some(symbol) = data.entries.iter().find(|sym| sym.name == name) {
                return Some(symbol);
            }
            current = data.parent;
        }
        None
    }

    /// Scopes in pre-order starting at the root.
    #[must_use]
    pub fn scopes_preorder(&self) -> Vec<ScopeId> {
        let mut out = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![ScopeId::ROOT];
        while let Some(id) = stack.pop() {
            let Some(scope) = self.scope(id) else { continue };
            out.push(id);
            for child in scope.children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Flatten the entries of every scope whose entries originate in `path`,
    /// concatenating scopes in pre-order, each scope's entries in table order.
    #[must_use]
    pub fn symbols_from(&self, path: &Path) -> Vec<Symbol> {
        let mut out = Vec::new();
        for id in self.scopes_preorder() {
            let Some(scope) = self.scope(id) else { continue };
            if scope.origin == path {
                out.extend(scope.entries.iter().cloned());
            }
        }
        out
    }
}
