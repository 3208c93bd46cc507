//! Import/execution shim: resolves a dotted module name to a source file,
//! lowers it through the external code-generation backend, executes the
//! result in a fresh namespace, and records it in an owned registry.
//!
//! The registry is an explicit object with its lifetime tied to the
//! embedding host, not ambient process-global state, and execution happens
//! behind the [`ExecutionHost`] trait so the trust boundary is visible:
//! generated code runs wherever the host decides, never implicitly here.
//! Execution failures are logged and reported as `None`, never propagated.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, error};

use crate::error::Result;
use crate::passes::{run_pipeline, ModuleIr, PassRegistry, Schedule};

/// Lowers validated module IR to target source text. External collaborator;
/// consumed, not reimplemented.
pub trait CodegenBackend {
    fn emit(&self, ir: &ModuleIr) -> Result<String>;
}

/// Executes generated target source inside a freshly created namespace.
pub trait ExecutionHost {
    fn execute(&mut self, source: &str, namespace: &str) -> Result<HostModule>;
}

/// Handle to a module the host created by executing generated code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostModule {
    pub name: String,
    pub file: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEntry {
    /// Placeholder created for each dotted prefix of a loaded module.
    Package,
    Module(HostModule),
}

/// Owned mapping from dotted names to loaded modules and their packages.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn module(&self, name: &str) -> Option<&HostModule> {
        match self.entries.get(name) {
            Some(RegistryEntry::Module(module)) => Some(module),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `module` under `dotted`, creating a package entry for every
    /// proper prefix that has none yet.
    fn register(&mut self, dotted: &str, module: HostModule) {
        let parts: Vec<&str> = dotted.split('.').collect();
        for idx in 1..parts.len() {
            let prefix = parts[..idx].join(".");
            self.entries.entry(prefix).or_insert(RegistryEntry::Package);
        }
        self.entries
            .insert(dotted.to_string(), RegistryEntry::Module(module));
    }
}

/// Loads Vel modules by dotted name through a backend and an execution host.
pub struct ModuleLoader<B, H> {
    base_dir: PathBuf,
    backend: B,
    host: H,
    registry: ModuleRegistry,
    passes: PassRegistry,
}

impl<B: CodegenBackend, H: ExecutionHost> ModuleLoader<B, H> {
    pub fn new(base_dir: impl Into<PathBuf>, backend: B, host: H) -> Self {
        Self {
            base_dir: base_dir.into(),
            backend,
            host,
            registry: ModuleRegistry::new(),
            passes: PassRegistry::with_defaults(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Import a module by dotted name.
    ///
    /// Analysis errors, emit failures, and execution failures are logged and
    /// turned into `None`; the caller never sees a fault and the registry is
    /// left untouched on failure.
    pub fn import(&mut self, dotted: &str) -> Option<&HostModule> {
        if self.registry.module(dotted).is_some() {
            return self.registry.module(dotted);
        }

        let file = self.source_file(dotted);
        let text = match fs::read_to_string(&file) {
            Ok(text) => text,
            Err(err) => {
                error!(module = dotted, file = %file.display(), %err, "cannot read module source");
                return None;
            }
        };

        let ir = match run_pipeline(text, &file, &Schedule::analysis(), &self.passes) {
            Ok(ir) => ir,
            Err(err) => {
                error!(module = dotted, %err, "pipeline fault while importing");
                return None;
            }
        };
        if !ir.errors.is_empty() {
            error!(
                module = dotted,
                errors = ir.errors.len(),
                "module has errors; import aborted"
            );
            return None;
        }

        let target_source = match self.backend.emit(&ir) {
            Ok(source) => source,
            Err(err) => {
                error!(module = dotted, %err, "codegen backend failed");
                return None;
            }
        };

        match self.host.execute(&target_source, dotted) {
            Ok(mut module) => {
                module.file = file;
                debug!(module = dotted, "module loaded and registered");
                self.registry.register(dotted, module);
                self.registry.module(dotted)
            }
            Err(err) => {
                error!(module = dotted, file = %file.display(), %err, "execution failed");
                None
            }
        }
    }

    fn source_file(&self, dotted: &str) -> PathBuf {
        let mut path = self.base_dir.clone();
        for segment in dotted.split('.') {
            path.push(segment);
        }
        path.set_extension("vel");
        path
    }
}

/// Backend that emits the module's canonical text; stand-in used when no
/// real emitter is wired up.
pub struct CanonicalTextBackend;

impl CodegenBackend for CanonicalTextBackend {
    fn emit(&self, ir: &ModuleIr) -> Result<String> {
        Ok(ir
            .formatted
            .clone()
            .unwrap_or_else(|| ir.source.text.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    struct RecordingHost {
        fail: bool,
        executed: Vec<String>,
    }

    impl ExecutionHost for RecordingHost {
        fn execute(&mut self, _source: &str, namespace: &str) -> Result<HostModule> {
            self.executed.push(namespace.to_string());
            if self.fail {
                return Err(Error::internal("host exploded"));
            }
            Ok(HostModule {
                name: namespace.to_string(),
                file: PathBuf::new(),
            })
        }
    }

    fn loader_with(
        dir: &Path,
        fail: bool,
    ) -> ModuleLoader<CanonicalTextBackend, RecordingHost> {
        ModuleLoader::new(
            dir,
            CanonicalTextBackend,
            RecordingHost {
                fail,
                executed: Vec::new(),
            },
        )
    }

    #[test]
    fn import_registers_module_and_package_prefixes() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let pkg = dir.path().join("pkg").join("sub");
        fs::create_dir_all(&pkg).unwrap_or_else(|err| panic!("mkdir: {err}"));
        fs::write(pkg.join("mod.vel"), "x = 1\n").unwrap_or_else(|err| panic!("write: {err}"));

        let mut loader = loader_with(dir.path(), false);
        let module = loader.import("pkg.sub.mod");
        assert!(module.is_some());

        let registry = loader.registry();
        assert!(matches!(registry.get("pkg"), Some(RegistryEntry::Package)));
        assert!(matches!(
            registry.get("pkg.sub"),
            Some(RegistryEntry::Package)
        ));
        assert!(registry.module("pkg.sub.mod").is_some());
    }

    #[test]
    fn missing_file_yields_none_without_registering() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let mut loader = loader_with(dir.path(), false);
        assert!(loader.import("ghost").is_none());
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn module_with_errors_is_not_executed() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        fs::write(dir.path().join("bad.vel"), "x = \n")
            .unwrap_or_else(|err| panic!("write: {err}"));

        let mut loader = loader_with(dir.path(), false);
        assert!(loader.import("bad").is_none());
        assert!(
            loader.host.executed.is_empty(),
            "host never ran for a module with errors"
        );
    }

    #[test]
    fn execution_failure_is_swallowed_and_logged() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        fs::write(dir.path().join("m.vel"), "x = 1\n")
            .unwrap_or_else(|err| panic!("write: {err}"));

        let mut loader = loader_with(dir.path(), true);
        assert!(loader.import("m").is_none());
        assert_eq!(loader.host.executed, vec!["m"]);
        assert!(loader.registry().is_empty(), "failed load registers nothing");
    }

    #[test]
    fn second_import_reuses_the_registry() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        fs::write(dir.path().join("m.vel"), "x = 1\n")
            .unwrap_or_else(|err| panic!("write: {err}"));

        let mut loader = loader_with(dir.path(), false);
        assert!(loader.import("m").is_some());
        assert!(loader.import("m").is_some());
        assert_eq!(loader.host.executed.len(), 1, "executed once, cached after");
    }
}
