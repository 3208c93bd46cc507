use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vel::Workspace;

// Most integration-test crates only need one or two of these; keep each
// helper local to avoid per-crate dead-code warnings.
#[allow(dead_code)]
pub fn project() -> TempDir {
    tempfile::tempdir().unwrap_or_else(|err| panic!("create project dir: {err}"))
}

#[allow(dead_code)]
pub fn write_source(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap_or_else(|err| panic!("write source: {err}"));
}

#[allow(dead_code)]
pub fn write_sources(root: &Path, sources: &[(&str, &str)]) {
    for (relative, contents) in sources {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|err| panic!("create dir {}: {err}", parent.display()));
        }
        write_source(&path, contents);
    }
}

/// Lay out `sources` in a fresh project directory and run full analysis over
/// `entry`. The `TempDir` must stay alive for as long as the workspace reads
/// from disk.
#[allow(dead_code)]
pub fn analyzed(sources: &[(&str, &str)], entry: &str) -> (TempDir, Workspace, PathBuf) {
    let dir = project();
    write_sources(dir.path(), sources);
    let entry_path = dir.path().join(entry);
    let mut workspace = Workspace::new();
    workspace.ensure_analyzed(&entry_path);
    (dir, workspace, entry_path)
}
