//
//  scan.rs
//  routecheck
//
//  Source discovery: walk roots, parse every supported file in parallel.
//

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::{extract_file, SupportedLanguage};
use crate::model::ClassDecl;

/// Directories that are never scanned, even without .gitignore.
const BUILTIN_IGNORE: &[&str] = &[
    "node_modules",
    "vendor",
    "dist",
    "build",
    ".git",
    ".svn",
    ".hg",
    ".gradle",
    ".idea",
    ".mvn",
    "target",
    "out",
    "bin",
    ".cache",
    "coverage",
];

/// Per-directory ignore file honored on top of .gitignore.
const IGNORE_FILENAME: &str = ".routecheckignore";

fn is_ignored(path: &Path, extra: &[String]) -> bool {
    path.components().any(|c| {
        if let std::path::Component::Normal(name) = c {
            let name = name.to_str().unwrap_or("");
            BUILTIN_IGNORE.contains(&name) || extra.iter().any(|e| e == name)
        } else {
            false
        }
    })
}

/// Every supported source file under `roots`, sorted.
pub fn discover_files(roots: &[PathBuf], extra_ignores: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = roots
        .iter()
        .flat_map(|root| {
            WalkBuilder::new(root)
                .hidden(true)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .add_custom_ignore_filename(IGNORE_FILENAME)
                .build()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
                .filter(move |entry| {
                    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                    !is_ignored(relative, extra_ignores)
                })
                .filter(|entry| SupportedLanguage::from_path(entry.path()).is_some())
                .map(|entry| entry.into_path())
        })
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Lock a collector, keeping what earlier workers pushed if one of them panicked.
pub(crate) fn lock_recovering<T>(collector: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    collector.lock().unwrap_or_else(|poisoned| {
        warn!("worker panicked while holding the collector; keeping collected results");
        poisoned.into_inner()
    })
}

/// Parse every supported file under `roots` into class declarations.
///
/// Unreadable or unparsable files are logged and skipped. The result is
/// ordered by source location.
pub fn scan_roots(roots: &[PathBuf], extra_ignores: &[String]) -> Vec<ClassDecl> {
    let files = discover_files(roots, extra_ignores);
    debug!(files = files.len(), "discovered source files");

    let classes: Mutex<Vec<ClassDecl>> = Mutex::new(Vec::new());
    files.par_iter().for_each(|file_path| {
        let source = match fs::read_to_string(file_path) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %file_path.display(), error = %e, "failed to read source file");
                return;
            }
        };
        match extract_file(file_path, &source) {
            Ok(extracted) => lock_recovering(&classes).extend(extracted),
            Err(e) => warn!(file = %file_path.display(), error = %e, "failed to parse source file"),
        }
    });

    let mut classes = classes.into_inner().unwrap_or_else(PoisonError::into_inner);
    classes.sort_by(|a, b| a.location.cmp(&b.location));
    info!(files = files.len(), classes = classes.len(), "scanned sources");
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_scan_skips_ignored_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main/java/A.java", "@Component class A {}");
        write(dir.path(), "src/main/java/B.java", "@RestController class B {}");
        write(dir.path(), "target/generated/C.java", "class C {}");
        write(dir.path(), "legacy/D.java", "class D {}");
        write(dir.path(), "README.md", "# readme");

        let classes = scan_roots(&[dir.path().to_path_buf()], &["legacy".to_string()]);
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_extra_ignores_apply_per_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/src/A.java", "class A {}");
        write(dir.path(), "a/legacy/B.java", "class B {}");
        write(dir.path(), "b/src/C.java", "class C {}");
        write(dir.path(), "b/legacy/D.java", "class D {}");
        let roots = vec![dir.path().join("a"), dir.path().join("b")];

        let files = discover_files(&roots, &["legacy".to_string()]);
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.java", "C.java"]);
    }

    #[test]
    fn test_poisoned_collector_keeps_results() {
        let collector = Mutex::new(vec![1]);
        let _ = std::panic::catch_unwind(|| {
            let mut guard = collector.lock().unwrap();
            guard.push(2);
            panic!("worker failed");
        });
        assert!(collector.is_poisoned());
        lock_recovering(&collector).push(3);
        assert_eq!(collector.into_inner().unwrap_or_else(PoisonError::into_inner), vec![1, 2, 3]);
    }

    #[test]
    fn test_overlapping_roots_scan_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "clients/A.java", "@Component class A {}");
        let roots = vec![dir.path().to_path_buf(), dir.path().join("clients")];
        assert_eq!(discover_files(&roots, &[]).len(), 1);
    }
}
