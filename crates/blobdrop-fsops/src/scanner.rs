//! Source folder scanning.
//!
//! Only the immediate regular files of the folder are considered, including
//! symlinks that resolve to one; sub-folders (the duplicate folder among them)
//! are never entered.

use std::path::{Path, PathBuf};

use blobdrop_config::defaults::DEFAULT_SEARCH_PATTERN;
use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// Lists candidate files in the watched folder.
pub trait SourceScanner: Send + Sync {
    /// Files directly inside `folder` whose name matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the folder cannot be read.
    fn scan(&self, folder: &Path, pattern: &str) -> FsOpsResult<Vec<PathBuf>>;
}

/// Glob-based scanner returning matches sorted by file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobScanner;

impl SourceScanner for GlobScanner {
    fn scan(&self, folder: &Path, pattern: &str) -> FsOpsResult<Vec<PathBuf>> {
        let matcher = compile_pattern(pattern)?;
        let mut matches = Vec::new();
        for entry in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| FsOpsError::walkdir("scan.read_dir", folder, source))?;
            if entry.path().is_file() && matcher.is_match(entry.file_name()) {
                matches.push(entry.into_path());
            }
        }
        Ok(matches)
    }
}

/// Compile a file-name glob; blank patterns mean `*.pdf`.
///
/// # Errors
///
/// Returns `FsOpsError::Glob` when the pattern does not compile.
pub fn compile_pattern(pattern: &str) -> FsOpsResult<GlobMatcher> {
    let pattern = match pattern.trim() {
        "" => DEFAULT_SEARCH_PATTERN,
        trimmed => trimmed,
    };
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| FsOpsError::glob("scan.compile_pattern", pattern.to_string(), source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn scan_returns_sorted_top_level_matches() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::write(root.join("b.pdf"), b"b")?;
        fs::write(root.join("a.pdf"), b"a")?;
        fs::write(root.join("notes.txt"), b"n")?;
        fs::create_dir(root.join("folder.pdf"))?;
        fs::create_dir(root.join("duplicate"))?;
        fs::write(root.join("duplicate").join("c.pdf"), b"c")?;

        let found = GlobScanner.scan(root, "*.pdf")?;
        assert_eq!(names(&found), vec!["a.pdf", "b.pdf"]);
        assert!(found.iter().all(|path| path.parent() == Some(root)));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_matched() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path().join("src");
        let real = temp.path().join("real");
        fs::create_dir(&root)?;
        fs::create_dir(&real)?;
        fs::write(root.join("plain.pdf"), b"p")?;
        fs::write(real.join("linked.pdf"), b"l")?;
        std::os::unix::fs::symlink(real.join("linked.pdf"), root.join("linked.pdf"))?;
        std::os::unix::fs::symlink(&real, root.join("dir.pdf"))?;
        std::os::unix::fs::symlink(real.join("absent.pdf"), root.join("dangling.pdf"))?;

        let found = GlobScanner.scan(&root, "*.pdf")?;
        assert_eq!(names(&found), vec!["linked.pdf", "plain.pdf"]);
        Ok(())
    }

    #[test]
    fn blank_pattern_defaults_to_pdf() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("scan.pdf"), b"s")?;
        fs::write(temp.path().join("scan.tif"), b"t")?;

        assert_eq!(names(&GlobScanner.scan(temp.path(), "  ")?), vec!["scan.pdf"]);
        assert_eq!(names(&GlobScanner.scan(temp.path(), "*.tif")?), vec!["scan.tif"]);
        assert_eq!(GlobScanner.scan(temp.path(), "*")?.len(), 2);
        Ok(())
    }

    #[test]
    fn empty_folder_yields_nothing() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        assert!(GlobScanner.scan(temp.path(), "*.pdf")?.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_pattern_and_missing_folder_are_errors() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        assert!(matches!(
            GlobScanner.scan(temp.path(), "[unclosed"),
            Err(FsOpsError::Glob { .. })
        ));
        assert!(matches!(
            GlobScanner.scan(&temp.path().join("absent"), "*.pdf"),
            Err(FsOpsError::Walkdir { .. })
        ));
        Ok(())
    }

    #[test]
    fn star_does_not_cross_separators() -> FsOpsResult<()> {
        let matcher = compile_pattern("*.pdf")?;
        assert!(matcher.is_match("a.pdf"));
        assert!(!matcher.is_match("nested/a.pdf"));
        Ok(())
    }
}
