//! Flatten a directory tree into one labeled text artifact.
//!
//! Each included file becomes a section:
//!
//! ```text
//! ## relative/path.py
//!
//! <file content>
//! ```
//!
//! Sections are joined with a blank line. Files that cannot be read as
//! UTF-8 text are logged and skipped; the rest of the walk continues.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::HuskError;
use crate::filter::InclusionPolicy;
use crate::tokens::{count_tokens_with_encoding, Encoding};
use crate::walker::{walk_files, WalkError, WalkOptions};

/// One file in the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Path relative to the flattened root.
    pub path: PathBuf,
    pub content: String,
}

impl Section {
    /// Render as `## path\n\ncontent\n`.
    pub fn render(&self) -> String {
        format!("## {}\n\n{}\n", display_path(&self.path), self.content)
    }
}

/// A file the walk found but could not include.
#[derive(Debug, Clone, Serialize)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of flattening a directory.
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub sections: Vec<Section>,
    pub skipped: Vec<Skipped>,
}

impl Flattened {
    /// The artifact text.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(Section::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Relative paths of the included files, in artifact order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.sections.iter().map(|s| s.path.as_path())
    }

    pub fn summary(&self, output: &Path, encoding: Encoding) -> FlattenSummary {
        let text = self.render();
        FlattenSummary {
            output: output.to_path_buf(),
            files: self.sections.len(),
            bytes: text.len(),
            lines: bytecount::count(text.as_bytes(), b'\n'),
            tokens: count_tokens_with_encoding(&text, encoding),
            encoding: encoding.to_string(),
            skipped: self.skipped.clone(),
        }
    }
}

/// Machine-readable description of a flatten run.
#[derive(Debug, Clone, Serialize)]
pub struct FlattenSummary {
    pub output: PathBuf,
    pub files: usize,
    pub bytes: usize,
    pub lines: usize,
    pub tokens: usize,
    pub encoding: String,
    pub skipped: Vec<Skipped>,
}

/// Builder for flattening a directory.
///
/// # Examples
///
/// ```no_run
/// use husk::filter::InclusionPolicy;
/// use husk::flatten::Flattener;
///
/// let flattened = Flattener::new("./project")
///     .policy(InclusionPolicy::default().include_tests(true))
///     .flatten()
///     .unwrap();
///
/// std::fs::write("codebase_content.txt", flattened.render()).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Flattener {
    root: PathBuf,
    policy: InclusionPolicy,
    walk_options: WalkOptions,
}

impl Flattener {
    /// Create a flattener for the given root with the default policy.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: InclusionPolicy::default(),
            walk_options: WalkOptions::default(),
        }
    }

    /// Replace the inclusion policy.
    pub fn policy(mut self, policy: InclusionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the walk options.
    pub fn walk_options(mut self, options: WalkOptions) -> Self {
        self.walk_options = options;
        self
    }

    /// Walk the root and read every accepted file.
    pub fn flatten(&self) -> Result<Flattened, HuskError> {
        let entries = walk_files(&self.root, &self.policy, &self.walk_options).map_err(|e| match e {
            WalkError::NotFound { path } => HuskError::PathNotFound(path),
            WalkError::NotADirectory { path } => HuskError::NotADirectory(path),
            other => HuskError::Walk(other),
        })?;

        let mut flattened = Flattened::default();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "walk error");
                    continue;
                }
            };

            match fs::read_to_string(&entry.path) {
                Ok(content) => flattened.sections.push(Section {
                    path: entry.relative,
                    content,
                }),
                Err(err) => {
                    warn!(path = %entry.path.display(), error = %err, "error reading file");
                    flattened.skipped.push(Skipped {
                        path: entry.relative,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            root = %self.root.display(),
            files = flattened.sections.len(),
            skipped = flattened.skipped.len(),
            "flattened"
        );
        Ok(flattened)
    }
}

/// Forward slashes on every platform so artifacts are comparable.
fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::create_dir_all(dir.path().join("mocks")).unwrap();
        fs::write(dir.path().join("pkg/app.py"), "def run():\n    pass\n").unwrap();
        fs::write(dir.path().join("pkg/test_app.py"), "def test_run():\n    run()\n").unwrap();
        fs::write(dir.path().join("mocks/fake.py"), "FAKE = 1\n").unwrap();
        fs::write(dir.path().join("setup.py"), "setup()\n").unwrap();
        fs::write(dir.path().join("codebase_content.txt"), "old artifact\n").unwrap();

        dir
    }

    #[test]
    fn test_section_format() {
        let section = Section {
            path: PathBuf::from("pkg").join("app.py"),
            content: "x = 1\n".to_string(),
        };
        assert_eq!(section.render(), "## pkg/app.py\n\nx = 1\n\n");
    }

    #[test]
    fn test_flatten_default_policy() {
        let dir = create_test_project();

        let flattened = Flattener::new(dir.path()).flatten().unwrap();

        assert_eq!(
            flattened.render(),
            "## pkg/app.py\n\ndef run():\n    pass\n\n\n## setup.py\n\nsetup()\n\n"
        );
        assert!(flattened.skipped.is_empty());
    }

    #[test]
    fn test_flatten_include_tests() {
        let dir = create_test_project();

        let flattened = Flattener::new(dir.path())
            .policy(InclusionPolicy::default().include_tests(true))
            .flatten()
            .unwrap();

        let paths: Vec<String> = flattened.paths().map(display_path).collect();
        assert_eq!(
            paths,
            vec!["mocks/fake.py", "pkg/app.py", "pkg/test_app.py", "setup.py"]
        );
    }

    #[test]
    fn test_flatten_skips_unreadable_and_continues() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "a = 1\n").unwrap();
        fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x81]).unwrap();
        fs::write(dir.path().join("z.py"), "z = 1\n").unwrap();

        let flattened = Flattener::new(dir.path()).flatten().unwrap();

        let paths: Vec<String> = flattened.paths().map(display_path).collect();
        assert_eq!(paths, vec!["a.py", "z.py"]);
        assert_eq!(flattened.skipped.len(), 1);
        assert_eq!(flattened.skipped[0].path, PathBuf::from("blob.bin"));
    }

    #[cfg(unix)]
    #[test]
    fn test_flatten_reads_symlinked_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("real.py"), "x = 1\n").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.py"), dir.path().join("link.py"))
            .unwrap();

        let flattened = Flattener::new(dir.path()).flatten().unwrap();

        assert_eq!(
            flattened.render(),
            "## link.py\n\nx = 1\n\n\n## real.py\n\nx = 1\n\n"
        );
    }

    #[test]
    fn test_flatten_missing_root() {
        let err = Flattener::new("/nonexistent/root").flatten().unwrap_err();
        assert!(matches!(err, HuskError::PathNotFound(_)));
    }

    #[test]
    fn test_flatten_file_root() {
        let dir = create_test_project();
        let err = Flattener::new(dir.path().join("setup.py")).flatten().unwrap_err();
        assert!(matches!(err, HuskError::NotADirectory(_)));
    }

    #[test]
    fn test_empty_artifact() {
        let dir = TempDir::new().unwrap();
        let flattened = Flattener::new(dir.path()).flatten().unwrap();
        assert_eq!(flattened.render(), "");

        let summary = flattened.summary(Path::new("out.txt"), Encoding::default());
        assert_eq!(summary.files, 0);
        assert_eq!(summary.tokens, 0);
    }
}
