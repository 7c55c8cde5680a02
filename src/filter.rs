//! Inclusion policy for the directory flattener.
//!
//! A policy is an ordered list of [`Rule`]s. An entry is accepted when no
//! rule rejects it. Directory rules prune whole subtrees during the walk;
//! file rules are checked per file.

use std::path::Path;

use glob::Pattern;
use thiserror::Error;

/// Default name of the flattened artifact.
pub const DEFAULT_OUTPUT: &str = "codebase_content.txt";

/// Directories never worth flattening.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".git", ".cache", "build", "install"];

/// Name fragments that mark test code.
pub const TEST_MARKERS: &[&str] = &["test", "mock"];

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Result of checking an entry against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterResult {
    Accept,
    Reject(RejectReason),
}

impl FilterResult {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterResult::Accept)
    }
}

/// Why an entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Directory name is in the excluded set.
    ExcludedDirectory(String),
    /// Name contains a marker such as `test`.
    NameMarker(String),
    /// File name is explicitly excluded (e.g. the output artifact).
    ExcludedFile(String),
    /// Relative path matches an exclude glob.
    Pattern(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::ExcludedDirectory(name) => write!(f, "excluded directory '{name}'"),
            RejectReason::NameMarker(marker) => write!(f, "name contains '{marker}'"),
            RejectReason::ExcludedFile(name) => write!(f, "excluded file '{name}'"),
            RejectReason::Pattern(pattern) => write!(f, "matches '{pattern}'"),
        }
    }
}

/// A single inclusion rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Reject directories with exactly this name.
    DirName(String),
    /// Reject files and directories whose lower-cased name contains this
    /// (lower-case) marker.
    NameContains(String),
    /// Reject files with exactly this name.
    FileName(String),
    /// Reject files and directories whose relative path matches.
    Glob(Pattern),
}

impl Rule {
    fn check(&self, relative: &Path, is_dir: bool) -> Option<RejectReason> {
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        match self {
            Rule::DirName(excluded) if is_dir && name == excluded.as_str() => {
                Some(RejectReason::ExcludedDirectory(excluded.clone()))
            }
            Rule::NameContains(marker) if name.to_lowercase().contains(marker.as_str()) => {
                Some(RejectReason::NameMarker(marker.clone()))
            }
            Rule::FileName(excluded) if !is_dir && name == excluded.as_str() => {
                Some(RejectReason::ExcludedFile(excluded.clone()))
            }
            Rule::Glob(pattern) if pattern.matches_path(relative) => {
                Some(RejectReason::Pattern(pattern.as_str().to_string()))
            }
            _ => None,
        }
    }
}

/// Decides which files end up in the flattened artifact.
///
/// # Examples
///
/// ```
/// use husk::filter::InclusionPolicy;
/// use std::path::Path;
///
/// let policy = InclusionPolicy::default();
/// assert!(policy.check_file(Path::new("src/app.py")).is_accept());
/// assert!(!policy.check_file(Path::new("src/test_app.py")).is_accept());
///
/// let policy = InclusionPolicy::default().include_tests(true);
/// assert!(policy.check_file(Path::new("src/test_app.py")).is_accept());
/// ```
#[derive(Debug, Clone)]
pub struct InclusionPolicy {
    rules: Vec<Rule>,
}

impl Default for InclusionPolicy {
    /// Skip VCS/build directories, test and mock code, and the default
    /// output artifact.
    fn default() -> Self {
        let mut rules: Vec<Rule> = DEFAULT_EXCLUDED_DIRS
            .iter()
            .map(|d| Rule::DirName((*d).to_string()))
            .collect();
        rules.extend(TEST_MARKERS.iter().map(|m| Rule::NameContains((*m).to_string())));
        rules.push(Rule::FileName(DEFAULT_OUTPUT.to_string()));
        Self { rules }
    }
}

impl InclusionPolicy {
    /// Accept everything except the default output artifact.
    pub fn unfiltered() -> Self {
        Self {
            rules: vec![Rule::FileName(DEFAULT_OUTPUT.to_string())],
        }
    }

    /// Keep or drop the test/mock marker rules.
    pub fn include_tests(mut self, include: bool) -> Self {
        if include {
            self.rules.retain(|r| !matches!(r, Rule::NameContains(_)));
        }
        self
    }

    /// Add a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Exclude files with this exact name.
    pub fn exclude_file(self, name: impl Into<String>) -> Self {
        self.rule(Rule::FileName(name.into()))
    }

    /// Exclude relative paths matching a glob.
    pub fn exclude_glob(self, pattern: &str) -> Result<Self, FilterError> {
        let compiled = Pattern::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(self.rule(Rule::Glob(compiled)))
    }

    /// Check a directory, given relative to the walk root.
    pub fn check_dir(&self, relative: &Path) -> FilterResult {
        self.check(relative, true)
    }

    /// Check a file, given relative to the walk root.
    pub fn check_file(&self, relative: &Path) -> FilterResult {
        self.check(relative, false)
    }

    fn check(&self, relative: &Path, is_dir: bool) -> FilterResult {
        self.rules
            .iter()
            .find_map(|rule| rule.check(relative, is_dir))
            .map_or(FilterResult::Accept, FilterResult::Reject)
    }
}
