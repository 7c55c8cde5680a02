//! Signature extraction: strip docstrings, comments and function bodies
//! from Python source.
//!
//! The transformation is two pure passes over a [`Module`]:
//!
//! - [`strip_docstrings`] removes the leading text literal from every
//!   module, class and function body at any depth.
//! - [`replace_bodies`] replaces every function body with `pass`. Inside a
//!   class only the class's own methods are stubbed; methods of a nested
//!   class keep their bodies.
//!
//! Comments never make it into the tree, so serializing the result with
//! [`unparse`] drops them as well.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::HuskError;
use crate::syntax::{parse, unparse, Clause, Module, ParseError, Stmt};
use crate::tokens::{count_tokens_with_encoding, Encoding};

/// Strip docstrings and function bodies from Python source.
///
/// # Examples
///
/// ```
/// use husk::strip::transform;
///
/// let out = transform("def f(x):\n    \"\"\"doc\"\"\"\n    return x + 1\n").unwrap();
/// assert_eq!(out, "def f(x):\n    pass\n");
/// ```
pub fn transform(source: &str) -> Result<String, ParseError> {
    let module = parse(source)?;
    let module = replace_bodies(strip_docstrings(module));
    Ok(unparse(&module))
}

/// Remove docstrings from the module and from every class and function,
/// however deeply nested.
pub fn strip_docstrings(module: Module) -> Module {
    Module {
        body: strip_body(module.body, true),
    }
}

fn strip_body(body: Vec<Stmt>, owns_docstring: bool) -> Vec<Stmt> {
    let mut stmts = body.into_iter().peekable();
    if owns_docstring {
        stmts.next_if(Stmt::is_docstring);
    }
    stmts.map(strip_statement).collect()
}

fn strip_statement(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::FunctionDef(mut func) => {
            func.body = strip_body(func.body, true);
            Stmt::FunctionDef(func)
        }
        Stmt::ClassDef(mut class) => {
            class.body = strip_body(class.body, true);
            Stmt::ClassDef(class)
        }
        Stmt::Compound(mut compound) => {
            compound.clauses = compound
                .clauses
                .into_iter()
                .map(|clause| Clause {
                    body: strip_body(clause.body, false),
                    ..clause
                })
                .collect();
            Stmt::Compound(compound)
        }
        other => other,
    }
}

/// Replace function bodies with `pass`.
///
/// Functions are found by walking module statements and the clauses of
/// compound statements. A class contributes only its direct methods.
pub fn replace_bodies(module: Module) -> Module {
    Module {
        body: module.body.into_iter().map(replace_statement).collect(),
    }
}

fn replace_statement(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::FunctionDef(func) => Stmt::FunctionDef(func.stubbed()),
        Stmt::ClassDef(mut class) => {
            class.body = class
                .body
                .into_iter()
                .map(|member| match member {
                    Stmt::FunctionDef(method) => Stmt::FunctionDef(method.stubbed()),
                    other => other,
                })
                .collect();
            Stmt::ClassDef(class)
        }
        Stmt::Compound(mut compound) => {
            compound.clauses = compound
                .clauses
                .into_iter()
                .map(|clause| Clause {
                    body: clause.body.into_iter().map(replace_statement).collect(),
                    ..clause
                })
                .collect();
            Stmt::Compound(compound)
        }
        other => other,
    }
}

/// Outcome of stripping one file.
#[derive(Debug, Clone, Serialize)]
pub struct StripReport {
    pub path: PathBuf,
    pub original_lines: usize,
    pub stripped_lines: usize,
    pub original_tokens: usize,
    pub stripped_tokens: usize,
    /// Whether the file on disk was replaced.
    pub written: bool,
    #[serde(skip)]
    pub output: String,
}

/// Options for [`strip_file`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StripOptions {
    /// Transform without touching the file.
    pub dry_run: bool,
    /// Encoding used for the token counts in the report.
    pub encoding: Encoding,
}

/// Strip a file in place.
///
/// The file is rewritten only after the transformation succeeded, so a
/// syntax error leaves it untouched. There is no backup.
pub fn strip_file(path: &Path, options: &StripOptions) -> Result<StripReport, HuskError> {
    if !path.exists() {
        return Err(HuskError::PathNotFound(path.to_path_buf()));
    }

    let source = fs::read_to_string(path).map_err(|e| HuskError::io(path, e))?;
    let output = transform(&source).map_err(|err| HuskError::Parse {
        path: path.to_path_buf(),
        source: err,
    })?;
    debug!(path = %path.display(), bytes_in = source.len(), bytes_out = output.len(), "transformed");

    if !options.dry_run {
        fs::write(path, &output).map_err(|e| HuskError::io(path, e))?;
        info!(path = %path.display(), "stripped");
    }

    Ok(StripReport {
        path: path.to_path_buf(),
        original_lines: line_count(&source),
        stripped_lines: line_count(&output),
        original_tokens: count_tokens_with_encoding(&source, options.encoding),
        stripped_tokens: count_tokens_with_encoding(&output, options.encoding),
        written: !options.dry_run,
        output,
    })
}

fn line_count(text: &str) -> usize {
    let newlines = bytecount::count(text.as_bytes(), b'\n');
    if text.is_empty() || text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_function_body_and_docstring() {
        let out = transform("def f(x):\n    \"\"\"doc\"\"\"\n    return x + 1\n").unwrap();
        assert_eq!(out, "def f(x):\n    pass\n");
    }

    #[test]
    fn test_module_docstring_removed() {
        let code = "\"\"\"Module doc.\n\nMore.\n\"\"\"\nimport os\n\nVERSION = \"1.0\"\n";
        assert_eq!(transform(code).unwrap(), "import os\nVERSION = \"1.0\"\n");
    }

    #[test]
    fn test_class_methods_stubbed_nested_class_kept() {
        let code = r#"
class Outer:
    """Outer doc."""
    limit = 10

    def method(self, a, b=2):
        """Method doc."""
        total = a + b
        return total

    class Inner:
        """Inner doc."""
        def inner_method(self):
            """Inner method doc."""
            return 42
"#;
        let expected = "\
class Outer:
    limit = 10

    def method(self, a, b=2):
        pass

    class Inner:
        def inner_method(self):
            return 42
";
        assert_eq!(transform(code).unwrap(), expected);
    }

    #[test]
    fn test_nested_helpers_discarded() {
        let code = r#"
def outer(items):
    def helper(item):
        return item * 2
    return [helper(i) for i in items]
"#;
        assert_eq!(transform(code).unwrap(), "def outer(items):\n    pass\n");
    }

    #[test]
    fn test_async_and_decorated_signatures_preserved() {
        let code = r#"
import functools

@functools.lru_cache(maxsize=None)
async def fetch(url: str, *, timeout: float = 1.0) -> bytes:
    """Fetch a URL."""
    async with session() as s:
        return await s.get(url)

class Api:
    @property
    def name(self) -> str:
        return self._name
"#;
        let expected = "\
import functools

@functools.lru_cache(maxsize=None)
async def fetch(url: str, *, timeout: float = 1.0) -> bytes:
    pass

class Api:
    @property
    def name(self) -> str:
        pass
";
        assert_eq!(transform(code).unwrap(), expected);
    }

    #[test]
    fn test_definitions_inside_compound_statements() {
        let code = r#"
if TYPE_CHECKING:
    def hint(x):
        return x
else:
    hint = None

try:
    from fast import speed
except ImportError:
    def speed():
        """Slow fallback."""
        return 0
"#;
        let expected = "\
if TYPE_CHECKING:
    def hint(x):
        pass
else:
    hint = None
try:
    from fast import speed
except ImportError:
    def speed():
        pass
";
        assert_eq!(transform(code).unwrap(), expected);
    }

    #[test]
    fn test_class_only_docstring_becomes_pass() {
        let code = "class Marker:\n    \"\"\"Marker type.\"\"\"\n";
        assert_eq!(transform(code).unwrap(), "class Marker:\n    pass\n");
    }

    #[test]
    fn test_comments_removed() {
        let code = "# header\nx = 1  # trailing\n\ndef f():  # why\n    # inside\n    return x\n";
        assert_eq!(transform(code).unwrap(), "x = 1\n\ndef f():\n    pass\n");
    }

    #[test]
    fn test_non_text_literals_are_not_docstrings() {
        let module = parse("b\"bytes\"\nx = 1\n").unwrap();
        let stripped = strip_docstrings(module.clone());
        assert_eq!(stripped, module);

        let module = parse("f\"{x}\"\n").unwrap();
        assert_eq!(strip_docstrings(module.clone()), module);
    }

    #[test]
    fn test_string_in_if_block_is_not_a_docstring() {
        let code = "if x:\n    \"keep\"\n";
        assert_eq!(transform(code).unwrap(), "if x:\n    \"keep\"\n");
    }

    #[test]
    fn test_passes_commute() {
        let code = r#"
"""doc"""
class A:
    """a"""
    def f(self):
        """f"""
        return 1
"#;
        let module = parse(code).unwrap();
        let one = replace_bodies(strip_docstrings(module.clone()));
        let two = strip_docstrings(replace_bodies(module));
        assert_eq!(one, two);
    }

    #[test]
    fn test_idempotent() {
        let code = r#"
"""Service module."""
import asyncio

DEFAULT = {"a": 1,
           "b": 2}

class Service(Base):
    """A service."""
    retries = 3

    def __init__(self, name):
        self.name = name

    async def run(self):
        while True:
            await asyncio.sleep(1)

    class Config:
        def load(self):
            return {}

def main():
    Service("x").run()
"#;
        let once = transform(code).unwrap();
        let twice = transform(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_error() {
        let err = transform("def broken(:\n    pass\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_python2_statements_are_parse_errors() {
        for code in ["print 'hello'\n", "exec 'x = 1'\n", "x = `1`\n"] {
            let err = transform(code).unwrap_err();
            assert!(matches!(err, ParseError::InvalidSyntax { .. }), "{code:?}");
        }
    }

    #[test]
    fn test_crlf_input_has_uniform_line_endings() {
        let out = transform("y = [1,\r\n  2]\r\ndef f():\r\n    return y\r\n").unwrap();
        assert_eq!(out, "y = [1,\n  2]\n\ndef f():\n    pass\n");
        assert!(!out.contains('\r'));
    }

    #[test]
    fn test_strip_file_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp.py");
        fs::write(&path, "def f():\n    \"\"\"doc\"\"\"\n    return 1\n").unwrap();

        let report = strip_file(&path, &StripOptions::default()).unwrap();
        assert!(report.written);
        assert_eq!(report.original_lines, 3);
        assert_eq!(report.stripped_lines, 2);
        assert!(report.stripped_tokens < report.original_tokens);
        assert_eq!(fs::read_to_string(&path).unwrap(), "def f():\n    pass\n");
    }

    #[test]
    fn test_strip_file_leaves_malformed_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.py");
        let original = "def f(x:\n    return (x\n";
        fs::write(&path, original).unwrap();

        let err = strip_file(&path, &StripOptions::default()).unwrap_err();
        assert!(matches!(err, HuskError::Parse { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_strip_file_leaves_python2_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.py");
        let original = "def greet():\n    print 'x'\n";
        fs::write(&path, original).unwrap();

        let err = strip_file(&path, &StripOptions::default()).unwrap_err();
        assert!(matches!(err, HuskError::Parse { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_strip_file_dry_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keep.py");
        let original = "def f():\n    return 1\n";
        fs::write(&path, original).unwrap();

        let options = StripOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = strip_file(&path, &options).unwrap();
        assert!(!report.written);
        assert_eq!(report.output, "def f():\n    pass\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_strip_file_missing() {
        let err = strip_file(Path::new("/nonexistent/temp.py"), &StripOptions::default())
            .unwrap_err();
        assert!(matches!(err, HuskError::PathNotFound(_)));
    }
}
