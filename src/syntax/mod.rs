//! Python syntax tree used by the signature extractor.
//!
//! Source text is parsed with tree-sitter and lowered into an owned,
//! tagged-variant tree. Only the shapes the stripping passes care about are
//! modelled structurally (definitions, docstrings, compound statements);
//! every other statement keeps its source text with comments removed.

mod lower;
mod print;

use std::borrow::Cow;
use std::cell::RefCell;

use smallvec::SmallVec;
use thiserror::Error;
use tree_sitter::{Node, Parser};

pub use print::unparse;

// Thread-local parser caching to avoid re-initialization overhead.
thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn init_python_parser() -> Result<Parser, ParseError> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|_| ParseError::ParserInit)?;
    Ok(p)
}

/// Execute a function with the cached Python parser.
fn with_python_parser<F, R>(f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut Parser) -> Result<R, ParseError>,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(init_python_parser()?);
        }

        let parser = slot.as_mut().ok_or(ParseError::ParserInit)?;
        f(parser)
    })
}

/// Errors raised while turning source text into a [`Module`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("failed to initialize python parser")]
    ParserInit,

    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("invalid syntax at line {line}, column {column}: {message}")]
    InvalidSyntax {
        /// 1-indexed line.
        line: usize,
        /// 1-indexed column.
        column: usize,
        message: String,
    },
}

/// A parsed source unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `def` or `async def`, with its decorators.
    FunctionDef(FunctionDef),
    /// `class`, with its decorators.
    ClassDef(ClassDef),
    /// if/for/while/try/with/match and their clauses.
    Compound(Compound),
    /// A bare expression statement.
    Expr(Expr),
    /// `pass`
    Pass,
    /// Any other simple statement, kept as source text.
    Other(String),
}

impl Stmt {
    /// Whether this statement is a docstring candidate: an expression
    /// statement holding a plain text literal.
    pub fn is_docstring(&self) -> bool {
        matches!(self, Stmt::Expr(Expr::Str(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Decorator lines, each including the leading `@`.
    pub decorators: Vec<String>,
    pub is_async: bool,
    pub name: String,
    /// Everything from `def`/`async` up to (not including) the final colon.
    pub signature: String,
    pub body: Vec<Stmt>,
}

impl FunctionDef {
    /// Replace the body with a single `pass`.
    pub fn stubbed(self) -> Self {
        Self {
            body: vec![Stmt::Pass],
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub decorators: Vec<String>,
    pub name: String,
    /// Everything from `class` up to (not including) the final colon.
    pub header: String,
    pub body: Vec<Stmt>,
}

/// A compound statement as an ordered list of clauses, e.g. `if`, `elif`,
/// `else`, or `try`, `except`, `finally`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    pub clauses: SmallVec<[Clause; 2]>,
}

/// One `header:` line and the block it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub header: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A text literal (plain or implicitly concatenated string).
    Str(String),
    Other(String),
}

impl Expr {
    pub fn text(&self) -> &str {
        match self {
            Expr::Str(text) | Expr::Other(text) => text,
        }
    }
}

/// Parse Python source into a [`Module`].
///
/// Comments are discarded and `\r\n` line endings become `\n`. Any syntax
/// error, including a missing token the parser had to invent, is reported
/// as [`ParseError::InvalidSyntax`]. So are the Python 2 forms the grammar
/// still accepts: `print` and `exec` statements and backtick expressions.
///
/// # Examples
///
/// ```
/// use husk::syntax::{parse, Stmt};
///
/// let module = parse("def f(x):\n    return x\n").unwrap();
/// assert!(matches!(module.body[0], Stmt::FunctionDef(_)));
/// ```
pub fn parse(source: &str) -> Result<Module, ParseError> {
    let source = normalize_newlines(source);
    let source = source.as_ref();

    with_python_parser(|parser| {
        let tree = parser.parse(source, None).ok_or(ParseError::NoTree)?;
        let root = tree.root_node();

        if root.has_error() {
            return Err(syntax_error(root, source));
        }
        if let Some(err) = python2_syntax(root, source) {
            return Err(err);
        }

        Ok(lower::lower_module(root, source))
    })
}

fn normalize_newlines(source: &str) -> Cow<'_, str> {
    if source.contains("\r\n") {
        Cow::Owned(source.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Find the first Python 2 construct tree-sitter accepts but Python 3
/// rejects.
fn python2_syntax(root: Node, source: &str) -> Option<ParseError> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        let message = match node.kind() {
            "print_statement" => Some("Python 2 print statement"),
            "exec_statement" => Some("Python 2 exec statement"),
            // The scanner lexes backtick repr as a string with a backtick delimiter.
            "string_start" if source[node.byte_range()].ends_with('`') => {
                Some("backtick expression")
            }
            _ => None,
        };
        if let Some(message) = message {
            let position = node.start_position();
            return Some(ParseError::InvalidSyntax {
                line: position.row + 1,
                column: position.column + 1,
                message: message.to_string(),
            });
        }

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// Locate the first ERROR or MISSING node and describe it.
fn syntax_error(root: Node, source: &str) -> ParseError {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let position = node.start_position();
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                let snippet: String = source[node.byte_range()]
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .chars()
                    .take(24)
                    .collect();
                format!("unexpected `{}`", snippet.trim())
            };
            return ParseError::InvalidSyntax {
                line: position.row + 1,
                column: position.column + 1,
                message,
            };
        }

        // Only descend into subtrees that actually contain the error.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                let position = root.start_position();
                return ParseError::InvalidSyntax {
                    line: position.row + 1,
                    column: position.column + 1,
                    message: "invalid syntax".to_string(),
                };
            }
        }
    }
}
