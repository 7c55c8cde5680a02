//! Husk - prepare source code as context for LLMs.
//!
//! Husk has two jobs:
//!
//! - strip a Python file down to its signatures, removing comments,
//!   docstrings and function bodies ([`strip`]);
//! - flatten a directory tree into one labeled text artifact
//!   ([`flatten`]).
//!
//! # Quick Start
//!
//! ```
//! use husk::strip::transform;
//!
//! let source = r#"
//! class Greeter:
//!     """Says hello."""
//!
//!     def greet(self, name: str) -> str:
//!         return f"Hello, {name}"
//! "#;
//!
//! let stripped = transform(source).unwrap();
//! assert_eq!(
//!     stripped,
//!     "class Greeter:\n    def greet(self, name: str) -> str:\n        pass\n"
//! );
//! ```
//!
//! # Modules
//!
//! - [`syntax`] - Python syntax tree, parsing and serialization
//! - [`strip`] - Docstring and body stripping passes
//! - [`filter`] - Inclusion policy for flattening
//! - [`walker`] - Directory traversal
//! - [`flatten`] - Labeled text artifact builder
//! - [`tokens`] - Token counting for LLM context budgets

pub mod errors;
pub mod filter;
pub mod flatten;
pub mod strip;
pub mod syntax;
pub mod tokens;
pub mod walker;

// Re-export key types at crate root for convenience
pub use errors::HuskError;
pub use filter::{FilterError, InclusionPolicy};
pub use flatten::{Flattened, Flattener, Section};
pub use strip::{strip_file, transform, StripOptions, StripReport};
pub use syntax::{Module, ParseError, Stmt};
pub use tokens::{count_tokens, Encoding};
pub use walker::{WalkError, WalkOptions};
