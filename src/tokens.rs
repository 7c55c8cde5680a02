//! Token counting for LLM context budgets.
//!
//! Uses tiktoken-rs for OpenAI-compatible counts, falling back to a
//! character heuristic when a tokenizer cannot be loaded.

use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

/// Token encoding to use for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// cl100k_base: GPT-4, GPT-3.5-turbo
    #[default]
    Cl100kBase,
    /// o200k_base: GPT-4o
    O200kBase,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Cl100kBase => write!(f, "cl100k_base"),
            Encoding::O200kBase => write!(f, "o200k_base"),
        }
    }
}

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn tokenizer(encoding: Encoding) -> Option<&'static CoreBPE> {
    match encoding {
        Encoding::Cl100kBase => CL100K
            .get_or_init(|| tiktoken_rs::cl100k_base().ok())
            .as_ref(),
        Encoding::O200kBase => O200K
            .get_or_init(|| tiktoken_rs::o200k_base().ok())
            .as_ref(),
    }
}

/// Roughly four characters per token.
fn fallback_count(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Count tokens in `text` with the default encoding.
///
/// ```
/// use husk::tokens::count_tokens;
///
/// assert!(count_tokens("def f(x):\n    pass\n") > 0);
/// ```
pub fn count_tokens(text: &str) -> usize {
    count_tokens_with_encoding(text, Encoding::default())
}

/// Count tokens in `text`. Never fails.
pub fn count_tokens_with_encoding(text: &str, encoding: Encoding) -> usize {
    tokenizer(encoding)
        .map(|bpe| bpe.encode_ordinary(text).len())
        .unwrap_or_else(|| fallback_count(text))
}
