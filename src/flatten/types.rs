use tiktoken_rs::CoreBPE;
use tracing::debug;

pub const TIKTOKEN_METHOD: &str = "tiktoken";
pub const HEURISTIC_METHOD: &str = "approx-heuristic";

/// A repository serialized into a single XML document by the flattening tool.
#[derive(Debug, Clone)]
pub struct Codebase {
    /// Raw XML produced by the tool
    pub xml: String,
    /// Prompt tokens for `xml`
    pub token_count: usize,
    /// How `token_count` was obtained ("tiktoken" or "approx-heuristic")
    pub token_count_method: &'static str,
}

impl Codebase {
    pub fn new(xml: String) -> Self {
        let (token_count, token_count_method) = count_tokens(&xml);
        Self {
            xml,
            token_count,
            token_count_method,
        }
    }
}

/// Count tokens with the o200k_base encoding, then cl100k_base, and only
/// fall back to the character heuristic when neither encoder loads.
pub fn count_tokens(text: &str) -> (usize, &'static str) {
    match load_encoder() {
        Some(bpe) => (bpe.encode_ordinary(text).len(), TIKTOKEN_METHOD),
        None => (estimate_tokens(text), HEURISTIC_METHOD),
    }
}

fn load_encoder() -> Option<CoreBPE> {
    tiktoken_rs::o200k_base()
        .or_else(|err| {
            debug!(error = %err, "o200k_base unavailable, trying cl100k_base");
            tiktoken_rs::cl100k_base()
        })
        .map_err(|err| debug!(error = %err, "no tokenizer available"))
        .ok()
}

/// Rough token estimate: about one token per four characters, never zero.
pub fn estimate_tokens(text: &str) -> usize {
    ((text.chars().count() + 3) / 4).max(1)
}
