//! Character Vocabulary - URL tokenization for the sequence encoder
//!
//! Fixed vocabulary over the URL-safe character set. Tokenization is
//! bounded: sequences longer than the configured width keep their prefix
//! (scheme and host carry the highest-signal characters), shorter ones
//! are zero-padded.

use crate::logic::features::MalformedInputError;

// ============================================================================
// VOCABULARY
// ============================================================================

/// Padding index (also the embedding row for padding)
pub const PAD: usize = 0;

/// Index for characters outside the vocabulary
pub const UNK: usize = 1;

/// Characters with dedicated embedding rows, in index order starting at 2.
/// Uppercase input is folded to lowercase before lookup.
const CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789-._~:/?#[]@!$&'()*+,;=%";

/// Total vocabulary size (charset + PAD + UNK)
pub const VOCAB_SIZE: usize = 61;

/// Map one character to its vocabulary index
fn char_index(c: char) -> usize {
    let folded = c.to_ascii_lowercase();
    CHARSET.find(folded).map(|i| i + 2).unwrap_or(UNK)
}

// ============================================================================
// TOKENIZATION
// ============================================================================

/// Tokenize a URL into a fixed-width index sequence
///
/// Truncation keeps the prefix; padding uses `PAD`. Fails only when the
/// input is empty after trimming.
pub fn tokenize(url: &str, max_len: usize) -> Result<Vec<usize>, MalformedInputError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(MalformedInputError::new("empty character sequence"));
    }

    let mut tokens: Vec<usize> = trimmed.chars().take(max_len).map(char_index).collect();
    tokens.resize(max_len, PAD);

    Ok(tokens)
}

// ============================================================================
// TESTS
// ============================================================================
