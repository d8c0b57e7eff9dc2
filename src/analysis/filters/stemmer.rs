use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Snowball stemming of keyword tokens. Stopwords and tokens holding a
/// digit keep their text.
pub struct StemmerFilter {
    stemmer: Stemmer,
}

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter { stemmer: Stemmer::create(algorithm) }
    }

    pub fn english() -> Self {
        Self::new(Algorithm::English)
    }
}

impl TokenFilter for StemmerFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        for token in tokens.iter_mut() {
            if !token.is_keyword() || token.text.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            let stem = self.stemmer.stem(&token.text);
            if stem != token.text {
                token.text = stem.into_owned();
            }
        }
    }

    fn name(&self) -> &'static str {
        "stemmer"
    }
}
