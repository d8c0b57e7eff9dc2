use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Keeps only ASCII letter runs, splitting a token at every other character
pub struct AlphaFilter;

impl TokenFilter for AlphaFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        let mut result = Vec::with_capacity(tokens.len());
        let mut position = 0u32;

        for token in tokens.drain(..) {
            let mut start: Option<usize> = None;
            for (i, ch) in token.text.char_indices().chain(std::iter::once((token.text.len(), ' '))) {
                match (start, ch.is_ascii_alphabetic()) {
                    (None, true) => start = Some(i),
                    (Some(s), false) => {
                        result.push(Token {
                            text: token.text[s..i].to_string(),
                            position,
                            offset: token.offset + s,
                            stopword: token.stopword,
                        });
                        position += 1;
                        start = None;
                    }
                    _ => {}
                }
            }
        }

        *tokens = result;
    }

    fn name(&self) -> &'static str {
        "alpha"
    }
}
