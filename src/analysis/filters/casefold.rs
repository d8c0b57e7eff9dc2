use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Lowercases tokens that carry an uppercase letter; others are untouched
pub struct CaseFoldFilter;

impl TokenFilter for CaseFoldFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        for token in tokens.iter_mut().filter(|t| t.text.chars().any(char::is_uppercase)) {
            token.text = token.text.to_lowercase();
        }
    }

    fn name(&self) -> &'static str {
        "casefold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_names_and_acronyms() {
        let mut tokens = vec![
            Token::new("LSTM".to_string(), 0, 0),
            Token::new("Brontë".to_string(), 1, 5),
            Token::new("kernel".to_string(), 2, 13),
        ];
        CaseFoldFilter.apply(&mut tokens);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["lstm", "brontë", "kernel"]);
        assert_eq!(tokens[1].offset, 5);
    }
}
