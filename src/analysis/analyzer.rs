use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::alpha::AlphaFilter;
use crate::analysis::filters::casefold::CaseFoldFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::{StopWordFilter, StopWordMode};
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer, WhitespaceTokenizer};

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            filter.apply(&mut tokens);
        }

        tokens
    }

    /// Analyzed tokens joined by single spaces
    pub fn normalize(&self, text: &str) -> String {
        self.analyze(text)
            .into_iter()
            .map(|t| t.text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Distinct unigrams and adjacent bigrams, in order of first
    /// occurrence. N-grams touching a stopword are skipped.
    pub fn ngrams(&self, text: &str) -> (Vec<String>, Vec<String>) {
        let tokens = self.analyze(text);

        let mut unigrams: Vec<String> = Vec::new();
        let mut bigrams: Vec<String> = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            if !token.is_keyword() {
                continue;
            }
            if !unigrams.contains(&token.text) {
                unigrams.push(token.text.clone());
            }
            if let Some(next) = tokens.get(i + 1).filter(|t| t.is_keyword()) {
                let bigram = format!("{} {}", token.text, next.text);
                if !bigrams.contains(&bigram) {
                    bigrams.push(bigram);
                }
            }
        }
        (unigrams, bigrams)
    }

    /// Keyword analyzer shared by the query parser and the shard builder.
    ///
    /// Stopwords stay in the stream (flagged) so n-gram extraction can
    /// tell which words were adjacent in the original text.
    pub fn query_english() -> Self {
        Analyzer::new("query_english".to_string(),
                      Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(StopWordFilter::english_without_letters(StopWordMode::Mark)))
            .add_filter(Box::new(StemmerFilter::english()))
    }

    /// Identity-key analyzer for titles and author names
    pub fn duplicate_english() -> Self {
        Analyzer::new("duplicate_english".to_string(),
                      Box::new(WhitespaceTokenizer))
            .add_filter(Box::new(CaseFoldFilter))
            .add_filter(Box::new(StopWordFilter::english(StopWordMode::Remove)))
            .add_filter(Box::new(AlphaFilter))
            .add_filter(Box::new(StemmerFilter::english()))
    }
}
