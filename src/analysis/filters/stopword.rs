use std::collections::HashSet;
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// English stopwords (NLTK list)
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're",
    "you've", "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his",
    "himself", "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself",
    "they", "them", "their", "theirs", "themselves", "what", "which", "who", "whom", "this",
    "that", "that'll", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing",
    "a", "an", "the", "and", "but", "if", "or", "because", "as", "until",
    "while", "of", "at", "by", "for", "with", "about", "against", "between", "into",
    "through", "during", "before", "after", "above", "below", "to", "from", "up", "down",
    "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each",
    "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "don't", "should", "should've", "now", "d", "ll", "m", "o",
    "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn", "didn't",
    "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn", "isn't",
    "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't", "shouldn",
    "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn", "wouldn't",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopWordMode {
    Remove,
    Mark,   // keep the token, set `Token::stopword`
}

pub struct StopWordFilter {
    pub stop_words: HashSet<String>,
    pub mode: StopWordMode,
}

impl StopWordFilter {
    pub fn new(stop_words: Vec<String>, mode: StopWordMode) -> Self {
        StopWordFilter {
            stop_words: stop_words.into_iter().collect(),
            mode,
        }
    }

    pub fn english(mode: StopWordMode) -> Self {
        let words = ENGLISH_STOPWORDS.iter().map(|w| w.to_string()).collect();
        StopWordFilter::new(words, mode)
    }

    /// English list without single letters, so initials survive as keywords
    pub fn english_without_letters(mode: StopWordMode) -> Self {
        let words = ENGLISH_STOPWORDS.iter()
            .filter(|w| w.chars().count() > 1)
            .map(|w| w.to_string())
            .collect();
        StopWordFilter::new(words, mode)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}

impl TokenFilter for StopWordFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        match self.mode {
            StopWordMode::Remove => tokens.retain(|token| !self.stop_words.contains(&token.text)),
            StopWordMode::Mark => {
                for token in tokens.iter_mut() {
                    token.stopword = self.stop_words.contains(&token.text);
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "stop_words"
    }
}
