/// One analyzed word of a title, name or query fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Index in the token stream, before any filter drops or splits tokens
    pub position: u32,
    /// Byte offset of the word in the analyzed text
    pub offset: usize,
    /// Stopwords stay in the stream so adjacency is preserved, but never
    /// form keywords
    pub stopword: bool,
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize) -> Self {
        Token {
            text,
            position,
            offset,
            stopword: false,
        }
    }

    /// Whether this token may appear in a unigram or bigram
    pub fn is_keyword(&self) -> bool {
        !self.stopword && !self.text.is_empty()
    }
}
