use std::ops::Range;
use crate::analysis::filters::stopword::ENGLISH_STOPWORDS;

/// Common research vocabulary. A capitalized run containing one of these
/// is read as a topic ("Graph Neural Networks"), not as a person.
pub const TOPIC_WORDS: &[&str] = &[
    "adaptive", "algorithm", "algorithms", "analysis", "applications", "approach",
    "artificial", "attention", "bayesian", "biology", "brain", "cancer", "cell",
    "cells", "chemistry", "classification", "climate", "clinical", "clustering",
    "computer", "computing", "control", "convolutional", "data", "deep", "design",
    "detection", "diffusion", "disease", "distributed", "dynamics", "economics",
    "efficient", "energy", "estimation", "evolution", "experimental", "gene",
    "generative", "genetic", "graph", "graphs", "health", "image", "images",
    "inference", "information", "intelligence", "kernel", "language", "large",
    "learning", "linear", "machine", "machines", "map", "markov", "matrix",
    "medical", "memory", "method", "methods", "model", "models", "molecular",
    "network", "networks", "neural", "nonlinear", "optimization", "physics",
    "prediction", "probabilistic", "protein", "proteins", "quantum", "random",
    "recognition", "regression", "reinforcement", "representation", "retrieval",
    "robust", "search", "segmentation", "semantic", "sequence", "signal",
    "social", "sparse", "statistical", "stochastic", "structure", "study",
    "survey", "system", "systems", "theory", "transformer", "transformers",
    "tumor", "vector", "vision",
];

/// Finds a person name inside a query fragment.
///
/// Returns the byte span of the first recognized name.
pub trait NameRecognizer: Send + Sync {
    fn find_person(&self, text: &str) -> Option<Range<usize>>;
}

/// Never recognizes a name
pub struct NoNames;

impl NameRecognizer for NoNames {
    fn find_person(&self, _text: &str) -> Option<Range<usize>> {
        None
    }
}

/// Recognizes runs of capitalized words or initials ("John Smith",
/// "J. R. Tolkien"). Single words and words from [`TOPIC_WORDS`] are never
/// treated as names.
pub struct CapitalizedNameRecognizer {
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for CapitalizedNameRecognizer {
    fn default() -> Self {
        CapitalizedNameRecognizer {
            min_words: 2,
            max_words: 4,
        }
    }
}

impl CapitalizedNameRecognizer {
    fn is_name_word(word: &str) -> bool {
        let lower = word.to_lowercase();
        if ENGLISH_STOPWORDS.contains(&lower.as_str()) && word.chars().count() > 1 {
            return false;
        }
        if TOPIC_WORDS.contains(&lower.as_str()) {
            return false;
        }
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !first.is_uppercase() {
            return false;
        }
        let rest: Vec<char> = chars.collect();
        match rest.as_slice() {
            [] | ['.'] => true,  // initial
            rest => rest.iter().all(|c| c.is_lowercase() || *c == '\'' || *c == '-'),
        }
    }
}

impl NameRecognizer for CapitalizedNameRecognizer {
    fn find_person(&self, text: &str) -> Option<Range<usize>> {
        let words: Vec<(usize, &str)> = text.split_whitespace()
            .map(|w| (w.as_ptr() as usize - text.as_ptr() as usize, w))
            .collect();

        let mut i = 0;
        while i < words.len() {
            if !Self::is_name_word(words[i].1) {
                i += 1;
                continue;
            }
            let mut j = i;
            while j < words.len() && Self::is_name_word(words[j].1) {
                j += 1;
            }
            let run = j - i;
            if run >= self.min_words && run <= self.max_words {
                let start = words[i].0;
                let (last_offset, last_word) = words[j - 1];
                return Some(start..last_offset + last_word.len());
            }
            i = j;
        }
        None
    }
}

/// First and last name of a recognized person span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanName {
    pub first: String,
    pub last: String,
}

impl HumanName {
    /// `"Last, First"` is split at the comma. Otherwise the first word is
    /// the given name and the last word the family name; middle names are
    /// ignored.
    pub fn parse(span: &str) -> Self {
        if let Some((last, first)) = span.split_once(',') {
            let first = first.split_whitespace().next().unwrap_or("");
            return HumanName { first: first.to_string(), last: last.trim().to_string() };
        }
        let words: Vec<&str> = span.split_whitespace().collect();
        match words.as_slice() {
            [] => HumanName { first: String::new(), last: String::new() },
            [only] => HumanName { first: only.to_string(), last: String::new() },
            [first, .., last] => HumanName { first: first.to_string(), last: last.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_two_capitalized_words() {
        let recognizer = CapitalizedNameRecognizer::default();
        assert_eq!(recognizer.find_person("Smith John"), Some(0..10));
        assert_eq!(recognizer.find_person("J. Smith"), Some(0..8));
    }

    #[test]
    fn rejects_lowercase_and_single_words() {
        let recognizer = CapitalizedNameRecognizer::default();
        assert_eq!(recognizer.find_person("deep learning"), None);
        assert_eq!(recognizer.find_person("Transformers"), None);
        assert_eq!(recognizer.find_person("The Transformer"), None);
    }

    #[test]
    fn title_case_topics_are_not_names() {
        let recognizer = CapitalizedNameRecognizer::default();
        assert_eq!(recognizer.find_person("Graph Neural Networks"), None);
        assert_eq!(recognizer.find_person("Deep Learning"), None);
        assert_eq!(recognizer.find_person("Protein Design by Alice Walker"), Some(18..30));
    }

    #[test]
    fn reports_partial_span() {
        let recognizer = CapitalizedNameRecognizer::default();
        assert_eq!(recognizer.find_person("papers by Geoffrey Hinton"), Some(10..25));
    }

    #[test]
    fn parses_first_and_last() {
        assert_eq!(HumanName::parse("John Ronald Tolkien"), HumanName { first: "John".into(), last: "Tolkien".into() });
        assert_eq!(HumanName::parse("Plato").last, "");
        assert_eq!(HumanName::parse("Tolkien, John Ronald"), HumanName { first: "John".into(), last: "Tolkien".into() });
    }
}
