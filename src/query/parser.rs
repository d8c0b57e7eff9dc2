use std::collections::HashSet;
use regex::Regex;
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::core::config::QueryConfig;
use crate::core::error::Result;
use crate::query::ast::QueryNode;
use crate::query::names::{CapitalizedNameRecognizer, HumanName, NameRecognizer, NoNames};

pub const AND_TOKEN: &str = "<AND>";
pub const OR_TOKEN: &str = "<OR>";
pub const NOT_TOKEN: &str = "<NOT>";

/// Field prefixes a query fragment may carry. Anything else is dropped and
/// the fragment is treated as plain keywords.
pub const ALLOWED_FIELDS: &[&str] = &[
    "title:",
    "year:",
    "publicationdate.year:",
    "doi:",
    "author:",
    "author.familyname:",
    "author.givenname:",
    "author.fullname:",
    "venue:",
    "availablefield:",
];

const FAMILY_NAME: &str = "author.familyname:";
const GIVEN_NAME: &str = "author.givenname:";
const FULL_NAME: &str = "author.fullname:";
const YEAR_FIELD: &str = "publicationdate.year:";

/// Operator splits already applied on the way down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SkipStages(u8);

impl SkipStages {
    const AND: u8 = 1;
    const OR: u8 = 1 << 1;
    const NOT: u8 = 1 << 2;

    fn has(self, stage: u8) -> bool {
        self.0 & stage != 0
    }

    fn with(self, stage: u8) -> Self {
        SkipStages(self.0 | stage)
    }
}

/// Turns free text into a [`QueryNode`] tree.
///
/// Operators bind `<AND>` loosest, then `<OR>`, then `<NOT>`. A fragment
/// without operators becomes, in order of precedence, a person-name
/// disjunction, a DOI leaf, a year leaf (or year range), an
/// `availablefield:` leaf, or the AND of its keyword n-grams.
pub struct QueryParser {
    analyzer: Analyzer,
    names: Box<dyn NameRecognizer>,
    name_coverage: f32,
    field_matcher: Regex,
    doi_matcher: Regex,
    year_matcher: Regex,
}

impl QueryParser {
    pub fn new(config: &QueryConfig) -> Result<Self> {
        let names: Box<dyn NameRecognizer> = if config.detect_names {
            Box::new(CapitalizedNameRecognizer::default())
        } else {
            Box::new(NoNames)
        };
        Self::with_recognizer(config, names)
    }

    pub fn with_recognizer(config: &QueryConfig, names: Box<dyn NameRecognizer>) -> Result<Self> {
        Ok(QueryParser {
            analyzer: Analyzer::query_english(),
            names,
            name_coverage: config.name_coverage,
            field_matcher: Regex::new(r"(?s)^([A-Za-z.]+:)(.*)$")?,
            doi_matcher: Regex::new(r"10\.\d{4,9}/[-._;()/:A-Za-z0-9]+")?,
            year_matcher: Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\.\.((?:19|20)\d{2}))?(?:\D|$)")?,
        })
    }

    pub fn parse(&self, text: &str) -> QueryNode {
        let node = self.parse_fragment(text, SkipStages::default());
        debug!(query = text, tree = %node, "parsed query");
        node
    }

    fn parse_fragment(&self, text: &str, skip: SkipStages) -> QueryNode {
        if !skip.has(SkipStages::AND) {
            let skip = skip.with(SkipStages::AND);
            let parts: Vec<&str> = text.split(AND_TOKEN).collect();
            if parts.len() > 1 {
                let elements = parts.iter()
                    .map(|part| self.parse_fragment(part.trim(), skip))
                    .collect();
                return QueryNode::And(elements).normalize();
            }
        }

        if !skip.has(SkipStages::OR) {
            let skip = skip.with(SkipStages::OR);
            let parts: Vec<&str> = text.split(OR_TOKEN).collect();
            if parts.len() > 1 {
                let elements = parts.iter()
                    .map(|part| self.parse_fragment(part.trim(), skip))
                    .collect();
                return QueryNode::or(elements).normalize();
            }
        }

        if !skip.has(SkipStages::NOT) {
            let skip = skip.with(SkipStages::NOT);
            let parts: Vec<&str> = text.trim().split(NOT_TOKEN).collect();
            if parts.len() > 1 {
                // Anything before the operator is discarded
                let element = self.parse_fragment(parts[1].trim(), skip);
                return QueryNode::not(element).normalize();
            }
        }

        self.parse_terms(text.trim())
    }

    fn split_field<'a>(&self, text: &'a str) -> (String, &'a str) {
        match self.field_matcher.captures(text) {
            Some(caps) => {
                let field = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
                let rest = caps.get(2).map_or("", |m| m.as_str());
                if ALLOWED_FIELDS.contains(&field.as_str()) {
                    (field, rest)
                } else {
                    (String::new(), rest)
                }
            }
            None => (String::new(), text),
        }
    }

    fn parse_terms(&self, text: &str) -> QueryNode {
        let (mut field, value) = self.split_field(text);
        let words: Vec<&str> = value.split_whitespace().collect();

        if field.is_empty() || field == "author:" {
            if let Some(node) = self.parse_person(&words) {
                return node;
            }
            field.clear();
        } else if matches!(field.as_str(), FAMILY_NAME | GIVEN_NAME | FULL_NAME) {
            let name_words: Vec<&str> = words.iter().map(|w| w.trim_end_matches(',')).collect();
            let forward = name_words.join(" ").to_lowercase();
            let reversed = name_words.iter().rev().copied().collect::<Vec<_>>().join(" ").to_lowercase();
            return QueryNode::or(vec![
                QueryNode::leaf(format!("{}{}", field, forward)),
                QueryNode::leaf(format!("{}{}", field, reversed)),
            ]).normalize();
        }

        let joined = words.join(" ");

        if field.is_empty() {
            if let Some(doi) = self.doi_matcher.find(&joined) {
                return QueryNode::leaf(format!("doi:{}", doi.as_str().to_lowercase()));
            }
        } else if field == "doi:" {
            let doi = joined.trim().to_lowercase();
            if doi.is_empty() {
                return QueryNode::match_all();
            }
            return QueryNode::leaf(format!("doi:{}", doi));
        }

        if field.is_empty() || field.contains("year") {
            if let Some(node) = self.parse_year(&joined) {
                return node;
            }
            field.clear();
        }

        if field == "availablefield:" {
            let value = joined.trim().to_lowercase();
            if value.is_empty() {
                return QueryNode::match_all();
            }
            return QueryNode::leaf(format!("{}{}", field, value));
        }

        let elements = self.keyword_ngrams(&joined)
            .into_iter()
            .map(|ngram| QueryNode::leaf(format!("{}{}", field, ngram).to_lowercase()))
            .collect();
        QueryNode::And(elements).normalize()
    }

    /// Three alternatives for a recognized person: full name as written,
    /// full name swapped, and the fragment's keywords. Only the first two
    /// are mandatory.
    fn parse_person(&self, words: &[&str]) -> Option<QueryNode> {
        let potential = words.iter()
            .map(|w| w.trim_end_matches(','))
            .collect::<Vec<_>>()
            .join(" ");
        let span = self.names.find_person(&potential)?;

        let coverage = potential[span.clone()].chars().count() as f32
            / (potential.chars().count() as f32 + 1e-9);
        if coverage <= self.name_coverage {
            return None;
        }

        let name = HumanName::parse(&potential[span]);
        let first = name.first.to_lowercase();
        let last = name.last.to_lowercase();

        let as_written = match (first.is_empty(), last.is_empty()) {
            (false, false) => QueryNode::leaf(format!("{}{} {}", FULL_NAME, first, last)),
            (false, true) => QueryNode::leaf(format!("{}{}", GIVEN_NAME, first)),
            _ => QueryNode::leaf(format!("{}{}", FAMILY_NAME, last)),
        };
        let swapped = match (first.is_empty(), last.is_empty()) {
            (false, false) => QueryNode::leaf(format!("{}{} {}", FULL_NAME, last, first)),
            (false, true) => QueryNode::leaf(format!("{}{}", FAMILY_NAME, first)),
            _ => QueryNode::leaf(format!("{}{}", GIVEN_NAME, last)),
        };
        let keywords = QueryNode::And(self.keyword_ngrams(&potential)
            .into_iter()
            .map(|ngram| QueryNode::leaf(ngram.to_lowercase()))
            .collect()).normalize();

        Some(QueryNode::optional_or(vec![
            QueryNode::And(vec![as_written]),
            QueryNode::And(vec![swapped]),
            keywords,
        ], 1).normalize())
    }

    fn parse_year(&self, text: &str) -> Option<QueryNode> {
        let caps = self.year_matcher.captures(text)?;
        let start: u32 = caps.get(1)?.as_str().parse().ok()?;
        match caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) {
            Some(end) => {
                let elements = (start..=end)
                    .map(|year| QueryNode::leaf(format!("{}{}", YEAR_FIELD, year)))
                    .collect();
                Some(QueryNode::or(elements).normalize())
            }
            None => Some(QueryNode::leaf(format!("{}{}", YEAR_FIELD, start))),
        }
    }

    /// Unigrams and adjacent bigrams of the analyzed text, skipping
    /// stopwords. A unigram whose token already appears in a kept bigram
    /// is dropped. Order is deterministic: bigrams first, each group in
    /// order of first occurrence.
    pub fn keyword_ngrams(&self, text: &str) -> Vec<String> {
        let (unigrams, bigrams) = self.analyzer.ngrams(text);

        let covered: HashSet<&str> = bigrams.iter()
            .flat_map(|bigram| bigram.split(' '))
            .collect();
        let mut kept: Vec<String> = unigrams.iter()
            .filter(|unigram| !covered.contains(unigram.as_str()))
            .cloned()
            .collect();
        kept.splice(0..0, bigrams.iter().cloned());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new(&QueryConfig::default()).unwrap()
    }

    #[test]
    fn keyword_bigram_subsumes_unigrams() {
        assert_eq!(parser().keyword_ngrams("deep learning"), vec!["deep learn"]);
        assert_eq!(parser().keyword_ngrams("graph of models"), vec!["graph", "model"]);
    }

    #[test]
    fn field_prefix_is_case_insensitive() {
        let node = parser().parse("Title:graph");
        assert_eq!(node, QueryNode::And(vec![QueryNode::leaf("title:graph")]));
    }

    #[test]
    fn unknown_field_falls_back_to_keywords() {
        let node = parser().parse("colour:graph");
        assert_eq!(node, QueryNode::And(vec![QueryNode::leaf("graph")]));
    }

    #[test]
    fn year_range_expands() {
        let node = parser().parse("2018..2020");
        assert_eq!(node, QueryNode::or(vec![
            QueryNode::leaf("publicationdate.year:2018"),
            QueryNode::leaf("publicationdate.year:2019"),
            QueryNode::leaf("publicationdate.year:2020"),
        ]));
    }

    #[test]
    fn reversed_year_range_matches_everything() {
        assert!(parser().parse("2020..2018").is_match_all());
    }

    #[test]
    fn year_field_without_year_uses_keywords() {
        let node = parser().parse("year:graph");
        assert_eq!(node, QueryNode::And(vec![QueryNode::leaf("graph")]));
    }

    #[test]
    fn doi_is_lowercased() {
        let node = parser().parse("see 10.1000/ABC.123 please");
        assert_eq!(node, QueryNode::leaf("doi:10.1000/abc.123"));
        assert!(parser().parse("doi: ").is_match_all());
    }

    #[test]
    fn availablefield_keeps_value() {
        assert_eq!(parser().parse("availablefield:FullBody"), QueryNode::leaf("availablefield:fullbody"));
    }

    #[test]
    fn explicit_name_field_tries_both_orders() {
        let node = parser().parse("author.fullname:Smith, John");
        assert_eq!(node, QueryNode::or(vec![
            QueryNode::leaf("author.fullname:smith john"),
            QueryNode::leaf("author.fullname:john smith"),
        ]));
    }

    #[test]
    fn not_discards_left_operand() {
        let node = parser().parse("graph <NOT> model");
        assert_eq!(node, QueryNode::not(QueryNode::And(vec![QueryNode::leaf("model")])));
    }

    #[test]
    fn disabled_name_detection_yields_keywords() {
        let config = QueryConfig { detect_names: false, ..QueryConfig::default() };
        let parser = QueryParser::new(&config).unwrap();
        assert_eq!(parser.parse("Smith John"), QueryNode::And(vec![QueryNode::leaf("smith john")]));
    }

    #[test]
    fn name_coverage_counts_characters() {
        // 10 of 13 characters, but 12 of 15 bytes
        let config = QueryConfig { name_coverage: 0.78, ..QueryConfig::default() };
        let parser = QueryParser::new(&config).unwrap();
        let node = parser.parse("Zoë Brontë xy");
        assert!(!node.terms().iter().any(|t| t.starts_with("author.")), "{:?}", node);

        let node = parser.parse("Zoë Brontë");
        assert!(node.terms().contains(&"author.fullname:zoë brontë"), "{:?}", node);
    }
}
