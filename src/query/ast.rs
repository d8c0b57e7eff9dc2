use std::fmt;
use serde::{Serialize, Deserialize};

/// Boolean expression over index terms.
///
/// A `Leaf` holds exactly one term; the empty term matches every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryNode {
    Leaf(String),
    And(Vec<QueryNode>),
    /// Children `0..=optional_after_pos` are mandatory; the rest are only
    /// consulted when the mandatory ones match nothing. `None` = all mandatory.
    Or {
        elements: Vec<QueryNode>,
        optional_after_pos: Option<usize>,
    },
    Not(Box<QueryNode>),
}

impl QueryNode {
    pub fn match_all() -> Self {
        QueryNode::Leaf(String::new())
    }

    pub fn leaf(term: impl Into<String>) -> Self {
        QueryNode::Leaf(term.into())
    }

    pub fn or(elements: Vec<QueryNode>) -> Self {
        QueryNode::Or { elements, optional_after_pos: None }
    }

    pub fn optional_or(elements: Vec<QueryNode>, optional_after_pos: usize) -> Self {
        QueryNode::Or { elements, optional_after_pos: Some(optional_after_pos) }
    }

    pub fn not(element: QueryNode) -> Self {
        QueryNode::Not(Box::new(element))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, QueryNode::Leaf(term) if term.is_empty())
    }

    /// Trim leaf terms, drop empty-term leaves from operator nodes and
    /// collapse an operator left without children to the match-all leaf.
    /// Only this node and its direct children are touched.
    pub fn normalize(self) -> Self {
        match self {
            QueryNode::Leaf(term) => QueryNode::Leaf(term.trim().to_string()),
            QueryNode::And(elements) => {
                let elements = Self::drop_empty(elements);
                if elements.is_empty() {
                    QueryNode::match_all()
                } else {
                    QueryNode::And(elements)
                }
            }
            QueryNode::Or { elements, optional_after_pos } => {
                let elements = Self::drop_empty(elements);
                if elements.is_empty() {
                    QueryNode::match_all()
                } else {
                    QueryNode::Or { elements, optional_after_pos }
                }
            }
            QueryNode::Not(element) => {
                if element.is_match_all() {
                    QueryNode::match_all()
                } else {
                    QueryNode::Not(element)
                }
            }
        }
    }

    fn drop_empty(elements: Vec<QueryNode>) -> Vec<QueryNode> {
        elements.into_iter()
            .map(|e| match e {
                QueryNode::Leaf(term) => QueryNode::Leaf(term.trim().to_string()),
                other => other,
            })
            .filter(|e| !e.is_match_all())
            .collect()
    }

    /// Every non-empty leaf term, depth first
    pub fn terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryNode::Leaf(term) if !term.is_empty() => out.push(term),
            QueryNode::Leaf(_) => {}
            QueryNode::And(elements) | QueryNode::Or { elements, .. } => {
                for e in elements {
                    e.collect_terms(out);
                }
            }
            QueryNode::Not(element) => element.collect_terms(out),
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryNode::Leaf(term) => write!(f, "{:?}", term),
            QueryNode::And(elements) => write_group(f, "AND", elements, None),
            QueryNode::Or { elements, optional_after_pos } => write_group(f, "OR", elements, *optional_after_pos),
            QueryNode::Not(element) => write!(f, "NOT({})", element),
        }
    }
}

fn write_group(f: &mut fmt::Formatter, op: &str, elements: &[QueryNode], optional: Option<usize>) -> fmt::Result {
    write!(f, "{}", op)?;
    if let Some(pos) = optional {
        write!(f, "@{}", pos)?;
    }
    write!(f, "(")?;
    for (i, e) in elements.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", e)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_empty_children() {
        let node = QueryNode::And(vec![QueryNode::leaf(" deep "), QueryNode::match_all()]).normalize();
        assert_eq!(node, QueryNode::And(vec![QueryNode::leaf("deep")]));
    }

    #[test]
    fn normalize_collapses_empty_operator() {
        let node = QueryNode::or(vec![QueryNode::leaf("  "), QueryNode::match_all()]).normalize();
        assert!(node.is_match_all());
        assert!(QueryNode::not(QueryNode::match_all()).normalize().is_match_all());
    }

    #[test]
    fn display_shows_optional_split() {
        let node = QueryNode::optional_or(vec![QueryNode::leaf("a"), QueryNode::leaf("b")], 0);
        assert_eq!(node.to_string(), r#"OR@0("a", "b")"#);
    }
}
