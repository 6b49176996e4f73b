//! Compiled query representation handed to the document store

/// Immutable predicate tree built bottom-up by the compiler and consumed
/// once by a backend as a single filtered read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Leaf(Condition),
    /// All children must hold; an empty group always holds
    And(Vec<Predicate>),
    /// At least one child must hold; an empty group never holds
    Or(Vec<Predicate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    MatchAll,
    Text(TextMatch),
}

/// Full-text condition on one top-level field of the stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub field: String,
    pub query: String,
    pub mode: MatchMode,
    /// Text-search configuration from the field mapping, e.g. `english`
    pub analyzer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every term of the query must occur in the field
    Terms,
    /// The query terms must occur adjacently and in order
    Phrase,
}

impl Predicate {
    pub fn match_all() -> Self {
        Predicate::Leaf(Condition::MatchAll)
    }

    pub fn text(field: &str, query: &str, mode: MatchMode, analyzer: Option<String>) -> Self {
        Predicate::Leaf(Condition::Text(TextMatch {
            field: field.to_string(),
            query: query.to_string(),
            mode,
            analyzer,
        }))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Predicate::Leaf(Condition::MatchAll))
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Leaf(_) => 1,
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().map(Predicate::leaf_count).sum()
            }
        }
    }
}
