//! Free-text search terms

use super::criteria::{Field, Predicate};
use crate::error::{AppError, Result};
use std::collections::HashSet;

lazy_static::lazy_static! {
    /// English stop words, never indexable on their own
    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
        "into", "is", "it", "no", "not", "of", "on", "or", "such", "that", "the",
        "their", "then", "there", "these", "they", "this", "to", "was", "will", "with",
    ]
    .into_iter()
    .collect();
}

/// A parsed search string: lowercase, de-duplicated, stop words removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    terms: Vec<String>,
}

impl SearchQuery {
    /// Parse a raw `q` parameter. Fails when nothing indexable remains.
    pub fn parse(text: &str) -> Result<Self> {
        let mut seen = HashSet::new();
        let terms: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|term| !term.is_empty() && !STOP_WORDS.contains(term))
            .filter(|term| seen.insert(term.to_string()))
            .map(str::to_string)
            .collect();

        if terms.is_empty() {
            return Err(AppError::BadRequest(
                "Search query must contain at least one searchable term".to_string(),
            ));
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Predicate matching any term against any of the indexed fields
    pub fn into_predicate(self, fields: &[Field]) -> Predicate {
        Predicate::Matches {
            fields: fields.to_vec(),
            terms: self.terms,
        }
    }
}
