//! Query model shared by browse and search: predicates, paging and text search
//!
//! Repositories render a [`Criteria`] into SQL through one routine used by both
//! the count and the page query, so pagination metadata always agrees with the
//! returned rows.

pub mod criteria;
pub mod search;

pub use criteria::{ColumnMap, Criteria, Field, FieldSource, PageRequest, Predicate, SortOrder};
pub use search::SearchQuery;
