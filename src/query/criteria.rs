//! Filter predicates and paging

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, QueryBuilder};
use std::cmp::Ordering;

/// Logical entity attributes that can be filtered, searched or sorted on.
///
/// Each repository maps the fields it supports onto concrete columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Owner,
    Application,
    Client,
    User,
    Identity,
    Role,
    Type,
    Name,
    Description,
    Email,
    RemoteId,
    ClientName,
    CreatedDate,
    ModifiedDate,
    IssuedAt,
}

impl Field {
    /// Name used in `sort` query parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Owner => "owner",
            Field::Application => "application",
            Field::Client => "client",
            Field::User => "user",
            Field::Identity => "identity",
            Field::Role => "role",
            Field::Type => "type",
            Field::Name => "name",
            Field::Description => "description",
            Field::Email => "email",
            Field::RemoteId => "remote_id",
            Field::ClientName => "client_name",
            Field::CreatedDate => "created_date",
            Field::ModifiedDate => "modified_date",
            Field::IssuedAt => "issued_at",
        }
    }
}

/// Maps a logical field onto a SQL column expression for one table.
pub type ColumnMap = fn(Field) -> Option<&'static str>;

/// A single condition on an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `field = value`
    Equals(Field, String),
    /// Any term is a case-insensitive substring of any of the fields.
    Matches { fields: Vec<Field>, terms: Vec<String> },
}

/// Conjunction of predicates applied identically to count and page queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    predicates: Vec<Predicate>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Add `field = value`
    pub fn equals(mut self, field: Field, value: impl ToString) -> Self {
        self.push(Predicate::Equals(field, value.to_string()));
        self
    }

    /// Add `field = value` when a value is present
    pub fn equals_opt<V: ToString>(self, field: Field, value: Option<V>) -> Self {
        match value {
            Some(value) => self.equals(field, value),
            None => self,
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render the predicates as a `WHERE` clause.
    pub fn push_where<'args>(
        &self,
        qb: &mut QueryBuilder<'args, MySql>,
        columns: ColumnMap,
    ) -> Result<()> {
        for (index, predicate) in self.predicates.iter().enumerate() {
            qb.push(if index == 0 { " WHERE " } else { " AND " });
            match predicate {
                Predicate::Equals(field, value) => {
                    qb.push(column(columns, *field)?)
                        .push(" = ")
                        .push_bind(value.clone());
                }
                Predicate::Matches { fields, terms } => {
                    if fields.is_empty() || terms.is_empty() {
                        qb.push("1 = 0");
                        continue;
                    }
                    qb.push("(");
                    let mut first = true;
                    for term in terms {
                        for field in fields {
                            if !first {
                                qb.push(" OR ");
                            }
                            first = false;
                            qb.push("LOWER(")
                                .push(column(columns, *field)?)
                                .push(") LIKE ")
                                .push_bind(format!("%{}%", term));
                        }
                    }
                    qb.push(")");
                }
            }
        }
        Ok(())
    }

    /// Evaluate the predicates against an in-memory entity.
    pub fn matches<T: FieldSource>(&self, entity: &T) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Equals(field, value) => {
                entity.field_value(*field).as_deref() == Some(value.as_str())
            }
            Predicate::Matches { fields, terms } => fields.iter().any(|field| {
                entity
                    .field_value(*field)
                    .map(|text| {
                        let text = text.to_lowercase();
                        terms.iter().any(|term| text.contains(term.as_str()))
                    })
                    .unwrap_or(false)
            }),
        })
    }
}

fn column(columns: ColumnMap, field: Field) -> Result<&'static str> {
    columns(field).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "Field '{}' is not mapped for this table",
            field.as_str()
        ))
    })
}

/// Exposes entity attributes by logical field, for in-memory evaluation.
pub trait FieldSource {
    fn field_value(&self, field: Field) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Lenient parse: anything but "desc" sorts ascending
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Window and ordering of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
    pub sort: Field,
    pub order: SortOrder,
}

impl PageRequest {
    /// Build a page request, validating `sort` against an allow-list.
    ///
    /// An unknown sort field silently falls back to the first allowed field.
    pub fn new(
        offset: i64,
        limit: i64,
        sort: Option<&str>,
        order: SortOrder,
        allowed_sorts: &[Field],
    ) -> Self {
        let default_sort = allowed_sorts.first().copied().unwrap_or(Field::CreatedDate);
        let sort = sort
            .and_then(|name| {
                allowed_sorts
                    .iter()
                    .copied()
                    .find(|field| field.as_str().eq_ignore_ascii_case(name.trim()))
            })
            .unwrap_or(default_sort);
        Self {
            offset,
            limit,
            sort,
            order,
        }
    }

    /// Render `ORDER BY ... LIMIT ... OFFSET ...`. The id is a tiebreaker for stable pages.
    pub fn push_order_and_window<'args>(
        &self,
        qb: &mut QueryBuilder<'args, MySql>,
        columns: ColumnMap,
    ) -> Result<()> {
        qb.push(" ORDER BY ")
            .push(column(columns, self.sort)?)
            .push(" ")
            .push(self.order.as_sql())
            .push(", ")
            .push(column(columns, Field::Id)?)
            .push(" ASC LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.offset);
        Ok(())
    }

    /// Sort and window an in-memory result set the way the SQL renderer does.
    pub fn apply<T: FieldSource>(&self, mut items: Vec<T>) -> Vec<T> {
        items.sort_by(|a, b| {
            let ordering = a.field_value(self.sort).cmp(&b.field_value(self.sort));
            let ordering = match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            match ordering {
                Ordering::Equal => a.field_value(Field::Id).cmp(&b.field_value(Field::Id)),
                other => other,
            }
        });
        items
            .into_iter()
            .skip(self.offset.max(0) as usize)
            .take(self.limit.max(0) as usize)
            .collect()
    }
}
