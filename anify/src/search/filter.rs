//! Filter expressions for the primary index
//!
//! Filters are built as a small AST and rendered in one place, so user
//! supplied values are always quoted and escaped where needed instead of
//! being pasted into the expression.
//!
//! A request produces up to five groups, always in this order:
//!
//! ```text
//! (format = TV OR format = OVA) AND (genres = Action) AND NOT (genres = Horror)
//!     AND (tags = Isekai) AND NOT (tags = Gore)
//! ```
//!
//! The format group has no connective. Every later group is emitted with a
//! leading ` AND `, including when no format group precedes it.

use std::fmt;

use super::types::SearchParams;

/// Filterable attribute of the media index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Format,
    Genres,
    Tags,
}

impl FilterField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Genres => "genres",
            Self::Tags => "tags",
        }
    }
}

/// Filter abstract syntax tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// `field = value`
    Eq { field: FilterField, value: String },
    /// `(a OR b ...)`
    Or(Vec<FilterExpr>),
    /// `a AND b ...`
    And(Vec<FilterExpr>),
    /// `NOT a`
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn field_eq(field: FilterField, value: impl Into<String>) -> Self {
        FilterExpr::Eq {
            field,
            value: value.into(),
        }
    }

    /// `(field = v1 OR field = v2 ...)`, or `None` for no values
    pub fn any_of(field: FilterField, values: &[String]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(FilterExpr::Or(
            values.iter().map(|v| Self::field_eq(field, v.as_str())).collect(),
        ))
    }

    pub fn negate(self) -> Self {
        FilterExpr::Not(Box::new(self))
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Eq { field, value } => {
                write!(f, "{} = ", field.as_str())?;
                write_value(f, value)
            }
            FilterExpr::Or(nodes) => {
                f.write_str("(")?;
                write_joined(f, nodes, " OR ")?;
                f.write_str(")")
            }
            FilterExpr::And(nodes) => write_joined(f, nodes, " AND "),
            FilterExpr::Not(node) => write!(f, "NOT {}", node),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[FilterExpr], sep: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

/// Words the filter parser treats as operators
const KEYWORDS: &[&str] = &[
    "AND", "OR", "NOT", "TO", "IN", "EXISTS", "IS", "NULL", "EMPTY", "CONTAINS", "STARTS",
    "WITH",
];

/// Plain identifiers (`TV`, `Action`, `TV_SHORT`) are written bare; keywords
/// and anything else are double-quoted with `\` and `"` escaped.
fn write_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    let bare = !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(value));
    if bare {
        return f.write_str(value);
    }

    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

/// Filter for one search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    /// `And` of every non-empty group
    groups: FilterExpr,
    /// No format group: the first refinement still carries its ` AND `
    dangling_and: bool,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            groups: FilterExpr::And(Vec::new()),
            dangling_and: false,
        }
    }
}

impl SearchFilter {
    pub fn from_params(params: &SearchParams) -> Self {
        let formats = FilterExpr::any_of(FilterField::Format, &params.formats);
        let refinements: Vec<FilterExpr> = [
            FilterExpr::any_of(FilterField::Genres, &params.genres),
            FilterExpr::any_of(FilterField::Genres, &params.genres_excluded)
                .map(FilterExpr::negate),
            FilterExpr::any_of(FilterField::Tags, &params.tags),
            FilterExpr::any_of(FilterField::Tags, &params.tags_excluded).map(FilterExpr::negate),
        ]
        .into_iter()
        .flatten()
        .collect();

        let dangling_and = formats.is_none() && !refinements.is_empty();
        let groups = formats.into_iter().chain(refinements).collect();

        Self {
            groups: FilterExpr::And(groups),
            dangling_and,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.groups, FilterExpr::And(nodes) if nodes.is_empty())
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dangling_and {
            f.write_str(" AND ")?;
        }
        write!(f, "{}", self.groups)
    }
}
