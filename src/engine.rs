/// Suggestions and validation for editors.
pub mod assist;
/// Calendar arithmetic for temporal conditions.
mod calendar;
/// Works out what each condition means.
mod conditions;
/// The parsed query structure.
pub mod query;
mod rendering;
mod syntax;
mod tenant;


pub use rendering::{Dialect, RenderOptions, SqlQuery, SqlValue, ValueTyping};
pub use syntax::{parse, parse_with_reference, Rule};
pub use tenant::{InvalidTenantColumnError, MissingTenantError, TenantColumn, TenantContext};
pub(crate) use syntax::describe_rule;

use crate::engine::query::ParsedQuery;
use log::info;
use std::ops::Range;

/// Parses `input` and renders it as SQL scoped to `tenant`.
///
/// The tenant is checked before anything else is done: without one, no SQL is produced at all.
pub fn render(
    input: &str,
    tenant: Option<&str>,
    options: &RenderOptions,
) -> Result<SqlQuery, crate::error::Error> {
    let tenant = TenantContext::from_optional(tenant)?;
    let parsed = parse(input)?;
    let query = to_sql(&parsed, &tenant, options)?;

    info!(
        "translated query on {} for tenant {} ({} parameter(s))",
        parsed.table.it,
        tenant,
        query.params.len()
    );

    Ok(query)
}

/// Same as [render], but with the values written into the SQL text. For humans only.
pub fn render_preview(
    input: &str,
    tenant: Option<&str>,
    options: &RenderOptions,
) -> Result<String, crate::error::Error> {
    let tenant = TenantContext::from_optional(tenant)?;
    let parsed = parse(input)?;

    to_preview_sql(&parsed, &tenant, options)
}

pub fn to_sql(
    parsed: &ParsedQuery,
    tenant: &TenantContext,
    options: &RenderOptions,
) -> Result<SqlQuery, crate::error::Error> {
    rendering::render_query(parsed, tenant, options)
}

pub fn to_preview_sql(
    parsed: &ParsedQuery,
    tenant: &TenantContext,
    options: &RenderOptions,
) -> Result<String, crate::error::Error> {
    rendering::render_preview(parsed, tenant, options)
}

#[derive(Debug, Clone, Copy, Eq)]
pub enum Source {
    /// Things like default values are implicit.
    Implicit,
    /// We found this in the input provided by the user.
    Input(Position),
}

impl PartialEq for Source {
    fn eq(&self, _: &Self) -> bool {
        // Doing this makes comparing parsed structures in tests much easier.
        true
    }
}

/// Holds a reference to where we got something from.
///
/// I use this to help print better error messages.
/// ```text
/// ONDE admissao = mes(2)
///                     ^-- Sourced<"2", &input pos 20>
///                     \- I can point to the invalid offset because of Sourced<>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T: Sized + Clone> {
    pub it: T,
    pub source: Source,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl<T: Sized + Clone> Sourced<T> {
    /// Something from the source input the user provided.
    pub fn from_input<P>(position: P, it: T) -> Self
    where
        P: Into<Position>,
    {
        Sourced {
            it,
            source: Source::Input(position.into()),
        }
    }

    /// Something that is implicit, this could be default values, for example.
    pub fn implicit(it: T) -> Self {
        Sourced {
            it,
            source: Source::Implicit,
        }
    }

    pub fn map<D, F>(self, mapper: F) -> Sourced<D>
    where
        F: FnOnce(T) -> D,
        D: Sized + Clone,
    {
        Sourced {
            it: mapper(self.it),
            source: self.source,
        }
    }

    /// Where this was found in the input, if it was found there at all.
    pub fn position(&self) -> Option<Position> {
        match self.source {
            Source::Input(position) => Some(position),
            Source::Implicit => None,
        }
    }
}

impl<T> Copy for Sourced<T> where T: Copy {}

impl From<Range<usize>> for Position {
    fn from(range: Range<usize>) -> Self {
        Position {
            start: range.start,
            end: range.end,
        }
    }
}

#[cfg(test)]
impl PartialEq<Position> for Range<usize> {
    fn eq(&self, other: &Position) -> bool {
        self.start == other.start && self.end == other.end
    }
}
