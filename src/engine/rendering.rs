pub use params::SqlValue;

use crate::engine::query::ParsedQuery;
use crate::engine::tenant::{TenantColumn, TenantContext};
use params::Binder;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

mod params;
mod query_rendering;

/// Decides how placeholders look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `$1, $2, ...`
    #[default]
    Postgres,
    /// `?, ?, ...`
    #[serde(rename = "mariadb", alias = "mysql")]
    MariaDb,
}

/// Decides how literal values get bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTyping {
    /// Everything is bound as text, the database casts it if it needs to.
    #[default]
    Text,
    /// Unquoted numbers are bound as numbers.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub dialect: Dialect,
    pub value_typing: ValueTyping,
    /// The column holding the tenant id, in every table.
    pub tenant_column: TenantColumn,
    /// Used when the query has no LIMITE.
    pub default_limit: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            dialect: Dialect::default(),
            value_typing: ValueTyping::default(),
            tenant_column: TenantColumn::default(),
            default_limit: None,
        }
    }
}

/// SQL with placeholders, plus the values that go into them. The tenant is always the first one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub fn render_query(
    query: &ParsedQuery,
    tenant: &TenantContext,
    options: &RenderOptions,
) -> Result<SqlQuery, crate::error::Error> {
    let mut binder = Binder::placeholders(options.dialect);
    let statement = query_rendering::build_statement(query, tenant, options, &mut binder)?;

    Ok(SqlQuery {
        sql: statement.to_string(),
        params: binder.into_params(),
    })
}

/// Values are written into the SQL. This is only ever meant to be read by people.
pub fn render_preview(
    query: &ParsedQuery,
    tenant: &TenantContext,
    options: &RenderOptions,
) -> Result<String, crate::error::Error> {
    let mut binder = Binder::inline();
    let statement = query_rendering::build_statement(query, tenant, options, &mut binder)?;

    Ok(statement.to_string())
}

struct OptionalClause<'a, T> {
    intro: &'a str,
    ligature: &'a str,
    items: &'a [T],
}

impl<'a, T> OptionalClause<'a, T> {
    fn group_by(items: &'a [T]) -> Self {
        OptionalClause {
            intro: "GROUP BY",
            ligature: ",",
            items,
        }
    }

    fn order_by(items: &'a [T]) -> Self {
        OptionalClause {
            intro: "ORDER BY",
            ligature: ",",
            items,
        }
    }

    fn filter(items: &'a [T]) -> Self {
        OptionalClause {
            intro: "WHERE",
            ligature: " AND",
            items,
        }
    }
}

/// Displays things like "WHERE x AND Y AND Z", "GROUP BY 1, 2, 3", and "ORDER BY 1, 2, 3".
/// These are all optional fields that have a ligature between each element.
///
/// Each clause starts on a new line, so nothing is written when there are no items.
impl<'a, T> Display for OptionalClause<'a, T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Self {
            intro,
            ligature,
            items,
        } = self;

        if let Some((first, rest)) = items.split_first() {
            write!(f, "\n{intro} {first}")?;

            for item in rest {
                write!(f, "{ligature} {item}")?;
            }
        }

        Ok(())
    }
}
