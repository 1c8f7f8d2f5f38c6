use crate::engine::query::LiteralValue;
use crate::engine::rendering::{Dialect, ValueTyping};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// A value bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl SqlValue {
    pub fn from_literal(literal: &LiteralValue, typing: ValueTyping) -> Self {
        match (literal, typing) {
            (LiteralValue::Text(text), _) => SqlValue::Text(text.clone()),
            (LiteralValue::Number(number), ValueTyping::Text) => SqlValue::Text(number.clone()),
            (LiteralValue::Number(number), ValueTyping::Inferred) => {
                if let Ok(integer) = number.parse() {
                    SqlValue::Integer(integer)
                } else if let Ok(float) = number.parse() {
                    SqlValue::Float(float)
                } else {
                    // Too big for an i64, but still made of digits.
                    SqlValue::Text(number.clone())
                }
            }
        }
    }
}

/// Writes the value as an SQL literal.
impl Display for SqlValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            SqlValue::Integer(integer) => write!(f, "{integer}"),
            SqlValue::Float(float) => write!(f, "{float}"),
            SqlValue::Date(date) => write!(f, "'{}'", date.format("%Y-%m-%d")),
        }
    }
}

/// Hands out placeholders and keeps track of what goes in them.
pub(super) struct Binder {
    binding: Binding,
    params: Vec<SqlValue>,
}

enum Binding {
    Placeholders(Dialect),
    Inline,
}

impl Binder {
    pub fn placeholders(dialect: Dialect) -> Self {
        Binder {
            binding: Binding::Placeholders(dialect),
            params: Vec::new(),
        }
    }

    pub fn inline() -> Self {
        Binder {
            binding: Binding::Inline,
            params: Vec::new(),
        }
    }

    /// Returns what to write in the SQL in place of `value`.
    pub fn bind(&mut self, value: SqlValue) -> String {
        match self.binding {
            Binding::Inline => value.to_string(),
            Binding::Placeholders(dialect) => {
                self.params.push(value);

                match dialect {
                    Dialect::Postgres => format!("${}", self.params.len()),
                    Dialect::MariaDb => "?".to_string(),
                }
            }
        }
    }

    pub fn into_params(self) -> Vec<SqlValue> {
        self.params
    }
}
