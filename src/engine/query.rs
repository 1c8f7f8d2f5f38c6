//! What a query looks like once it's been parsed.
//!
//! Everything here is owned, so a [ParsedQuery] can outlive the input string. Once built, nothing
//! in here changes.
use crate::engine::Sourced;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    /// The query exactly as it was typed, for error messages.
    #[serde(skip)]
    pub input: String,
    #[serde(serialize_with = "serialize_sourced")]
    pub action: Sourced<Action>,
    /// An empty list means everything, i.e. `*`.
    #[serde(serialize_with = "serialize_sourced_list")]
    pub fields: Vec<Sourced<Field>>,
    #[serde(serialize_with = "serialize_sourced")]
    pub table: Sourced<TableName>,
    #[serde(rename = "where", serialize_with = "serialize_sourced_list")]
    pub conditions: Vec<Sourced<Condition>>,
    /// What joins each condition to the one before it, so there is one less of these than there
    /// are conditions.
    pub connectives: Vec<Connective>,
    #[serde(serialize_with = "serialize_sourced_list")]
    pub group_by: Vec<Sourced<ColumnRef>>,
    #[serde(serialize_with = "serialize_sourced_list")]
    pub order_by: Vec<Sourced<OrderItem>>,
    #[serde(serialize_with = "serialize_optional_sourced")]
    pub limit: Option<Sourced<u64>>,
    /// Temporal conditions are relative to this date.
    pub reference_date: NaiveDate,
}

/// The verb a query starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// MOSTRAR, a plain select.
    Show,
    /// SOMAR
    Sum,
    /// CONTAR
    Count,
    /// MEDIA
    Average,
    /// MAX or MAXIMO
    Max,
    /// MIN or MINIMO
    Min,
}

impl Action {
    pub fn is_aggregate(self) -> bool {
        self != Action::Show
    }

    /// The SQL function this action maps to.
    pub fn sql_function(self) -> Option<&'static str> {
        match self {
            Action::Show => None,
            Action::Sum => Some("SUM"),
            Action::Count => Some("COUNT"),
            Action::Average => Some("AVG"),
            Action::Max => Some("MAX"),
            Action::Min => Some("MIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableName(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn named(column: &str) -> Self {
        ColumnRef {
            table: None,
            column: column.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    #[serde(flatten)]
    pub column: ColumnRef,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub column: ColumnRef,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    Ascending,
    Descending,
}

/// E or OU, between two conditions. E binds tighter, like AND does in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn sql(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// A literal value like 25 or "ativo".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    /// We keep the number exactly as it was typed, how it gets bound is a rendering decision.
    Number(String),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalUnit {
    Day,
    Month,
    Year,
}

impl TemporalUnit {
    /// Function names are compared after folding case and accents, so `Mês(-1)` is a month too.
    pub fn from_function_name(folded_name: &str) -> Option<Self> {
        match folded_name {
            "DIA" => Some(TemporalUnit::Day),
            "MES" => Some(TemporalUnit::Month),
            "ANO" => Some(TemporalUnit::Year),
            _ => None,
        }
    }

    pub fn function_name(self) -> &'static str {
        match self {
            TemporalUnit::Day => "dia",
            TemporalUnit::Month => "mes",
            TemporalUnit::Year => "ano",
        }
    }
}

/// One condition of the ONDE clause.
///
/// The "=" operator means different things depending on what is on its right, so it gets
/// resolved into one of these once, while parsing. Nothing downstream looks at the raw text again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// `status = "ativo"`
    Equality {
        field: ColumnRef,
        value: LiteralValue,
    },
    /// `status = "ativo", "pendente"`
    InList {
        field: ColumnRef,
        values: Vec<LiteralValue>,
    },
    /// `admissao = mes(-1)`, the whole of the period `offset` units back.
    TemporalPoint {
        field: ColumnRef,
        unit: TemporalUnit,
        offset: i32,
    },
    /// `admissao = mes(-3) e mes`, from the start of period `from` through the end of period `to`.
    TemporalRange {
        field: ColumnRef,
        unit: TemporalUnit,
        from: i32,
        to: i32,
    },
}

impl Condition {
    pub fn field(&self) -> &ColumnRef {
        match self {
            Condition::Equality { field, .. }
            | Condition::InList { field, .. }
            | Condition::TemporalPoint { field, .. }
            | Condition::TemporalRange { field, .. } => field,
        }
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{}.", table)?;
        }

        write!(f, "{}", self.column)
    }
}

impl Display for TemporalUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.function_name())
    }
}

// Positions are only useful for error messages, serialized queries just carry the values.

fn serialize_sourced<T, S>(value: &Sourced<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize + Clone,
    S: serde::Serializer,
{
    value.it.serialize(serializer)
}

fn serialize_optional_sourced<T, S>(
    value: &Option<Sourced<T>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    T: Serialize + Clone,
    S: serde::Serializer,
{
    value.as_ref().map(|value| &value.it).serialize(serializer)
}

#[allow(clippy::ptr_arg)]
fn serialize_sourced_list<T, S>(values: &Vec<Sourced<T>>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize + Clone,
    S: serde::Serializer,
{
    serializer.collect_seq(values.iter().map(|value| &value.it))
}
