//! TQL input parsing
//!
//! A TQL query looks like this:
//! ```text
//!     MOSTRAR nome, salario DE funcionarios ONDE admissao = mes(-3) e mes LIMITE 10
//! ```
//!
//! Parsing happens in stages, each one a little closer to what the SQL generator wants:
//!  1. pest checks the grammar and gives us a tree of pairs;
//!  2. the pairs become a flat list of clauses, still borrowing from the input;
//!  3. the clauses become a [ParsedQuery], resolving every condition into its tagged variant.
//!
//! Only stages 1 and 3 can fail. Stage 2 works on input pest already accepted.

/// Uses Pest to parse input strings.
mod stage1;

/// Takes Pest's output and transforms it into something a bit nicer.
mod stage2;

/// Builds the final query, this is where the semantic checks happen.
mod stage3;

pub use stage1::Rule;

use crate::engine::query::ParsedQuery;
use crate::engine::syntax::stage1::parse_stage1;
use crate::engine::syntax::stage2::Stage2Rep;
use crate::engine::Sourced;
use chrono::{Local, NaiveDate};
use log::debug;

pub(crate) use stage1::describe_rule;

/// Parses a query relative to today's date.
pub fn parse(input: &str) -> Result<ParsedQuery, crate::error::Error> {
    parse_with_reference(input, Local::now().date_naive())
}

/// Parses a query, temporal conditions will be relative to `reference`.
pub fn parse_with_reference(
    input: &str,
    reference: NaiveDate,
) -> Result<ParsedQuery, crate::error::Error> {
    let stage1 = parse_stage1(input)?;
    let stage2: Stage2Rep = stage1.into();
    let query = stage3::build(stage2, reference)?;

    debug!(
        "parsed query on {} with {} condition(s)",
        query.table.it,
        query.conditions.len()
    );

    Ok(query)
}

/// Uppercases `word` and strips the accents Portuguese keywords can carry, so `Mês` becomes `MES`.
///
/// The grammar does the same thing for keywords, this is for code that has to compare words itself.
pub fn fold_keyword(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'Á' | 'À' | 'Â' | 'Ã' => 'A',
            'é' | 'è' | 'ê' | 'É' | 'È' | 'Ê' => 'E',
            'í' | 'î' | 'Í' | 'Î' => 'I',
            'ó' | 'ô' | 'õ' | 'Ó' | 'Ô' | 'Õ' => 'O',
            'ú' | 'ü' | 'Ú' | 'Ü' => 'U',
            'ç' | 'Ç' => 'C',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// A column reference as it was typed: `column` or `table.column`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnInput<'a> {
    pub table: Option<Sourced<&'a str>>,
    pub column: Sourced<&'a str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldInput<'a> {
    pub column: Sourced<ColumnInput<'a>>,
    pub alias: Option<Sourced<&'a str>>,
}

/// One operand on the right hand side of a condition's "=".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperandInput<'a> {
    /// Things like `mes(-1)` or `mes()`.
    Call {
        name: Sourced<&'a str>,
        offset: Option<Sourced<&'a str>>,
    },
    /// A quoted string, without its quotes.
    Quoted(&'a str),
    Number(&'a str),
    /// An unquoted word, like `ativo` or `mes`.
    Word(&'a str),
}

/// How the operands of a condition were put together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandSeparator {
    /// There is just one operand.
    Single,
    /// `"a", "b", "c"`
    Comma,
    /// `mes(-3) e mes`
    Conjunction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionInput<'a> {
    pub column: Sourced<ColumnInput<'a>>,
    pub separator: OperandSeparator,
    pub operands: Vec<Sourced<OperandInput<'a>>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderInput<'a> {
    pub column: Sourced<ColumnInput<'a>>,
    pub descending: bool,
}
