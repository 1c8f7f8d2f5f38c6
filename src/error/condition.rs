use crate::engine::query::TemporalUnit;
use crate::engine::Position;
use colored::Colorize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A condition the grammar accepts, but that has no SQL meaning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ConditionError {
    pub input: String,
    pub reason: UnsupportedReason,
    /// What to underline, in input order.
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// `admissao = "a", mes(-1)`
    TemporalInList(TemporalUnit),
    /// `admissao = semana(-1)`
    UnknownFunction(String),
    /// `status = "ativo" e "pendente"`
    AmbiguousConjunction,
    /// `admissao = mes(-3) e "x"`
    InvalidRangeBound(TemporalUnit),
    /// `admissao = mes(-3) e mes(-2) e mes`
    TooManyRangeBounds,
    /// `admissao = mes(-3) e ano`
    MixedUnits(TemporalUnit, TemporalUnit),
    /// Conditions on the tenant column would let a query widen its own scope.
    ReservedColumn(String),
}

impl ConditionError {
    pub fn new(input: &str, reason: UnsupportedReason, mut positions: Vec<Position>) -> Self {
        positions.sort_by_key(|position| position.start);

        ConditionError {
            input: input.to_string(),
            reason,
            positions,
        }
    }

    pub fn summary(&self) -> String {
        match self.positions.first() {
            Some(position) => format!(
                "column {column}: {message}",
                column = self.input[..position.start.min(self.input.len())]
                    .chars()
                    .count()
                    + 1,
                message = self.message()
            ),
            None => self.message(),
        }
    }

    fn message(&self) -> String {
        match &self.reason {
            UnsupportedReason::TemporalInList(unit) => {
                format!("{unit}() can't be used inside a list of values")
            }
            UnsupportedReason::UnknownFunction(name) => {
                format!("unknown function {name}(), use mes(), dia() or ano()")
            }
            UnsupportedReason::AmbiguousConjunction => {
                "values joined by E are only allowed for date ranges, use commas for a list"
                    .to_string()
            }
            UnsupportedReason::InvalidRangeBound(unit) => {
                format!("a {unit}() range has to end with {unit}(N) or {unit}")
            }
            UnsupportedReason::TooManyRangeBounds => {
                "a date range has exactly two ends".to_string()
            }
            UnsupportedReason::MixedUnits(from, to) => {
                format!("a range can't go from {from}() to {to}()")
            }
            UnsupportedReason::ReservedColumn(column) => {
                format!("{column} can't be filtered on, it is set by the server")
            }
        }
    }

    fn underline(&self) -> String {
        if self.positions.is_empty() {
            return "^".repeat(self.input.chars().count());
        }

        let mut buffer = String::new();
        let mut written = 0;

        for Position { start, end } in &self.positions {
            // Overlapping positions would otherwise make us go backwards.
            let start = (*start).max(written);
            let end = (*end).max(start);

            buffer.push_str(&" ".repeat(char_count(&self.input, written, start)));
            buffer.push_str(&"^".repeat(char_count(&self.input, start, end).max(1)));
            written = end;
        }

        buffer
    }
}

fn char_count(input: &str, start: usize, end: usize) -> usize {
    input
        .get(start..end)
        .map(|slice| slice.chars().count())
        .unwrap_or(end.saturating_sub(start))
}

impl Display for ConditionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{input}\n\
             {underline} {message}",
            input = self.input,
            underline = self.underline().red().bold(),
            message = self.message().red().bold(),
        )
    }
}
