use crate::engine::describe_rule;
use crate::engine::Position;
use crate::error::{ErrorKind, InternalError, PestError};
use colored::Colorize;
use pest::error::{ErrorVariant, InputLocation, LineColLocation};
use pest::Span;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub struct WrappedPestError(PestError);

impl Display for WrappedPestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let error = &self.0;

        write!(
            f,
            "{line}\n\
             {underline} {message}\n\
             ",
            line = error.line(),
            underline = self.underline().red().bold(),
            message = error.variant.message().bold().red(),
        )?;

        Ok(())
    }
}

impl WrappedPestError {
    /// "line 1, column 16: expected DE"
    pub fn summary(&self) -> String {
        let (line, column) = match self.0.line_col {
            LineColLocation::Pos(position) => position,
            LineColLocation::Span(start, _) => start,
        };

        format!(
            "line {line}, column {column}: {message}",
            message = self.0.variant.message()
        )
    }

    fn underline(&self) -> String {
        let blank_indent = blank(self.line_until_error());

        match self.0.location {
            InputLocation::Pos(_) => format!("{blank_indent}^"),
            InputLocation::Span((start, end)) => format!(
                "{blank_indent}{underline}",
                underline = "^".repeat(end.saturating_sub(start).max(1)),
            ),
        }
    }

    /// The part of the error's line that comes before the error.
    fn line_until_error(&self) -> &str {
        let column = match self.0.line_col {
            LineColLocation::Pos((_, column)) => column,
            LineColLocation::Span((_, column), _) => column,
        };
        let line = self.0.line();

        // Columns count chars, starting at 1.
        let offset = line
            .char_indices()
            .nth(column.saturating_sub(1))
            .map(|(offset, _)| offset)
            .unwrap_or(line.len());

        &line[..offset]
    }
}

fn blank(input: &str) -> String {
    input
        .chars()
        // If we just replace any char with a space, tabs will be much shorter.
        // So we have to preserve tabs.
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect()
}

impl From<PestError> for ErrorKind {
    fn from(value: PestError) -> Self {
        WrappedPestError(value.renamed_rules(describe_rule)).into()
    }
}

/// Builds a syntax error pointing at `position`, for problems the grammar can't catch by itself.
pub(crate) fn positioned_syntax_error(
    input: &str,
    position: Position,
    message: &str,
) -> crate::error::Error {
    match Span::new(input, position.start, position.end) {
        Some(span) => {
            let error = PestError::new_from_span(
                ErrorVariant::CustomError {
                    message: message.to_string(),
                },
                span,
            );

            WrappedPestError(error).into()
        }
        None => InternalError(format!(
            "invalid position {}..{} for error \"{message}\"",
            position.start, position.end
        ))
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positioned_errors() {
        let input = "MOSTRAR nome DE funcionarios ONDE admissao = mes(2)";
        let error = positioned_syntax_error(input, (49..50).into(), "offsets must be negative");

        assert!(matches!(error.kind(), ErrorKind::SyntaxError(_)));
        assert_eq!(
            "line 1, column 50: offsets must be negative",
            error.summary()
        );
    }

    #[test]
    fn test_out_of_bounds_positions_are_internal_errors() {
        let error = positioned_syntax_error("MOSTRAR", (3..40).into(), "whatever");

        assert!(matches!(error.kind(), ErrorKind::InternalError(_)));
    }
}
