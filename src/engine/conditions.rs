//! Works out what the right hand side of a condition means.
//!
//! `=` is overloaded in TQL, the operands decide what kind of comparison it is. We look at them in
//! this order:
//!  1. values separated by commas are a list;
//!  2. a leading `mes()`, `dia()` or `ano()` call is a date period, or a range of them;
//!  3. a lone `hoje` or `ontem` is today or yesterday;
//!  4. a single value is an equality.
//!
//! Nothing else is accepted. In particular, we never fall back to an equality for something we
//! didn't understand.
use crate::engine::calendar::period_range;
use crate::engine::query::{ColumnRef, Condition, LiteralValue, TemporalUnit};
use crate::engine::syntax::{fold_keyword, ConditionInput, OperandInput, OperandSeparator};
use crate::engine::{Position, Sourced};
use crate::error::{positioned_syntax_error, ConditionError, Error, UnsupportedReason};
use chrono::NaiveDate;

pub fn resolve(
    input: &str,
    condition: &ConditionInput,
    field: ColumnRef,
    reference: NaiveDate,
) -> Result<Condition, Error> {
    let resolver = Resolver { input, reference };
    let operands = condition.operands.as_slice();

    if condition.separator == OperandSeparator::Comma {
        return Ok(Condition::InList {
            field,
            values: operands
                .iter()
                .map(|operand| resolver.list_item(operand))
                .collect::<Result<_, _>>()?,
        });
    }

    if let [single] = operands {
        if let Some(offset) = relative_day(single) {
            return Ok(Condition::TemporalPoint {
                field,
                unit: TemporalUnit::Day,
                offset,
            });
        }
    }

    let leading_unit = match operands.first() {
        Some(first) => resolver.temporal_unit(first)?,
        None => None,
    };

    match (leading_unit, operands) {
        (Some(unit), _) => resolver.temporal(field, unit, operands),
        (None, [single]) => Ok(Condition::Equality {
            field,
            value: resolver.literal(single)?,
        }),
        (None, operands) => Err(resolver.unsupported(
            UnsupportedReason::AmbiguousConjunction,
            operands,
        )),
    }
}

/// `hoje` and `ontem`, unquoted, as day offsets.
fn relative_day(operand: &Sourced<OperandInput>) -> Option<i32> {
    let OperandInput::Word(word) = &operand.it else {
        return None;
    };

    match fold_keyword(word).as_str() {
        "HOJE" => Some(0),
        "ONTEM" => Some(-1),
        _ => None,
    }
}

struct Resolver<'a> {
    input: &'a str,
    reference: NaiveDate,
}

impl Resolver<'_> {
    fn list_item(&self, operand: &Sourced<OperandInput>) -> Result<LiteralValue, Error> {
        if let Some(unit) = self.temporal_unit(operand)? {
            return Err(self.unsupported(
                UnsupportedReason::TemporalInList(unit),
                std::slice::from_ref(operand),
            ));
        }
        if relative_day(operand).is_some() {
            return Err(self.unsupported(
                UnsupportedReason::TemporalInList(TemporalUnit::Day),
                std::slice::from_ref(operand),
            ));
        }

        self.literal(operand)
    }

    fn literal(&self, operand: &Sourced<OperandInput>) -> Result<LiteralValue, Error> {
        let value = match &operand.it {
            OperandInput::Quoted(text) | OperandInput::Word(text) => {
                LiteralValue::Text(text.to_string())
            }
            OperandInput::Number(number) => LiteralValue::Number(number.to_string()),
            // Known temporal calls are handled before we ever get here.
            OperandInput::Call { name, .. } => {
                return Err(self.unsupported_at(
                    UnsupportedReason::UnknownFunction(name.it.to_string()),
                    vec![position_of(name)],
                ))
            }
        };

        Ok(value)
    }

    /// The unit of a `mes()`-like call, if that's what the operand is.
    ///
    /// Calls to anything else are errors right away, there is no other kind of function.
    fn temporal_unit(&self, operand: &Sourced<OperandInput>) -> Result<Option<TemporalUnit>, Error> {
        match &operand.it {
            OperandInput::Call { name, .. } => {
                match TemporalUnit::from_function_name(&fold_keyword(name.it)) {
                    Some(unit) => Ok(Some(unit)),
                    None => Err(self.unsupported_at(
                        UnsupportedReason::UnknownFunction(name.it.to_string()),
                        vec![position_of(name)],
                    )),
                }
            }
            _ => Ok(None),
        }
    }

    fn temporal(
        &self,
        field: ColumnRef,
        unit: TemporalUnit,
        operands: &[Sourced<OperandInput>],
    ) -> Result<Condition, Error> {
        let Some((first, rest)) = operands.split_first() else {
            return Err(self.unsupported(UnsupportedReason::AmbiguousConjunction, operands));
        };
        let OperandInput::Call { name, offset } = &first.it else {
            return Err(self.unsupported(UnsupportedReason::AmbiguousConjunction, operands));
        };
        let from = self.offset(offset.as_ref(), position_of(name))?;

        let condition = match rest {
            [] => {
                self.check_range(unit, from, from, position_of(first))?;

                Condition::TemporalPoint {
                    field,
                    unit,
                    offset: from,
                }
            }
            [second] => {
                let to = self.range_end(unit, second)?;

                if from > to {
                    return Err(positioned_syntax_error(
                        self.input,
                        span_of(first, second),
                        &format!("this range ends before it starts, try {unit}({to}) e {unit}({from})"),
                    ));
                }
                self.check_range(unit, from, to, span_of(first, second))?;

                Condition::TemporalRange {
                    field,
                    unit,
                    from,
                    to,
                }
            }
            _ => {
                return Err(self.unsupported(UnsupportedReason::TooManyRangeBounds, operands));
            }
        };

        Ok(condition)
    }

    /// The second half of `mes(-3) e mes` or `mes(-3) e mes(-1)`.
    fn range_end(&self, unit: TemporalUnit, operand: &Sourced<OperandInput>) -> Result<i32, Error> {
        let single = std::slice::from_ref(operand);

        match &operand.it {
            OperandInput::Call { name, offset } => {
                let end_unit = self
                    .temporal_unit(operand)?
                    .ok_or_else(|| self.unsupported(UnsupportedReason::InvalidRangeBound(unit), single))?;

                if end_unit != unit {
                    return Err(self.unsupported(
                        UnsupportedReason::MixedUnits(unit, end_unit),
                        single,
                    ));
                }

                self.offset(offset.as_ref(), position_of(name))
            }
            OperandInput::Word(word) => match TemporalUnit::from_function_name(&fold_keyword(word)) {
                Some(end_unit) if end_unit == unit => Ok(0),
                Some(end_unit) => Err(self.unsupported(
                    UnsupportedReason::MixedUnits(unit, end_unit),
                    single,
                )),
                None => Err(self.unsupported(UnsupportedReason::InvalidRangeBound(unit), single)),
            },
            OperandInput::Quoted(_) | OperandInput::Number(_) => {
                Err(self.unsupported(UnsupportedReason::InvalidRangeBound(unit), single))
            }
        }
    }

    /// Offsets only look back in time: `mes(-1)`, `mes(0)` or `mes()`.
    fn offset(&self, offset: Option<&Sourced<&str>>, fallback: Position) -> Result<i32, Error> {
        let Some(offset) = offset else {
            return Ok(0);
        };
        let position = offset.position().unwrap_or(fallback);

        let value: i32 = offset.it.parse().map_err(|_| {
            positioned_syntax_error(self.input, position, "this offset is too large")
        })?;

        if value > 0 {
            return Err(positioned_syntax_error(
                self.input,
                position,
                &format!("offsets can only look back in time, did you mean -{value}?"),
            ));
        }

        Ok(value)
    }

    fn check_range(
        &self,
        unit: TemporalUnit,
        from: i32,
        to: i32,
        position: Position,
    ) -> Result<(), Error> {
        match period_range(self.reference, unit, from, to) {
            Some(_) => Ok(()),
            None => Err(positioned_syntax_error(
                self.input,
                position,
                "this date is too far back",
            )),
        }
    }

    fn unsupported(&self, reason: UnsupportedReason, operands: &[Sourced<OperandInput>]) -> Error {
        self.unsupported_at(reason, operands.iter().map(position_of).collect())
    }

    fn unsupported_at(&self, reason: UnsupportedReason, positions: Vec<Position>) -> Error {
        ConditionError::new(self.input, reason, positions).into()
    }
}

fn position_of<T: Clone>(sourced: &Sourced<T>) -> Position {
    sourced.position().unwrap_or_default()
}

fn span_of<A: Clone, B: Clone>(first: &Sourced<A>, last: &Sourced<B>) -> Position {
    Position {
        start: position_of(first).start,
        end: position_of(last).end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::syntax::ColumnInput;
    use crate::error::ErrorKind;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn condition<'a>(
        separator: OperandSeparator,
        operands: Vec<OperandInput<'a>>,
    ) -> ConditionInput<'a> {
        ConditionInput {
            column: Sourced::implicit(ColumnInput {
                table: None,
                column: Sourced::implicit("admissao"),
            }),
            separator,
            operands: operands.into_iter().map(Sourced::implicit).collect(),
        }
    }

    fn call<'a>(name: &'a str, offset: Option<&'a str>) -> OperandInput<'a> {
        OperandInput::Call {
            name: Sourced::implicit(name),
            offset: offset.map(Sourced::implicit),
        }
    }

    fn resolve_test(condition: &ConditionInput) -> Result<Condition, Error> {
        resolve("", condition, ColumnRef::named("admissao"), reference())
    }

    fn unsupported_reason(error: Error) -> UnsupportedReason {
        match error.into_inner() {
            ErrorKind::UnsupportedCondition(error) => error.reason,
            other => panic!("expected an unsupported condition, got {other:?}"),
        }
    }

    #[test]
    fn test_equality() {
        let resolved = resolve_test(&condition(
            OperandSeparator::Single,
            vec![OperandInput::Number("25")],
        ))
        .unwrap();

        assert_eq!(
            Condition::Equality {
                field: ColumnRef::named("admissao"),
                value: LiteralValue::Number("25".to_string()),
            },
            resolved
        );
    }

    #[test]
    fn test_lists_come_first() {
        let resolved = resolve_test(&condition(
            OperandSeparator::Comma,
            vec![
                OperandInput::Quoted("mes(-1)"),
                OperandInput::Word("mes"),
                OperandInput::Number("3"),
            ],
        ))
        .unwrap();

        assert_eq!(
            Condition::InList {
                field: ColumnRef::named("admissao"),
                values: vec![
                    LiteralValue::Text("mes(-1)".to_string()),
                    LiteralValue::Text("mes".to_string()),
                    LiteralValue::Number("3".to_string()),
                ],
            },
            resolved
        );
    }

    #[test]
    fn test_temporal_call_in_list() {
        let error = resolve_test(&condition(
            OperandSeparator::Comma,
            vec![OperandInput::Quoted("a"), call("mes", Some("-1"))],
        ))
        .unwrap_err();

        assert_eq!(
            UnsupportedReason::TemporalInList(TemporalUnit::Month),
            unsupported_reason(error)
        );
    }

    #[test]
    fn test_temporal_point() {
        for (operand, expected_offset) in [
            (call("mes", Some("-1")), -1),
            (call("Mês", Some("-12")), -12),
            (call("mes", None), 0),
            (call("MES", Some("0")), 0),
        ] {
            let resolved =
                resolve_test(&condition(OperandSeparator::Single, vec![operand])).unwrap();

            assert_eq!(
                Condition::TemporalPoint {
                    field: ColumnRef::named("admissao"),
                    unit: TemporalUnit::Month,
                    offset: expected_offset,
                },
                resolved
            );
        }
    }

    #[test]
    fn test_today_and_yesterday() {
        for (word, offset) in [("hoje", 0), ("Hoje", 0), ("ONTEM", -1)] {
            let resolved = resolve_test(&condition(
                OperandSeparator::Single,
                vec![OperandInput::Word(word)],
            ))
            .unwrap();

            assert_eq!(
                Condition::TemporalPoint {
                    field: ColumnRef::named("admissao"),
                    unit: TemporalUnit::Day,
                    offset,
                },
                resolved
            );
        }

        let quoted = resolve_test(&condition(
            OperandSeparator::Single,
            vec![OperandInput::Quoted("hoje")],
        ))
        .unwrap();
        assert_eq!(
            Condition::Equality {
                field: ColumnRef::named("admissao"),
                value: LiteralValue::Text("hoje".to_string()),
            },
            quoted
        );

        let listed = resolve_test(&condition(
            OperandSeparator::Comma,
            vec![OperandInput::Word("ontem"), OperandInput::Word("hoje")],
        ))
        .unwrap_err();
        assert_eq!(
            UnsupportedReason::TemporalInList(TemporalUnit::Day),
            unsupported_reason(listed)
        );
    }

    #[test]
    fn test_temporal_range() {
        for second in [OperandInput::Word("mes"), call("mes", None), call("mes", Some("0"))] {
            let resolved = resolve_test(&condition(
                OperandSeparator::Conjunction,
                vec![call("mes", Some("-3")), second],
            ))
            .unwrap();

            assert_eq!(
                Condition::TemporalRange {
                    field: ColumnRef::named("admissao"),
                    unit: TemporalUnit::Month,
                    from: -3,
                    to: 0,
                },
                resolved
            );
        }
    }

    #[test]
    fn test_unsupported_conditions() {
        let cases = [
            (
                condition(
                    OperandSeparator::Conjunction,
                    vec![OperandInput::Word("a"), OperandInput::Word("b")],
                ),
                UnsupportedReason::AmbiguousConjunction,
            ),
            (
                condition(
                    OperandSeparator::Conjunction,
                    vec![OperandInput::Word("a"), call("mes", Some("-1"))],
                ),
                UnsupportedReason::AmbiguousConjunction,
            ),
            (
                condition(OperandSeparator::Single, vec![call("semana", Some("-1"))]),
                UnsupportedReason::UnknownFunction("semana".to_string()),
            ),
            (
                condition(
                    OperandSeparator::Conjunction,
                    vec![call("mes", Some("-3")), OperandInput::Word("ano")],
                ),
                UnsupportedReason::MixedUnits(TemporalUnit::Month, TemporalUnit::Year),
            ),
            (
                condition(
                    OperandSeparator::Conjunction,
                    vec![call("mes", Some("-3")), OperandInput::Quoted("x")],
                ),
                UnsupportedReason::InvalidRangeBound(TemporalUnit::Month),
            ),
            (
                condition(
                    OperandSeparator::Conjunction,
                    vec![
                        call("mes", Some("-3")),
                        call("mes", Some("-2")),
                        OperandInput::Word("mes"),
                    ],
                ),
                UnsupportedReason::TooManyRangeBounds,
            ),
        ];

        for (condition, reason) in cases {
            let error = resolve_test(&condition).unwrap_err();

            assert_eq!(reason, unsupported_reason(error));
        }
    }

    #[test]
    fn test_offsets_that_are_syntax_errors() {
        let input = "ONDE admissao = mes(3) e mes(-4) e mes(-99999999999)";
        let at = |start: usize, end: usize, text: &'static str| {
            Sourced::from_input(start..end, text)
        };

        let positive = ConditionInput {
            operands: vec![Sourced::from_input(
                16..22,
                OperandInput::Call {
                    name: at(16, 19, "mes"),
                    offset: Some(at(20, 21, "3")),
                },
            )],
            ..condition(OperandSeparator::Single, vec![])
        };
        let reversed = ConditionInput {
            separator: OperandSeparator::Conjunction,
            operands: vec![
                Sourced::from_input(
                    16..22,
                    OperandInput::Call {
                        name: at(16, 19, "mes"),
                        offset: Some(at(20, 21, "-1")),
                    },
                ),
                Sourced::from_input(
                    25..32,
                    OperandInput::Call {
                        name: at(25, 28, "mes"),
                        offset: Some(at(29, 31, "-4")),
                    },
                ),
            ],
            ..condition(OperandSeparator::Single, vec![])
        };
        let huge = ConditionInput {
            operands: vec![Sourced::from_input(
                35..52,
                OperandInput::Call {
                    name: at(35, 38, "mes"),
                    offset: Some(at(39, 51, "-99999999999")),
                },
            )],
            ..condition(OperandSeparator::Single, vec![])
        };

        for condition in [positive, reversed, huge] {
            let error = resolve(input, &condition, ColumnRef::named("admissao"), reference())
                .unwrap_err();

            assert!(
                matches!(error.kind(), ErrorKind::SyntaxError(_)),
                "expected a syntax error, got {error:?}"
            );
        }
    }
}
