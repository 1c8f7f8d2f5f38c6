//! Stage 3 turns clauses into a [ParsedQuery].
//!
//! This is where the checks that need more than one clause happen: qualified columns have to
//! point to the DE table, aggregates need something to aggregate, and every condition gets
//! resolved into what it actually means.
use crate::engine::conditions;
use crate::engine::query::{
    Action, ColumnRef, Condition, Field, OrderDirection, OrderItem, ParsedQuery, TableName,
};
use crate::engine::syntax::stage2::{Stage2Clause, Stage2Rep, Stage2Selection};
use crate::engine::syntax::{ColumnInput, ConditionInput, FieldInput, OrderInput};
use crate::engine::{Position, Sourced};
use crate::error::{positioned_syntax_error, Error, InternalError};
use chrono::NaiveDate;

pub fn build(stage2: Stage2Rep, reference: NaiveDate) -> Result<ParsedQuery, Error> {
    let input = stage2.input;

    let table = stage2
        .clauses
        .iter()
        .find_map(|clause| match &clause.it {
            Stage2Clause::From(table) => Some(*table),
            _ => None,
        })
        .ok_or_else(|| InternalError("the grammar allowed a query without DE".to_string()))?;

    let builder = Builder {
        input,
        table,
        reference,
    };

    let mut action = None;
    let mut fields = Vec::new();
    let mut conditions = Vec::new();
    let mut connectives = Vec::new();
    let mut group_by = Vec::new();
    let mut order_by = Vec::new();
    let mut limit = None;

    for clause in stage2.clauses {
        match clause.it {
            Stage2Clause::Show {
                action: show_action,
                selection,
            } => {
                fields = builder.fields(show_action, selection)?;
                action = Some(show_action);
            }
            Stage2Clause::From(_) => {}
            Stage2Clause::Where {
                conditions: inputs,
                connectives: joined_by,
            } => {
                conditions = inputs
                    .iter()
                    .map(|condition| builder.condition(condition))
                    .collect::<Result<_, _>>()?;
                connectives = joined_by;
            }
            Stage2Clause::GroupBy(columns) => {
                group_by = columns
                    .iter()
                    .map(|column| builder.column(column))
                    .collect::<Result<_, _>>()?;
            }
            Stage2Clause::OrderBy(items) => {
                order_by = items
                    .iter()
                    .map(|item| builder.order(item))
                    .collect::<Result<_, _>>()?;
            }
            Stage2Clause::Limit(value) => limit = Some(builder.limit(value)?),
        }
    }

    let action = action
        .ok_or_else(|| InternalError("the grammar allowed a query without an action".to_string()))?;

    Ok(ParsedQuery {
        input: input.to_string(),
        action,
        fields,
        table: table.map(|name| TableName(name.to_string())),
        conditions,
        connectives,
        group_by,
        order_by,
        limit,
        reference_date: reference,
    })
}

struct Builder<'a> {
    input: &'a str,
    table: Sourced<&'a str>,
    reference: NaiveDate,
}

impl<'a> Builder<'a> {
    fn fields(
        &self,
        action: Sourced<Action>,
        selection: Stage2Selection<'a>,
    ) -> Result<Vec<Sourced<Field>>, Error> {
        let fields = match selection {
            Stage2Selection::Implicit | Stage2Selection::Everything(_) => Vec::new(),
            Stage2Selection::Fields(fields) => fields
                .iter()
                .map(|field| self.field(field))
                .collect::<Result<_, _>>()?,
        };

        // COUNT(*) makes sense, SUM(*) does not.
        if fields.is_empty() && !matches!(action.it, Action::Show | Action::Count) {
            return Err(self.syntax_error(
                position_of(&action),
                "this needs at least one column to work on",
            ));
        }

        Ok(fields)
    }

    fn field(&self, field: &Sourced<FieldInput>) -> Result<Sourced<Field>, Error> {
        let column = self.column(&field.it.column)?;

        Ok(Sourced {
            it: Field {
                column: column.it,
                alias: field.it.alias.map(|alias| alias.it.to_string()),
            },
            source: field.source,
        })
    }

    fn column(&self, column: &Sourced<ColumnInput>) -> Result<Sourced<ColumnRef>, Error> {
        let ColumnInput { table, column: name } = column.it;

        if let Some(table) = table {
            if table.it != self.table.it {
                return Err(self.syntax_error(
                    position_of(&table),
                    &format!(
                        "only columns of {} can be used here, there are no joins",
                        self.table.it
                    ),
                ));
            }
        }

        Ok(Sourced {
            it: ColumnRef {
                table: table.map(|table| table.it.to_string()),
                column: name.it.to_string(),
            },
            source: column.source,
        })
    }

    fn condition(&self, condition: &Sourced<ConditionInput>) -> Result<Sourced<Condition>, Error> {
        let field = self.column(&condition.it.column)?;
        let resolved = conditions::resolve(self.input, &condition.it, field.it, self.reference)?;

        Ok(Sourced {
            it: resolved,
            source: condition.source,
        })
    }

    fn order(&self, item: &Sourced<OrderInput>) -> Result<Sourced<OrderItem>, Error> {
        let column = self.column(&item.it.column)?;
        let direction = if item.it.descending {
            OrderDirection::Descending
        } else {
            OrderDirection::Ascending
        };

        Ok(Sourced {
            it: OrderItem {
                column: column.it,
                direction,
            },
            source: item.source,
        })
    }

    fn limit(&self, value: Sourced<&str>) -> Result<Sourced<u64>, Error> {
        match value.it.parse::<u64>() {
            Ok(limit) => Ok(value.map(|_| limit)),
            Err(_) => Err(self.syntax_error(position_of(&value), "this limit is too large")),
        }
    }

    fn syntax_error(&self, position: Position, message: &str) -> Error {
        positioned_syntax_error(self.input, position, message)
    }
}

fn position_of<T: Clone>(sourced: &Sourced<T>) -> Position {
    sourced.position().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::query::{LiteralValue, TemporalUnit};
    use crate::engine::syntax::stage1::parse_stage1;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn build_test(input: &str) -> Result<ParsedQuery, Error> {
        let stage2: Stage2Rep = parse_stage1(input).unwrap().into();

        build(stage2, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
    }

    #[test]
    fn test_full_query() {
        let query = build_test(
            "SOMAR salario COMO total DE funcionarios ONDE admissao = mes(-1) \
             AGRUPADO POR departamento ORDENADO POR departamento DESC LIMITE 10",
        )
        .unwrap();

        assert_eq!(Action::Sum, query.action.it);
        assert_eq!(
            vec![Field {
                column: ColumnRef::named("salario"),
                alias: Some("total".to_string()),
            }],
            query.fields.iter().map(|f| f.it.clone()).collect::<Vec<_>>()
        );
        assert_eq!(TableName("funcionarios".to_string()), query.table.it);
        assert_eq!(
            Condition::TemporalPoint {
                field: ColumnRef::named("admissao"),
                unit: TemporalUnit::Month,
                offset: -1,
            },
            query.conditions[0].it
        );
        assert_eq!(ColumnRef::named("departamento"), query.group_by[0].it);
        assert_eq!(OrderDirection::Descending, query.order_by[0].it.direction);
        assert_eq!(Some(10), query.limit.map(|limit| limit.it));
        assert_eq!(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            query.reference_date
        );
    }

    #[test]
    fn test_star_and_implicit_selections_are_empty() {
        assert!(build_test("MOSTRAR * DE funcionarios").unwrap().fields.is_empty());
        assert!(build_test("MOSTRAR DE funcionarios").unwrap().fields.is_empty());
        assert!(build_test("CONTAR DE funcionarios").unwrap().fields.is_empty());
    }

    #[test]
    fn test_qualified_columns_must_use_the_from_table() {
        let query = build_test(
            "MOSTRAR funcionarios.nome DE funcionarios ONDE funcionarios.status = ativo",
        )
        .unwrap();

        assert_eq!(Some("funcionarios".to_string()), query.fields[0].it.column.table);
        assert_eq!(
            Condition::Equality {
                field: ColumnRef {
                    table: Some("funcionarios".to_string()),
                    column: "status".to_string(),
                },
                value: LiteralValue::Text("ativo".to_string()),
            },
            query.conditions[0].it
        );

        let error = build_test("MOSTRAR clientes.nome DE funcionarios").unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::SyntaxError(_)));
        assert!(error.summary().starts_with("line 1, column 9: only columns of funcionarios"));
    }

    #[test]
    fn test_aggregates_need_columns() {
        for input in ["SOMAR DE funcionarios", "MEDIA * DE funcionarios"] {
            let error = build_test(input).unwrap_err();

            assert!(
                matches!(error.kind(), ErrorKind::SyntaxError(_)),
                "{input} should not build"
            );
        }
    }

    #[test]
    fn test_limit_overflow() {
        let error = build_test("MOSTRAR DE funcionarios LIMITE 99999999999999999999999").unwrap_err();

        assert_eq!(
            "line 1, column 32: this limit is too large",
            error.summary()
        );
    }

    #[test]
    fn test_conditions_are_resolved() {
        let error = build_test("MOSTRAR DE funcionarios ONDE status = a e b").unwrap_err();

        assert!(matches!(error.kind(), ErrorKind::UnsupportedCondition(_)));
    }
}
