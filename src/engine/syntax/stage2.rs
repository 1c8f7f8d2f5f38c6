//! Stage 2 representation has one node per clause.
//! For example "MOSTRAR nome DE funcionarios LIMITE 5" would be represented by:
//!
//! ```text
//! vec![
//!     Show { action: Show, selection: Fields([nome]) },
//!     From("funcionarios"),
//!     Limit("5"),
//! ]
//! ```
//!
//! Since this is just a more convenient way of representing the source Pest info, it's not possible
//! to fail here. Whether the clauses make sense is a question for stage 3.
use crate::engine::query::{Action, Connective};
use crate::engine::syntax::stage1::{Rule, Stage1Rep};
use crate::engine::syntax::{
    ColumnInput, ConditionInput, FieldInput, OperandInput, OperandSeparator, OrderInput,
};
use crate::engine::{Position, Sourced};
use pest::iterators::{Pair, Pairs};
use pest::Span;

/// It's a pattern we have that every stage keeps a ref to the input string + whatever data we
/// processed.
pub struct Stage2Rep<'a> {
    pub input: &'a str,
    /// The grammar guarantees clauses come in order, and that show and from clauses are present.
    pub clauses: Vec<Sourced<Stage2Clause<'a>>>,
}

#[derive(Debug, Clone)]
pub enum Stage2Clause<'a> {
    /// MOSTRAR nome, salario
    Show {
        action: Sourced<Action>,
        selection: Stage2Selection<'a>,
    },
    /// DE funcionarios
    From(Sourced<&'a str>),
    /// ONDE idade = 25 E status = "ativo"
    Where {
        conditions: Vec<Sourced<ConditionInput<'a>>>,
        connectives: Vec<Connective>,
    },
    /// AGRUPADO POR departamento
    GroupBy(Vec<Sourced<ColumnInput<'a>>>),
    /// ORDENADO POR nome DESC
    OrderBy(Vec<Sourced<OrderInput<'a>>>),
    /// LIMITE 10
    Limit(Sourced<&'a str>),
}

#[derive(Debug, Clone)]
pub enum Stage2Selection<'a> {
    /// Nothing was listed after the action.
    Implicit,
    /// `*`
    Everything(Position),
    Fields(Vec<Sourced<FieldInput<'a>>>),
}

impl<'a> From<Stage1Rep<'a>> for Stage2Rep<'a> {
    fn from(stage1: Stage1Rep<'a>) -> Self {
        let clauses = translate_root(stage1.pest);

        Stage2Rep {
            input: stage1.input,
            clauses,
        }
    }
}

fn translate_root(mut pairs: Pairs<Rule>) -> Vec<Sourced<Stage2Clause>> {
    let root_pair = pairs.next().expect("Impossible due to pest parsing");

    assert_eq!(Rule::root, root_pair.as_rule());
    assert!(pairs.next().is_none());

    root_pair.into_inner().filter_map(translate_clause).collect()
}

fn translate_clause(pair: Pair<Rule>) -> Option<Sourced<Stage2Clause>> {
    // Pest won't let us match exhaustively on rules, hence the catch-all at the bottom.
    let span = pair.as_span();
    let clause = match pair.as_rule() {
        Rule::show_clause => translate_show(pair),
        Rule::from_clause => translate_from(pair),
        Rule::where_clause => translate_where(pair),
        Rule::group_clause => Stage2Clause::GroupBy(
            pair.into_inner()
                .filter(|inner| inner.as_rule() == Rule::column)
                .map(translate_column)
                .collect(),
        ),
        Rule::order_clause => Stage2Clause::OrderBy(
            pair.into_inner()
                .filter(|inner| inner.as_rule() == Rule::order_item)
                .map(translate_order_item)
                .collect(),
        ),
        Rule::limit_clause => translate_limit(pair),
        Rule::EOI => return None, // EOI is End Of Input
        _ => panic!("Unknown clause {:#?}", pair),
    };

    Some(Sourced::from_input(span, clause))
}

fn translate_show(show: Pair<Rule>) -> Stage2Clause {
    assert_eq!(Rule::show_clause, show.as_rule());

    let mut inners = show.into_inner();
    let action = translate_action(
        inners
            .next()
            .expect("the action should be present because of pest syntax"),
    );
    let selection = match inners.next() {
        None => Stage2Selection::Implicit,
        Some(selection) => translate_selection(selection),
    };

    Stage2Clause::Show { action, selection }
}

fn translate_action(action: Pair<Rule>) -> Sourced<Action> {
    assert_eq!(Rule::action, action.as_rule());

    let span = action.as_span();
    let keyword = action.into_inner().next().expect("Has to be valid syntax");
    let action = match keyword.as_rule() {
        Rule::kw_mostrar => Action::Show,
        Rule::kw_somar => Action::Sum,
        Rule::kw_contar => Action::Count,
        Rule::kw_media => Action::Average,
        Rule::kw_maximo => Action::Max,
        Rule::kw_minimo => Action::Min,
        _ => panic!("Unknown action {:#?}", keyword.as_rule()),
    };

    Sourced::from_input(span, action)
}

fn translate_selection(selection: Pair<Rule>) -> Stage2Selection {
    assert_eq!(Rule::selection, selection.as_rule());

    let inner = selection.into_inner().next().expect("Has to be valid syntax");

    match inner.as_rule() {
        Rule::star => Stage2Selection::Everything(inner.as_span().into()),
        Rule::field_list => {
            Stage2Selection::Fields(inner.into_inner().map(translate_field).collect())
        }
        _ => panic!("Unknown selection {:#?}", inner.as_rule()),
    }
}

fn translate_field(field: Pair<Rule>) -> Sourced<FieldInput> {
    assert_eq!(Rule::field, field.as_rule());

    let span = field.as_span();
    let mut inners = field.into_inner();

    let column = translate_column(inners.next().expect("Has to be valid syntax"));
    let alias = inners.next().map(|alias| {
        let name = alias
            .into_inner()
            .find(|inner| inner.as_rule() == Rule::identifier)
            .expect("aliases always have a name because of pest syntax");

        Sourced::from_input(name.as_span(), name.as_str())
    });

    Sourced::from_input(span, FieldInput { column, alias })
}

fn translate_from(from: Pair<Rule>) -> Stage2Clause {
    assert_eq!(Rule::from_clause, from.as_rule());

    let table = from
        .into_inner()
        .find(|inner| inner.as_rule() == Rule::table)
        .expect("DE is always followed by a table because of pest syntax");

    Stage2Clause::From(Sourced::from_input(table.as_span(), table.as_str()))
}

fn translate_where(where_clause: Pair<Rule>) -> Stage2Clause {
    assert_eq!(Rule::where_clause, where_clause.as_rule());

    let mut conditions = Vec::new();
    let mut connectives = Vec::new();

    for inner in where_clause.into_inner() {
        match inner.as_rule() {
            Rule::condition => conditions.push(translate_condition(inner)),
            Rule::kw_e => connectives.push(Connective::And),
            Rule::kw_ou => connectives.push(Connective::Or),
            _ => {}
        }
    }

    Stage2Clause::Where {
        conditions,
        connectives,
    }
}

fn translate_condition(condition: Pair<Rule>) -> Sourced<ConditionInput> {
    let span = condition.as_span();
    let mut inners = condition.into_inner();

    let column = translate_column(inners.next().expect("Has to be valid syntax"));
    let operands = inners.next().expect("Has to be valid syntax");
    assert_eq!(Rule::operands, operands.as_rule());

    let mut separator = OperandSeparator::Single;
    let mut items = Vec::new();

    for inner in operands.into_inner() {
        match inner.as_rule() {
            Rule::operand => items.push(translate_operand(inner)),
            Rule::list_tail | Rule::conjunction_tail => {
                separator = if inner.as_rule() == Rule::list_tail {
                    OperandSeparator::Comma
                } else {
                    OperandSeparator::Conjunction
                };

                // The tails also hold the "E" keywords, we only want the operands.
                items.extend(
                    inner
                        .into_inner()
                        .filter(|tail_item| tail_item.as_rule() == Rule::operand)
                        .map(translate_operand),
                );
            }
            _ => panic!("Unknown operand {:#?}", inner.as_rule()),
        }
    }

    Sourced::from_input(
        span,
        ConditionInput {
            column,
            separator,
            operands: items,
        },
    )
}

fn translate_operand(operand: Pair<Rule>) -> Sourced<OperandInput> {
    assert_eq!(Rule::operand, operand.as_rule());

    let span = operand.as_span();
    let inner = operand.into_inner().next().expect("Has to be valid syntax");

    let operand = match inner.as_rule() {
        Rule::call => {
            let mut call_inners = inner.into_inner();
            let name = call_inners.next().expect("Has to be valid syntax");
            let offset = call_inners
                .next()
                .map(|offset| Sourced::from_input(offset.as_span(), offset.as_str()));

            OperandInput::Call {
                name: Sourced::from_input(name.as_span(), name.as_str()),
                offset,
            }
        }
        // Empty quotes still give us a pair, but don't rely on it.
        Rule::string => OperandInput::Quoted(
            inner
                .into_inner()
                .next()
                .map(|text| text.as_str())
                .unwrap_or_default(),
        ),
        Rule::number => OperandInput::Number(inner.as_str()),
        Rule::word => OperandInput::Word(inner.as_str()),
        _ => panic!("Unknown operand {:#?}", inner.as_rule()),
    };

    Sourced::from_input(span, operand)
}

fn translate_order_item(item: Pair<Rule>) -> Sourced<OrderInput> {
    assert_eq!(Rule::order_item, item.as_rule());

    let span = item.as_span();
    let mut inners = item.into_inner();

    let column = translate_column(inners.next().expect("Has to be valid syntax"));
    let descending = inners
        .next()
        .and_then(|direction| direction.into_inner().next())
        .map(|direction| direction.as_rule() == Rule::descending)
        .unwrap_or(false);

    Sourced::from_input(span, OrderInput { column, descending })
}

fn translate_limit(limit: Pair<Rule>) -> Stage2Clause {
    assert_eq!(Rule::limit_clause, limit.as_rule());

    let value = limit
        .into_inner()
        .find(|inner| inner.as_rule() == Rule::limit_value)
        .expect("LIMITE is always followed by a number because of pest syntax");

    Stage2Clause::Limit(Sourced::from_input(value.as_span(), value.as_str()))
}

pub fn translate_column(column: Pair<Rule>) -> Sourced<ColumnInput> {
    assert_eq!(Rule::column, column.as_rule());

    let span = column.as_span();
    let names: Vec<_> = column
        .into_inner()
        .map(|name| Sourced::from_input(name.as_span(), name.as_str()))
        .collect();

    let column = match names.as_slice() {
        [column] => ColumnInput {
            table: None,
            column: *column,
        },
        [table, column] => ColumnInput {
            table: Some(*table),
            column: *column,
        },
        _ => panic!("Columns have one or two parts, found {:#?}", names),
    };

    Sourced::from_input(span, column)
}

/// Pest spans keep the whitespace skipped after their last token, positions don't.
impl From<Span<'_>> for Position {
    fn from(span: Span) -> Self {
        Position {
            start: span.start(),
            end: span.start() + span.as_str().trim_end().len(),
        }
    }
}
