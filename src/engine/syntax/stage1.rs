//! The stage 1 representation is just the raw output from Pest
use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser;

/// Pest parser
///
/// Pest will autogenerate all of the code needed, and will also give an enum called "Rule" that
/// will have all the rule names from the tql.pest file.
#[derive(Parser)]
#[grammar = "engine/syntax/tql.pest"]
struct Stage1Parser;

pub fn parse_stage1(input: &str) -> Result<Stage1Rep<'_>, crate::error::Error> {
    let pest = Stage1Parser::parse(
        // we've constructed our grammar to always start with a Rule:root node.
        Rule::root,
        input,
    )?; // "?" turns the Pest error into a crate::error::Error, renaming rules on the way

    Ok(Stage1Rep { input, pest })
}

/// Pest pair holder
///
/// Everything up to stage 3 borrows from the input string instead of copying it around.
#[derive(Debug)]
pub struct Stage1Rep<'a> {
    pub input: &'a str,
    pub pest: Pairs<'a, Rule>,
}

/// Names used for rules in error messages.
///
/// Pest would otherwise print things like "expected kw_de or field", which means nothing to
/// someone typing a report query.
pub fn describe_rule(rule: &Rule) -> String {
    let name = match rule {
        Rule::EOI => "end of query",
        Rule::action | Rule::show_clause => "MOSTRAR, SOMAR, CONTAR, MEDIA, MAX or MIN",
        Rule::kw_mostrar => "MOSTRAR",
        Rule::kw_somar => "SOMAR",
        Rule::kw_contar => "CONTAR",
        Rule::kw_media => "MEDIA",
        Rule::kw_maximo => "MAX",
        Rule::kw_minimo => "MIN",
        Rule::kw_de | Rule::from_clause => "DE",
        Rule::kw_onde | Rule::where_clause => "ONDE",
        Rule::kw_e => "E",
        Rule::kw_ou => "OU",
        Rule::kw_agrupado | Rule::group_clause => "AGRUPADO POR",
        Rule::kw_ordenado | Rule::order_clause => "ORDENADO POR",
        Rule::kw_por => "POR",
        Rule::kw_limite | Rule::limit_clause => "LIMITE",
        Rule::kw_como | Rule::alias => "COMO",
        Rule::direction | Rule::ascending | Rule::descending => "ASC or DESC",
        Rule::selection | Rule::field_list | Rule::field => "a field",
        Rule::star => "*",
        Rule::table => "a table name",
        Rule::condition => "a condition",
        Rule::column => "a column",
        Rule::identifier => "a name",
        Rule::operands | Rule::operand => "a value",
        Rule::list_tail => "a list of values",
        Rule::conjunction_tail => "E followed by a value",
        Rule::call => "a function call",
        Rule::offset => "an offset",
        Rule::string => "a quoted value",
        Rule::number => "a number",
        Rule::word => "a word",
        Rule::limit_value => "a row count",
        Rule::order_item => "a column to order by",
        other => return format!("{:?}", other),
    };

    name.to_string()
}
