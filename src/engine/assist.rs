//! Help for people typing queries: validation and keyword suggestions.
//!
//! Suggestions have to work on broken input, so they don't go through the grammar. Instead, a
//! small tokenizer feeds a state machine that follows the clause order.
use crate::engine::syntax::{fold_keyword, parse};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Checks a query without rendering it. Never fails, problems are reported in the result.
pub fn validate(input: &str) -> Validation {
    match parse(input) {
        Ok(_) => Validation {
            valid: true,
            errors: Vec::new(),
        },
        Err(error) => Validation {
            valid: false,
            errors: vec![error.summary()],
        },
    }
}

const ACTIONS: &[&str] = &["MOSTRAR", "SOMAR", "CONTAR", "MEDIA", "MAX", "MIN"];
const AFTER_ACTION: &[&str] = &["DE"];
const AFTER_TABLE: &[&str] = &["ONDE", "AGRUPADO POR", "ORDENADO POR", "LIMITE"];
const AFTER_CONDITION: &[&str] = &["E", "OU", "AGRUPADO POR", "ORDENADO POR", "LIMITE"];
const AFTER_GROUP_OR_ORDER_KEYWORD: &[&str] = &["POR"];
const AFTER_GROUP_COLUMN: &[&str] = &["ORDENADO POR", "LIMITE"];
const AFTER_ORDER_COLUMN: &[&str] = &["ASC", "DESC", "LIMITE"];
const AFTER_ORDER_DIRECTION: &[&str] = &["LIMITE"];

/// Keywords that could come next at `cursor`, which counts chars, not bytes.
///
/// If the cursor is at the end of a word, only keywords starting with that word are returned.
pub fn suggestions(input: &str, cursor: usize) -> Vec<&'static str> {
    let before_cursor: String = input.chars().take(cursor).collect();
    let tokens = tokenize(&before_cursor);

    if tokens.last().is_some_and(|token| is_open_quote(token)) {
        return Vec::new();
    }

    // The word being typed doesn't count towards the state, it's what we're completing.
    let prefix = match tokens.last() {
        Some(last) if before_cursor.ends_with(last) && last.chars().all(is_word_char) => *last,
        _ => "",
    };
    let complete_tokens = &tokens[..tokens.len() - usize::from(!prefix.is_empty())];

    let state = complete_tokens
        .iter()
        .fold(State::Start, |state, token| state.next(token));
    let folded_prefix = fold_keyword(prefix);

    state
        .candidates()
        .iter()
        .copied()
        .filter(|candidate| candidate.starts_with(&folded_prefix))
        .collect()
}

fn tokenize(input: &str) -> Vec<&str> {
    static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#""[^"]*"?|'[^']*'?|[\p{Alphabetic}\d_]+|\S"#).unwrap()
    });

    TOKEN_REGEX.find_iter(input).map(|token| token.as_str()).collect()
}

fn is_open_quote(token: &str) -> bool {
    let Some(quote) = token.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return false;
    };

    token.chars().count() == 1 || !token.ends_with(quote)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    /// Fields, or nothing, until DE.
    Selecting,
    ExpectingTable,
    AfterTable,
    Condition(ConditionState),
    AfterGroupKeyword,
    Grouping { after_column: bool },
    AfterOrderKeyword,
    Ordering(OrderState),
    AfterLimitKeyword,
    Done,
    /// We don't know where we are, so we don't suggest anything.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConditionState {
    ExpectingColumn,
    ExpectingEquals,
    ExpectingValue,
    InCall,
    AfterValue,
    AfterConjunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderState {
    ExpectingColumn,
    AfterColumn,
    AfterDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Keyword(&'static str),
    Word,
    Literal,
    Symbol(char),
}

impl Token {
    fn classify(token: &str) -> Token {
        const KEYWORDS: &[&str] = &[
            "MOSTRAR",
            "SOMAR",
            "CONTAR",
            "MEDIA",
            "MAX",
            "MAXIMO",
            "MIN",
            "MINIMO",
            "DE",
            "ONDE",
            "E",
            "OU",
            "AGRUPADO",
            "ORDENADO",
            "POR",
            "LIMITE",
            "ASC",
            "DESC",
            "CRESCENTE",
            "DECRESCENTE",
        ];

        let folded = fold_keyword(token);
        if let Some(keyword) = KEYWORDS.iter().find(|keyword| **keyword == folded) {
            return Token::Keyword(*keyword);
        }

        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some('"' | '\''), _) => Token::Literal,
            (Some(digit), _) if digit.is_ascii_digit() => Token::Literal,
            (Some(symbol), None) if !is_word_char(symbol) => Token::Symbol(symbol),
            _ => Token::Word,
        }
    }
}

impl State {
    fn next(self, token: &str) -> State {
        use ConditionState as C;

        let token = Token::classify(token);

        match (self, token) {
            (State::Lost, _) => State::Lost,
            (State::Start, Token::Keyword(keyword)) if is_action(keyword) => State::Selecting,
            (State::Selecting, Token::Keyword("DE")) => State::ExpectingTable,
            (State::Selecting, Token::Word | Token::Symbol(',' | '.' | '*')) => State::Selecting,
            // Only clause keywords are reserved, these can still be column names.
            (State::Selecting, Token::Keyword(keyword))
                if keyword == "POR" || is_direction(keyword) =>
            {
                State::Selecting
            }
            (State::ExpectingTable, Token::Word) => State::AfterTable,
            (State::AfterTable, Token::Keyword("ONDE")) => State::Condition(C::ExpectingColumn),

            (State::Condition(C::ExpectingColumn), Token::Word) => {
                State::Condition(C::ExpectingEquals)
            }
            (State::Condition(C::ExpectingEquals), Token::Symbol('.')) => {
                State::Condition(C::ExpectingColumn)
            }
            (State::Condition(C::ExpectingEquals | C::AfterValue), Token::Symbol('=')) => {
                State::Condition(C::ExpectingValue)
            }
            (State::Condition(C::ExpectingValue), Token::Word | Token::Literal) => {
                State::Condition(C::AfterValue)
            }
            (State::Condition(C::ExpectingValue), Token::Symbol('-')) => {
                State::Condition(C::ExpectingValue)
            }
            (State::Condition(C::AfterValue), Token::Symbol('(')) => State::Condition(C::InCall),
            (State::Condition(C::InCall), Token::Symbol(')')) => State::Condition(C::AfterValue),
            (State::Condition(C::InCall), _) => State::Condition(C::InCall),
            (State::Condition(C::AfterValue), Token::Symbol(',')) => {
                State::Condition(C::ExpectingValue)
            }
            (State::Condition(C::AfterValue), Token::Symbol('.')) => {
                State::Condition(C::ExpectingColumn)
            }
            (State::Condition(C::AfterValue), Token::Keyword("E")) => {
                State::Condition(C::AfterConjunction)
            }
            (State::Condition(C::AfterValue), Token::Keyword("OU")) => {
                State::Condition(C::ExpectingColumn)
            }
            // Either the next condition's column, or the end of a range like "mes(-3) e mes".
            (State::Condition(C::AfterConjunction), Token::Word) => {
                State::Condition(C::AfterValue)
            }
            (State::Condition(C::AfterConjunction), Token::Literal) => {
                State::Condition(C::AfterValue)
            }

            (State::AfterGroupKeyword, Token::Keyword("POR")) => {
                State::Grouping { after_column: false }
            }
            (State::Grouping { after_column: false }, Token::Word) => {
                State::Grouping { after_column: true }
            }
            (State::Grouping { after_column: true }, Token::Symbol(',' | '.')) => {
                State::Grouping { after_column: false }
            }

            (State::AfterOrderKeyword, Token::Keyword("POR")) => {
                State::Ordering(OrderState::ExpectingColumn)
            }
            (State::Ordering(OrderState::ExpectingColumn), Token::Word) => {
                State::Ordering(OrderState::AfterColumn)
            }
            (State::Ordering(OrderState::AfterColumn), Token::Keyword(keyword))
                if is_direction(keyword) =>
            {
                State::Ordering(OrderState::AfterDirection)
            }
            (
                State::Ordering(OrderState::AfterColumn | OrderState::AfterDirection),
                Token::Symbol(','),
            )
            | (State::Ordering(OrderState::AfterColumn), Token::Symbol('.')) => {
                State::Ordering(OrderState::ExpectingColumn)
            }

            (State::AfterLimitKeyword, Token::Literal) => State::Done,
            (State::Done, Token::Symbol(';')) => State::Done,

            (state, Token::Keyword(keyword)) => state.next_clause(keyword),
            (state, Token::Symbol(';')) if state.can_end() => State::Done,
            _ => State::Lost,
        }
    }

    /// Moves on to a later clause, if `keyword` starts one that may follow this state.
    fn next_clause(self, keyword: &str) -> State {
        let allowed: &[&str] = match self {
            State::AfterTable | State::Condition(ConditionState::AfterValue) => {
                &["AGRUPADO", "ORDENADO", "LIMITE"]
            }
            State::Grouping { after_column: true } => &["ORDENADO", "LIMITE"],
            State::Ordering(OrderState::AfterColumn | OrderState::AfterDirection) => &["LIMITE"],
            _ => &[],
        };

        if !allowed.contains(&keyword) {
            return State::Lost;
        }

        match keyword {
            "AGRUPADO" => State::AfterGroupKeyword,
            "ORDENADO" => State::AfterOrderKeyword,
            _ => State::AfterLimitKeyword,
        }
    }

    fn can_end(self) -> bool {
        matches!(
            self,
            State::AfterTable
                | State::Condition(ConditionState::AfterValue)
                | State::Grouping { after_column: true }
                | State::Ordering(OrderState::AfterColumn | OrderState::AfterDirection)
        )
    }

    fn candidates(self) -> &'static [&'static str] {
        match self {
            State::Start => ACTIONS,
            State::Selecting => AFTER_ACTION,
            State::AfterTable => AFTER_TABLE,
            State::Condition(ConditionState::AfterValue) => AFTER_CONDITION,
            State::AfterGroupKeyword | State::AfterOrderKeyword => AFTER_GROUP_OR_ORDER_KEYWORD,
            State::Grouping { after_column: true } => AFTER_GROUP_COLUMN,
            State::Ordering(OrderState::AfterColumn) => AFTER_ORDER_COLUMN,
            State::Ordering(OrderState::AfterDirection) => AFTER_ORDER_DIRECTION,
            _ => &[],
        }
    }
}

fn is_action(keyword: &str) -> bool {
    matches!(
        keyword,
        "MOSTRAR" | "SOMAR" | "CONTAR" | "MEDIA" | "MAX" | "MAXIMO" | "MIN" | "MINIMO"
    )
}

fn is_direction(keyword: &str) -> bool {
    matches!(keyword, "ASC" | "DESC" | "CRESCENTE" | "DECRESCENTE")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggest(input: &str) -> Vec<&'static str> {
        suggestions(input, input.chars().count())
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            Validation {
                valid: true,
                errors: vec![],
            },
            validate("MOSTRAR nome DE funcionarios ONDE admissao = mes(-1)")
        );

        let validation = validate("MOSTRAR nome DE funcionarios ONDE");
        assert!(!validation.valid);
        assert_eq!(1, validation.errors.len());
        assert!(validation.errors[0].starts_with("line 1, column 34: expected"));
    }

    #[test]
    fn test_validate_is_plain_text() {
        let validation = validate("MOSTRAR DE funcionarios ONDE status = a e b");

        assert!(!validation.valid);
        assert!(!validation.errors[0].contains('\u{1b}'));
    }

    #[test]
    fn test_suggestions_follow_the_clauses() {
        assert_eq!(ACTIONS, suggest("").as_slice());
        assert_eq!(vec!["DE"], suggest("MOSTRAR "));
        assert_eq!(vec!["DE"], suggest("MOSTRAR nome, salario COMO s "));
        assert!(suggest("MOSTRAR nome DE ").is_empty());
        assert_eq!(AFTER_TABLE, suggest("MOSTRAR nome DE funcionarios ").as_slice());
        assert!(suggest("MOSTRAR nome DE funcionarios ONDE ").is_empty());
        assert!(suggest("MOSTRAR nome DE funcionarios ONDE idade ").is_empty());
        assert!(suggest("MOSTRAR nome DE funcionarios ONDE idade = ").is_empty());
        assert_eq!(
            AFTER_CONDITION,
            suggest("MOSTRAR nome DE funcionarios ONDE idade = 25 ").as_slice()
        );
        assert_eq!(
            AFTER_CONDITION,
            suggest("MOSTRAR nome DE funcionarios ONDE admissao = mes(-3) e mes ").as_slice()
        );
        assert_eq!(vec!["POR"], suggest("CONTAR DE funcionarios AGRUPADO "));
        assert_eq!(
            AFTER_GROUP_COLUMN,
            suggest("CONTAR DE funcionarios AGRUPADO POR departamento ").as_slice()
        );
        assert_eq!(
            AFTER_ORDER_COLUMN,
            suggest("MOSTRAR * DE funcionarios ORDENADO POR nome ").as_slice()
        );
        assert!(suggest("MOSTRAR * DE funcionarios LIMITE 10 ").is_empty());
    }

    #[test]
    fn test_suggestions_complete_the_current_word() {
        assert_eq!(vec!["MOSTRAR", "MEDIA", "MAX", "MIN"], suggest("m"));
        assert_eq!(vec!["MEDIA"], suggest("mé"));
        assert_eq!(vec!["ORDENADO POR"], suggest("MOSTRAR * DE funcionarios ONDE a = 1 ord"));
        assert!(suggest("MOSTRAR no").is_empty());
        assert_eq!(
            vec!["OU", "ORDENADO POR"],
            suggest("MOSTRAR * DE funcionarios ONDE a = 1 o")
        );
    }

    #[test]
    fn test_suggestions_after_ou() {
        assert!(suggest("MOSTRAR * DE funcionarios ONDE a = 1 OU ").is_empty());
        assert_eq!(
            AFTER_CONDITION,
            suggest("MOSTRAR * DE funcionarios ONDE a = 1 ou b = hoje ").as_slice()
        );
    }

    #[test]
    fn test_no_suggestions_inside_quotes() {
        assert!(suggest("MOSTRAR * DE funcionarios ONDE cargo = \"gerente ").is_empty());
        assert!(suggest("MOSTRAR * DE funcionarios ONDE cargo = 'DE").is_empty());
    }

    #[test]
    fn test_cursor_is_clamped_and_counts_chars() {
        let input = "MÉDIA salario ";

        assert_eq!(vec!["DE"], suggestions(input, 1000));
        // Cursor right after "MÉ"
        assert_eq!(vec!["MEDIA"], suggestions(input, 2));
    }

    #[test]
    fn test_out_of_order_clauses_get_nothing() {
        assert!(suggest("MOSTRAR * DE funcionarios LIMITE 3 ONDE ").is_empty());
        assert!(suggest("DE funcionarios ").is_empty());
    }
}
