use crate::engine::calendar::period_range;
use crate::engine::query::{
    Action, ColumnRef, Condition, Connective, Field, OrderDirection, OrderItem, ParsedQuery,
    TemporalUnit,
};
use crate::engine::rendering::params::{Binder, SqlValue};
use crate::engine::rendering::{OptionalClause, RenderOptions};
use crate::engine::tenant::TenantContext;
use crate::engine::Sourced;
use crate::error::{ConditionError, Error, InternalError, UnsupportedReason};
use chrono::NaiveDate;
use std::fmt::{Display, Formatter};

/// Every part of the statement, with values already swapped for placeholders.
pub(super) struct Statement {
    select: Vec<String>,
    from: String,
    filters: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
}

pub(super) fn build_statement(
    query: &ParsedQuery,
    tenant: &TenantContext,
    options: &RenderOptions,
    binder: &mut Binder,
) -> Result<Statement, Error> {
    let table = &query.table.it;

    // The tenant predicate goes first, and it's the only thing we ever bind before user values.
    let mut filters = vec![format!(
        "{table}.{column} = {tenant}",
        column = options.tenant_column.as_str(),
        tenant = binder.bind(SqlValue::Text(tenant.as_str().to_string())),
    )];

    let mut conditions = Vec::with_capacity(query.conditions.len());
    for condition in &query.conditions {
        check_not_tenant_column(query, condition, options)?;

        conditions.push(render_condition(
            &condition.it,
            query.reference_date,
            options,
            binder,
        )?);
    }

    if query.connectives.contains(&Connective::Or) {
        // OU must never escape the tenant predicate.
        filters.push(format!("({})", join_conditions(&conditions, &query.connectives)?));
    } else {
        filters.extend(conditions);
    }

    Ok(Statement {
        select: render_select(query),
        from: table.to_string(),
        filters,
        group_by: query
            .group_by
            .iter()
            .map(|column| column.it.to_string())
            .collect(),
        order_by: query
            .order_by
            .iter()
            .map(|order| render_order(&order.it))
            .collect(),
        limit: query
            .limit
            .map(|limit| limit.it)
            .or(options.default_limit),
    })
}

fn join_conditions(conditions: &[String], connectives: &[Connective]) -> Result<String, Error> {
    if connectives.len() + 1 != conditions.len() {
        return Err(InternalError(format!(
            "{} connectives for {} conditions",
            connectives.len(),
            conditions.len()
        ))
        .into());
    }

    let mut joined = conditions[0].clone();
    for (connective, condition) in connectives.iter().zip(&conditions[1..]) {
        joined.push_str(&format!(" {} {condition}", connective.sql()));
    }

    Ok(joined)
}

fn render_select(query: &ParsedQuery) -> Vec<String> {
    let Some(function) = query.action.it.sql_function() else {
        return query.fields.iter().map(|field| render_field(&field.it, None)).collect();
    };

    // Grouped columns have to be selected for the aggregates to mean anything.
    let mut select: Vec<String> = query
        .group_by
        .iter()
        .map(|column| column.it.to_string())
        .collect();

    if query.fields.is_empty() && query.action.it == Action::Count {
        select.push("COUNT(*)".to_string());
    }

    select.extend(
        query
            .fields
            .iter()
            .map(|field| render_field(&field.it, Some(function))),
    );

    select
}

fn render_field(field: &Field, function: Option<&str>) -> String {
    let mut rendered = match function {
        Some(function) => format!("{function}({})", field.column),
        None => field.column.to_string(),
    };

    if let Some(alias) = &field.alias {
        rendered.push_str(" AS ");
        rendered.push_str(alias);
    }

    rendered
}

fn render_order(order: &OrderItem) -> String {
    match order.direction {
        OrderDirection::Ascending => order.column.to_string(),
        OrderDirection::Descending => format!("{} DESC", order.column),
    }
}

fn render_condition(
    condition: &Condition,
    reference: NaiveDate,
    options: &RenderOptions,
    binder: &mut Binder,
) -> Result<String, Error> {
    let rendered = match condition {
        Condition::Equality { field, value } => format!(
            "{field} = {}",
            binder.bind(SqlValue::from_literal(value, options.value_typing))
        ),
        Condition::InList { field, values } => {
            let placeholders: Vec<_> = values
                .iter()
                .map(|value| binder.bind(SqlValue::from_literal(value, options.value_typing)))
                .collect();

            format!("{field} IN ({})", placeholders.join(", "))
        }
        Condition::TemporalPoint {
            field,
            unit,
            offset,
        } => render_period(field, reference, *unit, *offset, *offset, binder)?,
        Condition::TemporalRange {
            field,
            unit,
            from,
            to,
        } => render_period(field, reference, *unit, *from, *to, binder)?,
    };

    Ok(rendered)
}

fn render_period(
    field: &ColumnRef,
    reference: NaiveDate,
    unit: TemporalUnit,
    from: i32,
    to: i32,
    binder: &mut Binder,
) -> Result<String, Error> {
    // Parsing already checked the dates exist.
    let (start, end) = period_range(reference, unit, from, to).ok_or_else(|| {
        InternalError(format!(
            "{unit}({from}) to {unit}({to}) falls outside of the calendar"
        ))
    })?;

    Ok(format!(
        "{field} >= {start} AND {field} < {end}",
        start = binder.bind(SqlValue::Date(start)),
        end = binder.bind(SqlValue::Date(end)),
    ))
}

fn check_not_tenant_column(
    query: &ParsedQuery,
    condition: &Sourced<Condition>,
    options: &RenderOptions,
) -> Result<(), Error> {
    let field = condition.it.field();

    if !field.column.eq_ignore_ascii_case(options.tenant_column.as_str()) {
        return Ok(());
    }

    Err(ConditionError::new(
        &query.input,
        UnsupportedReason::ReservedColumn(field.column.clone()),
        condition.position().into_iter().collect(),
    )
    .into())
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.select.is_empty() {
            write!(f, "SELECT *")?;
        } else {
            write!(f, "SELECT {}", self.select.join(", "))?;
        }

        write!(f, "\nFROM {}", self.from)?;
        write!(f, "{}", OptionalClause::filter(self.filters.as_slice()))?;
        write!(f, "{}", OptionalClause::group_by(self.group_by.as_slice()))?;
        write!(f, "{}", OptionalClause::order_by(self.order_by.as_slice()))?;

        if let Some(limit) = self.limit {
            write!(f, "\nLIMIT {limit}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::rendering::{render_query, Dialect, RenderOptions, SqlValue, ValueTyping};
    use crate::engine::syntax::parse_with_reference;
    use crate::engine::TenantContext;
    use crate::error::{ErrorKind, UnsupportedReason};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn render_test(
        input: &str,
        options: &RenderOptions,
    ) -> Result<crate::engine::SqlQuery, crate::error::Error> {
        let query = parse_with_reference(input, reference()).unwrap();

        render_query(&query, &TenantContext::new("T1").unwrap(), options)
    }

    fn date(year: i32, month: u32, day: u32) -> SqlValue {
        SqlValue::Date(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }

    #[test]
    fn test_tenant_comes_first() {
        let query = render_test(
            "MOSTRAR nome, salario DE funcionarios ONDE admissao = mes(-1)",
            &RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(
            "SELECT nome, salario\n\
             FROM funcionarios\n\
             WHERE funcionarios.tenant_id = $1 AND admissao >= $2 AND admissao < $3",
            query.sql
        );
        assert_eq!(
            vec![
                SqlValue::Text("T1".to_string()),
                date(2024, 2, 1),
                date(2024, 3, 1),
            ],
            query.params
        );
    }

    #[test]
    fn test_ou_stays_inside_the_tenant_scope() {
        let query = render_test(
            "MOSTRAR nome DE funcionarios ONDE status = ativo E idade = 30 OU cargo = gerente",
            &RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(
            "SELECT nome\n\
             FROM funcionarios\n\
             WHERE funcionarios.tenant_id = $1 AND (status = $2 AND idade = $3 OR cargo = $4)",
            query.sql
        );
        assert_eq!(SqlValue::Text("T1".to_string()), query.params[0]);
        assert_eq!(4, query.params.len());
    }

    #[test]
    fn test_mariadb_and_inferred_values() {
        let options = RenderOptions {
            dialect: Dialect::MariaDb,
            value_typing: ValueTyping::Inferred,
            ..RenderOptions::default()
        };
        let query = render_test(
            "MOSTRAR * DE funcionarios ONDE idade = 25 E status = ativo, \"pendente\"",
            &options,
        )
        .unwrap();

        assert_eq!(
            "SELECT *\n\
             FROM funcionarios\n\
             WHERE funcionarios.tenant_id = ? AND idade = ? AND status IN (?, ?)",
            query.sql
        );
        assert_eq!(
            vec![
                SqlValue::Text("T1".to_string()),
                SqlValue::Integer(25),
                SqlValue::Text("ativo".to_string()),
                SqlValue::Text("pendente".to_string()),
            ],
            query.params
        );
    }

    #[test]
    fn test_aggregates_select_groups_first() {
        let query = render_test(
            "SOMAR salario COMO total DE funcionarios AGRUPADO POR departamento \
             ORDENADO POR departamento DESC LIMITE 5",
            &RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(
            "SELECT departamento, SUM(salario) AS total\n\
             FROM funcionarios\n\
             WHERE funcionarios.tenant_id = $1\n\
             GROUP BY departamento\n\
             ORDER BY departamento DESC\n\
             LIMIT 5",
            query.sql
        );
    }

    #[test]
    fn test_count_without_fields_and_default_limit() {
        let options = RenderOptions {
            default_limit: Some(100),
            ..RenderOptions::default()
        };
        let query = render_test("CONTAR DE funcionarios", &options).unwrap();

        assert_eq!(
            "SELECT COUNT(*)\n\
             FROM funcionarios\n\
             WHERE funcionarios.tenant_id = $1\n\
             LIMIT 100",
            query.sql
        );
    }

    #[test]
    fn test_tenant_column_cannot_be_filtered() {
        let error = render_test(
            "MOSTRAR * DE funcionarios ONDE Tenant_Id = \"outro\"",
            &RenderOptions::default(),
        )
        .unwrap_err();

        match error.into_inner() {
            ErrorKind::UnsupportedCondition(error) => assert_eq!(
                UnsupportedReason::ReservedColumn("Tenant_Id".to_string()),
                error.reason
            ),
            other => panic!("expected an unsupported condition, got {other:?}"),
        }
    }
}
