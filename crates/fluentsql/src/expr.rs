//! Function-call expressions usable as fields and values.

use crate::dialect::{Dialect, EngineType};
use crate::error::SqlResult;
use crate::ident::Ident;
use crate::value::Value;

/// One argument of an [`Expression`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Column reference, quoted by the dialect and qualified by the table alias.
    Column(String),
    /// Bound value, formatted like any other value.
    Value(Value),
    /// Verbatim SQL (e.g. `*`, `DISTINCT id`).
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
enum ExprKind {
    Call {
        function: String,
        operands: Vec<Operand>,
    },
    Literal(String),
}

/// A dialect-formatted `FUNCTION(operand, ...) [AS alias]` fragment.
///
/// ```ignore
/// let e = Expression::count("*").as_alias("counter");
/// assert_eq!(e.to_sql(EngineType::Mysql)?, "COUNT(*) AS counter");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    kind: ExprKind,
    alias: Option<String>,
    qualifier: Option<String>,
}

impl Expression {
    /// Start a call expression; the function name is upper-cased.
    pub fn call(function: &str) -> Self {
        Self {
            kind: ExprKind::Call {
                function: function.trim().to_ascii_uppercase(),
                operands: Vec::new(),
            },
            alias: None,
            qualifier: None,
        }
    }

    /// Verbatim SQL used where an expression is expected (e.g. `NOW()`).
    pub fn literal(sql: impl Into<String>) -> Self {
        Self {
            kind: ExprKind::Literal(sql.into()),
            alias: None,
            qualifier: None,
        }
    }

    /// `COUNT(column)`; `*` is kept bare.
    pub fn count(column: &str) -> Self {
        Self::call("count").column(column)
    }

    pub fn sum(column: &str) -> Self {
        Self::call("sum").column(column)
    }

    pub fn min(column: &str) -> Self {
        Self::call("min").column(column)
    }

    pub fn max(column: &str) -> Self {
        Self::call("max").column(column)
    }

    pub fn avg(column: &str) -> Self {
        Self::call("avg").column(column)
    }

    /// `DISTINCT(column)`.
    pub fn distinct(column: &str) -> Self {
        Self::call("distinct").column(column)
    }

    /// Append a column operand.
    pub fn column(self, column: &str) -> Self {
        self.arg(Operand::Column(column.to_string()))
    }

    /// Append a value operand.
    pub fn value(self, value: impl Into<Value>) -> Self {
        self.arg(Operand::Value(value.into()))
    }

    /// Append a verbatim operand.
    pub fn raw(self, sql: &str) -> Self {
        self.arg(Operand::Raw(sql.to_string()))
    }

    pub fn arg(mut self, operand: Operand) -> Self {
        if let ExprKind::Call { operands, .. } = &mut self.kind {
            operands.push(operand);
        }
        self
    }

    /// Output label: `... AS label`.
    pub fn as_alias(mut self, label: &str) -> Self {
        self.alias = Some(label.to_string());
        self
    }

    /// Table alias used to qualify unqualified column operands.
    pub fn qualify(mut self, table_alias: &str) -> Self {
        self.qualifier = Some(table_alias.to_string());
        self
    }

    /// Render under `dialect`.
    ///
    /// `default_qualifier` applies to column operands when the expression has no
    /// qualifier of its own (aliased SELECT rendering).
    pub fn render(&self, dialect: &Dialect<'_>, default_qualifier: Option<&str>) -> SqlResult<String> {
        let mut out = match &self.kind {
            ExprKind::Literal(sql) => sql.clone(),
            ExprKind::Call { function, operands } => {
                let qualifier = self.qualifier.as_deref().or(default_qualifier);
                let mut args = Vec::with_capacity(operands.len());
                for operand in operands {
                    args.push(match operand {
                        Operand::Column(c) => {
                            let ident = Ident::parse(c);
                            if ident.is_star() {
                                "*".to_string()
                            } else {
                                match qualifier {
                                    Some(q) if ident.parts().len() == 1 => {
                                        format!("{q}.{}", dialect.quote_ident(&ident))
                                    }
                                    _ => dialect.quote_ident(&ident),
                                }
                            }
                        }
                        Operand::Value(v) => dialect.format_value(v)?,
                        Operand::Raw(sql) => sql.clone(),
                    });
                }
                format!("{}({})", function, args.join(", "))
            }
        };
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
        Ok(out)
    }

    /// Render offline for `engine`.
    pub fn to_sql(&self, engine: EngineType) -> SqlResult<String> {
        self.render(&Dialect::new(&engine), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_star_with_alias() {
        let e = Expression::count("*").as_alias("counter");
        assert_eq!(e.to_sql(EngineType::Mysql).unwrap(), "COUNT(*) AS counter");
    }

    #[test]
    fn test_function_name_upper_cased() {
        let e = Expression::call("coalesce").column("nick").value("anon");
        assert_eq!(
            e.to_sql(EngineType::Postgres).unwrap(),
            r#"COALESCE("nick", 'anon')"#
        );
    }

    #[test]
    fn test_empty_call() {
        assert_eq!(Expression::call("now").to_sql(EngineType::Mysql).unwrap(), "NOW()");
    }

    #[test]
    fn test_qualifier() {
        let e = Expression::max("price").qualify("p");
        assert_eq!(e.to_sql(EngineType::Mysql).unwrap(), "MAX(p.`price`)");

        let d = EngineType::Mysql;
        let dialect = Dialect::new(&d);
        let e = Expression::sum("total");
        assert_eq!(e.render(&dialect, Some("o")).unwrap(), "SUM(o.`total`)");
        // own qualifier wins over the default
        let e = Expression::sum("total").qualify("x");
        assert_eq!(e.render(&dialect, Some("o")).unwrap(), "SUM(x.`total`)");
        // already-qualified operands are left alone
        let e = Expression::sum("app.orders.total");
        assert_eq!(e.render(&dialect, Some("o")).unwrap(), "SUM(`app`.`orders`.`total`)");
    }

    #[test]
    fn test_raw_and_literal() {
        let e = Expression::call("count").raw("DISTINCT user_id").as_alias("n");
        assert_eq!(e.to_sql(EngineType::Postgres).unwrap(), "COUNT(DISTINCT user_id) AS n");
        assert_eq!(
            Expression::literal("CURRENT_DATE").to_sql(EngineType::Postgres).unwrap(),
            "CURRENT_DATE"
        );
    }
}
