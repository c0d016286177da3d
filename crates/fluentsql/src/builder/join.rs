//! Table references and JOIN clauses.

use std::str::FromStr;
use std::sync::OnceLock;

use crate::builder::select::Select;
use crate::builder::{SqlStatement, StatementKind};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::expr::Expression;

/// Matches `table alias` and `table AS alias`.
fn aliased_re() -> &'static regex::Regex {
    static ALIASED_RE: OnceLock<regex::Regex> = OnceLock::new();
    ALIASED_RE.get_or_init(|| {
        regex::Regex::new(r"(?i)^(\S+)\s+(?:as\s+)?([A-Za-z_][A-Za-z0-9_]*)$")
            .expect("invalid built-in alias regex")
    })
}

/// What a table reference points at.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Name(String),
    /// Sub-select used as a table, rendered in parentheses.
    Select(Box<Select>),
    /// Expression used as a table (e.g. a set-returning function).
    Expr(Expression),
}

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    source: TableSource,
    alias: Option<String>,
}

impl TableRef {
    /// Parse `table`, `table alias` or `table AS alias`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err("table reference is empty".to_string());
        }
        if !spec.contains(char::is_whitespace) {
            return Ok(Self::named(spec));
        }
        match aliased_re().captures(spec) {
            Some(caps) => Ok(Self::aliased(&caps[1], &caps[2])),
            None => Err(format!(
                "invalid table reference '{spec}': expected `table`, `table alias` or `table AS alias`"
            )),
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            source: TableSource::Name(name.trim().to_string()),
            alias: None,
        }
    }

    /// Alias-map form: `alias => table`.
    pub fn aliased(name: &str, alias: &str) -> Self {
        Self {
            source: TableSource::Name(name.trim().to_string()),
            alias: Some(alias.trim().to_string()),
        }
    }

    pub fn subquery(select: Select, alias: &str) -> Self {
        Self {
            source: TableSource::Select(Box::new(select)),
            alias: Some(alias.trim().to_string()),
        }
    }

    pub fn expr(expr: Expression, alias: &str) -> Self {
        Self {
            source: TableSource::Expr(expr),
            alias: Some(alias.trim().to_string()),
        }
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub(crate) fn set_alias(&mut self, alias: &str) {
        self.alias = Some(alias.to_string());
    }

    /// Render `quoted_table [AS alias]`.
    pub fn render(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        let mut out = match &self.source {
            TableSource::Name(name) => dialect.quote_table(name),
            TableSource::Select(select) => format!("({})", select.render_with(dialect)?),
            TableSource::Expr(expr) => format!("({})", expr.render(dialect, None)?),
        };
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
        Ok(out)
    }
}

/// JOIN flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Outer,
    Left,
    Right,
    Full,
    Cross,
    Natural,
    /// Bare `JOIN`.
    Plain,
}

impl JoinType {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Outer => "OUTER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
            Self::Natural => "NATURAL JOIN",
            Self::Plain => "JOIN",
        }
    }

    /// Joins that are complete without an ON predicate.
    fn allows_empty_on(self) -> bool {
        matches!(self, Self::Cross | Self::Natural)
    }
}

impl FromStr for JoinType {
    type Err = SqlError;

    fn from_str(s: &str) -> SqlResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(Self::Inner),
            "outer" => Ok(Self::Outer),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "full" => Ok(Self::Full),
            "cross" => Ok(Self::Cross),
            "natural" => Ok(Self::Natural),
            "" => Ok(Self::Plain),
            other => Err(SqlError::builder(format!("unknown join type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Join {
    join_type: JoinType,
    table: TableRef,
    on: String,
}

/// Joins of one statement, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinList {
    kind: StatementKind,
    joins: Vec<Join>,
    build_error: Option<String>,
}

impl JoinList {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            joins: Vec::new(),
            build_error: None,
        }
    }

    /// Fail unless statements of `kind` accept joins.
    pub fn check_kind(kind: StatementKind) -> SqlResult<()> {
        if kind.supports_joins() {
            Ok(())
        } else {
            Err(SqlError::builder(format!(
                "joins are only allowed on SELECT and UPDATE statements, not {kind}"
            )))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    /// Aliases introduced by the joined tables.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.joins.iter().filter_map(|j| j.table.alias())
    }

    fn set_error(&mut self, message: String) {
        if self.build_error.is_none() {
            self.build_error = Some(message);
        }
    }

    /// Add a join against a parsed table reference.
    pub fn push(&mut self, table: TableRef, on: &str, join_type: JoinType) {
        if let Err(e) = Self::check_kind(self.kind) {
            self.set_error(e.to_string());
            return;
        }
        let on = on.trim();
        if on.is_empty() && !join_type.allows_empty_on() {
            self.set_error(format!("{} requires an ON predicate", join_type.keyword()));
            return;
        }
        self.joins.push(Join {
            join_type,
            table,
            on: on.to_string(),
        });
    }

    /// Add a join from a `table [AS] [alias]` string.
    pub fn push_spec(&mut self, table: &str, on: &str, join_type: JoinType) {
        match TableRef::parse(table) {
            Ok(table) => self.push(table, on, join_type),
            Err(e) => self.set_error(e),
        }
    }

    /// Render all joins separated by a space (empty when none).
    pub fn render(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        if let Some(err) = &self.build_error {
            return Err(SqlError::builder(err.clone()));
        }
        let mut parts = Vec::with_capacity(self.joins.len());
        for join in &self.joins {
            let mut s = format!("{} {}", join.join_type.keyword(), join.table.render(dialect)?);
            if !join.on.is_empty() {
                s.push_str(" ON ");
                s.push_str(&join.on);
            }
            parts.push(s);
        }
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::EngineType;

    fn render(list: &JoinList) -> SqlResult<String> {
        list.render(&Dialect::new(&EngineType::Mysql))
    }

    #[test]
    fn table_ref_forms() {
        let d = EngineType::Postgres;
        let d = Dialect::new(&d);
        assert_eq!(TableRef::parse("users").unwrap().render(&d).unwrap(), r#""users""#);
        assert_eq!(TableRef::parse("users u").unwrap().render(&d).unwrap(), r#""users" AS u"#);
        assert_eq!(
            TableRef::parse("app.users AS u").unwrap().render(&d).unwrap(),
            r#""app"."users" AS u"#
        );
        assert_eq!(TableRef::aliased("orders", "o").render(&d).unwrap(), r#""orders" AS o"#);
        assert!(TableRef::parse("").is_err());
        assert!(TableRef::parse("a b c").is_err());
    }

    #[test]
    fn join_types_render_in_insertion_order() {
        let mut list = JoinList::new(StatementKind::Select);
        list.push_spec("orders o", "o.user_id = u.id", JoinType::Left);
        list.push_spec("items", "items.order_id = o.id", JoinType::Plain);
        assert_eq!(
            render(&list).unwrap(),
            "LEFT JOIN `orders` AS o ON o.user_id = u.id JOIN `items` ON items.order_id = o.id"
        );
    }

    #[test]
    fn cross_join_without_on() {
        let mut list = JoinList::new(StatementKind::Update);
        list.push_spec("sizes", "", JoinType::Cross);
        assert_eq!(render(&list).unwrap(), "CROSS JOIN `sizes`");
    }

    #[test]
    fn inner_join_requires_on() {
        let mut list = JoinList::new(StatementKind::Select);
        list.push_spec("orders", "  ", JoinType::Inner);
        assert!(render(&list).unwrap_err().is_builder());
    }

    #[test]
    fn joins_rejected_on_insert_and_delete() {
        for kind in [StatementKind::Insert, StatementKind::Delete, StatementKind::Truncate] {
            let mut list = JoinList::new(kind);
            list.push_spec("orders o", "o.id = 1", JoinType::Inner);
            assert!(list.build_error().is_some());
            assert!(JoinList::check_kind(kind).unwrap_err().is_builder());
        }
        assert!(JoinList::check_kind(StatementKind::Select).is_ok());
        assert!(JoinList::check_kind(StatementKind::Update).is_ok());
    }

    #[test]
    fn join_type_parse() {
        assert_eq!("".parse::<JoinType>().unwrap(), JoinType::Plain);
        assert_eq!("NATURAL".parse::<JoinType>().unwrap(), JoinType::Natural);
        assert_eq!(JoinType::Full.keyword(), "FULL JOIN");
        assert!("sideways".parse::<JoinType>().unwrap_err().is_builder());
    }
}
