//! SELECT statement builder.

use std::str::FromStr;
use std::sync::OnceLock;

use crate::builder::join::{JoinList, JoinType, TableRef};
use crate::builder::where_clause::{Conjunction, Predicate, WhereClause};
use crate::builder::{SqlStatement, StatementKind};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::expr::Expression;
use crate::ident::Ident;
use crate::value::IntoValues;

/// Auto-assigned aliases for comma-separated table lists.
const AUTO_ALIASES: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Terms like `COUNT(*)` or `lower(name)` are kept verbatim.
fn call_re() -> &'static regex::Regex {
    static CALL_RE: OnceLock<regex::Regex> = OnceLock::new();
    CALL_RE.get_or_init(|| regex::Regex::new(r"\w+\s*\(").expect("invalid built-in call regex"))
}

/// `column AS label`.
fn labeled_re() -> &'static regex::Regex {
    static LABELED_RE: OnceLock<regex::Regex> = OnceLock::new();
    LABELED_RE.get_or_init(|| {
        regex::Regex::new(r"(?i)^(.+?)\s+as\s+(\S+)$").expect("invalid built-in label regex")
    })
}

/// Split on top-level commas, ignoring commas inside parentheses or quotes.
fn split_list(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in s.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                ',' if depth == 0 => out.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }
    out.push(current);

    out.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for Order {
    type Err = SqlError;

    fn from_str(s: &str) -> SqlResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            other => Err(SqlError::builder(format!("invalid sort direction: '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldTerm {
    /// Column name with an optional output label.
    Column { name: String, label: Option<String> },
    /// Verbatim term such as `COUNT(*)`.
    Raw(String),
    Expr(Expression),
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    qualifier: Option<String>,
    term: FieldTerm,
}

impl Field {
    fn parse(term: &str) -> Self {
        if call_re().is_match(term) {
            return Self {
                qualifier: None,
                term: FieldTerm::Raw(term.to_string()),
            };
        }
        let (column, label) = match labeled_re().captures(term) {
            Some(caps) => (caps[1].trim().to_string(), Some(caps[2].to_string())),
            None => (term.to_string(), None),
        };
        let ident = Ident::parse(&column);
        match ident.parts() {
            [qualifier, name] => Self {
                qualifier: Some(qualifier.clone()),
                term: FieldTerm::Column {
                    name: name.clone(),
                    label,
                },
            },
            _ => Self {
                qualifier: None,
                term: FieldTerm::Column { name: column, label },
            },
        }
    }
}

/// SELECT query builder.
#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    /// FROM tables, in order
    tables: Vec<TableRef>,
    /// Projected fields (empty renders `*`)
    fields: Vec<Field>,
    /// JOIN clauses
    joins: JoinList,
    /// WHERE fragments
    where_clause: WhereClause,
    /// GROUP BY terms
    group_by: Vec<String>,
    /// HAVING predicate
    having: Option<Predicate>,
    /// ORDER BY terms
    order_by: Vec<(String, Order)>,
    /// LIMIT count, OFFSET
    limit: Option<(u64, Option<u64>)>,
    /// Build error
    build_error: Option<String>,
}

impl Default for Select {
    fn default() -> Self {
        Self::new()
    }
}

impl Select {
    /// Create an empty SELECT builder.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            fields: Vec::new(),
            joins: JoinList::new(StatementKind::Select),
            where_clause: WhereClause::new(),
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            build_error: None,
        }
    }

    fn set_error(&mut self, message: impl Into<String>) {
        if self.build_error.is_none() {
            self.build_error = Some(message.into());
        }
    }

    // ==================== FROM ====================

    /// Set the FROM tables.
    ///
    /// - `"users"`: a single unaliased table
    /// - `"users AS u"` / `"users u"`: a single aliased table
    /// - `"users, orders o"`: several tables; those without an alias get the
    ///   letter of their position (`a`, `b`, ...)
    pub fn table(mut self, spec: &str) -> Self {
        let terms = split_list(spec);
        if terms.is_empty() {
            self.set_error("SELECT table is empty");
            return self;
        }
        let many = terms.len() > 1;
        let mut tables = Vec::with_capacity(terms.len());
        for (i, term) in terms.iter().enumerate() {
            let mut table = match TableRef::parse(term) {
                Ok(t) => t,
                Err(e) => {
                    self.set_error(e);
                    return self;
                }
            };
            if many && table.alias().is_none() {
                let Some(letter) = AUTO_ALIASES.get(i) else {
                    self.set_error(format!(
                        "too many tables to alias automatically ({})",
                        terms.len()
                    ));
                    return self;
                };
                table.set_alias(&char::from(*letter).to_string());
            }
            tables.push(table);
        }
        self.tables = tables;
        self
    }

    /// Set the FROM tables from an `alias => table` map.
    pub fn table_aliases<I, A, T>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = (A, T)>,
        A: AsRef<str>,
        T: AsRef<str>,
    {
        self.tables = tables
            .into_iter()
            .map(|(alias, table)| TableRef::aliased(table.as_ref(), alias.as_ref()))
            .collect();
        if self.tables.is_empty() {
            self.set_error("SELECT table map is empty");
        }
        self
    }

    /// Use a sub-select as the FROM table.
    pub fn table_select(mut self, select: Select, alias: &str) -> Self {
        self.tables = vec![TableRef::subquery(select, alias)];
        self
    }

    /// Append one more FROM table reference.
    pub fn add_table(mut self, table: TableRef) -> Self {
        self.tables.push(table);
        self
    }

    // ==================== Fields ====================

    /// Replace the projected fields with a comma-separated list.
    ///
    /// Terms may be alias-qualified (`u.name`), labeled (`name AS n`), `*`, or
    /// function calls kept verbatim (`COUNT(*)`).
    pub fn fields(mut self, spec: &str) -> Self {
        self.fields = split_list(spec).iter().map(|t| Field::parse(t)).collect();
        self
    }

    /// Append columns belonging to one table alias.
    pub fn alias_fields(mut self, alias: &str, columns: &[&str]) -> Self {
        for column in columns {
            let mut field = Field::parse(column);
            if matches!(field.term, FieldTerm::Column { .. }) {
                field.qualifier = Some(alias.to_string());
            }
            self.fields.push(field);
        }
        self
    }

    /// Append an expression field.
    pub fn field_expr(mut self, expr: Expression) -> Self {
        self.fields.push(Field {
            qualifier: None,
            term: FieldTerm::Expr(expr),
        });
        self
    }

    // ==================== JOIN ====================

    /// Add a join from a `table [AS] [alias]` string.
    pub fn join(mut self, table: &str, on: &str, join_type: JoinType) -> Self {
        self.joins.push_spec(table, on, join_type);
        self
    }

    /// Add a join against an explicit table reference (alias map, sub-select).
    pub fn join_ref(mut self, table: TableRef, on: &str, join_type: JoinType) -> Self {
        self.joins.push(table, on, join_type);
        self
    }

    /// Add INNER JOIN.
    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Inner)
    }

    /// Add LEFT JOIN.
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Left)
    }

    /// Add RIGHT JOIN.
    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Right)
    }

    /// Add OUTER JOIN.
    pub fn outer_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Outer)
    }

    /// Add FULL JOIN.
    pub fn full_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Full)
    }

    /// Add NATURAL JOIN.
    pub fn natural_join(self, table: &str) -> Self {
        self.join(table, "", JoinType::Natural)
    }

    /// Add CROSS JOIN.
    pub fn cross_join(self, table: &str) -> Self {
        self.join(table, "", JoinType::Cross)
    }

    // ==================== WHERE ====================

    /// Add a WHERE fragment joined with AND; `?` placeholders take `values`.
    pub fn and_where(mut self, template: &str, values: impl IntoValues) -> Self {
        self.where_clause.and_where(template, values);
        self
    }

    /// Add a WHERE fragment joined with OR.
    pub fn or_where(mut self, template: &str, values: impl IntoValues) -> Self {
        self.where_clause.or_where(template, values);
        self
    }

    /// Open a WHERE group.
    pub fn begin_group(mut self) -> Self {
        self.where_clause.begin_group();
        self
    }

    /// Close the innermost WHERE group, joining it with `conj`.
    pub fn end_group(mut self, conj: Conjunction) -> Self {
        self.where_clause.end_group(conj);
        self
    }

    /// Add a WHERE group built by `f`.
    pub fn group(mut self, conj: Conjunction, f: impl FnOnce(&mut WhereClause)) -> Self {
        self.where_clause.begin_group();
        f(&mut self.where_clause);
        self.where_clause.end_group(conj);
        self
    }

    // ==================== Grouping & Ordering ====================

    /// Set GROUP BY terms (comma-separated; numeric positions kept verbatim).
    pub fn group_by(mut self, spec: &str) -> Self {
        self.group_by = split_list(spec);
        self
    }

    /// Set the HAVING predicate; `?` placeholders take `values`.
    pub fn having(mut self, template: &str, values: impl IntoValues) -> Self {
        match Predicate::new(template, values.into_values()) {
            Ok(pred) => self.having = Some(pred),
            Err(e) => self.set_error(e),
        }
        self
    }

    /// Add ORDER BY terms; terms without their own direction use `order`.
    ///
    /// `order_by("name, age DESC", Order::Asc)` renders `name ASC, age DESC`.
    pub fn order_by(mut self, spec: &str, order: Order) -> Self {
        for term in split_list(spec) {
            let (column, direction) = match term.rsplit_once(char::is_whitespace) {
                Some((rest, dir)) => match dir.parse::<Order>() {
                    Ok(dir) => (rest.trim().to_string(), dir),
                    Err(_) if call_re().is_match(&term) => (term.clone(), order),
                    Err(e) => {
                        self.set_error(e.to_string());
                        return self;
                    }
                },
                None => (term.clone(), order),
            };
            self.order_by.push((column, direction));
        }
        self
    }

    /// Add ORDER BY column ASC.
    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, Order::Asc)
    }

    /// Add ORDER BY column DESC.
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, Order::Desc)
    }

    // ==================== Pagination ====================

    /// Set LIMIT and optional OFFSET.
    pub fn limit(mut self, count: u64, offset: Option<u64>) -> Self {
        self.limit = Some((count, offset));
        self
    }

    // ==================== Build helpers ====================

    /// Alias of the first table, when aliased rendering applies.
    fn default_alias(&self) -> Option<&str> {
        if self.tables.iter().any(|t| t.alias().is_some()) {
            self.tables.first().and_then(TableRef::alias)
        } else {
            None
        }
    }

    /// `true` when `name` is one of this statement's table or join aliases.
    fn is_alias(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.alias() == Some(name)) || self.joins.aliases().any(|a| a == name)
    }

    /// Render a column reference: aliases stay bare, names are quoted.
    fn column_sql(&self, dialect: &Dialect<'_>, qualifier: Option<&str>, column: &str) -> String {
        let ident = Ident::parse(column);
        let name = if ident.is_star() {
            "*".to_string()
        } else {
            match ident.parts() {
                [q, rest @ ..] if !rest.is_empty() && self.is_alias(q) => {
                    let rest = Ident::parse(&rest.join("."));
                    return format!("{}.{}", q, dialect.quote_ident(&rest));
                }
                _ => dialect.quote_ident(&ident),
            }
        };
        match qualifier {
            Some(q) => format!("{q}.{name}"),
            None => name,
        }
    }

    fn render_field(&self, dialect: &Dialect<'_>, field: &Field) -> SqlResult<String> {
        let qualifier = match &field.term {
            FieldTerm::Column { name, .. } if Ident::parse(name).parts().len() > 1 => None,
            _ => field.qualifier.as_deref().or(self.default_alias()),
        };
        Ok(match &field.term {
            FieldTerm::Raw(sql) => sql.clone(),
            FieldTerm::Expr(expr) => expr.render(dialect, qualifier)?,
            FieldTerm::Column { name, label } => {
                let mut s = self.column_sql(dialect, qualifier, name);
                if let Some(label) = label {
                    s.push_str(" AS ");
                    s.push_str(label);
                }
                s
            }
        })
    }

    /// Build the full SELECT SQL.
    fn build_select_sql(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.validate()?;
        if self.tables.is_empty() {
            return Err(SqlError::builder("SELECT requires a table"));
        }

        let fields = if self.fields.is_empty() {
            match self.default_alias() {
                Some(alias) => format!("{alias}.*"),
                None => "*".to_string(),
            }
        } else {
            let mut parts = Vec::with_capacity(self.fields.len());
            for field in &self.fields {
                parts.push(self.render_field(dialect, field)?);
            }
            parts.join(", ")
        };

        let mut tables = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            tables.push(table.render(dialect)?);
        }

        let mut sql = format!("SELECT {} FROM {}", fields, tables.join(", "));

        // JOINs
        let joins = self.joins.render(dialect)?;
        if !joins.is_empty() {
            sql.push(' ');
            sql.push_str(&joins);
        }

        // WHERE
        if let Some(where_sql) = self.where_clause.render(dialect)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            let terms: Vec<String> = self
                .group_by
                .iter()
                .map(|t| {
                    if t.chars().all(|c| c.is_ascii_digit()) || call_re().is_match(t) {
                        t.clone()
                    } else {
                        self.column_sql(dialect, None, t)
                    }
                })
                .collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&terms.join(", "));
        }

        // HAVING
        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&having.render(dialect)?);
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(col, dir)| {
                    let col = if call_re().is_match(col) {
                        col.clone()
                    } else {
                        self.column_sql(dialect, None, col)
                    };
                    format!("{} {}", col, dir.as_str())
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        // LIMIT, OFFSET
        if let Some((count, offset)) = self.limit {
            sql.push_str(&format!(" LIMIT {count}"));
            if let Some(offset) = offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        Ok(sql)
    }
}

impl SqlStatement for Select {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn build_error(&self) -> Option<&str> {
        self.build_error
            .as_deref()
            .or(self.where_clause.build_error())
            .or(self.joins.build_error())
    }

    fn render_with(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.build_select_sql(dialect)
    }
}
