//! INSERT statement builder.

use crate::builder::{SqlStatement, StatementKind};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// INSERT builder.
///
/// One row per `VALUES (...)` group; every row projects the columns of the
/// first row, in the same order.
#[derive(Clone, Debug, PartialEq)]
pub struct Insert {
    /// Target table
    table: String,
    /// Column names (from the first row)
    columns: Vec<String>,
    /// Value rows
    rows: Vec<Vec<Value>>,
    /// `ON DUPLICATE KEY UPDATE` clause, passed through verbatim
    on_duplicate: Option<String>,
    /// Build error
    build_error: Option<String>,
}

impl Insert {
    pub fn new(table: &str) -> Self {
        let build_error = if table.trim().is_empty() {
            Some("INSERT table is empty".to_string())
        } else {
            None
        };
        Self {
            table: table.trim().to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate: None,
            build_error,
        }
    }

    fn set_error(&mut self, message: impl Into<String>) {
        if self.build_error.is_none() {
            self.build_error = Some(message.into());
        }
    }

    /// Validate a row against the column set and append it.
    fn push_row<I, K, V>(&mut self, row: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = row
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_string(), v.into()))
            .unzip();

        if columns.is_empty() {
            self.set_error(format!("INSERT row {} has no columns", self.rows.len() + 1));
            return;
        }
        if self.rows.is_empty() {
            self.columns = columns;
        } else if columns != self.columns {
            self.set_error(format!(
                "INSERT row {} columns ({}) differ from the first row ({})",
                self.rows.len() + 1,
                columns.join(", "),
                self.columns.join(", ")
            ));
            return;
        }
        self.rows.push(values);
    }

    /// Set a single row: `[("name", Value::from("x")), ("age", 3.into())]`.
    ///
    /// Replaces any rows set before.
    pub fn values<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.columns.clear();
        self.rows.clear();
        self.push_row(row);
        self
    }

    /// Set several rows, all sharing the same columns.
    ///
    /// Replaces any rows set before.
    pub fn rows<R, I, K, V>(mut self, rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.columns.clear();
        self.rows.clear();
        for row in rows {
            self.push_row(row);
        }
        if self.rows.is_empty() {
            self.set_error("INSERT requires at least one row");
        }
        self
    }

    /// Append one more row.
    pub fn add_row<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.push_row(row);
        self
    }

    /// Set rows from a JSON object or an array of objects.
    pub fn values_json(mut self, json: &serde_json::Value) -> Self {
        let objects: Vec<&serde_json::Map<String, serde_json::Value>> = match json {
            serde_json::Value::Object(map) => vec![map],
            serde_json::Value::Array(items) => {
                let mut objects = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item.as_object() {
                        Some(map) => objects.push(map),
                        None => {
                            self.set_error(format!("INSERT row {} is not an object", i + 1));
                            return self;
                        }
                    }
                }
                objects
            }
            _ => {
                self.set_error("INSERT values must be an object or an array of objects");
                return self;
            }
        };

        let mut rows = Vec::with_capacity(objects.len());
        for map in objects {
            let mut row = Vec::with_capacity(map.len());
            for (column, value) in map {
                match Value::from_json(value) {
                    Ok(v) => row.push((column.clone(), v)),
                    Err(e) => {
                        self.set_error(format!("column '{column}': {e}"));
                        return self;
                    }
                }
            }
            rows.push(row);
        }
        self.rows(rows)
    }

    /// Append `ON DUPLICATE KEY UPDATE <clause>` (MySQL), passed through verbatim.
    pub fn on_duplicate_key(mut self, clause: &str) -> Self {
        let clause = clause.trim();
        if clause.is_empty() {
            self.set_error("ON DUPLICATE KEY UPDATE clause is empty");
        } else {
            self.on_duplicate = Some(clause.to_string());
        }
        self
    }

    fn build_insert_sql(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.validate()?;
        if self.rows.is_empty() {
            return Err(SqlError::builder("INSERT requires at least one row"));
        }

        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();

        let mut groups = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut values = Vec::with_capacity(row.len());
            for value in row {
                values.push(dialect.format_value(value)?);
            }
            groups.push(format!("({})", values.join(", ")));
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            dialect.quote_table(&self.table),
            columns.join(", "),
            groups.join(", ")
        );

        if let Some(clause) = &self.on_duplicate {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(clause);
        }

        Ok(sql)
    }
}

impl SqlStatement for Insert {
    fn kind(&self) -> StatementKind {
        StatementKind::Insert
    }

    fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    fn render_with(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.build_insert_sql(dialect)
    }
}
