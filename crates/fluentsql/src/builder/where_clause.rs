//! WHERE/HAVING predicate accumulation.
//!
//! Fragments are kept as templates plus values and only rendered against a
//! dialect at build time, so the same clause renders under MySQL and Postgres.

use std::str::FromStr;

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::{IntoValues, Value};

/// Predicate used when a template is empty.
pub const TAUTOLOGY: &str = "1 = 1";

/// Boolean operator joining a fragment to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    fn joiner(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

impl FromStr for Conjunction {
    type Err = SqlError;

    fn from_str(s: &str) -> SqlResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(SqlError::builder(format!(
                "group conjunction must be and|or, got '{other}'"
            ))),
        }
    }
}

/// A predicate template with its `?` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    template: String,
    values: Vec<Value>,
}

impl Predicate {
    /// Build a predicate, checking that placeholders and values line up.
    ///
    /// With no values the template is kept verbatim, `?` included.
    pub fn new(template: &str, values: Vec<Value>) -> Result<Self, String> {
        let template = template.trim();
        let template = if template.is_empty() { TAUTOLOGY } else { template };

        if !values.is_empty() {
            let placeholders = template.matches('?').count();
            if placeholders != values.len() {
                return Err(format!(
                    "placeholder mismatch: template '{}' has {} '?', but {} values provided",
                    template,
                    placeholders,
                    values.len()
                ));
            }
        }

        Ok(Self {
            template: template.to_string(),
            values,
        })
    }

    /// Substitute values left to right.
    pub fn render(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        if self.values.is_empty() {
            return Ok(self.template.clone());
        }
        let mut out = String::with_capacity(self.template.len() + self.values.len() * 8);
        let mut values = self.values.iter();
        for ch in self.template.chars() {
            if ch == '?' {
                if let Some(v) = values.next() {
                    out.push_str(&dialect.format_value(v)?);
                    continue;
                }
            }
            out.push(ch);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    Leaf(Predicate),
    Group(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    conj: Conjunction,
    fragment: Fragment,
}

/// Ordered predicate fragments with explicit (nestable) grouping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    nodes: Vec<Node>,
    /// Groups opened with `begin_group` and not yet closed, innermost last.
    open: Vec<Vec<Node>>,
    build_error: Option<String>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no fragment has been added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.open.iter().all(Vec::is_empty)
    }

    /// First error recorded by a call on this clause.
    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    fn set_error(&mut self, message: String) {
        if self.build_error.is_none() {
            self.build_error = Some(message);
        }
    }

    fn target(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(group) => group,
            None => &mut self.nodes,
        }
    }

    /// Add a fragment joined with `conj`.
    pub fn push(&mut self, conj: Conjunction, template: &str, values: impl IntoValues) {
        match Predicate::new(template, values.into_values()) {
            Ok(pred) => self.target().push(Node {
                conj,
                fragment: Fragment::Leaf(pred),
            }),
            Err(e) => self.set_error(e),
        }
    }

    /// Add a fragment joined with `AND`.
    pub fn and_where(&mut self, template: &str, values: impl IntoValues) {
        self.push(Conjunction::And, template, values);
    }

    /// Add a fragment joined with `OR`.
    pub fn or_where(&mut self, template: &str, values: impl IntoValues) {
        self.push(Conjunction::Or, template, values);
    }

    /// Redirect following fragments into a new group.
    pub fn begin_group(&mut self) {
        self.open.push(Vec::new());
    }

    /// Close the innermost group; it joins its predecessor with `conj`.
    pub fn end_group(&mut self, conj: Conjunction) {
        let Some(children) = self.open.pop() else {
            self.set_error("end_group called without a matching begin_group".to_string());
            return;
        };
        if children.is_empty() {
            return;
        }
        self.target().push(Node {
            conj,
            fragment: Fragment::Group(children),
        });
    }

    /// Render the clause, or `None` when it holds no fragment.
    pub fn render(&self, dialect: &Dialect<'_>) -> SqlResult<Option<String>> {
        if let Some(err) = &self.build_error {
            return Err(SqlError::builder(err.clone()));
        }
        if !self.open.is_empty() {
            return Err(SqlError::builder(format!(
                "{} where group(s) left open",
                self.open.len()
            )));
        }
        if self.nodes.is_empty() {
            return Ok(None);
        }
        render_nodes(&self.nodes, dialect).map(Some)
    }
}

fn render_nodes(nodes: &[Node], dialect: &Dialect<'_>) -> SqlResult<String> {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(node.conj.joiner());
        }
        out.push('(');
        match &node.fragment {
            Fragment::Leaf(pred) => out.push_str(&pred.render(dialect)?),
            Fragment::Group(children) => out.push_str(&render_nodes(children, dialect)?),
        }
        out.push(')');
    }
    Ok(out)
}
