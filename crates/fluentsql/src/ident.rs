//! SQL identifier handling.
//!
//! [`Ident`] is a dotted identifier (`schema.table`, `alias.column`) that has been
//! normalized for re-quoting under any dialect:
//!
//! - backticks and double quotes already present in the input are stripped
//! - the name is split on `.` and each segment is trimmed
//! - empty segments (`.users`, `a..b`) are dropped
//! - a `*` segment is never quoted
//!
//! # Example
//! ```ignore
//! use fluentsql::ident::Ident;
//!
//! let t = Ident::parse("`app`.\"users\"");
//! assert_eq!(t.to_sql('"'), r#""app"."users""#);
//! ```

/// A normalized, possibly dotted SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse an identifier, removing any pre-existing quoting.
    pub fn parse(s: &str) -> Self {
        let stripped: String = s.chars().filter(|c| *c != '`' && *c != '"').collect();
        let parts = stripped
            .split('.')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self { parts }
    }

    /// Identifier segments, outermost first.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// `true` when the identifier is a bare `*`.
    pub fn is_star(&self) -> bool {
        self.parts.len() == 1 && self.parts[0] == "*"
    }

    /// Rewrite the final segment (the table or column name).
    pub fn map_last(mut self, f: impl FnOnce(&str) -> String) -> Self {
        if let Some(last) = self.parts.last_mut() {
            *last = f(last);
        }
        self
    }

    /// Prepend a qualifier unless the identifier is already qualified.
    pub fn qualify(mut self, qualifier: &str) -> Self {
        if self.parts.len() == 1 {
            self.parts.insert(0, qualifier.to_string());
        }
        self
    }

    /// Render the identifier with `quote` around each segment.
    pub fn to_sql(&self, quote: char) -> String {
        let mut out = String::with_capacity(self.parts.iter().map(|p| p.len() + 3).sum());
        self.write_sql(quote, &mut out);
        out
    }

    pub(crate) fn write_sql(&self, quote: char, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            if part == "*" {
                out.push('*');
            } else {
                out.push(quote);
                out.push_str(part);
                out.push(quote);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        assert_eq!(Ident::parse("users").to_sql('`'), "`users`");
    }

    #[test]
    fn ident_dotted() {
        assert_eq!(Ident::parse("public.users").to_sql('"'), r#""public"."users""#);
    }

    #[test]
    fn ident_strips_existing_quotes() {
        assert_eq!(Ident::parse("`app`.\"users\"").to_sql('`'), "`app`.`users`");
        assert_eq!(Ident::parse(r#""CamelCase""#).to_sql('"'), r#""CamelCase""#);
    }

    #[test]
    fn ident_star_is_not_quoted() {
        assert!(Ident::parse("*").is_star());
        assert_eq!(Ident::parse("*").to_sql('"'), "*");
        assert_eq!(Ident::parse("u.*").to_sql('`'), "`u`.*");
    }

    #[test]
    fn ident_drops_empty_segments() {
        assert_eq!(Ident::parse(".users").parts(), &["users".to_string()]);
        assert_eq!(Ident::parse("a..b").to_sql('`'), "`a`.`b`");
        assert!(Ident::parse("").is_empty());
    }

    #[test]
    fn ident_trims_segments() {
        assert_eq!(Ident::parse(" app . users ").to_sql('`'), "`app`.`users`");
    }

    #[test]
    fn ident_map_last_only_touches_table_segment() {
        let t = Ident::parse("app.users").map_last(|t| format!("pre_{t}"));
        assert_eq!(t.to_sql('"'), r#""app"."pre_users""#);
    }

    #[test]
    fn ident_qualify_skips_qualified_names() {
        assert_eq!(Ident::parse("id").qualify("u").to_sql('`'), "`u`.`id`");
        assert_eq!(Ident::parse("o.id").qualify("u").to_sql('`'), "`o`.`id`");
    }
}
