//! `tracing` output for executed SQL.

use tracing::Level;

use crate::dialect::EngineType;

/// Cut `sql` to at most `max` chars, never splitting a UTF-8 sequence.
fn truncate_chars(sql: &str, max: usize) -> &str {
    match sql.char_indices().nth(max) {
        Some((idx, _)) => &sql[..idx],
        None => sql,
    }
}

/// Emits every statement the registry runs under the `fluentsql.sql` target.
///
/// Logs **before** the statement reaches the driver, so failing statements are
/// visible too.
#[derive(Debug, Clone)]
pub struct SqlTracer {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in chars). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlTracer {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.chars().count() > max => format!("{}...", truncate_chars(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// Emit one statement event; `kind` is `query` or `execute`.
    pub fn emit(&self, engine: EngineType, server: &str, kind: &str, sql: &str) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "fluentsql.sql",
            engine = %engine,
            server,
            kind,
            sql = %sql,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        let tracer = SqlTracer::new().max_sql_length(3);
        assert_eq!(tracer.truncate_sql("ééééé"), "ééé...");
        assert_eq!(tracer.truncate_sql("abc"), "abc");
        assert_eq!(SqlTracer::new().no_truncate().truncate_sql(&"x".repeat(500)).len(), 500);
    }

    #[test]
    fn default_level_is_debug() {
        let tracer = SqlTracer::default();
        assert_eq!(tracer.level, Level::DEBUG);
        assert_eq!(tracer.max_sql_length, Some(200));
        assert_eq!(SqlTracer::new().level(Level::INFO).level, Level::INFO);
    }

    #[test]
    fn emit_without_subscriber_is_noop() {
        SqlTracer::new().emit(EngineType::Mysql, "db1", "query", "SELECT 1");
    }
}
