//! Per-database rendering choices: identifier quoting and byte-literal syntax.
//!
//! A `Dialect` is a narrow, two-method interface rather than a data struct so
//! that a driver crate can hand the renderer a dialect without depending on a
//! shared enum of every database this crate knows about.

/// Renders the parts of SQL text that vary by target database.
pub trait Dialect: Send + Sync {
    /// Short name used by the driver registry, e.g. `"postgres"`.
    fn name(&self) -> &'static str;

    /// The character that surrounds every identifier this renderer emits.
    fn quote(&self) -> char;

    /// Renders a byte sequence as a SQL literal fragment.
    fn render_bytes(&self, bytes: &[u8]) -> String;

    /// Quotes an identifier using [`Dialect::quote`].
    fn quote_ident(&self, ident: &str) -> String {
        let q = self.quote();
        format!("{q}{ident}{q}")
    }

    /// INSERT-id retrieval strategy (spec §2/§4.4): does this database
    /// report the last inserted id natively (MySQL's `LAST_INSERT_ID()`,
    /// SQLite's `last_insert_rowid()`), or does the renderer have to ask
    /// for it explicitly via a `RETURNING` clause (Postgres has no session
    /// auto-increment id to query after the fact)? Defaults to `false`
    /// (native retrieval); only `PostgresDialect` overrides this.
    fn needs_returning_clause(&self) -> bool {
        false
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Reference dialect used for MySQL: backtick quoting, `X'<hex>'` byte literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self) -> char {
        '`'
    }

    fn render_bytes(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex(bytes))
    }
}

/// Reference dialect used for PostgreSQL: double-quote quoting,
/// `'\x<hex>'` byte literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote(&self) -> char {
        '"'
    }

    fn render_bytes(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'", hex(bytes))
    }

    fn needs_returning_clause(&self) -> bool {
        true
    }
}

/// Minimal generic dialect for tests: backtick quoting (like MySQL), but
/// Postgres-style `'\x<hex>'` byte literals, matching the golden outputs
/// in the spec's testable-properties section.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn quote(&self) -> char {
        '`'
    }

    fn render_bytes(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'", hex(bytes))
    }
}

/// Reference dialect for SQLite: backtick quoting and MySQL-style `X'<hex>'`
/// blob literals (SQLite accepts both, but `X'...'` is the canonical form).
/// Kept distinct from [`MySqlDialect`] so `software = "sqlite"` resolves to
/// its own nameable dialect through the driver registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote(&self) -> char {
        '`'
    }

    fn render_bytes(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(GenericDialect.quote_ident("user_id"), "`user_id`");
        assert_eq!(PostgresDialect.quote_ident("user_id"), "\"user_id\"");
        assert_eq!(MySqlDialect.quote_ident("user_id"), "`user_id`");
    }

    #[test]
    fn byte_rendering() {
        assert_eq!(MySqlDialect.render_bytes(&[1, 2, 3, 4]), "X'01020304'");
        assert_eq!(PostgresDialect.render_bytes(&[1, 2, 3, 4]), "'\\x01020304'");
        assert_eq!(GenericDialect.render_bytes(&[1, 2, 3, 4]), "'\\x01020304'");
    }

    #[test]
    fn only_postgres_needs_an_explicit_returning_clause() {
        assert!(PostgresDialect.needs_returning_clause());
        assert!(!MySqlDialect.needs_returning_clause());
        assert!(!SqliteDialect.needs_returning_clause());
        assert!(!GenericDialect.needs_returning_clause());
    }
}
