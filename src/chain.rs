//! The chain document (spec §3, §6): a `DBCommand`'s credentials,
//! free-form properties, and ordered statement list, decoded from JSON and
//! handed to the executor.

use crate::connection::ConnectionCredentials;
use crate::statement::Statement;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Holds connection credentials, a dialect/driver selector (`software`), an
/// ordered list of statements, and a free-form `properties` map used as the
/// variable lookup of last resort (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `"ip"` is accepted as a legacy alias for `host`.
    #[serde(alias = "ip")]
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    #[serde(rename = "db")]
    pub dbname: String,
    pub software: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(rename = "sqls")]
    pub statements: Vec<Statement>,
}

impl DbCommand {
    pub fn credentials(&self) -> ConnectionCredentials {
        ConnectionCredentials {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            pass: self.pass.clone(),
            dbname: self.dbname.clone(),
            software: self.software.clone(),
        }
    }

    pub fn statement_index_by_sql_id(&self, sql_id: &str) -> Option<usize> {
        self.statements.iter().position(|s| s.sql_id == sql_id)
    }

    pub fn statement_by_sql_id(&self, sql_id: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.sql_id == sql_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementKind;

    #[test]
    fn legacy_ip_alias_decodes_as_host() {
        let json = serde_json::json!({
            "ip": "db.internal",
            "port": 5432,
            "user": "app",
            "pass": "secret",
            "db": "orders",
            "software": "postgres",
            "sqls": []
        });
        let command: DbCommand = serde_json::from_value(json).unwrap();
        assert_eq!(command.host, "db.internal");
    }

    #[test]
    fn statement_lookup_by_sql_id() {
        let mut command: DbCommand = serde_json::from_value(serde_json::json!({
            "host": "localhost",
            "port": 5432,
            "user": "app",
            "pass": "secret",
            "db": "orders",
            "software": "postgres",
            "sqls": []
        }))
        .unwrap();
        command
            .statements
            .push(Statement::new("11", "order", StatementKind::Insert));

        assert_eq!(command.statement_index_by_sql_id("11"), Some(0));
        assert!(command.statement_by_sql_id("missing").is_none());
    }
}
