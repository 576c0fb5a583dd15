//! Runs chains against real databases through the `sqlx`-backed drivers:
//! a SQLite file for the fast path, and Postgres/MySQL testcontainers for
//! the network path — the same container-per-backend shape as the
//! teacher's own catalog manager suite.

use dbchain::drivers::{MySqlConnectionProvider, PostgresConnectionProvider, SqliteConnectionProvider};
use dbchain::mock::RecordingObserver;
use dbchain::{Condition, Connection, ConnectionCredentials, ConnectionProvider, DbCommand, Statement, StatementKind, Value};
use std::collections::HashMap;
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers_modules::mysql::Mysql;
use testcontainers_modules::postgres::Postgres;

async fn run_schema(connection: &mut dyn Connection, sql: &str) {
    assert!(connection.begin().await.unwrap());
    let outcome = connection.execute_raw(sql).await.unwrap();
    assert!(outcome.is_some(), "schema statement failed: {sql}");
    assert!(connection.commit().await.unwrap());
}

fn chain_credentials(creds: ConnectionCredentials, statements: Vec<Statement>) -> DbCommand {
    DbCommand {
        id: Some("integration".to_string()),
        host: creds.host,
        port: creds.port,
        user: creds.user,
        pass: creds.pass,
        dbname: creds.dbname,
        software: creds.software,
        properties: HashMap::new(),
        statements,
    }
}

#[tokio::test]
async fn sqlite_chain_inserts_and_selects_a_row() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("chain.sqlite");

    let creds = ConnectionCredentials {
        host: String::new(),
        port: 0,
        user: String::new(),
        pass: String::new(),
        dbname: db_path.to_str().unwrap().to_string(),
        software: "sqlite".to_string(),
    };

    let provider = SqliteConnectionProvider;
    let mut setup = provider.connect(&creds).await.unwrap();
    run_schema(
        setup.as_mut(),
        "CREATE TABLE product (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT, price REAL)",
    )
    .await;
    setup.close().await.unwrap();

    let mut insert = Statement::new("1", "product", StatementKind::Insert);
    insert.parameters.insert("title".to_string(), Value::Text("Water".to_string()));
    insert.parameters.insert("price".to_string(), Value::Float(10.2));

    let mut select = Statement::new("2", "product", StatementKind::Select);
    select.return_columns.insert("title".to_string(), None);
    select.predicate = Some(Condition::eq("title", "Water"));

    let mut chain = chain_credentials(creds, vec![insert, select]);
    let observer = RecordingObserver::new();
    let outcome = dbchain::execute(&mut chain, &provider, &observer, None).await;

    assert!(outcome.committed, "errors: {:?}", observer.errors());
    assert_eq!(chain.statements[0].last_id, Some(Value::Int(1)));
    assert_eq!(
        chain.statements[1].results[0].get("title"),
        Some(&Value::Text("Water".to_string()))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn postgres_chain_inserts_and_selects_a_row() {
    let container = Postgres::default()
        .with_tag("15-alpine")
        .start()
        .await
        .expect("failed to start postgres container");
    let host_port = container.get_host_port_ipv4(5432).await.unwrap();

    let creds = ConnectionCredentials {
        host: "127.0.0.1".to_string(),
        port: host_port,
        user: "postgres".to_string(),
        pass: "postgres".to_string(),
        dbname: "postgres".to_string(),
        software: "postgres".to_string(),
    };

    let provider = PostgresConnectionProvider;
    let mut setup = provider.connect(&creds).await.unwrap();
    run_schema(
        setup.as_mut(),
        "CREATE TABLE product (id SERIAL PRIMARY KEY, title TEXT, price DOUBLE PRECISION)",
    )
    .await;
    setup.close().await.unwrap();

    let mut insert = Statement::new("1", "product", StatementKind::Insert);
    insert.parameters.insert("title".to_string(), Value::Text("Water".to_string()));
    insert.parameters.insert("price".to_string(), Value::Float(10.2));
    insert.return_columns.insert("id".to_string(), None);
    insert.return_last_id = true;

    let mut select = Statement::new("2", "product", StatementKind::Select);
    select.return_columns.insert("price".to_string(), None);
    select.predicate = Some(Condition::eq("title", "Water"));

    let mut chain = chain_credentials(creds, vec![insert, select]);
    let observer = RecordingObserver::new();
    let outcome = dbchain::execute(&mut chain, &provider, &observer, None).await;

    assert!(outcome.committed, "errors: {:?}", observer.errors());
    assert!(
        chain.statements[0].rendered_sql.as_deref().unwrap().contains("RETURNING"),
        "expected a RETURNING clause: {:?}",
        chain.statements[0].rendered_sql
    );
    assert_eq!(chain.statements[0].last_id, Some(Value::Int(1)));
    assert_eq!(
        chain.statements[1].results[0].get("price"),
        Some(&Value::Float(10.2))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn mysql_chain_inserts_and_selects_a_row() {
    let container = Mysql::default()
        .start()
        .await
        .expect("failed to start mysql container");
    let host_port = container.get_host_port_ipv4(3306).await.unwrap();

    let creds = ConnectionCredentials {
        host: "127.0.0.1".to_string(),
        port: host_port,
        user: "root".to_string(),
        pass: String::new(),
        dbname: "test".to_string(),
        software: "mysql".to_string(),
    };

    let provider = MySqlConnectionProvider;
    let mut setup = provider.connect(&creds).await.unwrap();
    run_schema(
        setup.as_mut(),
        "CREATE TABLE product (id INT AUTO_INCREMENT PRIMARY KEY, title TEXT, price DOUBLE)",
    )
    .await;
    setup.close().await.unwrap();

    let mut insert = Statement::new("1", "product", StatementKind::Insert);
    insert.parameters.insert("title".to_string(), Value::Text("Water".to_string()));
    insert.parameters.insert("price".to_string(), Value::Float(10.2));

    let mut select = Statement::new("2", "product", StatementKind::Select);
    select.return_columns.insert("title".to_string(), None);
    select.predicate = Some(Condition::eq("title", "Water"));

    let mut chain = chain_credentials(creds, vec![insert, select]);
    let observer = RecordingObserver::new();
    let outcome = dbchain::execute(&mut chain, &provider, &observer, None).await;

    assert!(outcome.committed, "errors: {:?}", observer.errors());
    assert_eq!(chain.statements[0].last_id, Some(Value::Int(1)));
    assert_eq!(
        chain.statements[1].results[0].get("title"),
        Some(&Value::Text("Water".to_string()))
    );
}
