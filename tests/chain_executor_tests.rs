//! End-to-end chain scenarios against an in-memory mock connection,
//! reproducing the multi-statement acceptance scenario: a chain that binds
//! two variables, inserts a row, updates another with a raw-fragment
//! increment, inserts a row that back-references the first insert's id,
//! updates a byte column, then deletes by a bound variable — followed by
//! the matching failure case where one statement's `executeRaw` fails.

use chrono::NaiveDate;
use dbchain::mock::{MockConnection, RecordingObserver};
use dbchain::{Condition, DbCommand, LastId, Statement, StatementKind, Value};
use std::collections::HashMap;

fn basic_chain() -> DbCommand {
    let mut sys_user = Statement::new("%SYS_USER%", "user", StatementKind::Select);
    sys_user.return_columns.insert("id".to_string(), None);

    let mut tab_number = Statement::new("%TAB_NUMBER%", "tab", StatementKind::Select);
    tab_number.return_columns.insert("id".to_string(), None);

    let mut order_insert = Statement::new("11", "order", StatementKind::Insert);
    order_insert.parameters.insert("product".to_string(), Value::Int(123));
    order_insert.parameters.insert("price".to_string(), Value::Float(10.2));
    order_insert.parameters.insert("title".to_string(), Value::Text("Water".to_string()));
    order_insert
        .parameters
        .insert("user".to_string(), Value::Text("%SYS_USER%".to_string()));
    order_insert
        .parameters
        .insert("tab".to_string(), Value::Text("%TAB_NUMBER%".to_string()));

    let ts = NaiveDate::from_ymd_opt(2020, 10, 11).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let mut product_update = Statement::new("21", "product", StatementKind::Update);
    product_update.parameters.insert("last_date".to_string(), Value::Timestamp(ts));
    product_update.parameters.insert(
        "count".to_string(),
        Value::List(vec![Value::Text("count + 1".to_string())]),
    );
    product_update.predicate = Some(Condition::and(vec![
        Condition::eq("id", 123i64),
        Condition::Value {
            field: "type".to_string(),
            op: "!=".to_string(),
            value: Value::Text("x".to_string()),
        },
    ]));

    let mut order_ref_insert = Statement::new("12", "order_ref", StatementKind::Insert);
    order_ref_insert
        .parameters
        .insert("order".to_string(), Value::Text("#order:11#".to_string()));
    order_ref_insert.parameters.insert(
        "next_order".to_string(),
        Value::List(vec![Value::Text("#order:11# + 10".to_string())]),
    );
    order_ref_insert.parameters.insert("ref".to_string(), Value::Int(1002));
    order_ref_insert.return_columns.insert("next_order".to_string(), None);
    order_ref_insert.return_last_id = true;

    let mut order_ref_update = Statement::new("13", "order_ref", StatementKind::Update);
    order_ref_update
        .parameters
        .insert("payload".to_string(), Value::Bytes(vec![1, 2, 3, 4]));
    order_ref_update.predicate = Some(Condition::eq("id", 1i64));

    let mut tab_use_delete = Statement::new("14", "tab_use", StatementKind::Delete);
    tab_use_delete.predicate = Some(Condition::eq("num", 301i64));

    DbCommand {
        id: Some("basic".to_string()),
        host: "localhost".to_string(),
        port: 5432,
        user: "app".to_string(),
        pass: "secret".to_string(),
        dbname: "shop".to_string(),
        software: "generic".to_string(),
        properties: HashMap::new(),
        statements: vec![
            sys_user,
            tab_number,
            order_insert,
            product_update,
            order_ref_insert,
            order_ref_update,
            tab_use_delete,
        ],
    }
}

fn row_with_id(id: Value) -> dbchain::statement::RowMap {
    let mut row = dbchain::statement::RowMap::new();
    row.insert("id".to_string(), id);
    row
}

#[tokio::test]
async fn full_chain_commits_and_threads_back_references() {
    let mut chain = basic_chain();
    let mut conn = MockConnection::new();
    conn.push_rows(vec![row_with_id(Value::Text("u10".to_string()))]); // %SYS_USER%
    conn.push_rows(vec![row_with_id(Value::Int(301))]); // %TAB_NUMBER%
    conn.push_rows_with_id(vec![], LastId::Int(101)); // order insert
    conn.push_rows(vec![]); // product update
    conn.push_rows_with_id(vec![], LastId::Int(0)); // order_ref insert, driver reports 0
    conn.push_rows(vec![]); // order_ref update
    conn.push_rows(vec![]); // tab_use delete

    let observer = RecordingObserver::new();
    let outcome = dbchain::execute_with_connection(&mut chain, &mut conn, &observer, None).await;

    assert!(outcome.committed);
    assert!(observer.errors().is_empty());

    let info = observer.info();
    assert_eq!(info.first().map(String::as_str), Some("Started transaction"));
    assert_eq!(info.last().map(String::as_str), Some("Commit transaction: OK"));
    assert_eq!(info.iter().filter(|m| m.starts_with("Executed SQL for variable")).count(), 2);
    assert_eq!(info.iter().filter(|m| m.starts_with("SQL executed:")).count(), 5);

    assert_eq!(chain.statements[2].last_id, Some(Value::Int(101)));
    assert_eq!(chain.statements[4].last_id, Some(Value::Int(111)));
    assert_eq!(
        chain.statements[4].rendered_sql.as_deref(),
        Some("INSERT INTO `order_ref` (`order` , `next_order` , `ref`) VALUES (101 , 101 + 10 , 1002)")
    );
    assert_eq!(
        chain.statements[6].rendered_sql.as_deref(),
        Some("DELETE FROM `tab_use` WHERE `num` = 301")
    );
}

#[tokio::test]
async fn failed_statement_rolls_back_and_stops_the_chain() {
    let mut chain = basic_chain();
    let mut conn = MockConnection::new();
    conn.push_rows(vec![row_with_id(Value::Text("u10".to_string()))]);
    conn.push_rows(vec![row_with_id(Value::Int(301))]);
    conn.push_failure(); // order insert fails

    let observer = RecordingObserver::new();
    let outcome = dbchain::execute_with_connection(&mut chain, &mut conn, &observer, None).await;

    assert!(!outcome.committed);
    assert!(conn.rolled_back);
    assert!(!conn.committed);
    assert!(!observer.errors().is_empty());
    assert!(!chain.statements[3].executed);
    assert!(!chain.statements[4].executed);
    assert!(!chain.statements[6].executed);
}
