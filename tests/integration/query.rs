//! Query-path integration tests against a live server

use minerva::{Connection, Value};

use crate::{skip_if_not_enabled, test_opts};

#[tokio::test]
async fn simple_select() {
    skip_if_not_enabled!();
    let mut conn = Connection::connect(test_opts()).await.expect("connect");

    let affected = conn.query("SELECT 1", false).await.expect("query");
    assert_eq!(affected, 1);

    let result = conn.result().expect("result");
    assert_eq!(result.field_count(), 1);
    assert_eq!(result.rows, vec![vec![Value::Int(1)]]);
    assert_eq!(conn.insert_id(), 0);

    conn.ensure_closed().await.expect("quit");
}

#[tokio::test]
async fn insert_reports_last_insert_id() {
    skip_if_not_enabled!();
    let mut conn = Connection::connect(test_opts()).await.expect("connect");

    conn.query(
        "CREATE TEMPORARY TABLE minerva_it_ids \
         (id INT AUTO_INCREMENT PRIMARY KEY, v INT)",
        false,
    )
    .await
    .expect("create");

    let affected = conn
        .query("INSERT INTO minerva_it_ids (v) VALUES (42)", false)
        .await
        .expect("insert");
    assert_eq!(affected, 1);
    assert_eq!(conn.insert_id(), 1);

    conn.query("SELECT id, v FROM minerva_it_ids", false)
        .await
        .expect("select");
    assert_eq!(
        conn.result().expect("result").rows,
        vec![vec![Value::Int(1), Value::Int(42)]]
    );

    conn.ensure_closed().await.expect("quit");
}

#[tokio::test]
async fn multi_statement_results() {
    skip_if_not_enabled!();
    let mut conn = Connection::connect(test_opts()).await.expect("connect");

    conn.query("SELECT 1; SELECT 2", false).await.expect("query");
    assert_eq!(conn.result().expect("result").rows, vec![vec![Value::Int(1)]]);
    assert!(conn.has_next());

    conn.next_result(false).await.expect("next result");
    assert_eq!(conn.result().expect("result").rows, vec![vec![Value::Int(2)]]);
    assert!(!conn.has_next());

    conn.ensure_closed().await.expect("quit");
}

#[tokio::test]
async fn large_query_is_accepted() {
    skip_if_not_enabled!();
    let mut conn = Connection::connect(test_opts()).await.expect("connect");

    // the command payload spans two frames on the wire
    let filler = "x".repeat(16_777_220);
    let sql = format!("SELECT /*{filler}*/ 1");
    let affected = conn.query(&sql, false).await.expect("oversized query");
    assert_eq!(affected, 1);
    assert_eq!(conn.result().expect("result").rows, vec![vec![Value::Int(1)]]);

    conn.ensure_closed().await.expect("quit");
}

#[tokio::test]
async fn unbuffered_streaming_and_midstream_close() {
    skip_if_not_enabled!();
    let mut conn = Connection::connect(test_opts()).await.expect("connect");

    conn.query("SET SESSION cte_max_recursion_depth = 10001", false)
        .await
        .expect("set depth");

    let seq_sql = "WITH RECURSIVE seq (n) AS \
         (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 10000) \
         SELECT n FROM seq";

    let sentinel = conn.query(seq_sql, true).await.expect("query");
    assert_eq!(sentinel, u64::MAX);

    let mut count = 0u64;
    while let Some(row) = conn.read_next_row().await.expect("row") {
        count += 1;
        if count == 1 {
            assert_eq!(row, vec![Value::Int(1)]);
        }
    }
    assert_eq!(count, 10_000);

    // abandon a second stream mid-way; closing the cursor must drain it
    let mut cursor = conn.unbuffered_cursor();
    cursor.execute(seq_sql).await.expect("query");
    let some = cursor.fetch_many(10).await.expect("fetch");
    assert_eq!(some.len(), 10);
    cursor.close().await.expect("close");

    // the session is usable again
    conn.ping(false).await.expect("ping");
    conn.ensure_closed().await.expect("quit");
}

#[tokio::test]
async fn autocommit_is_applied_at_handshake() {
    skip_if_not_enabled!();
    let mut conn = Connection::connect(test_opts().autocommit(false))
        .await
        .expect("connect");
    assert!(!conn.get_autocommit());

    conn.set_autocommit(true).await.expect("set autocommit");
    assert!(conn.get_autocommit());

    conn.ensure_closed().await.expect("quit");
}
