//! Pool integration tests against a live server

use std::time::Duration;

use minerva::{Pool, PoolOpts};

use crate::{skip_if_not_enabled, test_opts};

#[tokio::test]
async fn recycle_discards_stale_sessions() {
    skip_if_not_enabled!();
    let opts = PoolOpts::new(1, 2).pool_recycle(Duration::from_secs(1));
    let pool = Pool::connect(test_opts(), opts).await.expect("pool");

    let conn = pool.acquire().await.expect("acquire");
    let first_id = conn.thread_id();
    drop(conn);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let conn = pool.acquire().await.expect("acquire after sleep");
    assert_ne!(conn.thread_id(), first_id, "stale session should be replaced");
    assert!(pool.size() <= 2);
    drop(conn);

    pool.close();
    pool.wait_closed().await.expect("wait_closed");
}

#[tokio::test]
async fn concurrent_acquires_stay_within_maxsize() {
    skip_if_not_enabled!();
    let pool = Pool::connect(test_opts(), PoolOpts::new(1, 2))
        .await
        .expect("pool");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await.expect("acquire");
            conn.query("SELECT 1", false).await.expect("query");
            assert!(pool.size() <= 2);
        }));
    }
    for task in tasks {
        task.await.expect("task");
    }

    pool.close();
    pool.wait_closed().await.expect("wait_closed");
    assert_eq!(pool.size(), 0);
}
