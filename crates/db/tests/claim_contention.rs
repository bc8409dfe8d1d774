//! Claim exclusivity under concurrent claimers against a real database file.
//!
//! Uses `create_pool` (WAL + busy timeout) rather than the `sqlx::test`
//! harness so the claimers contend on the same on-disk database the way
//! concurrent dispatcher processes would.

use std::collections::HashSet;

use sluice_db::models::WorkItemStatus;
use sluice_db::repositories::WorkItemRepo;
use sluice_db::{create_pool, run_migrations};

#[tokio::test]
async fn concurrent_claimers_never_double_claim() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}/queue.db?mode=rwc", dir.path().display());
    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    const ITEMS: usize = 12;
    const CLAIMERS: usize = 4;
    const PER_CLAIM: i64 = 3;

    for i in 0..ITEMS {
        WorkItemRepo::enqueue(&pool, &format!("f{i}.txt"), 0)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..CLAIMERS {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            WorkItemRepo::claim_batch(&pool, Some(PER_CLAIM)).await
        }));
    }

    let mut seen = HashSet::new();
    let mut claimed_total = 0usize;
    for handle in handles {
        let claimed = handle.await.unwrap().unwrap();
        claimed_total += claimed.len();
        for item in claimed {
            assert!(
                seen.insert(item.id),
                "item {} claimed by more than one caller",
                item.id
            );
        }
    }
    assert_eq!(claimed_total, ITEMS);

    let pending = WorkItemRepo::count_by_status(&pool, WorkItemStatus::Pending)
        .await
        .unwrap();
    let processing = WorkItemRepo::count_by_status(&pool, WorkItemStatus::Processing)
        .await
        .unwrap();
    assert_eq!(pending, 0);
    assert_eq!(pending + processing, ITEMS as i64);
}

/// More claim capacity than items: every item is still claimed exactly once
/// and the pending/processing split always sums to the original count.
#[tokio::test]
async fn oversubscribed_claimers_split_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}/queue.db?mode=rwc", dir.path().display());
    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    const ITEMS: usize = 5;

    for i in 0..ITEMS {
        WorkItemRepo::enqueue(&pool, &format!("f{i}.txt"), 0)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            WorkItemRepo::claim_batch(&pool, Some(4)).await
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for item in handle.await.unwrap().unwrap() {
            assert!(seen.insert(item.id));
        }
    }
    assert_eq!(seen.len(), ITEMS);
}
