use sluice_db::models::{BatchStatus, NewRecord};
use sluice_db::repositories::BatchRepo;
use sqlx::SqlitePool;

fn sample_records() -> Vec<NewRecord> {
    vec![
        NewRecord {
            name: "record_0".into(),
            value: "alpha".into(),
        },
        NewRecord {
            name: "record_1".into(),
            value: "beta".into(),
        },
    ]
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_batch_stores_records_and_count(pool: SqlitePool) {
    let batch_id = BatchRepo::insert_batch(&pool, "input/a.txt", &sample_records())
        .await
        .unwrap();

    let batch = BatchRepo::find_by_id(&pool, batch_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.source_file, "input/a.txt");
    assert_eq!(batch.status_id, BatchStatus::Completed.id());
    assert_eq!(batch.record_count, 2);

    let records = BatchRepo::list_records(&pool, batch_id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "record_0");
    assert_eq!(records[0].value, "alpha");
    assert!(!records[0].finalized);
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_batch_completes_with_zero_records(pool: SqlitePool) {
    let batch_id = BatchRepo::insert_batch(&pool, "input/empty.txt", &[])
        .await
        .unwrap();

    let batch = BatchRepo::find_by_id(&pool, batch_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.status_id, BatchStatus::Completed.id());
    assert_eq!(batch.record_count, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn finalize_marks_all_records_once(pool: SqlitePool) {
    let batch_id = BatchRepo::insert_batch(&pool, "input/a.txt", &sample_records())
        .await
        .unwrap();

    let finalized = BatchRepo::finalize_batch(&pool, batch_id).await.unwrap();
    assert_eq!(finalized, 2);
    assert_eq!(
        BatchRepo::count_finalized(&pool, batch_id).await.unwrap(),
        2
    );

    let batch = BatchRepo::find_by_id(&pool, batch_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.status_id, BatchStatus::Finalized.id());

    // Already-finalized records are not touched again.
    let second_pass = BatchRepo::finalize_batch(&pool, batch_id).await.unwrap();
    assert_eq!(second_pass, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn find_by_id_returns_none_for_unknown_batch(pool: SqlitePool) {
    assert!(BatchRepo::find_by_id(&pool, 404).await.unwrap().is_none());
}
