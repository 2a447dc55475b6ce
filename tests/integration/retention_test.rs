//! Integration tests for the file retention sweep.

mod helpers;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use filedrop_core::traits::storage::StorageProvider;
use filedrop_database::repositories::{FileRepository, MemoryRepository};
use filedrop_worker::jobs::{RetentionReport, RetentionSweepJob};
use filedrop_worker::naming::storage_path;

use helpers::{MemoryStorage, TestEnv};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_expires_only_files_past_threshold() {
    let env = TestEnv::new().await;
    let job = RetentionSweepJob::new(env.storage.clone(), env.repo.clone(), Duration::minutes(30));

    let old_path = storage_path("files", now() - Duration::minutes(31), "old.txt");
    let fresh_path = storage_path("files", now() - Duration::minutes(29), "fresh.txt");
    let old = env.seed_file("old.txt", &old_path).await;
    let fresh = env.seed_file("fresh.txt", &fresh_path).await;

    let report = job.sweep_at(now()).await.unwrap();
    assert_eq!(
        report,
        RetentionReport {
            scanned: 2,
            expired: 1,
            deleted: 1,
            malformed: 0,
            failed: 0
        }
    );

    assert_eq!(env.repo.get_file(old.id).await.unwrap(), None);
    assert!(!env.dir.path().join(&old_path).exists());

    assert_eq!(env.repo.get_file(fresh.id).await.unwrap(), Some(fresh));
    assert!(env.dir.path().join(&fresh_path).exists());
}

#[tokio::test]
async fn test_exact_threshold_is_kept() {
    let env = TestEnv::new().await;
    let job = RetentionSweepJob::new(env.storage.clone(), env.repo.clone(), Duration::minutes(30));

    let path = storage_path("files", now() - Duration::minutes(30), "edge.txt");
    env.seed_file("edge.txt", &path).await;

    let report = job.sweep_at(now()).await.unwrap();
    assert_eq!(report.expired, 0);
    assert_eq!(env.repo.file_count().await, 1);
}

#[tokio::test]
async fn test_malformed_path_is_skipped_and_sweep_continues() {
    let env = TestEnv::new().await;
    let job = RetentionSweepJob::new(env.storage.clone(), env.repo.clone(), Duration::minutes(30));

    let bad = env.repo.create_file("weird.txt", "files/garbage.txt").await.unwrap();
    let old_path = storage_path("files", now() - Duration::hours(2), "old.txt");
    let old = env.seed_file("old.txt", &old_path).await;

    let report = job.sweep_at(now()).await.unwrap();
    assert_eq!(report.malformed, 1);
    assert_eq!(report.deleted, 1);

    assert!(env.repo.get_file(bad.id).await.unwrap().is_some());
    assert_eq!(env.repo.get_file(old.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_bytes_still_remove_record() {
    let env = TestEnv::new().await;
    let job = RetentionSweepJob::new(env.storage.clone(), env.repo.clone(), Duration::minutes(30));

    let path = storage_path("files", now() - Duration::hours(1), "gone.txt");
    let record = env.repo.create_file("gone.txt", &path).await.unwrap();

    let report = job.sweep_at(now()).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(env.repo.get_file(record.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_delete_keeps_record_for_retry() {
    let storage = Arc::new(MemoryStorage::new());
    let repo = Arc::new(MemoryRepository::new());
    let job = RetentionSweepJob::new(storage.clone(), repo.clone(), Duration::minutes(30));

    let stuck_path = storage_path("files", now() - Duration::hours(1), "stuck.txt");
    let other_path = storage_path("files", now() - Duration::hours(1), "other.txt");
    for path in [&stuck_path, &other_path] {
        storage
            .write(path, bytes::Bytes::from_static(b"x"))
            .await
            .unwrap();
    }
    let stuck = repo.create_file("stuck.txt", &stuck_path).await.unwrap();
    let other = repo.create_file("other.txt", &other_path).await.unwrap();
    storage.fail_delete_of(&stuck_path);

    let report = job.sweep_at(now()).await.unwrap();
    assert_eq!(report.expired, 2);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 1);

    assert!(repo.get_file(stuck.id).await.unwrap().is_some());
    assert!(storage.get(&stuck_path).is_some());
    assert_eq!(repo.get_file(other.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_table_is_a_no_op() {
    let env = TestEnv::new().await;
    let job = RetentionSweepJob::new(env.storage.clone(), env.repo.clone(), Duration::minutes(30));

    assert_eq!(job.sweep_at(now()).await.unwrap(), RetentionReport::default());
}
