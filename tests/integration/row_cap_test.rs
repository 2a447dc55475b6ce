//! Integration tests for the user and item row-cap sweep.

mod helpers;

use std::sync::Arc;

use filedrop_core::types::UserId;
use filedrop_database::repositories::{ItemRepository, MemoryRepository, UserRepository};
use filedrop_worker::jobs::RowCapSweepJob;
use filedrop_worker::task::{JobExecutionError, ScheduledAction};

use helpers::{BrokenUsers, StickyUser};

async fn seeded(users: usize, items: usize) -> Arc<MemoryRepository> {
    let repo = Arc::new(MemoryRepository::new());
    for i in 0..users {
        repo.insert_user(&format!("user{i}@example.com")).await;
    }
    for i in 0..items {
        repo.insert_item(&format!("item {i}"), None).await;
    }
    repo
}

#[tokio::test]
async fn test_twelve_users_trimmed_to_first_ten() {
    let repo = seeded(12, 0).await;
    let job = RowCapSweepJob::new(repo.clone(), repo.clone(), 10, 10);

    let report = job.sweep().await;
    assert_eq!(report.users.scanned, 12);
    assert_eq!(report.users.removed, 2);
    assert_eq!(report.users.failed, 0);

    let ids: Vec<i64> = repo
        .list_users()
        .await
        .unwrap()
        .iter()
        .map(|u| u.id.0)
        .collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_tables_at_or_under_cap_are_untouched() {
    let repo = seeded(10, 3).await;
    let job = RowCapSweepJob::new(repo.clone(), repo.clone(), 10, 10);

    let report = job.sweep().await;
    assert_eq!(report.users.removed, 0);
    assert_eq!(report.items.removed, 0);
    assert_eq!(repo.list_users().await.unwrap().len(), 10);
    assert_eq!(repo.list_items().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_caps_are_independent() {
    let repo = seeded(6, 6).await;
    let job = RowCapSweepJob::new(repo.clone(), repo.clone(), 5, 2);

    let report = job.sweep().await;
    assert_eq!(report.users.removed, 1);
    assert_eq!(report.items.removed, 4);

    let item_ids: Vec<i64> = repo
        .list_items()
        .await
        .unwrap()
        .iter()
        .map(|i| i.id.0)
        .collect();
    assert_eq!(item_ids, vec![1, 2]);
}

#[tokio::test]
async fn test_user_listing_failure_still_caps_items() {
    let repo = seeded(0, 15).await;
    let job = RowCapSweepJob::new(Arc::new(BrokenUsers), repo.clone(), 10, 10);

    let report = job.sweep().await;
    assert!(report.users.error.is_some());
    assert_eq!(report.items.removed, 5);
    assert_eq!(repo.list_items().await.unwrap().len(), 10);

    let err = job.run().await.unwrap_err();
    assert!(matches!(err, JobExecutionError::Transient(msg) if msg.contains("users")));
}

#[tokio::test]
async fn test_delete_failure_does_not_stop_sweep() {
    let repo = seeded(13, 0).await;
    let users = Arc::new(StickyUser {
        inner: repo.clone(),
        sticky: UserId(11),
    });
    let job = RowCapSweepJob::new(users, repo.clone(), 10, 10);

    let report = job.sweep().await;
    assert_eq!(report.users.removed, 2);
    assert_eq!(report.users.failed, 1);

    let ids: Vec<i64> = repo
        .list_users()
        .await
        .unwrap()
        .iter()
        .map(|u| u.id.0)
        .collect();
    assert_eq!(ids.len(), 11);
    assert!(ids.contains(&11));
}

#[tokio::test]
async fn test_deleting_users_keeps_their_items() {
    let repo = seeded(11, 0).await;
    let surplus = repo.list_users().await.unwrap()[10].id;
    let item = repo.insert_item("owned", Some(surplus)).await;
    let job = RowCapSweepJob::new(repo.clone(), repo.clone(), 10, 10);

    job.sweep().await;

    let items = repo.list_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, item.id);
    assert_eq!(items[0].owner_id, None);
}

#[tokio::test]
async fn test_summary_has_both_tables() {
    let repo = seeded(11, 12).await;
    let job = RowCapSweepJob::new(repo.clone(), repo.clone(), 10, 10);

    let summary = job.run().await.unwrap().unwrap();
    assert_eq!(summary["users"]["removed"], 1);
    assert_eq!(summary["items"]["removed"], 2);
    assert!(summary["users"].get("error").is_none());
}
