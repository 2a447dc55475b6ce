//! Integration tests for the maintenance service lifecycle.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use filedrop_core::config::{MaintenanceConfig, TaskScheduleConfig};
use filedrop_core::error::ErrorKind;
use filedrop_database::repositories::{FileRepository, MemoryRepository, RepositorySet, UserRepository};
use filedrop_worker::jobs::{RETENTION_SWEEP, ROW_CAP_SWEEP, UPLOAD_DRAIN};
use filedrop_worker::{MaintenanceService, SchedulerState};

use helpers::MemoryStorage;

fn fast_config() -> MaintenanceConfig {
    MaintenanceConfig {
        upload_drain: TaskScheduleConfig::every(60),
        retention_sweep: TaskScheduleConfig::every(300),
        row_cap_sweep: TaskScheduleConfig::every(600),
        ..MaintenanceConfig::default()
    }
}

fn service(config: &MaintenanceConfig) -> (MaintenanceService, Arc<MemoryStorage>, Arc<MemoryRepository>) {
    let storage = Arc::new(MemoryStorage::new());
    let repo = Arc::new(MemoryRepository::new());
    let repos = RepositorySet::memory(repo.clone());
    let service = MaintenanceService::new(config, "files", storage.clone(), &repos).unwrap();
    (service, storage, repo)
}

#[tokio::test(start_paused = true)]
async fn test_queued_upload_is_persisted_by_schedule() {
    let (service, storage, repo) = service(&fast_config());
    service.on_startup().await.unwrap();
    assert_eq!(service.state(), SchedulerState::Running);

    service.enqueue_upload("a.txt", Some("text/plain".into()), 2, Bytes::from_static(b"hi"));
    assert_eq!(repo.file_count().await, 0);

    tokio::time::sleep(Duration::from_secs(61)).await;

    let files = repo.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename, "a.txt");
    assert_eq!(storage.get(&files[0].path).unwrap(), Bytes::from_static(b"hi"));

    service.on_shutdown().await.unwrap();
    assert_eq!(service.state(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_runs_after_shutdown() {
    let (service, storage, _repo) = service(&fast_config());
    service.on_startup().await.unwrap();
    service.on_shutdown().await.unwrap();

    service.enqueue_upload("late.txt", None, 1, Bytes::from_static(b"x"));
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(storage.writes(), 0);
    assert_eq!(service.queue().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_row_cap_runs_on_its_own_interval() {
    let (service, _storage, repo) = service(&fast_config());
    for i in 0..12 {
        repo.insert_user(&format!("user{i}@example.com")).await;
    }
    service.on_startup().await.unwrap();

    tokio::time::sleep(Duration::from_secs(599)).await;
    assert_eq!(repo.list_users().await.unwrap().len(), 12);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(repo.list_users().await.unwrap().len(), 10);

    service.on_shutdown().await.unwrap();
}

#[tokio::test]
async fn test_registers_enabled_tasks_only() {
    let mut config = fast_config();
    config.retention_sweep.enabled = false;
    let (service, _storage, _repo) = service(&config);

    assert_eq!(
        service.task_names(),
        vec![ROW_CAP_SWEEP.to_string(), UPLOAD_DRAIN.to_string()]
    );
    let err = service.run_task(RETENTION_SWEEP).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_run_task_drains_immediately() {
    let (service, _storage, repo) = service(&fast_config());
    service.enqueue_upload("now.txt", None, 3, Bytes::from_static(b"now"));

    let summary = service.run_task(UPLOAD_DRAIN).await.unwrap().unwrap();
    assert_eq!(summary["stored"], 1);
    assert_eq!(repo.file_count().await, 1);
}

#[tokio::test]
async fn test_lifecycle_out_of_order() {
    let (service, _storage, _repo) = service(&fast_config());

    let err = service.on_shutdown().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);

    service.on_startup().await.unwrap();
    let err = service.on_startup().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
    service.on_shutdown().await.unwrap();
}

#[test]
fn test_invalid_schedule_is_rejected() {
    let mut config = fast_config();
    config.upload_drain.interval_seconds = 0;

    let storage = Arc::new(MemoryStorage::new());
    let repos = RepositorySet::memory(Arc::new(MemoryRepository::new()));
    let err = MaintenanceService::new(&config, "files", storage, &repos).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn test_unrepresentable_retention_fails_cleanly() {
    for minutes in [1u64 << 62, u64::MAX] {
        let config = MaintenanceConfig {
            retention_minutes: minutes,
            ..fast_config()
        };

        let storage = Arc::new(MemoryStorage::new());
        let repos = RepositorySet::memory(Arc::new(MemoryRepository::new()));
        let err = MaintenanceService::new(&config, "files", storage, &repos).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
