//! Integration tests for the upload drain job.

mod helpers;

use std::sync::Arc;

use filedrop_database::repositories::{FileRepository, MemoryRepository};
use filedrop_worker::jobs::{DrainReport, UploadDrainJob};
use filedrop_worker::naming::parse_timestamp;
use filedrop_worker::task::ScheduledAction;

use helpers::{MemoryStorage, RejectingFiles, TestEnv};

fn stored_name(path: &str) -> &str {
    let segment = path.rsplit('/').next().unwrap();
    segment.split_once('_').unwrap().1
}

#[tokio::test]
async fn test_single_upload_is_persisted() {
    let env = TestEnv::new().await;
    let job = UploadDrainJob::new(
        env.queue.clone(),
        env.storage.clone(),
        env.repo.clone(),
        "files",
    );

    env.enqueue("a.txt", b"hi");
    let report = job.drain().await;

    assert_eq!(
        report,
        DrainReport {
            drained: 1,
            stored: 1,
            failed: 0
        }
    );

    let files = env.repo.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    let record = &files[0];
    assert_eq!(record.filename, "a.txt");
    assert!(record.path.starts_with("files/"));
    assert!(record.path.ends_with("_a.txt"));
    assert!(parse_timestamp(&record.path).is_ok());

    let on_disk = std::fs::read(env.dir.path().join(&record.path)).unwrap();
    assert_eq!(on_disk, b"hi");
    assert!(env.queue.is_empty());
}

#[tokio::test]
async fn test_each_upload_written_exactly_once() {
    let storage = Arc::new(MemoryStorage::new());
    let repo = Arc::new(MemoryRepository::new());
    let env = TestEnv::new().await;
    let job = UploadDrainJob::new(env.queue.clone(), storage.clone(), repo.clone(), "files");

    for name in ["one.txt", "two.txt", "three.txt", "four.txt", "five.txt"] {
        env.enqueue(name, b"payload");
    }

    let first = job.drain().await;
    assert_eq!(first.stored, 5);
    assert_eq!(storage.writes(), 5);
    assert_eq!(repo.file_count().await, 5);

    let second = job.drain().await;
    assert_eq!(second, DrainReport::default());
    assert_eq!(storage.writes(), 5);
    assert_eq!(repo.file_count().await, 5);
}

#[tokio::test]
async fn test_same_name_in_one_pass_gets_distinct_paths() {
    let env = TestEnv::new().await;
    let job = UploadDrainJob::new(
        env.queue.clone(),
        env.storage.clone(),
        env.repo.clone(),
        "files",
    );

    env.enqueue("a.txt", b"first");
    env.enqueue("a.txt", b"second");
    let report = job.drain().await;
    assert_eq!(report.stored, 2);

    let files = env.repo.list_files().await.unwrap();
    assert_ne!(files[0].path, files[1].path);

    let mut names: Vec<&str> = files.iter().map(|f| stored_name(&f.path)).collect();
    names.sort();
    assert_eq!(names, vec!["a-1.txt", "a.txt"]);

    for (record, expected) in files.iter().zip([&b"first"[..], &b"second"[..]]) {
        let on_disk = std::fs::read(env.dir.path().join(&record.path)).unwrap();
        assert_eq!(on_disk, expected);
    }
}

#[tokio::test]
async fn test_write_failure_drops_only_that_upload() {
    let env = TestEnv::new().await;
    let storage = Arc::new(MemoryStorage::new());
    storage.fail_writes_containing("broken");
    let repo = Arc::new(MemoryRepository::new());
    let job = UploadDrainJob::new(env.queue.clone(), storage.clone(), repo.clone(), "files");

    env.enqueue("ok-1.txt", b"1");
    env.enqueue("broken.txt", b"2");
    env.enqueue("ok-2.txt", b"3");

    let report = job.drain().await;
    assert_eq!(report.drained, 3);
    assert_eq!(report.stored, 2);
    assert_eq!(report.failed, 1);

    let names: Vec<String> = repo
        .list_files()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.filename)
        .collect();
    assert_eq!(names, vec!["ok-1.txt", "ok-2.txt"]);

    // Dropped, not re-queued.
    assert!(env.queue.is_empty());
    assert_eq!(job.drain().await, DrainReport::default());
}

#[tokio::test]
async fn test_record_failure_removes_written_bytes() {
    let env = TestEnv::new().await;
    let storage = Arc::new(MemoryStorage::new());
    let repo = Arc::new(MemoryRepository::new());
    let files = Arc::new(RejectingFiles {
        inner: repo.clone(),
        reject_filename: "orphan.txt".to_string(),
    });
    let job = UploadDrainJob::new(env.queue.clone(), storage.clone(), files, "files");

    env.enqueue("orphan.txt", b"lost");
    env.enqueue("kept.txt", b"kept");

    let report = job.drain().await;
    assert_eq!(report.stored, 1);
    assert_eq!(report.failed, 1);

    let paths = storage.paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with("_kept.txt"));
    assert_eq!(repo.file_count().await, 1);
}

#[tokio::test]
async fn test_untrusted_filename_stays_inside_upload_dir() {
    let env = TestEnv::new().await;
    let job = UploadDrainJob::new(
        env.queue.clone(),
        env.storage.clone(),
        env.repo.clone(),
        "files",
    );

    env.enqueue("../../etc/passwd", b"root");
    env.enqueue("", b"anonymous");
    assert_eq!(job.drain().await.stored, 2);

    let files = env.repo.list_files().await.unwrap();
    assert_eq!(files[0].filename, "../../etc/passwd");
    assert!(files[0].path.starts_with("files/"));
    assert_eq!(stored_name(&files[0].path), "passwd");
    assert_eq!(stored_name(&files[1].path), "upload");
    assert!(!env.dir.path().join("etc").exists());
}

#[tokio::test]
async fn test_scheduled_run_reports_summary() {
    let env = TestEnv::new().await;
    let job = UploadDrainJob::new(
        env.queue.clone(),
        env.storage.clone(),
        env.repo.clone(),
        "files",
    );

    env.enqueue("a.txt", b"hi");
    let summary = job.run().await.unwrap().unwrap();
    assert_eq!(summary["drained"], 1);
    assert_eq!(summary["stored"], 1);
    assert_eq!(summary["failed"], 0);
}
