mod common;

use common::*;
use dvrclip::download::task::{MediaSource, TaskState};
use dvrclip::download::transfer::{HttpTransferFactory, Transfer, TransferFactory};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_http_transfer_writes_served_bytes() {
    let content = generate_test_content(4096);
    let (_server, server_url) = setup_mock_media_server(42, content.clone()).await;

    let source = MediaSource::new(&server_url, 42, "clip").unwrap();
    let factory = HttpTransferFactory::new().unwrap();
    let transfer = factory.create(&source);

    let temp_dir = tempfile::tempdir().unwrap();
    let destination = temp_dir.path().join("clip.mkv");
    transfer.run(&destination).await.unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), content);
}

#[tokio::test]
async fn test_http_transfer_creates_missing_directories() {
    let content = generate_test_content(128);
    let (_server, server_url) = setup_mock_media_server(7, content.clone()).await;

    let source = MediaSource::new(&server_url, 7, "clip").unwrap();
    let transfer = HttpTransferFactory::new().unwrap().create(&source);

    let temp_dir = tempfile::tempdir().unwrap();
    let destination = temp_dir.path().join("cam1").join("2026-08").join("clip.mkv");
    transfer.run(&destination).await.unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), content);
}

#[tokio::test]
async fn test_http_transfer_error_status_fails() {
    let (_server, server_url) = setup_error_media_server(503).await;

    let source = MediaSource::new(&server_url, 1, "clip").unwrap();
    let transfer = HttpTransferFactory::new().unwrap().create(&source);

    let temp_dir = tempfile::tempdir().unwrap();
    let destination = temp_dir.path().join("clip.mkv");
    assert!(transfer.run(&destination).await.is_err());
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_queue_saves_clip_end_to_end() {
    let content = generate_test_content(2048);
    let (_server, server_url) = setup_mock_media_server(9, content.clone()).await;
    let temp_dir = tempfile::tempdir().unwrap();

    let factory = Arc::new(HttpTransferFactory::new().unwrap());
    let queue = test_queue(factory, 2);

    let source = MediaSource::new(&server_url, 9, "front-door").unwrap();
    let handles = queue.enqueue_batch(vec![source], temp_dir.path()).await;
    assert_eq!(handles.len(), 1);

    queue.tick().await;
    wait_for_state(&queue, handles[0], TaskState::Finished).await;

    let destination = temp_dir.path().join("front-door.mkv");
    assert_eq!(std::fs::read(&destination).unwrap(), content);
    assert_eq!(queue.last_save_directory().await, temp_dir.path());
}

#[tokio::test]
async fn test_failed_transfer_still_frees_slot() {
    let (_server, server_url) = setup_error_media_server(500).await;
    let temp_dir = tempfile::tempdir().unwrap();

    let factory = Arc::new(HttpTransferFactory::new().unwrap());
    let queue = test_queue(factory, 1);

    let source = MediaSource::new(&server_url, 1, "broken").unwrap();
    let handle = queue
        .enqueue(source, &temp_dir.path().join("broken.mkv"))
        .await
        .unwrap();

    queue.tick().await;
    // Error detail is the transfer's concern; the queue only sees a
    // finished transfer and a freed slot.
    wait_for_state(&queue, handle, TaskState::Finished).await;
    assert_eq!(queue.active_count().await, 0);
}
