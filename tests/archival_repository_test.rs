#[path = "utils/mod.rs"]
mod utils;

use tricrawl::modules::archival::{QueueStatus, StoreUpsert};

#[tokio::test]
async fn enqueue_is_idempotent_for_a_ready_entry() {
    let test_db = utils::test_db::TestDb::new();
    let repo = utils::factories::archival_repo(test_db.pool());

    let first = repo
        .enqueue(100, 1, "animasu", "https://cdn.example/ep1.mp4", None)
        .await
        .expect("first enqueue");
    assert_eq!(first.status, QueueStatus::Pending);

    repo.upsert_store(StoreUpsert {
        mal_id: 100,
        episode: 1,
        provider: "animasu".to_string(),
        resolution: None,
        file_key: "deadbeef".to_string(),
        account_index: 0,
        repo_id: "store-0".to_string(),
        path: "tricrawl-100/100/ep1/deadbeef.mp4".to_string(),
        direct_url: "https://store.example/deadbeef.mp4".to_string(),
        stream_url: "https://proxy.example/proxy?url=x".to_string(),
    })
    .await
    .expect("upsert_store");

    // Re-enqueueing the same key once it's `ready` must be a no-op: the
    // original video_url stays, the status stays `ready` (§4.8).
    let again = repo
        .enqueue(100, 1, "animasu", "https://cdn.example/different.mp4", None)
        .await
        .expect("second enqueue");
    assert_eq!(again.status, QueueStatus::Ready);
    assert_eq!(again.video_url, "https://cdn.example/ep1.mp4");
}

#[tokio::test]
async fn failed_entries_are_revived_by_a_fresh_enqueue() {
    let test_db = utils::test_db::TestDb::new();
    let repo = utils::factories::archival_repo(test_db.pool());

    let entry = repo
        .enqueue(200, 3, "samehadaku", "https://cdn.example/a.mp4", None)
        .await
        .expect("enqueue");
    repo.update_status(entry.id, QueueStatus::Failed, Some("download timed out"))
        .await
        .expect("update_status");

    let revived = repo
        .enqueue(200, 3, "samehadaku", "https://cdn.example/b.mp4", None)
        .await
        .expect("revive");
    assert_eq!(revived.status, QueueStatus::Pending);
    assert_eq!(revived.video_url, "https://cdn.example/b.mp4");
}

#[tokio::test]
async fn claim_respects_the_requested_batch_size() {
    let test_db = utils::test_db::TestDb::new();
    let repo = utils::factories::archival_repo(test_db.pool());

    for episode in 1..=3 {
        repo.enqueue(300, episode, "otakudesu", "https://cdn.example/x.mp4", None)
            .await
            .expect("enqueue");
    }

    let claimed = repo.claim(2).await.expect("claim");
    assert_eq!(claimed.len(), 2);
    for entry in &claimed {
        assert_eq!(entry.status, QueueStatus::Downloading);
    }
}

#[tokio::test]
async fn status_counts_tally_by_queue_status_and_archived_total() {
    let test_db = utils::test_db::TestDb::new();
    let repo = utils::factories::archival_repo(test_db.pool());

    repo.enqueue(400, 1, "animasu", "https://cdn.example/a.mp4", None)
        .await
        .expect("enqueue pending");
    let failing = repo
        .enqueue(400, 2, "animasu", "https://cdn.example/b.mp4", None)
        .await
        .expect("enqueue to fail");
    repo.update_status(failing.id, QueueStatus::Failed, Some("boom"))
        .await
        .expect("mark failed");

    let counts = repo.status_counts().await.expect("status_counts");
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.archived, 0);
}
