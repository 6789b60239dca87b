//! Integration tests for the feed lifecycle: add, filter, toggle, delete.
//!
//! Every test runs against each backend so the SQLite store and the
//! in-memory store are held to the same contract. SQLite runs in-memory
//! unless a test needs several connections.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use feeds_mgmt::storage::{Database, Feed, FeedQuery, FeedRepository, InMemoryRepository};

async fn backends() -> Vec<(&'static str, Arc<dyn FeedRepository>)> {
    let memory: Arc<dyn FeedRepository> = Arc::new(InMemoryRepository::new());
    let sqlite: Arc<dyn FeedRepository> = Arc::new(Database::open_in_memory().await.unwrap());
    vec![("memory", memory), ("sqlite", sqlite)]
}

fn feed_a() -> Feed {
    Feed::new("https://a.example.com/rss.xml", "P1", "C1", true)
}

fn feed_b() -> Feed {
    Feed::new("https://b.example.com/rss.xml", "P1", "C2", false)
}

async fn seed(repo: &dyn FeedRepository, feeds: &[Feed]) {
    for feed in feeds {
        repo.add_feed(feed).await.unwrap();
    }
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test]
async fn test_filter_by_provider_and_state() {
    for (name, repo) in backends().await {
        seed(repo.as_ref(), &[feed_a(), feed_b()]).await;

        let enabled_p1 = repo
            .get_feeds(&FeedQuery::enabled(true).with_provider("P1"))
            .await
            .unwrap();
        assert_eq!(enabled_p1, vec![feed_a()], "backend {}", name);

        let disabled = repo.get_feeds(&FeedQuery::enabled(false)).await.unwrap();
        assert_eq!(disabled, vec![feed_b()], "backend {}", name);

        let unknown = repo
            .get_feeds(&FeedQuery::enabled(true).with_provider("P2"))
            .await
            .unwrap();
        assert!(unknown.is_empty(), "backend {}", name);
    }
}

#[tokio::test]
async fn test_filter_by_category() {
    for (name, repo) in backends().await {
        seed(
            repo.as_ref(),
            &[
                feed_a(),
                Feed::new("https://c.example.com/rss.xml", "P2", "C1", true),
                Feed::new("https://d.example.com/rss.xml", "P2", "C3", true),
            ],
        )
        .await;

        let c1 = repo
            .get_feeds(&FeedQuery::enabled(true).with_category("C1"))
            .await
            .unwrap();
        let urls: Vec<&str> = c1.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example.com/rss.xml", "https://c.example.com/rss.xml"],
            "backend {}",
            name
        );

        let p2_c3 = repo
            .get_feeds(
                &FeedQuery::enabled(true)
                    .with_provider("P2")
                    .with_category("C3"),
            )
            .await
            .unwrap();
        assert_eq!(p2_c3.len(), 1, "backend {}", name);
        assert_eq!(p2_c3[0].url, "https://d.example.com/rss.xml");
    }
}

#[tokio::test]
async fn test_empty_store_lists_nothing() {
    for (name, repo) in backends().await {
        for enabled in [true, false] {
            let feeds = repo.get_feeds(&FeedQuery::enabled(enabled)).await.unwrap();
            assert!(feeds.is_empty(), "backend {}", name);
        }
    }
}

// ============================================================================
// Add
// ============================================================================

#[tokio::test]
async fn test_round_trip_preserves_every_field() {
    for (name, repo) in backends().await {
        let feed = Feed::new(
            "http://feeds.bbci.co.uk/news/uk/rss.xml",
            "BBC News",
            "UK",
            true,
        );
        repo.add_feed(&feed).await.unwrap();

        let listed = repo
            .get_feeds(
                &FeedQuery::enabled(true)
                    .with_provider("BBC News")
                    .with_category("UK"),
            )
            .await
            .unwrap();
        assert_eq!(listed, vec![feed], "backend {}", name);
    }
}

#[tokio::test]
async fn test_duplicate_add_never_mutates_record() {
    for (name, repo) in backends().await {
        repo.add_feed(&feed_a()).await.unwrap();

        let clash = Feed::new(feed_a().url, "Other", "Elsewhere", false);
        let err = repo.add_feed(&clash).await.unwrap_err();
        assert!(err.is_duplicate(), "backend {}: {:?}", name, err);

        assert_eq!(
            repo.get_feeds(&FeedQuery::enabled(true)).await.unwrap(),
            vec![feed_a()],
            "backend {}",
            name
        );
        assert!(
            repo.get_feeds(&FeedQuery::enabled(false))
                .await
                .unwrap()
                .is_empty(),
            "backend {}",
            name
        );
    }
}

// ============================================================================
// State changes
// ============================================================================

#[tokio::test]
async fn test_set_state_is_idempotent() {
    for (name, repo) in backends().await {
        repo.add_feed(&feed_a()).await.unwrap();

        repo.set_feed_state(&feed_a().url, true).await.unwrap();
        repo.set_feed_state(&feed_a().url, true).await.unwrap();

        let feeds = repo.get_feeds(&FeedQuery::enabled(true)).await.unwrap();
        assert_eq!(feeds, vec![feed_a()], "backend {}", name);
    }
}

#[tokio::test]
async fn test_disable_then_enable_moves_feed_between_listings() {
    for (name, repo) in backends().await {
        repo.add_feed(&feed_a()).await.unwrap();

        repo.set_feed_state(&feed_a().url, false).await.unwrap();
        assert!(repo
            .get_feeds(&FeedQuery::enabled(true))
            .await
            .unwrap()
            .is_empty());
        let disabled = repo.get_feeds(&FeedQuery::enabled(false)).await.unwrap();
        assert_eq!(disabled.len(), 1, "backend {}", name);
        assert!(!disabled[0].enabled);
        assert_eq!(disabled[0].provider, "P1");

        repo.set_feed_state(&feed_a().url, true).await.unwrap();
        assert_eq!(
            repo.get_feeds(&FeedQuery::enabled(true)).await.unwrap(),
            vec![feed_a()],
            "backend {}",
            name
        );
    }
}

#[tokio::test]
async fn test_missing_url_is_not_found_for_set_and_delete() {
    for (name, repo) in backends().await {
        let url = "https://never.example.com/rss.xml";

        let err = repo.set_feed_state(url, true).await.unwrap_err();
        assert!(err.is_not_found(), "backend {}: {:?}", name, err);

        let err = repo.delete_feed(url).await.unwrap_err();
        assert!(err.is_not_found(), "backend {}: {:?}", name, err);
    }
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_is_final_and_url_can_be_reused() {
    for (name, repo) in backends().await {
        seed(repo.as_ref(), &[feed_a(), feed_b()]).await;

        repo.delete_feed(&feed_a().url).await.unwrap();

        for enabled in [true, false] {
            let feeds = repo.get_feeds(&FeedQuery::enabled(enabled)).await.unwrap();
            assert!(
                feeds.iter().all(|f| f.url != feed_a().url),
                "backend {}",
                name
            );
        }

        let err = repo.delete_feed(&feed_a().url).await.unwrap_err();
        assert!(err.is_not_found(), "backend {}: {:?}", name, err);
        let err = repo.set_feed_state(&feed_a().url, false).await.unwrap_err();
        assert!(err.is_not_found(), "backend {}: {:?}", name, err);

        let readded = Feed::new(feed_a().url, "P3", "C9", true);
        repo.add_feed(&readded).await.unwrap();
        assert_eq!(
            repo.get_feeds(&FeedQuery::enabled(true)).await.unwrap(),
            vec![readded],
            "backend {}",
            name
        );

        // The other feed is untouched
        assert_eq!(
            repo.get_feeds(&FeedQuery::enabled(false)).await.unwrap(),
            vec![feed_b()]
        );
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check_passes_on_open_store() {
    for (name, repo) in backends().await {
        assert!(repo.health_check().await.is_ok(), "backend {}", name);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

async fn race_same_url(repo: Arc<dyn FeedRepository>, contenders: usize) {
    let mut handles = Vec::new();
    for i in 0..contenders {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            let feed = Feed::new(
                "https://race.example.com/rss.xml",
                format!("Provider {}", i),
                "Race",
                true,
            );
            repo.add_feed(&feed).await
        }));
    }

    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(e) if e.is_duplicate() => duplicates += 1,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(duplicates, contenders - 1);

    let feeds = repo.get_feeds(&FeedQuery::enabled(true)).await.unwrap();
    assert_eq!(feeds.len(), 1);
    assert_eq!(feeds[0].url, "https://race.example.com/rss.xml");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_memory() {
    race_same_url(Arc::new(InMemoryRepository::new()), 2).await;
    race_same_url(Arc::new(InMemoryRepository::new()), 8).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_sqlite_file() {
    let dir = std::env::temp_dir().join(format!(
        "feeds_mgmt_lifecycle_race_{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("feeds.db");
    std::fs::remove_file(&path).ok();

    let db = Database::open(path.to_str().unwrap(), 4, Duration::from_secs(5))
        .await
        .unwrap();
    race_same_url(Arc::new(db.clone()), 2).await;

    db.delete_feed("https://race.example.com/rss.xml")
        .await
        .unwrap();
    race_same_url(Arc::new(db.clone()), 8).await;

    db.close().await;
    std::fs::remove_dir_all(&dir).ok();
}
