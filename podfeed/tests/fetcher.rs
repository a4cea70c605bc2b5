use podfeed::{EpisodeLimit, Error, FeedFetcher, FetchCallbacks};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_BODY: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
<channel>
  <title>Test Show</title>
  <description>A show for tests</description>
  <item><title>one</title>
    <enclosure url="https://cdn.example.com/1.mp3" type="audio/mpeg"/></item>
  <item><title>no audio here</title></item>
  <item><title>two</title>
    <enclosure url="https://cdn.example.com/2.mp3" type="audio/mpeg"/></item>
  <item><title>pdf attachment</title>
    <enclosure url="https://cdn.example.com/x.pdf" type="application/pdf"/></item>
  <item><title>three</title>
    <enclosure url="https://cdn.example.com/3.mp3" type="audio/mpeg"/></item>
</channel></rss>"#;

fn fetcher(max_retries: u32, backoff: Duration) -> FeedFetcher {
    FeedFetcher::builder()
        .max_retries(max_retries)
        .backoff_base(backoff)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

async fn serve_feed() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn fetch_keeps_only_items_with_audio_enclosures() {
    let server = serve_feed().await;
    let fetcher = fetcher(0, Duration::from_millis(10));

    let podcast = fetcher
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await
        .unwrap();

    assert_eq!(podcast.title, "Test Show");
    assert_eq!(podcast.episode_count(), 3);
    let titles: Vec<_> = podcast.episodes.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["one", "two", "three"]);
}

#[tokio::test]
async fn latest_n_truncation_applies_after_filtering() {
    let server = serve_feed().await;
    let fetcher = FeedFetcher::builder()
        .episode_limit(EpisodeLimit::Latest(2))
        .build()
        .unwrap();

    let podcast = fetcher
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await
        .unwrap();

    let titles: Vec<_> = podcast.episodes.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["one", "two"]);
}

#[tokio::test]
async fn persistent_server_errors_retry_then_surface() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = fetcher(3, Duration::from_millis(5));
    let err = fetcher
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Status(503)));
    // total attempts = max_retries + 1
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn client_errors_are_permanent_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fetcher(3, Duration::from_millis(5));
    let err = fetcher
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Status(404)));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn transient_failure_recovers_within_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .mount(&server)
        .await;

    let fetcher = fetcher(3, Duration::from_millis(5));
    let podcast = fetcher
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await
        .unwrap();

    assert_eq!(podcast.episode_count(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn feed_without_playable_episodes_is_a_distinct_error() {
    let server = MockServer::start().await;
    let body = r#"<?xml version="1.0"?><rss version="2.0"><channel>
        <title>Empty</title>
        <item><title>text only</title></item>
    </channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let fetcher = fetcher(0, Duration::from_millis(5));
    let err = fetcher
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoEpisodes));
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_request() {
    let fetcher = fetcher(0, Duration::from_millis(5));
    let err = fetcher.fetch("not-a-feed").await.unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[tokio::test]
async fn fetch_async_fires_success_then_complete() {
    let server = serve_feed().await;
    let fetcher = fetcher(0, Duration::from_millis(5));

    let result: Arc<Mutex<Option<podfeed::Podcast>>> = Arc::new(Mutex::new(None));
    let result_clone = Arc::clone(&result);
    let error_fired = Arc::new(AtomicBool::new(false));
    let error_clone = Arc::clone(&error_fired);
    let (complete_tx, complete_rx) = tokio::sync::oneshot::channel();

    fetcher.fetch_async(
        &format!("{}/feed.xml", server.uri()),
        FetchCallbacks {
            on_success: Some(Box::new(move |podcast| {
                *result_clone.lock().unwrap() = Some(podcast);
            })),
            on_error: Some(Box::new(move |_| {
                error_clone.store(true, Ordering::SeqCst);
            })),
            on_complete: Some(Box::new(move || {
                let _ = complete_tx.send(());
            })),
        },
    );

    complete_rx.await.unwrap();
    assert!(!error_fired.load(Ordering::SeqCst));
    let podcast = result.lock().unwrap().take().unwrap();
    assert_eq!(podcast.episode_count(), 3);
    assert!(!fetcher.is_busy());
}

#[tokio::test]
async fn cancelling_mid_backoff_fires_only_complete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    // Long backoff so the worker is parked in its retry sleep when we cancel
    let fetcher = fetcher(3, Duration::from_secs(30));

    let success_fired = Arc::new(AtomicBool::new(false));
    let success_clone = Arc::clone(&success_fired);
    let error_fired = Arc::new(AtomicBool::new(false));
    let error_clone = Arc::clone(&error_fired);
    let (complete_tx, complete_rx) = tokio::sync::oneshot::channel();

    fetcher.fetch_async(
        &format!("{}/feed.xml", server.uri()),
        FetchCallbacks {
            on_success: Some(Box::new(move |_| {
                success_clone.store(true, Ordering::SeqCst);
            })),
            on_error: Some(Box::new(move |_| {
                error_clone.store(true, Ordering::SeqCst);
            })),
            on_complete: Some(Box::new(move || {
                let _ = complete_tx.send(());
            })),
        },
    );

    // Let the first attempt fail and the backoff begin
    tokio::time::sleep(Duration::from_millis(300)).await;
    let started = Instant::now();
    fetcher.cancel();

    complete_rx.await.unwrap();
    // The cancel interrupted the 30 s backoff rather than waiting it out
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!success_fired.load(Ordering::SeqCst));
    assert!(!error_fired.load(Ordering::SeqCst));
}

#[tokio::test]
async fn new_fetch_supersedes_the_previous_one() {
    let slow_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&slow_server)
        .await;
    let fast_server = serve_feed().await;

    let fetcher = fetcher(5, Duration::from_secs(30));

    let first_outcome = Arc::new(AtomicBool::new(false));
    let first_clone = Arc::clone(&first_outcome);
    let first_err_clone = Arc::clone(&first_outcome);
    let (first_complete_tx, first_complete_rx) = tokio::sync::oneshot::channel();

    fetcher.fetch_async(
        &format!("{}/feed.xml", slow_server.uri()),
        FetchCallbacks {
            on_success: Some(Box::new(move |_| {
                first_clone.store(true, Ordering::SeqCst);
            })),
            on_error: Some(Box::new(move |_| {
                first_err_clone.store(true, Ordering::SeqCst);
            })),
            on_complete: Some(Box::new(move || {
                let _ = first_complete_tx.send(());
            })),
        },
    );

    tokio::time::sleep(Duration::from_millis(200)).await;

    let second_result: Arc<Mutex<Option<podfeed::Podcast>>> = Arc::new(Mutex::new(None));
    let second_clone = Arc::clone(&second_result);
    let (second_complete_tx, second_complete_rx) = tokio::sync::oneshot::channel();

    fetcher.fetch_async(
        &format!("{}/feed.xml", fast_server.uri()),
        FetchCallbacks {
            on_success: Some(Box::new(move |podcast| {
                *second_clone.lock().unwrap() = Some(podcast);
            })),
            on_error: None,
            on_complete: Some(Box::new(move || {
                let _ = second_complete_tx.send(());
            })),
        },
    );

    first_complete_rx.await.unwrap();
    second_complete_rx.await.unwrap();

    // Superseded fetch produced neither success nor error
    assert!(!first_outcome.load(Ordering::SeqCst));
    assert!(second_result.lock().unwrap().is_some());
}
