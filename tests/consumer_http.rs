// tests/consumer_http.rs
//
// HttpSource over a real socket: against the artifact server, and against stand-in
// servers that misbehave (bad status, bad JSON, too slow).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use chrono::{TimeZone, Utc};

use daily_news_digest::api;
use daily_news_digest::consumer::{Consumer, DigestSource, HttpSource, LoadPath, MemoryCache};
use daily_news_digest::producer::{ArtifactStore, FileArtifact};
use daily_news_digest::{ConsumerError, Digest, FetchError, Story};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn sample() -> Digest {
    Digest {
        date: "2026-10-19".into(),
        updated_at: "2026-10-19T06:00:00.000Z".into(),
        stories: vec![Story {
            headline: "Rates unchanged".into(),
            summary: "Central bank holds.".into(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn source(url: String) -> HttpSource {
    HttpSource::new(url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetches_published_artifact_from_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("news.json");
    FileArtifact::new(&path).publish(&sample()).await.unwrap();
    let base = spawn(api::router(&path)).await;

    let consumer = Consumer::new(
        Arc::new(source(format!("{base}{}", api::ARTIFACT_ROUTE))),
        Arc::new(MemoryCache::new()),
        Duration::from_secs(6 * 3600),
    );
    let loaded = consumer
        .load_at(Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(loaded.path, LoadPath::Network);
    assert_eq!(loaded.digest, sample());
}

#[tokio::test]
async fn request_bypasses_intermediate_caches() {
    let seen = Arc::new(Mutex::new(HeaderMap::new()));
    let s = seen.clone();
    let app = Router::new().route(
        "/news.json",
        get(move |headers: HeaderMap| {
            let s = s.clone();
            async move {
                *s.lock().unwrap() = headers;
                serde_json::to_string(&sample()).unwrap()
            }
        }),
    );
    let base = spawn(app).await;

    source(format!("{base}/news.json")).fetch().await.unwrap();
    let headers = seen.lock().unwrap().clone();
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["pragma"], "no-cache");
}

#[tokio::test]
async fn non_success_status_is_status_error() {
    let app = Router::new().route(
        "/news.json",
        get(|| async { (StatusCode::NOT_FOUND, "missing") }),
    );
    let base = spawn(app).await;

    let err = source(format!("{base}/news.json")).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(404)), "got {err:?}");
}

#[tokio::test]
async fn invalid_json_is_parse_error() {
    let app = Router::new().route("/news.json", get(|| async { "<html>captive portal</html>" }));
    let base = spawn(app).await;

    let err = source(format!("{base}/news.json")).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn wrongly_typed_fields_are_not_a_parse_error() {
    let app = Router::new().route(
        "/news.json",
        get(|| async {
            r#"{"date":null,"updatedAt":"2026-10-19T06:00:00.000Z","fallback":"no",
                "stories":[{"headline":"H","summary":null,"category":7,"region":"Mars","urgency":null}]}"#
        }),
    );
    let base = spawn(app).await;

    let d = source(format!("{base}/news.json")).fetch().await.expect("lenient parse");
    assert_eq!(d.date, "");
    assert!(!d.fallback);
    assert_eq!(d.stories[0].summary, "");
    assert_eq!(d.stories[0].category, Some(serde_json::json!(7)));
    assert_eq!(d.stories[0].region_str(), Some("Mars"));
}

#[tokio::test]
async fn timeout_counts_as_fetch_failure() {
    let app = Router::new().route(
        "/news.json",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            serde_json::to_string(&sample()).unwrap()
        }),
    );
    let base = spawn(app).await;

    let slow = HttpSource::new(format!("{base}/news.json"), Duration::from_millis(100)).unwrap();
    let consumer = Consumer::new(
        Arc::new(slow),
        Arc::new(MemoryCache::new()),
        Duration::from_secs(60),
    );
    let err = consumer.load_digest().await.unwrap_err();
    assert!(
        matches!(err, ConsumerError::Unavailable(FetchError::Network(ref e)) if e.is_timeout()),
        "got {err:?}"
    );
}
