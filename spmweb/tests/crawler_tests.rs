//! Integration tests for spmweb

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use spmconfig::Config;
use spmsource::{Song, SongSource, SourceJob};
use spmweb::{Error, PageCrawler, PageCrawlerBuilder};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Extracts every `<li>...</li>` item of a line
fn list_items(line: &str) -> Vec<String> {
    line.split("<li>")
        .skip(1)
        .filter_map(|item| item.split("</li>").next())
        .map(str::to_string)
        .collect()
}

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

type Calls = Arc<Mutex<Vec<DateTime<Utc>>>>;

/// Daily history pages at `<base>/day/YYYY-MM-DD`; records every call
fn daily_history(
    calls: Calls,
) -> impl Fn(&str, DateTime<Utc>) -> (String, DateTime<Utc>) + Send + Sync {
    move |base: &str, t: DateTime<Utc>| {
        calls.lock().unwrap().push(t);
        (
            format!("{base}/day/{}", t.format("%Y-%m-%d")),
            t - ChronoDuration::days(1),
        )
    }
}

fn crawler_with(history: impl spmweb::HistoryUrlGenerator + 'static) -> PageCrawler {
    PageCrawler::builder()
        .song_extractor(list_items)
        .history_url_generator(history)
        .initial_sleep_bound(Duration::ZERO)
        .build()
        .unwrap()
}

/// Serves one song per day page, named after the date; `empty_days` get an
/// empty page instead
struct DayPages {
    empty_days: Vec<&'static str>,
}

impl Respond for DayPages {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let date = request.url.path().rsplit('/').next().unwrap_or_default().to_string();
        if self.empty_days.contains(&date.as_str()) {
            return ResponseTemplate::new(200).set_body_string("<html>\n<body></body>\n</html>\n");
        }
        ResponseTemplate::new(200).set_body_string(format!(
            "<html>\n<ol>\n<li>Artist - Song of {date}</li>\n</ol>\n</html>\n"
        ))
    }
}

async fn mount_days(server: &MockServer, empty_days: Vec<&'static str>) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/day/\d{4}-\d{2}-\d{2}$"))
        .respond_with(DayPages { empty_days })
        .mount(server)
        .await;
}

async fn collect(mut rx: mpsc::Receiver<Song>) -> Vec<Song> {
    let mut events = Vec::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("crawler closes the channel");
        match next {
            Some(song) => events.push(song),
            None => return events,
        }
    }
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

fn titles(events: &[Song]) -> Vec<&str> {
    events.iter().filter_map(Song::artist_title).collect()
}

#[tokio::test]
async fn test_live_mode_fetches_once_in_page_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/playlist"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ul>\n<li>A - 1</li><li>B - 2</li>\n</ul>\n<p>ad</p>\n<li>C - 3</li>\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = crawler_with(daily_history(Calls::default()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}/playlist", server.uri())),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(titles(&events), vec!["A - 1", "B - 2", "C - 3"]);
    assert!(events.iter().all(|song| !song.is_error()));
}

#[tokio::test]
async fn test_live_mode_empty_page_is_one_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>\n</html>\n"))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = crawler_with(daily_history(Calls::default()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}/empty", server.uri())),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(events.len(), 1);
    let err = events[0].error().unwrap().downcast_ref::<Error>();
    assert!(matches!(err, Some(Error::NoResults { .. })), "got {err:?}");
}

#[tokio::test]
async fn test_live_mode_transport_error_is_one_event() {
    let crawler = crawler_with(daily_history(Calls::default()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new("http://127.0.0.1:9/down"),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(events.len(), 1);
    let err = events[0].error().unwrap().downcast_ref::<Error>();
    assert!(matches!(err, Some(Error::Http(_))), "got {err:?}");
}

#[tokio::test]
async fn test_archive_walks_backwards_inclusive() {
    let server = MockServer::start().await;
    mount_days(&server, vec![]).await;

    let calls = Calls::default();
    let crawler = crawler_with(daily_history(calls.clone()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}|2020-01-01|2020-01-08", server.uri())),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    let expected_days: Vec<String> = (1..=8).rev().map(|d| format!("2020-01-{d:02}")).collect();

    assert_eq!(
        titles(&events),
        expected_days
            .iter()
            .map(|d| format!("Artist - Song of {d}"))
            .collect::<Vec<_>>()
    );
    assert_eq!(
        requested_paths(&server).await,
        expected_days
            .iter()
            .map(|d| format!("/day/{d}"))
            .collect::<Vec<_>>()
    );
    assert_eq!(calls.lock().unwrap().first(), Some(&day(2020, 1, 8)));
    assert_eq!(calls.lock().unwrap().last(), Some(&day(2020, 1, 1)));
}

#[tokio::test]
async fn test_archive_continues_after_failed_page() {
    let server = MockServer::start().await;
    mount_days(&server, vec!["2020-01-05"]).await;

    let crawler = crawler_with(daily_history(Calls::default()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}|2020-01-01|2020-01-08", server.uri())),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(events.len(), 8);
    assert_eq!(events.iter().filter(|song| song.is_error()).count(), 1);
    assert!(events[3].is_error());
    assert_eq!(events[4].artist_title(), Some("Artist - Song of 2020-01-04"));
    assert_eq!(events[7].artist_title(), Some("Artist - Song of 2020-01-01"));
}

#[tokio::test]
async fn test_archive_skips_december_but_advances() {
    let server = MockServer::start().await;
    mount_days(&server, vec![]).await;

    let calls = Calls::default();
    let crawler = crawler_with(daily_history(calls.clone()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}|2019-12-30|2020-01-02", server.uri())),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(
        titles(&events),
        vec!["Artist - Song of 2020-01-02", "Artist - Song of 2020-01-01"]
    );
    assert_eq!(
        requested_paths(&server).await,
        vec!["/day/2020-01-02", "/day/2020-01-01"]
    );
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            day(2020, 1, 2),
            day(2020, 1, 1),
            day(2019, 12, 31),
            day(2019, 12, 30)
        ]
    );
}

#[tokio::test]
async fn test_archive_stops_on_non_decreasing_timestamp() {
    let server = MockServer::start().await;
    mount_days(&server, vec![]).await;

    let calls = Calls::default();
    let recorded = calls.clone();
    let stuck = move |base: &str, t: DateTime<Utc>| {
        recorded.lock().unwrap().push(t);
        (format!("{base}/day/{}", t.format("%Y-%m-%d")), t)
    };

    let crawler = crawler_with(stuck);
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}|2020-01-01|2020-01-08", server.uri())),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].artist_title(), Some("Artist - Song of 2020-01-08"));
    match events[1].error().unwrap().downcast_ref::<Error>() {
        Some(Error::NonDecreasingTimestamp { next, current }) => {
            assert_eq!(*next, day(2020, 1, 8));
            assert_eq!(*current, day(2020, 1, 8));
        }
        other => panic!("expected non-decreasing error, got {other:?}"),
    }
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_archive_guard_applies_to_skipped_month() {
    let forward = |base: &str, t: DateTime<Utc>| (base.to_string(), t + ChronoDuration::days(1));

    let crawler = crawler_with(forward);
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new("http://127.0.0.1:9|2019-12-01|2019-12-24"),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0].error().unwrap().downcast_ref::<Error>(),
        Some(Error::NonDecreasingTimestamp { .. })
    ));
}

#[tokio::test]
async fn test_archive_start_after_end_is_noop() {
    let server = MockServer::start().await;
    mount_days(&server, vec![]).await;

    let calls = Calls::default();
    let crawler = crawler_with(daily_history(calls.clone()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}|2020-02-01|2020-01-01", server.uri())),
            tx,
        )
        .unwrap();

    assert!(collect(rx).await.is_empty());
    assert!(calls.lock().unwrap().is_empty());
    assert!(requested_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_bad_job_rejected_without_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = crawler_with(daily_history(Calls::default()));
    let uri = server.uri();

    let cases = [
        format!("{uri}|2020-01-01|2020-01-08|extra"),
        format!("{uri}|2020-01-01"),
        format!("{uri}|2020-01-01|tomorrow"),
    ];
    for job in cases {
        let (tx, mut rx) = mpsc::channel(16);
        let err = crawler
            .start(CancellationToken::new(), SourceJob::new(job.clone()), tx)
            .unwrap_err();
        assert!(err.is_configuration(), "{job}: {err:?}");
        assert!(rx.recv().await.is_none());
    }

    let (tx, _rx) = mpsc::channel(16);
    assert!(matches!(
        crawler.start(
            CancellationToken::new(),
            SourceJob::new(format!("{uri}|2020-01-01|2020-01-08|extra")),
            tx,
        ),
        Err(Error::TooManyUrlParts(4))
    ));
}

#[tokio::test]
async fn test_cancelled_archive_fetches_nothing() {
    let server = MockServer::start().await;
    mount_days(&server, vec![]).await;

    let crawler = crawler_with(daily_history(Calls::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            cancel,
            SourceJob::new(format!("{}|2020-01-01|2020-01-08", server.uri())),
            tx,
        )
        .unwrap();

    assert!(collect(rx).await.is_empty());
    assert!(requested_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_cancel_during_live_jitter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<li>A - 1</li>\n"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = PageCrawler::builder()
        .song_extractor(list_items)
        .history_url_generator(daily_history(Calls::default()))
        .initial_sleep_bound(Duration::from_secs(3600))
        .seed(3)
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(cancel.clone(), SourceJob::new(server.uri()), tx)
        .unwrap();

    cancel.cancel();
    assert!(collect(rx).await.is_empty());
}

#[tokio::test]
async fn test_runs_as_song_source_from_config() {
    let server = MockServer::start().await;
    mount_days(&server, vec![]).await;

    let config = Config::from_yaml_str("web:\n  initial_sleep_secs: 0\n").unwrap();
    let crawler = PageCrawlerBuilder::from_config(&config)
        .unwrap()
        .song_extractor(list_items)
        .history_url_generator(daily_history(Calls::default()))
        .build()
        .unwrap();
    let source: Arc<dyn SongSource> = Arc::new(crawler);

    let (tx, rx) = mpsc::channel(16);
    source
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}/day/2020-06-01", server.uri())),
            tx,
        )
        .unwrap();

    let events = collect(rx).await;
    assert_eq!(titles(&events), vec!["Artist - Song of 2020-06-01"]);
}

#[tokio::test]
async fn test_archive_stops_when_receiver_hangs_up() {
    let server = MockServer::start().await;
    mount_days(&server, vec![]).await;

    let calls = Calls::default();
    let crawler = crawler_with(daily_history(calls.clone()));
    let (tx, mut rx) = mpsc::channel(1);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}|2020-01-01|2020-03-01", server.uri())),
            tx,
        )
        .unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.artist_title(), Some("Artist - Song of 2020-03-01"));
    drop(rx);

    // one page buffered, one blocked on send, then the failed send ends the walk
    tokio::time::sleep(Duration::from_millis(300)).await;
    let settled = calls.lock().unwrap().len();
    assert!(settled <= 3, "generator called {settled} times");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(calls.lock().unwrap().len(), settled);
    assert!(requested_paths(&server).await.len() <= 3);
}

#[tokio::test(start_paused = true)]
async fn test_live_mode_fetches_after_jitter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/playlist"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<li>A - 1</li>\n"))
        .expect(1)
        .mount(&server)
        .await;

    // no request timeout: paused time would otherwise race the mock server
    let crawler = PageCrawler::builder()
        .client(reqwest::Client::new())
        .song_extractor(list_items)
        .history_url_generator(daily_history(Calls::default()))
        .initial_sleep_bound(Duration::from_secs(10))
        .seed(11)
        .build()
        .unwrap();
    let started = tokio::time::Instant::now();
    let (tx, mut rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}/playlist", server.uri())),
            tx,
        )
        .unwrap();

    let mut events = Vec::new();
    while let Some(song) = rx.recv().await {
        events.push(song);
    }
    assert_eq!(titles(&events), vec!["A - 1"]);
    assert_eq!(events.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(11));
}

#[tokio::test]
async fn test_builder_sends_shared_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/playlist"))
        .and(header("user-agent", spmweb::DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<li>A - 1</li>\n"))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::from_yaml_str("").unwrap();
    assert_eq!(config.get_user_agent().unwrap(), spmweb::DEFAULT_USER_AGENT);

    let crawler = crawler_with(daily_history(Calls::default()));
    let (tx, rx) = mpsc::channel(16);
    crawler
        .start(
            CancellationToken::new(),
            SourceJob::new(format!("{}/playlist", server.uri())),
            tx,
        )
        .unwrap();

    assert_eq!(titles(&collect(rx).await), vec!["A - 1"]);
}
