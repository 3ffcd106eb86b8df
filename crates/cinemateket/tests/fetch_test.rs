//! Fetcher tests against a local copy of the listing and film pages.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use chrono::{NaiveDate, NaiveTime};
use cinemateket::utils::UNGROUPED_SERIES_TITLE;
use cinemateket::{DateRange, FetcherConfig, ProgramFetcher, ScraperError};
use tokio::net::TcpListener;

const PAGE_0: &str = include_str!("../fixtures/all_films_page_0.html");
const PAGE_1: &str = include_str!("../fixtures/all_films_page_1.html");
const VERTIGO: &str = include_str!("../fixtures/film_vertigo.html");
const REAR_WINDOW: &str = include_str!("../fixtures/film_rear_window.html");
const HIMLEN: &str = include_str!("../fixtures/film_himlen_over_berlin.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    BrokenListing,
    FailingFilm,
    SlowListing,
}

#[derive(Clone)]
struct MockSite {
    mode: Mode,
    requests: Arc<AtomicUsize>,
}

async fn listing(
    State(site): State<MockSite>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    site.requests.fetch_add(1, Ordering::SeqCst);
    if site.mode == Mode::SlowListing {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    if site.mode == Mode::BrokenListing {
        return Html("<html><body><p>Siden er under vedligeholdelse</p></body></html>")
            .into_response();
    }
    match params.get("page").map(String::as_str) {
        Some("1") => Html(PAGE_1).into_response(),
        _ => Html(PAGE_0).into_response(),
    }
}

async fn film(State(site): State<MockSite>, Path(slug): Path<String>) -> Response {
    site.requests.fetch_add(1, Ordering::SeqCst);
    if site.mode == Mode::FailingFilm && slug == "rear-window" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match slug.as_str() {
        "vertigo" => Html(VERTIGO).into_response(),
        "rear-window" => Html(REAR_WINDOW).into_response(),
        "himlen-over-berlin" => Html(HIMLEN).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_mock_site(mode: Mode) -> (ProgramFetcher, Arc<AtomicUsize>) {
    start_mock_site_with_timeout(mode, FetcherConfig::default().timeout).await
}

async fn start_mock_site_with_timeout(
    mode: Mode,
    timeout: Duration,
) -> (ProgramFetcher, Arc<AtomicUsize>) {
    let requests = Arc::new(AtomicUsize::new(0));
    let site = MockSite {
        mode,
        requests: requests.clone(),
    };

    let router = Router::new()
        .route("/cinemateket/biograf/alle-film", get(listing))
        .route("/cinemateket/biograf/alle-film/film/{slug}", get(film))
        .with_state(site);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let fetcher = ProgramFetcher::with_config(FetcherConfig {
        base_url: format!("http://{}", addr),
        timeout,
        ..Default::default()
    })
    .unwrap();

    (fetcher, requests)
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn test_fetch_single_published_screening() {
    let (fetcher, _) = start_mock_site(Mode::Normal).await;

    let records = fetcher.fetch(date(1), date(1)).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, date(1));
    assert_eq!(records[0].time, time(18, 0));
    assert_eq!(records[0].title, "Vertigo");
}

#[tokio::test]
async fn test_fetch_range_is_filtered_sorted_and_unique() {
    let (fetcher, _) = start_mock_site(Mode::Normal).await;

    let records = fetcher.fetch(date(1), date(7)).await.unwrap();

    let rows: Vec<(NaiveDate, NaiveTime, &str)> = records
        .iter()
        .map(|r| (r.date, r.time, r.title.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (date(1), time(18, 0), "Vertigo"),
            (date(2), time(20, 30), "Vertigo"),
            (date(3), time(21, 0), "Rear Window"),
            (date(4), time(19, 0), "Himlen over Berlin"),
            (date(5), time(16, 15), "Himlen over Berlin"),
        ]
    );

    assert!(records.iter().all(|r| date(1) <= r.date && r.date <= date(7)));
    assert!(records.windows(2).all(|w| (w[0].date, w[0].time) <= (w[1].date, w[1].time)));

    let sold_out = &records[1];
    assert_eq!(sold_out.venue.as_deref(), Some("Bio Asta"));
    assert!(sold_out.sold_out);

    let event = &records[3];
    assert_eq!(event.venue.as_deref(), Some("Bio Carl"));
    assert!(event.is_event);
    assert_eq!(
        event.metadata.as_deref(),
        Some("Vesttyskland, 1987. Længde: 128 min.")
    );
}

#[tokio::test]
async fn test_fetch_reversed_range_makes_no_request() {
    let (fetcher, requests) = start_mock_site(Mode::Normal).await;

    let err = fetcher.fetch(date(7), date(1)).await.unwrap_err();

    assert!(matches!(err, ScraperError::InvalidRange { .. }));
    assert_eq!(requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_without_screenings_in_range_is_empty() {
    let (fetcher, requests) = start_mock_site(Mode::Normal).await;

    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
    let records = fetcher.fetch(start, end).await.unwrap();

    assert!(records.is_empty());
    // two listing pages and three distinct film pages
    assert_eq!(requests.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_fetch_film_links_follows_pagination() {
    let (fetcher, _) = start_mock_site(Mode::Normal).await;

    let links = fetcher.fetch_film_links().await.unwrap();

    let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Vertigo", "Rear Window", "Himlen over Berlin"]);
    assert!(links[0].url.ends_with("/cinemateket/biograf/alle-film/film/vertigo"));
}

#[tokio::test]
async fn test_fetch_respects_max_pages() {
    let (fetcher, requests) = start_mock_site(Mode::Normal).await;
    let fetcher = ProgramFetcher::with_config(FetcherConfig {
        max_pages: 1,
        ..fetcher.config().clone()
    })
    .unwrap();

    let links = fetcher.fetch_film_links().await.unwrap();

    assert_eq!(links.len(), 2);
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetch_http_failure_is_fetch_error() {
    let (fetcher, _) = start_mock_site(Mode::FailingFilm).await;

    let err = fetcher.fetch(date(1), date(7)).await.unwrap_err();

    assert!(matches!(err, ScraperError::Fetch(_)), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_timeout_is_fetch_error() {
    let (fetcher, requests) =
        start_mock_site_with_timeout(Mode::SlowListing, Duration::from_millis(100)).await;

    let err = fetcher.fetch(date(1), date(7)).await.unwrap_err();

    match err {
        ScraperError::Fetch(e) => assert!(e.is_timeout(), "got {e:?}"),
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetch_unexpected_listing_is_parse_error() {
    let (fetcher, _) = start_mock_site(Mode::BrokenListing).await;

    let err = fetcher.fetch(date(1), date(7)).await.unwrap_err();

    assert!(matches!(err, ScraperError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_unreachable_site_is_fetch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = ProgramFetcher::with_config(FetcherConfig {
        base_url: format!("http://{}", addr),
        ..Default::default()
    })
    .unwrap();

    let err = fetcher.fetch(date(1), date(1)).await.unwrap_err();
    assert!(matches!(err, ScraperError::Fetch(_)), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_programme_groups_films_by_series() {
    let (fetcher, _) = start_mock_site(Mode::Normal).await;

    let range = DateRange::new(date(1), date(7)).unwrap();
    let programme = fetcher.fetch_programme(range).await.unwrap();

    assert_eq!(programme.screenings.len(), 5);

    let series: Vec<&str> = programme.series.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(series, vec!["Hitchcock i Hollywood", UNGROUPED_SERIES_TITLE]);

    let hitchcock = &programme.series[0];
    assert!(
        hitchcock
            .url
            .as_deref()
            .is_some_and(|u| u.ends_with("/serier/serie/hitchcock-i-hollywood"))
    );
    let films: Vec<&str> = hitchcock.films.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(films, vec!["Vertigo", "Rear Window"]);
    assert_eq!(hitchcock.films[0].screenings.len(), 2);
}
