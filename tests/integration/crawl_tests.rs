//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing pages, the detail
//! pages and the phone-reveal endpoint, and run full crawls end-to-end
//! against an in-memory or temporary database.

use ria_cars::config::Config;
use ria_cars::crawler::{run_crawl, Coordinator};
use ria_cars::storage::{SharedStorage, SqliteStorage, Storage};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/uk/car/used/";
const PHONE_PATH: &str = "/bff/final-page/public/auto/popUp/";

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(base_url: &str, max_empty_pages: u32) -> Config {
    let mut config = Config::default();
    config.site.listing_url = format!("{}{}", base_url, LISTING_PATH);
    config.site.base_url = base_url.to_string();
    config.site.phone_url = format!("{}{}", base_url, PHONE_PATH);
    config.crawler.max_workers = 3;
    config.crawler.max_concurrent_requests = 2;
    config.crawler.max_empty_pages = max_empty_pages;
    config.crawler.request_timeout_secs = 5;
    config
}

fn memory_storage() -> SharedStorage {
    Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()))
}

fn listing_page(paths: &[&str]) -> String {
    let items: String = paths
        .iter()
        .map(|p| {
            format!(
                r#"<section class="ticket-item"><div class="hide" data-link-to-view="{}"></div></section>"#,
                p
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// A complete detail page with structured data, photos and phone identifiers
fn full_detail_page(price: u32) -> String {
    format!(
        r#"<html>
        <head>
            <script id="ldJson2" type="application/ld+json">
                {{"offers": {{"price": {price}}}, "mileageFromOdometer": {{"value": 150000}}}}
            </script>
            <script>window.ria.headPhoto = "https://cdn.riastatic.com/photos/auto/photo/porsche_911__1f.jpg";</script>
            <script data-owner-id="777"></script>
        </head>
        <body data-auto-id="35000001">
            <h1 class="head">Porsche 911 1997</h1>
            <section id="userInfoBlock"><div class="seller_info_name"><a href="/u/1">Олег</a></div></section>
            <a id="openPopupCommentSeller" data-phone-id="555">Показати</a>
            <img data-photo-id="7"><img data-photo-id="7"><img data-photo-id="9">
            <span class="state-num ua">AA 1234 BB</span>
            <div class="vin">WP0ZZZ99ZTSxxxx24</div>
        </body></html>"#,
        price = price
    )
}

/// Mounts the fallback for every listing page not mocked more specifically
async fn mount_empty_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(listing_page(&[])))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stops_after_consecutive_empty_pages() {
    let server = MockServer::start().await;

    // Page 4 has listings, but the run must stop after pages 1-3 come back empty
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "4"))
        .respond_with(html(listing_page(&["/uk/auto_late_4.html"])))
        .with_priority(1)
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(listing_page(&[])))
        .with_priority(10)
        .expect(3)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let coordinator = Coordinator::new(create_test_config(&server.uri(), 3), storage.clone())
        .expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.pages_scanned, 3);
    assert_eq!(summary.links_enqueued, 0);
    assert_eq!(storage.lock().unwrap().count_cars().unwrap(), 0);
}

#[tokio::test]
async fn test_empty_streak_resets_on_page_with_links() {
    let server = MockServer::start().await;

    for page in ["2", "4"] {
        let detail = format!("/uk/auto_car_{}.html", page);
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .and(query_param("page", page))
            .respond_with(html(listing_page(&[detail.as_str()])))
            .with_priority(1)
            .mount(&server)
            .await;
    }
    mount_empty_listing(&server).await;

    Mock::given(method("GET"))
        .and(path("/uk/auto_car_2.html"))
        .respond_with(html("<html><body><h1>Two</h1></body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uk/auto_car_4.html"))
        .respond_with(html("<html><body><h1>Four</h1></body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let summary = Coordinator::new(create_test_config(&server.uri(), 2), storage.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    // 1 empty, 2 links, 3 empty, 4 links, 5 and 6 empty
    assert_eq!(summary.pages_scanned, 6);
    assert_eq!(summary.links_enqueued, 2);
    assert_eq!(summary.records_saved, 2);
    assert_eq!(storage.lock().unwrap().count_cars().unwrap(), 2);
}

#[tokio::test]
async fn test_full_crawl_persists_valid_records_only() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .respond_with(html(listing_page(&[
            "/uk/auto_porsche_911_35000001.html",
            "/uk/auto_broken_35000002.html",
            "/uk/newauto/marka-porsche/",
        ])))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(html(listing_page(&["/uk/auto_gone_35000003.html"])))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_empty_listing(&server).await;

    Mock::given(method("GET"))
        .and(path("/uk/auto_porsche_911_35000001.html"))
        .respond_with(html(full_detail_page(12000)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uk/auto_broken_35000002.html"))
        .respond_with(html(
            r#"<html><head><script id="ldJson2">{"mileageFromOdometer": {"value": -5}}</script></head>
               <body><h1>Broken</h1></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uk/auto_gone_35000003.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(PHONE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "templates": [{"actionData": {"params": {"phone": "501234567"}}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let summary = Coordinator::new(create_test_config(&base, 2), storage.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_scanned, 4);
    assert_eq!(summary.links_enqueued, 3);
    assert_eq!(summary.records_saved, 1);
    assert_eq!(summary.records_rejected, 1);
    assert_eq!(summary.fetch_failures, 1);
    assert_eq!(summary.storage_failures, 0);

    let storage = storage.lock().unwrap();
    let cars = storage.list_cars(100, 0).unwrap();
    assert_eq!(cars.len(), 1);

    let car = &cars[0].record;
    assert_eq!(car.url, format!("{}/uk/auto_porsche_911_35000001.html", base));
    assert_eq!(car.title.as_deref(), Some("Porsche 911 1997"));
    assert_eq!(car.price_usd, Some(12000.0));
    assert_eq!(car.odometer, Some(150000));
    assert_eq!(car.seller_name.as_deref(), Some("Олег"));
    assert_eq!(car.phone_number.as_deref(), Some("+380501234567"));
    assert_eq!(
        car.image_url.as_deref(),
        Some("https://cdn.riastatic.com/photos/auto/photo/porsche_911__1f.jpg")
    );
    assert_eq!(car.image_count, Some(2));
    assert_eq!(car.plate_number.as_deref(), Some("AA1234BB"));
    assert_eq!(car.vin.as_deref(), Some("WP0ZZZ99ZTSXXXX24"));
}

#[tokio::test]
async fn test_listing_failures_count_as_empty_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let summary = Coordinator::new(create_test_config(&server.uri(), 2), memory_storage())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_scanned, 2);
    assert_eq!(summary.fetch_failures, 2);
}

#[tokio::test]
async fn test_recrawl_updates_in_place() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cars.db");

    let mut config = create_test_config(&server.uri(), 1);
    config.storage.database_path = db_path.to_string_lossy().into_owned();

    for (run, price) in [(1, 12000), (2, 9500)] {
        server.reset().await;
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .and(query_param("page", "1"))
            .respond_with(html(listing_page(&["/uk/auto_porsche_911_35000001.html"])))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_empty_listing(&server).await;
        Mock::given(method("GET"))
            .and(path("/uk/auto_porsche_911_35000001.html"))
            .respond_with(html(full_detail_page(price)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(PHONE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"phone": "0501234567"})))
            .mount(&server)
            .await;

        let summary = run_crawl(config.clone()).await.unwrap();
        assert_eq!(summary.records_saved, 1, "run {}", run);
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_cars().unwrap(), 1);

    let car = storage.get_car(1).unwrap().unwrap();
    assert_eq!(car.record.price_usd, Some(9500.0));
    assert_eq!(car.record.phone_number.as_deref(), Some("0501234567"));
}

#[tokio::test]
async fn test_slow_pages_drain_within_request_limit() {
    let server = MockServer::start().await;

    let details: Vec<String> = (1..=12).map(|n| format!("/uk/auto_slow_{}.html", n)).collect();
    let detail_refs: Vec<&str> = details.iter().map(String::as_str).collect();
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .respond_with(html(listing_page(&detail_refs)))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_empty_listing(&server).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/uk/auto_slow_\d+\.html$"))
        .respond_with(
            html("<html><body><h1>Slow car</h1></body></html>".to_string())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(12)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), 1);
    config.crawler.max_workers = 10;
    config.crawler.max_concurrent_requests = 2;

    let storage = memory_storage();
    let summary = Coordinator::new(config, storage.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    // Every queued page is processed before the run returns
    assert_eq!(summary.links_enqueued, 12);
    assert_eq!(summary.records_saved, 12);
    assert_eq!(storage.lock().unwrap().count_cars().unwrap(), 12);

    // 12 slow pages through 2 permits need at least 6 rounds of 200ms;
    // ten unthrottled workers would finish in about two
    assert!(
        summary.elapsed >= Duration::from_millis(1100),
        "finished in {:?}, request limit not enforced",
        summary.elapsed
    );
}
