//! DuckDuckGo gateway contract tests against a mock server

use chrono::NaiveDate;
use duck_search::config::DuckDuckGoSettings;
use duck_search::network::HttpClient;
use duck_search::query::{Region, SafeSearch, TimeRange, TimeWindow};
use duck_search::results::normalize;
use duck_search::{DuckDuckGo, QueryDescriptor, ResultKind, SearchError, SearchGateway};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VQD_PAGE: &str = r#"<html><script>DDG.deep.initialize('/d.js?q=tokyo&l=jp-jp&vqd=4-31415926535&p=1');</script></html>"#;

fn gateway(server: &MockServer) -> DuckDuckGo {
    let settings = DuckDuckGoSettings {
        base_url: server.uri(),
        html_url: format!("{}/html/", server.uri()),
    };
    DuckDuckGo::new(HttpClient::new().unwrap(), &settings)
}

fn html_page(hits: &[(&str, &str, &str)]) -> String {
    let mut html = String::from("<html><body><div id=\"links\">");
    for (title, href, snippet) in hits {
        html.push_str(&format!(
            r#"<div class="result results_links web-result"><h2><a class="result__a" href="{}">{}</a></h2><a class="result__snippet">{}</a></div>"#,
            href, title, snippet
        ));
    }
    html.push_str("</div></body></html>");
    html
}

async fn mount_vqd(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "tokyo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VQD_PAGE))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_text_search_parses_and_paginates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("&s=2&"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page(&[(
            "Tokyo Metro",
            "https://www.tokyometro.jp/",
            "Subway lines",
        )])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("q=tokyo"))
        .and(body_string_contains("kl=jp-jp"))
        .and(body_string_contains("kp=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page(&[
            (
                "Tokyo - Wikipedia",
                "//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FTokyo&rut=1",
                "Capital of <b>Japan</b>",
            ),
            ("Go Tokyo", "https://www.gotokyo.org/", "Official guide"),
        ])))
        .mount(&server)
        .await;

    let query = QueryDescriptor::simple("tokyo", ResultKind::Text).with_safety(SafeSearch::Strict);
    let records = gateway(&server).search(&query).await.unwrap();

    let hrefs: Vec<&str> = records.iter().map(|r| r["href"].as_str().unwrap()).collect();
    assert_eq!(
        hrefs,
        [
            "https://en.wikipedia.org/wiki/Tokyo",
            "https://www.gotokyo.org/",
            "https://www.tokyometro.jp/"
        ]
    );
    assert_eq!(records[0]["body"], "Capital of Japan");

    let normalized = normalize(ResultKind::Text, records);
    assert_eq!(normalized.table.len(), 3);
    assert!(normalized.skipped.is_empty());
}

#[tokio::test]
async fn test_text_search_respects_max_results_and_keywords() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("q=tokyo+ramen+-chain"))
        .and(body_string_contains("df=2024-01-01..2024-01-31"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page(&[
            ("One", "https://one.example/", ""),
            ("Two", "https://two.example/", ""),
            ("Three", "https://three.example/", ""),
        ])))
        .mount(&server)
        .await;

    let mut query = QueryDescriptor::simple("tokyo", ResultKind::Text)
        .with_time_window(
            TimeWindow::explicit(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .unwrap(),
        )
        .with_max_results(2);
    query.and_keywords = vec!["ramen".to_string()];
    query.exclude_keywords = vec!["chain".to_string()];

    let records = gateway(&server).search(&query).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["title"], "Two");
}

#[tokio::test]
async fn test_image_search_uses_vqd_and_follows_next() {
    let server = MockServer::start().await;
    mount_vqd(&server).await;

    Mock::given(method("GET"))
        .and(path("/i.js"))
        .and(query_param("s", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"title": "Tokyo tower", "image": "https://img.example.com/3.jpg", "thumbnail": "https://tse.example.com/3", "url": "https://example.com/3", "height": 600, "width": 800, "source": "Bing"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/i.js"))
        .and(query_param("vqd", "4-31415926535"))
        .and(query_param("o", "json"))
        .and(query_param("l", "wt-wt"))
        .and(query_param("f", "time:Week,,,,,"))
        .and(query_param("p", "-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": "i.js?q=tokyo&o=json&s=2&u=bing",
            "results": [
                {"title": "Shibuya <b>crossing</b>", "image": "https://img.example.com/1.jpg", "thumbnail": "https://tse.example.com/1", "url": "https://example.com/1", "height": 600, "width": 800, "source": "Bing"},
                {"title": "Duplicate", "image": "https://img.example.com/1.jpg", "url": "https://example.com/dup"}
            ]
        })))
        .mount(&server)
        .await;

    let query = QueryDescriptor::simple("tokyo", ResultKind::Image)
        .with_region(Region::Global)
        .with_time_window(TimeWindow::Relative(TimeRange::Week));
    let records = gateway(&server).search(&query).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["title"], "Shibuya crossing");
    assert_eq!(records[1]["image"], "https://img.example.com/3.jpg");

    let normalized = normalize(ResultKind::Image, records);
    assert_eq!(normalized.table.len(), 2);
}

#[tokio::test]
async fn test_news_search_maps_fields() {
    let server = MockServer::start().await;
    mount_vqd(&server).await;

    Mock::given(method("GET"))
        .and(path("/news.js"))
        .and(query_param("noamp", "1"))
        .and(query_param("df", "d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"date": 1704067200, "excerpt": "New year in <b>Tokyo</b>", "title": "Celebrations", "url": "https://news.example.com/1", "source": "Example"}
            ]
        })))
        .mount(&server)
        .await;

    let query = QueryDescriptor::simple("tokyo", ResultKind::News)
        .with_time_window(TimeWindow::Relative(TimeRange::Day));
    let records = gateway(&server).search(&query).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["body"], "New year in Tokyo");
    assert_eq!(records[0]["date"], "2024-01-01T00:00:00+00:00");

    let normalized = normalize(ResultKind::News, records);
    let row: Vec<String> = normalized
        .table
        .rows()
        .next()
        .unwrap()
        .iter()
        .map(|cell| cell.as_export_text().to_string())
        .collect();
    assert_eq!(row, ["Celebrations", "New year in Tokyo", "https://news.example.com/1"]);
}

#[tokio::test]
async fn test_video_search_passes_records_through() {
    let server = MockServer::start().await;
    mount_vqd(&server).await;

    Mock::given(method("GET"))
        .and(path("/v.js"))
        .and(query_param("f", "publishedAfter:m,,"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "title": "Walking in Tokyo",
                    "content": "https://www.youtube.com/watch?v=abc",
                    "duration": "12:34",
                    "images": {"large": "https://i.ytimg.com/vi/abc/hq.jpg", "small": "https://i.ytimg.com/vi/abc/s.jpg"},
                    "publisher": "YouTube"
                }
            ]
        })))
        .mount(&server)
        .await;

    let query = QueryDescriptor::simple("tokyo", ResultKind::Video)
        .with_time_window(TimeWindow::Relative(TimeRange::Month));
    let records = gateway(&server).search(&query).await.unwrap();
    assert_eq!(records[0]["publisher"], "YouTube");

    let normalized = normalize(ResultKind::Video, records);
    let row: Vec<String> = normalized
        .table
        .rows()
        .next()
        .unwrap()
        .iter()
        .map(|cell| cell.as_export_text().to_string())
        .collect();
    assert_eq!(
        row,
        [
            "Walking in Tokyo",
            "https://i.ytimg.com/vi/abc/hq.jpg",
            "https://www.youtube.com/watch?v=abc",
            "12:34"
        ]
    );
}

#[tokio::test]
async fn test_provider_error_is_gateway_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let query = QueryDescriptor::simple("tokyo", ResultKind::Text);
    let err = gateway(&server).search(&query).await.unwrap_err();
    assert!(matches!(err, SearchError::Gateway(ref msg) if msg.contains("503")));
}

#[tokio::test]
async fn test_missing_vqd_is_gateway_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let query = QueryDescriptor::simple("tokyo", ResultKind::Image);
    let err = gateway(&server).search(&query).await.unwrap_err();
    assert!(matches!(err, SearchError::Gateway(_)));
}
