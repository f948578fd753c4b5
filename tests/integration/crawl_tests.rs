//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run items
//! through the batch boundary with the real reqwest backend.

use seedcrawl::batch::{process_item, run_batch, ItemInput, OutputRecord};
use seedcrawl::config::UserAgentConfig;
use seedcrawl::crawler::{FetchBackend, HttpFetcher, RetryPolicy, SessionSettings};
use seedcrawl::model::{OutcomeStatus, Payload};
use seedcrawl::{CrawlError, FetchError, Operation};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn settings(timeout: Duration, retry: RetryPolicy) -> SessionSettings {
    SessionSettings {
        request_timeout: timeout,
        retry,
    }
}

fn fast_settings() -> SessionSettings {
    settings(Duration::from_secs(5), RetryPolicy::none())
}

fn http_factory(
    timeout: Duration,
) -> impl Fn() -> Result<Arc<dyn FetchBackend>, FetchError> + Send + Sync {
    let user_agent = user_agent();
    move || {
        let fetcher = HttpFetcher::new(&user_agent, timeout)?;
        Ok(Arc::new(fetcher) as Arc<dyn FetchBackend>)
    }
}

async fn serve(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_extract_links_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();

    let html = r#"<html><body>
        <a href="/a">A</a>
        <a href="/a">A again</a>
        <a href="b">B</a>
        <a href="https://other.test/x">External</a>
        <a href="mailto:someone@example.com">Mail</a>
        <a href="%%%">Broken</a>
        <map><area href="/c"></map>
    </body></html>"#;
    serve(&server, "/", html).await;

    let input = ItemInput::new(format!("{}/", base), Operation::ExtractLinks).with_max_depth(2);
    let outcome = process_item(0, &input, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert!(outcome.message.contains("links"));

    let links = match outcome.payload {
        Some(Payload::Links { url, links }) => {
            assert_eq!(url, format!("{}/", base));
            links
        }
        other => panic!("unexpected payload {:?}", other),
    };

    let unique: HashSet<&String> = links.iter().collect();
    assert_eq!(unique.len(), links.len(), "links must be deduplicated");
    for link in &links {
        let parsed = Url::parse(link).unwrap();
        assert!(parsed.scheme() == "http" || parsed.scheme() == "https");
    }

    let expected: HashSet<String> = [
        format!("{}/a", base),
        format!("{}/b", base),
        format!("{}/c", base),
        "https://other.test/x".to_string(),
    ]
    .into_iter()
    .collect();
    assert_eq!(links.into_iter().collect::<HashSet<_>>(), expected);

    // Only the seed page is fetched
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_requests_carry_cache_buster() {
    let server = MockServer::start().await;
    serve(&server, "/page", "<p>hi</p>").await;

    let input = ItemInput::new(format!("{}/page?lang=en", server.uri()), Operation::ExtractHtml);
    process_item(0, &input, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let query: Vec<(String, String)> = requests[0].url.query_pairs().into_owned().collect();
    assert!(query.contains(&("lang".to_string(), "en".to_string())));
    let token = query
        .iter()
        .find(|(key, _)| key == "_t")
        .map(|(_, value)| value.clone())
        .expect("cache-bust token missing");
    assert!(token.parse::<i64>().unwrap() > 0);
}

#[tokio::test]
async fn test_extract_text_end_to_end() {
    let server = MockServer::start().await;
    let html = r#"<html><head><title>T</title><script>var x = 1;</script></head>
        <body>  <h1>Welcome</h1><p>to the test</p>  </body></html>"#;
    serve(&server, "/", html).await;

    let input = ItemInput::new(format!("{}/", server.uri()), Operation::ExtractText);
    let outcome = process_item(0, &input, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap();

    match outcome.payload {
        Some(Payload::Text { text, .. }) => {
            assert!(text.starts_with("Welcome"));
            assert!(text.ends_with("to the test"));
            assert!(!text.contains("var x"));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_extract_html_truncated() {
    let server = MockServer::start().await;
    let html = format!("<html><body>{}</body></html>", "y".repeat(150_000));
    serve(&server, "/big", &html).await;

    let input = ItemInput::new(format!("{}/big", server.uri()), Operation::ExtractHtml);
    let outcome = process_item(0, &input, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap();

    match outcome.payload {
        Some(Payload::Html { html, .. }) => {
            assert_eq!(html.chars().count(), 100_003);
            assert!(html.starts_with("<html><body>"));
            assert!(html.ends_with("yyy..."));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_links_resolved_against_redirect_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/docs/index.html"))
        .mount(&server)
        .await;
    serve(&server, "/docs/index.html", r#"<a href="page.html">next</a>"#).await;

    let input = ItemInput::new(format!("{}/old", server.uri()), Operation::ExtractLinks);
    let outcome = process_item(0, &input, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap();

    assert_eq!(
        outcome.payload,
        Some(Payload::Links {
            url: format!("{}/old", server.uri()),
            links: vec![format!("{}/docs/page.html", server.uri())],
        })
    );
}

#[tokio::test]
async fn test_not_found_is_failure_not_empty_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    for operation in [Operation::ExtractText, Operation::ExtractHtml, Operation::ExtractLinks] {
        let input = ItemInput::new(format!("{}/missing", server.uri()), operation);
        let err = process_item(4, &input, &http_factory(Duration::from_secs(5)), &fast_settings())
            .await
            .unwrap_err();

        assert_eq!(err.index, 4);
        assert!(matches!(err.source, CrawlError::Failed(_)));
        assert!(err.to_string().contains("404"));
    }
}

#[tokio::test]
async fn test_server_error_is_retried_within_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    serve(&server, "/flaky", r#"<a href="/ok">second time lucky</a>"#).await;

    let retry = RetryPolicy {
        max_retries: 2,
        delay: Duration::from_millis(10),
    };
    let input = ItemInput::new(format!("{}/flaky", server.uri()), Operation::ExtractLinks);
    let outcome = process_item(
        0,
        &input,
        &http_factory(Duration::from_secs(5)),
        &settings(Duration::from_secs(5), retry),
    )
    .await
    .unwrap();

    assert_eq!(
        outcome.payload,
        Some(Payload::Links {
            url: format!("{}/flaky", server.uri()),
            links: vec![format!("{}/ok", server.uri())],
        })
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_single_page_budget_leaves_no_room_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let retry = RetryPolicy {
        max_retries: 2,
        delay: Duration::from_millis(10),
    };
    let input = ItemInput::new(format!("{}/", server.uri()), Operation::ExtractHtml);
    let err = process_item(
        0,
        &input,
        &http_factory(Duration::from_secs(5)),
        &settings(Duration::from_secs(5), retry),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("503"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_slow_page_times_out_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>late</p>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let timeout = Duration::from_millis(300);
    let input = ItemInput::new(format!("{}/slow", server.uri()), Operation::ExtractText);
    let err = process_item(
        0,
        &input,
        &http_factory(timeout),
        &settings(timeout, RetryPolicy::none()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err.source, CrawlError::Failed(_)));
}

#[tokio::test]
async fn test_validation_happens_before_network() {
    let server = MockServer::start().await;
    serve(&server, "/", "<p>never</p>").await;

    let items = vec![
        ItemInput {
            url: None,
            operation: Some("extractText".to_string()),
            max_depth: None,
        },
        ItemInput::new("   ", Operation::ExtractHtml),
        ItemInput::new("ftp://files.test/", Operation::ExtractLinks),
    ];

    let records = run_batch(&items, true, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    for (index, record) in records.iter().enumerate() {
        match record {
            OutputRecord::Failed {
                item_index, error, ..
            } => {
                assert_eq!(*item_index, index);
                assert!(error.starts_with("Validation error"));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_isolates_items() {
    let server = MockServer::start().await;
    serve(&server, "/one", r#"<a href="/two">two</a>"#).await;
    serve(&server, "/two", "<body>two</body>").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let items = vec![
        ItemInput::new(format!("{}/one", server.uri()), Operation::ExtractLinks),
        ItemInput::new(format!("{}/gone", server.uri()), Operation::ExtractText),
        ItemInput::new(format!("{}/two", server.uri()), Operation::ExtractText),
    ];

    let records = run_batch(&items, true, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap();

    assert!(records[0].is_success());
    assert!(matches!(&records[1], OutputRecord::Failed { item_index: 1, .. }));
    assert_eq!(
        records[2],
        OutputRecord::Success(seedcrawl::CrawlOutcome::success(
            format!("Successfully extracted text from {}/two", server.uri()),
            Payload::Text {
                url: format!("{}/two", server.uri()),
                text: "two".to_string(),
            },
        ))
    );

    let err = run_batch(&items, false, &http_factory(Duration::from_secs(5)), &fast_settings())
        .await
        .unwrap_err();
    assert_eq!(err.index, 1);
    assert!(err.to_string().contains("[item 1]"));
}
