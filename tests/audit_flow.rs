//! End-to-end audit tests
//!
//! These tests serve a small site from a wiremock server (robots.txt,
//! sitemaps, pages) and drive the full pipeline: discovery, crawl,
//! issue detection, and scoring.

use sitepulse::config::{AuditConfig, Config, OutputConfig, RulesConfig, UserAgentConfig};
use sitepulse::crawler::Auditor;
use sitepulse::check::CheckStatus;
use sitepulse::storage::{SqliteStorage, Storage};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the given database path
fn create_test_config(db_path: &str, max_urls: u32) -> Config {
    Config {
        audit: AuditConfig {
            max_urls,
            fetch_timeout_secs: 5,
            max_concurrent_fetches: 4,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestAuditor".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        rules: RulesConfig::default(),
    }
}

/// Builds a minimal HTML page body
///
/// Every generated page carries a meta description and three internal
/// links so only the deliberately injected defects trigger rules.
fn page_html(title: Option<&str>, h1: Option<&str>, img_without_alt: bool) -> String {
    let title_tag = title
        .map(|t| format!("<title>{}</title>", t))
        .unwrap_or_default();
    let h1_tag = h1.map(|h| format!("<h1>{}</h1>", h)).unwrap_or_default();
    let img_tag = if img_without_alt {
        r#"<img src="/banner.png">"#
    } else {
        ""
    };

    format!(
        r#"<html><head>{}<meta name="description" content="A test page"></head>
        <body>{}{}
        <a href="/nav-one">One</a>
        <a href="/nav-two">Two</a>
        <a href="/nav-three">Three</a>
        </body></html>"#,
        title_tag, h1_tag, img_tag
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_sitemap(server: &MockServer, route: &str, urls: &[String]) {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{}</loc></url>", u))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    );

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(xml)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_audit_with_sitemap() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    mount_sitemap(
        &mock_server,
        "/sitemap.xml",
        &[
            format!("{}/", base_url),
            format!("{}/about", base_url),
            format!("{}/dup-a", base_url),
            format!("{}/dup-b", base_url),
            format!("{}/missing", base_url),
        ],
    )
    .await;

    mount_page(
        &mock_server,
        "/",
        page_html(
            Some("Welcome to the Example Test Site"),
            Some("Welcome"),
            false,
        ),
    )
    .await;

    // A page with a pile of deliberate defects
    mount_page(&mock_server, "/about", page_html(None, None, true)).await;

    let dup_title = Some("Duplicate Title Shared Between Pages");
    mount_page(&mock_server, "/dup-a", page_html(dup_title, Some("A"), false)).await;
    mount_page(&mock_server, "/dup-b", page_html(dup_title, Some("B"), false)).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").expect("Failed to create auditor");
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .expect("Audit failed to start");

    let check = auditor.check_status(check_id).expect("Failed to read check");
    assert_eq!(check.status, CheckStatus::Completed);
    assert!(check.finished_at.is_some());
    assert!(check.used_sitemap);
    assert!(check.robots_checked);
    assert_eq!(check.total_urls_crawlable, 5);
    assert_eq!(check.total_urls_crawled, 5);
    assert_eq!(check.http_errors_count, 1);

    // The mock site is served over plain HTTP, so every 200 page also
    // carries a no_https error and the score bottoms out
    assert_eq!(check.health_score, Some(0.0));
    assert_eq!(check.errors_count, 5);
    assert_eq!(check.warnings_count, 3);
    assert_eq!(check.notices_count, 1);

    // Inspect stored rows through a second connection
    let storage = SqliteStorage::new(Path::new(&db_path)).expect("Failed to open DB");
    let pages = storage.get_pages_for_check(check_id).unwrap();
    assert_eq!(pages.len(), 5);
    assert!(
        pages.iter().all(|p| p.raw_html.is_none()),
        "raw markup must be cleared after detection"
    );

    let issues = storage.get_issues_for_check(check_id).unwrap();
    let types: Vec<&str> = issues.iter().map(|i| i.issue_type.as_str()).collect();
    assert!(types.contains(&"missing_title"));
    assert!(types.contains(&"missing_h1"));
    assert!(types.contains(&"missing_alt_text"));
    assert_eq!(
        types.iter().filter(|t| **t == "duplicate_title").count(),
        2
    );
    assert!(!types.contains(&"orphan_page"), "orphan rule defaults off");
}

#[tokio::test]
async fn test_robots_disallow_respected() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&mock_server)
        .await;

    mount_sitemap(
        &mock_server,
        "/sitemap.xml",
        &[
            format!("{}/public", base_url),
            format!("{}/private/secret", base_url),
        ],
    )
    .await;

    mount_page(
        &mock_server,
        "/public",
        page_html(Some("A Public Page With A Fine Title"), Some("Public"), false),
    )
    .await;

    // The disallowed URL must never be fetched
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").unwrap();
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    let check = auditor.check_status(check_id).unwrap();
    assert_eq!(check.status, CheckStatus::Completed);
    assert_eq!(check.total_urls_crawlable, 1);
    assert_eq!(check.total_urls_crawled, 1);
    assert!(check.robots_checked);
}

#[tokio::test]
async fn test_sitemap_index_union_deduplicated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let index_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{}/sitemap-a.xml</loc></sitemap>
  <sitemap><loc>{}/sitemap-b.xml</loc></sitemap>
</sitemapindex>"#,
        base_url, base_url
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(index_xml)
                .insert_header("content-type", "application/xml"),
        )
        .mount(&mock_server)
        .await;

    // Both children list /shared; the union must carry it once
    mount_sitemap(
        &mock_server,
        "/sitemap-a.xml",
        &[format!("{}/", base_url), format!("{}/shared", base_url)],
    )
    .await;
    mount_sitemap(
        &mock_server,
        "/sitemap-b.xml",
        &[format!("{}/shared", base_url), format!("{}/extra", base_url)],
    )
    .await;

    for route in ["/", "/shared", "/extra"] {
        mount_page(
            &mock_server,
            route,
            page_html(Some("A Page Title Of Reasonable Length"), Some("H"), false),
        )
        .await;
    }

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").unwrap();
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    let check = auditor.check_status(check_id).unwrap();
    assert_eq!(check.status, CheckStatus::Completed);
    assert!(check.used_sitemap);
    assert_eq!(check.total_urls_crawlable, 3);
    assert_eq!(check.total_urls_crawled, 3);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let pages = storage.get_pages_for_check(check_id).unwrap();
    let mut urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 3, "no URL may be crawled twice");
}

#[tokio::test]
async fn test_no_sitemap_falls_back_to_root() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // No robots.txt, no sitemaps anywhere
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    for route in ["/sitemap.xml", "/sitemap_index.xml", "/sitemaps.xml"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
    }

    mount_page(
        &mock_server,
        "/",
        page_html(Some("The Lone Root Page Of This Site"), Some("Root"), false),
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").unwrap();
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    let check = auditor.check_status(check_id).unwrap();
    assert_eq!(check.status, CheckStatus::Completed);
    assert!(!check.used_sitemap);
    assert!(!check.robots_checked);
    assert_eq!(check.total_urls_crawlable, 1);
    assert_eq!(check.total_urls_crawled, 1);
}

#[tokio::test]
async fn test_redirects_recorded_not_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    mount_sitemap(
        &mock_server,
        "/sitemap.xml",
        &[format!("{}/old", base_url), format!("{}/loop", base_url)],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/loop", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;

    // Redirect targets are data, not crawl frontier
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").unwrap();
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    let check = auditor.check_status(check_id).unwrap();
    assert_eq!(check.status, CheckStatus::Completed);
    assert_eq!(check.total_urls_crawled, 2);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let pages = storage.get_pages_for_check(check_id).unwrap();

    let old = pages
        .iter()
        .find(|p| p.url.ends_with("/old"))
        .expect("redirecting page must be recorded");
    assert_eq!(old.http_status, 301);
    assert_eq!(
        old.redirect_location(),
        Some(format!("{}/new", base_url).as_str())
    );

    let issues = storage.get_issues_for_check(check_id).unwrap();
    let loops: Vec<_> = issues
        .iter()
        .filter(|i| i.issue_type == "redirect_loop")
        .collect();
    assert_eq!(loops.len(), 1);
    assert!(loops[0].url.ends_with("/loop"));
}

#[tokio::test]
async fn test_max_urls_bounds_the_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let urls: Vec<String> = (0..5).map(|i| format!("{}/page-{}", base_url, i)).collect();
    mount_sitemap(&mock_server, "/sitemap.xml", &urls).await;

    for i in 0..5 {
        mount_page(
            &mock_server,
            &format!("/page-{}", i),
            page_html(Some("A Page Title Of Reasonable Length"), Some("H"), false),
        )
        .await;
    }

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 3);

    let auditor = Auditor::new(config, "testhash").unwrap();
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    let check = auditor.check_status(check_id).unwrap();
    assert_eq!(check.total_urls_crawlable, 3);
    assert_eq!(check.total_urls_crawled, 3);
    assert!(check.total_urls_crawled <= check.total_urls_crawlable);
}

#[tokio::test]
async fn test_cancellation_fails_check_and_keeps_rows() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_sitemap(
        &mock_server,
        "/sitemap.xml",
        &[format!("{}/a", base_url), format!("{}/b", base_url)],
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").unwrap();
    auditor
        .cancel_flag()
        .store(true, std::sync::atomic::Ordering::Relaxed);

    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    let check = auditor.check_status(check_id).unwrap();
    assert_eq!(check.status, CheckStatus::Failed);
    assert!(check
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("cancelled"));
    assert!(check.finished_at.is_some());
}

#[tokio::test]
async fn test_transport_failures_become_sentinel_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    // One reachable page, one URL pointing at a dead port
    mount_sitemap(
        &mock_server,
        "/sitemap.xml",
        &[
            format!("{}/alive", base_url),
            "http://127.0.0.1:1/unreachable".to_string(),
        ],
    )
    .await;
    mount_page(
        &mock_server,
        "/alive",
        page_html(Some("A Page Title Of Reasonable Length"), Some("H"), false),
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").unwrap();
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    // A dead URL must not fail the check; it is an observation
    let check = auditor.check_status(check_id).unwrap();
    assert_eq!(check.status, CheckStatus::Completed);
    assert_eq!(check.total_urls_crawled, 2);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let pages = storage.get_pages_for_check(check_id).unwrap();
    let dead = pages
        .iter()
        .find(|p| p.url.contains("unreachable"))
        .expect("sentinel page must be stored");
    assert_eq!(dead.http_status, 0);

    // Transport failures are not HTTP errors
    assert_eq!(check.http_errors_count, 0);
}

#[tokio::test]
async fn test_rescore_is_idempotent_out_of_band() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_sitemap(&mock_server, "/sitemap.xml", &[format!("{}/", base_url)]).await;
    mount_page(
        &mock_server,
        "/",
        page_html(Some("A Page Title Of Reasonable Length"), Some("H"), false),
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("audit.db");
    let config = create_test_config(db_path.to_str().unwrap(), 100);

    let auditor = Auditor::new(config, "testhash").unwrap();
    let check_id = auditor
        .start_check(&format!("{}/", base_url))
        .await
        .unwrap();

    let after_run = auditor.check_status(check_id).unwrap();

    auditor.recompute_health_score(check_id).unwrap();
    auditor.recompute_health_score(check_id).unwrap();

    let after_rescore = auditor.check_status(check_id).unwrap();
    assert_eq!(after_run.health_score, after_rescore.health_score);
    assert_eq!(after_run.errors_count, after_rescore.errors_count);
    assert_eq!(after_run.warnings_count, after_rescore.warnings_count);
    assert_eq!(after_run.notices_count, after_rescore.notices_count);
}
