//! Integration tests for the CDP backend
//!
//! The Chrome-dependent tests are `#[ignore]`d; run them locally with
//! `cargo test -- --ignored` when a Chrome binary is available.

#![cfg(feature = "cdp")]

use pagesnap::{CaptureConfig, Error, Viewport};
use std::sync::Once;
use tiny_http::{Response, Server};

static INIT: Once = Once::new();

const TALL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Tall Page</title>
<style>
  body { margin: 0; }
  header { position: fixed; top: 0; left: 0; width: 100%; height: 80px; background: #c0f; }
  main { height: 3000px; background: linear-gradient(#fff, #000); }
</style>
</head>
<body>
<header>Sticky chrome</header>
<main>Content</main>
</body>
</html>"#;

const SHORT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Short Page</title><style>body { margin: 0; height: 200px; }</style></head>
<body><p>Fits in one viewport.</p></body>
</html>"#;

/// Start a simple test HTTP server
fn start_test_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18091").unwrap();
            for request in server.incoming_requests() {
                let html = match request.url() {
                    "/tall" => TALL_PAGE,
                    "/short" => SHORT_PAGE,
                    _ => "<html><body>Not Found</body></html>",
                };
                let response = Response::from_string(html).with_header(
                    "Content-Type: text/html; charset=utf-8"
                        .parse::<tiny_http::Header>()
                        .unwrap(),
                );
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18091".to_string()
}

#[test]
fn restricted_targets_fail_before_any_browser_work() {
    let config = CaptureConfig::default();
    let err = pagesnap::capture_full_page("chrome://settings", &config).unwrap_err();
    assert!(matches!(err, Error::UnreachableTarget(_)));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_capture_tall_page() {
    let base_url = start_test_server();
    let config = CaptureConfig {
        viewport: Viewport {
            width: 1280,
            height: 720,
        },
        ..Default::default()
    };

    let png = pagesnap::capture_full_page(&format!("{}/tall", base_url), &config)
        .expect("Failed to capture tall page");

    // PNG files start with these magic bytes
    assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");

    let composite = image::load_from_memory(&png).expect("composite should decode");
    // The page is 3000 logical px tall against a 1280px-wide viewport; the
    // composite keeps that aspect regardless of device pixel ratio.
    let aspect = composite.height() as f64 / composite.width() as f64;
    let expected = 3000.0 / 1280.0;
    assert!(
        (aspect - expected).abs() < 0.05,
        "aspect {} should be close to {}",
        aspect,
        expected
    );
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_capture_short_page_is_single_viewport() {
    let base_url = start_test_server();
    let config = CaptureConfig::default();

    let png = pagesnap::capture_full_page(&format!("{}/short", base_url), &config)
        .expect("Failed to capture short page");

    let composite = image::load_from_memory(&png).expect("composite should decode");
    // A page shorter than the viewport still stitches to exactly one
    // viewport height.
    let aspect = composite.height() as f64 / composite.width() as f64;
    let expected = 720.0 / 1280.0;
    assert!((aspect - expected).abs() < 0.05);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_capture_to_file() {
    let base_url = start_test_server();
    let config = CaptureConfig::default();
    let dir = tempfile::tempdir().unwrap();

    let path =
        pagesnap::capture_full_page_to_file(&format!("{}/tall", base_url), &config, dir.path())
            .expect("Failed to capture to file");

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("fullpage-") && name.ends_with(".png"));
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_async_facade_capture() {
    let base_url = start_test_server();

    let browser = pagesnap::Browser::new(None)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to open page");

    page.goto(&format!("{}/tall", base_url))
        .await
        .expect("Failed to navigate");
    let png = page
        .capture_full_page()
        .await
        .expect("Failed to capture full page");
    assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");

    browser.close().await.expect("Failed to close browser");
}
