use std::io::Read;

use flate2::read::GzDecoder;
use rawhttp::http::encoding::{accepts_gzip, negotiate};
use rawhttp::http::response::{Response, ResponseBuilder, StatusCode};

fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    out
}

#[test]
fn test_accepts_gzip_tokens() {
    assert!(accepts_gzip("gzip"));
    assert!(accepts_gzip("deflate, gzip"));
    assert!(accepts_gzip("  br ,  gzip  , identity"));
    assert!(accepts_gzip("GZIP"));
    assert!(accepts_gzip("gzip;q=0.8"));
    assert!(accepts_gzip("gzip; q=1"));

    assert!(!accepts_gzip(""));
    assert!(!accepts_gzip("identity"));
    assert!(!accepts_gzip("br, deflate"));
    assert!(!accepts_gzip("gzipx"));
}

#[test]
fn test_zero_weight_refuses_gzip() {
    assert!(!accepts_gzip("gzip;q=0"));
    assert!(!accepts_gzip("gzip; q=0.0, identity"));
    assert!(!accepts_gzip("br, GZIP;Q=0"));
}

#[tokio::test]
async fn test_refused_gzip_is_not_compressed() {
    let response = Response::text("hello");

    let encoded = negotiate(response, "gzip;q=0, identity").await.unwrap();

    assert!(encoded.header("Content-Encoding").is_none());
    assert_eq!(encoded.body_bytes(), Some(&b"hello"[..]));
}

#[tokio::test]
async fn test_gzip_round_trip() {
    let original = b"hello hello hello hello hello".to_vec();
    let response = Response::text(original.clone());

    let encoded = negotiate(response, "deflate, gzip").await.unwrap();

    let compressed = encoded.body_bytes().unwrap();
    assert_eq!(encoded.header("Content-Encoding"), Some("gzip"));
    assert_eq!(
        encoded.header("Content-Length"),
        Some(compressed.len().to_string().as_str())
    );
    assert_eq!(encoded.header("Content-Type"), Some("text/plain"));
    assert_eq!(gunzip(compressed), original);
}

#[tokio::test]
async fn test_unrecognized_encoding_passes_through() {
    let response = Response::text("plain");

    let encoded = negotiate(response, "br, identity").await.unwrap();

    assert!(encoded.header("Content-Encoding").is_none());
    assert_eq!(encoded.body_bytes(), Some(&b"plain"[..]));
    assert_eq!(encoded.header("Content-Length"), Some("5"));
}

#[tokio::test]
async fn test_bodiless_response_is_not_compressed() {
    let response = Response::empty(StatusCode::Ok);

    let encoded = negotiate(response, "gzip").await.unwrap();

    assert!(encoded.body.is_none());
    assert!(encoded.header("Content-Encoding").is_none());
}

#[tokio::test]
async fn test_file_body_is_buffered_and_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.txt");
    std::fs::write(&path, b"file body file body").unwrap();

    let file = tokio::fs::File::open(&path).await.unwrap();
    let response = ResponseBuilder::new(StatusCode::Ok).file(file, 19).build();

    let encoded = negotiate(response, "gzip").await.unwrap();

    assert_eq!(gunzip(encoded.body_bytes().unwrap()), b"file body file body");
}
