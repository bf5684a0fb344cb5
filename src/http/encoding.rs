//! Content-encoding negotiation.

use crate::http::response::Response;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("failed to read response body: {0}")]
    Body(#[source] std::io::Error),
    #[error("gzip compression failed: {0}")]
    Compress(#[source] std::io::Error),
}

/// Whether an `Accept-Encoding` value lists gzip.
///
/// Tokens are compared in the order given, ignoring surrounding whitespace
/// and case. A `q` weight of zero refuses the coding. Nothing but gzip is
/// recognized.
pub fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding.split(',').any(|token| {
        let mut parts = token.split(';');
        let coding = parts.next().unwrap_or_default().trim();
        coding.eq_ignore_ascii_case("gzip") && !parts.any(is_zero_weight)
    })
}

fn is_zero_weight(param: &str) -> bool {
    match param.split_once('=') {
        Some((name, value)) if name.trim().eq_ignore_ascii_case("q") => value
            .trim()
            .parse::<f32>()
            .map(|q| q <= 0.0)
            .unwrap_or(false),
        _ => false,
    }
}

/// Applies the encoding the client asked for.
///
/// When gzip is accepted the body is buffered, compressed and swapped in,
/// with `Content-Encoding` and `Content-Length` updated. Bodiless
/// responses and clients that do not accept gzip pass through untouched.
pub async fn negotiate(
    mut response: Response,
    accept_encoding: &str,
) -> Result<Response, EncodingError> {
    if !accepts_gzip(accept_encoding) {
        return Ok(response);
    }

    let Some(body) = response.body.take() else {
        return Ok(response);
    };

    let raw = body.into_bytes().await.map_err(EncodingError::Body)?;
    let compressed = gzip(&raw).map_err(EncodingError::Compress)?;

    response.set_header("Content-Encoding", "gzip");
    response.set_body(compressed);

    Ok(response)
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
