//! Minimal client-side response reading shared by the integration tests.

#![allow(dead_code)]

use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Reads one response. `pending` carries bytes read past the previous
/// response. Returns `None` once the server has closed with nothing left.
pub async fn read_response<R>(stream: &mut R, pending: &mut Vec<u8>) -> Option<RawResponse>
where
    R: AsyncRead + Unpin,
{
    let head_end = loop {
        if let Some(pos) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if !fill(stream, pending).await {
            assert!(pending.is_empty(), "connection closed mid-response");
            return None;
        }
    };

    let head = String::from_utf8(pending[..head_end].to_vec()).unwrap();
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap();
    let status = status_line
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let headers: Vec<(String, String)> = lines
        .map(|line| {
            let (k, v) = line.split_once(": ").unwrap();
            (k.to_string(), v.to_string())
        })
        .collect();

    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .map(|(_, v)| v.parse().unwrap())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while pending.len() < body_start + content_length {
        assert!(fill(stream, pending).await, "connection closed mid-body");
    }

    let body = pending[body_start..body_start + content_length].to_vec();
    pending.drain(..body_start + content_length);

    Some(RawResponse {
        status,
        headers,
        body,
    })
}

/// Asserts the peer closes without sending anything further.
pub async fn assert_closed<R>(stream: &mut R, pending: &mut Vec<u8>)
where
    R: AsyncRead + Unpin,
{
    assert!(pending.is_empty(), "unexpected trailing bytes");
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).await.unwrap_or(0);
    assert_eq!(n, 0, "expected the connection to be closed");
}

async fn fill<R>(stream: &mut R, pending: &mut Vec<u8>) -> bool
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    match stream.read(&mut buf).await {
        Ok(0) | Err(_) => false,
        Ok(n) => {
            pending.extend_from_slice(&buf[..n]);
            true
        }
    }
}
