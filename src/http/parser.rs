//! Incremental HTTP/1.1 request framing.
//!
//! [`FrameScanner`] classifies bytes into the status line, header and body
//! regions of a request as they arrive from the socket. Bytes are
//! accumulated across reads, so neither the head nor the body has to fit
//! into a single read. Anything left over after a request is complete stays
//! buffered and becomes the start of the next one.

use crate::http::request::{Method, Request};
use bytes::{Buf, BytesMut};
use std::collections::HashMap;
use thiserror::Error;

const CRLF_LEN: usize = 2;

/// Default upper bound for the status line plus headers.
pub const DEFAULT_MAX_HEAD_SIZE: usize = 8 * 1024;

/// Default upper bound for a declared Content-Length.
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequestLine,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
    #[error("declared body of {declared} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { declared: usize, limit: usize },
    #[error("connection closed in the middle of a request")]
    UnexpectedEof,
    #[error("request is incomplete")]
    Incomplete,
}

/// The region of the request the scanner is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    StatusLine,
    Header,
    Body,
}

/// Memory bounds applied while assembling a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerLimits {
    pub max_head_size: usize,
    pub max_body_size: usize,
}

impl Default for ScannerLimits {
    fn default() -> Self {
        Self {
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Byte-stream request parser.
///
/// Feed it whatever the socket returned with [`feed`](Self::feed), then call
/// [`next_request`](Self::next_request) until it yields `Ok(None)`.
#[derive(Debug)]
pub struct FrameScanner {
    buffer: BytesMut,
    /// Next byte to classify.
    cursor: usize,
    section: Section,
    /// Offset of the `\r` of the last line terminator seen.
    last_crlf: Option<usize>,
    request_line: Option<(Method, String, String)>,
    headers: HashMap<String, String>,
    content_length: usize,
    body_start: usize,
    limits: ScannerLimits,
}

impl FrameScanner {
    pub fn new(limits: ScannerLimits) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            cursor: 0,
            section: Section::StatusLine,
            last_crlf: None,
            request_line: None,
            headers: HashMap::new(),
            content_length: 0,
            body_start: 0,
            limits,
        }
    }

    /// Appends freshly read bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn section(&self) -> Section {
        self.section
    }

    /// Number of bytes held that do not belong to an emitted request yet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True when no partial request is buffered.
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Advances the state machine over the buffered bytes.
    ///
    /// Returns `Ok(Some(request))` once a request is complete, `Ok(None)` when
    /// more bytes are needed.
    pub fn next_request(&mut self) -> Result<Option<Request>, ParseError> {
        while self.section != Section::Body {
            let Some(end) = self.next_terminator() else {
                if self.buffer.len() > self.limits.max_head_size {
                    return Err(ParseError::HeadTooLarge {
                        limit: self.limits.max_head_size,
                    });
                }
                return Ok(None);
            };

            if end + CRLF_LEN > self.limits.max_head_size {
                return Err(ParseError::HeadTooLarge {
                    limit: self.limits.max_head_size,
                });
            }

            let line_start = self.last_crlf.map_or(0, |p| p + CRLF_LEN);

            if self.section == Section::StatusLine {
                self.request_line = Some(parse_request_line(&self.buffer[..end])?);
                self.section = Section::Header;
            } else if line_start == end {
                // Empty line: the head is over.
                self.section = Section::Body;
                self.body_start = end + CRLF_LEN;
            } else {
                let (name, value) = parse_header_line(&self.buffer[line_start..end])?;
                if name == "content-length" {
                    let declared = value.parse::<usize>().unwrap_or(0);
                    if declared > self.limits.max_body_size {
                        return Err(ParseError::BodyTooLarge {
                            declared,
                            limit: self.limits.max_body_size,
                        });
                    }
                    self.content_length = declared;
                }
                self.headers.insert(name, value);
            }

            self.last_crlf = Some(end);
        }

        let end = self.body_start + self.content_length;
        if self.buffer.len() < end {
            return Ok(None);
        }

        let (method, url, version) = self
            .request_line
            .take()
            .ok_or(ParseError::InvalidRequestLine)?;
        let body = self.buffer[self.body_start..end].to_vec();
        let headers = std::mem::take(&mut self.headers);

        self.buffer.advance(end);
        self.reset();

        Ok(Some(Request {
            method,
            url,
            version,
            headers,
            body,
        }))
    }

    /// Moves the cursor past the next CRLF and returns the offset of its `\r`.
    fn next_terminator(&mut self) -> Option<usize> {
        while self.cursor + 1 < self.buffer.len() {
            let i = self.cursor;
            if self.buffer[i] == b'\r' && self.buffer[i + 1] == b'\n' {
                self.cursor = i + CRLF_LEN;
                return Some(i);
            }
            self.cursor += 1;
        }
        None
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.section = Section::StatusLine;
        self.last_crlf = None;
        self.request_line = None;
        self.content_length = 0;
        self.body_start = 0;
    }
}

fn parse_request_line(bytes: &[u8]) -> Result<(Method, String, String), ParseError> {
    let line = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidRequestLine)?;
    let mut parts = line.split(' ');

    let mut next_part = || {
        parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or(ParseError::InvalidRequestLine)
    };
    let method = next_part()?;
    let target = next_part()?;
    let version = next_part()?;

    if parts.next().is_some() {
        return Err(ParseError::InvalidRequestLine);
    }

    Ok((
        Method::from_token(method),
        target.to_string(),
        version.to_string(),
    ))
}

fn parse_header_line(bytes: &[u8]) -> Result<(String, String), ParseError> {
    let line = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidHeader)?;

    let (name, value) = match line.split_once(':') {
        Some((name, value)) => (name, value.trim()),
        None => (line, ""),
    };

    Ok((name.trim().to_ascii_lowercase(), value.to_string()))
}

/// Parses one request out of `buf`, returning it with the number of bytes
/// it occupied.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let mut scanner = FrameScanner::new(ScannerLimits::default());
    scanner.feed(buf);

    match scanner.next_request()? {
        Some(request) => Ok((request, buf.len() - scanner.buffered())),
        None => Err(ParseError::Incomplete),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_http_request(req).unwrap();

        assert_eq!(parsed.url, "/");
        assert_eq!(parsed.headers.get("host").unwrap(), "example.com");
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn byte_at_a_time_feeding() {
        let req = b"POST /files/a HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
        let mut scanner = FrameScanner::new(ScannerLimits::default());

        for (i, byte) in req.iter().enumerate() {
            scanner.feed(std::slice::from_ref(byte));
            let parsed = scanner.next_request().unwrap();
            if i + 1 < req.len() {
                assert!(parsed.is_none(), "emitted early at byte {}", i);
            } else {
                let parsed = parsed.unwrap();
                assert_eq!(parsed.body, b"abc");
            }
        }

        assert!(scanner.is_idle());
        assert_eq!(scanner.section(), Section::StatusLine);
    }

    #[test]
    fn section_tracks_progress() {
        let mut scanner = FrameScanner::new(ScannerLimits::default());

        scanner.feed(b"GET / HTTP/1.1\r\n");
        assert!(scanner.next_request().unwrap().is_none());
        assert_eq!(scanner.section(), Section::Header);

        scanner.feed(b"Content-Length: 4\r\n\r\nab");
        assert!(scanner.next_request().unwrap().is_none());
        assert_eq!(scanner.section(), Section::Body);

        scanner.feed(b"cd");
        assert!(scanner.next_request().unwrap().is_some());
        assert_eq!(scanner.section(), Section::StatusLine);
    }
}
