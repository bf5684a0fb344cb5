use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{Body, Response};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes the status line and headers, including the blank line that
/// separates them from the body.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one response to a stream, streaming file bodies.
pub struct ResponseWriter {
    head: Vec<u8>,
    body: Option<Body>,
}

impl ResponseWriter {
    pub fn new(mut response: Response) -> Self {
        let missing_length = match &response.body {
            Some(body) if response.header("content-length").is_none() => Some(body.len()),
            _ => None,
        };
        if let Some(len) = missing_length {
            response.set_header("Content-Length", len.to_string());
        }

        Self {
            head: serialize_head(&response),
            body: response.body,
        }
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub async fn write_to_stream<W>(self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_fully(stream, &self.head).await?;

        match self.body {
            Some(Body::Bytes(bytes)) => write_fully(stream, &bytes).await?,
            Some(Body::File { file, len }) => {
                // Never send more than the advertised length.
                let copied = tokio::io::copy(&mut file.take(len), stream).await?;
                if copied != len {
                    anyhow::bail!("file body was {} bytes, expected {}", copied, len);
                }
            }
            None => {}
        }

        stream.flush().await?;
        Ok(())
    }
}

async fn write_fully<W>(stream: &mut W, buf: &[u8]) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < buf.len() {
        let n = stream.write(&buf[written..]).await?;

        if n == 0 {
            return Err(anyhow::anyhow!("connection closed while writing"));
        }

        written += n;
    }

    Ok(())
}
