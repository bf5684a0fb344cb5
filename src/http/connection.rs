use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::http::encoding::negotiate;
use crate::http::parser::{FrameScanner, ParseError, ScannerLimits, Section};
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::router::Router;
use crate::http::writer::ResponseWriter;

/// Default size of each socket read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// What the parsing task reports to the coordinator.
#[derive(Debug)]
pub enum ParseEvent {
    Request(Request),
    EndOfStream,
    Error(SessionError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_buffer_size: usize,
    pub limits: ScannerLimits,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            limits: ScannerLimits::default(),
        }
    }
}

/// One accepted socket, from accept to close.
pub struct Connection<S> {
    stream: S,
    router: Arc<Router>,
    settings: ConnectionSettings,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    /// The flag is true when the connection stays open afterwards.
    Writing(ResponseWriter, bool),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S, router: Arc<Router>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            router,
            settings,
        }
    }

    /// Serves requests until the client closes, asks to close, or the
    /// stream fails.
    ///
    /// Reading happens on a separate task that hands complete requests over
    /// one at a time, so requests are answered strictly in arrival order.
    pub async fn run(self) -> anyhow::Result<()> {
        let Connection {
            stream,
            router,
            settings,
        } = self;

        let (reader, mut writer) = tokio::io::split(stream);
        let (tx, mut events) = mpsc::channel(1);
        let scanner = FrameScanner::new(settings.limits);
        let reader_task = tokio::spawn(read_frames(
            reader,
            scanner,
            settings.read_buffer_size,
            tx,
        ));

        let outcome = drive(&router, &mut events, &mut writer).await;

        // No further events are accepted; the read side is torn down too.
        events.close();
        reader_task.abort();
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "Shutdown after session end failed");
        }

        outcome
    }
}

async fn drive<W>(
    router: &Router,
    events: &mut mpsc::Receiver<ParseEvent>,
    stream: &mut W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut state = ConnectionState::Reading;

    loop {
        state = match state {
            ConnectionState::Reading => match events.recv().await {
                Some(ParseEvent::Request(req)) => ConnectionState::Processing(req),
                Some(ParseEvent::EndOfStream) | None => ConnectionState::Closed,
                Some(ParseEvent::Error(e)) => {
                    if let SessionError::Parse(parse_error) = &e {
                        if *parse_error != ParseError::UnexpectedEof {
                            reject_malformed(stream).await;
                        }
                    }
                    return Err(e.into());
                }
            },

            ConnectionState::Processing(req) => {
                let keep_alive = !req.wants_close();
                let response = respond(router, &req, keep_alive).await;
                ConnectionState::Writing(ResponseWriter::new(response), keep_alive)
            }

            ConnectionState::Writing(writer, keep_alive) => {
                writer.write_to_stream(stream).await?;

                if keep_alive {
                    ConnectionState::Reading // go back for next request
                } else {
                    ConnectionState::Closed
                }
            }

            ConnectionState::Closed => return Ok(()),
        };
    }
}

/// Routes the request and applies content negotiation and connection
/// control to the result.
async fn respond(router: &Router, req: &Request, keep_alive: bool) -> Response {
    let mut response = router.dispatch(req);

    if let Some(accept_encoding) = req.header("accept-encoding") {
        response = match negotiate(response, accept_encoding).await {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(
                    error = %e,
                    method = %req.method,
                    path = %req.url,
                    "Failed to encode response"
                );
                Response::internal_error()
            }
        };
    }

    if !keep_alive {
        response.set_header("Connection", "close");
    }

    debug!(
        method = %req.method,
        path = %req.url,
        status = response.status.as_u16(),
        keep_alive,
        "Request handled"
    );

    response
}

/// Best-effort 400 before a malformed connection is dropped.
async fn reject_malformed<W>(stream: &mut W)
where
    W: AsyncWrite + Unpin,
{
    let response = ResponseBuilder::new(StatusCode::BadRequest)
        .header("Connection", "close")
        .build();

    if let Err(e) = ResponseWriter::new(response).write_to_stream(stream).await {
        debug!(error = %e, "Could not send 400 response");
    }
}

/// Reads from the socket and forwards every complete request.
///
/// Stops after the first terminal event or once the coordinator has gone
/// away.
async fn read_frames<R>(
    mut reader: R,
    mut scanner: FrameScanner,
    read_buffer_size: usize,
    tx: mpsc::Sender<ParseEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; read_buffer_size.max(1)];

    loop {
        loop {
            match scanner.next_request() {
                Ok(Some(req)) => {
                    if tx.send(ParseEvent::Request(req)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(ParseEvent::Error(e.into())).await;
                    return;
                }
            }
        }

        let event = match reader.read(&mut buf).await {
            // A partial status line without its terminator is dropped.
            Ok(0) if scanner.section() == Section::StatusLine => ParseEvent::EndOfStream,
            Ok(0) => ParseEvent::Error(ParseError::UnexpectedEof.into()),
            Ok(n) => {
                scanner.feed(&buf[..n]);
                continue;
            }
            Err(e) => ParseEvent::Error(e.into()),
        };

        let _ = tx.send(event).await;
        return;
    }
}
