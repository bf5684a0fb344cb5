//! HTTP protocol implementation.
//!
//! This module implements a small HTTP/1.1 server directly on top of byte
//! streams, with persistent connections and gzip content negotiation.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: Per-connection lifecycle: a reading task feeding a request-response state machine
//! - **`parser`**: Incremental request framing from raw bytes
//! - **`request`**: HTTP request representation
//! - **`router`**: Ordered regex routes, first match wins
//! - **`response`**: HTTP response representation with builder pattern
//! - **`encoding`**: Accept-Encoding negotiation (gzip)
//! - **`writer`**: Serializes and writes HTTP responses to the client
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for the next parsed request
//!        └──────┬──────┘
//!               │ Request received
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route, then negotiate encoding
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Connection: close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rawhttp::http::connection::{Connection, ConnectionSettings};
//! use rawhttp::http::router::Router;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Arc::new(Router::new());
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let conn = Connection::new(socket, router.clone(), ConnectionSettings::default());
//!         tokio::spawn(async move {
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod router;
pub mod encoding;
pub mod connection;
pub mod writer;
