//! rawhttp - HTTP/1.1 over raw TCP
//!
//! Request framing, routing and response encoding, served over plain
//! sockets with persistent connections.

pub mod config;
pub mod http;
pub mod routes;
pub mod server;
