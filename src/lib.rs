//! docroot - sandboxed static file handler
//!
//! Core library: URL validation against a document root, the default file
//! handler, and non-blocking body streaming, plus the HTTP plumbing to run
//! them as a server.

pub mod config;
pub mod handler;
pub mod http;
pub mod server;
