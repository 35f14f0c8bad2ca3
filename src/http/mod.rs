//! HTTP protocol plumbing around the file handler.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection state machine driving the handler chain
//! - **`parser`**: parses incoming HTTP requests from byte buffers
//! - **`request`**: HTTP request representation and header helpers
//! - **`response`**: status codes and response heads with a builder
//! - **`writer`**: serializes a response head and writes it to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received (malformed → 400, close)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Run the handler chain
//!        └──────┬───────────┘
//!               │ Reply ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send status line and headers
//!        └──────┬───────────┘
//!               ├─ File body → Streaming (one StreamWriter call per
//!               │              writable event, then Reading or Closed)
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
