use std::io::Write;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::http::response::Response;

/// Serializes the status line, headers, blank line and in-memory body.
///
/// A `Connection` header is added from `keep_alive` unless the response
/// already carries one.
pub fn serialize_response(resp: &Response, keep_alive: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + resp.body.len());

    // Writes into a Vec cannot fail.
    let _ = write!(
        out,
        "HTTP/1.1 {} {}\r\n",
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );

    // Sorted so the head is stable across runs.
    let mut headers: Vec<_> = resp.headers.iter().collect();
    headers.sort();
    for (name, value) in headers {
        let _ = write!(out, "{name}: {value}\r\n");
    }
    if resp.header("Connection").is_none() {
        let connection = if keep_alive { "keep-alive" } else { "close" };
        let _ = write!(out, "Connection: {connection}\r\n");
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&resp.body);
    out
}

/// A serialized response and how much of it the client has taken.
pub struct ResponseWriter {
    pending: Vec<u8>,
    sent: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response, keep_alive: bool) -> Self {
        Self {
            pending: serialize_response(response, keep_alive),
            sent: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.pending
    }

    /// Writes whatever has not been sent yet, then flushes.
    pub async fn write_to_stream(&mut self, stream: &mut TcpStream) -> anyhow::Result<()> {
        while let Some(rest) = self.pending.get(self.sent..).filter(|r| !r.is_empty()) {
            let n = stream.write(rest).await?;
            if n == 0 {
                anyhow::bail!("client closed the connection mid-response");
            }
            self.sent += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
