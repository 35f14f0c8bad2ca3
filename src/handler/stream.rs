//! Background file streaming
//!
//! A [`StreamWriter`] is driven by the connection once per writable-socket
//! event. Each call pushes as much of the file as the socket takes without
//! blocking. When the socket takes only part of a chunk, the file cursor is
//! moved back over the unsent tail so the next call re-reads it.

use std::io::{self, Read, Seek, SeekFrom};

use tokio::net::TcpStream;

use crate::handler::exchange::Exchange;
use crate::http::response::StatusCode;

/// Message reported when the scratch buffer cannot be allocated.
pub const NO_MEMORY: &str = "Can't get memory";

/// A socket write that never waits.
pub trait NonBlockingWrite {
    /// Returns the number of bytes accepted, which may be fewer than
    /// `buf.len()` (or zero) when the send buffer is full. An error means
    /// the connection is gone.
    fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl NonBlockingWrite for TcpStream {
    fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.try_write(buf) {
            Ok(0) if !buf.is_empty() => Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// Outcome of one writable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More to send; call again on the next writable event.
    Pending,
    /// The request is finished.
    Done(StatusCode),
    /// The request is finished with an error report.
    ///
    /// The only producer is a failed scratch-buffer allocation, which keeps
    /// the legacy status 200 next to its error message.
    Failed {
        status: StatusCode,
        message: &'static str,
    },
}

#[derive(Debug)]
pub struct StreamWriter<P> {
    page: P,
    buffer_size: usize,
    finished: bool,
}

impl<P: Read + Seek> StreamWriter<P> {
    pub fn new(page: P, buffer_size: usize) -> Self {
        Self {
            page,
            buffer_size,
            finished: false,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Handles one writable event for `exchange`, writing into `sink`.
    ///
    /// Reads are capped at the bytes still owed, so a file that grew since
    /// it was stat'ed never overruns the advertised `Content-Length`.
    pub fn on_writable<W: NonBlockingWrite>(
        &mut self,
        exchange: &mut Exchange,
        sink: &mut W,
    ) -> Progress {
        exchange.touch();

        if self.finished || exchange.flags.dynamic {
            self.finished = true;
            return Progress::Done(StatusCode::Ok);
        }

        let Some(mut buf) = scratch_buffer(self.buffer_size) else {
            tracing::error!(
                path = %exchange.local_path,
                size = self.buffer_size,
                "Cannot allocate stream buffer"
            );
            self.finished = true;
            return Progress::Failed {
                status: StatusCode::Ok,
                message: NO_MEMORY,
            };
        };

        let bytes = exchange.bytes;
        let mut written = exchange.written;
        let mut failed = false;

        loop {
            let owed = usize::try_from(bytes.saturating_sub(written)).unwrap_or(usize::MAX);
            let want = buf.len().min(owed);
            let len = match self.page.read(&mut buf[..want]) {
                Ok(0) => {
                    if written < bytes {
                        // File shrank under us; the body is short of its
                        // Content-Length, so the connection cannot be reused.
                        tracing::debug!(
                            path = %exchange.local_path,
                            written,
                            expected = bytes,
                            "Early end of file"
                        );
                        exchange.flags.keep_alive = false;
                    }
                    written = bytes;
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(path = %exchange.local_path, error = %e, "Read failed while streaming");
                    failed = true;
                    break;
                }
            };

            match sink.write_nonblocking(&buf[..len]) {
                Err(e) => {
                    tracing::debug!(path = %exchange.local_path, error = %e, "Client write failed");
                    failed = true;
                    break;
                }
                Ok(wrote) => {
                    written += wrote as u64;
                    if wrote < len {
                        let shortfall = (len - wrote) as i64;
                        if let Err(e) = self.page.seek(SeekFrom::Current(-shortfall)) {
                            tracing::warn!(path = %exchange.local_path, error = %e, "Rewind failed");
                            failed = true;
                        }
                        break;
                    }
                }
            }
        }

        exchange.written = written;

        if failed || written >= bytes {
            self.finished = true;
            tracing::trace!(path = %exchange.local_path, written, failed, "Stream finished");
            Progress::Done(StatusCode::Ok)
        } else {
            Progress::Pending
        }
    }
}

/// Allocates the per-call scratch buffer, reporting failure instead of
/// aborting.
fn scratch_buffer(size: usize) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size).ok()?;
    buf.resize(size, 0);
    Some(buf)
}
