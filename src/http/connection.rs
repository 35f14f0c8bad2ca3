use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::handler::Handlers;
use crate::handler::default::Reply;
use crate::handler::exchange::Exchange;
use crate::handler::stream::{Progress, StreamWriter};
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

pub struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    state: ConnectionState,
    handlers: Arc<Handlers>,
    idle_timeout: Duration,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, After),
    Streaming(StreamWriter<File>, Exchange),
    Closed,
}

/// What follows once a response head has been written.
pub enum After {
    /// Response complete; bool = keep-alive?
    Finish(bool),
    /// Stream the file body on writable events.
    Stream(StreamWriter<File>, Exchange),
}

enum Incoming {
    Request(Request),
    Malformed(ParseError),
    Closed,
}

impl Connection {
    pub fn new(stream: TcpStream, handlers: Arc<Handlers>, idle_timeout: Duration) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            handlers,
            idle_timeout,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        Incoming::Request(req) => ConnectionState::Processing(req),
                        Incoming::Malformed(e) => {
                            tracing::debug!(error = ?e, "Malformed request");
                            let writer = ResponseWriter::new(&Response::bad_request(), false);
                            ConnectionState::Writing(writer, After::Finish(false))
                        }
                        Incoming::Closed => ConnectionState::Closed,
                    };
                }

                ConnectionState::Processing(req) => {
                    let (writer, after) = Self::handle_request(&self.handlers, req);
                    self.state = ConnectionState::Writing(writer, after);
                }

                ConnectionState::Writing(writer, _) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
                    self.state = match state {
                        ConnectionState::Writing(_, After::Stream(sw, exchange)) => {
                            ConnectionState::Streaming(sw, exchange)
                        }
                        ConnectionState::Writing(_, After::Finish(true)) => ConnectionState::Reading,
                        _ => ConnectionState::Closed,
                    };
                }

                ConnectionState::Streaming(writer, exchange) => {
                    match timeout(self.idle_timeout, self.stream.writable()).await {
                        Err(_) => {
                            tracing::debug!(
                                path = %exchange.local_path,
                                idle = ?exchange.idle_for(),
                                "Idle timeout while streaming"
                            );
                            self.state = ConnectionState::Closed;
                        }
                        Ok(result) => {
                            result?;
                            match writer.on_writable(exchange, &mut self.stream) {
                                Progress::Pending => {}
                                Progress::Done(status) => {
                                    tracing::trace!(
                                        status = status.as_u16(),
                                        written = exchange.written,
                                        "Request done"
                                    );
                                    let reuse = exchange.flags.keep_alive
                                        && exchange.written >= exchange.bytes;
                                    self.state = if reuse {
                                        ConnectionState::Reading
                                    } else {
                                        ConnectionState::Closed
                                    };
                                }
                                Progress::Failed { status, message } => {
                                    // The head already went out, so the report
                                    // stays in the log and the connection is dropped.
                                    tracing::error!(
                                        status = status.as_u16(),
                                        path = %exchange.local_path,
                                        "{message}"
                                    );
                                    self.state = ConnectionState::Closed;
                                }
                            }
                        }
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<Incoming> {
        loop {
            if !self.buffer.is_empty() {
                match parse_http_request(&self.buffer) {
                    Ok((request, consumed)) => {
                        self.buffer.advance(consumed);
                        return Ok(Incoming::Request(request));
                    }
                    Err(ParseError::Incomplete) => {}
                    Err(e) => return Ok(Incoming::Malformed(e)),
                }
            }

            let n = match timeout(self.idle_timeout, self.stream.read_buf(&mut self.buffer)).await {
                Ok(n) => n?,
                Err(_) => {
                    tracing::debug!("Idle connection timed out");
                    return Ok(Incoming::Closed);
                }
            };

            if n == 0 {
                return Ok(Incoming::Closed);
            }
        }
    }

    fn handle_request(handlers: &Handlers, req: &Request) -> (ResponseWriter, After) {
        let mut exchange = handlers.exchange_for(req);
        let reply = handlers.dispatch(&mut exchange);

        tracing::debug!(
            method = ?req.method,
            path = %exchange.url,
            status = reply.response().status.as_u16(),
            completion = ?reply.completion_status().map(|s| s.as_u16()),
            "Handled request"
        );

        let keep_alive = exchange.flags.keep_alive;
        match reply {
            Reply::Done { mut response, .. } => {
                if exchange.flags.head {
                    response.body.clear();
                }
                (
                    ResponseWriter::new(&response, keep_alive),
                    After::Finish(keep_alive),
                )
            }
            Reply::Stream { response, writer } => (
                ResponseWriter::new(&response, keep_alive),
                After::Stream(writer, exchange),
            ),
        }
    }
}
