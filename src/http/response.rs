use std::collections::HashMap;

/// Statuses the file handler and connection can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    /// Directory and home-page redirects.
    Found,
    /// Conditional GET hit.
    NotModified,
    /// Unparseable request, or a document whose metadata cannot be read.
    BadRequest,
    NotFound,
    /// Rejected URL.
    InternalServerError,
}

impl StatusCode {
    fn parts(self) -> (u16, &'static str) {
        match self {
            StatusCode::Ok => (200, "OK"),
            StatusCode::Found => (302, "Found"),
            StatusCode::NotModified => (304, "Not Modified"),
            StatusCode::BadRequest => (400, "Bad Request"),
            StatusCode::NotFound => (404, "Not Found"),
            StatusCode::InternalServerError => (500, "Internal Server Error"),
        }
    }

    /// ```
    /// # use docroot::http::response::StatusCode;
    /// assert_eq!(StatusCode::NotModified.as_u16(), 304);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.parts().0
    }

    pub fn reason_phrase(&self) -> &'static str {
        self.parts().1
    }
}

/// A response head plus any in-memory body.
///
/// File bodies are not stored here; they follow the head through a
/// [`StreamWriter`](crate::handler::stream::StreamWriter).
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Found)
///     .header("Location", "/docs/index.html")
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    auto_length: bool,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            auto_length: true,
        }
    }

    /// Sets `name`, replacing any earlier value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Leaves `Content-Length` out of the head. The connection must then
    /// close to mark the end of the body.
    pub fn without_length(mut self) -> Self {
        self.auto_length = false;
        self
    }

    /// Fills in `Content-Length` from the body unless one was set explicitly
    /// or [`without_length`](Self::without_length) was called.
    pub fn build(self) -> Response {
        let ResponseBuilder {
            status,
            mut headers,
            body,
            auto_length,
        } = self;

        if auto_length {
            headers
                .entry("Content-Length".to_string())
                .or_insert_with(|| body.len().to_string());
        }

        Response {
            status,
            headers,
            body,
        }
    }
}

impl Response {
    /// Error reply with `message` as a plain-text body.
    pub fn error(status: StatusCode, message: &str) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain")
            .body(message.as_bytes().to_vec())
            .build()
    }

    /// 302 to `location`, sent as given.
    pub fn redirect(location: &str) -> Self {
        ResponseBuilder::new(StatusCode::Found)
            .header("Location", location)
            .build()
    }

    pub fn bad_request() -> Self {
        Self::error(StatusCode::BadRequest, "400 Bad Request")
    }

    /// Header value by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v.as_str()))
    }
}
