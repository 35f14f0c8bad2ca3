use std::collections::HashMap;
use std::time::SystemTime;

/// Request methods the parser accepts.
///
/// Documents are served the same way whatever the method, except HEAD,
/// which gets the head and no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
    PATCH,
}

impl Method {
    /// Matches an uppercase method token.
    ///
    /// ```
    /// # use docroot::http::request::Method;
    /// assert_eq!(Method::from_str("HEAD"), Some(Method::HEAD));
    /// assert_eq!(Method::from_str("head"), None);
    /// ```
    pub fn from_str(token: &str) -> Option<Self> {
        let method = match token {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            _ => return None,
        };
        Some(method)
    }
}

/// A parsed request line and header block.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Request target as sent, query string and fragment included.
    pub path: String,
    pub version: String,
    /// Header names keep the client's casing; use [`Request::header`] to look
    /// them up.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Builds a [`Request`] without going through the parser.
#[derive(Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Defaults to `HTTP/1.1`.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let method = self.method.ok_or("request has no method")?;
        let path = self.target.ok_or("request has no target")?;

        Ok(Request {
            method,
            path,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".into()),
            headers: self.headers,
            body: Vec::new(),
        })
    }
}

impl Request {
    /// Header value by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v.as_str()))
    }

    /// Whether the connection may carry another request afterwards.
    ///
    /// HTTP/1.1 stays open unless `Connection: close` is sent; HTTP/1.0 closes
    /// unless `Connection: keep-alive` is sent.
    pub fn keep_alive(&self) -> bool {
        match self.header("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version == "HTTP/1.1",
        }
    }

    /// Splits the target into path and query, dropping any `#fragment`.
    pub fn path_and_query(&self) -> (&str, &str) {
        let target = self.path.split('#').next().unwrap_or("");
        target.split_once('?').unwrap_or((target, ""))
    }

    /// The `If-Modified-Since` timestamp, if present and a valid HTTP date.
    pub fn if_modified_since(&self) -> Option<SystemTime> {
        self.header("If-Modified-Since")
            .and_then(|v| httpdate::parse_http_date(v.trim()).ok())
    }
}
