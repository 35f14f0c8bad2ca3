//! End-to-end tests over a real socket

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docroot::config::Config;
use docroot::handler::Handlers;
use docroot::server::listener;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Served {
    status: u16,
    head: String,
    body: Vec<u8>,
}

impl Served {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

async fn start(cfg: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handlers = Arc::new(Handlers::from_config(&cfg));
    tokio::spawn(listener::serve(listener, handlers, Duration::from_secs(5)));
    addr
}

fn site() -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/big.bin"), vec![b'x'; 300_000]).unwrap();

    let mut cfg = Config::default();
    cfg.defaults
        .set_default_dir(dir.path().to_str().unwrap())
        .unwrap();
    cfg.handler.read_buffer_size = 4096;
    (dir, cfg)
}

/// Reads one response. The body length comes from `Content-Length`, or runs
/// to end of stream when there is none. HEAD and 304 responses carry no body.
async fn read_response(stream: &mut TcpStream, expect_body: bool) -> Served {
    let mut raw = Vec::new();
    let head_end = loop {
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the head was complete");
        raw.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8(raw[..head_end].to_vec()).unwrap();
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();
    let mut served = Served {
        status,
        head,
        body: raw[head_end..].to_vec(),
    };

    if !expect_body {
        return served;
    }
    match served.header("Content-Length").map(|v| v.parse::<usize>().unwrap()) {
        Some(len) => {
            while served.body.len() < len {
                let mut chunk = vec![0u8; 64 * 1024];
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed mid-body");
                served.body.extend_from_slice(&chunk[..n]);
            }
        }
        None => {
            stream.read_to_end(&mut served.body).await.unwrap();
        }
    }
    served
}

async fn request(addr: SocketAddr, raw: &str, expect_body: bool) -> Served {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    read_response(&mut stream, expect_body).await
}

async fn assert_closed(stream: &mut TcpStream) {
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_get_streams_file() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;

    let served = request(
        addr,
        "GET /docs/big.bin HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        true,
    )
    .await;

    assert_eq!(served.status, 200);
    assert_eq!(served.header("Content-Length"), Some("300000"));
    assert!(served.header("Last-Modified").is_some());
    assert_eq!(served.body.len(), 300_000);
    assert!(served.body.iter().all(|&b| b == b'x'));
}

#[tokio::test]
async fn test_head_has_no_body() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"HEAD /index.html HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let served = read_response(&mut stream, false).await;

    assert_eq!(served.status, 200);
    assert_eq!(served.header("Content-Length"), Some("13"));
    assert!(served.body.is_empty());
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;

    let served = request(addr, "GET /missing.html HTTP/1.1\r\n\r\n", true).await;

    assert_eq!(served.status, 404);
    assert_eq!(served.body, b"Cannot open URL".to_vec());
}

#[tokio::test]
async fn test_directory_redirect() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;

    let served = request(addr, "GET /docs/ HTTP/1.1\r\n\r\n", true).await;

    assert_eq!(served.status, 302);
    assert_eq!(served.header("Location"), Some("/docs/index.html"));
}

#[tokio::test]
async fn test_conditional_get_not_modified() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;
    let future = httpdate::fmt_http_date(std::time::SystemTime::now() + Duration::from_secs(3600));

    let served = request(
        addr,
        &format!("GET /index.html HTTP/1.1\r\nIf-Modified-Since: {future}\r\n\r\n"),
        false,
    )
    .await;

    assert_eq!(served.status, 304);
    assert!(served.body.is_empty());
}

#[tokio::test]
async fn test_keep_alive_serves_two_requests() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET /index.html HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let first = read_response(&mut stream, true).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.header("Connection"), Some("keep-alive"));
    assert_eq!(first.body, b"<h1>home</h1>".to_vec());

    stream
        .write_all(b"GET /docs HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let second = read_response(&mut stream, true).await;
    assert_eq!(second.status, 302);
    assert_eq!(second.header("Connection"), Some("close"));
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_http10_closes_by_default() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /index.html HTTP/1.0\r\n\r\n")
        .await
        .unwrap();

    let served = read_response(&mut stream, true).await;

    assert_eq!(served.header("Connection"), Some("close"));
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_traversal_is_contained() {
    let (dir, cfg) = site();
    let addr = start(cfg).await;
    let parent = dir.path().parent().unwrap();
    let name = dir.path().file_name().unwrap().to_str().unwrap();
    fs::write(parent.join(format!("{name}-secret.txt")), "secret").unwrap();

    let served = request(
        addr,
        &format!("GET /../{name}-secret.txt HTTP/1.1\r\n\r\n"),
        true,
    )
    .await;

    assert_eq!(served.status, 404);
    fs::remove_file(parent.join(format!("{name}-secret.txt"))).unwrap();
}

#[tokio::test]
async fn test_invalid_url_is_500() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;

    let served = request(addr, "GET /1/2/3/4/5/6/7/8/9 HTTP/1.1\r\n\r\n", true).await;

    assert_eq!(served.status, 500);
    assert_eq!(served.body, b"Invalid URL".to_vec());
}

#[tokio::test]
async fn test_malformed_request_is_400() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"NONSENSE\r\n\r\n").await.unwrap();

    let served = read_response(&mut stream, true).await;

    assert_eq!(served.status, 400);
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_home_page_redirect() {
    let (_dir, mut cfg) = site();
    cfg.handler.home_page_redirect = true;
    let addr = start(cfg).await;

    let served = request(addr, "GET / HTTP/1.1\r\n\r\n", true).await;

    assert_eq!(served.status, 302);
    assert_eq!(served.header("Location"), Some("index.html"));
}

#[tokio::test]
async fn test_oversized_body_is_400_and_closes() {
    let (_dir, cfg) = site();
    let addr = start(cfg).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /index.html HTTP/1.1\r\nContent-Length: 1000000000000\r\n\r\n")
        .await
        .unwrap();

    let served = read_response(&mut stream, true).await;

    assert_eq!(served.status, 400);
    assert_closed(&mut stream).await;
}
