//! HTTP front door
//!
//! Binds the listening socket up front so a taken port fails startup, then
//! serves the routes with axum until shutdown. On shutdown every open stream
//! ends after its current part and the server waits for connections to close.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::{Error, Result};
use crate::registry::FrameCache;
use crate::server::config::ServerConfig;
use crate::server::routes::{self, AppState};
use crate::shutdown::ShutdownSignal;

/// Live view HTTP server
pub struct LiveviewServer {
    config: ServerConfig,
    listener: TcpListener,
    cache: Arc<FrameCache>,
}

impl LiveviewServer {
    /// Bind the listening socket
    pub async fn bind(config: ServerConfig, cache: Arc<FrameCache>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: config.bind_addr,
                source,
            })?;

        Ok(Self {
            config,
            listener,
            cache,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run until shutdown is signalled
    pub async fn run(self, shutdown: ShutdownSignal) -> Result<()> {
        let addr = self.local_addr()?;
        tracing::info!(
            addr = %addr,
            max_connections = self.config.max_connections,
            "Live view listening"
        );

        let state = AppState::new(&self.config, self.cache, shutdown.clone());
        let app = routes::router(state).into_make_service_with_connect_info::<SocketAddr>();

        let mut stop = shutdown;
        axum::serve(self.listener, app)
            .tcp_nodelay(self.config.tcp_nodelay)
            .with_graceful_shutdown(async move {
                stop.wait().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(addr = %addr, "Live view stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::registry::EncodedFrame;
    use crate::shutdown::Shutdown;

    async fn start(config: ServerConfig) -> (SocketAddr, Arc<FrameCache>, Shutdown) {
        let cache = Arc::new(FrameCache::new());
        let server = LiveviewServer::bind(config, Arc::clone(&cache)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = Shutdown::new();
        tokio::spawn(server.run(shutdown.signal()));
        (addr, cache, shutdown)
    }

    fn local() -> ServerConfig {
        ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
    }

    /// Send a request and read until the server closes
    async fn exchange(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
            .await
            .unwrap()
            .unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    /// Open `/video_feed` and return the status line, keeping the socket
    async fn open_feed(addr: SocketAddr) -> (TcpStream, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /video_feed HTTP/1.0\r\n\r\n")
            .await
            .unwrap();

        let mut received = Vec::new();
        while !received.windows(2).any(|w| w == b"\r\n") {
            let mut chunk = [0u8; 256];
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0, "closed before the status line");
            received.extend_from_slice(&chunk[..n]);
        }
        let line_end = received.windows(2).position(|w| w == b"\r\n").unwrap();
        let status = String::from_utf8_lossy(&received[..line_end]).into_owned();
        (stream, status)
    }

    /// Read until `needle` shows up in the body
    async fn read_until(stream: &mut TcpStream, needle: &[u8]) -> Vec<u8> {
        let mut received = Vec::new();
        while !received.windows(needle.len()).any(|w| w == needle) {
            let mut chunk = [0u8; 1024];
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0, "stream closed early");
            received.extend_from_slice(&chunk[..n]);
        }
        received
    }

    #[tokio::test]
    async fn test_index_page() {
        let (addr, _cache, _shutdown) = start(local().index_page("<p>view</p>")).await;

        let response = exchange(addr, "GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
        assert!(response.to_ascii_lowercase().contains("content-type: text/html"));
        assert!(response.ends_with("<p>view</p>"));

        let head = exchange(addr, "HEAD / HTTP/1.0\r\n\r\n").await;
        assert!(head.contains(" 200 OK\r\n"), "{}", head);
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_error_routes() {
        let (addr, _cache, _shutdown) = start(local()).await;

        let missing = exchange(addr, "GET /nope HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"), "{}", missing);

        let post = exchange(
            addr,
            "POST /video_feed HTTP/1.1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(post.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"), "{}", post);

        // Unparseable heads are refused, never streamed
        let garbage = exchange(addr, "HELLO\r\n\r\n").await;
        assert!(
            garbage.is_empty() || garbage.starts_with("HTTP/1.1 400 Bad Request\r\n"),
            "{}",
            garbage
        );
    }

    #[tokio::test]
    async fn test_bare_lf_request_is_answered() {
        let (addr, _cache, _shutdown) = start(local().index_page("<p>lf</p>")).await;

        let response = exchange(addr, "GET / HTTP/1.0\n\n").await;
        assert!(response.contains(" 200 OK\r\n"), "{}", response);
        assert!(response.ends_with("<p>lf</p>"));
    }

    #[tokio::test]
    async fn test_video_feed_http10() {
        let (addr, cache, shutdown) = start(local()).await;
        cache.publish(EncodedFrame::new(1, Bytes::from_static(b"JPEG")));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /video_feed HTTP/1.0\r\n\r\n")
            .await
            .unwrap();

        let part = b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n";
        let received = read_until(&mut stream, part).await;
        let text = String::from_utf8_lossy(&received).to_ascii_lowercase();
        assert!(text.starts_with("http/1.0 200 ok\r\n") || text.starts_with("http/1.1 200 ok\r\n"));
        assert!(!text.contains("transfer-encoding"));
        assert!(text.contains("content-type: multipart/x-mixed-replace; boundary=frame"));
        assert!(text.contains("cache-control: no-cache, no-store, must-revalidate"));
        assert!(text.contains("pragma: no-cache"));

        // Shutdown closes the stream after the part in flight
        shutdown.trigger();
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_chunked_stream_ends_cleanly_on_shutdown() {
        let (addr, cache, shutdown) = start(local()).await;
        cache.publish(EncodedFrame::new(1, Bytes::from_static(b"JPEG")));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /video_feed HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();
        let mut received = read_until(&mut stream, b"JPEG\r\n").await;

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();

        let head_end = received.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let head = String::from_utf8_lossy(&received[..head_end]).to_ascii_lowercase();
        assert!(head.contains("transfer-encoding: chunked"), "{}", head);

        // Every chunk is one whole part, followed by the terminator
        let mut body = &received[head_end + 4..];
        let mut parts = 0;
        loop {
            let line_end = body.windows(2).position(|w| w == b"\r\n").unwrap();
            let size_hex = std::str::from_utf8(&body[..line_end]).unwrap();
            let size = usize::from_str_radix(size_hex, 16).unwrap();
            body = &body[line_end + 2..];
            if size == 0 {
                assert_eq!(body, b"\r\n");
                break;
            }
            let chunk = &body[..size];
            assert!(chunk.starts_with(b"--frame\r\n"));
            assert!(chunk.ends_with(b"JPEG\r\n"));
            assert_eq!(&body[size..size + 2], b"\r\n");
            body = &body[size + 2..];
            parts += 1;
        }
        assert!(parts >= 1);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let (addr, _cache, _shutdown) = start(local().max_connections(1)).await;

        // Holds the only viewer slot while waiting for its first frame
        let (_first, status) = open_feed(addr).await;
        assert!(status.ends_with(" 200 OK"), "{}", status);

        let (_second, status) = open_feed(addr).await;
        assert!(status.ends_with(" 503 Service Unavailable"), "{}", status);

        // The page is not limited
        let page = exchange(addr, "GET / HTTP/1.0\r\n\r\n").await;
        assert!(page.contains(" 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_viewer_leaving_during_pause_frees_its_slot() {
        let config = local()
            .max_connections(1)
            .keepalive_interval(Duration::from_millis(100));
        let (addr, cache, _shutdown) = start(config).await;
        cache.publish(EncodedFrame::new(1, Bytes::from_static(b"JPEG")));

        let (mut first, status) = open_feed(addr).await;
        assert!(status.ends_with(" 200 OK"), "{}", status);
        read_until(&mut first, b"JPEG\r\n").await;
        drop(first);

        // No new frame is published; the slot must still come back
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let (_viewer, status) = open_feed(addr).await;
            if status.ends_with(" 200 OK") {
                break;
            }
            assert!(status.ends_with(" 503 Service Unavailable"), "{}", status);
            assert!(Instant::now() < deadline, "viewer slot never released");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let cache = Arc::new(FrameCache::new());
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig::with_addr(taken.local_addr().unwrap());

        let result = LiveviewServer::bind(config, cache).await;
        assert!(matches!(result, Err(Error::Bind { .. })));
    }
}
