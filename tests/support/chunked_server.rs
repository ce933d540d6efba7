//! Minimal HTTP server that answers every request with a chunked 200 body.
//!
//! wiremock always sets `Content-Length`, so it cannot stand in for an
//! endpoint that streams its body without declaring a size.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use super::DOWNLOAD_PATH;
use super::socket_guard::should_skip_socket_bound_test;

const CHUNK_LEN: usize = 512;

pub struct ChunkedServer {
    url: String,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl ChunkedServer {
    /// Starts the server, or returns `None` when localhost sockets are unavailable.
    pub async fn start(body: Vec<u8>) -> Option<Self> {
        if should_skip_socket_bound_test() {
            return None;
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
        let addr = listener.local_addr().ok()?;
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);
        let body = Arc::new(body);

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let body = Arc::clone(&body);
                tokio::spawn(async move {
                    if let Err(e) = respond_chunked(stream, &body).await {
                        eprintln!("chunked server: {e}");
                    }
                });
            }
        });

        Some(Self {
            url: format!("http://{addr}{DOWNLOAD_PATH}"),
            requests,
            task,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of connections accepted; each response closes its connection.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for ChunkedServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond_chunked(mut stream: TcpStream, body: &[u8]) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    stream
        .write_all(
            b"HTTP/1.1 200 OK\r\n\
              Content-Type: image/tiff\r\n\
              Transfer-Encoding: chunked\r\n\
              Connection: close\r\n\r\n",
        )
        .await?;
    for chunk in body.chunks(CHUNK_LEN) {
        stream.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await?;
        stream.write_all(chunk).await?;
        stream.write_all(b"\r\n").await?;
    }
    stream.write_all(b"0\r\n\r\n").await?;
    stream.shutdown().await
}
