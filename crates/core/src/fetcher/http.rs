//! Plain HTTP(S) fetcher.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::FetchError;
use super::traits::ContentFetcher;

/// Downloads the response body of a GET request.
///
/// The body is streamed into `<name>.part` and renamed once complete, so the
/// locator never sees a half-written file.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, timeout })
    }

    /// File name for a URL: its last nonempty path segment, sanitised.
    pub fn file_name_for(url: &Url) -> String {
        let segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or("");

        let name: String = segment
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let name = name.trim_start_matches('.');
        if name.is_empty() {
            "download".to_string()
        } else {
            name.to_string()
        }
    }

    fn map_request_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| self.map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| FetchError::io(dest_dir, e))?;

        let name = Self::file_name_for(&parsed);
        let destination = dest_dir.join(&name);
        let partial = dest_dir.join(format!("{name}.part"));

        let result: Result<u64, FetchError> = async {
            let mut file = File::create(&partial)
                .await
                .map_err(|e| FetchError::io(&partial, e))?;
            let mut written = 0u64;

            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| self.map_request_error(url, e))?
            {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| FetchError::io(&partial, e))?;
                written += chunk.len() as u64;
            }

            file.flush().await.map_err(|e| FetchError::io(&partial, e))?;
            Ok(written)
        }
        .await;

        let written = match result {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        fs::rename(&partial, &destination)
            .await
            .map_err(|e| FetchError::io(&destination, e))?;

        debug!(url, path = %destination.display(), bytes = written, "http download complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), "reelbatch-test").unwrap()
    }

    #[test]
    fn test_file_name_for() {
        let name = |u: &str| HttpFetcher::file_name_for(&Url::parse(u).unwrap());
        assert_eq!(name("https://cdn.example.com/v/clip.mp4?sig=1"), "clip.mp4");
        assert_eq!(name("https://www.example.com/reel/AbC-1/"), "AbC-1");
        assert_eq!(name("https://example.com/"), "download");
        assert_eq!(name("https://example.com/a%20b.mp4"), "a_20b.mp4");
        assert_eq!(name("https://example.com/..hidden"), "hidden");
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let temp = TempDir::new().unwrap();
        let base = serve_once("200 OK", b"hello").await;

        fetcher()
            .fetch(&format!("{base}/media/clip.mp4"), temp.path())
            .await
            .unwrap();

        let written = fs::read(temp.path().join("clip.mp4")).await.unwrap();
        assert_eq!(written, b"hello");
        assert!(!temp.path().join("clip.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let temp = TempDir::new().unwrap();
        let base = serve_once("404 Not Found", b"").await;

        let err = fetcher()
            .fetch(&format!("{base}/missing.mp4"), temp.path())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!temp.path().join("missing.mp4").exists());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let temp = TempDir::new().unwrap();
        let err = fetcher().fetch("not a url", temp.path()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_url");
    }
}
