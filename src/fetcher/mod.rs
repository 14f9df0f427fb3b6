//! Protocol downloaders
//!
//! A fetcher streams remote bytes into a byte sink and returns a metadata
//! map collected from the transfer. Implementations are dispatched by the
//! task's download type, resolved at execute time.

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::store::DownloadType;

/// Metadata key recording the upstream content type.
pub const METADATA_KEY_CONTENT_TYPE: &str = "content-type";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    #[error("Failed to write to sink: {0}")]
    Sink(#[from] std::io::Error),

    #[error("Fetch cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("downhaul/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP downloader
///
/// No overall request timeout is imposed beyond the caller's cancellation
/// handle; cancelling it aborts an in-flight transfer promptly.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    async fn fetch<W>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        sink: &mut W,
    ) -> Result<BTreeMap<String, String>>
    where
        W: AsyncWrite + Unpin + Send,
    {
        debug!(url, "Starting download");

        let mut response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = self.client.get(url).send() => {
                result.map_err(|e| FetchError::RequestFailed(e.to_string()))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut written: u64 = 0;
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                result = response.chunk() => {
                    result.map_err(|e| FetchError::RequestFailed(e.to_string()))?
                }
            };
            match chunk {
                Some(bytes) => {
                    sink.write_all(&bytes).await?;
                    written += bytes.len() as u64;
                }
                None => break,
            }
        }

        debug!(url, written, "Download completed");

        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_KEY_CONTENT_TYPE.to_string(), content_type);
        Ok(metadata)
    }
}

/// Downloader dispatched by download type.
pub enum Fetcher {
    Http(HttpFetcher),
}

impl Fetcher {
    /// Resolve the fetcher for a task's type tag.
    pub fn for_type(download_type: DownloadType, http: &HttpFetcher) -> Self {
        match download_type {
            DownloadType::Http => Fetcher::Http(http.clone()),
        }
    }

    /// Stream the remote payload into the sink, returning transfer
    /// metadata. Cancellation propagates as [`FetchError::Cancelled`].
    pub async fn fetch<W>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        sink: &mut W,
    ) -> Result<BTreeMap<String, String>>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match self {
            Fetcher::Http(http) => http.fetch(cancel, url, sink).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;
    use axum::routing::get;
    use axum::Router;
    use bytes::Bytes;
    use std::net::SocketAddr;

    /// Start an embedded HTTP server on a random port
    async fn start_mock_server(app: Router) -> String {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let bound_addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", bound_addr)
    }

    fn fetcher() -> Fetcher {
        Fetcher::for_type(
            DownloadType::Http,
            &HttpFetcher::new(HttpConfig::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_streams_body_and_collects_content_type() {
        let app = Router::new().route(
            "/a.bin",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "ABC") }),
        );
        let base = start_mock_server(app).await;

        let cancel = CancellationToken::new();
        let mut sink = Vec::new();
        let metadata = fetcher()
            .fetch(&cancel, &format!("{}/a.bin", base), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink, b"ABC");
        assert_eq!(
            metadata.get(METADATA_KEY_CONTENT_TYPE).map(String::as_str),
            Some("text/plain")
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let app = Router::new();
        let base = start_mock_server(app).await;

        let cancel = CancellationToken::new();
        let mut sink = Vec::new();
        let err = fetcher()
            .fetch(&cancel, &format!("{}/missing", base), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::UnexpectedStatus(404)));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_fails_when_upstream_closes_mid_stream() {
        let app = Router::new().route(
            "/flaky",
            get(|| async {
                let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
                    Ok(Bytes::from_static(b"partial")),
                    Err(std::io::Error::other("connection reset")),
                ];
                Body::from_stream(futures::stream::iter(chunks))
            }),
        );
        let base = start_mock_server(app).await;

        let cancel = CancellationToken::new();
        let mut sink = Vec::new();
        let err = fetcher()
            .fetch(&cancel, &format!("{}/flaky", base), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_observes_cancellation() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }),
        );
        let base = start_mock_server(app).await;

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let mut sink = Vec::new();
        let err = fetcher()
            .fetch(&cancel, &format!("{}/slow", base), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
    }
}
