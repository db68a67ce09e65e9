//! Source retrieval: catalog JSON, PDFs, and cover images.
//!
//! The pipeline only depends on the [`Fetch`] trait. [`HttpFetcher`] is the
//! production implementation backed by a synchronous `ureq` agent; retries and
//! backoff live here and nowhere else.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};

/// Retrieves raw bytes for a URL or local path.
pub trait Fetch {
    /// Fetch the full body of `url`.
    fn fetch(&self, url: &str) -> FetchResult<Vec<u8>>;

    /// Fetch `url` as UTF-8 text (lossy).
    fn fetch_text(&self, url: &str) -> FetchResult<String> {
        let bytes = self.fetch(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// HTTP fetcher with timeout and bounded retries.
///
/// References that are not `http://` or `https://` URLs are read from the
/// local filesystem, with an optional `file://` prefix.
pub struct HttpFetcher {
    agent: ureq::Agent,
    retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            retries: config.retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    fn fetch_remote(&self, url: &str) -> FetchResult<Vec<u8>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.fetch_once(url) {
                Ok(data) => return Ok(data),
                Err(err) if attempt <= self.retries && is_retryable(&err) => {
                    tracing::warn!(url, attempt, error = %err, "fetch failed, retrying");
                    std::thread::sleep(self.backoff * attempt);
                }
                Err(FetchError::Transport { url, message, .. }) => {
                    return Err(FetchError::Transport {
                        url,
                        attempts: attempt,
                        message,
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn fetch_once(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    url: url.into(),
                    status,
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(FetchError::Transport {
                    url: url.into(),
                    attempts: 1,
                    message: transport.to_string(),
                });
            }
        };

        let mut data = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut data)
            .map_err(|e| FetchError::Transport {
                url: url.into(),
                attempts: 1,
                message: format!("read body: {e}"),
            })?;
        tracing::debug!(url, bytes = data.len(), "fetched");
        Ok(data)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
        if is_remote(url) {
            self.fetch_remote(url)
        } else {
            read_local(url)
        }
    }
}

/// Whether a reference must go over HTTP.
pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Transport { .. } => true,
        FetchError::Status { status, .. } => *status >= 500 || *status == 429,
        FetchError::Local { .. } => false,
    }
}

fn read_local(reference: &str) -> FetchResult<Vec<u8>> {
    let path = Path::new(reference.strip_prefix("file://").unwrap_or(reference));
    std::fs::read(path).map_err(|e| FetchError::Local {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://openstax.org/api/books"));
        assert!(is_remote("http://localhost/x.pdf"));
        assert!(!is_remote("file:///tmp/x.pdf"));
        assert!(!is_remote("/tmp/x.pdf"));
    }

    #[test]
    fn local_references_are_read_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cover.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let fetcher = HttpFetcher::default();
        assert_eq!(fetcher.fetch(path.to_str().unwrap()).unwrap(), b"\x89PNG");

        let with_scheme = format!("file://{}", path.display());
        assert_eq!(fetcher.fetch(&with_scheme).unwrap(), b"\x89PNG");
    }

    #[test]
    fn missing_local_file_is_not_retried() {
        let fetcher = HttpFetcher::default();
        let err = fetcher.fetch("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, FetchError::Local { .. }));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = FetchError::Status {
            url: "https://example.org".into(),
            status: 502,
        };
        assert!(is_retryable(&err));
        let err = FetchError::Status {
            url: "https://example.org".into(),
            status: 404,
        };
        assert!(!is_retryable(&err));
    }
}
