use std::io;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tempfile::Builder;
use tracing::info;

use crate::error::CollectorError;

pub trait SourceClient {
    /// Streams the body at `url` into `destination`.
    fn download(&self, url: &str, destination: &mut dyn io::Write) -> Result<u64, CollectorError>;
}

#[derive(Clone)]
pub struct HttpSourceClient {
    client: Client,
}

impl HttpSourceClient {
    pub fn new() -> Result<Self, CollectorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("collect-tests-owid/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CollectorError::SourceHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| CollectorError::SourceHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl SourceClient for HttpSourceClient {
    fn download(&self, url: &str, destination: &mut dyn io::Write) -> Result<u64, CollectorError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| CollectorError::SourceHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "source request failed".to_string());
            return Err(CollectorError::SourceStatus { status, message });
        }
        io::copy(&mut response, destination)
            .map_err(|err| CollectorError::SourceHttp(format!("read {url}: {err}")))
    }
}

/// Downloads `url` to `path` unless a local copy exists or `refresh` is set.
/// Returns whether a download happened.
///
/// The body lands in a temporary sibling first, so an aborted transfer never
/// leaves a truncated file at `path`.
pub fn ensure_source(
    client: &dyn SourceClient,
    path: &Utf8Path,
    url: &str,
    refresh: bool,
) -> Result<bool, CollectorError> {
    if !refresh && path.as_std_path().exists() {
        info!(path = %path, "using local source copy");
        return Ok(false);
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    std::fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CollectorError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = Builder::new()
        .prefix(".download")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CollectorError::Filesystem(format!("temp file in {parent}: {err}")))?;

    info!(url, path = %path, "downloading source");
    let bytes = client.download(url, temp.as_file_mut())?;
    temp.persist(path.as_std_path())
        .map_err(|err| CollectorError::Filesystem(format!("persist {path}: {err}")))?;
    info!(bytes, path = %path, "finished downloading source");
    Ok(true)
}
