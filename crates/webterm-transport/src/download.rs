//! HTTP download collaborator for out-of-band directives.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{error, info};
use url::Url;

use webterm_core::{Error, OobDirective, Result};

use crate::transport::{DownloadSink, TransportEvent};

/// Fetches `GET <origin>/download?path=..&filename=..` and saves the body.
///
/// Failures are reported back as [`TransportEvent::DownloadFailed`] so the
/// transport can print them inline. Nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    origin: Url,
    directory: PathBuf,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl HttpDownloader {
    /// Create a downloader saving into `directory`.
    pub fn new(
        origin: Url,
        directory: PathBuf,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            origin: with_trailing_slash(origin),
            directory,
            events,
        }
    }

    /// URL the file named by `directive` is fetched from.
    pub fn url_for(&self, directive: &OobDirective) -> Result<Url> {
        download_url(&self.origin, directive)
    }
}

impl DownloadSink for HttpDownloader {
    fn request(&mut self, directive: OobDirective) {
        let client = self.client.clone();
        let origin = self.origin.clone();
        let directory = self.directory.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            match fetch(&client, &origin, &directory, &directive).await {
                Ok(saved) => info!("Downloaded '{}' to {}", directive.path, saved.display()),
                Err(e) => {
                    error!("Download of '{}' failed: {}", directive.path, e);
                    let _ = events.send(TransportEvent::DownloadFailed {
                        filename: directive.filename.clone(),
                        message: e.to_string(),
                    });
                }
            }
        });
    }
}

/// Build the download URL for `directive` under `origin`.
pub fn download_url(origin: &Url, directive: &OobDirective) -> Result<Url> {
    let mut url = origin
        .join("download")
        .map_err(|e| Error::InvalidEndpoint(format!("{origin}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("path", &directive.path)
        .append_pair("filename", &directive.filename);
    Ok(url)
}

/// File name to save under: the last path component of `name`.
///
/// Directory parts are dropped so a directive cannot write outside the
/// download directory.
pub fn safe_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");
    match last {
        "" | "." | ".." => "download".to_string(),
        other => other.to_string(),
    }
}

async fn fetch(
    client: &reqwest::Client,
    origin: &Url,
    directory: &Path,
    directive: &OobDirective,
) -> Result<PathBuf> {
    let url = download_url(origin, directive)?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Download {
            status: 0,
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Download {
            status: status.as_u16(),
            message: body.trim().to_string(),
        });
    }

    let bytes = response.bytes().await.map_err(|e| Error::Download {
        status: status.as_u16(),
        message: e.to_string(),
    })?;

    let target = directory.join(safe_file_name(&directive.filename));
    tokio::fs::write(&target, &bytes).await?;
    Ok(target)
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(path: &str, filename: &str) -> OobDirective {
        OobDirective {
            path: path.to_string(),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn test_download_url() {
        let origin = Url::parse("https://example.com/").unwrap();
        let url = download_url(&origin, &directive("/tmp/a b.txt", "a b.txt")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/download?path=%2Ftmp%2Fa+b.txt&filename=a+b.txt"
        );
    }

    #[test]
    fn test_download_url_keeps_prefix() {
        let (events, _rx) = mpsc::unbounded_channel();
        let origin = Url::parse("https://example.com/term").unwrap();
        let downloader = HttpDownloader::new(origin, PathBuf::from("."), events);

        let url = downloader.url_for(&directive("/x", "x")).unwrap();
        assert_eq!(url.path(), "/term/download");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("report.pdf"), "report.pdf");
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(safe_file_name(".."), "download");
        assert_eq!(safe_file_name("dir/"), "download");
    }
}
