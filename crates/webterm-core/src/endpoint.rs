//! Socket endpoint construction.

use url::Url;

use crate::{Error, Result};

/// WebSocket endpoint of one terminal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parse an endpoint from a full `ws://` or `wss://` URL.
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::InvalidEndpoint(format!("{url}: {e}")))?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(Error::InvalidEndpoint(format!(
                "unsupported scheme '{other}'"
            ))),
        }
    }

    /// Build the endpoint for `session_id` under `base_url`.
    ///
    /// `http`/`https` bases are mapped to `ws`/`wss`. The session id becomes
    /// the last segment of `<base path>/ws/<session_id>`.
    pub fn for_session(base_url: &str, session_id: &str) -> Result<Self> {
        if session_id.trim().is_empty() {
            return Err(Error::InvalidEndpoint("session id is empty".to_string()));
        }

        let mut url = Url::parse(base_url)
            .map_err(|e| Error::InvalidEndpoint(format!("{base_url}: {e}")))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Error::InvalidEndpoint(format!(
                    "unsupported scheme '{other}'"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::InvalidEndpoint(format!("cannot use scheme {scheme}")))?;

        url.path_segments_mut()
            .map_err(|_| Error::InvalidEndpoint(format!("{base_url} cannot be a base")))?
            .pop_if_empty()
            .push("ws")
            .push(session_id);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { url })
    }

    /// The socket URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP origin of the same host, used for the download collaborator.
    ///
    /// A base path the socket is mounted under is kept: `wss://h/term/ws/s`
    /// maps to `https://h/term/`. Other socket paths map to the site root.
    pub fn http_origin(&self) -> Url {
        let mut origin = self.url.clone();
        let scheme = if origin.scheme() == "wss" {
            "https"
        } else {
            "http"
        };
        // ws -> http and wss -> https are both special schemes, so this cannot fail
        let _ = origin.set_scheme(scheme);

        let segments: Vec<&str> = self
            .url
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();
        let path = match segments.as_slice() {
            [prefix @ .., "ws", _session] if !prefix.is_empty() => {
                format!("/{}/", prefix.join("/"))
            }
            _ => "/".to_string(),
        };
        origin.set_path(&path);
        origin.set_query(None);
        origin.set_fragment(None);
        origin
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
