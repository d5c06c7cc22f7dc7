//! Opening remote resources for forced downloads.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use url::Url;

/// Opens a byte stream for a URL.
///
/// Calls block the exporting thread.
pub trait UrlFetcher {
    /// Open the resource at `url`.
    fn open(&self, url: &Url) -> Result<Box<dyn Read>>;
}

/// Blocking HTTP(S) fetcher.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Create a fetcher with default client settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Create a fetcher around a configured client.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
impl UrlFetcher for HttpFetcher {
    fn open(&self, url: &Url) -> Result<Box<dyn Read>> {
        let fetch_error = |e: reqwest::Error| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(fetch_error)?
            .error_for_status()
            .map_err(fetch_error)?;
        Ok(Box::new(response))
    }
}

/// Fetcher that refuses every URL; downloads fall back to the original
/// reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl UrlFetcher for OfflineFetcher {
    fn open(&self, url: &Url) -> Result<Box<dyn Read>> {
        Err(Error::Fetch {
            url: url.to_string(),
            message: "offline".to_string(),
        })
    }
}

/// Fetcher serving fixed content per URL.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    resources: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` for `url`.
    pub fn with_resource(mut self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.resources.insert(url.into(), data.into());
        self
    }
}

impl UrlFetcher for StaticFetcher {
    fn open(&self, url: &Url) -> Result<Box<dyn Read>> {
        match self.resources.get(url.as_str()) {
            Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(Error::Fetch {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            }),
        }
    }
}

/// The fetcher used when none is configured.
pub fn default_fetcher() -> Box<dyn UrlFetcher> {
    #[cfg(feature = "http")]
    {
        Box::new(HttpFetcher::new())
    }
    #[cfg(not(feature = "http"))]
    {
        Box::new(OfflineFetcher)
    }
}
