//! Blocking HTTP fetches behind the fetch cache.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use super::cache::FetchCache;
use crate::config::ResolverConfig;
use crate::error::{RdfError, Result};

pub struct RemoteFetcher {
    client: Client,
    cache: Option<FetchCache>,
    offline: bool,
}

impl RemoteFetcher {
    pub fn new(config: &ResolverConfig, cache: Option<FetchCache>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| RdfError::Config(format!("build http client: {err}")))?;
        Ok(Self {
            client,
            cache,
            offline: config.offline,
        })
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&FetchCache> {
        self.cache.as_ref()
    }

    /// Bytes behind `url`. `file://` URLs are read from disk; anything else
    /// is served from the cache or downloaded and then cached.
    pub fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|()| RdfError::unreachable(url, "not a local file URL"))?;
            return std::fs::read(&path).map_err(|err| RdfError::unreachable(url, err));
        }

        if let Some(cache) = &self.cache {
            match cache.get(url) {
                Ok(Some(bytes)) => return Ok(bytes),
                Ok(None) => {}
                Err(err) => warn!(url = %url, error = %err, "fetch cache lookup failed"),
            }
        }

        if self.offline {
            return Err(RdfError::unreachable(url, "offline and not in the fetch cache"));
        }

        debug!(url = %url, "downloading");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|err| RdfError::unreachable(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RdfError::unreachable(url, format!("HTTP {status}")));
        }
        let bytes = response
            .bytes()
            .map_err(|err| RdfError::unreachable(url, err))?
            .to_vec();
        info!(url = %url, size = bytes.len(), "downloaded remote source");

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.put(url, &bytes) {
                warn!(url = %url, error = %err, "could not store download in fetch cache");
            }
        }
        Ok(bytes)
    }
}
