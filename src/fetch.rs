// Fetch module: downloading externally hosted images.

use std::io::Write;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Url;

use crate::error::{AdminError, Result};

/// Some image hosts turn away clients that do not look like a browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub const MAX_REDIRECTS: usize = 5;

/// What a successful download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub final_url: String,
    pub bytes: u64,
    pub content_type: Option<String>,
}

/// Blocking GET client that follows redirects itself, up to a fixed number
/// of hops.
pub struct ImageFetcher {
    client: Client,
    max_redirects: usize,
}

impl ImageFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            client,
            max_redirects: MAX_REDIRECTS,
        })
    }

    pub fn with_max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Stream the body behind `url` into `dest`.
    ///
    /// Any non-2xx final status, a redirect without `Location`, or more than
    /// `max_redirects` hops is `DownloadFailed`.
    pub fn download<W: Write + ?Sized>(&self, url: &str, dest: &mut W) -> Result<FetchedImage> {
        let failed = |reason: String| AdminError::DownloadFailed {
            url: url.to_string(),
            reason,
        };
        let mut current = Url::parse(url).map_err(|e| failed(format!("invalid URL: {e}")))?;

        for hop in 0..=self.max_redirects {
            tracing::debug!(url = current.as_str(), hop, "fetching image");
            let mut res = self
                .client
                .get(current.clone())
                .send()
                .map_err(|e| failed(e.to_string()))?;
            let status = res.status();

            if status.is_redirection() {
                let location = res
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| failed(format!("{status} without a Location header")))?;
                current = current
                    .join(location)
                    .map_err(|e| failed(format!("bad redirect target {location:?}: {e}")))?;
                continue;
            }
            if !status.is_success() {
                return Err(failed(format!("HTTP {}", status.as_u16())));
            }

            let content_type = res
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = res.copy_to(dest).map_err(|e| failed(e.to_string()))?;
            return Ok(FetchedImage {
                final_url: current.to_string(),
                bytes,
                content_type,
            });
        }

        Err(failed(format!(
            "gave up after {} redirects",
            self.max_redirects
        )))
    }
}
