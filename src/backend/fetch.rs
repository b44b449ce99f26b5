//! Page fetching through a reader proxy (Jina Reader header conventions).

use std::time::Duration;

use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::{debug, info};

use crate::cli::ExtractMode;
use crate::pipeline::WorkItem;

use super::Backend;
use super::client::{HttpClient, check_status, read_body};
use super::types::BackendError;

/// Default reader proxy.
pub const DEFAULT_READER_URL: &str = "https://r.jina.ai";

/// Desktop browser agents cycled through in stealth mode.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const X_RETURN_FORMAT: &str = "x-return-format";
const X_TARGET_SELECTOR: &str = "x-target-selector";
const X_TIMEOUT: &str = "x-timeout";

/// Rendering options applied to every URL in the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub extract: ExtractMode,
    pub selector: Option<String>,
    /// Post-load wait in milliseconds; 0 disables it.
    pub wait_ms: u64,
    pub stealth: bool,
    pub api_key: Option<String>,
}

/// Backend that fetches and extracts page content.
pub struct FetchBackend {
    reader_url: String,
    timeout: Duration,
    options: FetchOptions,
}

/// Handle returned by [`FetchBackend::prepare`].
#[derive(Debug)]
pub struct FetchSession {
    client: HttpClient,
}

impl FetchBackend {
    pub fn new(reader_url: &str, timeout: Duration, options: FetchOptions) -> Self {
        Self {
            reader_url: reader_url.trim_end_matches('/').to_string(),
            timeout,
            options,
        }
    }

    /// Validate an item payload as an absolute http(s) URL.
    pub fn target_url(item: &WorkItem) -> Result<Url, BackendError> {
        let url = Url::parse(&item.payload).map_err(|e| {
            BackendError::Unsupported(format!("'{}' is not a URL: {e}", item.payload))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(BackendError::Unsupported(format!(
                "unsupported URL scheme '{other}'"
            ))),
        }
    }

    /// Reader proxy URL for an item: `{reader}/{target}`.
    pub fn request_url(&self, item: &WorkItem) -> Result<String, BackendError> {
        let target = Self::target_url(item)?;
        Ok(format!("{}/{}", self.reader_url, target))
    }

    /// Headers sent to the reader proxy for the item at `index`.
    pub fn headers_for(&self, index: usize) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        headers.insert(
            HeaderName::from_static(X_RETURN_FORMAT),
            HeaderValue::from_static(self.options.extract.as_str()),
        );

        if let Some(selector) = &self.options.selector {
            let value = HeaderValue::from_str(selector).map_err(|_| {
                BackendError::Unsupported(format!("invalid selector '{selector}'"))
            })?;
            headers.insert(HeaderName::from_static(X_TARGET_SELECTOR), value);
        }

        if self.options.wait_ms > 0 {
            let secs = self.options.wait_ms.div_ceil(1000);
            headers.insert(HeaderName::from_static(X_TIMEOUT), HeaderValue::from(secs));
        }

        if self.options.stealth {
            let agent = USER_AGENTS[index.saturating_sub(1) % USER_AGENTS.len()];
            headers.insert(USER_AGENT, HeaderValue::from_static(agent));
        }

        if let Some(key) = &self.options.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                BackendError::Unsupported("reader API key is not a valid header".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

impl Backend for FetchBackend {
    type Handle = FetchSession;

    fn prepare(&self) -> Result<FetchSession, BackendError> {
        let client = HttpClient::new(&self.reader_url, self.timeout)?;

        // Any HTTP answer proves the proxy is reachable; only transport errors are fatal.
        let probe = client
            .inner()
            .head(client.base_url())
            .send()
            .map_err(|e| BackendError::Unavailable(format!("{}: {e}", client.base_url())))?;

        info!(
            url = client.base_url(),
            status = probe.status().as_u16(),
            extract = self.options.extract.as_str(),
            stealth = self.options.stealth,
            "reader proxy reachable"
        );

        Ok(FetchSession { client })
    }

    fn process(&self, session: &FetchSession, item: &WorkItem) -> Result<Vec<u8>, BackendError> {
        let url = self.request_url(item)?;
        let headers = self.headers_for(item.index)?;
        debug!(index = item.index, %url, "fetching");

        let response = session
            .client
            .inner()
            .get(&url)
            .headers(headers)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        non_blank(read_body(check_status(response)?)?, &item.payload)
    }
}

/// Reject bodies with nothing but whitespace.
pub(crate) fn non_blank(body: Vec<u8>, target: &str) -> Result<Vec<u8>, BackendError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(BackendError::InvalidResponse(format!(
            "no content extracted from {target}"
        )));
    }

    Ok(body)
}
