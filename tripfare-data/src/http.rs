//! Shared HTTP plumbing for the adapters.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tripfare_core::ProviderError;
use url::Url;

use crate::ProviderBuildError;

/// Default user agent for outbound requests.
pub const DEFAULT_USER_AGENT: &str = "tripfare/0.1";

/// Default request timeout.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, ProviderBuildError> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(ProviderBuildError::HttpClient)
}

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, ProviderBuildError> {
    Url::parse(base_url).map_err(|source| ProviderBuildError::InvalidBaseUrl {
        url: base_url.to_owned(),
        source,
    })
}

/// Append `path` to the base URL's path, keeping any prefix the base carries.
pub(crate) fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url
}

/// The URL without its query string, safe to log and embed in errors.
pub(crate) fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}

pub(crate) fn convert_reqwest_error(
    error: &reqwest::Error,
    url: &Url,
    timeout: Duration,
) -> ProviderError {
    let url = redact(url);
    if error.is_timeout() {
        return ProviderError::timeout(url, timeout);
    }
    if let Some(status) = error.status() {
        return ProviderError::HttpError {
            url,
            status: status.as_u16(),
            message: error.to_string(),
        };
    }
    if error.is_decode() {
        return ProviderError::ParseError {
            message: error.to_string(),
        };
    }
    ProviderError::NetworkError {
        url,
        message: error.to_string(),
    }
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    timeout: Duration,
) -> Result<T, ProviderError> {
    debug!("GET {}", redact(&url));
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| convert_reqwest_error(&err, &url, timeout))?
        .error_for_status()
        .map_err(|err| convert_reqwest_error(&err, &url, timeout))?;
    let body = response
        .text()
        .await
        .map_err(|err| convert_reqwest_error(&err, &url, timeout))?;
    serde_json::from_str(&body).map_err(|err| ProviderError::ParseError {
        message: err.to_string(),
    })
}
