//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{Config, CLASSIFY_TIMEOUT, PAGE_FETCH_TIMEOUT};
use crate::error_handling::InitializationError;

/// Builds the client used to download source pages.
///
/// Configured with the run's User-Agent, the page fetch timeout and reqwest's
/// default redirect policy (up to 10 hops).
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the TLS backend cannot
/// be initialized.
pub fn init_client(config: &Config) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(PAGE_FETCH_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Builds the client used for classification requests.
pub fn init_classifier_client(config: &Config) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(CLASSIFY_TIMEOUT)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}
