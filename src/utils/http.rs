// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
///
/// The client keeps a cookie store so that sources which log in keep their
/// session between requests.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Fetch a page asynchronously and return its body.
///
/// Parsing is left to the caller: `scraper::Html` is not `Send`, so documents
/// are parsed in synchronous helpers that never cross an await point.
pub async fn fetch_page_async(client: &reqwest::Client, url: &str) -> Result<String> {
    let text = client
        .get(url)
        .header(reqwest::header::REFERER, url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}
