//! Source adapters.
//!
//! Each adapter scrapes one ticketing site and yields raw field maps. Sites
//! differ only in how they extract fields; normalization into [`Event`]s
//! happens downstream.
//!
//! [`Event`]: crate::models::Event

mod madrid_destino;
mod secutix;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, RawFields, SourceConfig};
use crate::utils::clean_text;

pub use madrid_destino::MadridDestinoSource;
pub use secutix::SecutixSource;

/// A site producing raw event listings.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch the current listing. Every call starts from scratch.
    async fn fetch_raw(&self) -> Result<Vec<RawFields>>;
}

/// Build the enabled adapters from the configuration.
pub fn build_sources(config: &Config, client: &Client) -> Vec<Box<dyn SourceAdapter>> {
    config
        .enabled_sources()
        .map(|source| -> Box<dyn SourceAdapter> {
            match source {
                SourceConfig::Secutix {
                    base_url,
                    username,
                    password,
                    ..
                } => Box::new(SecutixSource::new(
                    client.clone(),
                    base_url,
                    username,
                    password,
                )),
                SourceConfig::MadridDestino { base_url, .. } => {
                    Box::new(MadridDestinoSource::new(client.clone(), base_url))
                }
            }
        })
        .collect()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Whitespace-normalized text of the first match, if any.
fn select_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

/// Attribute of the first match, if any.
fn select_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;
    use crate::utils::http::create_async_client;

    #[test]
    fn test_parse_selector_valid() {
        assert!(parse_selector("div.group_content > ul > li > .product").is_ok());
        assert!(parse_selector("img[data-img-large]").is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }

    #[test]
    fn test_build_sources_skips_disabled() {
        let config: Config = toml::from_str(
            r#"
            [[sources]]
            kind = "secutix"
            username = "u"
            password = "p"

            [[sources]]
            kind = "madrid_destino"
            enabled = false
            "#,
        )
        .unwrap();
        let client = create_async_client(&HttpConfig::default()).unwrap();
        let sources = build_sources(&config, &client);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "secutix");
    }
}
