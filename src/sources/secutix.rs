// src/sources/secutix.rs

//! JOBO shop on the Secutix ticketing platform.
//!
//! The event list is only visible after logging in: the login form carries a
//! `_csrf` token that must be posted back with the credentials, and the
//! session lives in the client's cookie store.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::REFERER;
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::RawFields;
use crate::sources::{SourceAdapter, parse_selector, select_attr, select_text};
use crate::utils::http::fetch_page_async;
use crate::utils::resolve_url;

const NAME: &str = "secutix";
const LOGIN_PATH: &str = "/account/login";
const EVENTS_PATH: &str = "/secured/list/events";

/// Secutix shop adapter.
pub struct SecutixSource {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl SecutixSource {
    pub fn new(client: Client, base_url: &str, username: &str, password: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn login_url(&self) -> String {
        format!("{}{}", self.base_url, LOGIN_PATH)
    }

    fn events_url(&self) -> String {
        format!("{}{}", self.base_url, EVENTS_PATH)
    }

    async fn login(&self) -> Result<()> {
        let login_url = self.login_url();
        log::debug!("Getting csrf token");
        let page = fetch_page_async(&self.client, &login_url).await?;
        let token = extract_csrf_token(&page)
            .ok_or_else(|| AppError::source(NAME, "login page has no _csrf token"))?;

        log::debug!("Logging in as {}", self.username);
        self.client
            .post(&login_url)
            .header(REFERER, &login_url)
            .form(&[
                ("login", self.username.as_str()),
                ("password", self.password.as_str()),
                ("_rememberThisLogin", "on"),
                ("_csrf", token.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_events_page(&self) -> Result<String> {
        let events_url = self.events_url();
        log::debug!("Getting events from {events_url}");
        let response = self
            .client
            .get(&events_url)
            .header(REFERER, &events_url)
            .send()
            .await?
            .error_for_status()?;

        // The shop redirects anonymous sessions back to the login form.
        if response.url().path().ends_with(LOGIN_PATH) {
            return Err(AppError::source(NAME, "login rejected, check credentials"));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SourceAdapter for SecutixSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch_raw(&self) -> Result<Vec<RawFields>> {
        self.login().await?;
        let html = self.fetch_events_page().await?;
        let base = Url::parse(&self.base_url)?;
        let events = parse_events(&html, &base)?;
        log::debug!("{} events found", events.len());
        Ok(events)
    }
}

/// Value of the login form's `_csrf` hidden input.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = parse_selector(r#"input[name="_csrf"]"#).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
}

/// Extract one raw field map per product on the event list page.
pub fn parse_events(html: &str, base: &Url) -> Result<Vec<RawFields>> {
    let document = Html::parse_document(html);

    let product_sel = parse_selector("div.group_content > ul > li > .product")?;
    let title_sel = parse_selector(".title")?;
    let space_sel = parse_selector(".location .space")?;
    let site_sel = parse_selector(".location .site")?;
    let date_unique_sel = parse_selector(".date .unique")?;
    let date_range_sel = parse_selector(".date .range")?;
    let img_sel = parse_selector("img")?;
    let info_sel = parse_selector(".more_info a")?;
    let buy_sel = parse_selector("span.button a")?;

    let mut events = Vec::new();
    for product in document.select(&product_sel) {
        let id = product
            .value()
            .id()
            .map(|id| id.trim_start_matches("prod_").to_string());
        let date = select_text(&product, &date_unique_sel)
            .or_else(|| select_text(&product, &date_range_sel));

        let mut raw = RawFields::new();
        raw.set("id", id)
            .set("title", select_text(&product, &title_sel))
            .set("space", select_text(&product, &space_sel))
            .set("site", select_text(&product, &site_sel))
            .set("date", date)
            .set("img", select_attr(&product, &img_sel, "data-img-large"))
            .set(
                "info_url",
                select_attr(&product, &info_sel, "href").map(|href| resolve_url(base, &href)),
            )
            .set(
                "buy_url",
                select_attr(&product, &buy_sel, "href").map(|href| resolve_url(base, &href)),
            );
        events.push(raw);
    }
    Ok(events)
}
