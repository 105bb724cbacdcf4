// src/sources/madrid_destino.rs

//! Madrid Destino shop, JOBO listing.
//!
//! The listing page only carries preview cards; title, date, venue and
//! image come from each event's detail page. Sold-out cards keep their
//! detail page as info link but get no purchase link.

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::models::RawFields;
use crate::sources::{SourceAdapter, parse_selector, select_attr, select_text};
use crate::utils::http::fetch_page_async;
use crate::utils::resolve_url;

const NAME: &str = "madrid_destino";

/// Preview card on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCard {
    pub title: Option<String>,
    pub date: Option<String>,
    pub detail_url: String,
    pub sold_out: bool,
}

/// Madrid Destino shop adapter.
pub struct MadridDestinoSource {
    client: Client,
    base_url: String,
}

impl MadridDestinoSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/?jobo=1", self.base_url)
    }
}

#[async_trait]
impl SourceAdapter for MadridDestinoSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch_raw(&self) -> Result<Vec<RawFields>> {
        let events_url = self.events_url();
        let listing = fetch_page_async(&self.client, &events_url).await?;
        let base = Url::parse(&events_url)?;
        let cards = parse_cards(&listing, &base)?;
        log::debug!("{} event cards found", cards.len());

        let mut events = Vec::with_capacity(cards.len());
        for card in cards {
            log::debug!("Parsing {}", card.title.as_deref().unwrap_or(&card.detail_url));
            match fetch_page_async(&self.client, &card.detail_url).await {
                Ok(detail) => events.push(parse_detail(&detail, &card)?),
                Err(e) => log::warn!("Failed to fetch event detail {}: {}", card.detail_url, e),
            }
        }
        Ok(events)
    }
}

/// Extract the preview cards of the listing page.
pub fn parse_cards(html: &str, base: &Url) -> Result<Vec<EventCard>> {
    let document = Html::parse_document(html);

    let card_sel = parse_selector("#eventsContent article")?;
    let link_sel = parse_selector("a[href]")?;
    let title_sel = parse_selector(".c-mod-card-event__data-title")?;
    let date_sel = parse_selector(".c-mod-card-event__data-date")?;
    let soldout_sel = parse_selector(".c-mod-card-event__soldout-txt")?;

    let cards = document
        .select(&card_sel)
        .filter_map(|card| {
            let href = select_attr(&card, &link_sel, "href")?;
            Some(EventCard {
                title: select_text(&card, &title_sel),
                date: select_text(&card, &date_sel),
                detail_url: resolve_url(base, &href),
                sold_out: card.select(&soldout_sel).next().is_some(),
            })
        })
        .collect();
    Ok(cards)
}

/// Build the raw field map of one event from its detail page.
///
/// Card title and date fill in when the detail page lacks them.
pub fn parse_detail(html: &str, card: &EventCard) -> Result<RawFields> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title_sel = parse_selector(".c-mod-bar-event_data-title")?;
    let date_sel = parse_selector(
        ".c-mod-file-event__list-info-item-date > div:nth-child(2), \
         .c-mod-file-event__list-info-item-date2 > div:nth-child(2)",
    )?;
    let duration_sel =
        parse_selector(".c-mod-file-event__list-info-item-time > div:nth-child(2)")?;
    let place_sel = parse_selector(".c-mod-bar-organization__title-text")?;
    let img_sel = parse_selector(".c-mod-file-event__content-info__img > img")?;

    let mut raw = RawFields::new();
    raw.set(
        "title",
        select_text(&root, &title_sel).or_else(|| card.title.clone()),
    )
    .set(
        "date",
        select_text(&root, &date_sel).or_else(|| card.date.clone()),
    )
    .set("duration", select_text(&root, &duration_sel))
    .set("place", select_text(&root, &place_sel))
    .set("img_url", select_attr(&root, &img_sel, "src"))
    .set("info_url", Some(card.detail_url.clone()))
    .set(
        "buy_url",
        (!card.sold_out).then(|| card.detail_url.clone()),
    );
    Ok(raw)
}
