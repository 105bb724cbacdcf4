// src/models/message.rs

//! Rendering of events into Telegram MarkdownV2 messages.

use crate::models::Event;

/// Characters that MarkdownV2 reserves in plain text.
pub const RESERVED_CHARS: &str = "_*[]()~`>#+-=|{}.!";

const CULTURE_SEARCH_URL: &str = "https://www.madridcultura.es/resultado/filtro?&texto=";
const WEB_SEARCH_URL: &str = "https://duckduckgo.com/?q=";

const MORE_INFO_LABEL: &str = "Más información";
const BUY_LABEL: &str = "Consigue tu entrada";
const SOLD_OUT_MARKER: &str = "*¡Entradas agotadas\\!*";

/// A rendered notification ready to hand to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    /// MarkdownV2 body, used as text or as photo caption
    pub body: String,
    /// Photo to attach, if any
    pub photo_url: Option<String>,
}

impl FormattedMessage {
    /// The same message delivered as plain text.
    pub fn without_photo(&self) -> Self {
        Self {
            body: self.body.clone(),
            photo_url: None,
        }
    }

    pub fn has_photo(&self) -> bool {
        self.photo_url.is_some()
    }
}

/// Prefix every reserved MarkdownV2 character with a backslash.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED_CHARS.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape the characters MarkdownV2 reserves inside the `(...)` part of a link.
fn escape_link_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}

fn link(label: &str, url: &str) -> String {
    format!("[{}]({})", label, escape_link_url(url))
}

/// Render an event as a MarkdownV2 message.
///
/// Layout:
/// ```text
/// *Title* \- Site
/// _Date_
/// [Más información](info) | search links
/// [Consigue tu entrada](buy) | *¡Entradas agotadas\!*
/// ```
pub fn render(event: &Event) -> FormattedMessage {
    let mut body = format!("*{}*", escape_markdown(&event.title));
    if let Some(site) = &event.venue_site {
        body.push_str(" \\- ");
        body.push_str(&escape_markdown(site));
    }
    body.push('\n');
    body.push_str(&format!("_{}_\n", escape_markdown(&event.date)));
    body.push_str(&info_line(event));
    body.push('\n');
    body.push_str(&purchase_line(event));

    FormattedMessage {
        body,
        photo_url: event.image_url.clone(),
    }
}

fn info_line(event: &Event) -> String {
    if let Some(url) = event.info_url.as_deref().filter(|u| !u.is_empty()) {
        return link(MORE_INFO_LABEL, url);
    }

    let culture_url = format!("{}{}", CULTURE_SEARCH_URL, urlencoding::encode(&event.title));
    let query = match &event.venue_site {
        Some(site) => format!("{} - {}", event.title, site),
        None => event.title.clone(),
    };
    let web_url = format!("{}{}", WEB_SEARCH_URL, urlencoding::encode(&query));

    format!(
        "Buscar información en {} o en {}",
        link("madridcultura\\.es", &culture_url),
        link("duckduckgo\\.com", &web_url)
    )
}

fn purchase_line(event: &Event) -> String {
    match event.purchase_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => link(BUY_LABEL, url),
        None => SOLD_OUT_MARKER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unescape(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(&next) = chars.peek() {
                    if RESERVED_CHARS.contains(next) {
                        out.push(next);
                        chars.next();
                        continue;
                    }
                }
            }
            out.push(c);
        }
        out
    }

    fn has_unescaped_reserved(text: &str) -> bool {
        let mut prev_backslash = false;
        for c in text.chars() {
            if RESERVED_CHARS.contains(c) && !prev_backslash {
                return true;
            }
            prev_backslash = c == '\\' && !prev_backslash;
        }
        false
    }

    fn concierto() -> Event {
        let mut event = Event::new("Concierto X", "12 mayo");
        event.venue_site = Some("Teatro Y".into());
        event.purchase_url = Some("http://x".into());
        event
    }

    #[test]
    fn test_render_available_event() {
        let message = render(&concierto());
        let lines: Vec<&str> = message.body.lines().collect();
        assert_eq!(lines[0], "*Concierto X* \\- Teatro Y");
        assert_eq!(lines[1], "_12 mayo_");
        assert!(lines[2].starts_with("Buscar información en [madridcultura\\.es]("));
        assert_eq!(lines[3], "[Consigue tu entrada](http://x)");
        assert_eq!(message.photo_url, None);
    }

    #[test]
    fn test_render_sold_out() {
        let mut event = concierto();
        event.purchase_url = None;
        let message = render(&event);
        assert!(message.body.ends_with("*¡Entradas agotadas\\!*"));
        assert!(!message.body.contains(BUY_LABEL));
    }

    #[test]
    fn test_render_info_url() {
        let mut event = concierto();
        event.info_url = Some("https://shop.example.com/info(1)".into());
        let message = render(&event);
        assert!(message
            .body
            .contains("[Más información](https://shop.example.com/info(1\\))"));
        assert!(!message.body.contains("duckduckgo"));
    }

    #[test]
    fn test_empty_info_url_uses_search_links() {
        let mut event = concierto();
        event.info_url = Some(String::new());
        let message = render(&event);
        assert!(!message.body.contains(MORE_INFO_LABEL));
        assert!(message.body.contains("Buscar información en"));
    }

    #[test]
    fn test_search_fallback_links() {
        let message = render(&concierto());
        assert!(message
            .body
            .contains("(https://www.madridcultura.es/resultado/filtro?&texto=Concierto%20X)"));
        assert!(message
            .body
            .contains("(https://duckduckgo.com/?q=Concierto%20X%20-%20Teatro%20Y)"));
    }

    #[test]
    fn test_render_without_site() {
        let mut event = concierto();
        event.venue_site = None;
        let message = render(&event);
        assert_eq!(message.body.lines().next(), Some("*Concierto X*"));
        assert!(message.body.contains("(https://duckduckgo.com/?q=Concierto%20X)"));
    }

    #[test]
    fn test_photo_is_carried() {
        let mut event = concierto();
        event.image_url = Some("https://img.example.com/x.jpg".into());
        let message = render(&event);
        assert!(message.has_photo());
        assert!(!message.without_photo().has_photo());
        assert_eq!(message.without_photo().body, message.body);
    }

    #[test]
    fn test_escape_every_reserved_char() {
        let escaped = escape_markdown(RESERVED_CHARS);
        assert_eq!(escaped.len(), RESERVED_CHARS.len() * 2);
        assert!(!has_unescaped_reserved(&escaped));
    }

    #[test]
    fn test_interpolated_text_round_trip() {
        let mut event = Event::new("Hamlet (v.o.) - *estreno*!", "12.05.2024 [20:00]");
        event.venue_site = Some("Sala_1 #2 {A+B=C}".into());
        let message = render(&event);
        let mut lines = message.body.lines();

        let title_line = lines.next().unwrap();
        let (title_part, site_part) = title_line.rsplit_once(" \\- ").unwrap();
        let title_inner = &title_part[1..title_part.len() - 1];
        assert!(!has_unescaped_reserved(title_inner));
        assert!(!has_unescaped_reserved(site_part));
        assert_eq!(unescape(title_inner), event.title);
        assert_eq!(unescape(site_part), "Sala_1 #2 {A+B=C}");

        let date_line = lines.next().unwrap();
        let date_inner = &date_line[1..date_line.len() - 1];
        assert!(!has_unescaped_reserved(date_inner));
        assert_eq!(unescape(date_inner), event.date);
    }
}
