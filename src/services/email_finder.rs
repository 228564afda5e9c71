use std::{sync::LazyLock, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

const DEFAULT_SCHEME: &str = "http://";

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Best-effort contact lookup for a place's website.
///
/// Fetch and parse failures of any kind resolve to `None`; this never errors.
#[async_trait]
pub trait EmailFinder: Send + Sync {
    async fn find_email(&self, website: &str, timeout: Duration) -> Option<String>;
}

pub struct WebsiteEmailFinder {
    client: Client,
}

impl Default for WebsiteEmailFinder {
    fn default() -> Self {
        WebsiteEmailFinder {
            client: Client::new(),
        }
    }
}

impl WebsiteEmailFinder {
    pub fn new(client: Client) -> Self {
        WebsiteEmailFinder { client }
    }

    async fn fetch_page(&self, url: Url, timeout: Duration) -> anyhow::Result<String> {
        let html = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("non-success status")?
            .text()
            .await
            .context("unreadable body")?;

        Ok(html)
    }
}

#[async_trait]
impl EmailFinder for WebsiteEmailFinder {
    async fn find_email(&self, website: &str, timeout: Duration) -> Option<String> {
        let url = normalize_url(website)?;

        match self.fetch_page(url.clone(), timeout).await {
            Ok(html) => extract_email(&html),
            Err(e) => {
                log::debug!("No email from {}: {:#}", url, e);
                None
            }
        }
    }
}

/// Prefixes a default scheme when the website was stored without one.
pub fn normalize_url(website: &str) -> Option<Url> {
    let website = website.trim();
    if website.is_empty() {
        return None;
    }

    match Url::parse(website) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        _ => Url::parse(&format!(
            "{}{}",
            DEFAULT_SCHEME,
            website.trim_start_matches("//")
        ))
        .ok(),
    }
}

/// Page text first, then `mailto:` anchors whose target is a whole email address.
pub fn extract_email(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    if let Some(found) = EMAIL_REGEX.find(&text) {
        return Some(found.as_str().to_string());
    }

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(mailto_target)
        .find(|target| is_email(target))
}

fn mailto_target(href: &str) -> Option<String> {
    let href = href.trim();
    let prefix = href.get(..7)?;
    if !prefix.eq_ignore_ascii_case("mailto:") {
        return None;
    }

    let target = href[7..].split('?').next().unwrap_or_default().trim();
    Some(target.to_string())
}

fn is_email(candidate: &str) -> bool {
    EMAIL_REGEX
        .find(candidate)
        .map(|m| m.start() == 0 && m.end() == candidate.len())
        .unwrap_or(false)
}
