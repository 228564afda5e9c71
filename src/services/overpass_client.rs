use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    domain::place::{PlaceRules, RawElement},
    error::LookupError,
};

/// Source of raw place elements for one keyword in one city.
///
/// An area without matches is an empty `Ok`, never an error.
#[async_trait]
pub trait LookupClient: Send + Sync {
    async fn lookup(
        &self,
        keyword: &str,
        city: &str,
        max_results: usize,
    ) -> Result<Vec<RawElement>, LookupError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

#[derive(Serialize)]
struct OverpassQuery {
    data: String,
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<RawElement>,
}

pub struct OverpassClient {
    client: Client,
    url: String,
    timeout: Duration,
    rules: Arc<PlaceRules>,
    fallback_bbox: Option<BoundingBox>,
    fallback_delay: Duration,
}

impl OverpassClient {
    pub fn new(
        url: String,
        timeout: Duration,
        rules: Arc<PlaceRules>,
        fallback_bbox: Option<BoundingBox>,
    ) -> Self {
        OverpassClient {
            client: Client::new(),
            url,
            timeout,
            rules,
            fallback_bbox,
            fallback_delay: Duration::ZERO,
        }
    }

    /// Spacing between the area query and the fallback query for the same lookup.
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    async fn run_query(&self, data: String) -> Result<Vec<RawElement>, LookupError> {
        let res = self
            .client
            .get(&self.url)
            .query(&OverpassQuery { data })
            .timeout(self.timeout)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let body = res.text().await?;
        let payload: OverpassResponse =
            serde_json::from_str(&body).map_err(|e| LookupError::Payload(e.to_string()))?;

        Ok(payload.elements)
    }
}

#[async_trait]
impl LookupClient for OverpassClient {
    async fn lookup(
        &self,
        keyword: &str,
        city: &str,
        max_results: usize,
    ) -> Result<Vec<RawElement>, LookupError> {
        let filters = self.rules.tag_filters_for(keyword);
        let query = build_area_query(keyword, city, filters, max_results, self.timeout);
        let mut elements = self.run_query(query).await?;

        if elements.is_empty() {
            if let Some(ref bbox) = self.fallback_bbox {
                log::warn!(
                    "No results for {} in {}, retrying with fallback bounding box",
                    keyword,
                    city
                );
                tokio::time::sleep(self.fallback_delay).await;
                let query = build_bbox_query(bbox, max_results, self.timeout);
                elements = self.run_query(query).await?;
            }
        }

        elements.truncate(max_results);
        log::info!("Overpass returned {} elements for {}", elements.len(), keyword);

        Ok(elements)
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `office=it` becomes `["office"="it"]`, a bare key becomes `["office"]`.
fn tag_selector(filter: &str) -> String {
    match filter.split_once('=') {
        Some((key, value)) => format!(r#"["{}"="{}"]"#, quote(key), quote(value)),
        None => format!(r#"["{}"]"#, quote(filter)),
    }
}

pub fn build_area_query(
    keyword: &str,
    city: &str,
    filters: &[String],
    max_results: usize,
    timeout: Duration,
) -> String {
    let mut statements = String::new();
    for filter in filters {
        let selector = tag_selector(filter);
        for kind in ["node", "way", "relation"] {
            statements.push_str(&format!("{}{}(area.searchArea);\n", kind, selector));
        }
    }

    let name_pattern = quote(&regex::escape(keyword));
    for kind in ["node", "way", "relation"] {
        statements.push_str(&format!(
            "{}[\"name\"~\"{}\",i](area.searchArea);\n",
            kind, name_pattern
        ));
    }

    format!(
        "[out:json][timeout:{}];\narea[\"name\"=\"{}\"]->.searchArea;\n(\n{});\nout center {};",
        timeout.as_secs(),
        quote(city),
        statements,
        max_results
    )
}

pub fn build_bbox_query(bbox: &BoundingBox, max_results: usize, timeout: Duration) -> String {
    let area = format!("{},{},{},{}", bbox.south, bbox.west, bbox.north, bbox.east);
    format!(
        "[out:json][timeout:{}];\n(\nnode[\"office\"]({});\nway[\"office\"]({});\n);\nout center {};",
        timeout.as_secs(),
        area,
        area,
        max_results
    )
}
