use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Column order of the exported artifact.
pub const COLUMNS: [&str; 9] = [
    "name",
    "address",
    "category",
    "phone",
    "email",
    "website",
    "latitude",
    "longitude",
    "keyword",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// One element as returned by the lookup API, before any shaping.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl RawElement {
    fn first_tag(&self, keys: &[String]) -> String {
        keys.iter()
            .filter_map(|key| self.tags.get(key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .unwrap_or_default()
            .to_string()
    }

    fn latitude(&self) -> Option<f64> {
        self.lat.or_else(|| self.center.as_ref().map(|c| c.lat))
    }

    fn longitude(&self) -> Option<f64> {
        self.lon.or_else(|| self.center.as_ref().map(|c| c.lon))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceRow {
    pub name: String,
    pub address: String,
    pub category: String,
    pub phone: String,
    pub website: Option<String>,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceKey {
    name: String,
    latitude: String,
    longitude: String,
}

impl PlaceRow {
    /// Rows from different keywords collapse when name and coordinates agree.
    pub fn dedupe_key(&self) -> PlaceKey {
        PlaceKey {
            name: self.name.trim().to_lowercase(),
            latitude: coordinate_text(self.latitude),
            longitude: coordinate_text(self.longitude),
        }
    }

    pub fn needs_email(&self) -> bool {
        self.email.is_none() && self.website.is_some()
    }

    /// Values in `COLUMNS` order, absent fields rendered as empty strings.
    pub fn to_record(&self) -> [String; 9] {
        [
            self.name.clone(),
            self.address.clone(),
            self.category.clone(),
            self.phone.clone(),
            self.email.clone().unwrap_or_default(),
            self.website.clone().unwrap_or_default(),
            coordinate_text(self.latitude),
            coordinate_text(self.longitude),
            self.keyword.clone(),
        ]
    }
}

fn coordinate_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    match value.is_empty() {
        true => None,
        false => Some(value),
    }
}

/// Tag fallbacks and exclusion heuristics used when turning raw elements into rows
/// and when choosing what to ask the lookup API for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaceRules {
    pub name_tags: Vec<String>,
    pub address_tags: Vec<String>,
    pub category_tags: Vec<String>,
    pub phone_tags: Vec<String>,
    pub website_tags: Vec<String>,
    pub email_tags: Vec<String>,
    pub denylist: Vec<String>,
    pub business_terms: Vec<String>,
    pub business_tag_filters: Vec<String>,
    pub default_tag_filters: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for PlaceRules {
    fn default() -> Self {
        PlaceRules {
            name_tags: strings(&["name"]),
            address_tags: strings(&["addr:full", "addr:street"]),
            category_tags: strings(&["office", "craft"]),
            phone_tags: strings(&["phone", "contact:phone"]),
            website_tags: strings(&["website", "contact:website"]),
            email_tags: strings(&["email", "contact:email"]),
            denylist: strings(&["hospital", "school", "clinic"]),
            business_terms: strings(&[
                "it",
                "software",
                "tech",
                "technology",
                "company",
                "office",
                "business",
            ]),
            business_tag_filters: strings(&[
                "office=it",
                "office=software",
                "office=company",
                "office=business",
                "office=technology",
                "craft=electronics",
            ]),
            default_tag_filters: strings(&["office", "amenity"]),
        }
    }
}

impl PlaceRules {
    pub fn is_denied(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.denylist
            .iter()
            .any(|bad| !bad.is_empty() && text.contains(&bad.to_lowercase()))
    }

    pub fn tag_filters_for(&self, keyword: &str) -> &[String] {
        let keyword = keyword.to_lowercase();
        match self
            .business_terms
            .iter()
            .any(|term| keyword.contains(&term.to_lowercase()))
        {
            true => &self.business_tag_filters,
            false => &self.default_tag_filters,
        }
    }

    /// Returns `None` when the element has no category or hits the denylist.
    pub fn shape(&self, element: &RawElement) -> Option<PlaceRow> {
        let category = element.first_tag(&self.category_tags);
        if category.is_empty() || self.is_denied(&category) {
            return None;
        }

        let name = element.first_tag(&self.name_tags);
        if self.is_denied(&name) {
            return None;
        }

        Some(PlaceRow {
            name,
            address: element.first_tag(&self.address_tags),
            category,
            phone: element.first_tag(&self.phone_tags),
            website: non_empty(element.first_tag(&self.website_tags)),
            email: non_empty(element.first_tag(&self.email_tags)),
            latitude: element.latitude(),
            longitude: element.longitude(),
            keyword: String::new(),
        })
    }
}

/// Keeps the first row seen for every key, in input order.
pub fn dedupe(rows: Vec<PlaceRow>) -> Vec<PlaceRow> {
    rows.into_iter().unique_by(PlaceRow::dedupe_key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tags: &[(&str, &str)]) -> RawElement {
        RawElement {
            lat: Some(23.03),
            lon: Some(72.58),
            center: None,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn row(name: &str, lat: f64, lng: f64, keyword: &str) -> PlaceRow {
        PlaceRow {
            name: name.to_string(),
            address: String::new(),
            category: "it".to_string(),
            phone: String::new(),
            website: None,
            email: None,
            latitude: Some(lat),
            longitude: Some(lng),
            keyword: keyword.to_string(),
        }
    }

    #[test]
    fn shape_uses_tag_fallbacks_in_order() {
        let rules = PlaceRules::default();
        let el = element(&[
            ("name", "Acme Software Pvt Ltd"),
            ("craft", "electronics"),
            ("office", "it"),
            ("addr:street", "MG Road"),
            ("contact:phone", "+91 100"),
            ("website", ""),
            ("contact:website", "acme.example"),
        ]);

        let row = rules.shape(&el).unwrap();

        assert_eq!(row.name, "Acme Software Pvt Ltd");
        assert_eq!(row.category, "it");
        assert_eq!(row.address, "MG Road");
        assert_eq!(row.phone, "+91 100");
        assert_eq!(row.website.as_deref(), Some("acme.example"));
        assert_eq!(row.email, None);
    }

    #[test]
    fn shape_reads_center_coordinates_for_ways() {
        let rules = PlaceRules::default();
        let mut el = element(&[("name", "Beta Corp"), ("office", "company")]);
        el.lat = None;
        el.lon = None;
        el.center = Some(Center {
            lat: 23.1,
            lon: 72.6,
        });

        let row = rules.shape(&el).unwrap();

        assert_eq!(row.latitude, Some(23.1));
        assert_eq!(row.longitude, Some(72.6));
    }

    #[test]
    fn shape_excludes_empty_category() {
        let rules = PlaceRules::default();
        let el = element(&[
            ("name", "Acme"),
            ("office", ""),
            ("phone", "1"),
            ("website", "acme.example"),
            ("email", "hi@acme.example"),
            ("addr:full", "1 Main St"),
        ]);

        assert_eq!(rules.shape(&el), None);
    }

    #[test]
    fn shape_excludes_denylisted_names_case_insensitively() {
        let rules = PlaceRules::default();
        let el = element(&[("name", "City Hospital IT Dept"), ("office", "it")]);

        assert_eq!(rules.shape(&el), None);
    }

    #[test]
    fn shape_excludes_denylisted_categories() {
        let rules = PlaceRules::default();
        let el = element(&[("name", "Little Steps"), ("office", "School")]);

        assert_eq!(rules.shape(&el), None);
    }

    #[test]
    fn shape_keeps_unnamed_places() {
        let rules = PlaceRules::default();
        let el = element(&[("office", "company")]);

        let row = rules.shape(&el).unwrap();

        assert_eq!(row.name, "");
    }

    #[test]
    fn business_keywords_pick_business_filters() {
        let rules = PlaceRules::default();

        assert_eq!(rules.tag_filters_for("Acme Software")[0], "office=it");
        assert_eq!(rules.tag_filters_for("bakery"), &["office", "amenity"]);
    }

    #[test]
    fn dedupe_key_ignores_case_whitespace_and_keyword() {
        let a = row("  Acme Software Pvt Ltd ", 23.03, 72.58, "Acme Software");
        let b = row("acme software pvt ltd", 23.03, 72.58, "Beta Corp");

        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let rows = vec![
            row("B", 1.0, 1.0, "k1"),
            row("A", 2.0, 2.0, "k1"),
            row("b", 1.0, 1.0, "k2"),
            row("A", 2.0, 2.5, "k2"),
        ];

        let deduped = dedupe(rows);

        let names: Vec<(&str, &str)> = deduped
            .iter()
            .map(|r| (r.name.as_str(), r.keyword.as_str()))
            .collect();
        assert_eq!(names, vec![("B", "k1"), ("A", "k1"), ("A", "k2")]);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let rows = vec![
            row("X", 1.0, 1.0, "k1"),
            row("x", 1.0, 1.0, "k2"),
            row("Y", 1.0, 1.0, "k2"),
        ];

        let once = dedupe(rows);
        let twice = dedupe(once.clone());

        assert_eq!(once, twice);
    }

    #[test]
    fn record_renders_absent_fields_empty() {
        let mut r = row("Acme", 23.5, 72.25, "acme");
        r.latitude = None;

        let record = r.to_record();

        assert_eq!(record[4], "");
        assert_eq!(record[5], "");
        assert_eq!(record[6], "");
        assert_eq!(record[7], "72.25");
        assert_eq!(record[8], "acme");
    }
}
