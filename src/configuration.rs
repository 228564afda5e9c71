use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::{domain::place::PlaceRules, services::BoundingBox};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub scraper: ScraperSettings,
    #[serde(default)]
    pub rules: PlaceRules,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct ScraperSettings {
    pub overpass_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub lookup_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub concurrency: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub politeness_delay_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub enrichment_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub enrichment_delay_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub default_max_results: usize,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub fallback_bbox: Option<BoundingBox>,
}

impl ScraperSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_millis)
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment_timeout_secs)
    }

    pub fn enrichment_delay(&self) -> Duration {
        Duration::from_millis(self.enrichment_delay_millis)
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(e.to_string()))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
