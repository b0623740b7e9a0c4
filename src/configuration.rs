use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, DurationSeconds};
use std::env::var;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub session: SessionSettings,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiSettings {
    #[serde_as(as = "DisplayFromStr")]
    pub base_url: Url,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionSettings {
    pub file_path: PathBuf,
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// The possible runtime environment for our application.
#[derive(Debug, Eq, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(format!(
                "{other} is not a supported environment. Use either `dev` or `prod`."
            )),
        }
    }
}

pub fn get_env() -> Result<Environment, config::ConfigError> {
    var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "dev".into())
        .try_into()
        .map_err(config::ConfigError::Message)
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let environment = get_env()?;
    let second_source = format!("configuration/{}", environment.as_str());
    let settings = Config::builder()
        .add_source(config::File::new("configuration/base", FileFormat::Yaml))
        .add_source(config::File::new(&second_source, FileFormat::Yaml).required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}
