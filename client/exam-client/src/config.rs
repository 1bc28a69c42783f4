use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub focus_reporting: bool,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Local .env is optional; real environment always wins
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let api_base_url = settings
            .get_string("api.base_url")
            .or_else(|_| env::var("EXAM_API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let request_timeout_secs = settings
            .get_int("api.request_timeout_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .or_else(|| {
                env::var("EXAM_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
            })
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let focus_reporting = settings
            .get_bool("console.focus_reporting")
            .ok()
            .or_else(|| {
                env::var("EXAM_FOCUS_REPORTING")
                    .ok()
                    .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            })
            .unwrap_or(true);

        let config = Config {
            api_base_url,
            request_timeout_secs,
            focus_reporting,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let url = url::Url::parse(&self.api_base_url).map_err(|e| {
            config::ConfigError::Message(format!(
                "invalid api base url {}: {}",
                self.api_base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(config::ConfigError::Message(format!(
                "api base url must use http or https, got {}",
                url.scheme()
            )));
        }
        Ok(())
    }
}
