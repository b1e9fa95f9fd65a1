use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "YELPCAMP_ENV";
const CONFIG_DIR_ENV: &str = "YELPCAMP_CONFIG_DIR";

/// Session secret used when nothing is configured. Refused in production.
pub const DEFAULT_SESSION_SECRET: &str = "thisshouldbeabettersecret";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub images: ImageSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// `YELPCAMP_*` variables and finally `DB_URL`, `SESSION_SECRET` and `PORT`.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let mut settings = Self::from_dir(&config_dir, &environment)?;
        settings.apply_plain_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from `<dir>/base.toml`, `<dir>/<environment>.toml` and
    /// `YELPCAMP_*` variables.
    pub fn from_dir(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("YELPCAMP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = environment.parse()?;
        Ok(settings)
    }

    /// Apply the unprefixed variables a plain deployment sets.
    pub fn apply_plain_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DB_URL") {
            self.database.url = url;
        }
        if let Some(secret) = lookup("SESSION_SECRET") {
            self.session.secret = secret;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
        }
        Ok(())
    }

    /// Reject combinations that must never reach a running server.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.environment == Environment::Production
            && self.session.secret == DEFAULT_SESSION_SECRET
        {
            bail!("SESSION_SECRET must be set in production");
        }
        if self.session.secret.is_empty() {
            bail!("session secret must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// `memory://` or `sled://<path>`.
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sled://data/yelp-camp".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "SessionSettings::default_secret")]
    pub secret: String,
    #[serde(default = "SessionSettings::default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "SessionSettings::default_max_age_secs")]
    pub max_age_secs: i64,
    /// Minimum interval between store writes for an otherwise unchanged session.
    #[serde(default = "SessionSettings::default_touch_after_secs")]
    pub touch_after_secs: i64,
    #[serde(default)]
    pub secure: bool,
}

impl SessionSettings {
    fn default_secret() -> String {
        DEFAULT_SESSION_SECRET.to_string()
    }

    fn default_cookie_name() -> String {
        "session".to_string()
    }

    fn default_max_age_secs() -> i64 {
        60 * 60 * 24 * 7
    }

    fn default_touch_after_secs() -> i64 {
        24 * 60 * 60
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret: Self::default_secret(),
            cookie_name: Self::default_cookie_name(),
            max_age_secs: Self::default_max_age_secs(),
            touch_after_secs: Self::default_touch_after_secs(),
            secure: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "ImageSettings::default_dir")]
    pub dir: String,
    /// URL prefix the stored files are served under.
    #[serde(default = "ImageSettings::default_public_path")]
    pub public_path: String,
}

impl ImageSettings {
    fn default_dir() -> String {
        "data/uploads".to_string()
    }

    fn default_public_path() -> String {
        "/uploads".to_string()
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            public_path: Self::default_public_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,tower_http=debug".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
