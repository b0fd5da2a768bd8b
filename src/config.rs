//! Application-level configuration: an optional JSON file for tunables plus
//! environment variables for credentials and backends.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PRONO_BACK_CONFIG_PATH";

const DEFAULT_PRICE_MONTHLY: &str = "price_1SvJ50D6sfAQHSctybQMQgG9";
const DEFAULT_PRICE_YEARLY: &str = "price_1SvJ50D6sfAQHSctb85QND6z";
/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// League display name to football-data.org competition code.
    pub competitions: IndexMap<String, String>,
    /// Leagues whose fixtures are imported by `loadRealMatches`.
    pub fixture_leagues: Vec<String>,
    /// Leagues refreshed by `syncAllLeagues`.
    pub standings_leagues: Vec<String>,
    pub prices: PriceIds,
    pub schedule: ScheduleConfig,
    /// Minimum delay between two football-data.org requests.
    pub football_request_spacing: Duration,
    /// How many upcoming matches a non-premium user can see.
    pub free_upcoming_limit: usize,
}

/// Stripe price identifiers for each plan.
#[derive(Debug, Clone)]
pub struct PriceIds {
    pub monthly: String,
    pub yearly: String,
}

/// Timings of the background jobs.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub reconcile_interval: Duration,
    pub favorite_notify_interval: Duration,
    /// Time after kickoff before a match is checked for a final result.
    pub result_grace: Duration,
    pub result_lookup_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        competitions = app_config.competitions.len(),
                        "loaded configuration file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(monthly) = env::var("STRIPE_PRICE_MONTHLY") {
            self.prices.monthly = monthly;
        }
        if let Ok(yearly) = env::var("STRIPE_PRICE_YEARLY") {
            self.prices.yearly = yearly;
        }
        self
    }

    /// Competition code of a league, when football-data.org covers it.
    pub fn competition_code(&self, league: &str) -> Option<&str> {
        self.competitions.get(league).map(String::as_str)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let competitions = default_competitions();
        let fixture_leagues = competitions
            .keys()
            .filter(|league| league.as_str() != "Europa League")
            .cloned()
            .collect();
        let standings_leagues = competitions.keys().take(5).cloned().collect();
        Self {
            competitions,
            fixture_leagues,
            standings_leagues,
            prices: PriceIds {
                monthly: DEFAULT_PRICE_MONTHLY.into(),
                yearly: DEFAULT_PRICE_YEARLY.into(),
            },
            schedule: ScheduleConfig::default(),
            football_request_spacing: Duration::from_millis(7_000),
            free_upcoming_limit: 3,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(5 * 60),
            favorite_notify_interval: Duration::from_secs(60 * 60),
            result_grace: Duration::from_secs(2 * 60 * 60),
            result_lookup_timeout: Duration::from_secs(30),
        }
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[serde_as]
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    competitions: Option<IndexMap<String, String>>,
    #[serde(default)]
    fixture_leagues: Option<Vec<String>>,
    #[serde(default)]
    standings_leagues: Option<Vec<String>>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(rename = "reconcile_interval_secs")]
    reconcile_interval: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(rename = "favorite_notify_interval_secs")]
    favorite_notify_interval: Option<Duration>,
    #[serde(default)]
    result_grace_minutes: Option<u64>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(rename = "result_lookup_timeout_secs")]
    result_lookup_timeout: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "football_request_spacing_ms")]
    football_request_spacing: Option<Duration>,
    #[serde(default)]
    free_upcoming_limit: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let mut config = Self::default();
        if let Some(competitions) = value.competitions {
            config.competitions = competitions;
        }
        if let Some(leagues) = value.fixture_leagues {
            config.fixture_leagues = leagues;
        }
        if let Some(leagues) = value.standings_leagues {
            config.standings_leagues = leagues;
        }
        if let Some(interval) = value.reconcile_interval {
            config.schedule.reconcile_interval = interval.max(MIN_INTERVAL);
        }
        if let Some(interval) = value.favorite_notify_interval {
            config.schedule.favorite_notify_interval = interval.max(MIN_INTERVAL);
        }
        if let Some(minutes) = value.result_grace_minutes {
            config.schedule.result_grace = Duration::from_secs(minutes * 60);
        }
        if let Some(timeout) = value.result_lookup_timeout {
            config.schedule.result_lookup_timeout = timeout;
        }
        if let Some(spacing) = value.football_request_spacing {
            config.football_request_spacing = spacing;
        }
        if let Some(limit) = value.free_upcoming_limit {
            config.free_upcoming_limit = limit;
        }
        config
    }
}

/// Secrets and endpoints read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub football_data_api_key: Option<String>,
    pub app_id: Option<String>,
    pub auth_base_url: Option<String>,
    pub llm_api_url: Option<String>,
    pub llm_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let read = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());
        let credentials = Self {
            stripe_secret_key: read("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: read("STRIPE_WEBHOOK_SECRET"),
            football_data_api_key: read("FOOTBALL_DATA_API_KEY"),
            app_id: read("APP_ID").or_else(|| read("BASE44_APP_ID")),
            auth_base_url: read("AUTH_BASE_URL"),
            llm_api_url: read("LLM_API_URL"),
            llm_api_key: read("LLM_API_KEY"),
        };

        for (name, present) in [
            ("STRIPE_SECRET_KEY", credentials.stripe_secret_key.is_some()),
            (
                "STRIPE_WEBHOOK_SECRET",
                credentials.stripe_webhook_secret.is_some(),
            ),
            (
                "FOOTBALL_DATA_API_KEY",
                credentials.football_data_api_key.is_some(),
            ),
            ("AUTH_BASE_URL", credentials.auth_base_url.is_some()),
            ("LLM_API_URL", credentials.llm_api_url.is_some()),
        ] {
            if !present {
                warn!(variable = name, "environment variable not set; dependent endpoints will fail");
            }
        }

        credentials
    }
}

/// Persistence backend selected through `STORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Couch,
    Mongo,
}

impl StoreBackend {
    pub fn from_env() -> Self {
        match env::var("STORE_BACKEND").as_deref().map(str::trim) {
            Ok("couch") | Ok("couchdb") => StoreBackend::Couch,
            Ok("mongo") | Ok("mongodb") => StoreBackend::Mongo,
            Ok("memory") | Ok("") | Err(_) => StoreBackend::Memory,
            Ok(other) => {
                warn!(backend = other, "unknown STORE_BACKEND; using in-memory store");
                StoreBackend::Memory
            }
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Competitions covered by the free football-data.org tier.
fn default_competitions() -> IndexMap<String, String> {
    [
        ("Ligue 1", "FL1"),
        ("Premier League", "PL"),
        ("La Liga", "PD"),
        ("Serie A", "SA"),
        ("Bundesliga", "BL1"),
        ("Ligue des Champions", "CL"),
        ("Europa League", "EL"),
    ]
    .into_iter()
    .map(|(league, code)| (league.to_string(), code.to_string()))
    .collect()
}
