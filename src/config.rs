use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Local, NaiveDate};

use crate::matching::{DEFAULT_MIN_MINUTES, MatchQuery, SearchMode};
use crate::normalize::{DEFAULT_MIN_GROUP_SIZE, MissingPolicy, NormalizeOptions};

pub const DEFAULT_API_BASE: &str = "https://data.statsbombservices.com/api";
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub parallelism: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoutConfig {
    pub min_minutes: f64,
    pub min_group_size: usize,
    pub top_n: usize,
    pub missing_value: f64,
    pub exclude_missing: bool,
    pub reference_date: Option<NaiveDate>,
    pub taxonomy_path: Option<PathBuf>,
    pub provider: ProviderConfig,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            min_minutes: DEFAULT_MIN_MINUTES,
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            top_n: DEFAULT_TOP_N,
            missing_value: 0.0,
            exclude_missing: false,
            reference_date: None,
            taxonomy_path: None,
            provider: ProviderConfig {
                base_url: DEFAULT_API_BASE.to_string(),
                username: None,
                password: None,
                parallelism: 6,
                timeout_secs: 60,
            },
        }
    }
}

impl ScoutConfig {
    /// Load `.env.local` / `.env` (if present) and read `SCOUT_*` variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_current_env()
    }

    pub fn from_current_env() -> Self {
        let defaults = Self::default();
        Self {
            min_minutes: env_parse("SCOUT_MIN_MINUTES")
                .filter(|v: &f64| v.is_finite())
                .unwrap_or(defaults.min_minutes)
                .max(0.0),
            min_group_size: env_parse("SCOUT_MIN_GROUP_SIZE")
                .unwrap_or(defaults.min_group_size)
                .max(1),
            top_n: env_parse("SCOUT_TOP_N").unwrap_or(defaults.top_n).max(1),
            missing_value: env_parse("SCOUT_MISSING_VALUE")
                .filter(|v: &f64| v.is_finite())
                .unwrap_or(defaults.missing_value),
            exclude_missing: env_flag("SCOUT_EXCLUDE_MISSING").unwrap_or(false),
            reference_date: env_string("SCOUT_REFERENCE_DATE")
                .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()),
            taxonomy_path: env_string("SCOUT_TAXONOMY_PATH").map(PathBuf::from),
            provider: ProviderConfig {
                base_url: env_string("SCOUT_API_BASE")
                    .map(|s| s.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.provider.base_url),
                username: env_string("SCOUT_API_USER"),
                password: env_string("SCOUT_API_PASSWORD"),
                parallelism: env_parse("SCOUT_FETCH_PARALLELISM")
                    .unwrap_or(defaults.provider.parallelism)
                    .clamp(1, 32),
                timeout_secs: env_parse("SCOUT_FETCH_TIMEOUT_SECS")
                    .unwrap_or(defaults.provider.timeout_secs)
                    .max(5),
            },
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            min_group_size: self.min_group_size,
            missing: if self.exclude_missing {
                MissingPolicy::Exclude
            } else {
                MissingPolicy::Substitute(self.missing_value)
            },
            reference_date: self
                .reference_date
                .unwrap_or_else(|| Local::now().date_naive()),
        }
    }

    pub fn match_query(&self, mode: SearchMode) -> MatchQuery {
        MatchQuery {
            mode,
            min_minutes: self.min_minutes,
            missing_value: self.missing_value,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|raw| raw.parse::<T>().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = env_string(key)?;
    Some(matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    ))
}
