use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const STATE_FILE: &str = "slate_state.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Live score provider
    pub sports_base_url: Option<String>,
    /// Sportsbook lines provider
    pub lines_base_url: Option<String>,
    /// Weekly schedule provider
    pub schedule_base_url: Option<String>,
    pub data_dir: PathBuf,
    pub default_wager: Decimal,
    pub slate_size: usize,
    /// Hours from UTC of the slate's local day
    pub slate_utc_offset_hours: i32,
    /// Days after `start_date` the schedule window opens
    pub day_offset: i64,
    pub start_date: Option<NaiveDate>,
    pub bind_addr: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset and blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let slate_utc_offset_hours: i32 = match var("SLATE_UTC_OFFSET_HOURS") {
            Some(raw) => raw.trim().parse().context("Invalid SLATE_UTC_OFFSET_HOURS")?,
            None => -7,
        };
        if !(-23..=23).contains(&slate_utc_offset_hours) {
            return Err(anyhow!(
                "SLATE_UTC_OFFSET_HOURS must be between -23 and 23, got {slate_utc_offset_hours}"
            ));
        }

        Ok(Self {
            sports_base_url: var("SPORTS_BASE_URL"),
            lines_base_url: var("LINES_BASE_URL"),
            schedule_base_url: var("SCHEDULE_BASE_URL"),
            data_dir: var("DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.into())
                .into(),
            default_wager: match var("DEFAULT_WAGER") {
                Some(raw) => raw.trim().parse().context("Invalid DEFAULT_WAGER")?,
                None => Decimal::from(100),
            },
            slate_size: match var("SLATE_SIZE") {
                Some(raw) => raw.trim().parse().context("Invalid SLATE_SIZE")?,
                None => 20,
            },
            slate_utc_offset_hours,
            day_offset: match var("DAY_OFFSET") {
                Some(raw) => raw.trim().parse().context("Invalid DAY_OFFSET")?,
                None => 2,
            },
            start_date: var("START_DATE")
                .map(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d"))
                .transpose()
                .context("START_DATE must be YYYY-MM-DD")?,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            log_format: match var("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.slate_utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn require_sports_base_url(&self) -> Result<&str> {
        self.sports_base_url
            .as_deref()
            .ok_or_else(|| anyhow!("SPORTS_BASE_URL must be set"))
    }

    pub fn require_lines_base_url(&self) -> Result<&str> {
        self.lines_base_url
            .as_deref()
            .ok_or_else(|| anyhow!("LINES_BASE_URL must be set"))
    }

    pub fn require_schedule_base_url(&self) -> Result<&str> {
        self.schedule_base_url
            .as_deref()
            .ok_or_else(|| anyhow!("SCHEDULE_BASE_URL must be set"))
    }
}

/// Install the global subscriber. Filters come from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.default_wager, Decimal::from(100));
        assert_eq!(config.slate_size, 20);
        assert_eq!(config.day_offset, 2);
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.state_path(), PathBuf::from("data/slate_state.json"));
        assert_eq!(config.utc_offset(), FixedOffset::west_opt(7 * 3600).unwrap());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.require_sports_base_url().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("SPORTS_BASE_URL", "http://scores.local/api/v1/json/3"),
            ("DEFAULT_WAGER", "25.5"),
            ("SLATE_SIZE", "12"),
            ("SLATE_UTC_OFFSET_HOURS", "-8"),
            ("START_DATE", "2023-02-26"),
            ("LOG_FORMAT", "json"),
            ("DATA_DIR", " "),
        ])
        .unwrap();

        assert_eq!(
            config.require_sports_base_url().unwrap(),
            "http://scores.local/api/v1/json/3"
        );
        assert_eq!(config.default_wager, Decimal::new(255, 1));
        assert_eq!(config.slate_size, 12);
        assert_eq!(config.utc_offset(), FixedOffset::west_opt(8 * 3600).unwrap());
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 2, 26));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config(&[("SLATE_SIZE", "twenty")]).is_err());
        assert!(config(&[("SLATE_UTC_OFFSET_HOURS", "30")]).is_err());
        assert!(config(&[("START_DATE", "02/26/2023")]).is_err());
    }
}
