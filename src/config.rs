use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::ScraperError;
use crate::prices::{HourOffset, Retention};

pub const DEFAULT_URL: &str = "https://mijn.nextenergy.nl/Website_CW/MarketPrices";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36"
);
pub const DEFAULT_LOCALE: &str = "nl-NL";
/// 価格データを返すデータアクションのパスに含まれる文字列
pub const DATA_ACTION: &str = "DataActionGetDataPoints";
/// 「次の日」ボタン: 矢印アイコンのコンテナ → 固定ID の順で探す
pub const NEXT_DAY_SELECTORS: [&str; 2] =
    [".arrow-container:has(.fa-angle-right)", "#b1-b3-b1-Next"];

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub url: String,
    pub data_dir: PathBuf,
    pub user_agent: String,
    pub locale: String,
    pub action_identifier: String,
    pub next_day_selectors: Vec<String>,
    pub headless: bool,
    pub debug: bool,
    pub chrome_path: Option<PathBuf>,
    /// CDPリクエストのタイムアウト
    pub timeout: Duration,
    /// ナビゲーション・クリック後にレスポンス到着を待つ上限
    pub settle_timeout: Duration,
    /// 「次の日」ボタンを探す上限
    pub pagination_wait: Duration,
    pub hour_offset: HourOffset,
    pub retention: Retention,
    /// 「今日」を決めるタイムゾーン
    pub market_timezone: Tz,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            data_dir: PathBuf::from("./data"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            action_identifier: DATA_ACTION.to_string(),
            next_day_selectors: NEXT_DAY_SELECTORS.iter().map(|s| s.to_string()).collect(),
            headless: true,
            debug: false,
            chrome_path: None,
            timeout: Duration::from_secs(60),
            settle_timeout: Duration::from_secs(3),
            pagination_wait: Duration::from_secs(5),
            hour_offset: HourOffset::ZERO,
            retention: Retention::KeepPrior,
            market_timezone: chrono_tz::Europe::Amsterdam,
        }
    }
}

impl ScraperConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// 環境変数から設定を読む。未設定の項目はデフォルト値
    pub fn from_env() -> Result<Self, ScraperError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScraperError> {
        let mut config = Self::default();

        if let Some(url) = lookup("PRICES_URL") {
            config.url = url;
        }
        if let Some(dir) = lookup("PRICES_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ua) = lookup("PRICES_USER_AGENT") {
            config.user_agent = ua;
        }
        if let Some(locale) = lookup("PRICES_LOCALE") {
            config.locale = locale;
        }
        if let Some(headless) = lookup("HEADLESS") {
            config.headless = parse_bool("HEADLESS", &headless)?;
        }
        if let Some(debug) = lookup("PRICES_DEBUG") {
            config.debug = parse_bool("PRICES_DEBUG", &debug)?;
        }
        config.chrome_path = lookup("CHROME_PATH")
            .or_else(|| lookup("CHROMIUM_PATH"))
            .map(PathBuf::from);
        if let Some(offset) = lookup("PRICE_LABEL_OFFSET") {
            config.hour_offset = offset.parse().map_err(ScraperError::Config)?;
        }
        if let Some(retention) = lookup("PRICES_RETENTION") {
            config.retention = retention.parse().map_err(ScraperError::Config)?;
        }
        if let Some(tz) = lookup("MARKET_TIMEZONE") {
            config.market_timezone = tz
                .parse()
                .map_err(|e| ScraperError::Config(format!("MARKET_TIMEZONE={}: {}", tz, e)))?;
        }

        Ok(config)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    pub fn with_hour_offset(mut self, offset: HourOffset) -> Self {
        self.hour_offset = offset;
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_market_timezone(mut self, tz: Tz) -> Self {
        self.market_timezone = tz;
        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ScraperError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ScraperError::Config(format!("{}={}: expected true/false", key, other))),
    }
}
