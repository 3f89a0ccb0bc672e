use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, NaiveDate, Utc};
use tower::Service;
use tracing::info;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::nextenergy::NextEnergyScraper;
use crate::prices::freshness::{self, Freshness};
use crate::prices::{HourOffset, PriceStore};
use crate::traits::Scraper;

/// 取得結果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 翌日分が既にあるため取得しなかった
    Skipped { tomorrow: NaiveDate },
    /// 使えるデータが取れなかった（ファイルは書いていない）
    NoData { captured: usize },
    /// 保存した
    Saved {
        days: Vec<NaiveDate>,
        records: usize,
        combined_path: PathBuf,
    },
}

/// 翌日分チェック → 取得 → 日別/統合ファイル保存
///
/// ブラウザセッションの失敗と保存時のI/Oエラーだけを返す。
pub async fn fetch_prices<S: Scraper + ?Sized>(
    config: &ScraperConfig,
    scraper: &mut S,
    now: DateTime<Utc>,
) -> Result<FetchOutcome, ScraperError> {
    let local_now = now.with_timezone(&config.market_timezone);
    let today = local_now.date_naive();
    let store = PriceStore::new(&config.data_dir);

    if let Freshness::Skip { tomorrow } = freshness::check(&store, today) {
        return Ok(FetchOutcome::Skipped { tomorrow });
    }

    let payloads = scraper.execute().await?;
    if payloads.is_empty() {
        info!("No data was captured from the API.");
        return Ok(FetchOutcome::NoData { captured: 0 });
    }

    info!("Processing {} days of data...", payloads.len());
    let summary = store.persist(
        &payloads,
        today,
        local_now.fixed_offset(),
        config.hour_offset,
        config.retention,
    )?;

    match summary {
        Some(summary) => {
            info!(
                "Done successfully: {} day(s), {} records in {:?}",
                summary.days.len(),
                summary.records,
                summary.combined_path
            );
            Ok(FetchOutcome::Saved {
                days: summary.days,
                records: summary.records,
                combined_path: summary.combined_path,
            })
        }
        None => {
            info!("Captured {} response(s) but no usable price points", payloads.len());
            Ok(FetchOutcome::NoData {
                captured: payloads.len(),
            })
        }
    }
}

/// 価格取得リクエスト
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub data_dir: PathBuf,
    pub headless: bool,
    pub hour_offset: HourOffset,
}

impl FetchRequest {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            headless: true,
            hour_offset: HourOffset::default(),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_hour_offset(mut self, offset: HourOffset) -> Self {
        self.hour_offset = offset;
        self
    }
}

impl From<FetchRequest> for ScraperConfig {
    fn from(req: FetchRequest) -> Self {
        ScraperConfig::new(req.data_dir)
            .with_headless(req.headless)
            .with_hour_offset(req.hour_offset)
    }
}

/// tower::Serviceを実装した価格取得サービス
#[derive(Debug, Clone)]
pub struct PriceService<F> {
    make_scraper: F,
}

impl PriceService<fn(ScraperConfig) -> NextEnergyScraper> {
    pub fn new() -> Self {
        Self {
            make_scraper: NextEnergyScraper::new,
        }
    }
}

impl Default for PriceService<fn(ScraperConfig) -> NextEnergyScraper> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> PriceService<F> {
    /// スクレイパーの生成方法を差し替える
    pub fn with_scraper<S>(make_scraper: F) -> Self
    where
        F: Fn(ScraperConfig) -> S,
    {
        Self { make_scraper }
    }
}

impl<F, S> Service<FetchRequest> for PriceService<F>
where
    F: Fn(ScraperConfig) -> S,
    S: Scraper + 'static,
{
    type Response = FetchOutcome;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FetchRequest) -> Self::Future {
        info!("価格取得リクエスト受信: data_dir={:?}", req.data_dir);

        let config: ScraperConfig = req.into();
        let mut scraper = (self.make_scraper)(config.clone());

        Box::pin(async move { fetch_prices(&config, &mut scraper, Utc::now()).await })
    }
}
