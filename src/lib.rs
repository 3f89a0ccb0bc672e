//! 電力市場価格スクレイパーライブラリ
//!
//! - NextEnergy の市場価格ページから今日・明日の時間別価格を取得
//! - 日別ファイルと統合 (latest) ファイルにJSONで保存
//! - 統合ファイルに明日の分が既にあればブラウザを起動しない
//!
//! # 使用例
//!
//! ```rust,ignore
//! use price_scraper::{fetch_prices, NextEnergyScraper, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new("./data").with_headless(true);
//!     let mut scraper = NextEnergyScraper::new(config.clone());
//!
//!     let outcome = fetch_prices(&config, &mut scraper, chrono::Utc::now())
//!         .await
//!         .unwrap();
//!     println!("{:?}", outcome);
//! }
//! ```
//!
//! # tower::Service として使う
//!
//! ```rust,ignore
//! use price_scraper::{FetchRequest, PriceService};
//! use tower::Service;
//!
//! let mut service = PriceService::new();
//! let outcome = service.call(FetchRequest::new("./data")).await?;
//! ```

pub mod config;
pub mod error;
pub mod nextenergy;
pub mod prices;
pub mod service;
pub mod traits;

// 主要な型をリエクスポート
pub use config::ScraperConfig;
pub use error::ScraperError;
pub use nextenergy::NextEnergyScraper;
pub use prices::{HourOffset, PriceDataset, PriceRecord, PriceStore, Retention};
pub use service::{fetch_prices, FetchOutcome, FetchRequest, PriceService};
pub use traits::Scraper;
