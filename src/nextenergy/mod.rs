//! NextEnergy スクレイパーモジュール
//!
//! 市場価格ページのデータアクションを横取りして時間別価格を取得する

pub mod listener;
pub mod pagination;
mod scraper;
mod types;

pub use scraper::{collect_day_payloads, wait_for_capture, NextEnergyScraper};
pub use types::DataPointsResponse;
