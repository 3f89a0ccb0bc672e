//! 翌日分データの有無チェック
//!
//! 統合データセットに翌日分が既にあればブラウザ起動ごと省略する。

use chrono::{Days, NaiveDate};
use tracing::{info, warn};

use super::store::PriceStore;
use super::types::PriceDataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// 翌日分あり。取得不要
    Skip { tomorrow: NaiveDate },
    /// 取得が必要
    Proceed,
}

pub fn tomorrow_of(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

/// 既存データセットから判定
pub fn evaluate(dataset: Option<&PriceDataset>, today: NaiveDate) -> Freshness {
    let tomorrow = tomorrow_of(today);
    match dataset {
        Some(d) if d.has_date(tomorrow) => Freshness::Skip { tomorrow },
        _ => Freshness::Proceed,
    }
}

/// ディスク上の統合データセットを読んで判定。読めない場合は取得へ進む
pub fn check(store: &PriceStore, today: NaiveDate) -> Freshness {
    let dataset = match store.read_dataset() {
        Ok(d) => d,
        Err(e) => {
            warn!(
                "Could not read existing data at {:?} (continuing with fetch): {}",
                store.combined_path(),
                e
            );
            None
        }
    };

    let freshness = evaluate(dataset.as_ref(), today);
    if let Freshness::Skip { tomorrow } = freshness {
        info!(
            "Tomorrow's data ({}) already present in {:?}. Skipping fetch.",
            tomorrow,
            store.combined_path()
        );
    }
    freshness
}
