//! JSONファイルへの保存

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ScraperError;

use super::decode::HourOffset;
use super::merge::{assign_dates, merge, Retention};
use super::types::{CapturedPayload, DatasetMeta, PriceDataset};

/// 統合データセットのファイル名
pub const COMBINED_FILE_NAME: &str = "latest_energy_prices.json";
const DAY_FILE_PREFIX: &str = "parsed_energy_prices_";

/// 保存結果
#[derive(Debug, Clone, PartialEq)]
pub struct PersistSummary {
    /// 保存した日付（取得順）
    pub days: Vec<NaiveDate>,
    /// 統合データセットの総レコード数
    pub records: usize,
    pub combined_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PriceStore {
    data_dir: PathBuf,
}

impl PriceStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn combined_path(&self) -> PathBuf {
        self.data_dir.join(COMBINED_FILE_NAME)
    }

    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}{}.json", DAY_FILE_PREFIX, date.format("%Y-%m-%d")))
    }

    /// 統合データセットを読む。ファイルがなければ None
    pub fn read_dataset(&self) -> Result<Option<PriceDataset>, ScraperError> {
        let path = self.combined_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let dataset: PriceDataset = serde_json::from_str(&contents)?;
        info!(
            "Read combined dataset at {:?} ({} records)",
            path,
            dataset.prices.len()
        );
        Ok(Some(dataset))
    }

    pub fn write_dataset(&self, dataset: &PriceDataset) -> Result<PathBuf, ScraperError> {
        let path = self.combined_path();
        self.write_json(&path, dataset)?;
        Ok(path)
    }

    /// 取得したレスポンスを日付ごとに変換し、日別ファイルと統合ファイルを書き出す
    ///
    /// 変換できたレコードが1件もなければ何も書かずに None を返す。
    pub fn persist(
        &self,
        payloads: &[CapturedPayload],
        today: NaiveDate,
        fetch_time: DateTime<FixedOffset>,
        offset: HourOffset,
        retention: Retention,
    ) -> Result<Option<PersistSummary>, ScraperError> {
        let days = assign_dates(payloads, today, offset);
        if days.is_empty() {
            return Ok(None);
        }

        for day in &days {
            let path = self.day_path(day.date);
            info!("Saving {} data to {:?}...", day.date, path);
            self.write_json(&path, &day.records)?;
        }

        let prior = match retention {
            Retention::KeepPrior => self.read_dataset().unwrap_or_else(|e| {
                warn!("Existing combined dataset unreadable, rebuilding: {}", e);
                None
            }),
            Retention::CurrentRun => None,
        };

        let dataset = PriceDataset {
            meta: DatasetMeta { fetch_time, today },
            prices: merge(prior.as_ref(), &days, retention),
        };

        info!(
            "Updating combined latest file at {:?}...",
            self.combined_path()
        );
        let combined_path = self.write_dataset(&dataset)?;

        Ok(Some(PersistSummary {
            days: days.iter().map(|d| d.date).collect(),
            records: dataset.prices.len(),
            combined_path,
        }))
    }

    /// 一時ファイルに書いてからリネーム
    fn write_json<T>(&self, path: &Path, value: &T) -> Result<(), ScraperError>
    where
        T: Serialize + ?Sized,
    {
        std::fs::create_dir_all(&self.data_dir)?;

        let json = serde_json::to_string_pretty(value)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}
