//! 日付割り当てとデータセットのマージ

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use super::decode::{decode_payload, HourOffset};
use super::types::{CapturedPayload, DayPrices, Hour, PriceDataset, PriceRecord};

/// 今回取得しなかった日付の既存レコードを残すか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// 既存レコードを保持し、今回取得した日付だけ置き換える
    #[default]
    KeepPrior,
    /// 今回の取得分だけで作り直す
    CurrentRun,
}

impl FromStr for Retention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-prior" | "keep_prior" => Ok(Self::KeepPrior),
            "current-run" | "current_run" => Ok(Self::CurrentRun),
            other => Err(format!(
                "invalid retention {:?} (expected keep-prior or current-run)",
                other
            )),
        }
    }
}

/// 取得順に today + index の日付を割り当てて変換する
///
/// 1件目が今日、2件目が明日。レコードが0件のレスポンスは飛ばすが、
/// index は消費する。同じ時間帯が複数あれば後のものを採用。
pub fn assign_dates(
    payloads: &[CapturedPayload],
    today: NaiveDate,
    offset: HourOffset,
) -> Vec<DayPrices> {
    let mut days = Vec::new();

    for (index, payload) in payloads.iter().enumerate() {
        let Some(date) = today.checked_add_days(Days::new(index as u64)) else {
            continue;
        };

        let mut by_hour: BTreeMap<Hour, PriceRecord> = BTreeMap::new();
        for record in decode_payload(payload, date, offset) {
            by_hour.insert(record.time, record);
        }

        if by_hour.is_empty() {
            info!(
                "Payload {} (captured at {}) has no usable points, skipping {}",
                index, payload.captured_at, date
            );
            continue;
        }

        debug!("Payload {} -> {} ({} records)", index, date, by_hour.len());
        days.push(DayPrices {
            date,
            records: by_hour.into_values().collect(),
        });
    }

    days
}

/// 既存データセットと今回分をマージ
///
/// `(date, time)` ごとに1件。今回取得した日付は丸ごと置き換え、
/// 同じ日付が複数回取得されていれば後のものが勝つ。
pub fn merge(
    prior: Option<&PriceDataset>,
    days: &[DayPrices],
    retention: Retention,
) -> Vec<PriceRecord> {
    let captured: BTreeSet<NaiveDate> = days.iter().map(|d| d.date).collect();
    let mut merged: BTreeMap<(NaiveDate, Hour), PriceRecord> = BTreeMap::new();

    if let (Some(prior), Retention::KeepPrior) = (prior, retention) {
        for record in prior
            .prices
            .iter()
            .filter(|r| !captured.contains(&r.date))
        {
            merged.insert((record.date, record.time), record.clone());
        }
    }

    for day in days {
        merged.retain(|(date, _), _| *date != day.date);
        for record in &day.records {
            merged.insert((record.date, record.time), record.clone());
        }
    }

    merged.into_values().collect()
}
