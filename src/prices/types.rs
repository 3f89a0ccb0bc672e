//! 価格データ関連の型定義

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 時間帯（0〜23時）。JSON上は `"HH:00"` 形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hour(u8);

impl Hour {
    pub fn new(hour: u8) -> Option<Self> {
        (hour < 24).then_some(Self(hour))
    }

    /// 24で割った余りを時間帯とする（負数も 0..24 に収まる）
    pub fn wrapping(hour: i64) -> Self {
        Self(hour.rem_euclid(24) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

impl FromStr for Hour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hour = s
            .strip_suffix(":00")
            .filter(|h| h.len() == 2)
            .and_then(|h| h.parse::<u8>().ok())
            .and_then(Hour::new);
        hour.ok_or_else(|| format!("invalid hour slot: {:?}", s))
    }
}

impl Serialize for Hour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 1時間分の価格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub time: Hour,
    pub price: f64,
}

/// ベンダーのデータポイント（Label/Value は数値・文字列どちらもあり得る）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(rename = "Label", default)]
    pub label: serde_json::Value,
    #[serde(rename = "Value", default)]
    pub value: serde_json::Value,
}

/// 取得したレスポンス1件分（1日分）
#[derive(Debug, Clone)]
pub struct CapturedPayload {
    pub points: Vec<RawPoint>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedPayload {
    pub fn new(points: Vec<RawPoint>) -> Self {
        Self {
            points,
            captured_at: Utc::now(),
        }
    }
}

/// 1日分にまとめた価格
#[derive(Debug, Clone, PartialEq)]
pub struct DayPrices {
    pub date: NaiveDate,
    pub records: Vec<PriceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub fetch_time: DateTime<FixedOffset>,
    pub today: NaiveDate,
}

/// 統合データセット（latest ファイルの中身）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDataset {
    pub meta: DatasetMeta,
    pub prices: Vec<PriceRecord>,
}

impl PriceDataset {
    pub fn has_date(&self, date: NaiveDate) -> bool {
        self.prices.iter().any(|p| p.date == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_bounds() {
        assert!(Hour::new(0).is_some());
        assert!(Hour::new(23).is_some());
        assert!(Hour::new(24).is_none());
        assert_eq!(Hour::wrapping(25).get(), 1);
        assert_eq!(Hour::wrapping(-1).get(), 23);
    }

    #[test]
    fn test_hour_format_and_parse() {
        let hour = Hour::new(7).unwrap();
        assert_eq!(hour.to_string(), "07:00");
        assert_eq!("07:00".parse::<Hour>().unwrap(), hour);
        assert!("7:00".parse::<Hour>().is_err());
        assert!("24:00".parse::<Hour>().is_err());
        assert!("07:30".parse::<Hour>().is_err());
    }

    #[test]
    fn test_price_record_json_shape() {
        let record = PriceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            time: Hour::new(23).unwrap(),
            price: 60.1,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date": "2024-01-10", "time": "23:00", "price": 60.1})
        );
    }

    #[test]
    fn test_raw_point_accepts_mixed_types() {
        let points: Vec<RawPoint> =
            serde_json::from_str(r#"[{"Label": 0, "Value": "50.5"}, {"Label": "1", "Value": 49}]"#)
                .unwrap();
        assert_eq!(points[0].label, serde_json::json!(0));
        assert_eq!(points[1].value, serde_json::json!(49));
    }

    #[test]
    fn test_dataset_has_date() {
        let dataset: PriceDataset = serde_json::from_str(
            r#"{
                "meta": {"fetch_time": "2024-01-10T12:00:00+01:00", "today": "2024-01-10"},
                "prices": [{"date": "2024-01-11", "time": "00:00", "price": 1.0}]
            }"#,
        )
        .unwrap();
        assert!(dataset.has_date(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()));
        assert!(!dataset.has_date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));
    }
}
