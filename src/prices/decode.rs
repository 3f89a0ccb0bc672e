//! ラベル → 時間帯 変換
//!
//! ベンダーのラベル番号と時間帯の対応は環境によって異なり、
//! `label mod 24` と `(label + 1) mod 24` の2通りが観測されている。
//! どちらが正しいかはベンダー側の時間帯定義で要確認のため、
//! オフセットは [`HourOffset`] として設定から渡す。

use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use super::types::{CapturedPayload, Hour, PriceRecord, RawPoint};

/// ラベルに加算するオフセット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HourOffset(i64);

impl HourOffset {
    /// `label mod 24`
    pub const ZERO: HourOffset = HourOffset(0);
    /// `(label + 1) mod 24`
    pub const PLUS_ONE: HourOffset = HourOffset(1);

    pub const fn new(offset: i64) -> Self {
        Self(offset)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl FromStr for HourOffset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(HourOffset)
            .map_err(|e| format!("invalid hour offset {:?}: {}", s, e))
    }
}

/// ラベルを時間帯に変換
pub fn decode_label(label: i64, offset: HourOffset) -> Hour {
    Hour::wrapping(label.wrapping_add(offset.0))
}

fn parse_label(label: &Value) -> Option<i64> {
    match label {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    price.is_finite().then_some(price)
}

/// データポイント1件を変換。変換できない場合は警告を出して None
pub fn decode_point(point: &RawPoint, date: NaiveDate, offset: HourOffset) -> Option<PriceRecord> {
    let Some(label) = parse_label(&point.label) else {
        warn!("Dropping point with unparsable label: {}", point.label);
        return None;
    };
    let Some(price) = parse_price(&point.value) else {
        warn!(
            "Dropping point label={} with unparsable value: {}",
            label, point.value
        );
        return None;
    };

    Some(PriceRecord {
        date,
        time: decode_label(label, offset),
        price,
    })
}

/// レスポンス1件分を指定日の価格レコードに変換
pub fn decode_payload(
    payload: &CapturedPayload,
    date: NaiveDate,
    offset: HourOffset,
) -> Vec<PriceRecord> {
    payload
        .points
        .iter()
        .filter_map(|point| decode_point(point, date, offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn point(label: Value, value: Value) -> RawPoint {
        RawPoint { label, value }
    }

    #[test]
    fn test_decode_label_is_periodic() {
        for label in 0..48 {
            let hour = decode_label(label, HourOffset::ZERO);
            assert!(hour.get() < 24);
            assert_eq!(hour, decode_label(label + 24, HourOffset::ZERO));
            assert_eq!(hour.get() as i64, label % 24);
        }
    }

    #[test]
    fn test_decode_label_with_offset() {
        assert_eq!(decode_label(0, HourOffset::PLUS_ONE).to_string(), "01:00");
        assert_eq!(decode_label(23, HourOffset::PLUS_ONE).to_string(), "00:00");
        assert_eq!(decode_label(23, HourOffset::ZERO).to_string(), "23:00");
        assert_eq!(decode_label(-1, HourOffset::ZERO).to_string(), "23:00");
    }

    #[test]
    fn test_offset_from_str() {
        assert_eq!("1".parse::<HourOffset>().unwrap(), HourOffset::PLUS_ONE);
        assert_eq!(" 0 ".parse::<HourOffset>().unwrap(), HourOffset::ZERO);
        assert!("one".parse::<HourOffset>().is_err());
    }

    fn decode_at_zero(label: Value, value: Value) -> Option<PriceRecord> {
        decode_point(&point(label, value), date(), HourOffset::ZERO)
    }

    #[test]
    fn test_decode_point_mixed_encodings() {
        let record = decode_at_zero(json!("5"), json!(12.25)).unwrap();
        assert_eq!(record.time.to_string(), "05:00");
        assert_eq!(record.price, 12.25);

        let record = decode_at_zero(json!(6.0), json!(" -3.5 ")).unwrap();
        assert_eq!(record.time.to_string(), "06:00");
        assert_eq!(record.price, -3.5);
    }

    #[test]
    fn test_decode_point_rejects_garbage() {
        assert!(decode_at_zero(json!("x"), json!("1.0")).is_none());
        assert!(decode_at_zero(json!(1), json!("n/a")).is_none());
        assert!(decode_at_zero(json!(1), json!("NaN")).is_none());
        assert!(decode_at_zero(json!(1.5), json!("1.0")).is_none());
        assert!(decode_at_zero(Value::Null, json!("1.0")).is_none());
    }

    #[test]
    fn test_decode_payload_keeps_valid_siblings() {
        let payload = CapturedPayload::new(vec![
            point(json!(0), json!("50.5")),
            point(json!(1), json!("abc")),
            point(json!(23), json!("60.1")),
        ]);
        let records = decode_payload(&payload, date(), HourOffset::ZERO);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time.to_string(), "00:00");
        assert_eq!(records[1].time.to_string(), "23:00");
        assert_eq!(records[1].price, 60.1);
    }
}
