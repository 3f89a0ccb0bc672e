//! 時間別価格のモデル・変換・保存

pub mod decode;
pub mod freshness;
pub mod merge;
pub mod store;
mod types;

pub use decode::HourOffset;
pub use freshness::Freshness;
pub use merge::Retention;
pub use store::{PersistSummary, PriceStore};
pub use types::{
    CapturedPayload, DatasetMeta, DayPrices, Hour, PriceDataset, PriceRecord, RawPoint,
};
