//! NextEnergy データアクションのレスポンス型

use serde::Deserialize;

use crate::prices::RawPoint;

/// `DataActionGetDataPoints` のレスポンス（必要な部分のみ）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPointsResponse {
    #[serde(default)]
    pub data: DataPointsData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPointsData {
    #[serde(rename = "DataPoints", default)]
    pub data_points: DataPointList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPointList {
    #[serde(rename = "List", default)]
    pub list: Vec<RawPoint>,
}

impl DataPointsResponse {
    pub fn into_points(self) -> Vec<RawPoint> {
        self.data.data_points.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_nested_list() {
        let body = r#"{
            "versionInfo": {"hasModuleVersionChanged": false},
            "data": {"DataPoints": {"List": [{"Label": "0", "Value": "0.21"}], "EmptyListItem": {}}}
        }"#;
        let resp: DataPointsResponse = serde_json::from_str(body).unwrap();
        let points = resp.into_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, serde_json::json!("0.21"));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let resp: DataPointsResponse = serde_json::from_str(r#"{"data": {}}"#).unwrap();
        assert!(resp.into_points().is_empty());
        let resp: DataPointsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.into_points().is_empty());
    }
}
