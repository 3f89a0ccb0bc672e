//! データアクションのレスポンス監視
//!
//! ナビゲーション前に [`ResponseListener::attach`] すること。
//! 後から付けるとページ読み込み時の取得を取りこぼす。

use std::collections::HashMap;

use base64::Engine;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, GetResponseBodyParams,
    RequestId,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ScraperError;
use crate::prices::CapturedPayload;

use super::types::DataPointsResponse;

/// 対象のデータアクション（POST）か
pub fn is_relevant(url: &str, method: &str, action: &str) -> bool {
    url.contains(action) && method.eq_ignore_ascii_case("POST")
}

/// レスポンスボディを解析。データポイントが1件以上あれば取得対象
pub fn inspect_body(body: &str) -> Result<Option<CapturedPayload>, ScraperError> {
    let resp: DataPointsResponse = serde_json::from_str(body)?;
    let points = resp.into_points();
    if points.is_empty() {
        return Ok(None);
    }
    Ok(Some(CapturedPayload::new(points)))
}

/// レスポンス監視タスク。drop で停止
pub struct ResponseListener {
    task: JoinHandle<()>,
}

impl ResponseListener {
    /// ページのネットワークイベントを購読し、取得した価格レスポンスを `tx` に送る
    pub async fn attach(
        page: &Page,
        action: impl Into<String>,
        tx: UnboundedSender<CapturedPayload>,
    ) -> Result<Self, ScraperError> {
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        let page = page.clone();
        let action = action.into();

        let task = tokio::spawn(async move {
            // request_id -> URL
            let mut pending: HashMap<String, String> = HashMap::new();

            loop {
                tokio::select! {
                    // リクエスト登録を完了通知より先に処理する
                    biased;

                    Some(event) = requests.next() => {
                        if is_relevant(&event.request.url, &event.request.method, &action) {
                            debug!("Data action request: {}", event.request.url);
                            pending.insert(
                                event.request_id.inner().clone(),
                                event.request.url.clone(),
                            );
                        }
                    }
                    Some(event) = finished.next() => {
                        let Some(url) = pending.remove(event.request_id.inner()) else {
                            continue;
                        };
                        let body = match fetch_body(&page, event.request_id.clone()).await {
                            Ok(body) => body,
                            Err(e) => {
                                warn!("Error reading response body from {}: {}", url, e);
                                continue;
                            }
                        };
                        match inspect_body(&body) {
                            Ok(Some(payload)) => {
                                info!("Intercepted energy prices from: {}", url);
                                if tx.send(payload).is_err() {
                                    break;
                                }
                            }
                            Ok(None) => debug!("Data action response without data points: {}", url),
                            Err(e) => warn!("Error parsing JSON from {}: {}", url, e),
                        }
                    }
                    Some(event) = failed.next() => {
                        if let Some(url) = pending.remove(event.request_id.inner()) {
                            warn!("Data action request failed: {} ({})", url, event.error_text);
                        }
                    }
                    else => break,
                }
            }
        });

        Ok(Self { task })
    }
}

impl Drop for ResponseListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn fetch_body(page: &Page, request_id: RequestId) -> Result<String, ScraperError> {
    let resp = page
        .execute(GetResponseBodyParams::new(request_id))
        .await
        .map_err(|e| ScraperError::Capture(e.to_string()))?;
    let body = resp.result;

    if !body.base64_encoded {
        return Ok(body.body);
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.body.as_bytes())
        .map_err(|e| ScraperError::Capture(format!("base64: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ScraperError::Capture(format!("utf-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTION: &str = "DataActionGetDataPoints";

    #[test]
    fn test_relevance_needs_action_and_post() {
        let url = concat!(
            "https://mijn.nextenergy.nl/Website_CW/screenservices/",
            "Website_CW/MarketPrices/DataActionGetDataPoints"
        );
        assert!(is_relevant(url, "POST", ACTION));
        assert!(is_relevant(url, "post", ACTION));
        assert!(!is_relevant(url, "GET", ACTION));
        assert!(!is_relevant(
            "https://mijn.nextenergy.nl/Website_CW/scripts/app.js",
            "POST",
            ACTION
        ));
    }

    #[test]
    fn test_inspect_usable_body() {
        let body = r#"{"data": {"DataPoints": {"List": [
            {"Label": 0, "Value": "50.5"}, {"Label": 23, "Value": "60.1"}
        ]}}}"#;
        let payload = inspect_body(body).unwrap().unwrap();
        assert_eq!(payload.points.len(), 2);
    }

    #[test]
    fn test_inspect_empty_list_is_not_usable() {
        let body = r#"{"data": {"DataPoints": {"List": []}}}"#;
        assert!(inspect_body(body).unwrap().is_none());
    }

    #[test]
    fn test_inspect_invalid_json_is_error() {
        let err = inspect_body("<html>Session expired</html>").unwrap_err();
        assert!(matches!(err, ScraperError::Json(_)));
    }
}
