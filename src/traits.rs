use async_trait::async_trait;

use crate::error::ScraperError;
use crate::prices::CapturedPayload;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// ブラウザ初期化
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// ページを開いて価格レスポンスを取得（取得順）
    async fn capture(&mut self) -> Result<Vec<CapturedPayload>, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;

    /// 一括実行（initialize → capture → close）。失敗時も close する
    async fn execute(&mut self) -> Result<Vec<CapturedPayload>, ScraperError> {
        let result = match self.initialize().await {
            Ok(()) => self.capture().await,
            Err(e) => Err(e),
        };
        let closed = self.close().await;
        let payloads = result?;
        closed?;
        Ok(payloads)
    }
}
