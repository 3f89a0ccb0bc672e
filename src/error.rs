use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("レスポンス取得エラー: {0}")]
    Capture(String),

    #[error("JSONエラー: {0}")]
    Json(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("設定エラー: {0}")]
    Config(String),
}

impl ScraperError {
    /// ブラウザセッション自体の失敗か（実行全体を失敗として扱う）
    pub fn is_session_failure(&self) -> bool {
        matches!(self, Self::BrowserInit(_) | Self::Navigation(_))
    }
}

impl From<serde_json::Error> for ScraperError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_failure_classification() {
        assert!(ScraperError::BrowserInit("launch".into()).is_session_failure());
        assert!(ScraperError::Navigation("timeout".into()).is_session_failure());
        assert!(!ScraperError::Json("eof".into()).is_session_failure());
        assert!(!ScraperError::ElementNotFound("#next".into()).is_session_failure());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: ScraperError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ScraperError::Json(_)));
    }
}
