//! 「次の日」ボタン操作
//!
//! 翌日分は任意。ボタンが見つからない・クリックに失敗した場合も
//! ログを出して false を返すだけで、エラーにはしない。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::Page;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::ScraperError;

const POLL_INTERVAL_MS: u64 = 250;

/// ページ要素の操作
#[async_trait]
pub trait PageActions: Send + Sync {
    async fn is_visible(&self, selector: &str) -> Result<bool, ScraperError>;

    async fn click(&self, selector: &str) -> Result<(), ScraperError>;
}

/// 要素が表示されているか判定するスクリプト
pub fn visibility_script(selector: &str) -> String {
    // serde_json でクォートしてセレクタをJS文字列リテラルにする
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"
        (() => {{
            const elem = document.querySelector({});
            if (!elem) return false;
            const style = window.getComputedStyle(elem);
            const rect = elem.getBoundingClientRect();
            return style.display !== 'none' &&
                   style.visibility !== 'hidden' &&
                   style.opacity !== '0' &&
                   (rect.width > 0 || rect.height > 0);
        }})()
        "#,
        quoted
    )
}

#[async_trait]
impl PageActions for Page {
    async fn is_visible(&self, selector: &str) -> Result<bool, ScraperError> {
        let script = visibility_script(selector);
        let result = self
            .evaluate(script.as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        result
            .into_value::<bool>()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        self.find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?
            .click()
            .await
            .map_err(|e| ScraperError::JavaScript(format!("click {}: {}", selector, e)))?;
        Ok(())
    }
}

/// `wait` 以内に表示されたセレクタを返す。先頭のセレクタを優先
pub async fn find_visible<P>(page: &P, selectors: &[String], wait: Duration) -> Option<String>
where
    P: PageActions + ?Sized,
{
    let start = Instant::now();

    loop {
        for selector in selectors {
            match page.is_visible(selector).await {
                Ok(true) => return Some(selector.clone()),
                Ok(false) => debug!("Selector not visible: {}", selector),
                Err(e) => warn!("Visibility check failed for {}: {}", selector, e),
            }
        }

        if start.elapsed() >= wait {
            return None;
        }
        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

/// 「次の日」ボタンを探す。`wait` 以内に見つからなければ None
pub async fn find_next_day<P>(page: &P, selectors: &[String], wait: Duration) -> Option<String>
where
    P: PageActions + ?Sized,
{
    let found = find_visible(page, selectors, wait).await;
    if found.is_none() {
        info!("Next button not found or not visible.");
    }
    found
}

/// 見つけた「次の日」ボタンをクリック。クリックできたら true
pub async fn click_next_day<P>(page: &P, selector: &str) -> bool
where
    P: PageActions + ?Sized,
{
    info!("Clicking next button using selector: {}", selector);
    match page.click(selector).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not click next button: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakePage {
        visible: HashSet<String>,
        broken_click: bool,
        clicked: Mutex<Vec<String>>,
    }

    impl FakePage {
        fn with_visible(selectors: &[&str]) -> Self {
            Self {
                visible: selectors.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PageActions for FakePage {
        async fn is_visible(&self, selector: &str) -> Result<bool, ScraperError> {
            if selector == "!error" {
                return Err(ScraperError::JavaScript("evaluate failed".into()));
            }
            Ok(self.visible.contains(selector))
        }

        async fn click(&self, selector: &str) -> Result<(), ScraperError> {
            if self.broken_click {
                return Err(ScraperError::ElementNotFound(selector.to_string()));
            }
            self.clicked.lock().unwrap().push(selector.to_string());
            Ok(())
        }
    }

    fn selectors() -> Vec<String> {
        vec![".arrow-container:has(.fa-angle-right)".into(), "#b1-b3-b1-Next".into()]
    }

    async fn advance(page: &FakePage, wait: Duration) -> bool {
        match find_next_day(page, &selectors(), wait).await {
            Some(selector) => click_next_day(page, &selector).await,
            None => false,
        }
    }

    #[tokio::test]
    async fn test_primary_selector_preferred() {
        let page = FakePage::with_visible(&[
            ".arrow-container:has(.fa-angle-right)",
            "#b1-b3-b1-Next",
        ]);
        assert!(advance(&page, Duration::ZERO).await);
        assert_eq!(
            *page.clicked.lock().unwrap(),
            vec![".arrow-container:has(.fa-angle-right)".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fallback_selector() {
        let page = FakePage::with_visible(&["#b1-b3-b1-Next"]);
        assert!(advance(&page, Duration::ZERO).await);
        assert_eq!(*page.clicked.lock().unwrap(), vec!["#b1-b3-b1-Next".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_control_is_not_an_error() {
        let page = FakePage::default();
        assert!(!advance(&page, Duration::from_millis(300)).await);
        assert!(page.clicked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_click_failure_is_swallowed() {
        let page = FakePage {
            broken_click: true,
            ..FakePage::with_visible(&["#b1-b3-b1-Next"])
        };
        assert!(!advance(&page, Duration::ZERO).await);
    }

    #[tokio::test]
    async fn test_visibility_error_falls_through() {
        let page = FakePage::with_visible(&["#b1-b3-b1-Next"]);
        let selectors = vec!["!error".to_string(), "#b1-b3-b1-Next".to_string()];
        assert_eq!(
            find_visible(&page, &selectors, Duration::ZERO).await,
            Some("#b1-b3-b1-Next".to_string())
        );
    }

    #[test]
    fn test_visibility_script_quotes_selector() {
        let script = visibility_script(r#"a[title="next"]"#);
        assert!(script.contains(r#"document.querySelector("a[title=\"next\"]")"#));
    }
}
