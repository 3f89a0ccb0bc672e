//! NextEnergy 市場価格スクレイパー実装
//!
//! 価格ページを開き、ページ自身が発行するデータアクションの
//! レスポンスを横取りする。「次の日」ボタンを1回押して翌日分も取得する。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::prices::CapturedPayload;
use crate::traits::Scraper;

use super::listener::ResponseListener;
use super::pagination::{self, PageActions};

/// ネットワークアイドル待機のタイムアウト（ミリ秒）
const NETWORK_IDLE_TIMEOUT_MS: u64 = 30000;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;

pub struct NextEnergyScraper {
    config: ScraperConfig,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    user_data_dir: Option<PathBuf>,
}

impl NextEnergyScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: None,
            handler: None,
            user_data_dir: None,
        }
    }

    fn browser_config(&self, user_data_dir: &Path) -> Result<BrowserConfig, ScraperError> {
        // Chrome パスを取得
        let chrome_path =
            resolve_chrome_path(self.config.chrome_path.as_deref(), |key| std::env::var(key).ok());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(user_data_dir);

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(self.config.timeout)
            .arg(format!("--user-agent={}", self.config.user_agent))
            .arg(format!("--lang={}", self.config.locale))
            .arg(format!("--accept-lang={}", self.config.locale))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if self.config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        builder.build().map_err(ScraperError::BrowserInit)
    }

    fn browser(&self) -> Result<&Browser, ScraperError> {
        self.browser
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("Browser not initialized".to_string()))
    }

    /// ネットワークリクエストがアイドル状態になるまで待機
    async fn wait_request_idle(&self, page: &Page) {
        info!("Waiting for network to become idle...");
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(NETWORK_IDLE_TIMEOUT_MS);

        // Performance API で近い時刻に始まった未完了リソースを数える。
        // 一瞬の空きで抜けないよう、連続してアイドルと判定されるまで待つ
        let mut idle_count = 0;
        const REQUIRED_IDLE_CHECKS: u32 = 3; // 連続3回アイドルでOK

        while start.elapsed() < timeout {
            let result = page
                .evaluate(
                    r#"
                    (() => {
                        // 500ms 以内に開始して duration がまだ 0 のものを通信中とみなす
                        const entries = performance.getEntriesByType('resource');
                        const now = performance.now();
                        const recentRequests = entries.filter(e => {
                            return (now - e.startTime) < 500 && e.duration === 0;
                        });
                        // 読み込み完了前はアイドル扱いしない
                        return recentRequests.length === 0
                            && document.readyState === 'complete';
                    })()
                "#,
                )
                .await;

            match result {
                Ok(val) => {
                    if val.into_value::<bool>().unwrap_or(false) {
                        idle_count += 1;
                        if idle_count >= REQUIRED_IDLE_CHECKS {
                            info!(
                                "Network idle after {:?} ({} consecutive checks)",
                                start.elapsed(),
                                idle_count
                            );
                            return;
                        }
                    } else {
                        idle_count = 0;
                    }
                }
                Err(e) => {
                    debug!("Network idle check error: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!(
            "Network idle timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
    }

    /// デバッグスクリーンショット
    async fn debug_screenshot(&self, page: &Page, label: &str) {
        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!("{} screenshot: data:image/png;base64,{}", label, encoded);
            }
            Err(e) => debug!("Failed to take {} screenshot: {}", label, e),
        }
    }
}

/// Chrome 実行ファイルのパス。設定値、`CHROME_PATH`、`CHROMIUM_PATH` の順に探す
fn resolve_chrome_path(
    configured: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    configured
        .map(Path::to_path_buf)
        .or_else(|| {
            ["CHROME_PATH", "CHROMIUM_PATH"]
                .iter()
                .filter_map(|key| lookup(key))
                .find(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("chromium"))
}

/// 受信済みのレスポンスをすべて回収。回収件数を返す
fn drain_pending(
    rx: &mut UnboundedReceiver<CapturedPayload>,
    payloads: &mut Vec<CapturedPayload>,
) -> usize {
    let before = payloads.len();
    while let Ok(payload) = rx.try_recv() {
        payloads.push(payload);
    }
    payloads.len() - before
}

/// 読み込み後のレスポンスを集め、「次の日」を押して翌日分を待つ
///
/// クリック前に受信済みの分を回収しておくので、クリック後の待機は
/// クリックで発行されたレスポンスでしか満たされない。
/// 戻り値は取得順のレスポンスと、クリックできたかどうか。
pub async fn collect_day_payloads<P>(
    page: &P,
    rx: &mut UnboundedReceiver<CapturedPayload>,
    selectors: &[String],
    pagination_wait: Duration,
    settle_timeout: Duration,
) -> (Vec<CapturedPayload>, bool)
where
    P: PageActions + ?Sized,
{
    let mut payloads = Vec::new();
    wait_for_capture(rx, settle_timeout, &mut payloads).await;

    info!("Clicking 'Next' for tomorrow's prices...");
    let clicked = match pagination::find_next_day(page, selectors, pagination_wait).await {
        Some(selector) => {
            let late = drain_pending(rx, &mut payloads);
            if late > 0 {
                debug!("Collected {} response(s) before pagination", late);
            }
            pagination::click_next_day(page, &selector).await
        }
        None => false,
    };

    if clicked {
        wait_for_capture(rx, settle_timeout, &mut payloads).await;
    }

    // 待機中に届いた残りを回収
    drain_pending(rx, &mut payloads);
    (payloads, clicked)
}

/// `timeout` 以内にレスポンスが1件届くのを待つ。届けば true
pub async fn wait_for_capture(
    rx: &mut UnboundedReceiver<CapturedPayload>,
    timeout: Duration,
    payloads: &mut Vec<CapturedPayload>,
) -> bool {
    match tokio::time::timeout(timeout, rx.recv()).await {
        Ok(Some(payload)) => {
            payloads.push(payload);
            true
        }
        Ok(None) => false,
        Err(_) => {
            debug!("No data action response within {:?}", timeout);
            false
        }
    }
}

#[async_trait]
impl Scraper for NextEnergyScraper {
    async fn initialize(&mut self) -> Result<(), ScraperError> {
        info!("Launching browser...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("price-scraper-{}", unique_id));
        self.user_data_dir = Some(user_data_dir.clone());

        let browser_config = self.browser_config(&user_data_dir)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ハンドラータスクを起動
        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        }));

        self.browser = Some(browser);
        info!("Browser initialized successfully");
        Ok(())
    }

    async fn capture(&mut self) -> Result<Vec<CapturedPayload>, ScraperError> {
        let page = self
            .browser()?
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ナビゲーション前に監視を開始
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener =
            ResponseListener::attach(&page, self.config.action_identifier.as_str(), tx).await?;

        info!("Navigating to {}...", self.config.url);
        page.goto(self.config.url.as_str())
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.wait_request_idle(&page).await;

        let (payloads, clicked) = collect_day_payloads(
            &page,
            &mut rx,
            &self.config.next_day_selectors,
            self.config.pagination_wait,
            self.config.settle_timeout,
        )
        .await;

        if !clicked && self.config.debug {
            self.debug_screenshot(&page, "Pagination").await;
        }
        drop(listener);

        info!("Captured {} data action response(s)", payloads.len());

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        Ok(payloads)
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        if let Some(mut browser) = self.browser.take() {
            info!("Closing browser...");
            if let Err(e) = browser.close().await {
                debug!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Failed to wait for browser exit: {}", e);
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        if let Some(dir) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                debug!("Failed to remove user data dir {:?}: {}", dir, e);
            }
        }

        Ok(())
    }
}
