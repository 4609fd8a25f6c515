//! Chrome/Chromium over CDP (chromiumoxide).

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Page, handler::viewport::Viewport,
    },
    futures::StreamExt,
    tokio::{task::JoinHandle, time::Instant},
    tracing::{debug, info, warn},
};

use crate::{
    detect::{detect_browser, install_instructions},
    error::BrowserError,
    surface::{BrowserBackend, Surface},
    types::BrowserConfig,
};

/// How long a graceful close may take before the process is killed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
/// Poll interval of [`Surface::wait_visible`].
const VISIBILITY_POLL: Duration = Duration::from_millis(100);

/// Launches one local Chromium per session.
pub struct ChromiumBackend {
    config: BrowserConfig,
}

impl ChromiumBackend {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

/// A running browser and the task draining its CDP event stream.
pub struct ChromiumProcess {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    type Process = ChromiumProcess;
    type Surface = Page;

    async fn launch(&self) -> Result<ChromiumProcess, BrowserError> {
        let Some(detected) = detect_browser(self.config.chrome_path.as_deref()) else {
            warn!("{}", install_instructions());
            return Err(BrowserError::BrowserNotAvailable);
        };

        let mut builder = CdpBrowserConfig::builder()
            .chrome_executable(&detected.path)
            .viewport(Viewport {
                width: self.config.viewport_width,
                height: self.config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .request_timeout(self.config.navigation_timeout());

        // chromiumoxide runs headless unless told otherwise
        if !self.config.headless {
            builder = builder.with_head();
        }
        for arg in self.config.launch_args() {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(|e| {
            BrowserError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event error");
                }
            }
            debug!("browser event handler exited (connection closed)");
        });

        info!(
            path = %detected.path.display(),
            source = %detected.source,
            headless = self.config.headless,
            restricted = self.config.restricted,
            "browser launched"
        );

        Ok(ChromiumProcess { browser, handler })
    }

    async fn open_surface(&self, process: &mut ChromiumProcess) -> Result<Page, BrowserError> {
        process
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("failed to open page: {e}")))
    }

    async fn terminate(&self, mut process: ChromiumProcess) {
        let closed = match tokio::time::timeout(CLOSE_TIMEOUT, process.browser.close()).await {
            Ok(Ok(_)) => {
                tokio::time::timeout(CLOSE_TIMEOUT, process.browser.wait())
                    .await
                    .is_ok()
            },
            Ok(Err(e)) => {
                warn!(error = %e, "browser close failed");
                false
            },
            Err(_) => {
                warn!("browser close timed out");
                false
            },
        };

        if !closed && let Some(Err(e)) = process.browser.kill().await {
            warn!(error = %e, "failed to kill browser process");
        }
        process.handler.abort();
        debug!("browser terminated");
    }
}

fn visibility_check_js(selector: &str) -> Result<String, BrowserError> {
    let quoted =
        serde_json::to_string(selector).map_err(|e| BrowserError::InvalidSelector(e.to_string()))?;
    Ok(format!(
        r#"(() => {{
            const el = document.querySelector({quoted});
            if (!el) return false;
            const style = window.getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden') return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        }})()"#
    ))
}

#[async_trait]
impl Surface for Page {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        if selector.trim().is_empty() {
            return Err(BrowserError::InvalidSelector("empty selector".into()));
        }
        let check_js = visibility_check_js(selector)?;
        let deadline = Instant::now() + timeout;

        loop {
            let visible: bool = self
                .evaluate(check_js.as_str())
                .await
                .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?
                .into_value()
                .unwrap_or(false);
            if visible {
                return Ok(());
            }
            if Instant::now() + VISIBILITY_POLL > deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} not visible after {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }

    async fn capture_html(&self) -> Result<String, BrowserError> {
        self.content()
            .await
            .map_err(|e| BrowserError::CaptureFailed(e.to_string()))
    }

    async fn probe(&self) -> bool {
        match self.evaluate("1 + 1").await {
            Ok(result) => result.into_value::<i64>().is_ok_and(|v| v == 2),
            Err(e) => {
                debug!(error = %e, "probe failed");
                false
            },
        }
    }

    async fn reset(&self) -> Result<(), BrowserError> {
        self.goto("about:blank")
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }
}
