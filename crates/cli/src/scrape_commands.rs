//! `sumariza scrape`: fetch posts and print them as JSON.

use std::{sync::Arc, time::Duration};

use {
    anyhow::{Result, bail},
    sumariza_browser::{
        BrowserConfig, ChromiumBackend, ChromiumSession, SessionSettings, check_and_warn,
    },
    sumariza_config::SumarizaConfig,
    sumariza_extract::Tweet,
    sumariza_scraper::{
        MemoryCache, ScrapeError, ScraperSettings, SelectorStore, TweetPipeline, TweetScraper,
        parse_tweet_url,
    },
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

pub async fn handle_scrape(
    config: &SumarizaConfig,
    urls: &[String],
    timeout_secs: Option<u64>,
    compact: bool,
) -> Result<()> {
    // Reject bad input before starting a browser.
    let targets = urls
        .iter()
        .map(|url| parse_tweet_url(url))
        .collect::<Result<Vec<_>, _>>()?;

    if !check_and_warn(config.browser.chrome_path.as_deref()) {
        bail!("no Chrome/Chromium executable found, see `sumariza doctor`");
    }

    let browser = BrowserConfig::from(&config.browser);
    let session = ChromiumSession::new(
        ChromiumBackend::new(browser.clone()),
        SessionSettings::from(&browser),
    );

    let selectors = Arc::new(SelectorStore::from_optional(
        config.scraper.selectors_path.as_deref(),
    )?);
    let _watcher = if config.scraper.watch_selectors && selectors.path().is_some() {
        selectors
            .watch()
            .map_err(|e| warn!(error = %e, "selector hot reload disabled"))
            .ok()
    } else {
        None
    };

    let scraper = Arc::new(TweetScraper::new(
        session.clone(),
        selectors,
        ScraperSettings::from(&config.scraper),
    ));
    let pipeline = if config.cache.enabled {
        TweetPipeline::new(scraper, Arc::new(MemoryCache::from_config(&config.cache)))
    } else {
        TweetPipeline::uncached(scraper)
    };

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, timeout_secs.map(Duration::from_secs));

    let mut failed = 0usize;
    for (index, (url, target)) in urls.iter().zip(&targets).enumerate() {
        match pipeline.get_ref(target, &cancel).await {
            Ok(tweet) => print_tweet(&tweet, compact)?,
            Err(ScrapeError::Cancelled) => {
                eprintln!("{url}: cancelled");
                failed += targets.len() - index;
                break;
            },
            Err(e) => {
                eprintln!("{url}: {e}");
                failed += 1;
            },
        }
    }

    session.shutdown().await;

    if failed > 0 {
        bail!("{failed} of {} post(s) failed", targets.len());
    }
    Ok(())
}

/// Cancel on Ctrl-C and, if given, after `timeout`.
fn spawn_cancel_triggers(cancel: &CancellationToken, timeout: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    if let Some(timeout) = timeout {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(timeout_secs = timeout.as_secs(), "deadline reached, cancelling");
            on_timeout.cancel();
        });
    }
}

fn print_tweet(tweet: &Tweet, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(tweet)?
    } else {
        serde_json::to_string_pretty(tweet)?
    };
    println!("{json}");
    Ok(())
}
