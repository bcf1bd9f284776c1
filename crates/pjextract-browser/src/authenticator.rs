//! [`Authenticator`] backed by one headless Chromium for the whole run.

use std::fmt;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::{Stream, StreamExt};
use pjextract_core::{AuthError, AuthSession, Authenticator, Credentials, InstanceId, Progress, Settings};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::login::{self, LoginTimeouts, cdp};

/// Launch options of the browser.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Show the browser window instead of running headless.
    pub headful: bool,
    pub timeouts: LoginTimeouts,
}

/// Logs into instances through a shared browser, one fresh tab per login.
pub struct BrowserAuthenticator {
    browser: Browser,
    handler: JoinHandle<()>,
    settings: Settings,
    timeouts: LoginTimeouts,
}

impl BrowserAuthenticator {
    /// Launch the browser and start driving its DevTools connection.
    pub async fn launch(settings: Settings, options: BrowserOptions) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder();
        if options.headful {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(|e| anyhow::anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            let errors = drive_events(&mut handler).await;
            debug!(errors, "browser connection closed");
        });

        info!(headful = options.headful, "browser launched");
        Ok(Self {
            browser,
            handler,
            settings,
            timeouts: options.timeouts,
        })
    }

    /// Close the browser and wait for its process to exit.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.browser.close().await?;
        self.browser.wait().await?;
        self.handler.abort();
        info!("browser closed");
        Ok(())
    }
}

#[async_trait]
impl Authenticator for BrowserAuthenticator {
    async fn authenticate(
        &self,
        instance: InstanceId,
        credentials: &Credentials,
        progress: &mut dyn Progress,
    ) -> Result<AuthSession, AuthError> {
        let page = self.browser.new_page("about:blank").await.map_err(cdp)?;

        let result = login::log_in(&self.browser, &page, instance, credentials, &self.settings, &self.timeouts, progress).await;

        // The tab is closed whatever the login outcome.
        if let Err(e) = page.close().await {
            warn!(%instance, error = %e, "failed to close login tab");
        }
        result
    }
}

/// Pump DevTools events until the connection closes. Event errors, such as
/// messages this protocol version cannot decode, are logged and skipped.
async fn drive_events<S, E>(events: &mut S) -> usize
where
    S: Stream<Item = Result<(), E>> + Unpin,
    E: fmt::Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            debug!(error = %e, "browser event error");
        }
    }
    errors
}
