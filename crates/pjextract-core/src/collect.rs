//! Paginated collection of one (instance, category) pair.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::PageFetchError;
use crate::model::{AuthSession, Category, InstanceId, ProcessRecord};
use crate::progress::Progress;
use crate::settings::Settings;

/// Fetches one page of a panel listing.
///
/// An empty vector means the listing is exhausted.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        session: &AuthSession,
        instance: InstanceId,
        category: Category,
        page: u32,
    ) -> Result<Vec<ProcessRecord>, PageFetchError>;
}

/// How a pagination run ended.
#[derive(Debug)]
pub enum StopReason {
    /// An empty page arrived.
    Exhausted,
    /// A request failed; records gathered before it are kept.
    Failed(PageFetchError),
    /// `max_pages` non-empty pages were fetched without reaching the end.
    PageLimit,
}

/// Records of one pagination run plus how it ended.
#[derive(Debug)]
pub struct Collected {
    pub records: Vec<ProcessRecord>,
    /// Number of requests issued.
    pub requests: u32,
    pub stop: StopReason,
}

impl Collected {
    pub fn is_complete(&self) -> bool {
        matches!(self.stop, StopReason::Exhausted)
    }
}

/// Page through a panel listing until an empty page, a failure, or the page
/// cap. Failures never propagate: the partial accumulation is returned.
pub async fn collect(
    source: &dyn PageSource,
    session: &AuthSession,
    instance: InstanceId,
    category: Category,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> Collected {
    let mut records = Vec::new();
    let mut requests = 0u32;
    let mut page = 1u32;

    info!(%instance, %category, "starting extraction");
    progress.message(&format!("Iniciando extração de '{category}' do {instance}..."));

    let stop = loop {
        if page > settings.max_pages {
            warn!(%instance, %category, max_pages = settings.max_pages, "page cap reached, stopping");
            progress.warning(&format!(
                "Limite de {} páginas atingido para '{category}' do {instance}.",
                settings.max_pages
            ));
            break StopReason::PageLimit;
        }

        requests += 1;
        match source.fetch_page(session, instance, category, page).await {
            Ok(batch) if batch.is_empty() => {
                info!(%instance, %category, total = records.len(), "extraction finished");
                break StopReason::Exhausted;
            }
            Ok(batch) => {
                debug!(%instance, %category, page, count = batch.len(), "page fetched");
                records.extend(batch);
                progress.page_fetched(instance, category, page, records.len());
                page += 1;
                if !settings.page_delay.is_zero() {
                    tokio::time::sleep(settings.page_delay).await;
                }
            }
            Err(e) => {
                warn!(%instance, %category, page, error = %e, "page fetch failed, keeping partial results");
                progress.warning(&format!(
                    "Erro na página {page} de '{category}' ({e}). Parando extração para o {instance}."
                ));
                break StopReason::Failed(e);
            }
        }
    };

    progress.category_finished(instance, category, records.len());
    Collected {
        records,
        requests,
        stop,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use crate::progress::NullProgress;

    /// What a fake page request answers.
    #[derive(Clone)]
    pub(crate) enum Reply {
        Records(usize),
        Status(u16),
        Transport,
    }

    /// Scripted page source keyed by (instance, category); pages past the
    /// script are empty.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        scripts: HashMap<(u8, u8), Vec<Reply>>,
        pub(crate) calls: Mutex<Vec<(u8, u8, u32)>>,
    }

    impl ScriptedSource {
        pub(crate) fn with(mut self, instance: u8, category: Category, replies: Vec<Reply>) -> Self {
            self.scripts.insert((instance, category.remote_code()), replies);
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(
            &self,
            _session: &AuthSession,
            instance: InstanceId,
            category: Category,
            page: u32,
        ) -> Result<Vec<ProcessRecord>, PageFetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((instance.get(), category.remote_code(), page));
            let reply = self
                .scripts
                .get(&(instance.get(), category.remote_code()))
                .and_then(|s| s.get(page as usize - 1).cloned())
                .unwrap_or(Reply::Records(0));
            match reply {
                Reply::Records(n) => Ok((0..n)
                    .map(|i| {
                        serde_json::from_value(json!({
                            "numeroProcesso": format!("{}-{}-{page}-{i}", instance.get(), category.remote_code()),
                        }))
                        .unwrap()
                    })
                    .collect()),
                Reply::Status(status) => Err(PageFetchError::Status {
                    status,
                    body: "Internal Server Error".into(),
                }),
                Reply::Transport => Err(PageFetchError::Transport("connection reset".into())),
            }
        }
    }

    pub(crate) fn session() -> AuthSession {
        AuthSession {
            cookie_header: "a=b".into(),
            csrf_token: "csrf".into(),
            panel_id: "1".into(),
        }
    }

    pub(crate) fn fast_settings() -> Settings {
        Settings {
            page_delay: Duration::ZERO,
            instance_delay: Duration::ZERO,
            ..Settings::default()
        }
    }

    fn trt(n: u8) -> InstanceId {
        InstanceId::new(n).unwrap()
    }

    #[tokio::test]
    async fn stops_on_first_empty_page() {
        let source = ScriptedSource::default().with(
            1,
            Category::General,
            vec![Reply::Records(100), Reply::Records(100), Reply::Records(37), Reply::Records(0)],
        );
        let out = collect(
            &source,
            &session(),
            trt(1),
            Category::General,
            &fast_settings(),
            &mut NullProgress,
        )
        .await;

        assert_eq!(out.records.len(), 237);
        assert_eq!(out.requests, 4);
        assert!(out.is_complete());
        let pages: Vec<u32> = source.calls.lock().unwrap().iter().map(|c| c.2).collect();
        assert_eq!(pages, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn server_error_keeps_partial_results() {
        let source = ScriptedSource::default().with(
            1,
            Category::General,
            vec![Reply::Records(50), Reply::Status(500), Reply::Records(100)],
        );
        let out = collect(
            &source,
            &session(),
            trt(1),
            Category::General,
            &fast_settings(),
            &mut NullProgress,
        )
        .await;

        assert_eq!(out.records.len(), 50);
        assert_eq!(source.call_count(), 2);
        assert!(matches!(
            out.stop,
            StopReason::Failed(PageFetchError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn transport_error_on_first_page_yields_nothing() {
        let source =
            ScriptedSource::default().with(3, Category::Archived, vec![Reply::Transport]);
        let out = collect(
            &source,
            &session(),
            trt(3),
            Category::Archived,
            &fast_settings(),
            &mut NullProgress,
        )
        .await;

        assert!(out.records.is_empty());
        assert!(matches!(out.stop, StopReason::Failed(PageFetchError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_after_each_non_empty_page() {
        let source = ScriptedSource::default().with(
            1,
            Category::General,
            vec![Reply::Records(100), Reply::Records(100), Reply::Records(37)],
        );
        let settings = Settings::default();
        let start = tokio::time::Instant::now();
        let out = collect(&source, &session(), trt(1), Category::General, &settings, &mut NullProgress).await;

        // Three non-empty pages, no pause after the terminating empty page.
        let elapsed = start.elapsed();
        assert_eq!(out.requests, 4);
        assert!(elapsed >= settings.page_delay * 3, "{elapsed:?}");
        assert!(elapsed < settings.page_delay * 3 + Duration::from_millis(50), "{elapsed:?}");
    }

    #[tokio::test]
    async fn page_cap_bounds_endless_listing() {
        let source = ScriptedSource::default().with(
            1,
            Category::General,
            vec![Reply::Records(1); 10],
        );
        let settings = Settings {
            max_pages: 3,
            ..fast_settings()
        };
        let out = collect(
            &source,
            &session(),
            trt(1),
            Category::General,
            &settings,
            &mut NullProgress,
        )
        .await;

        assert_eq!(out.records.len(), 3);
        assert_eq!(source.call_count(), 3);
        assert!(matches!(out.stop, StopReason::PageLimit));
    }

    #[tokio::test]
    async fn records_arrive_in_page_order() {
        let source = ScriptedSource::default().with(
            2,
            Category::General,
            vec![Reply::Records(2), Reply::Records(1)],
        );
        let out = collect(
            &source,
            &session(),
            trt(2),
            Category::General,
            &fast_settings(),
            &mut NullProgress,
        )
        .await;

        let numbers: Vec<&str> = out
            .records
            .iter()
            .map(|r| r.get("numeroProcesso").and_then(|v| v.as_str()).unwrap())
            .collect();
        assert_eq!(numbers, ["2-1-1-0", "2-1-1-1", "2-1-2-0"]);
    }
}
