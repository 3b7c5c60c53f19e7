//! AI tagging: one provider judgment per article, written into the article's
//! filters under a caller-chosen name.

pub mod parse;
pub mod prompt;
pub mod rate_limit;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use nd_core::Judgment;
use nd_progress::{progress_channel, CancellationToken, JobTracker, ProgressSender, ProgressStream};
use nd_storage::{ArticleHandle, ArticleStore};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::TaggingError;
use crate::options::{Credentials, TaggingOptions};
use crate::providers::{JudgmentProvider, ProviderRegistry};

use parse::parse_judgment;
use prompt::Prompt;
use rate_limit::{Clock, RateLimiter, SystemClock};

/// Reason stored for articles the date filter did not accept.
pub const EXCLUDED_REASON: &str = "filtered out by date";

/// What to tag, with what, and where to store it.
#[derive(Debug, Clone)]
pub struct TaggingRequest {
    /// Key the judgments are stored under.
    pub filter_name: String,
    /// The user's natural-language filter.
    pub prompt: String,
    /// Provider name or alias, e.g. `"OpenAI"` or `"Ollama (local)"`.
    pub provider: String,
    pub credentials: Credentials,
}

impl TaggingRequest {
    pub fn new(filter_name: impl Into<String>, prompt: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            filter_name: filter_name.into(),
            prompt: prompt.into(),
            provider: provider.into(),
            credentials: Credentials::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// How one article ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleOutcome {
    Judged { matched: bool, confidence: f32 },
    Failed(TaggingError),
    /// Not eligible; no provider call was made.
    Excluded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaggingReport {
    /// Articles the run considered.
    pub total: usize,
    pub judged: usize,
    pub matched: usize,
    pub failed: usize,
    pub excluded: usize,
    pub cancelled: bool,
}

impl TaggingReport {
    pub fn processed(&self) -> usize {
        self.judged + self.failed + self.excluded
    }
}

type ReadyProvider = Result<(Arc<dyn JudgmentProvider>, Arc<RateLimiter>), TaggingError>;

/// Dispatches tagging runs to registered providers.
///
/// Rate limiters live here, one per provider, so every run and every
/// in-flight request against the same provider shares one schedule.
#[derive(Debug)]
pub struct AiTagger {
    registry: ProviderRegistry,
    options: TaggingOptions,
    clock: Arc<dyn Clock>,
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
}

impl AiTagger {
    pub fn new(options: TaggingOptions) -> Self {
        Self::with_registry(ProviderRegistry::with_defaults(), options)
    }

    pub fn with_registry(registry: ProviderRegistry, options: TaggingOptions) -> Self {
        Self {
            registry,
            options,
            clock: Arc::new(SystemClock),
            limiters: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &TaggingOptions {
        &self.options
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn limiter_for(&self, key: &str, provider: &dyn JudgmentProvider) -> Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::new(provider.min_interval())))
            .clone()
    }

    fn prepare_provider(&self, request: &TaggingRequest) -> ReadyProvider {
        let key = ProviderRegistry::normalize(&request.provider);
        let settings = self.options.settings_for(&key);
        let provider = self.registry.create(&request.provider, &request.credentials, &settings)?;
        let limiter = self.limiter_for(&key, provider.as_ref());
        Ok((provider, limiter))
    }

    /// Tag every store article (up to `max_articles`) and return the tally.
    ///
    /// Ineligible articles get an unknown judgment without a provider call.
    /// Failures become `match: false` judgments and never stop the batch.
    /// Cancellation is honoured before each article starts; judgments that
    /// were already written stay.
    pub async fn run(
        &self,
        store: &ArticleStore,
        request: &TaggingRequest,
        progress: ProgressSender,
        cancel: &CancellationToken,
    ) -> TaggingReport {
        let mut handles = store.handles().await;
        if let Some(cap) = self.options.max_articles {
            handles.truncate(cap);
        }
        let total = handles.len();
        let display_name = self.registry.display_name(&request.provider);

        let provider = self.prepare_provider(request);
        if let Err(e) = &provider {
            tracing::warn!("⚠️ {} unavailable, every eligible article will fail: {}", display_name, e);
        }

        let mut tracker = JobTracker::new(total, progress);
        tracker.start(format!("Tagging {} articles with {}", total, display_name));
        tracing::info!(
            "🏷️ Tagging {} articles as '{}' with {}",
            total,
            request.filter_name,
            display_name
        );

        let mut report = TaggingReport {
            total,
            ..Default::default()
        };

        let provider = &provider;
        let display_name = display_name.as_str();
        // Each future checks cancellation when first polled.
        let pending: Vec<_> = handles
            .into_iter()
            .map(|handle| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.tag_article(&handle, request, display_name, provider).await)
            })
            .collect();
        let mut outcomes = stream::iter(pending).buffer_unordered(self.options.effective_concurrency());

        while let Some(item) = outcomes.next().await {
            let Some((title, outcome)) = item else {
                continue;
            };
            match outcome {
                ArticleOutcome::Judged { matched, confidence } => {
                    report.judged += 1;
                    if matched {
                        report.matched += 1;
                    }
                    let verdict = if matched { "match" } else { "no match" };
                    tracker.complete(title, format!("{} ({:.2})", verdict, confidence));
                }
                ArticleOutcome::Failed(e) => {
                    report.failed += 1;
                    tracker.fail(title, format!("{} error: {}", display_name, e));
                }
                ArticleOutcome::Excluded => {
                    report.excluded += 1;
                    tracker.complete(title, EXCLUDED_REASON);
                }
            }
        }

        if cancel.is_cancelled() && report.processed() < total {
            report.cancelled = true;
            tracker.cancel(format!("Cancelled after {}/{} articles", report.processed(), total));
            tracing::warn!("🛑 Tagging cancelled: {}", tracker.report());
        } else {
            tracker.finish(format!("Tagged {} articles, {} matched", report.judged, report.matched));
            tracing::info!("✨ Tagging finished: {}", tracker.report());
        }

        report
    }

    /// [`AiTagger::run`] on a background task, with a live progress stream
    /// that ends in `Finished` or `Cancelled`.
    pub fn spawn(
        self: Arc<Self>,
        store: Arc<ArticleStore>,
        request: TaggingRequest,
        cancel: CancellationToken,
    ) -> (JoinHandle<TaggingReport>, ProgressStream) {
        let (sender, stream) = progress_channel();
        let handle = tokio::spawn(async move { self.run(&store, &request, sender, &cancel).await });
        (handle, stream)
    }

    async fn tag_article(
        &self,
        handle: &ArticleHandle,
        request: &TaggingRequest,
        display_name: &str,
        provider: &ReadyProvider,
    ) -> (String, ArticleOutcome) {
        let (title, eligible, prompt) = {
            let article = handle.read().await;
            (
                article.title.clone(),
                article.passes_date_filter(),
                Prompt::for_article(&request.prompt, &article),
            )
        };

        if !eligible {
            tracing::debug!("Skipping '{}': {}", title, EXCLUDED_REASON);
            handle
                .write()
                .await
                .set_filter(request.filter_name.as_str(), Judgment::unknown(EXCLUDED_REASON).into());
            return (title, ArticleOutcome::Excluded);
        }

        let result = match provider {
            Ok((provider, limiter)) => self.judge_with_retries(provider.as_ref(), limiter, &prompt).await,
            Err(e) => Err(e.clone()),
        };

        let (judgment, outcome) = match result {
            Ok(judgment) => {
                let outcome = ArticleOutcome::Judged {
                    matched: judgment.matched == Some(true),
                    confidence: judgment.confidence.unwrap_or(0.0),
                };
                (judgment, outcome)
            }
            Err(e) => {
                tracing::warn!("⚠️ {} failed on '{}': {}", display_name, title, e);
                (Judgment::failure(display_name, &e), ArticleOutcome::Failed(e))
            }
        };

        handle
            .write()
            .await
            .set_filter(request.filter_name.as_str(), judgment.into());
        (title, outcome)
    }

    async fn judge_with_retries(
        &self,
        provider: &dyn JudgmentProvider,
        limiter: &RateLimiter,
        prompt: &Prompt,
    ) -> Result<Judgment, TaggingError> {
        let timeout = self.options.request_timeout.get();
        let mut attempt = 0;
        loop {
            limiter.acquire(self.clock.as_ref()).await;

            let answer = match tokio::time::timeout(timeout, provider.judge(prompt)).await {
                Ok(answer) => answer,
                Err(_) => Err(TaggingError::Transport(format!(
                    "no answer within {}",
                    humantime::format_duration(timeout)
                ))),
            };

            match answer.and_then(|raw| parse_judgment(&raw)) {
                Ok(judgment) => return Ok(judgment),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "{} attempt {} failed, retrying: {}",
                        provider.name(),
                        attempt,
                        e
                    );
                    self.clock.sleep(self.options.retry_backoff.get()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Start a tagging run in the background.
pub fn run_ai_tagging(
    tagger: Arc<AiTagger>,
    store: Arc<ArticleStore>,
    request: TaggingRequest,
    cancel: CancellationToken,
) -> (JoinHandle<TaggingReport>, ProgressStream) {
    tagger.spawn(store, request, cancel)
}
