//! Scan Orchestrator
//!
//! Runs the periodic scan loop: list candidates, drop the ones still in
//! cooldown, fetch metrics for the rest, evaluate, and notify qualified
//! tokens once. The orchestrator is the only writer of the cooldown store,
//! which it owns by value.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::alert::render_alert;
use super::retry::{RetryError, RetryPolicy};
use super::shutdown::ShutdownSignal;
use crate::domain::report::{
    OUTCOME_ALERTED, OUTCOME_FETCH_ERROR, OUTCOME_NOTIFY_FAILED, OUTCOME_SUPPRESSED,
};
use crate::domain::{
    evaluate, AlertRecord, CandidateKey, CooldownStore, CycleReport, EvaluationResult,
    Thresholds, TokenCandidate, TokenMetrics,
};
use crate::ports::{
    ChainDataPort, Clock, MarketDataError, MarketDataPort, NoopJournal, NotifierPort,
    ScanJournal, SystemClock,
};

/// Top holders kept in the alert journal
const JOURNALED_HOLDERS: usize = 5;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Candidate listing failed: {0}")]
    Listing(RetryError<MarketDataError>),

    #[error("Cycle interrupted by shutdown")]
    Cancelled,
}

impl CycleError {
    /// The provider rejected our credentials while listing
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            CycleError::Listing(RetryError::Fatal {
                error: MarketDataError::Unauthorized(_),
                ..
            })
        )
    }
}

/// Where the orchestrator is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Fetching,
    Evaluating,
    Notifying,
    Sleeping,
    Stopped,
}

/// Timing and concurrency settings for the scan loop
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    /// Target period of one cycle
    pub seconds_between_scans: u64,
    /// Cooldown after a successful alert
    pub seconds_to_ignore_after_signal: u64,
    /// Cooldown after a fatal metrics failure (0 disables)
    pub seconds_to_ignore_after_error: u64,
    /// Pause after a failed cycle
    pub seconds_to_sleep_on_error: u64,
    /// Metric fetches allowed in flight at once
    pub max_concurrent_fetches: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            seconds_between_scans: 30,
            seconds_to_ignore_after_signal: 60,
            seconds_to_ignore_after_error: 300,
            seconds_to_sleep_on_error: 60,
            max_concurrent_fetches: 4,
        }
    }
}

/// Status snapshot of the orchestrator
#[derive(Debug, Clone)]
pub struct ScanStatus {
    pub state: ScanState,
    pub cycles_completed: u64,
    pub active_cooldowns: usize,
    pub last_report: Option<CycleReport>,
}

/// Periodic scanner over a market data source
pub struct ScanOrchestrator {
    market: Arc<dyn MarketDataPort>,
    chain: Option<Arc<dyn ChainDataPort>>,
    notifier: Arc<dyn NotifierPort>,
    journal: Arc<dyn ScanJournal>,
    clock: Arc<dyn Clock>,
    thresholds: Thresholds,
    settings: ScanSettings,
    retry: RetryPolicy,
    cooldowns: CooldownStore,
    cooldown_path: Option<PathBuf>,
    shutdown: ShutdownSignal,
    state: ScanState,
    cycles_completed: u64,
    last_report: Option<CycleReport>,
}

impl ScanOrchestrator {
    /// Create an orchestrator with an empty in-memory cooldown store
    pub fn new(
        market: Arc<dyn MarketDataPort>,
        notifier: Arc<dyn NotifierPort>,
        thresholds: Thresholds,
        settings: ScanSettings,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            market,
            chain: None,
            notifier,
            journal: Arc::new(NoopJournal),
            clock: Arc::new(SystemClock),
            thresholds,
            settings,
            retry: RetryPolicy::default(),
            cooldowns: CooldownStore::new(),
            cooldown_path: None,
            shutdown,
            state: ScanState::Idle,
            cycles_completed: 0,
            last_report: None,
        }
    }

    /// Enrich qualified tokens with on-chain data
    pub fn with_chain_data(mut self, chain: Arc<dyn ChainDataPort>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_journal(mut self, journal: Arc<dyn ScanJournal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start from a loaded cooldown store, flushing it to `path` after each change
    pub fn with_cooldowns(mut self, cooldowns: CooldownStore, path: Option<PathBuf>) -> Self {
        self.cooldowns = cooldowns;
        self.cooldown_path = path;
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn cooldowns(&self) -> &CooldownStore {
        &self.cooldowns
    }

    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            state: self.state,
            cycles_completed: self.cycles_completed,
            active_cooldowns: self.cooldowns.len(),
            last_report: self.last_report.clone(),
        }
    }

    /// Run cycles until shutdown.
    ///
    /// Failed cycles are logged and retried after the error pause. An
    /// unauthorized listing on the first cycle is returned instead.
    pub async fn run(&mut self) -> Result<(), CycleError> {
        tracing::info!(
            "Starting scanner - interval: {}s, signal cooldown: {}s, max concurrent fetches: {}",
            self.settings.seconds_between_scans,
            self.settings.seconds_to_ignore_after_signal,
            self.settings.max_concurrent_fetches
        );

        let mut first_cycle = true;
        while !self.shutdown.is_triggered() {
            let started = tokio::time::Instant::now();
            let result = self.run_cycle().await;
            let was_first = std::mem::replace(&mut first_cycle, false);

            let pause = match result {
                Ok(report) => {
                    let period = Duration::from_secs(self.settings.seconds_between_scans);
                    let pause = period.saturating_sub(started.elapsed());
                    tracing::info!(
                        "Finished cycle scan ({} candidates, {:?}), sleeping for {:.2}s",
                        report.candidates,
                        report.tallies,
                        pause.as_secs_f64()
                    );
                    pause
                }
                Err(CycleError::Cancelled) => break,
                Err(e) if was_first && e.is_unauthorized() => {
                    tracing::error!("First scan cycle was refused, stopping: {}", e);
                    self.state = ScanState::Stopped;
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(
                        "Ran into the following error while executing scan: {}, sleeping for {}s",
                        e,
                        self.settings.seconds_to_sleep_on_error
                    );
                    Duration::from_secs(self.settings.seconds_to_sleep_on_error)
                }
            };

            self.state = ScanState::Sleeping;
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.shutdown.triggered() => break,
            }
        }

        self.state = ScanState::Stopped;
        tracing::info!("Scanner stopped after {} cycles", self.cycles_completed);
        Ok(())
    }

    /// Execute one scan cycle
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let now = self.clock.now();
        let pruned = self.cooldowns.prune(now);
        if pruned > 0 {
            tracing::debug!("Pruned {} expired cooldowns", pruned);
        }

        self.state = ScanState::Fetching;
        let market = self.market.clone();
        let listing = self
            .retry
            .execute(&self.shutdown, || market.list_candidates())
            .await;
        let listed = match listing {
            Ok(candidates) => candidates,
            Err(RetryError::Cancelled { .. }) => {
                self.state = ScanState::Idle;
                return Err(CycleError::Cancelled);
            }
            Err(e) => {
                self.state = ScanState::Idle;
                return Err(CycleError::Listing(e));
            }
        };

        let mut report = CycleReport::new(now);
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for candidate in listed {
            let key = candidate.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            report.candidates += 1;
            if self.cooldowns.is_suppressed(&key, now) {
                tracing::debug!("Token {} is ignorable", key);
                report.tally(OUTCOME_SUPPRESSED);
                continue;
            }
            pending.push(candidate);
        }

        tracing::info!(
            "Fetched {} candidates, {} to evaluate",
            report.candidates,
            pending.len()
        );

        let fetched = self.fetch_all(&pending).await;

        let mut cancelled = false;
        for (candidate, result) in pending.iter().zip(fetched) {
            let metrics = match result {
                Some(Ok(metrics)) => metrics,
                Some(Err(RetryError::Cancelled { .. })) => {
                    cancelled = true;
                    break;
                }
                Some(Err(e)) => {
                    self.handle_fetch_failure(candidate, &e);
                    report.tally(OUTCOME_FETCH_ERROR);
                    continue;
                }
                None => {
                    tracing::error!("Metrics task for {} did not complete", candidate.key());
                    report.tally(OUTCOME_FETCH_ERROR);
                    continue;
                }
            };

            self.state = ScanState::Evaluating;
            let outcome = self.process_candidate(candidate, metrics).await;
            report.tally(outcome);

            if self.shutdown.is_triggered() {
                cancelled = true;
                break;
            }
        }

        report.finished_at = self.clock.now();
        if let Err(e) = self.journal.record_cycle(&report) {
            tracing::warn!("Failed to record scan report: {}", e);
        }

        self.state = ScanState::Idle;
        if cancelled {
            return Err(CycleError::Cancelled);
        }

        self.cycles_completed += 1;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Fetch and evaluate one candidate without notifying or touching cooldowns
    pub async fn evaluate_candidate(
        &self,
        candidate: &TokenCandidate,
    ) -> Result<EvaluationResult, RetryError<MarketDataError>> {
        let metrics = self
            .retry
            .execute(&self.shutdown, || self.market.fetch_metrics(candidate))
            .await?;
        Ok(evaluate(&metrics, &self.thresholds))
    }

    /// Fetch metrics for every candidate, bounded by `max_concurrent_fetches`.
    /// Results come back in input order; `None` marks a task that panicked.
    async fn fetch_all(
        &self,
        candidates: &[TokenCandidate],
    ) -> Vec<Option<Result<TokenMetrics, RetryError<MarketDataError>>>> {
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrent_fetches.max(1)));
        let mut tasks = JoinSet::new();

        for (index, candidate) in candidates.iter().cloned().enumerate() {
            let market = self.market.clone();
            let retry = self.retry.clone();
            let shutdown = self.shutdown.clone();
            let permits = permits.clone();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = retry
                    .execute(&shutdown, || market.fetch_metrics(&candidate))
                    .await;
                (index, result)
            });
        }

        let mut results: Vec<Option<_>> = (0..candidates.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!("Metrics task failed: {}", e),
            }
        }
        results
    }

    fn handle_fetch_failure(&mut self, candidate: &TokenCandidate, error: &RetryError<MarketDataError>) {
        let key = candidate.key();
        tracing::warn!(
            "Failed to fetch metrics for {} after {} attempts: {}",
            key,
            error.attempts(),
            error
        );

        if error.is_fatal() && self.settings.seconds_to_ignore_after_error > 0 {
            let ttl = Duration::from_secs(self.settings.seconds_to_ignore_after_error);
            self.cooldowns.suppress(key, self.clock.now(), ttl);
            self.persist_cooldowns();
        }
    }

    /// Evaluate one candidate and notify if it qualifies. Returns the report label.
    async fn process_candidate(
        &mut self,
        candidate: &TokenCandidate,
        metrics: TokenMetrics,
    ) -> &'static str {
        let key = candidate.key();
        let (metrics, outlier) = match evaluate(&metrics, &self.thresholds) {
            EvaluationResult::Qualified { metrics, outlier } => (metrics, outlier),
            EvaluationResult::Rejected(rejection) => {
                tracing::info!(
                    "Token {} rejected: {} (observed {:.2})",
                    key,
                    rejection.criterion,
                    rejection.observed
                );
                return rejection.criterion.label();
            }
            EvaluationResult::Inconclusive(reason) => {
                tracing::info!("Token {} inconclusive: {}", key, reason);
                return "inconclusive";
            }
        };

        tracing::info!(
            "Token {} qualified: latest buy activity {:.2} above threshold {:.2}",
            key,
            outlier.latest,
            outlier.threshold
        );

        self.state = ScanState::Notifying;
        let metrics = self.enrich(candidate, metrics).await;
        let payload = render_alert(candidate, &metrics);

        let notifier = self.notifier.clone();
        let delivery = self
            .retry
            .execute(&self.shutdown, || notifier.notify(&payload))
            .await;

        if let Err(e) = delivery {
            tracing::error!(
                "Failed to deliver alert for {} after {} attempts: {}",
                key,
                e.attempts(),
                e
            );
            return OUTCOME_NOTIFY_FAILED;
        }

        let now = self.clock.now();
        let ttl = Duration::from_secs(self.settings.seconds_to_ignore_after_signal);
        self.cooldowns.suppress(key.clone(), now, ttl);
        self.persist_cooldowns();
        self.journal_alert(candidate, &metrics, now);

        tracing::info!("Alert sent for {}, ignoring for {}s", key, ttl.as_secs());
        OUTCOME_ALERTED
    }

    async fn enrich(&self, candidate: &TokenCandidate, metrics: TokenMetrics) -> TokenMetrics {
        let Some(chain) = self.chain.clone() else {
            return metrics;
        };

        let token = candidate.token_address.as_str();
        match self
            .retry
            .execute(&self.shutdown, || chain.fetch_chain_info(token))
            .await
        {
            Ok(info) => metrics.with_chain(info),
            Err(e) => {
                tracing::warn!("Failed to fetch chain data for token {}: {}", token, e);
                metrics.with_chain(Default::default())
            }
        }
    }

    fn journal_alert(&self, candidate: &TokenCandidate, metrics: &TokenMetrics, now: u64) {
        let name = if metrics.profile.name.is_empty() {
            candidate.listing.name.clone()
        } else {
            metrics.profile.name.clone()
        };
        let symbol = if metrics.profile.symbol.is_empty() {
            candidate.listing.symbol.clone()
        } else {
            metrics.profile.symbol.clone()
        };

        let record = AlertRecord {
            address: candidate.token_address.clone(),
            pool_address: candidate.pool_address.clone(),
            name,
            symbol,
            timestamp_alerted: now,
            top_holders: metrics.top_holders.iter().take(JOURNALED_HOLDERS).cloned().collect(),
        };

        if let Err(e) = self.journal.record_alert(&record) {
            tracing::warn!("Failed to record alert for {}: {}", candidate.key(), e);
        }
    }

    fn persist_cooldowns(&self) {
        let Some(path) = &self.cooldown_path else {
            return;
        };
        if let Err(e) = self.cooldowns.save(path) {
            tracing::error!("Failed to persist cooldowns to {}: {}", path.display(), e);
        }
    }

    /// Whether `key` is currently in cooldown
    pub fn is_suppressed(&self, key: &CandidateKey) -> bool {
        self.cooldowns.is_suppressed(key, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::Criterion;
    use crate::ports::chain_data::MockChainDataPort;
    use crate::ports::market_data::MockMarketDataPort;
    use crate::ports::mocks::{ManualClock, MemoryJournal};
    use crate::ports::notifier::MockNotifierPort;
    use crate::ports::{ChainDataError, NotifyError};
    use crate::domain::{ChainInfo, TokenProfile};
    use tempfile::TempDir;

    const T0: u64 = 1_700_000_000;

    fn candidate(token: &str) -> TokenCandidate {
        TokenCandidate::new("solana", token, format!("pool-{}", token), T0)
    }

    fn qualified_metrics() -> TokenMetrics {
        TokenMetrics {
            liquidity_usd: 50_000.0,
            mcap_usd: 500_000.0,
            holder_count: 300,
            top5_holder_pct: 20.0,
            volume_24h_usd: 100_000.0,
            buy_activity: vec![10.0, 10.0, 10.0, 10.0, 50.0],
            profile: TokenProfile {
                name: "Qualified".into(),
                symbol: "QQ".into(),
                price_usd: 0.001,
                logo_url: None,
            },
            top_holders: vec![],
            windows: vec![],
            chain: None,
        }
    }

    fn thin_metrics() -> TokenMetrics {
        TokenMetrics {
            liquidity_usd: 100.0,
            ..qualified_metrics()
        }
    }

    fn settings() -> ScanSettings {
        ScanSettings {
            seconds_between_scans: 30,
            seconds_to_ignore_after_signal: 60,
            seconds_to_ignore_after_error: 20,
            seconds_to_sleep_on_error: 60,
            max_concurrent_fetches: 2,
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10))
    }

    fn orchestrator(
        market: MockMarketDataPort,
        notifier: MockNotifierPort,
        clock: &ManualClock,
    ) -> ScanOrchestrator {
        ScanOrchestrator::new(
            Arc::new(market),
            Arc::new(notifier),
            Thresholds::default(),
            settings(),
            ShutdownSignal::never(),
        )
        .with_clock(Arc::new(clock.clone()))
        .with_retry_policy(fast_retry())
    }

    #[tokio::test]
    async fn test_alert_suppresses_next_cycle() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .times(2)
            .returning(|| Ok(vec![candidate("mintA")]));
        market
            .expect_fetch_metrics()
            .times(1)
            .returning(|_| Ok(qualified_metrics()));

        let mut notifier = MockNotifierPort::new();
        notifier.expect_notify().times(1).returning(|_| Ok(()));

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, notifier, &clock);

        let first = orch.run_cycle().await.unwrap();
        assert_eq!(first.count(OUTCOME_ALERTED), 1);
        assert_eq!(orch.cooldowns().expires_at(&candidate("mintA").key()), Some(T0 + 60));

        clock.advance(30);
        let second = orch.run_cycle().await.unwrap();
        assert_eq!(second.count(OUTCOME_SUPPRESSED), 1);
        assert_eq!(second.count(OUTCOME_ALERTED), 0);
        assert_eq!(orch.status().cycles_completed, 2);
    }

    #[tokio::test]
    async fn test_failed_notification_does_not_suppress() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .returning(|| Ok(vec![candidate("mintA")]));
        market
            .expect_fetch_metrics()
            .times(2)
            .returning(|_| Ok(qualified_metrics()));

        let mut notifier = MockNotifierPort::new();
        notifier
            .expect_notify()
            .times(1)
            .returning(|_| Err(NotifyError::Rejected("chat not found".into())));
        notifier.expect_notify().times(1).returning(|_| Ok(()));

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, notifier, &clock);

        let first = orch.run_cycle().await.unwrap();
        assert_eq!(first.count(OUTCOME_NOTIFY_FAILED), 1);
        assert!(!orch.is_suppressed(&candidate("mintA").key()));

        let second = orch.run_cycle().await.unwrap();
        assert_eq!(second.count(OUTCOME_ALERTED), 1);
        assert!(orch.is_suppressed(&candidate("mintA").key()));
    }

    #[tokio::test]
    async fn test_rejections_are_tallied_by_criterion() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .returning(|| Ok(vec![candidate("thin"), candidate("flat")]));
        market.expect_fetch_metrics().returning(|c| {
            if c.token_address == "thin" {
                Ok(thin_metrics())
            } else {
                Ok(TokenMetrics {
                    buy_activity: vec![5.0],
                    ..qualified_metrics()
                })
            }
        });

        let mut notifier = MockNotifierPort::new();
        notifier.expect_notify().never();

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, notifier, &clock);

        let report = orch.run_cycle().await.unwrap();
        assert_eq!(report.candidates, 2);
        assert_eq!(report.count(Criterion::Liquidity.label()), 1);
        assert_eq!(report.count("inconclusive"), 1);
        assert!(orch.cooldowns().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_listing_is_fetched_once() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .returning(|| Ok(vec![candidate("mintA"), candidate("mintA")]));
        market
            .expect_fetch_metrics()
            .times(1)
            .returning(|_| Ok(thin_metrics()));

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, MockNotifierPort::new(), &clock);

        let report = orch.run_cycle().await.unwrap();
        assert_eq!(report.candidates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_fetch_sets_error_cooldown() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .returning(|| Ok(vec![candidate("gone"), candidate("flaky")]));
        market.expect_fetch_metrics().returning(|c| {
            if c.token_address == "gone" {
                Err(MarketDataError::NotFound("no pairs".into()))
            } else {
                Err(MarketDataError::Timeout)
            }
        });

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, MockNotifierPort::new(), &clock);

        let report = orch.run_cycle().await.unwrap();
        assert_eq!(report.count(OUTCOME_FETCH_ERROR), 2);

        // Fatal failure: short error cooldown, shorter than the signal cooldown
        let gone = orch.cooldowns().expires_at(&candidate("gone").key());
        assert_eq!(gone, Some(T0 + 20));
        // Exhausted retries: no cooldown
        assert_eq!(orch.cooldowns().expires_at(&candidate("flaky").key()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_fails_cycle() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .times(3)
            .returning(|| Err(MarketDataError::RateLimited));
        market.expect_fetch_metrics().never();

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, MockNotifierPort::new(), &clock);

        match orch.run_cycle().await {
            Err(CycleError::Listing(RetryError::Exhausted { attempts, .. })) => assert_eq!(attempts, 3),
            other => panic!("Expected listing failure, got {:?}", other),
        }
        assert_eq!(orch.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_chain_failure_still_alerts() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .returning(|| Ok(vec![candidate("mintA")]));
        market
            .expect_fetch_metrics()
            .returning(|_| Ok(qualified_metrics()));

        let mut chain = MockChainDataPort::new();
        chain
            .expect_fetch_chain_info()
            .times(1)
            .returning(|_| Err(ChainDataError::ParseError("bad json".into())));

        let mut notifier = MockNotifierPort::new();
        notifier
            .expect_notify()
            .withf(|alert| alert.text.contains("Token Age: <code>Unknown</code>"))
            .times(1)
            .returning(|_| Ok(()));

        let clock = ManualClock::at(T0);
        let journal = Arc::new(MemoryJournal::new());
        let mut orch = orchestrator(market, notifier, &clock)
            .with_chain_data(Arc::new(chain))
            .with_journal(journal.clone());

        let report = orch.run_cycle().await.unwrap();
        assert_eq!(report.count(OUTCOME_ALERTED), 1);

        let alerts = journal.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].address, "mintA");
        assert_eq!(alerts[0].timestamp_alerted, T0);
        assert_eq!(journal.cycles().len(), 1);
    }

    #[tokio::test]
    async fn test_chain_info_reaches_alert() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .returning(|| Ok(vec![candidate("mintA")]));
        market
            .expect_fetch_metrics()
            .returning(|_| Ok(qualified_metrics()));

        let mut chain = MockChainDataPort::new();
        chain.expect_fetch_chain_info().returning(|_| {
            Ok(ChainInfo {
                age_secs: Some(90_000),
                supply: Some(1_000.0),
                verified: Some(true),
            })
        });

        let mut notifier = MockNotifierPort::new();
        notifier
            .expect_notify()
            .withf(|alert| alert.text.contains("1d 1h 0m"))
            .times(1)
            .returning(|_| Ok(()));

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, notifier, &clock).with_chain_data(Arc::new(chain));
        orch.run_cycle().await.unwrap();
    }

    #[tokio::test]
    async fn test_cooldowns_are_flushed_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldowns.json");

        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .returning(|| Ok(vec![candidate("mintA")]));
        market
            .expect_fetch_metrics()
            .returning(|_| Ok(qualified_metrics()));
        let mut notifier = MockNotifierPort::new();
        notifier.expect_notify().returning(|_| Ok(()));

        let clock = ManualClock::at(T0);
        let mut orch = orchestrator(market, notifier, &clock)
            .with_cooldowns(CooldownStore::new(), Some(path.clone()));
        orch.run_cycle().await.unwrap();

        let restored = CooldownStore::load(&path).unwrap();
        assert!(restored.is_suppressed(&candidate("mintA").key(), T0 + 59));
        assert!(!restored.is_suppressed(&candidate("mintA").key(), T0 + 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_sleep() {
        let mut market = MockMarketDataPort::new();
        market.expect_list_candidates().returning(|| Ok(vec![]));

        let (handle, signal) = shutdown_channel();
        let mut orch = ScanOrchestrator::new(
            Arc::new(market),
            Arc::new(MockNotifierPort::new()),
            Thresholds::default(),
            ScanSettings {
                seconds_between_scans: 3_600,
                ..settings()
            },
            signal,
        );

        let task = tokio::spawn(async move {
            orch.run().await.unwrap();
            orch
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.trigger();

        let orch = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("run should stop promptly")
            .unwrap();
        assert_eq!(orch.state(), ScanState::Stopped);
        assert_eq!(orch.status().cycles_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_cycle_sleeps_error_interval() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .times(1)
            .returning(|| Err(MarketDataError::NotFound("no such exchange".into())));
        market.expect_list_candidates().returning(|| Ok(vec![]));

        let (handle, signal) = shutdown_channel();
        let mut orch = ScanOrchestrator::new(
            Arc::new(market),
            Arc::new(MockNotifierPort::new()),
            Thresholds::default(),
            ScanSettings {
                seconds_between_scans: 3_600,
                seconds_to_sleep_on_error: 60,
                ..settings()
            },
            signal,
        );

        let task = tokio::spawn(async move {
            let result = orch.run().await;
            (orch, result)
        });

        // First cycle fails, second starts after the 60s error pause
        tokio::time::sleep(Duration::from_secs(61)).await;
        handle.trigger();

        let (orch, result) = task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(orch.status().cycles_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_first_listing_stops_run() {
        let mut market = MockMarketDataPort::new();
        market
            .expect_list_candidates()
            .times(1)
            .returning(|| Err(MarketDataError::Unauthorized("bad key".into())));

        let (_handle, signal) = shutdown_channel();
        let mut orch = ScanOrchestrator::new(
            Arc::new(market),
            Arc::new(MockNotifierPort::new()),
            Thresholds::default(),
            settings(),
            signal,
        )
        .with_retry_policy(fast_retry());

        let err = orch.run().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(orch.state(), ScanState::Stopped);
        assert_eq!(orch.status().cycles_completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_after_first_cycle_keeps_running() {
        let mut market = MockMarketDataPort::new();
        market.expect_list_candidates().times(1).returning(|| Ok(vec![]));
        market
            .expect_list_candidates()
            .times(1)
            .returning(|| Err(MarketDataError::Unauthorized("key revoked".into())));
        market.expect_list_candidates().returning(|| Ok(vec![]));

        let (handle, signal) = shutdown_channel();
        let mut orch = ScanOrchestrator::new(
            Arc::new(market),
            Arc::new(MockNotifierPort::new()),
            Thresholds::default(),
            ScanSettings {
                seconds_between_scans: 100,
                seconds_to_sleep_on_error: 60,
                ..settings()
            },
            signal,
        )
        .with_retry_policy(fast_retry());

        let task = tokio::spawn(async move {
            let result = orch.run().await;
            (orch, result)
        });

        // Cycle at 0s succeeds, 100s is refused, 160s succeeds
        tokio::time::sleep(Duration::from_secs(161)).await;
        handle.trigger();

        let (orch, result) = task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(orch.status().cycles_completed, 2);
    }
}
