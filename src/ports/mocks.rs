use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;

use super::{
    AlertPayload, ChainDataError, ChainDataPort, Clock, JournalError, MarketDataError,
    MarketDataPort, NotifierPort, NotifyError, ScanJournal,
};
use crate::domain::{AlertRecord, ChainInfo, CycleReport, TokenCandidate, TokenMetrics};

/// Mock market data port that records calls and allows controlled responses
#[derive(Debug, Default, Clone)]
pub struct MockMarketData {
    candidates: Arc<Mutex<Vec<TokenCandidate>>>,
    listing_failures: Arc<Mutex<VecDeque<MarketDataError>>>,
    metrics: Arc<Mutex<HashMap<String, TokenMetrics>>>,
    metric_failures: Arc<Mutex<HashMap<String, VecDeque<MarketDataError>>>>,
    listing_calls: Arc<Mutex<usize>>,
    metric_calls: Arc<Mutex<Vec<String>>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the candidate list returned on every call
    pub fn with_candidates(self, candidates: Vec<TokenCandidate>) -> Self {
        *self.candidates.lock().unwrap() = candidates;
        self
    }

    /// Builder method to set metrics for a token address
    pub fn with_metrics(self, token_address: &str, metrics: TokenMetrics) -> Self {
        self.metrics.lock().unwrap().insert(token_address.to_string(), metrics);
        self
    }

    /// Queue a failure for the next listing call
    pub fn fail_listing_once(self, error: MarketDataError) -> Self {
        self.listing_failures.lock().unwrap().push_back(error);
        self
    }

    /// Queue a failure for the next metrics call of a token
    pub fn fail_metrics_once(self, token_address: &str, error: MarketDataError) -> Self {
        self.metric_failures
            .lock()
            .unwrap()
            .entry(token_address.to_string())
            .or_default()
            .push_back(error);
        self
    }

    pub fn listing_calls(&self) -> usize {
        *self.listing_calls.lock().unwrap()
    }

    /// Token addresses passed to `fetch_metrics`, in call order
    pub fn metric_calls(&self) -> Vec<String> {
        self.metric_calls.lock().unwrap().clone()
    }

    pub fn metric_calls_for(&self, token_address: &str) -> usize {
        self.metric_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_str() == token_address)
            .count()
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn list_candidates(&self) -> Result<Vec<TokenCandidate>, MarketDataError> {
        *self.listing_calls.lock().unwrap() += 1;
        if let Some(error) = self.listing_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.candidates.lock().unwrap().clone())
    }

    async fn fetch_metrics(&self, candidate: &TokenCandidate) -> Result<TokenMetrics, MarketDataError> {
        let token = candidate.token_address.clone();
        self.metric_calls.lock().unwrap().push(token.clone());

        if let Some(queue) = self.metric_failures.lock().unwrap().get_mut(&token) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }

        self.metrics
            .lock()
            .unwrap()
            .get(&token)
            .cloned()
            .ok_or_else(|| MarketDataError::NotFound(token))
    }
}

/// Mock chain data port returning a fixed answer
#[derive(Debug, Clone)]
pub struct MockChainData {
    response: Result<ChainInfo, ChainDataError>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockChainData {
    pub fn returning(info: ChainInfo) -> Self {
        Self {
            response: Ok(info),
            calls: Arc::default(),
        }
    }

    pub fn failing(error: ChainDataError) -> Self {
        Self {
            response: Err(error),
            calls: Arc::default(),
        }
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainDataPort for MockChainData {
    async fn fetch_chain_info(&self, token_address: &str) -> Result<ChainInfo, ChainDataError> {
        self.calls.lock().unwrap().push(token_address.to_string());
        self.response.clone()
    }
}

/// Mock notifier that records delivered alerts and can be told to fail
#[derive(Debug, Default, Clone)]
pub struct MockNotifier {
    delivered: Arc<Mutex<Vec<AlertPayload>>>,
    failures: Arc<Mutex<VecDeque<NotifyError>>>,
    attempts: Arc<Mutex<usize>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next delivery attempt
    pub fn fail_next(&self, error: NotifyError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn delivered(&self) -> Vec<AlertPayload> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl NotifierPort for MockNotifier {
    async fn notify(&self, alert: &AlertPayload) -> Result<(), NotifyError> {
        *self.attempts.lock().unwrap() += 1;
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// In-memory journal
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    alerts: Arc<Mutex<Vec<AlertRecord>>>,
    cycles: Arc<Mutex<Vec<CycleReport>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn cycles(&self) -> Vec<CycleReport> {
        self.cycles.lock().unwrap().clone()
    }
}

impl ScanJournal for MemoryJournal {
    fn record_alert(&self, record: &AlertRecord) -> Result<(), JournalError> {
        self.alerts.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn record_cycle(&self, report: &CycleReport) -> Result<(), JournalError> {
        self.cycles.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Manually advanced clock
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn at(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_market_data() {
        let candidate = TokenCandidate::new("solana", "mintA", "poolA", 0);
        let mock = MockMarketData::new()
            .with_candidates(vec![candidate.clone()])
            .fail_metrics_once("mintA", MarketDataError::Timeout);

        assert_eq!(mock.list_candidates().await.unwrap().len(), 1);
        assert_eq!(mock.fetch_metrics(&candidate).await, Err(MarketDataError::Timeout));
        // No metrics configured after the queued failure
        assert!(matches!(
            mock.fetch_metrics(&candidate).await,
            Err(MarketDataError::NotFound(_))
        ));
        assert_eq!(mock.metric_calls_for("mintA"), 2);
        assert_eq!(mock.listing_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_notifier() {
        let notifier = MockNotifier::new();
        notifier.fail_next(NotifyError::RateLimited);

        let alert = AlertPayload {
            key: crate::domain::CandidateKey::new("solana", "a", "b"),
            text: "hi".into(),
            details: None,
            image_url: None,
        };

        assert_eq!(notifier.notify(&alert).await, Err(NotifyError::RateLimited));
        assert!(notifier.notify(&alert).await.is_ok());
        assert_eq!(notifier.attempts(), 2);
        assert_eq!(notifier.delivered().len(), 1);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at(100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }
}
