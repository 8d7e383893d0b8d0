//! The failure detector (component D): per-provider consecutive-failure
//! counting, failure-kind classification, and cooldown state.

mod classify;

pub use classify::{ClassifyInput, classify, kind};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Connection,
    ServerError,
    RateLimit,
    Unknown,
    /// Not a real upstream failure: the attempt was skipped because the
    /// provider was already cooling. Recorded by the failover executor,
    /// never by the proxy handler directly.
    Cooldown,
}

/// Deep-copyable snapshot of one provider's failure state.
#[derive(Debug, Clone, Default)]
pub struct ProviderFailureState {
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_requests: u64,
    pub last_failure_unix_millis: Option<u128>,
    pub last_success_unix_millis: Option<u128>,
    pub cooldown_until_unix_millis: Option<u128>,
    pub in_cooldown: bool,
    pub failures_by_kind: HashMap<FailureKind, u64>,
}

impl ProviderFailureState {
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.total_failures as f64 / self.total_requests as f64) * 100.0
        }
    }
}

struct StateInner {
    consecutive_failures: u32,
    total_failures: u64,
    total_requests: u64,
    last_failure: Option<Instant>,
    last_success: Option<Instant>,
    last_activity: Instant,
    cooldown_until: Option<Instant>,
    in_cooldown: bool,
    failures_by_kind: HashMap<FailureKind, u64>,
}

impl StateInner {
    fn new(now: Instant) -> Self {
        Self {
            consecutive_failures: 0,
            total_failures: 0,
            total_requests: 0,
            last_failure: None,
            last_success: None,
            last_activity: now,
            cooldown_until: None,
            in_cooldown: false,
            failures_by_kind: HashMap::new(),
        }
    }

    fn snapshot(&self, now: Instant) -> ProviderFailureState {
        let millis_ago = |instant: Instant| -> u128 {
            now.saturating_duration_since(instant).as_millis()
        };
        ProviderFailureState {
            consecutive_failures: self.consecutive_failures,
            total_failures: self.total_failures,
            total_requests: self.total_requests,
            last_failure_unix_millis: self.last_failure.map(millis_ago),
            last_success_unix_millis: self.last_success.map(millis_ago),
            cooldown_until_unix_millis: self.cooldown_until.map(millis_ago),
            in_cooldown: self.in_cooldown,
            failures_by_kind: self.failures_by_kind.clone(),
        }
    }
}

/// Configuration for the failure detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub failure_threshold: u32,
    pub cooldown_duration: Duration,
    pub cleanup_interval: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_duration: Duration::from_secs(5 * 60),
            cleanup_interval: Duration::from_secs(60 * 60),
        }
    }
}

const STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

struct Registry {
    states: HashMap<i64, Arc<Mutex<StateInner>>>,
}

/// The failure detector. One instance is a long-lived singleton per gateway
/// process, shared behind an `Arc`.
pub struct FailureDetector {
    config: DetectorConfig,
    registry: RwLock<Registry>,
    janitor_cancel: CancellationToken,
}

impl FailureDetector {
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(Registry { states: HashMap::new() }),
            janitor_cancel: CancellationToken::new(),
        }
    }

    fn state_for(&self, provider_id: i64) -> Arc<Mutex<StateInner>> {
        if let Some(state) = self.registry.read().unwrap().states.get(&provider_id) {
            return state.clone();
        }
        let mut registry = self.registry.write().unwrap();
        registry
            .states
            .entry(provider_id)
            .or_insert_with(|| Arc::new(Mutex::new(StateInner::new(Instant::now()))))
            .clone()
    }

    /// Record a failed attempt against `provider_id`.
    pub fn record_failure(&self, provider_id: i64, failure_kind: FailureKind) {
        let state = self.state_for(provider_id);
        let mut state = state.lock().unwrap();
        let now = Instant::now();

        state.consecutive_failures += 1;
        state.total_failures += 1;
        state.total_requests += 1;
        state.last_failure = Some(now);
        state.last_activity = now;
        *state.failures_by_kind.entry(failure_kind).or_insert(0) += 1;

        if state.consecutive_failures >= self.config.failure_threshold && !state.in_cooldown {
            state.in_cooldown = true;
            state.cooldown_until = Some(now + self.config.cooldown_duration);
            tracing::warn!(provider_id, consecutive = state.consecutive_failures, "provider entering cooldown");
        }
    }

    /// Record a successful attempt against `provider_id`.
    pub fn record_success(&self, provider_id: i64) {
        let state = self.state_for(provider_id);
        let mut state = state.lock().unwrap();
        let now = Instant::now();

        state.consecutive_failures = 0;
        state.total_requests += 1;
        state.last_success = Some(now);
        state.last_activity = now;

        if state.in_cooldown
            && let Some(until) = state.cooldown_until
            && now > until
        {
            state.in_cooldown = false;
            state.cooldown_until = None;
            tracing::info!(provider_id, "provider recovered from cooldown");
        }
    }

    /// Whether `provider_id` may currently be selected. Unknown providers
    /// (never recorded against) are available.
    #[must_use]
    pub fn is_available(&self, provider_id: i64) -> bool {
        let Some(state) = self.registry.read().unwrap().states.get(&provider_id).cloned() else {
            return true;
        };
        let mut state = state.lock().unwrap();
        if !state.in_cooldown {
            return true;
        }
        let now = Instant::now();
        if let Some(until) = state.cooldown_until
            && now > until
        {
            state.in_cooldown = false;
            state.cooldown_until = None;
            return true;
        }
        false
    }

    #[must_use]
    pub fn stats(&self, provider_id: i64) -> Option<ProviderFailureState> {
        let state = self.registry.read().unwrap().states.get(&provider_id).cloned()?;
        let state = state.lock().unwrap();
        Some(state.snapshot(Instant::now()))
    }

    #[must_use]
    pub fn stats_all(&self) -> HashMap<i64, ProviderFailureState> {
        let now = Instant::now();
        self.registry
            .read()
            .unwrap()
            .states
            .iter()
            .map(|(id, state)| (*id, state.lock().unwrap().snapshot(now)))
            .collect()
    }

    pub fn reset(&self, provider_id: i64) {
        if let Some(state) = self.registry.read().unwrap().states.get(&provider_id) {
            *state.lock().unwrap() = StateInner::new(Instant::now());
        }
    }

    fn sweep_stale(&self) {
        let now = Instant::now();
        let mut registry = self.registry.write().unwrap();
        let before = registry.states.len();
        registry.states.retain(|_, state| {
            let state = state.lock().unwrap();
            state.in_cooldown || now.saturating_duration_since(state.last_activity) < STALE_AFTER
        });
        let removed = before - registry.states.len();
        if removed > 0 {
            tracing::debug!(removed, "failure detector janitor pruned stale provider state");
        }
    }

    /// Spawn the background janitor that prunes stale, non-cooling provider
    /// state. `close` stops it cleanly.
    pub fn spawn_janitor(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval_dur = self.config.cleanup_interval;
        let cancel = self.janitor_cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => self.sweep_stale(),
                }
            }
        })
    }

    /// Stop the background janitor. Idempotent.
    pub fn close(&self) {
        self.janitor_cancel.cancel();
    }
}
