//! The load balancer (component C): weighted-random selection across a
//! candidate list.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use gateway_model::ResolvedCandidate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deep-copyable selection statistics.
#[derive(Debug, Clone, Default)]
pub struct BalancerStats {
    pub total_selections: u64,
    /// Selection counts keyed by provider id.
    pub per_provider: HashMap<i64, u64>,
    pub last_selection_unix_millis: Option<u128>,
    /// Exponentially smoothed average selection latency, in nanoseconds.
    pub avg_latency_nanos: f64,
}

struct Inner {
    rng: StdRng,
    stats: BalancerStats,
}

const LATENCY_SMOOTHING: f64 = 0.1;

/// Weighted-random load balancer. One instance is a long-lived singleton
/// shared behind an `Arc` across all request handlers.
pub struct LoadBalancer {
    inner: Mutex<Inner>,
}

impl LoadBalancer {
    /// Construct with a time-based seed (the default for production use).
    #[must_use]
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(seed)
    }

    /// Construct with an explicit seed, for reproducible tests.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                rng: StdRng::seed_from_u64(seed),
                stats: BalancerStats::default(),
            }),
        }
    }

    /// Select one candidate from `candidates` by weighted-random draw.
    /// Returns `None` for an empty list. Candidates with non-positive
    /// weight never win unless every weight is non-positive, in which case
    /// selection is uniform.
    #[must_use]
    pub fn select(&self, candidates: &[ResolvedCandidate]) -> Option<ResolvedCandidate> {
        if candidates.is_empty() {
            return None;
        }
        if candidates.len() == 1 {
            self.record_selection(&candidates[0]);
            return Some(candidates[0].clone());
        }

        let total_weight: i64 = candidates.iter().map(|c| i64::from(c.weight)).filter(|w| *w > 0).sum();

        let mut inner = self.inner.lock().unwrap();
        let chosen = if total_weight <= 0 {
            let idx = inner.rng.random_range(0..candidates.len());
            &candidates[idx]
        } else {
            let draw = inner.rng.random_range(0..total_weight);
            let mut running = 0i64;
            let mut picked = &candidates[0];
            for candidate in candidates {
                if candidate.weight == 0 {
                    continue;
                }
                running += i64::from(candidate.weight);
                if running > draw {
                    picked = candidate;
                    break;
                }
            }
            picked
        };
        let chosen = chosen.clone();
        drop(inner);
        self.record_selection(&chosen);
        Some(chosen)
    }

    fn record_selection(&self, candidate: &ResolvedCandidate) {
        let start = std::time::Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.stats.total_selections += 1;
        *inner.stats.per_provider.entry(candidate.provider_id).or_insert(0) += 1;
        inner.stats.last_selection_unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis());

        let sample = start.elapsed().as_nanos() as f64;
        inner.stats.avg_latency_nanos = if inner.stats.total_selections == 1 {
            sample
        } else {
            LATENCY_SMOOTHING * sample + (1.0 - LATENCY_SMOOTHING) * inner.stats.avg_latency_nanos
        };
    }

    #[must_use]
    pub fn stats(&self) -> BalancerStats {
        self.inner.lock().unwrap().stats.clone()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats = BalancerStats::default();
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, weight: u32) -> ResolvedCandidate {
        ResolvedCandidate {
            mapping_id: id,
            provider_id: id,
            target_model: "m".to_owned(),
            weight,
            priority: 1,
            enabled: true,
            provider: gateway_model::ProviderSnapshot {
                id,
                name: format!("p{id}"),
                base_url: "https://example.com".to_owned(),
                enabled: true,
                health_status: gateway_model::HealthStatus::Healthy,
            },
        }
    }

    #[test]
    fn empty_list_returns_none() {
        let balancer = LoadBalancer::with_seed(1);
        assert!(balancer.select(&[]).is_none());
    }

    #[test]
    fn single_candidate_is_always_returned() {
        let balancer = LoadBalancer::with_seed(1);
        let c = candidate(1, 50);
        let picked = balancer.select(std::slice::from_ref(&c)).unwrap();
        assert_eq!(picked.provider_id, 1);
    }

    #[test]
    fn zero_weight_candidate_never_wins() {
        let balancer = LoadBalancer::with_seed(42);
        let candidates = vec![candidate(1, 0), candidate(2, 100)];
        for _ in 0..1000 {
            let picked = balancer.select(&candidates).unwrap();
            assert_eq!(picked.provider_id, 2);
        }
    }

    #[test]
    fn distribution_matches_weight_share_within_five_percent() {
        let balancer = LoadBalancer::with_seed(7);
        let candidates = vec![candidate(1, 70), candidate(2, 20), candidate(3, 10)];
        let mut counts: HashMap<i64, u64> = HashMap::new();
        let n = 10_000;
        for _ in 0..n {
            let picked = balancer.select(&candidates).unwrap();
            *counts.entry(picked.provider_id).or_insert(0) += 1;
        }
        let expected = [(1, 7000.0), (2, 2000.0), (3, 1000.0)];
        for (id, exp) in expected {
            let observed = *counts.get(&id).unwrap() as f64;
            let relative_error = (observed - exp).abs() / exp;
            assert!(relative_error < 0.05, "id {id}: observed {observed}, expected {exp}");
        }
    }

    #[test]
    fn never_fabricates_a_candidate() {
        let balancer = LoadBalancer::with_seed(9);
        let candidates = vec![candidate(1, 5), candidate(2, 5), candidate(3, 5)];
        for _ in 0..500 {
            let picked = balancer.select(&candidates).unwrap();
            assert!(candidates.iter().any(|c| c.provider_id == picked.provider_id));
        }
    }

    #[test]
    fn stats_reset_zeros_everything() {
        let balancer = LoadBalancer::with_seed(3);
        let candidates = vec![candidate(1, 10)];
        balancer.select(&candidates);
        assert_eq!(balancer.stats().total_selections, 1);
        balancer.reset();
        let stats = balancer.stats();
        assert_eq!(stats.total_selections, 0);
        assert!(stats.per_provider.is_empty());
    }
}
