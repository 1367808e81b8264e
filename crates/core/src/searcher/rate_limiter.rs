//! Token bucket rate limiter for per-indexer rate limiting.
//!
//! Kept for potential future use but currently not used since Jackett
//! handles rate limiting internally.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use super::SearchError;

/// Rate limit status for an indexer.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub requests_per_minute: u32,
    pub tokens_available: f32,
    pub next_available_in_ms: Option<u64>,
}

/// Token bucket rate limiter for a single indexer.
///
/// Uses the token bucket algorithm where tokens are added at a constant rate
/// and consumed when requests are made. If no tokens are available, the request
/// must wait.
pub struct TokenBucket {
    /// Max tokens (= requests per minute).
    capacity: f32,
    /// Current available tokens.
    tokens: f32,
    /// Tokens added per second.
    refill_rate: f32,
    /// Last refill time.
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a new token bucket with the given rate limit.
    ///
    /// The bucket starts full, allowing immediate requests up to the capacity.
    pub fn new(requests_per_minute: u32) -> Self {
        let capacity = requests_per_minute as f32;
        Self {
            capacity,
            tokens: capacity, // Start full
            refill_rate: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    /// Try to acquire a token.
    ///
    /// Returns `Ok(())` if a token was acquired successfully.
    /// Returns `Err(wait_duration)` if rate limited, with the duration to wait.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            // Calculate wait time until 1 token available
            let tokens_needed = 1.0 - self.tokens;
            let wait_secs = tokens_needed / self.refill_rate;
            Err(Duration::from_secs_f32(wait_secs))
        }
    }

    /// Update the rate limit.
    ///
    /// The current token count is preserved (clamped to new capacity).
    pub fn set_rate_limit(&mut self, requests_per_minute: u32) {
        self.capacity = requests_per_minute as f32;
        self.refill_rate = self.capacity / 60.0;
        // Don't reset tokens - keep current state, but clamp to new capacity
        self.tokens = self.tokens.min(self.capacity);
    }

    /// Get the current rate limit status.
    pub fn status(&mut self) -> RateLimitStatus {
        self.refill();
        RateLimitStatus {
            requests_per_minute: self.capacity as u32,
            tokens_available: self.tokens,
            next_available_in_ms: if self.tokens >= 1.0 {
                None
            } else {
                let tokens_needed = 1.0 - self.tokens;
                Some((tokens_needed / self.refill_rate * 1000.0) as u64)
            },
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f32();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// Configuration for an indexer in the rate limiter pool.
#[derive(Debug, Clone)]
pub struct IndexerRateLimitConfig {
    /// Indexer name.
    pub name: String,
    /// Rate limit: max requests per minute.
    pub rate_limit_rpm: u32,
}

/// Pool of rate limiters, one per indexer.
///
/// Thread-safe and async-compatible.
pub struct RateLimiterPool {
    limiters: RwLock<HashMap<String, TokenBucket>>,
}

impl RateLimiterPool {
    /// Create a new rate limiter pool with the given indexer configurations.
    pub fn new(indexers: &[IndexerRateLimitConfig]) -> Self {
        let mut limiters = HashMap::new();
        for indexer in indexers {
            limiters.insert(
                indexer.name.clone(),
                TokenBucket::new(indexer.rate_limit_rpm),
            );
        }
        Self {
            limiters: RwLock::new(limiters),
        }
    }

    /// Create an empty rate limiter pool.
    pub fn empty() -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
        }
    }

    /// Add or update an indexer in the pool.
    pub async fn add_indexer(&self, name: &str, rate_limit_rpm: u32) {
        let mut limiters = self.limiters.write().await;
        if let Some(bucket) = limiters.get_mut(name) {
            bucket.set_rate_limit(rate_limit_rpm);
        } else {
            limiters.insert(name.to_string(), TokenBucket::new(rate_limit_rpm));
        }
    }

    /// Remove an indexer from the pool.
    pub async fn remove_indexer(&self, name: &str) -> bool {
        let mut limiters = self.limiters.write().await;
        limiters.remove(name).is_some()
    }

    /// Try to acquire a token for the given indexer.
    ///
    /// Returns `Ok(())` if a token was acquired.
    /// Returns `Err(SearchError::RateLimited)` if rate limited.
    /// Returns `Err(SearchError::IndexerNotFound)` if the indexer doesn't exist.
    pub async fn try_acquire(&self, indexer: &str) -> Result<(), SearchError> {
        let mut limiters = self.limiters.write().await;
        match limiters.get_mut(indexer) {
            Some(bucket) => match bucket.try_acquire() {
                Ok(()) => Ok(()),
                Err(wait) => Err(SearchError::RateLimited {
                    indexer: indexer.to_string(),
                    retry_after_ms: wait.as_millis() as u64,
                }),
            },
            None => Err(SearchError::IndexerNotFound(indexer.to_string())),
        }
    }

    /// Update rate limit for an indexer.
    pub async fn set_rate_limit(&self, indexer: &str, rpm: u32) -> Result<(), SearchError> {
        let mut limiters = self.limiters.write().await;
        match limiters.get_mut(indexer) {
            Some(bucket) => {
                bucket.set_rate_limit(rpm);
                Ok(())
            }
            None => Err(SearchError::IndexerNotFound(indexer.to_string())),
        }
    }

    /// Get rate limit status for a specific indexer.
    pub async fn get_status(&self, indexer: &str) -> Option<RateLimitStatus> {
        let mut limiters = self.limiters.write().await;
        limiters.get_mut(indexer).map(|bucket| bucket.status())
    }

    /// Get status of all indexers.
    pub async fn all_status(&self) -> Vec<(String, RateLimitStatus)> {
        let mut limiters = self.limiters.write().await;
        limiters
            .iter_mut()
            .map(|(name, bucket)| (name.clone(), bucket.status()))
            .collect()
    }

    /// Check if an indexer exists in the pool.
    pub async fn has_indexer(&self, indexer: &str) -> bool {
        let limiters = self.limiters.read().await;
        limiters.contains_key(indexer)
    }

    /// Get the list of indexer names.
    pub async fn indexer_names(&self) -> Vec<String> {
        let limiters = self.limiters.read().await;
        limiters.keys().cloned().collect()
    }
}
