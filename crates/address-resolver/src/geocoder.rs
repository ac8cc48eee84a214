//! External geocoding seam
//!
//! The matcher only knows [`ExternalGeocoder`]; the Nominatim client
//! (feature `nominatim`) is one implementation, tests use fakes.
//! Retry, backoff and rate limiting live here so every implementation
//! shares the same policy.

use regex::Regex;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tn_gazetteer::Coordinate;
use tracing::{debug, warn};

/// Street-type word followed or preceded somewhere by a house number
static STREET_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(avenue|av|rue|route|boulevard|bd|impasse|place|street|road)\b")
        .expect("street-type pattern is valid")
});
static HOUSE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("house-number pattern is valid"));

/// Country suffix appended to external queries
pub const COUNTRY_SUFFIX: &str = "Tunisia";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Rate limited")]
    RateLimited,
}

impl LookupError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout | Self::Malformed(_) | Self::RateLimited => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
        }
    }
}

/// A blocking geocoding service.
///
/// `Ok(None)` is a normal "no match". Implementations are shared across
/// worker threads.
pub trait ExternalGeocoder: Send + Sync {
    fn lookup(&self, query: &str) -> Result<Option<Coordinate>, LookupError>;
}

/// Only addresses with a street-type token and a number are worth a network call.
/// Expects text already folded by `normalize_text`.
pub fn is_well_formed(normalized_address: &str) -> bool {
    STREET_TYPE.is_match(normalized_address) && HOUSE_NUMBER.is_match(normalized_address)
}

/// Raw address with the country appended unless already named
pub fn build_query(raw_address: &str) -> String {
    let trimmed = raw_address.trim().trim_end_matches(',').trim();
    let lower = trimmed.to_lowercase();
    if lower.contains("tunisia") || lower.contains("tunisie") {
        trimmed.to_string()
    } else {
        format!("{}, {}", trimmed, COUNTRY_SUFFIX)
    }
}

/// Bounded retries with capped exponential backoff (`base * 2^attempt`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    /// `op` receives the zero-based attempt number.
    pub fn run<T>(&self, mut op: impl FnMut(u32) -> Result<T, LookupError>) -> Result<T, LookupError> {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let wait = self.backoff(attempt);
                    debug!("Lookup attempt {} failed ({}), retrying in {:?}", attempt + 1, e, wait);
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Lookup failed after {} attempt(s): {}", attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Minimum spacing between calls, shared by every thread holding it
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until the next call is allowed, then claim the slot
    pub fn acquire(&self) {
        // Poisoning leaves the timestamp intact
        let mut last = self.last_call.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}
