//! AI-backed fare and transport-cost estimation.
//!
//! Estimates are advisory: every failure path resolves to a marker string
//! or a zero cost instead of an error, so the wizard never blocks on them.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::services::gemini::GeminiClient;
use crate::services::prompts::{self, Origin};
use crate::services::routing::TravelMode;

/// Marker returned when the AI answered with something other than a number.
pub const FARE_CALC_ERROR: &str = "計算エラー";
/// Marker returned when the AI call itself failed. Not cached.
pub const FARE_UNAVAILABLE: &str = "取得失敗";

const DEFAULT_CAPACITY: usize = 256;

/// Session-scoped memo of fare lookups, keyed `origin|destination|mode`.
///
/// Bounded: once full, the oldest entry is evicted. Never persisted.
#[derive(Debug)]
pub struct FareCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl FareCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn key(origin: &str, destination: &str, mode: TravelMode) -> String {
        format!("{origin}|{destination}|{mode}")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: String, value: String) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, value);
            return;
        }

        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FareCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Fare and transport-cost estimator over the generation client.
#[derive(Debug, Clone)]
pub struct FareEstimator {
    client: Arc<GeminiClient>,
    cache: Arc<Mutex<FareCache>>,
}

impl FareEstimator {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self::with_cache(client, FareCache::default())
    }

    /// Inject a cache, letting callers control its capacity and lifetime.
    pub fn with_cache(client: Arc<GeminiClient>, cache: FareCache) -> Self {
        Self {
            client,
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Number of memoized fares, for diagnostics and tests.
    pub fn cached_fares(&self) -> usize {
        self.cache.lock().expect("fare cache poisoned").len()
    }

    /// Estimate a point-to-point fare, returning a formatted price string
    /// like "1500円", or a marker when the answer is unusable.
    ///
    /// Identical (origin, destination, mode) triples hit the cache and skip
    /// the network entirely.
    pub async fn estimate_fare(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> String {
        let key = FareCache::key(origin, destination, mode);
        {
            let cache = self.cache.lock().expect("fare cache poisoned");
            if let Some(hit) = cache.get(&key) {
                debug!(target: "trip_planner::fare", %key, "fare cache hit");
                return hit.to_string();
            }
        }

        let prompt = prompts::fare_prompt(origin, destination, mode);
        match self.client.generate(&prompt).await {
            Ok(text) => {
                let answer = text.trim();
                let price = if is_bare_number(answer) {
                    format!("{answer}円")
                } else {
                    FARE_CALC_ERROR.to_string()
                };

                let mut cache = self.cache.lock().expect("fare cache poisoned");
                cache.insert(key, price.clone());
                price
            }
            Err(err) => {
                warn!(target: "trip_planner::fare", error = %err, "fare lookup failed");
                FARE_UNAVAILABLE.to_string()
            }
        }
    }

    /// Estimate the cheapest one-way transport cost in yen from an origin
    /// to a named destination. Resolves to 0 on any failure.
    pub async fn estimate_transport_cost(&self, origin: &Origin, destination: &str) -> u32 {
        let prompt = prompts::transport_cost_prompt(origin, destination);
        match self.client.generate(&prompt).await {
            Ok(text) => extract_yen(&text),
            Err(err) => {
                warn!(
                    target: "trip_planner::fare",
                    error = %err,
                    "transport cost estimation failed, defaulting to 0"
                );
                0
            }
        }
    }
}

/// Whether the trimmed answer is a plain number, optionally with a decimal
/// part.
fn is_bare_number(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let mut dots = 0;
    for c in text.chars() {
        match c {
            '0'..='9' => {}
            '.' => dots += 1,
            _ => return false,
        }
    }
    dots <= 1 && !text.starts_with('.') && !text.ends_with('.')
}

/// Strip every non-digit from a free-form reply and parse the rest as yen.
fn extract_yen(text: &str) -> u32 {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
