//! Response dispatcher.
//!
//! [`ParserService`] validates the raw output, checks a per-command strategy
//! cache and otherwise walks the registered strategies in priority order.
//! Each attempt runs on tokio's blocking pool under the configured deadline.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};
use moka::future::Cache;
use sha2::{Digest, Sha256};

use crate::config::{ParserConfig, STRATEGY_CACHE_CAPACITY};
use crate::error::{ErrorCode, ParseError, truncate_chars};
use crate::normalizer::Normalizer;
use crate::strategy::{CancelToken, ParserStrategy, default_strategies};
use crate::types::{OutputFormat, ParseHints, ParseResult};

/// Trips the token when the attempt is dropped, including when the caller
/// abandons the `parse_response` future.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Parses RouterOS command output with automatic format detection.
pub struct ParserService {
    config: ParserConfig,
    normalizer: Arc<Normalizer>,
    /// Ascending priority; equal priorities keep registration order.
    strategies: Vec<Arc<dyn ParserStrategy>>,
    /// "resource_path:command_type" -> name of the last strategy that worked.
    cache: Cache<String, String>,
}

impl ParserService {
    /// A service with the five built-in strategies.
    pub fn new(config: ParserConfig, normalizer: Arc<Normalizer>) -> Self {
        let mut service = Self::without_strategies(config, normalizer);
        service.strategies = default_strategies(&service.normalizer);
        service
    }

    /// A service with no strategies, for callers that register their own.
    pub fn without_strategies(config: ParserConfig, normalizer: Arc<Normalizer>) -> Self {
        let cache = Cache::builder()
            .max_capacity(STRATEGY_CACHE_CAPACITY)
            .build();

        Self {
            config,
            normalizer,
            strategies: Vec::new(),
            cache,
        }
    }

    /// Adds a strategy, keeping the list sorted by priority. A strategy with
    /// the same name as a registered one replaces it.
    pub fn register_strategy<S: ParserStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.retain(|s| s.name() != strategy.name());
        let pos = self
            .strategies
            .iter()
            .position(|s| s.priority() > strategy.priority())
            .unwrap_or(self.strategies.len());
        debug!(
            "Registering strategy {} (priority {}) at position {}",
            strategy.name(),
            strategy.priority(),
            pos
        );
        self.strategies.insert(pos, Arc::new(strategy));
    }

    /// Registered strategy names in the order they are tried.
    pub fn strategies(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Arc<Normalizer> {
        &self.normalizer
    }

    /// Strategy remembered for these hints, if any.
    pub async fn cached_strategy(&self, hints: &ParseHints) -> Option<String> {
        let key = cache_key(hints)?;
        self.cache.get(&key).await
    }

    /// Parses one command response.
    pub async fn parse_response(
        &self,
        raw: &str,
        hints: &ParseHints,
    ) -> Result<ParseResult, ParseError> {
        let started = Instant::now();

        if raw.len() > self.config.max_output_size {
            return Err(ParseError::output_too_large(
                raw.len(),
                self.config.max_output_size,
            ));
        }
        if raw.trim().is_empty() {
            trace!("Empty output for {:?}", hints.resource_path);
            return Ok(ParseResult::empty(OutputFormat::Unknown));
        }

        let shared_raw: Arc<str> = Arc::from(raw);
        let shared_hints = Arc::new(hints.clone());
        match self.parse_with_fallback(&shared_raw, &shared_hints).await {
            Ok(mut result) => {
                result.metadata.parse_time = started.elapsed();
                if result.metadata.router_os_version.is_empty()
                    && let Some(version) = &hints.router_os_version
                {
                    result.metadata.router_os_version = version.raw.clone();
                }
                debug!(
                    "Parsed {} resources with {} in {:?}",
                    result.metadata.row_count,
                    result.metadata.strategy_used,
                    result.metadata.parse_time
                );
                Ok(result)
            }
            Err(err) => {
                self.log_failure(raw, &err);
                Err(err)
            }
        }
    }

    async fn parse_with_fallback(
        &self,
        raw: &Arc<str>,
        hints: &Arc<ParseHints>,
    ) -> Result<ParseResult, ParseError> {
        let key = cache_key(hints);

        if let Some(key) = &key
            && let Some(name) = self.cache.get(key).await
        {
            match self.find_strategy(&name) {
                Some(strategy) => {
                    debug!("Strategy cache hit: {} -> {}", key, name);
                    match self.run_strategy(&strategy, raw, hints).await {
                        Ok(result) => return Ok(result),
                        Err(err) => {
                            debug!(
                                "Cached strategy {} failed for {}: {}. Evicting.",
                                name, key, err
                            );
                            self.cache.invalidate(key).await;
                        }
                    }
                }
                None => {
                    debug!("Cached strategy {} is no longer registered. Evicting.", name);
                    self.cache.invalidate(key).await;
                }
            }
        }

        let mut last_error = None;
        for strategy in &self.strategies {
            if !strategy.can_parse(raw, hints) {
                trace!("Strategy {} does not apply", strategy.name());
                continue;
            }
            debug!("Trying strategy {}", strategy.name());
            match self.run_strategy(strategy, raw, hints).await {
                Ok(result) => {
                    if let Some(key) = &key {
                        self.cache
                            .insert(key.clone(), strategy.name().to_string())
                            .await;
                        debug!("Cached strategy {} for {}", strategy.name(), key);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    debug!("Strategy {} failed: {}", strategy.name(), err);
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ParseError::no_matching_parser(raw, &["none applicable".to_string()])
        }))
    }

    /// Runs one strategy on the blocking pool, bounded by the parse timeout.
    async fn run_strategy(
        &self,
        strategy: &Arc<dyn ParserStrategy>,
        raw: &Arc<str>,
        hints: &Arc<ParseHints>,
    ) -> Result<ParseResult, ParseError> {
        let cancel = CancelToken::new();
        let _guard = CancelOnDrop(cancel.clone());

        let task = {
            let strategy = strategy.clone();
            let raw = raw.clone();
            let hints = hints.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || strategy.parse(&raw, &hints, &cancel))
        };

        let timeout = self.config.parse_timeout();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result.map(|mut result| {
                result.metadata.strategy_used = strategy.name().to_string();
                result
            }),
            Ok(Err(join_err)) => Err(ParseError::new(
                ErrorCode::InvalidFormat,
                format!("strategy {} aborted: {join_err}", strategy.name()),
            )),
            Err(_) => {
                cancel.cancel();
                debug!(
                    "Strategy {} timed out after {:?}",
                    strategy.name(),
                    timeout
                );
                Err(ParseError::timeout(
                    &hints.resource_path,
                    &format!("{timeout:?}"),
                ))
            }
        }
    }

    fn find_strategy(&self, name: &str) -> Option<Arc<dyn ParserStrategy>> {
        self.strategies.iter().find(|s| s.name() == name).cloned()
    }

    fn log_failure(&self, raw: &str, err: &ParseError) {
        if !self.config.log_raw_on_error {
            debug!("Parse failed: {}", err);
            return;
        }
        debug!(
            "Parse failed: {} (raw output {} bytes, sha256 {}): {}",
            err,
            raw.len(),
            fingerprint(raw),
            truncate_chars(raw, self.config.max_log_output_size)
        );
    }
}

/// Cache key for the hints; `None` disables caching for the call.
fn cache_key(hints: &ParseHints) -> Option<String> {
    if hints.resource_path.is_empty() {
        return None;
    }
    let command = hints.command_type.map_or("", |c| c.as_str());
    Some(format!("{}:{}", hints.resource_path, command))
}

/// Short hex digest used to correlate truncated log snippets.
fn fingerprint(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher
        .finalize()
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}
