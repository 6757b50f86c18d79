//! # Exchange Rate Provider
//!
//! Converts the carriers' local currency (CZK) into the settlement currency.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_rate()                                                             │
//! │      │                                                                  │
//! │      ├── cache hit (fresh) ─────────────────────► rate (origin=cached)  │
//! │      │                                                                  │
//! │      └── source.fetch()  (no lock held)                                 │
//! │              │                                                          │
//! │              ├── Ok(rate)  → cache for ttl_secs ─► rate (origin=live)   │
//! │              │                                                          │
//! │              └── Err(..)   → warn!, cache the fallback for              │
//! │                              fallback_retry_secs ► 25.0 (fallback)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `get_rate()` never fails. Two callers racing on an empty cache both
//! fetch; the later write wins.
//!
//! ## Fixing Format
//! ```text
//! 17 Oct 2026 #201
//! Country|Currency|Amount|Code|Rate
//! EMU|euro|1|EUR|24.330
//! Hungary|forint|100|HUF|6.512
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use url::Url;

use shipmate_core::cache::{Cache, Clock, SystemClock, TtlCache};
use shipmate_core::money::{ExchangeRate, ExchangeRateOrigin};

use crate::config::ExchangeSettings;
use crate::error::{ServiceError, ServiceResult};
use crate::retry::{with_retries, LinearBackoff};

// =============================================================================
// Rate Source
// =============================================================================

/// Upstream that knows today's rate (local currency per settlement unit).
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self) -> ServiceResult<Decimal>;
}

/// Daily fixing published as pipe-separated text.
pub struct CnbRateSource {
    client: Client,
    url: Url,
    currency: String,
    min_plausible: Decimal,
    max_plausible: Decimal,
    backoff_step: Duration,
    max_retries: u32,
}

impl CnbRateSource {
    pub fn new(settings: &ExchangeSettings) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ServiceError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(CnbRateSource {
            client,
            url: Url::parse(&settings.url)?,
            currency: settings.currency.clone(),
            min_plausible: settings.min_plausible,
            max_plausible: settings.max_plausible,
            backoff_step: settings.backoff_step(),
            max_retries: settings.max_retries,
        })
    }

    async fn download(&self) -> ServiceResult<String> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl RateSource for CnbRateSource {
    async fn fetch(&self) -> ServiceResult<Decimal> {
        let schedule = LinearBackoff::new(self.backoff_step, self.max_retries);
        let body = with_retries("exchange-rate", schedule, || self.download()).await?;
        parse_fixing(&body, &self.currency, self.min_plausible, self.max_plausible)
    }
}

/// Extracts `rate / amount` for `currency` from a daily fixing.
///
/// ## Errors
/// - `InvalidPayload` when the row is missing, malformed or outside
///   `[min_plausible, max_plausible]`
pub fn parse_fixing(
    body: &str,
    currency: &str,
    min_plausible: Decimal,
    max_plausible: Decimal,
) -> ServiceResult<Decimal> {
    // Line 1 is the date, line 2 the header
    let row = body
        .lines()
        .skip(2)
        .map(|line| line.split('|').map(str::trim).collect::<Vec<_>>())
        .find(|cols| cols.len() == 5 && cols[3].eq_ignore_ascii_case(currency))
        .ok_or_else(|| ServiceError::InvalidPayload(format!("no {currency} row in fixing")))?;

    let amount = parse_number(row[2])
        .filter(|a| *a > Decimal::ZERO)
        .ok_or_else(|| ServiceError::InvalidPayload(format!("bad amount '{}' for {currency}", row[2])))?;
    let rate = parse_number(row[4])
        .ok_or_else(|| ServiceError::InvalidPayload(format!("bad rate '{}' for {currency}", row[4])))?;

    let per_unit = rate / amount;
    if per_unit < min_plausible || per_unit > max_plausible {
        return Err(ServiceError::InvalidPayload(format!(
            "{currency} rate {per_unit} outside plausible range [{min_plausible}, {max_plausible}]"
        )));
    }
    Ok(per_unit)
}

// Both "24.330" and the Czech "24,330"
fn parse_number(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', ".")).ok()
}

// =============================================================================
// Provider
// =============================================================================

/// Cached exchange rate with a constant fallback.
pub struct ExchangeRateProvider {
    source: Arc<dyn RateSource>,
    cache: Arc<dyn Cache<String, ExchangeRate>>,
    clock: Arc<dyn Clock>,
    currency: String,
    ttl_secs: u64,
    fallback_rate: Decimal,
    fallback_retry_secs: u64,
}

impl ExchangeRateProvider {
    /// Builds a provider around any source, cache and clock.
    pub fn new(
        source: Arc<dyn RateSource>,
        cache: Arc<dyn Cache<String, ExchangeRate>>,
        clock: Arc<dyn Clock>,
        settings: &ExchangeSettings,
    ) -> Self {
        ExchangeRateProvider {
            source,
            cache,
            clock,
            currency: settings.currency.clone(),
            ttl_secs: settings.ttl_secs,
            fallback_rate: settings.fallback_rate,
            fallback_retry_secs: settings.fallback_retry_secs,
        }
    }

    /// Provider fetching the configured fixing URL, on the wall clock.
    pub fn from_settings(settings: &ExchangeSettings) -> ServiceResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache: Arc<TtlCache<String, ExchangeRate>> = Arc::new(TtlCache::new(4, Arc::clone(&clock)));
        let source = Arc::new(CnbRateSource::new(settings)?);
        Ok(Self::new(source, cache, clock, settings))
    }

    /// Returns today's rate. Never fails: upstream problems yield the
    /// fallback constant, marked with [`ExchangeRateOrigin::Fallback`].
    pub async fn get_rate(&self) -> ExchangeRate {
        if let Some(cached) = self.cache.get(&self.currency) {
            debug!(currency = %self.currency, rate = %cached.rate, "Exchange rate served from cache");
            return cached.as_cached();
        }

        let fetched_at = self.clock.now();
        let (value, ttl_secs) = match self.source.fetch().await {
            Ok(rate) => {
                info!(currency = %self.currency, %rate, "Fetched exchange rate");
                (ExchangeRate::live(rate, fetched_at, self.ttl_secs), self.ttl_secs)
            }
            Err(err) => {
                warn!(
                    currency = %self.currency,
                    error = %err,
                    fallback = %self.fallback_rate,
                    "Exchange rate unavailable, using fallback"
                );
                (
                    ExchangeRate::fallback(self.fallback_rate, fetched_at, self.fallback_retry_secs),
                    self.fallback_retry_secs,
                )
            }
        };

        self.cache
            .set(self.currency.clone(), value.clone(), Duration::from_secs(ttl_secs));
        value
    }

    /// Drops the cached value so the next call fetches again.
    pub fn invalidate(&self) {
        self.cache.remove(&self.currency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;
    use shipmate_core::cache::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FIXING: &str = "\
17 Oct 2026 #201
Country|Currency|Amount|Code|Rate
Australia|dollar|1|AUD|14.939
EMU|euro|1|EUR|24.330
Hungary|forint|100|HUF|6.512
";

    fn range() -> (Decimal, Decimal) {
        (Decimal::from(15), Decimal::from(40))
    }

    #[test]
    fn test_parse_fixing() {
        let (min, max) = range();
        assert_eq!(parse_fixing(FIXING, "EUR", min, max).unwrap(), Decimal::new(24330, 3));
    }

    #[test]
    fn test_parse_divides_by_amount() {
        let rate = parse_fixing(FIXING, "HUF", Decimal::ZERO, Decimal::ONE).unwrap();
        assert_eq!(rate, Decimal::new(6512, 5));
    }

    #[test]
    fn test_parse_decimal_comma() {
        let body = "17.10.2026 #201\nzemě|měna|množství|kód|kurz\nEMU|euro|1|EUR|24,330\n";
        let (min, max) = range();
        assert_eq!(parse_fixing(body, "EUR", min, max).unwrap(), Decimal::new(24330, 3));
    }

    #[test]
    fn test_parse_rejects_implausible_and_missing() {
        let (min, max) = range();
        let body = "date\nheader\nEMU|euro|1|EUR|2.433\n";
        assert!(matches!(
            parse_fixing(body, "EUR", min, max),
            Err(ServiceError::InvalidPayload(_))
        ));
        assert!(parse_fixing(FIXING, "USD", min, max).is_err());
        assert!(parse_fixing("", "EUR", min, max).is_err());
    }

    struct CountingSource {
        rate: Option<Decimal>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RateSource for CountingSource {
        async fn fetch(&self) -> ServiceResult<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate
                .ok_or_else(|| ServiceError::Http("connection refused".into()))
        }
    }

    fn provider(rate: Option<Decimal>) -> (ExchangeRateProvider, Arc<CountingSource>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap()));
        let source = Arc::new(CountingSource {
            rate,
            calls: AtomicU32::new(0),
        });
        let cache: Arc<TtlCache<String, ExchangeRate>> =
            Arc::new(TtlCache::new(4, clock.clone() as Arc<dyn Clock>));
        let provider = ExchangeRateProvider::new(
            source.clone(),
            cache,
            clock.clone(),
            &ExchangeSettings::default(),
        );
        (provider, source, clock)
    }

    #[tokio::test]
    async fn test_live_rate_cached_for_a_day() {
        let (provider, source, clock) = provider(Some(Decimal::new(2433, 2)));

        let first = provider.get_rate().await;
        assert_eq!(first.origin, ExchangeRateOrigin::Live);
        assert_eq!(first.rate, Decimal::new(2433, 2));

        clock.advance(Duration::from_secs(23 * 3600));
        let second = provider.get_rate().await;
        assert_eq!(second.origin, ExchangeRateOrigin::Cached);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(2 * 3600));
        assert_eq!(provider.get_rate().await.origin, ExchangeRateOrigin::Live);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_when_source_fails() {
        let (provider, source, clock) = provider(None);

        let rate = provider.get_rate().await;
        assert_eq!(rate.origin, ExchangeRateOrigin::Fallback);
        assert_eq!(rate.rate, Decimal::new(250, 1));

        // Fallback is served from cache until the retry window passes
        assert_eq!(provider.get_rate().await.origin, ExchangeRateOrigin::Fallback);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(301));
        provider.get_rate().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fetch() {
        let (provider, source, _clock) = provider(Some(Decimal::from(25)));
        provider.get_rate().await;
        provider.invalidate();
        provider.get_rate().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    fn settings_for(server: &MockServer) -> ExchangeSettings {
        ExchangeSettings {
            url: server.url("/daily.txt"),
            backoff_ms: 1,
            max_retries: 1,
            ..ExchangeSettings::default()
        }
    }

    #[tokio::test]
    async fn test_cnb_source_over_http() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/daily.txt");
                then.status(200).body(FIXING);
            })
            .await;

        let source = CnbRateSource::new(&settings_for(&server)).unwrap();
        assert_eq!(source.fetch().await.unwrap(), Decimal::new(24330, 3));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_failure_falls_back_after_retries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/daily.txt");
                then.status(503);
            })
            .await;

        let provider = ExchangeRateProvider::from_settings(&settings_for(&server)).unwrap();
        let rate = provider.get_rate().await;

        assert_eq!(rate.origin, ExchangeRateOrigin::Fallback);
        assert_eq!(rate.rate, Decimal::new(250, 1));
        // First attempt plus one retry
        mock.assert_hits_async(2).await;
    }
}
