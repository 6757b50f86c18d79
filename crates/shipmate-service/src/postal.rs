//! # Postal Resolver
//!
//! Validates a destination postal code against the local dataset first and
//! a remote geocoder second.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  START ──► LOCAL_CHECK ──┬── hit && !prefer_remote ──► VALID_LOCAL     │
//! │                          │                                 │            │
//! │                          └── miss / prefer_remote          │            │
//! │                                   │                        │            │
//! │                                   ▼                        │            │
//! │                            REMOTE_CHECK                    │            │
//! │                    found ──► source=remote                 │            │
//! │                    not found ──► local result or rejected  │            │
//! │                    unavailable ──► local result or none    │            │
//! │                                   │                        │            │
//! │                                   ▼                        ▼            │
//! │                                RESOLVED ◄──────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remote failures are logged and absorbed; `resolve` never fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use shipmate_core::cache::{Cache, Clock, SystemClock, TtlCache};
use shipmate_core::postal::{
    check_local, display_format, normalize, shape_error, LocalMatch, PostalResolution,
};
use shipmate_data::PostalDirectory;

use crate::config::PostalSettings;
use crate::error::{ServiceError, ServiceResult};
use crate::retry::{with_retries, LinearBackoff};

// =============================================================================
// Remote Lookup
// =============================================================================

/// A postal code the remote service knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMatch {
    pub city: Option<String>,
}

/// Remote postal validation.
///
/// `Ok(None)` means the service answered and does not know the code;
/// `Err` means it could not be asked.
#[async_trait]
pub trait RemotePostalLookup: Send + Sync {
    async fn lookup(&self, country: &str, postal_code: &str) -> ServiceResult<Option<RemoteMatch>>;
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    address: Option<PlaceAddress>,
}

#[derive(Debug, Deserialize)]
struct PlaceAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
}

impl PlaceAddress {
    fn city(self) -> Option<String> {
        self.city.or(self.town).or(self.village).or(self.municipality)
    }
}

/// Nominatim-style search endpoint with a per-request cache.
///
/// Answers (found and not found) are cached under the full request URL for
/// `cache_ttl_secs`; errors are not cached.
pub struct HttpPostalLookup {
    client: Client,
    endpoint: Url,
    cache: Arc<dyn Cache<String, Option<RemoteMatch>>>,
    ttl: Duration,
    backoff_step: Duration,
    max_retries: u32,
}

impl HttpPostalLookup {
    pub fn new(
        endpoint: &str,
        settings: &PostalSettings,
        cache: Arc<dyn Cache<String, Option<RemoteMatch>>>,
    ) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| ServiceError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(HttpPostalLookup {
            client,
            endpoint: Url::parse(endpoint)?,
            cache,
            ttl: settings.cache_ttl(),
            backoff_step: settings.backoff_step(),
            max_retries: settings.max_retries,
        })
    }

    /// Lookup with its own size-capped cache on the wall clock.
    pub fn from_settings(endpoint: &str, settings: &PostalSettings) -> ServiceResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache: Arc<TtlCache<String, Option<RemoteMatch>>> =
            Arc::new(TtlCache::new(settings.cache_capacity, clock));
        Self::new(endpoint, settings, cache)
    }

    fn request_url(&self, country: &str, postal_code: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("postalcode", postal_code)
            .append_pair("countrycodes", &country.to_ascii_lowercase())
            .append_pair("format", "jsonv2")
            .append_pair("addressdetails", "1")
            .append_pair("limit", "1");
        url
    }

    async fn fetch(&self, url: &Url) -> ServiceResult<Vec<Place>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RemotePostalLookup for HttpPostalLookup {
    async fn lookup(&self, country: &str, postal_code: &str) -> ServiceResult<Option<RemoteMatch>> {
        let url = self.request_url(country, postal_code);
        let key = url.to_string();
        if let Some(cached) = self.cache.get(&key) {
            debug!(country, postal_code, "Remote postal answer served from cache");
            return Ok(cached);
        }

        let schedule = LinearBackoff::new(self.backoff_step, self.max_retries);
        let places = with_retries("postal-lookup", schedule, || self.fetch(&url)).await?;
        let found = places.into_iter().next().map(|place| RemoteMatch {
            city: place.address.and_then(PlaceAddress::city),
        });

        self.cache.set(key, found.clone(), self.ttl);
        Ok(found)
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// How final a resolution is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Valid locally or remotely.
    Accepted,
    /// Malformed, or a source with data for the country does not know it.
    Rejected,
    /// Nothing could vouch either way (no dataset, remote unavailable).
    Unverified,
}

/// Resolution plus how much the caller may rely on a negative answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalCheck {
    pub resolution: PostalResolution,
    pub verdict: Verdict,
}

impl PostalCheck {
    fn accepted(resolution: PostalResolution) -> Self {
        PostalCheck {
            resolution,
            verdict: Verdict::Accepted,
        }
    }

    fn rejected(country: &str, reason: impl Into<String>) -> Self {
        PostalCheck {
            resolution: PostalResolution::invalid(country, reason),
            verdict: Verdict::Rejected,
        }
    }

    fn unverified(country: &str, reason: impl Into<String>) -> Self {
        PostalCheck {
            resolution: PostalResolution::invalid(country, reason),
            verdict: Verdict::Unverified,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.verdict == Verdict::Rejected
    }
}

/// Local-then-remote postal validation.
pub struct PostalResolver {
    directory: Arc<PostalDirectory>,
    remote: Option<Arc<dyn RemotePostalLookup>>,
    prefer_remote: bool,
}

impl PostalResolver {
    pub fn new(
        directory: Arc<PostalDirectory>,
        remote: Option<Arc<dyn RemotePostalLookup>>,
        prefer_remote: bool,
    ) -> Self {
        PostalResolver {
            directory,
            remote,
            prefer_remote,
        }
    }

    /// Resolver for the configured dataset directory and remote endpoint.
    pub fn from_settings(directory: Arc<PostalDirectory>, settings: &PostalSettings) -> ServiceResult<Self> {
        let remote = match settings.remote_url {
            Some(ref url) => {
                let lookup: Arc<dyn RemotePostalLookup> = Arc::new(HttpPostalLookup::from_settings(url, settings)?);
                Some(lookup)
            }
            None => None,
        };
        Ok(Self::new(directory, remote, settings.prefer_remote))
    }

    /// Resolves `postal_code` for an uppercase ISO country code.
    pub async fn resolve(&self, country: &str, postal_code: &str) -> PostalCheck {
        // LOCAL_CHECK
        let normalized = normalize(postal_code);
        if let Some(reason) = shape_error(country, &normalized) {
            debug!(country, postal_code, %reason, "Postal code rejected by shape");
            return PostalCheck::rejected(country, reason);
        }

        let (local, has_dataset) = match self.directory.dataset(country) {
            Ok(dataset) => (check_local(dataset.as_ref(), country, postal_code), !dataset.is_empty()),
            Err(err) => {
                warn!(country, error = %err, "Postal dataset unavailable, skipping local check");
                (None, false)
            }
        };

        if let Some(ref matched) = local {
            if !self.prefer_remote || self.remote.is_none() {
                debug!(country, key = %matched.key, "Postal code valid locally");
                return PostalCheck::accepted(PostalResolution::local(country, matched.clone()));
            }
        }

        // REMOTE_CHECK
        let Some(remote) = &self.remote else {
            return Self::local_only(country, postal_code, local, has_dataset);
        };

        let shown = display_format(country, &normalized);
        match remote.lookup(country, &shown).await {
            Ok(Some(found)) => {
                let city = found.city.or_else(|| local.map(|m| m.city));
                info!(country, postal_code = %shown, "Postal code valid remotely");
                PostalCheck::accepted(PostalResolution::remote(country, &normalized, city))
            }
            Ok(None) => match local {
                Some(matched) => PostalCheck::accepted(PostalResolution::local(country, matched)),
                None => PostalCheck::rejected(country, format!("postal code {shown} does not exist in {country}")),
            },
            Err(err) => {
                warn!(country, postal_code = %shown, error = %err, "Remote postal lookup failed, using local result");
                Self::local_only(country, postal_code, local, has_dataset)
            }
        }
    }

    fn local_only(country: &str, postal_code: &str, local: Option<LocalMatch>, has_dataset: bool) -> PostalCheck {
        match local {
            Some(matched) => PostalCheck::accepted(PostalResolution::local(country, matched)),
            None if has_dataset => PostalCheck::rejected(
                country,
                format!("postal code {} not found in {country} dataset", postal_code.trim()),
            ),
            None => PostalCheck::unverified(country, "postal code could not be verified"),
        }
    }
}
