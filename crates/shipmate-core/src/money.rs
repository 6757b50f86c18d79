//! # Money Module
//!
//! Provides the `Money` type, the `VatRate` type and the cached
//! `ExchangeRate` value used by the pricing pipeline.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    130.00 / 25.0 * 1.21 = 6.291999999999999  ❌ WRONG!                  │
//! │                                                                         │
//! │  Tariffs are converted between currencies, so integer cents alone       │
//! │  cannot hold the intermediate quotient.                                 │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal + round-half-up after every stage           │
//! │    130.00 / 25.0 = 5.2 → 5.20                                           │
//! │    5.20 × 1.21  = 6.292 → 6.29                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use shipmate_core::money::{Money, VatRate};
//!
//! let price = Money::new(Decimal::new(520, 2)); // 5.20
//! let with_vat = price.with_vat(VatRate::from_bps(2100));
//! assert_eq!(with_vat.to_string(), "6.29");
//! ```

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Number of fractional digits every monetary value carries.
pub const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount with exactly two fractional digits.
///
/// ## Invariant
/// Every constructor rounds half-up (midpoint away from zero) to
/// [`MONEY_SCALE`] digits and rescales, so `amount().scale() == 2` always
/// holds. No stage may silently truncate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value, rounding half-up to 2 decimal places.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use shipmate_core::money::Money;
    ///
    /// assert_eq!(Money::new(Decimal::new(6292, 3)).to_string(), "6.29");
    /// assert_eq!(Money::new(Decimal::new(6295, 3)).to_string(), "6.30");
    /// assert_eq!(Money::new(Decimal::from(130)).to_string(), "130.00");
    /// ```
    pub fn new(amount: Decimal) -> Self {
        Money(round_half_up(amount))
    }

    /// Returns zero money value.
    pub fn zero() -> Self {
        Money::new(Decimal::ZERO)
    }

    /// Returns the underlying decimal (always scale 2).
    #[inline]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Takes a percentage of this amount (e.g. a fuel surcharge).
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use shipmate_core::money::Money;
    ///
    /// let base = Money::new(Decimal::from(130));
    /// let fuel = base.percentage(Decimal::new(125, 1)); // 12.5 %
    /// assert_eq!(fuel.to_string(), "16.25");
    /// ```
    pub fn percentage(&self, pct: Decimal) -> Money {
        Money::new(self.0 * pct / Decimal::ONE_HUNDRED)
    }

    /// Divides by an exchange rate (local currency per settlement unit).
    ///
    /// Returns `None` for a zero or negative rate.
    pub fn convert(&self, local_per_unit: Decimal) -> Option<Money> {
        if local_per_unit <= Decimal::ZERO {
            return None;
        }
        self.0.checked_div(local_per_unit).map(Money::new)
    }

    /// Applies VAT: `amount * (1 + rate)`, rounded half-up.
    pub fn with_vat(&self, rate: VatRate) -> Money {
        Money::new(self.0 * rate.multiplier())
    }
}

/// Rounds half-up to [`MONEY_SCALE`] digits and pads to exactly that scale.
fn round_half_up(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Sum of two 2-digit amounts is exact; rounding again keeps the scale pinned.
impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Money::new(self.0 + other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 2100 bps = 21% (Czech standard rate).
/// The rate is always a parameter of the pipeline, never a hidden constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRate(u32);

impl VatRate {
    /// Creates a VAT rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns `1 + rate` as an exact decimal (2100 bps → 1.2100).
    pub fn multiplier(&self) -> Decimal {
        Decimal::new(10_000 + i64::from(self.0), 4)
    }

    /// Zero VAT rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::zero()
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// Where the exchange rate handed to a calculation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRateOrigin {
    /// Fetched from the upstream source during this call.
    Live,
    /// Served from the cache.
    Cached,
    /// Upstream unavailable; the configured fallback constant.
    Fallback,
}

/// A cached conversion rate: local currency units per one settlement unit
/// (e.g. 25.0 CZK per EUR).
///
/// Values are immutable once built; the provider swaps whole values in and
/// out of its cache instead of mutating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub origin: ExchangeRateOrigin,
}

impl ExchangeRate {
    /// Builds a freshly fetched rate.
    pub fn live(rate: Decimal, fetched_at: DateTime<Utc>, ttl_secs: u64) -> Self {
        ExchangeRate {
            rate,
            fetched_at,
            ttl_secs,
            origin: ExchangeRateOrigin::Live,
        }
    }

    /// Builds a fallback rate that is retried after `retry_secs`.
    pub fn fallback(rate: Decimal, fetched_at: DateTime<Utc>, retry_secs: u64) -> Self {
        ExchangeRate {
            rate,
            fetched_at,
            ttl_secs: retry_secs,
            origin: ExchangeRateOrigin::Fallback,
        }
    }

    /// Returns the moment this value stops being served from cache.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000);
        self.fetched_at
            .checked_add_signed(Duration::seconds(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Checks whether the value is still fresh at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    /// Returns a copy re-labelled as served from cache. Fallback values keep
    /// their origin so callers can still see the degradation.
    pub fn as_cached(&self) -> Self {
        let mut copy = self.clone();
        if copy.origin == ExchangeRateOrigin::Live {
            copy.origin = ExchangeRateOrigin::Cached;
        }
        copy
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
