//! # Postal Code Rules
//!
//! Country-specific normalization of postal codes and the local dataset
//! check. Network fallback lives in the service crate; this module only
//! decides which keys to try and how to present the result.
//!
//! ## Country Rules
//! ```text
//! ┌──────────────────────────────────┬──────────────────────────────────────┐
//! │ Countries                        │ Keys tried (after normalize)         │
//! ├──────────────────────────────────┼──────────────────────────────────────┤
//! │ CZ SK                            │ 5 digits, shown as "NNN NN"          │
//! │ AT CH DK BE HU NL                │ first four digits                    │
//! │ GB IE                            │ full code, then outward code         │
//! │ PL PT SE DE FR ES IT SI HR RO    │ full code, then digits only          │
//! │ BG LT LV EE FI GR                │                                      │
//! │ anything else                    │ full code                            │
//! └──────────────────────────────────┴──────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Normalization
// =============================================================================

/// Uppercases and strips spaces and dashes.
///
/// ## Example
/// ```rust
/// use shipmate_core::postal::normalize;
///
/// assert_eq!(normalize(" 602-00 "), "60200");
/// assert_eq!(normalize("sw1a 1aa"), "SW1A1AA");
/// ```
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// How a country's codes are matched against its dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostalRule {
    /// Exactly five digits, displayed `NNN NN`.
    FiveDigitSpaced,
    /// Only the first four digits identify the area.
    FirstFourDigits,
    /// Full code, falling back to the outward code.
    OutwardCode,
    /// Full code, falling back to its digits.
    DigitsOnly,
    Exact,
}

impl PostalRule {
    pub fn for_country(country: &str) -> Self {
        match country {
            "CZ" | "SK" => PostalRule::FiveDigitSpaced,
            "AT" | "CH" | "DK" | "BE" | "HU" | "NL" => PostalRule::FirstFourDigits,
            "GB" | "IE" => PostalRule::OutwardCode,
            "PL" | "PT" | "SE" | "DE" | "FR" | "ES" | "IT" | "SI" | "HR" | "RO" | "BG" | "LT"
            | "LV" | "EE" | "FI" | "GR" => PostalRule::DigitsOnly,
            _ => PostalRule::Exact,
        }
    }
}

/// Checks the shape of a normalized code before any lookup.
pub fn shape_error(country: &str, normalized: &str) -> Option<String> {
    if normalized.is_empty() {
        return Some("postal code is empty".to_string());
    }
    if normalized.len() > 10 {
        return Some("postal code is too long".to_string());
    }
    if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some("postal code contains invalid characters".to_string());
    }
    match PostalRule::for_country(country) {
        PostalRule::FiveDigitSpaced
            if normalized.len() != 5 || !normalized.chars().all(|c| c.is_ascii_digit()) =>
        {
            Some(format!("{country} postal codes have five digits"))
        }
        PostalRule::FirstFourDigits if leading_digits(normalized).len() < 4 => {
            Some(format!("{country} postal codes start with four digits"))
        }
        _ => None,
    }
}

/// Dataset keys to try for a raw code, most specific first, no duplicates.
///
/// ## Example
/// ```rust
/// use shipmate_core::postal::candidates;
///
/// assert_eq!(candidates("CZ", "602 00"), vec!["60200"]);
/// assert_eq!(candidates("NL", "1012 AB"), vec!["1012"]);
/// assert_eq!(candidates("GB", "SW1A 1AA"), vec!["SW1A1AA", "SW1A"]);
/// assert_eq!(candidates("DE", "D-10115"), vec!["D10115", "10115"]);
/// ```
pub fn candidates(country: &str, raw: &str) -> Vec<String> {
    let code = normalize(raw);
    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: String| {
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    };

    match PostalRule::for_country(country) {
        PostalRule::FiveDigitSpaced | PostalRule::Exact => push(code),
        PostalRule::FirstFourDigits => push(leading_digits(&code).chars().take(4).collect()),
        PostalRule::OutwardCode => {
            let len = code.chars().count();
            let outward: String = code.chars().take(len.saturating_sub(3)).collect();
            push(code);
            push(outward);
        }
        PostalRule::DigitsOnly => {
            let digits: String = code.chars().filter(char::is_ascii_digit).collect();
            push(code);
            push(digits);
        }
    }
    keys
}

/// Presentation form of a matched key.
pub fn display_format(country: &str, code: &str) -> String {
    match PostalRule::for_country(country) {
        PostalRule::FiveDigitSpaced if code.len() == 5 && code.chars().all(|c| c.is_ascii_digit()) => {
            format!("{} {}", &code[..3], &code[3..])
        }
        _ => code.to_string(),
    }
}

fn leading_digits(code: &str) -> &str {
    let end = code
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(code.len(), |(i, _)| i);
    &code[..end]
}

// =============================================================================
// Local Check
// =============================================================================

/// One country's postal dataset, keyed by normalized code.
pub trait PostalIndex {
    /// Returns the city for an exact key, if present.
    fn city_for(&self, key: &str) -> Option<&str>;
}

/// Successful local match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatch {
    pub key: String,
    pub city: String,
}

/// Tries every candidate key against the dataset.
pub fn check_local(index: &dyn PostalIndex, country: &str, raw: &str) -> Option<LocalMatch> {
    candidates(country, raw).into_iter().find_map(|key| {
        index.city_for(&key).map(|city| LocalMatch {
            city: city.to_string(),
            key,
        })
    })
}

// =============================================================================
// Resolution
// =============================================================================

/// Which check produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostalSource {
    Local,
    Remote,
    None,
}

/// Outcome of resolving a destination postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalResolution {
    pub valid: bool,
    pub normalized_code: Option<String>,
    pub country: String,
    pub city: Option<String>,
    pub source: PostalSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PostalResolution {
    pub fn local(country: &str, matched: LocalMatch) -> Self {
        PostalResolution {
            valid: true,
            normalized_code: Some(display_format(country, &matched.key)),
            country: country.to_string(),
            city: Some(matched.city),
            source: PostalSource::Local,
            error: None,
        }
    }

    pub fn remote(country: &str, code: &str, city: Option<String>) -> Self {
        PostalResolution {
            valid: true,
            normalized_code: Some(display_format(country, &normalize(code))),
            country: country.to_string(),
            city,
            source: PostalSource::Remote,
            error: None,
        }
    }

    pub fn invalid(country: &str, error: impl Into<String>) -> Self {
        PostalResolution {
            valid: false,
            normalized_code: None,
            country: country.to_string(),
            city: None,
            source: PostalSource::None,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
