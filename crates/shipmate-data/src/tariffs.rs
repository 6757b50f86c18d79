//! # Tariff Loader
//!
//! Reads bulk tariff rows into a [`RateTable`].
//!
//! ## File Format
//! ```text
//! courier,country,channel,category,weight_tier,address_bundle,price,cod_fee,estimate
//! dpd,CZ,PUDO,standard,1,one,89.00,35.00,1-2 days
//! dpd,CZ,HD,oversized,31.5,multi,412.50,35.00,2-3 days
//! packeta,SK,HD,standard,10,one,130.00,,2-4 days
//! ```
//! Prices are in the carrier's local currency. `cod_fee` may be empty.
//! `weight_tier` is a threshold in kg (`10` and `10.0` are the same tier) or
//! `over_limit`.
//! Duplicate keys are kept; the selector picks the cheapest.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use shipmate_core::carrier::Carrier;
use shipmate_core::rates::{RateTable, ShippingRate, OVER_LIMIT};
use shipmate_core::types::{AddressBundle, Category, Channel};
use shipmate_core::validation::validate_country_code;

use crate::error::{record_line, DataError, DataResult};

/// Raw CSV row; enums and money are parsed by hand so errors name the cell.
#[derive(Debug, Deserialize)]
struct TariffRecord {
    courier: String,
    country: String,
    channel: String,
    category: String,
    weight_tier: String,
    address_bundle: String,
    price: String,
    #[serde(default)]
    cod_fee: Option<String>,
    #[serde(default)]
    estimate: String,
}

impl TariffRecord {
    fn into_rate(self) -> Result<ShippingRate, String> {
        let courier = Carrier::from_str(&self.courier).map_err(|e| e.to_string())?;
        let country = validate_country_code(&self.country).map_err(|e| e.to_string())?;
        let channel = Channel::from_str(&self.channel).map_err(|e| e.to_string())?;
        let category = Category::from_str(&self.category).map_err(|e| e.to_string())?;
        let address_bundle = AddressBundle::from_str(&self.address_bundle).map_err(|e| e.to_string())?;

        let weight_tier = parse_tier(&self.weight_tier)?;

        let price = parse_amount("price", &self.price)?;
        let cod_fee = match self.cod_fee.as_deref().map(str::trim) {
            None | Some("") => Decimal::ZERO,
            Some(raw) => parse_amount("cod_fee", raw)?,
        };

        Ok(ShippingRate {
            courier,
            country,
            channel,
            category,
            weight_tier,
            address_bundle,
            price,
            cod_fee,
            estimate: self.estimate.trim().to_string(),
        })
    }
}

/// Tier codes are matched as text, so `10.0` and `31.50` are normalized to
/// the `10` / `31.5` form the tier table produces.
fn parse_tier(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("weight_tier is required".to_string());
    }
    if raw.eq_ignore_ascii_case(OVER_LIMIT) {
        return Ok(OVER_LIMIT.to_string());
    }
    let tier = Decimal::from_str(raw)
        .map_err(|_| format!("weight_tier '{raw}' is neither a number nor '{OVER_LIMIT}'"))?;
    if tier <= Decimal::ZERO {
        return Err(format!("weight_tier '{raw}' must be positive"));
    }
    Ok(tier.normalize().to_string())
}

fn parse_amount(field: &str, raw: &str) -> Result<Decimal, String> {
    let amount = Decimal::from_str(raw.trim())
        .map_err(|e| format!("{field} '{}' is not a decimal: {e}", raw.trim()))?;
    if amount.is_sign_negative() {
        return Err(format!("{field} must not be negative"));
    }
    Ok(amount)
}

/// Loads a tariff file.
pub fn load_rate_table(path: impl AsRef<Path>) -> DataResult<RateTable> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| DataError::io(&name, e))?;
    let table = read_rate_table(file, &name)?;
    info!(path = %name, rows = table.len(), "Loaded tariff table");
    Ok(table)
}

/// Reads tariff rows from any reader. `source` names it in errors.
pub fn read_rate_table<R: Read>(reader: R, source: &str) -> DataResult<RateTable> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv.headers().map_err(|e| DataError::csv(source, e))?.clone();

    let mut table = RateTable::new();
    for record in csv.records() {
        let record = record.map_err(|e| DataError::csv(source, e))?;
        let line = record_line(&record);
        let row: TariffRecord = record
            .deserialize(Some(&headers))
            .map_err(|e| DataError::csv(source, e))?;
        let rate = row
            .into_rate()
            .map_err(|message| DataError::invalid_row(source, line, message))?;
        table.insert(rate);
    }
    Ok(table)
}
