//! Fiat valuation snapshots

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::ExchangeRate;

/// Base units per whole coin
pub const BASE_UNITS_PER_COIN: i64 = 100_000_000;

/// Fiat valuation of an amount at a point in time
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatPayment {
    /// Exchange that supplied the rate
    pub exchange_name: Option<String>,
    /// Local currency units per whole coin
    pub rate: Option<Decimal>,
    /// ISO 4217 currency code
    pub currency: Option<String>,
    /// Converted amount in local currency
    pub amount: Option<Decimal>,
}

impl FiatPayment {
    /// Value `amount` (base units) at the given rate.
    ///
    /// With no rate every field is absent. A zero or overflowing conversion
    /// leaves only the amount absent.
    pub fn valued_at(amount: i64, rate: Option<&ExchangeRate>) -> Self {
        match rate {
            Some(rate) => Self {
                exchange_name: Some(rate.exchange_name.clone()),
                rate: Some(rate.rate),
                currency: Some(rate.currency.clone()),
                amount: to_local_amount(amount, rate.rate).filter(|local| !local.is_zero()),
            },
            None => Self::default(),
        }
    }

    /// Whether no field is present
    pub fn is_empty(&self) -> bool {
        self.exchange_name.is_none()
            && self.rate.is_none()
            && self.currency.is_none()
            && self.amount.is_none()
    }
}

/// Convert base units to local currency, `None` on overflow
pub fn to_local_amount(amount: i64, rate: Decimal) -> Option<Decimal> {
    Decimal::from(amount)
        .checked_mul(rate)?
        .checked_div(Decimal::from(BASE_UNITS_PER_COIN))
}
