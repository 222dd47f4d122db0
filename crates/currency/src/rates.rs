//! Exchange-rate lookup and conversion.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use orderlink_core::CompanyId;

use crate::code::CurrencyCode;

#[derive(Debug, Error)]
pub enum RateError {
    /// No rate is known for the currency on or before the date.
    #[error("no {currency} rate on or before {date}")]
    Missing {
        currency: CurrencyCode,
        date: NaiveDate,
    },

    /// The company has never recorded the currency.
    #[error("unknown currency {0} for company")]
    UnknownCurrency(CurrencyCode),

    #[error("rate for {0} is zero")]
    ZeroRate(CurrencyCode),

    /// Failure inside an external rate provider.
    #[error("rate provider failed: {0}")]
    Provider(#[from] anyhow::Error),
}

/// Rate lookup for one company at one date.
pub trait ExchangeRates: Send + Sync {
    /// Units of `currency` per one unit of the company currency on `date`.
    fn rate(
        &self,
        company_id: CompanyId,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Decimal, RateError>;
}

/// Convert `amount` from one currency to another at the rates in effect on `date`.
///
/// Same currency is the identity and performs no lookup. The result is rounded to
/// the target currency's minor units.
pub fn convert(
    rates: &dyn ExchangeRates,
    company_id: CompanyId,
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
    date: NaiveDate,
) -> Result<Decimal, RateError> {
    if from == to {
        return Ok(amount);
    }

    let from_rate = rates.rate(company_id, from, date)?;
    if from_rate.is_zero() {
        return Err(RateError::ZeroRate(from.clone()));
    }
    let to_rate = rates.rate(company_id, to, date)?;

    Ok((amount * to_rate / from_rate).round_dp(to.decimal_places()))
}

#[derive(Debug, Default)]
struct CompanyRates {
    base: Option<CurrencyCode>,
    history: HashMap<CurrencyCode, BTreeMap<NaiveDate, Decimal>>,
}

/// In-memory, per-company rate history.
///
/// The rate used for a date is the latest one recorded on or before it. The
/// company's base currency always has rate 1.
#[derive(Debug, Default)]
pub struct RateTable {
    companies: RwLock<HashMap<CompanyId, CompanyRates>>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_base_currency(&self, company_id: CompanyId, currency: CurrencyCode) {
        if let Ok(mut companies) = self.companies.write() {
            companies.entry(company_id).or_default().base = Some(currency);
        }
    }

    pub fn set_rate(
        &self,
        company_id: CompanyId,
        currency: CurrencyCode,
        date: NaiveDate,
        rate: Decimal,
    ) {
        if let Ok(mut companies) = self.companies.write() {
            companies
                .entry(company_id)
                .or_default()
                .history
                .entry(currency)
                .or_default()
                .insert(date, rate);
        }
    }
}

impl ExchangeRates for RateTable {
    fn rate(
        &self,
        company_id: CompanyId,
        currency: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Decimal, RateError> {
        let companies = self
            .companies
            .read()
            .map_err(|_| anyhow::anyhow!("rate table lock poisoned"))?;

        let Some(company) = companies.get(&company_id) else {
            return Err(RateError::UnknownCurrency(currency.clone()));
        };
        if company.base.as_ref() == Some(currency) {
            return Ok(Decimal::ONE);
        }

        let history = company
            .history
            .get(currency)
            .ok_or_else(|| RateError::UnknownCurrency(currency.clone()))?;

        history
            .range(..=date)
            .next_back()
            .map(|(_, rate)| *rate)
            .ok_or_else(|| RateError::Missing {
                currency: currency.clone(),
                date,
            })
    }
}
