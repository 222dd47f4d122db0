//! Currencies, money amounts and exchange-rate conversion.
//!
//! Rates follow the "units of currency per one unit of the company currency"
//! convention: the company currency has rate 1 and converting `amount` from `A` to
//! `B` on a date is `amount * rate(B) / rate(A)`.

pub mod code;
pub mod money;
pub mod rates;

pub use code::CurrencyCode;
pub use money::{Money, format_amount};
pub use rates::{ExchangeRates, RateError, RateTable, convert};
