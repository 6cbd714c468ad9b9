//! Exchange rates between the store's home currency and the currencies payment providers settle in.
//!
//! Rates are set by an administrator (or a feed) and stored with a timestamp. A rate older than the configured bound is
//! refused rather than silently used.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::exchange_objects::ExchangeRate,
    traits::{ExchangeRateError, ExchangeRates},
};

pub struct ExchangeRateApi<B> {
    db: B,
}

impl<B> Debug for ExchangeRateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<B> ExchangeRateApi<B>
where B: ExchangeRates
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn fetch_last_rate(&self, base: &str, quote: &str) -> Result<ExchangeRate, ExchangeRateError> {
        self.db.fetch_last_rate(base, quote).await
    }

    /// The latest rate, as long as it is no older than `max_age`
    pub async fn current_rate(
        &self,
        base: &str,
        quote: &str,
        max_age: Duration,
    ) -> Result<ExchangeRate, ExchangeRateError> {
        let rate = self.db.fetch_last_rate(base, quote).await?;
        if rate.is_stale(max_age, Utc::now()) {
            warn!("💱️ The {} rate was last set at {} and is too old to use", rate.pair(), rate.updated_at);
            return Err(ExchangeRateError::RateIsStale(rate.pair()));
        }
        Ok(rate)
    }

    pub async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        self.db.set_exchange_rate(rate).await?;
        info!("💱️ Exchange rate updated: {rate}");
        Ok(())
    }
}
