//! Daily rating history and its model forecast.

use serde::Serialize;
use tracing::{info, warn};

use super::config::ServiceConfig;
use super::statements::{Binding, ResultSet, StatementClient};
use crate::error::ServiceError;

/// Shortest forecast horizon in days.
pub const MIN_PERIODS: u32 = 1;
/// Longest forecast horizon in days.
pub const MAX_PERIODS: u32 = 180;
/// Horizon used when none is given.
pub const DEFAULT_PERIODS: u32 = 30;

const RATING_VIEW: &str = "V_RATING_DAILY";
const FORECAST_MODEL: &str = "RATING_FORECAST_MODEL";

/// One day of rating history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingPoint {
    /// Day, as returned by the warehouse.
    pub ts: String,
    /// Rating at the end of the day.
    pub rating: f64,
}

/// One forecast day with its prediction interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// Day, as returned by the warehouse.
    pub ts: String,
    /// Predicted rating.
    pub forecast: f64,
    /// Lower bound of the prediction interval.
    pub lower_bound: f64,
    /// Upper bound of the prediction interval.
    pub upper_bound: f64,
}

/// History followed by the forecast for the requested horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingForecast {
    /// Requested horizon in days.
    pub periods: u32,
    /// Observed ratings, oldest first.
    pub history: Vec<RatingPoint>,
    /// Forecast, oldest first. Empty when there is no history.
    pub forecast: Vec<ForecastPoint>,
}

impl RatingPoint {
    fn from_rows(rows: &ResultSet) -> Result<Vec<Self>, ServiceError> {
        let ts = rows.require_column("ts")?;
        let rating = rows.require_column("rating")?;
        (0..rows.rows.len())
            .map(|row| {
                Ok(Self {
                    ts: rows.text(row, ts)?.to_string(),
                    rating: rows.number(row, rating)?,
                })
            })
            .collect()
    }
}

impl ForecastPoint {
    fn from_rows(rows: &ResultSet) -> Result<Vec<Self>, ServiceError> {
        let ts = rows.require_column("ts")?;
        let forecast = rows.require_column("forecast")?;
        let lower = rows.require_column("lower_bound")?;
        let upper = rows.require_column("upper_bound")?;
        (0..rows.rows.len())
            .map(|row| {
                Ok(Self {
                    ts: rows.text(row, ts)?.to_string(),
                    forecast: rows.number(row, forecast)?,
                    lower_bound: rows.number(row, lower)?,
                    upper_bound: rows.number(row, upper)?,
                })
            })
            .collect()
    }
}

/// Checks that a horizon lies in `MIN_PERIODS..=MAX_PERIODS`.
///
/// # Errors
///
/// Returns [`ServiceError::Request`] for a horizon out of range.
pub fn check_periods(periods: u32) -> Result<u32, ServiceError> {
    if (MIN_PERIODS..=MAX_PERIODS).contains(&periods) {
        Ok(periods)
    } else {
        Err(ServiceError::Request(format!(
            "forecast horizon must be between {MIN_PERIODS} and {MAX_PERIODS} days, got {periods}"
        )))
    }
}

/// Reads rating history and runs the forecasting model.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    statements: StatementClient,
    qualifier: String,
}

impl ForecastClient {
    /// Creates a client for the configured database and schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            statements: StatementClient::new(config)?,
            qualifier: format!("{}.{}", config.database, config.schema),
        })
    }

    /// Statement reading the daily rating view.
    #[must_use]
    pub fn history_sql(&self) -> String {
        format!("SELECT ts, rating FROM {}.{RATING_VIEW} ORDER BY ts", self.qualifier)
    }

    /// Statement calling the forecasting model; the horizon is bound to `?`.
    #[must_use]
    pub fn forecast_sql(&self) -> String {
        format!(
            "SELECT ts, forecast, lower_bound, upper_bound \
             FROM TABLE({}.{FORECAST_MODEL}!FORECAST(FORECASTING_PERIODS => ?)) \
             ORDER BY ts",
            self.qualifier
        )
    }

    /// Returns the history and a forecast `periods` days ahead.
    ///
    /// The model is not called when there is no history.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Request`] for a horizon out of range, any
    /// statement error, and [`ServiceError::InvalidResponse`] when a row
    /// lacks a column or holds a non-numeric value.
    pub async fn forecast(&self, periods: u32) -> Result<RatingForecast, ServiceError> {
        let periods = check_periods(periods)?;

        let history = RatingPoint::from_rows(&self.statements.execute(&self.history_sql(), &[]).await?)?;
        if history.is_empty() {
            warn!("no rating history, skipping forecast");
            return Ok(RatingForecast {
                periods,
                history,
                forecast: Vec::new(),
            });
        }

        let rows = self
            .statements
            .execute(&self.forecast_sql(), &[Binding::fixed(i64::from(periods))])
            .await?;
        let forecast = ForecastPoint::from_rows(&rows)?;
        info!(
            periods,
            history = history.len(),
            forecast = forecast.len(),
            "rating forecast ready"
        );
        Ok(RatingForecast {
            periods,
            history,
            forecast,
        })
    }
}
