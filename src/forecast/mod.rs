//! Univariate ARIMA forecasting
//!
//! - `arima`: model estimation and point/interval forecasts
//! - `forecaster`: horizon handling and scenario bands for a monthly series
//! - `normal`: standard normal quantiles for interval widths
//! - `optimizer`: Nelder-Mead minimizer used for estimation

pub mod arima;
mod forecaster;
pub mod normal;
pub mod optimizer;

pub use arima::{Arima, ArimaForecast, FitSummary, FittedArima, ModelOrder};
pub use forecaster::{ForecastConfig, ForecastResult, Forecaster};
pub use normal::{normal_quantile, two_sided_critical_value};
