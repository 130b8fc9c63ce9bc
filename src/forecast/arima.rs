//! ARIMA(p, d, q) estimation and forecasting
//!
//! The model for the `d`-times differenced series `w` is
//!
//! ```text
//! (w[t] - mu) = sum_i phi_i (w[t-i] - mu) + e[t] + sum_j theta_j e[t-j]
//! ```
//!
//! with `mu` estimated only when `d = 0`. Parameters minimize the conditional
//! sum of squares (CSS): residuals before `t = p` are taken as zero and left out.
//!
//! AR and MA coefficients are searched through partial-autocorrelation
//! parameters `tanh(u)`, which maps every point of the search space to a
//! stationary AR polynomial and an invertible MA polynomial.

use super::optimizer::{Minimum, NelderMead};
use crate::error::ForecastError;
use log::debug;
use serde::{Deserialize, Serialize};

/// Bound on initial partial autocorrelations so `atanh` stays finite
const MAX_INITIAL_PACF: f64 = 0.9;

/// Model order (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    /// Autoregressive order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving-average order
    pub q: usize,
}

impl ModelOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Fewest observations accepted for a fit
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 1
    }

    fn includes_mean(&self) -> bool {
        self.d == 0
    }

    fn n_params(&self) -> usize {
        self.p + self.q + usize::from(self.includes_mean())
    }
}

impl Default for ModelOrder {
    /// ARMA(1, 3) on the undifferenced series
    fn default() -> Self {
        Self::new(1, 0, 3)
    }
}

impl std::fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

/// Model order plus optimizer settings, before fitting
#[derive(Debug, Clone)]
pub struct Arima {
    order: ModelOrder,
    optimizer: NelderMead,
}

/// Estimated coefficients and fit statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub order: ModelOrder,
    /// Process mean of the differenced series (`None` when `d > 0`)
    pub mean: Option<f64>,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Innovation variance estimate
    pub sigma2: f64,
    /// Minimized conditional sum of squares
    pub css: f64,
    pub n_obs: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// A fitted model ready to forecast
#[derive(Debug, Clone)]
pub struct FittedArima {
    summary: FitSummary,
    /// Original series followed by each differencing level, `levels[k]` = k-th difference
    levels: Vec<Vec<f64>>,
    residuals: Vec<f64>,
}

/// Point forecasts and their standard errors
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaForecast {
    pub mean: Vec<f64>,
    pub std_err: Vec<f64>,
}

impl ArimaForecast {
    /// Two-sided bounds `mean -/+ z * std_err`
    pub fn bounds(&self, z: f64) -> (Vec<f64>, Vec<f64>) {
        self.mean
            .iter()
            .zip(&self.std_err)
            .map(|(m, se)| (m - z * se, m + z * se))
            .unzip()
    }
}

impl Arima {
    pub fn new(order: ModelOrder) -> Self {
        Self {
            order,
            optimizer: NelderMead::default(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: NelderMead) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Estimate the model on `data`
    pub fn fit(&self, data: &[f64]) -> Result<FittedArima, ForecastError> {
        let order = self.order;
        let required = order.min_observations();
        if data.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                actual: data.len(),
            });
        }
        if let Some(i) = data.iter().position(|x| !x.is_finite()) {
            return Err(ForecastError::InvalidSeries(format!(
                "non-finite value at position {}",
                i
            )));
        }

        let mut levels = vec![data.to_vec()];
        for _ in 0..order.d {
            let prev = levels.last().map(|l| difference(l)).unwrap_or_default();
            levels.push(prev);
        }
        let w = levels[order.d].as_slice();

        let x0 = initial_params(w, order);
        let steps = initial_steps(w, order);
        let objective = |x: &[f64]| {
            let params = Params::unpack(x, order);
            conditional_residuals(w, &params).1
        };

        let Minimum { x, value, iterations, converged } =
            self.optimizer.minimize(objective, &x0, &steps);

        let params = Params::unpack(&x, order);
        let (residuals, css) = conditional_residuals(w, &params);
        let n_effective = (w.len() - order.p).max(1);
        let sigma2 = css / n_effective as f64;

        debug!(
            "ARIMA{} fit: mean={:?} ar={:?} ma={:?} sigma2={:.6} css={:.6} iters={} converged={}",
            order, params.mean, params.ar, params.ma, sigma2, value, iterations, converged
        );

        Ok(FittedArima {
            summary: FitSummary {
                order,
                mean: order.includes_mean().then_some(params.mean),
                ar: params.ar,
                ma: params.ma,
                sigma2,
                css,
                n_obs: data.len(),
                iterations,
                converged,
            },
            levels,
            residuals,
        })
    }
}

impl FittedArima {
    pub fn summary(&self) -> &FitSummary {
        &self.summary
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Forecast `steps` periods past the end of the data
    pub fn forecast(&self, steps: usize) -> ArimaForecast {
        let s = &self.summary;
        let mean = s.mean.unwrap_or(0.0);
        let d = s.order.d;

        // ARMA recursion on the differenced, demeaned scale; future shocks are zero
        let mut z: Vec<f64> = self.levels[d].iter().map(|w| w - mean).collect();
        let mut e = self.residuals.clone();
        let mut point = Vec::with_capacity(steps);
        for _ in 0..steps {
            let t = z.len();
            let pred = arma_prediction(&z, &e, t, &s.ar, &s.ma);
            z.push(pred);
            e.push(0.0);
            point.push(pred + mean);
        }

        // Undo differencing from the highest level down
        for k in (0..d).rev() {
            let mut last = self.levels[k].last().copied().unwrap_or(0.0);
            for value in point.iter_mut() {
                last += *value;
                *value = last;
            }
        }

        let psi = integrated_psi_weights(&s.ar, &s.ma, d, steps);
        let mut acc = 0.0;
        let std_err = psi
            .iter()
            .map(|p| {
                acc += p * p;
                (s.sigma2 * acc).sqrt()
            })
            .collect();

        ArimaForecast { mean: point, std_err }
    }
}

/// Coefficients decoded from the optimizer's search vector
#[derive(Debug, Clone, PartialEq)]
struct Params {
    mean: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
}

impl Params {
    fn unpack(x: &[f64], order: ModelOrder) -> Self {
        let (mean, rest) = if order.includes_mean() {
            (x[0], &x[1..])
        } else {
            (0.0, x)
        };
        let (ar_raw, ma_raw) = rest.split_at(order.p);

        let ar = pacf_to_coefficients(&ar_raw.iter().map(|u| u.tanh()).collect::<Vec<_>>());
        let ma = pacf_to_coefficients(&ma_raw.iter().map(|v| v.tanh()).collect::<Vec<_>>())
            .into_iter()
            .map(|a| -a)
            .collect();

        Self { mean, ar, ma }
    }
}

/// Map partial autocorrelations in (-1, 1) to the coefficients `a` of a
/// polynomial `1 - sum a_j z^j` with all roots outside the unit circle
/// (Durbin-Levinson recursion)
fn pacf_to_coefficients(pacf: &[f64]) -> Vec<f64> {
    let mut coeffs: Vec<f64> = Vec::with_capacity(pacf.len());
    for (k, &r) in pacf.iter().enumerate() {
        let prev = coeffs.clone();
        for j in 0..k {
            coeffs[j] = prev[j] - r * prev[k - 1 - j];
        }
        coeffs.push(r);
    }
    coeffs
}

/// First difference of a series
fn difference(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Sample autocovariances up to `max_lag`
fn autocovariances(w: &[f64], max_lag: usize) -> Vec<f64> {
    let n = w.len();
    let mean = w.iter().sum::<f64>() / n as f64;
    (0..=max_lag)
        .map(|k| {
            (k..n)
                .map(|i| (w[i] - mean) * (w[i - k] - mean))
                .sum::<f64>()
                / n as f64
        })
        .collect()
}

/// Sample partial autocorrelations (Levinson-Durbin on the Yule-Walker system)
fn sample_pacf(w: &[f64], max_lag: usize) -> Vec<f64> {
    let acov = autocovariances(w, max_lag);
    if max_lag == 0 || acov[0].abs() < 1e-12 {
        return vec![0.0; max_lag];
    }
    let rho: Vec<f64> = acov.iter().map(|c| c / acov[0]).collect();

    let mut pacf = Vec::with_capacity(max_lag);
    let mut phi: Vec<f64> = Vec::new();
    for k in 1..=max_lag {
        let num = rho[k] - (0..k - 1).map(|j| phi[j] * rho[k - 1 - j]).sum::<f64>();
        let den = 1.0 - (0..k - 1).map(|j| phi[j] * rho[j + 1]).sum::<f64>();
        let r = if den.abs() > 1e-12 { num / den } else { 0.0 };

        let prev = phi.clone();
        for j in 0..k - 1 {
            phi[j] = prev[j] - r * prev[k - 2 - j];
        }
        phi.push(r);
        pacf.push(r);
    }
    pacf
}

/// Starting point: sample mean, Yule-Walker AR partial autocorrelations, zero MA
fn initial_params(w: &[f64], order: ModelOrder) -> Vec<f64> {
    let mut x = Vec::with_capacity(order.n_params());
    if order.includes_mean() {
        x.push(w.iter().sum::<f64>() / w.len() as f64);
    }
    x.extend(
        sample_pacf(w, order.p)
            .into_iter()
            .map(|r| r.clamp(-MAX_INITIAL_PACF, MAX_INITIAL_PACF).atanh()),
    );
    x.extend(std::iter::repeat(0.0).take(order.q));
    x
}

/// Initial simplex offsets, scaled to the data for the mean term
fn initial_steps(w: &[f64], order: ModelOrder) -> Vec<f64> {
    let mut steps = Vec::with_capacity(order.n_params());
    if order.includes_mean() {
        let acov0 = autocovariances(w, 0)[0];
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let scale = (0.1 * acov0.sqrt()).max(1e-3 * mean.abs()).max(1e-6);
        steps.push(scale);
    }
    steps.extend(std::iter::repeat(0.25).take(order.p + order.q));
    steps
}

/// One-step ARMA prediction of `z[t]` from earlier values and shocks
fn arma_prediction(z: &[f64], e: &[f64], t: usize, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .filter(|(i, _)| t > *i)
        .map(|(i, phi)| phi * z[t - i - 1])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .filter(|(j, _)| t > *j)
        .map(|(j, theta)| theta * e[t - j - 1])
        .sum();
    ar_part + ma_part
}

/// Conditional residuals of `w` and their sum of squares
fn conditional_residuals(w: &[f64], params: &Params) -> (Vec<f64>, f64) {
    let p = params.ar.len();
    let z: Vec<f64> = w.iter().map(|v| v - params.mean).collect();
    let mut e = vec![0.0; z.len()];
    let mut css = 0.0;
    for t in p..z.len() {
        e[t] = z[t] - arma_prediction(&z, &e, t, &params.ar, &params.ma);
        css += e[t] * e[t];
    }
    (e, css)
}

/// MA(infinity) weights of the ARMA part, integrated `d` times
fn integrated_psi_weights(ar: &[f64], ma: &[f64], d: usize, steps: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(steps);
    for j in 0..steps {
        let value = if j == 0 {
            1.0
        } else {
            let theta = ma.get(j - 1).copied().unwrap_or(0.0);
            theta
                + ar.iter()
                    .enumerate()
                    .filter(|(i, _)| *i < j)
                    .map(|(i, phi)| phi * psi[j - i - 1])
                    .sum::<f64>()
        };
        psi.push(value);
    }
    for _ in 0..d {
        let mut acc = 0.0;
        for value in psi.iter_mut() {
            acc += *value;
            *value = acc;
        }
    }
    psi
}
