//! Ordered month-indexed series

use super::calendar::{is_month_end, months_between};
use crate::error::ForecastError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One month of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Month-end date identifying the calendar month
    pub month: NaiveDate,
    pub value: f64,
}

/// Aggregate value per calendar month, ordered by month
///
/// Months without contributing records are absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    points: Vec<SeriesPoint>,
}

impl MonthlySeries {
    /// Build from `(month_end, value)` pairs, rejecting unordered or non month-end keys
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ForecastError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let series = Self {
            points: pairs
                .into_iter()
                .map(|(month, value)| SeriesPoint { month, value })
                .collect(),
        };
        series.check_index()?;
        Ok(series)
    }

    /// Build from points the caller already produced in month order
    pub(crate) fn from_ordered(points: Vec<SeriesPoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].month < w[1].month));
        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }

    pub fn months(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.month).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_month(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.month)
    }

    pub fn last_month(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.month)
    }

    /// Value recorded for `month`, if present
    pub fn get(&self, month: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.month.cmp(&month))
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Sum of all values
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Arithmetic mean over available months
    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            None
        } else {
            Some(self.total() / self.points.len() as f64)
        }
    }

    /// Running total over the series
    pub fn cumulative(&self) -> MonthlySeries {
        let mut running = 0.0;
        let points = self
            .points
            .iter()
            .map(|p| {
                running += p.value;
                SeriesPoint { month: p.month, value: running }
            })
            .collect();
        Self { points }
    }

    /// Keep only months within `months` calendar months ending at `last`
    ///
    /// The result is always a suffix of the ordered index.
    pub fn trailing(&self, last: NaiveDate, months: u32) -> MonthlySeries {
        let start = self
            .points
            .iter()
            .position(|p| months_between(p.month, last) < months as i32)
            .unwrap_or(self.points.len());
        Self { points: self.points[start..].to_vec() }
    }

    /// Check ordering and month-end keys
    fn check_index(&self) -> Result<(), ForecastError> {
        if let Some(p) = self.points.iter().find(|p| !is_month_end(p.month)) {
            return Err(ForecastError::InvalidSeries(format!(
                "{} is not a month-end date",
                p.month
            )));
        }
        if let Some(w) = self.points.windows(2).find(|w| w[0].month >= w[1].month) {
            return Err(ForecastError::InvalidSeries(format!(
                "months not strictly increasing at {} -> {}",
                w[0].month, w[1].month
            )));
        }
        Ok(())
    }

    /// Full forecaster precondition: ordered month-end index and finite values
    pub fn validate(&self) -> Result<(), ForecastError> {
        self.check_index()?;
        if let Some(p) = self.points.iter().find(|p| !p.value.is_finite()) {
            return Err(ForecastError::InvalidSeries(format!(
                "non-finite value at {}",
                p.month
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::calendar::month_end;
    use approx::assert_relative_eq;

    fn series(values: &[f64]) -> MonthlySeries {
        MonthlySeries::from_pairs(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (month_end(2024, i as u32 + 1), v)),
        )
        .unwrap()
    }

    #[test]
    fn test_from_pairs_rejects_bad_index() {
        let unordered = MonthlySeries::from_pairs(vec![
            (month_end(2024, 3), 1.0),
            (month_end(2024, 2), 1.0),
        ]);
        assert!(unordered.is_err());

        let not_month_end =
            MonthlySeries::from_pairs(vec![(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), 1.0)]);
        assert!(not_month_end.is_err());
    }

    #[test]
    fn test_cumulative_and_mean() {
        let s = series(&[1.0, 2.0, 3.5]);
        assert_eq!(s.cumulative().values(), vec![1.0, 3.0, 6.5]);
        assert_relative_eq!(s.mean().unwrap(), 6.5 / 3.0);
        assert!(MonthlySeries::default().mean().is_none());
    }

    #[test]
    fn test_trailing_window_is_calendar_based() {
        // Jan..Jun 2024 with March missing
        let s = MonthlySeries::from_pairs(vec![
            (month_end(2024, 1), 1.0),
            (month_end(2024, 2), 2.0),
            (month_end(2024, 4), 4.0),
            (month_end(2024, 5), 5.0),
            (month_end(2024, 6), 6.0),
        ])
        .unwrap();

        let last4 = s.trailing(month_end(2024, 6), 4);
        assert_eq!(last4.values(), vec![4.0, 5.0, 6.0]);

        let all = s.trailing(month_end(2024, 6), 24);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let s = series(&[1.0, f64::NAN]);
        assert!(s.validate().is_err());
        assert!(series(&[1.0, 2.0]).validate().is_ok());
        assert_eq!(series(&[1.0, 2.0]).get(month_end(2024, 2)), Some(2.0));
    }
}
