//! Ratio and percent-change series derived from base series
//!
//! Months whose result is not finite (x/0, 0/0) are left out of the output
//! entirely. The number of such months is returned so callers can surface it.

use super::monthly::{MonthlySeries, SeriesPoint};
use serde::{Deserialize, Serialize};

/// A derived series and the months dropped while computing it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    pub series: MonthlySeries,
    /// Months whose result was NaN or infinite
    pub excluded_months: usize,
}

impl DerivedSeries {
    fn collect<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = SeriesPoint>,
    {
        let mut excluded_months = 0;
        let points = candidates
            .into_iter()
            .filter(|p| {
                let keep = p.value.is_finite();
                if !keep {
                    excluded_months += 1;
                }
                keep
            })
            .collect();
        Self {
            series: MonthlySeries::from_ordered(points),
            excluded_months,
        }
    }
}

/// `numerator / denominator` over months present in both series
pub fn ratio(numerator: &MonthlySeries, denominator: &MonthlySeries) -> DerivedSeries {
    DerivedSeries::collect(numerator.iter().filter_map(|p| {
        denominator.get(p.month).map(|den| SeriesPoint {
            month: p.month,
            value: p.value / den,
        })
    }))
}

/// Month-over-month change in percent: `(v[t] / v[t-1] - 1) * 100`
///
/// The first month has no predecessor and is omitted.
pub fn percent_change(series: &MonthlySeries) -> DerivedSeries {
    DerivedSeries::collect(series.points().windows(2).map(|w| SeriesPoint {
        month: w[1].month,
        value: (w[1].value / w[0].value - 1.0) * 100.0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::calendar::month_end;
    use approx::assert_relative_eq;

    fn series(start_month: u32, values: &[f64]) -> MonthlySeries {
        MonthlySeries::from_pairs(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (month_end(2025, start_month + i as u32), v)),
        )
        .unwrap()
    }

    #[test]
    fn test_ratio_excludes_zero_over_zero() {
        let a = series(1, &[10.0, 0.0, 5.0]);
        let b = series(1, &[2.0, 0.0, 1.0]);

        let derived = ratio(&a, &b);
        assert_eq!(derived.series.values(), vec![5.0, 5.0]);
        assert_eq!(derived.series.months(), vec![month_end(2025, 1), month_end(2025, 3)]);
        assert_eq!(derived.excluded_months, 1);
    }

    #[test]
    fn test_ratio_excludes_division_by_zero() {
        let a = series(1, &[4.0, 3.0]);
        let b = series(1, &[0.0, 2.0]);
        let derived = ratio(&a, &b);
        assert_eq!(derived.series.values(), vec![1.5]);
        assert_eq!(derived.excluded_months, 1);
    }

    #[test]
    fn test_ratio_uses_common_months_only() {
        let a = series(1, &[4.0, 6.0, 8.0]);
        let b = series(2, &[3.0, 4.0, 5.0]);
        let derived = ratio(&a, &b);
        assert_eq!(derived.series.months(), vec![month_end(2025, 2), month_end(2025, 3)]);
        assert_eq!(derived.series.values(), vec![2.0, 2.0]);
        assert_eq!(derived.excluded_months, 0);
    }

    #[test]
    fn test_percent_change() {
        let s = series(1, &[100.0, 110.0, 99.0, 0.0, 5.0]);
        let pct = percent_change(&s);

        // Feb, Mar, Apr are defined; May divides by zero and is dropped
        assert_eq!(pct.series.len(), 3);
        assert_eq!(pct.series.first_month(), Some(month_end(2025, 2)));
        let values = pct.series.values();
        assert_relative_eq!(values[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(values[1], -10.0, epsilon = 1e-9);
        assert_relative_eq!(values[2], -100.0, epsilon = 1e-9);
        assert_eq!(pct.excluded_months, 1);
    }
}
