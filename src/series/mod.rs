//! Monthly series: calendar arithmetic, aggregation, derived metrics and pivots

pub mod calendar;
mod monthly;
mod aggregate;
mod derived;
mod pivot;

pub use monthly::{MonthlySeries, SeriesPoint};
pub use aggregate::{aggregate_monthly, AggregateRequest, MonthlyAggregate, Reduction};
pub use derived::{percent_change, ratio, DerivedSeries};
pub use pivot::{yearly_pivot, PivotRow, YearlyPivot};
