//! Monthly aggregation of cleaned work orders

use super::calendar::{month_end_of, months_between};
use super::monthly::{MonthlySeries, SeriesPoint};
use crate::cleaning::CleanedDataset;
use crate::records::Field;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a month's contributing values collapse into one number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    /// Number of records with a value in the field
    Count,
    /// Month omitted when nothing contributes
    Mean,
}

/// One series to build from the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    pub field: Field,
    pub reduction: Reduction,
}

impl AggregateRequest {
    pub fn new(field: Field, reduction: Reduction) -> Self {
        Self { field, reduction }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    sum: f64,
    count: usize,
}

/// Series produced in a single pass, sharing one month index
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    /// Every month with at least one cleaned record
    pub index: Vec<NaiveDate>,
    /// One series per request, in request order
    pub series: Vec<MonthlySeries>,
}

impl MonthlyAggregate {
    pub fn last_month(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    /// Keep the last `months` calendar months of the shared index
    pub fn truncate_trailing(self, months: u32) -> Self {
        let Some(last) = self.last_month() else {
            return self;
        };
        let index = self
            .index
            .into_iter()
            .filter(|m| months_between(*m, last) < months as i32)
            .collect();
        let series = self.series.iter().map(|s| s.trailing(last, months)).collect();
        Self { index, series }
    }
}

/// Group `dataset` into calendar months and reduce each request
pub fn aggregate_monthly(dataset: &CleanedDataset, requests: &[AggregateRequest]) -> MonthlyAggregate {
    let mut buckets: BTreeMap<NaiveDate, Vec<Bucket>> = BTreeMap::new();

    for order in &dataset.records {
        let month = month_end_of(order.completion_day());
        let entry = buckets
            .entry(month)
            .or_insert_with(|| vec![Bucket::default(); requests.len()]);

        for (bucket, request) in entry.iter_mut().zip(requests) {
            if let Some(value) = order.value(request.field) {
                bucket.sum += value;
                bucket.count += 1;
            }
        }
    }

    let series = requests
        .iter()
        .enumerate()
        .map(|(i, request)| {
            let points = buckets
                .iter()
                .filter_map(|(&month, row)| {
                    let bucket = row[i];
                    let value = match request.reduction {
                        Reduction::Sum => bucket.sum,
                        Reduction::Count => bucket.count as f64,
                        Reduction::Mean if bucket.count == 0 => return None,
                        Reduction::Mean => bucket.sum / bucket.count as f64,
                    };
                    Some(SeriesPoint { month, value })
                })
                .collect();
            MonthlySeries::from_ordered(points)
        })
        .collect();

    MonthlyAggregate {
        index: buckets.into_keys().collect(),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::WorkOrder;
    use crate::series::calendar::{is_month_end, month_end};

    fn order(y: i32, m: u32, d: u32, weight: f64, order_ref: Option<&str>) -> WorkOrder {
        WorkOrder {
            completed_at: NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            weight,
            order_ref: order_ref.map(str::to_string),
            order_quantity: None,
        }
    }

    fn dataset() -> CleanedDataset {
        CleanedDataset::from_orders(vec![
            order(2024, 1, 3, 10.0, Some("a")),
            order(2024, 1, 28, 5.0, Some("b")),
            order(2024, 3, 1, 7.0, None),
            order(2024, 4, 30, 2.0, Some("c")),
        ])
    }

    #[test]
    fn test_sum_count_mean_share_index() {
        let requests = [
            AggregateRequest::new(Field::Weight, Reduction::Sum),
            AggregateRequest::new(Field::OrderRef, Reduction::Count),
            AggregateRequest::new(Field::Weight, Reduction::Mean),
        ];
        let agg = aggregate_monthly(&dataset(), &requests);

        let expected_index = vec![month_end(2024, 1), month_end(2024, 3), month_end(2024, 4)];
        assert_eq!(agg.index, expected_index);

        assert_eq!(agg.series[0].values(), vec![15.0, 7.0, 2.0]);
        assert_eq!(agg.series[1].values(), vec![2.0, 0.0, 1.0]);
        assert_eq!(agg.series[2].values(), vec![7.5, 7.0, 2.0]);

        // February has no records: absent, not zero
        assert!(agg.series[0].get(month_end(2024, 2)).is_none());
        for s in &agg.series {
            assert_eq!(s.months(), expected_index);
        }
    }

    #[test]
    fn test_index_is_strictly_increasing_month_ends() {
        let agg = aggregate_monthly(
            &dataset(),
            &[AggregateRequest::new(Field::Weight, Reduction::Sum)],
        );
        assert!(agg.index.windows(2).all(|w| w[0] < w[1]));
        assert!(agg.index.iter().all(|m| is_month_end(*m)));
        assert!(agg.series[0].validate().is_ok());
    }

    #[test]
    fn test_mean_omits_months_without_values() {
        let agg = aggregate_monthly(
            &dataset(),
            &[AggregateRequest::new(Field::OrderQuantity, Reduction::Mean)],
        );
        assert!(agg.series[0].is_empty());
        assert_eq!(agg.index.len(), 3);
    }

    #[test]
    fn test_truncate_trailing() {
        let agg = aggregate_monthly(
            &dataset(),
            &[AggregateRequest::new(Field::Weight, Reduction::Sum)],
        )
        .truncate_trailing(2);
        assert_eq!(agg.index, vec![month_end(2024, 3), month_end(2024, 4)]);
        assert_eq!(agg.series[0].values(), vec![7.0, 2.0]);
    }
}
