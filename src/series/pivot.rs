//! Month-by-year pivot for bar-chart views
//!
//! Absent (month, year) cells are zero here. The zero-fill belongs to this view
//! only and never flows back into the monthly series used for forecasting.

use crate::cleaning::CleanedDataset;
use crate::records::Field;
use chrono::{Datelike, Month};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One calendar month across all years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRow {
    /// 1 = January
    pub month: u32,
    pub month_name: String,
    /// One value per entry of [`YearlyPivot::years`]
    pub values: Vec<f64>,
}

/// Sum of a field by (calendar month, year), rows January..December
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyPivot {
    pub years: Vec<i32>,
    pub rows: Vec<PivotRow>,
}

impl YearlyPivot {
    /// Value for a given month (1-12) and year; zero when the year is absent
    pub fn value(&self, month: u32, year: i32) -> f64 {
        let Some(col) = self.years.iter().position(|&y| y == year) else {
            return 0.0;
        };
        self.rows
            .get(month.saturating_sub(1) as usize)
            .map(|row| row.values[col])
            .unwrap_or(0.0)
    }

    /// Column totals per year
    pub fn year_totals(&self) -> Vec<f64> {
        (0..self.years.len())
            .map(|col| self.rows.iter().map(|r| r.values[col]).sum())
            .collect()
    }
}

/// Build the pivot by summing `field` over the cleaned dataset
pub fn yearly_pivot(dataset: &CleanedDataset, field: Field) -> YearlyPivot {
    let mut cells: BTreeMap<(u32, i32), f64> = BTreeMap::new();
    let mut years: Vec<i32> = Vec::new();

    for order in &dataset.records {
        let day = order.completion_day();
        if !years.contains(&day.year()) {
            years.push(day.year());
        }
        if let Some(v) = order.value(field) {
            *cells.entry((day.month(), day.year())).or_insert(0.0) += v;
        }
    }
    years.sort_unstable();

    let rows = (1..=12u32)
        .map(|month| PivotRow {
            month,
            month_name: Month::try_from(month as u8)
                .map(|m| m.name().to_string())
                .unwrap_or_default(),
            values: years
                .iter()
                .map(|&year| cells.get(&(month, year)).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    YearlyPivot { years, rows }
}
