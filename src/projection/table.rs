//! Tabular export of projected months

use crate::pipeline::PipelineOutput;
use crate::scenario::Scenario;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// One projected month across every forecast metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRow {
    pub month: NaiveDate,
    /// Aligned with [`ProjectionTable::columns`]; `None` where a metric has no forecast for the month
    pub values: Vec<Option<f64>>,
}

/// Forecast and cumulative bands per future month
///
/// Columns are `<metric>_central|optimistic|pessimistic` followed by
/// `<metric>_cum_central|optimistic|pessimistic` for each forecast metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectionTable {
    pub columns: Vec<String>,
    pub rows: Vec<ProjectionRow>,
}

impl ProjectionTable {
    pub fn from_output(output: &PipelineOutput) -> Self {
        let months: BTreeSet<NaiveDate> = output
            .forecasts
            .values()
            .flat_map(|f| f.future_months.iter().copied())
            .collect();

        let mut columns = Vec::new();
        for metric in output.forecasts.keys() {
            for scenario in Scenario::ALL {
                columns.push(format!("{}_{}", metric, scenario.key()));
            }
            for scenario in Scenario::ALL {
                columns.push(format!("{}_cum_{}", metric, scenario.key()));
            }
        }

        let rows = months
            .into_iter()
            .map(|month| {
                let mut values = Vec::with_capacity(columns.len());
                for (metric, forecast) in &output.forecasts {
                    let position = forecast.future_months.iter().position(|m| *m == month);
                    for scenario in Scenario::ALL {
                        values.push(position.map(|i| forecast.bands.get(scenario)[i]));
                    }
                    let cumulative = output.cumulative.get(metric);
                    for scenario in Scenario::ALL {
                        values.push(
                            position
                                .zip(cumulative)
                                .map(|(i, c)| c.bands.get(scenario)[i]),
                        );
                    }
                }
                ProjectionRow { month, values }
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in month order
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Write as CSV with a leading `month` column; missing cells are empty
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["month".to_string()];
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.month.format("%Y-%m-%d").to_string()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|x| format!("{:.6}", x)).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}
