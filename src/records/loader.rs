//! Load work-order rows from CSV exports

use super::{ColumnMapping, RawRecord};
use crate::cleaning::{parse_completion_date, parse_quantity};
use crate::error::PipelineError;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use std::path::Path;

/// Header positions resolved against a [`ColumnMapping`]
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    completion_date: usize,
    weight: usize,
    order_ref: Option<usize>,
    order_quantity: Option<usize>,
}

impl ColumnIndex {
    fn resolve(
        headers: &StringRecord,
        mapping: &ColumnMapping,
        source_id: &str,
    ) -> Result<Self, PipelineError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name.trim());

        let required = |name: &str| {
            find(name).ok_or_else(|| PipelineError::MissingColumn {
                source_id: source_id.to_string(),
                column: name.to_string(),
            })
        };

        let optional = |name: &Option<String>| {
            name.as_deref().and_then(|n| {
                let idx = find(n);
                if idx.is_none() {
                    warn!("{}: optional column '{}' not found, treating as empty", source_id, n);
                }
                idx
            })
        };

        Ok(Self {
            completion_date: required(&mapping.completion_date)?,
            weight: required(&mapping.weight)?,
            order_ref: optional(&mapping.order_ref),
            order_quantity: optional(&mapping.order_quantity),
        })
    }

    fn to_record(&self, row: &StringRecord) -> RawRecord {
        let cell = |idx: usize| row.get(idx).map(str::trim).filter(|s| !s.is_empty());

        RawRecord {
            completion_date: cell(self.completion_date).and_then(parse_completion_date),
            weight: cell(self.weight).and_then(parse_quantity),
            order_ref: self.order_ref.and_then(cell).map(str::to_string),
            order_quantity: self.order_quantity.and_then(cell).and_then(parse_quantity),
        }
    }
}

/// Load all records from a CSV file
pub fn load_records<P: AsRef<Path>>(
    path: P,
    mapping: &ColumnMapping,
) -> Result<Vec<RawRecord>, PipelineError> {
    let path = path.as_ref();
    let source_id = path.display().to_string();
    let file = std::fs::File::open(path)
        .map_err(|e| PipelineError::source_unavailable(&source_id, e))?;
    read_records(file, mapping, &source_id)
}

/// Load records from any reader (e.g., string buffer, request body)
pub fn load_records_from_reader<R: std::io::Read>(
    reader: R,
    mapping: &ColumnMapping,
) -> Result<Vec<RawRecord>, PipelineError> {
    read_records(reader, mapping, "<reader>")
}

fn read_records<R: std::io::Read>(
    reader: R,
    mapping: &ColumnMapping,
    source_id: &str,
) -> Result<Vec<RawRecord>, PipelineError> {
    let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| PipelineError::source_unavailable(source_id, e))?
        .clone();
    let index = ColumnIndex::resolve(&headers, mapping, source_id)?;

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let row = result.map_err(|e| PipelineError::source_unavailable(source_id, e))?;
        records.push(index.to_record(&row));
    }

    debug!("{}: read {} rows", source_id, records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
OS,Fim Real Caldeiraria,Peso Total (Ton),Cliente
OS-1,2025-01-15,12.5,A
OS-2,15/02/2025 08:30,\"3,25\",B
,not a date,7.0,C
OS-4,2025-03-02 17:45:00,,D
";

    #[test]
    fn test_load_records_from_reader() {
        let records = load_records_from_reader(SAMPLE.as_bytes(), &ColumnMapping::default())
            .expect("sample should load");
        assert_eq!(records.len(), 4);

        assert_eq!(
            records[0].completion_date.map(|d| d.date()),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(records[0].weight, Some(12.5));
        assert_eq!(records[0].order_ref.as_deref(), Some("OS-1"));

        assert_eq!(
            records[1].completion_date.map(|d| d.date()),
            NaiveDate::from_ymd_opt(2025, 2, 15)
        );
        assert_eq!(records[1].weight, Some(3.25));

        assert!(records[2].completion_date.is_none());
        assert!(records[2].order_ref.is_none());
        assert!(records[3].weight.is_none());
    }

    #[test]
    fn test_missing_required_column() {
        let mapping = ColumnMapping {
            weight: "Weight".to_string(),
            ..Default::default()
        };
        let err = load_records_from_reader(SAMPLE.as_bytes(), &mapping).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "Weight"));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let err = load_records("does/not/exist.csv", &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_optional_quantity_column() {
        let csv = "data,peso,qtd\n2025-01-10,4.0,3\n2025-01-11,2.0,x\n";
        let mapping = ColumnMapping {
            completion_date: "data".to_string(),
            weight: "peso".to_string(),
            order_ref: None,
            order_quantity: Some("qtd".to_string()),
        };
        let records = load_records_from_reader(csv.as_bytes(), &mapping).unwrap();
        assert_eq!(records[0].order_quantity, Some(3.0));
        assert_eq!(records[1].order_quantity, None);
        assert!(records.iter().all(|r| r.order_ref.is_none()));
    }
}
