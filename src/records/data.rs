//! Work-order record structures matching the production export format

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Default header of the completion date column
pub const DEFAULT_DATE_COLUMN: &str = "Fim Real Caldeiraria";

/// Default header of the weight column (tons)
pub const DEFAULT_WEIGHT_COLUMN: &str = "Peso Total (Ton)";

/// Default header of the service-order identifier column
pub const DEFAULT_ORDER_REF_COLUMN: &str = "OS";

/// Numeric or categorical field of a work order that a metric can reduce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Weight in tons
    Weight,
    /// Service-order identifier (counted, never summed)
    OrderRef,
    /// Order quantity column (summed directly)
    OrderQuantity,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Weight => "weight",
            Field::OrderRef => "order_ref",
            Field::OrderQuantity => "order_quantity",
        }
    }
}

/// Maps record fields onto CSV header names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub completion_date: String,
    pub weight: String,
    /// Optional: absent header means every row has no order reference
    pub order_ref: Option<String>,
    /// Optional second quantity column
    pub order_quantity: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            completion_date: DEFAULT_DATE_COLUMN.to_string(),
            weight: DEFAULT_WEIGHT_COLUMN.to_string(),
            order_ref: Some(DEFAULT_ORDER_REF_COLUMN.to_string()),
            order_quantity: None,
        }
    }
}

/// A row as read from the source, before cleaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Completion timestamp; `None` when empty or unparseable
    pub completion_date: Option<NaiveDateTime>,
    /// Weight in tons; `None` when empty or non-numeric
    pub weight: Option<f64>,
    /// Service-order identifier
    pub order_ref: Option<String>,
    /// Order count, when the source carries one
    pub order_quantity: Option<f64>,
}

impl RawRecord {
    /// Build a fully populated record (test and fixture helper)
    pub fn new(completion_date: NaiveDateTime, weight: f64, order_ref: &str) -> Self {
        Self {
            completion_date: Some(completion_date),
            weight: Some(weight),
            order_ref: Some(order_ref.to_string()),
            order_quantity: None,
        }
    }
}

/// A cleaned work order: date and weight are guaranteed present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub completed_at: NaiveDateTime,
    pub weight: f64,
    pub order_ref: Option<String>,
    pub order_quantity: Option<f64>,
}

impl WorkOrder {
    /// Calendar date of completion
    pub fn completion_day(&self) -> NaiveDate {
        self.completed_at.date()
    }

    /// Value this order contributes for `field`, if any
    ///
    /// `OrderRef` contributes 1.0 per present identifier so that `Sum` and
    /// `Count` both count orders.
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Weight => Some(self.weight),
            Field::OrderRef => self.order_ref.as_ref().map(|_| 1.0),
            Field::OrderQuantity => self.order_quantity,
        }
    }
}
