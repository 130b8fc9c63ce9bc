//! Work-order record structures and CSV loading

mod data;
pub mod loader;

pub use data::{
    ColumnMapping, Field, RawRecord, WorkOrder, DEFAULT_DATE_COLUMN, DEFAULT_ORDER_REF_COLUMN,
    DEFAULT_WEIGHT_COLUMN,
};
pub use loader::{load_records, load_records_from_reader};
