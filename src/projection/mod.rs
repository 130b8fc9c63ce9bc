//! Projections built on top of forecasts: cumulative trajectories and the export table

mod cumulative;
mod table;

pub use cumulative::{project_cumulative, CumulativeProjection};
pub use table::{ProjectionRow, ProjectionTable};
