//! Result aggregation
//!
//! [`table`] folds session means into a keyed table; [`render`] lays the
//! table out as fixed-width or tab-separated text.

pub mod render;
pub mod table;

pub use render::{
    execution_time_table, overhead_table, signal_table, Cell, Report, ReportFormat, RunHeader,
    Table, CELL_WIDTH,
};
pub use table::{ResultKey, ResultTable, NATIVE};
