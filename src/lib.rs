pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::ReportConfig;
pub use core::engine::{Engine, RunState};
pub use core::pipeline::CsvPipeline;
pub use domain::model::{
    AggregateReport, AggregateValue, RunSummary, Table, ValidationSummary,
};
pub use utils::error::{PipelineError, Result};
