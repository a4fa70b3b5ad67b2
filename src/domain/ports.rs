use crate::domain::model::{
    AggregateReport, LoadOutcome, ReportOutcome, Table, ValidationOutcome, ValidationSummary,
};
use crate::utils::error::Result;

/// The four pipeline stages. One linear run: load, validate, process,
/// report. A `Result::Err` from `load` or `report` setup is fatal; everything
/// recoverable is carried in the outcome types instead.
pub trait Pipeline {
    fn load(&self) -> Result<LoadOutcome>;
    fn validate(&self, table: &mut Table) -> ValidationOutcome;
    fn process(&self, table: &Table, validation: &ValidationOutcome) -> AggregateReport;
    fn report(
        &self,
        aggregates: &AggregateReport,
        summary: &ValidationSummary,
    ) -> Result<ReportOutcome>;
}
