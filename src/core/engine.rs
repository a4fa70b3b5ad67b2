use crate::domain::model::{LoadOutcome, RunSummary};
use crate::domain::ports::Pipeline;
use crate::utils::error::{PipelineError, Result};

/// Where a run currently is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loading,
    Validating,
    Processing,
    Reporting,
    Done,
    Failed,
}

/// Drives one linear run through the pipeline stages. Any fatal stage error
/// moves the engine to `Failed` and aborts the remaining stages; recoverable
/// conditions ride along in the summary.
pub struct Engine<P: Pipeline> {
    pipeline: P,
    state: RunState,
}

impl<P: Pipeline> Engine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            state: RunState::Loading,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        self.state = RunState::Loading;
        tracing::info!("loading input");
        let LoadOutcome {
            mut table,
            skipped_rows,
            duplicate_rows,
        } = match self.pipeline.load() {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e)),
        };
        tracing::info!(
            records = table.len(),
            skipped = skipped_rows,
            duplicates = duplicate_rows,
            "loaded table"
        );

        self.state = RunState::Validating;
        tracing::info!("validating records");
        let mut validation = self.pipeline.validate(&mut table);
        validation.summary.skipped_rows = skipped_rows;
        validation.summary.duplicate_rows = duplicate_rows;
        tracing::info!(
            valid = validation.summary.valid_records,
            invalid = validation.summary.invalid_records,
            "validation complete"
        );

        self.state = RunState::Processing;
        tracing::info!("computing aggregates");
        let aggregates = self.pipeline.process(&table, &validation);

        self.state = RunState::Reporting;
        tracing::info!("writing report");
        let report = match self.pipeline.report(&aggregates, &validation.summary) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e)),
        };

        self.state = RunState::Done;
        tracing::info!(
            outputs = report.written.len(),
            warnings = report.warnings.len(),
            "run complete"
        );

        Ok(RunSummary {
            loaded_records: table.len(),
            validation: validation.summary,
            outputs: report.written,
            warnings: report.warnings,
        })
    }

    fn fail(&mut self, e: PipelineError) -> PipelineError {
        self.state = RunState::Failed;
        tracing::error!("pipeline failed: {}", e);
        e
    }
}
