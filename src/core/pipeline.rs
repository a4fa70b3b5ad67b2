use crate::config::ReportConfig;
use crate::core::loader::CsvLoader;
use crate::core::processor::Processor;
use crate::core::reporter::Reporter;
use crate::core::validator::Validator;
use crate::domain::model::{
    AggregateReport, LoadOutcome, ReportOutcome, Table, ValidationOutcome, ValidationSummary,
};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::validation::Validate;

/// The concrete four-stage pipeline over a CSV input, wired from a
/// `ReportConfig`.
pub struct CsvPipeline {
    loader: CsvLoader,
    validator: Validator,
    processor: Processor,
    reporter: Reporter,
}

impl CsvPipeline {
    pub fn new(config: &ReportConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            loader: CsvLoader::new(
                &config.input.path,
                config.schema(),
                config.input.drop_duplicates,
            ),
            validator: Validator::from_config(&config.validation)?,
            processor: Processor::from_config(&config.processing),
            reporter: Reporter::new(&config.pipeline.name, &config.output),
        })
    }
}

impl Pipeline for CsvPipeline {
    fn load(&self) -> Result<LoadOutcome> {
        self.loader.load()
    }

    fn validate(&self, table: &mut Table) -> ValidationOutcome {
        self.validator.validate(table)
    }

    fn process(&self, table: &Table, validation: &ValidationOutcome) -> AggregateReport {
        self.processor.process(table, validation)
    }

    fn report(
        &self,
        aggregates: &AggregateReport,
        summary: &ValidationSummary,
    ) -> Result<ReportOutcome> {
        self.reporter.report(aggregates, summary)
    }
}
