mod checks;
mod config;
mod context;
mod result;
mod runner;

pub use checks::{check_completeness, check_duplicates};
pub use config::{PostDeployConfig, PreDeployConfig, DEFAULT_ID_FIELD};
pub use context::PipelineContext;
pub use data_test::{run_tests, DataTest, TestOutcome, TestPredicate};
pub use result::{
    should_rollback, ChangeReport, CheckReport, CompletenessReport, DuplicateId, DuplicateReport,
    MissingField, ValidationResult,
};
pub use runner::ValidationPipeline;
