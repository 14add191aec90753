pub mod domain;
pub mod extract;
pub mod fetch;
pub mod fixes;
pub mod packager;
pub mod pipeline;
pub mod plan;
pub mod ports;
pub mod scoring;

pub use domain::{
    ActionPlan, AnalysisRun, Category, CategoryFixes, Document, FetchedPage, Fix, FixBundle,
    FixContext, HealthStatus, Issue, OverallHealth, PageTiming, PriorityItem, RunState,
    ScoreResult, ServerType, Severity, Stage,
};
pub use fixes::FixGenerator;
pub use packager::PackagingError;
pub use pipeline::{Pipeline, RunOptions};
pub use ports::{
    AnalysisStore, CompletionService, FetchError, GenerationError, PageFetcher, PortError,
    PortResult,
};
pub use scoring::ScoreError;
