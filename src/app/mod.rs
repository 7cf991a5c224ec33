pub mod ports;
pub mod run_use_case;

pub use run_use_case::{RunSummary, ScrapeRunUseCase, SourceSummary};
