// Event processing pipeline: raw scraped fields in, canonical records out

pub mod processing;

pub use processing::assemble::{AssemblerConfig, DuplicatePolicy, RecordAssembler, SeenTitles};
pub use processing::normalize::FieldNormalizer;
