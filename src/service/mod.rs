pub mod analytics;
pub mod draft;
pub mod extraction;
pub mod ledger;
pub mod normalize;

pub use extraction::{ChatCompletionsBackend, ExtractionPipeline, VisionBackend};
pub use ledger::LedgerService;
