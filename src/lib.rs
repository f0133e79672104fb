pub mod classifier;
pub mod config;
pub mod diff;
pub mod error;
pub mod evictor;
pub mod gix_helpers;
pub mod history;
pub mod memory;
pub mod merge;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod provenance;
pub mod source;

pub use config::ChurnConfig;
pub use error::{ChurnError, Result};
pub use gix_helpers::GixRepository;
pub use model::{BlameSummary, ChurnFile, ChurnRecord};
pub use orchestrator::BlameOrchestrator;
