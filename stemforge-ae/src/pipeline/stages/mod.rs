//! The fixed stage sequence

mod composite;
mod export;
mod refinement;
mod separation;
mod transcription;
mod validation;

pub use composite::CompositeSynthesisStage;
pub use export::{ExportStage, PROJECT_FILE};
pub use refinement::RefinementStage;
pub use separation::SeparationStage;
pub use transcription::TranscriptionStage;
pub use validation::ValidationStage;
